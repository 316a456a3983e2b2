use crate::store::KeyValueStore;

/// Prefix of every key written to the [`KeyValueStore`].
pub const STORAGE_PREFIX: &str = "abs";

const DISABLED_KEY: &str = "disabled";

/// Storage key for an experiment's persisted variant, e.g. `abs_button-color`.
///
/// The same key is used to look up query-string overrides.
pub fn storage_key(experiment: &str) -> String {
    format!("{STORAGE_PREFIX}_{experiment}")
}

/// Reads and writes persisted assignments, one scalar value per experiment.
pub struct AssignmentStore<'s> {
    store: &'s dyn KeyValueStore,
}

impl<'s> AssignmentStore<'s> {
    /// Wrap a key-value store.
    pub fn new(store: &'s dyn KeyValueStore) -> Self {
        AssignmentStore { store }
    }

    /// Get the persisted value for `experiment`.
    pub fn read(&self, experiment: &str) -> Option<String> {
        self.store.get(&storage_key(experiment))
    }

    /// Overwrite the persisted value for `experiment`.
    pub fn write(&self, experiment: &str, value: &str, max_age_days: Option<f64>) {
        self.store
            .set(&storage_key(experiment), value, max_age_days)
    }

    /// The global switch is on only when `abs_disabled` holds `"1"`.
    pub fn is_disabled(&self) -> bool {
        self.store.get(&storage_key(DISABLED_KEY)).as_deref() == Some("1")
    }

    /// Write the global switch. It has no expiry.
    pub fn set_disabled(&self, disabled: bool) {
        let value = if disabled { "1" } else { "0" };
        self.store.set(&storage_key(DISABLED_KEY), value, None)
    }
}

#[cfg(test)]
mod tests {
    use super::{storage_key, AssignmentStore};
    use crate::store::{InMemoryStore, KeyValueStore};

    #[test]
    fn keys_are_prefixed() {
        let store = InMemoryStore::new();
        let assignments = AssignmentStore::new(&store);

        assignments.write("button-color", "2", Some(30.0));
        assert_eq!(store.get("abs_button-color").as_deref(), Some("2"));
        assert_eq!(assignments.read("button-color").as_deref(), Some("2"));
        assert_eq!(storage_key("x"), "abs_x");
    }

    #[test]
    fn write_overwrites() {
        let store = InMemoryStore::new();
        let assignments = AssignmentStore::new(&store);

        assignments.write("e", "0", None);
        assignments.write("e", "1", None);
        assert_eq!(assignments.read("e").as_deref(), Some("1"));
    }

    #[test]
    fn disable_switch() {
        let store = InMemoryStore::new();
        let assignments = AssignmentStore::new(&store);
        assert!(!assignments.is_disabled());

        assignments.set_disabled(true);
        assert!(assignments.is_disabled());
        assert_eq!(store.get("abs_disabled").as_deref(), Some("1"));

        assignments.set_disabled(false);
        assert!(!assignments.is_disabled());

        store.set("abs_disabled", "yes", None);
        assert!(!assignments.is_disabled());
    }
}
