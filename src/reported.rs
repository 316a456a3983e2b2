use crate::{assignment_store::storage_key, store::KeyValueStore};

const REPORTED_KEY: &str = "reported";

/// Remembers which `<experiment>_<variant>` pairs were already sent to analytics.
///
/// The set is stored as a sorted JSON array under `abs_reported` and is re-read on every check.
pub struct ReportDeduplicator<'s> {
    store: &'s dyn KeyValueStore,
}

impl<'s> ReportDeduplicator<'s> {
    /// Wrap a key-value store.
    pub fn new(store: &'s dyn KeyValueStore) -> Self {
        ReportDeduplicator { store }
    }

    /// Key identifying one reported assignment.
    pub fn report_key(experiment: &str, variant: &str) -> String {
        format!("{experiment}_{variant}")
    }

    /// Returns `true` if `key` has not been reported yet.
    pub fn should_report(&self, key: &str) -> bool {
        !self.reported().iter().any(|k| k == key)
    }

    /// Add `key` to the persisted set, keeping it sorted.
    pub fn mark_reported(&self, key: &str) {
        let mut reported = self.reported();
        if reported.iter().any(|k| k == key) {
            return;
        }
        reported.push(key.to_owned());
        reported.sort();

        match serde_json::to_string(&reported) {
            Ok(json) => self.store.set(&storage_key(REPORTED_KEY), &json, None),
            Err(err) => {
                log::warn!(target: "ab_segment", key; "failed to serialize reported set: {:?}", err)
            }
        }
    }

    /// Currently persisted keys. Missing or corrupt content reads as empty.
    pub fn reported(&self) -> Vec<String> {
        let Some(json) = self.store.get(&storage_key(REPORTED_KEY)) else {
            return Vec::new();
        };
        serde_json::from_str(&json).unwrap_or_else(|err| {
            log::warn!(target: "ab_segment", "ignoring corrupt reported set: {:?}", err);
            Vec::new()
        })
    }
}
