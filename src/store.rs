//! Key-value persistence used for assignments, the reported set and the disable switch.
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, TimeDelta, Utc};

/// A string key-value store with per-key expiration, conventionally backed by browser cookies.
///
/// Methods take `&self`; implementations are expected to use interior mutability.
pub trait KeyValueStore {
    /// Get the value stored under `key`, or `None` if it is absent or expired.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, overwriting any previous value. `expires_in_days: None` keeps
    /// the value for the current session.
    fn set(&self, key: &str, value: &str, expires_in_days: Option<f64>);
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str, expires_in_days: Option<f64>) {
        (**self).set(key, value, expires_in_days)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory [`KeyValueStore`] that lives as long as the process (one "session").
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// Keys holding a live value, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = Utc::now();
        let entries = self
            .entries
            .read()
            .expect("thread holding store lock should not panic");
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Returns `true` if no key holds a live value.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |t| now < t)
    }
}

/// Lifetimes past the representable range are clamped to the latest instant.
fn expiry_after_days(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    TimeDelta::try_milliseconds((days * 86_400_000.0) as i64)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(if days > 0.0 {
            DateTime::<Utc>::MAX_UTC
        } else {
            now
        })
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self
            .entries
            .read()
            .expect("thread holding store lock should not panic");
        entries
            .get(key)
            .filter(|entry| entry.is_live(Utc::now()))
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: &str, expires_in_days: Option<f64>) {
        // Constructing new value before requesting the lock to minimize lock span.
        let entry = Entry {
            value: value.to_owned(),
            expires_at: expires_in_days.map(|days| expiry_after_days(Utc::now(), days)),
        };

        let mut entries = self
            .entries
            .write()
            .expect("thread holding store lock should not panic");
        entries.insert(key.to_owned(), entry);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{InMemoryStore, KeyValueStore};

    #[test]
    fn set_overwrites() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("k"), None);

        store.set("k", "1", None);
        store.set("k", "2", Some(30.0));
        assert_eq!(store.get("k").as_deref(), Some("2"));
        assert_eq!(store.keys(), vec!["k".to_owned()]);
    }

    #[test]
    fn expired_value_reads_as_absent() {
        let store = InMemoryStore::new();
        store.set("k", "1", Some(0.0));
        assert_eq!(store.get("k"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn huge_lifetime_does_not_overflow() {
        let store = InMemoryStore::new();
        store.set("long", "1", Some(1.0e8));
        store.set("longest", "1", Some(f64::MAX));
        assert_eq!(store.get("long").as_deref(), Some("1"));
        assert_eq!(store.get("longest").as_deref(), Some("1"));

        store.set("past", "1", Some(f64::MIN));
        assert_eq!(store.get("past"), None);
    }

    #[test]
    fn can_write_from_another_thread() {
        let store = Arc::new(InMemoryStore::new());

        {
            let store = store.clone();
            let _ = std::thread::spawn(move || {
                store.set("k", "v", None);
            })
            .join();
        }

        assert_eq!(store.get("k").as_deref(), Some("v"));
    }
}
