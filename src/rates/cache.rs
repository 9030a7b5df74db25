use crate::core::{Rate, SettingsHandle};
use crate::store::PersistentStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A cached rate and the instant it was obtained. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedRate {
    pub val: f64,
    pub date: DateTime<Utc>,
}

/// In-memory rates keyed by query, optionally mirrored to a [`PersistentStore`].
pub struct RateCache {
    entries: Mutex<HashMap<String, CachedRate>>,
    settings: SettingsHandle,
    store: PersistentStore,
}

impl RateCache {
    /// Creates the cache, hydrating it from `store` when mirroring is enabled.
    pub fn new(settings: SettingsHandle, store: PersistentStore) -> Self {
        let cache = Self {
            entries: Mutex::new(HashMap::new()),
            settings,
            store,
        };
        if cache.settings.get().cache_to_store {
            cache.load_from_store();
        }
        cache
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CachedRate>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has(&self, query: &str) -> bool {
        self.entries().contains_key(query)
    }

    pub fn is_expired(&self, date: DateTime<Utc>) -> bool {
        Utc::now() - date > self.settings.get().validity()
    }

    /// Same as [`is_expired`](Self::is_expired) for an RFC 3339 timestamp. An
    /// unparsable timestamp counts as expired.
    pub fn is_expired_text(&self, date: &str) -> bool {
        match DateTime::parse_from_rfc3339(date) {
            Ok(date) => self.is_expired(date.with_timezone(&Utc)),
            Err(e) => {
                warn!("Treating unparsable rate date {date:?} as expired: {e}");
                true
            }
        }
    }

    pub fn is_fresh(&self, query: &str) -> bool {
        let entry = self.entries().get(query).copied();
        entry.is_some_and(|entry| !self.is_expired(entry.date))
    }

    pub fn write(&self, query: &str, val: f64, date: DateTime<Utc>) {
        let mut entries = self.entries();
        entries.insert(query.to_string(), CachedRate { val, date });
        debug!("Cache PUT for query: {query}");

        let settings = self.settings.get();
        if settings.cache_to_store {
            self.store.write(&settings.store_key, &*entries);
        }
    }

    /// Returns the cached value with its expiry evaluated now.
    pub fn read(&self, query: &str) -> Option<Rate> {
        let entry = self.entries().get(query).copied();
        match entry {
            Some(entry) => {
                debug!("Cache HIT for query: {query}");
                Some(Rate {
                    val: entry.val,
                    expired: self.is_expired(entry.date),
                })
            }
            None => {
                debug!("Cache MISS for query: {query}");
                None
            }
        }
    }

    /// Replaces every entry with what the store holds.
    pub fn load_from_store(&self) {
        let key = self.settings.get().store_key;
        let loaded: HashMap<String, CachedRate> = self.store.read(&key);
        debug!("Loaded {} cached rates from store", loaded.len());
        *self.entries() = loaded;
    }

    pub fn persist(&self) {
        let key = self.settings.get().store_key;
        let entries = self.entries();
        self.store.write(&key, &*entries);
    }

    pub fn snapshot(&self) -> HashMap<String, CachedRate> {
        self.entries().clone()
    }
}
