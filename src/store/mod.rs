pub mod disk;
pub mod memory;

use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub use disk::DiskStore;
pub use memory::MemoryStore;

const PROBE_KEY: &str = "fxrate-probe";

/// A key to text blob store that outlives the process, e.g. a file-backed keyspace.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON view over an optional [`KeyValueStore`].
///
/// Never fails towards the caller: a missing or broken backend reads as an empty
/// value and drops writes, reporting the problem through the log.
#[derive(Clone, Default)]
pub struct PersistentStore {
    backend: Option<Arc<dyn KeyValueStore>>,
}

impl PersistentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// Probes the backend with a write followed by a remove.
    pub fn is_available(&self) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        match backend
            .set(PROBE_KEY, PROBE_KEY)
            .and_then(|_| backend.remove(PROBE_KEY))
        {
            Ok(()) => true,
            Err(e) => {
                debug!("Store probe failed: {e}");
                false
            }
        }
    }

    /// Stores `value` as JSON under `key`. A failing backend is reported by the
    /// write itself, without a separate probe.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        let Some(backend) = &self.backend else {
            error!("Caching rates to store failed. Store not available");
            return;
        };

        let res = serde_json::to_string(value)
            .map_err(anyhow::Error::from)
            .and_then(|blob| backend.set(key, &blob));
        if let Err(e) = res {
            error!(key, "Caching rates to store failed: {e}");
        }
    }

    /// Reads and decodes `key`, or `T::default()` when absent, unreadable or malformed.
    pub fn read<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(backend) = &self.backend else {
            error!("Retrieving rates from store failed. Store not available");
            return T::default();
        };

        match backend.get(key) {
            Ok(Some(blob)) => serde_json::from_str(&blob).unwrap_or_else(|e| {
                warn!(key, "Discarding malformed stored value: {e}");
                T::default()
            }),
            Ok(None) => T::default(),
            Err(e) => {
                warn!(key, "Store read failed: {e}");
                T::default()
            }
        }
    }
}
