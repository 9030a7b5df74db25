use crate::core::{FetchError, Quotes};
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Handle to a fetch in progress. Every clone resolves to the same outcome.
pub type PendingFetch = Shared<BoxFuture<'static, Result<Quotes, FetchError>>>;

/// At most one pending fetch per composite query.
#[derive(Default)]
pub struct InFlightRequests {
    pending: Mutex<HashMap<String, PendingFetch>>,
}

impl InFlightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, PendingFetch>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_pending(&self, query: &str) -> bool {
        self.pending().contains_key(query)
    }

    pub fn get(&self, query: &str) -> Option<PendingFetch> {
        self.pending().get(query).cloned()
    }

    /// Tracks `handle` for `query`; `None` clears the record.
    pub fn set(&self, query: &str, handle: Option<PendingFetch>) {
        let mut pending = self.pending();
        match handle {
            Some(handle) => {
                pending.insert(query.to_string(), handle);
            }
            None => {
                if pending.remove(query).is_some() {
                    debug!("Cleared in-flight fetch for {query}");
                }
            }
        }
    }

    /// Returns the pending handle for `query`, or tracks the one built by `start`.
    /// The boolean is true when `start` ran. Check and insert happen under one lock,
    /// so `start` may spawn work that clears the record without racing the insert.
    pub fn get_or_start(
        &self,
        query: &str,
        start: impl FnOnce() -> PendingFetch,
    ) -> (PendingFetch, bool) {
        let mut pending = self.pending();
        if let Some(existing) = pending.get(query) {
            debug!("Joining in-flight fetch for {query}");
            return (existing.clone(), false);
        }
        let handle = start();
        pending.insert(query.to_string(), handle.clone());
        (handle, true)
    }
}
