//! Rate resolution and caching
//!
//! [`CurrencyConverter`] ties one configuration to its own cache, in-flight
//! tracker, fetcher and resolver. Instances never share state unless they share a
//! store backend.

pub mod amount;
pub mod cache;
pub mod fetcher;
pub mod inflight;
pub mod resolver;

use crate::core::{
    Conversions, FetchError, Quotes, Rates, Settings, SettingsHandle, SettingsPatch,
};
use crate::providers::Transport;
use crate::store::{KeyValueStore, PersistentStore};
use anyhow::Result;
use cache::RateCache;
use fetcher::QuoteFetcher;
use inflight::InFlightRequests;
use resolver::RateResolver;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct CurrencyConverter {
    settings: SettingsHandle,
    cache: Arc<RateCache>,
    in_flight: Arc<InFlightRequests>,
    resolver: RateResolver,
}

impl CurrencyConverter {
    /// Creates a converter. With mirroring enabled the cache starts from whatever
    /// `store` holds under the configured key.
    pub fn new(
        settings: Settings,
        transport: Arc<dyn Transport>,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let settings = SettingsHandle::new(settings);
        let store = store.map_or_else(PersistentStore::unavailable, PersistentStore::new);
        let cache = Arc::new(RateCache::new(settings.clone(), store));
        let in_flight = Arc::new(InFlightRequests::new());
        let fetcher = QuoteFetcher::new(
            transport,
            Arc::clone(&cache),
            Arc::clone(&in_flight),
            settings.clone(),
        );
        Self {
            settings,
            resolver: RateResolver::new(Arc::clone(&cache), fetcher),
            cache,
            in_flight,
        }
    }

    pub fn config(&self, patch: SettingsPatch) {
        self.settings.update(|s| s.merge(patch));
        debug!("Settings updated");
    }

    /// Applies untyped overrides; non-object values are ignored.
    pub fn config_value(&self, overrides: &Value) -> Result<()> {
        self.settings.update(|s| s.merge_value(overrides))
    }

    pub fn get_config(&self) -> Settings {
        self.settings.get()
    }

    pub async fn get_rate<S: AsRef<str>>(&self, queries: &[S]) -> Result<Rates, FetchError> {
        self.resolver.resolve(queries).await
    }

    pub async fn fetch_quote<S: AsRef<str>>(&self, queries: &[S]) -> Result<Quotes, FetchError> {
        self.resolver.fetcher().fetch(queries).await
    }

    pub async fn convert_amount<S: AsRef<str>>(
        &self,
        amount: f64,
        queries: &[S],
    ) -> Result<Conversions, FetchError> {
        let rates = self.resolver.resolve(queries).await?;
        Ok(amount::apply_amount(amount, rates))
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn in_flight(&self) -> &InFlightRequests {
        &self.in_flight
    }
}
