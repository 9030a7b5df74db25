use super::cache::RateCache;
use super::fetcher::QuoteFetcher;
use crate::core::{FetchError, Rate, Rates};
use std::sync::Arc;
use tracing::{debug, warn};

/// Serves fresh rates from the cache and fetches the rest, falling back to
/// expired entries when the fetch fails.
pub struct RateResolver {
    cache: Arc<RateCache>,
    fetcher: QuoteFetcher,
}

impl RateResolver {
    pub fn new(cache: Arc<RateCache>, fetcher: QuoteFetcher) -> Self {
        Self { cache, fetcher }
    }

    pub fn fetcher(&self) -> &QuoteFetcher {
        &self.fetcher
    }

    /// Resolves every query, or fails with the transport error when a query that
    /// needed fetching has no cached entry to fall back on.
    pub async fn resolve<S: AsRef<str>>(&self, queries: &[S]) -> Result<Rates, FetchError> {
        let mut rates = Rates::new();
        let mut needs_fetch = Vec::new();

        for query in queries.iter().map(|q| q.as_ref()) {
            match self.cache.read(query) {
                Some(rate) if !rate.expired => {
                    rates.insert(query.to_string(), rate);
                }
                _ => needs_fetch.push(query.to_string()),
            }
        }

        if needs_fetch.is_empty() {
            debug!("All {} rates served from cache", rates.len());
            return Ok(rates);
        }

        match self.fetcher.fetch(&needs_fetch).await {
            Ok(quotes) => {
                for (query, quote) in quotes {
                    rates.entry(query).or_insert(Rate {
                        val: quote.val,
                        expired: false,
                    });
                }
                Ok(rates)
            }
            Err(error) => {
                // All or nothing: one query without a cached entry fails the batch
                for query in needs_fetch {
                    match self.cache.read(&query) {
                        Some(rate) => {
                            warn!(%error, "Falling back to cached rate for {query}");
                            rates.insert(query, rate);
                        }
                        None => return Err(error),
                    }
                }
                Ok(rates)
            }
        }
    }
}
