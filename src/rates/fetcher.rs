use super::cache::RateCache;
use super::inflight::InFlightRequests;
use crate::core::{FetchError, Quotes, SettingsHandle, query};
use crate::providers::Transport;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{Instrument, debug, instrument};

/// Issues quote requests, one network call per composite query at a time.
pub struct QuoteFetcher {
    transport: Arc<dyn Transport>,
    cache: Arc<RateCache>,
    in_flight: Arc<InFlightRequests>,
    settings: SettingsHandle,
}

impl QuoteFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<RateCache>,
        in_flight: Arc<InFlightRequests>,
        settings: SettingsHandle,
    ) -> Self {
        Self {
            transport,
            cache,
            in_flight,
            settings,
        }
    }

    /// Builds the API URL from the configured defaults overridden by `params`.
    pub fn build_url(&self, params: &[(&str, &str)]) -> Result<String> {
        let api = self.settings.get().api;
        let mut merged: BTreeMap<String, String> = api.query_params;
        for (key, value) in params {
            merged.insert(key.to_string(), value.to_string());
        }
        let url = reqwest::Url::parse_with_params(&api.url, merged.iter())
            .with_context(|| format!("Invalid API url: {:?}", api.url))?;
        Ok(url.into())
    }

    /// Fetches all `queries` in one request. Callers asking for the same batch while
    /// it is pending share the request and its outcome.
    pub async fn fetch<S: AsRef<str>>(&self, queries: &[S]) -> Result<Quotes, FetchError> {
        self.fetch_batch(query::batch(queries)).await
    }

    #[instrument(name = "QuoteFetch", skip(self))]
    async fn fetch_batch(&self, query: String) -> Result<Quotes, FetchError> {
        let url = self.build_url(&[("q", query.as_str())])?;
        let compact = self.settings.get().api.is_compact();

        let (pending, started) = self.in_flight.get_or_start(&query, || {
            let task = tokio::spawn(
                run_fetch(
                    Arc::clone(&self.transport),
                    Arc::clone(&self.cache),
                    Arc::clone(&self.in_flight),
                    query.clone(),
                    url,
                    compact,
                )
                .in_current_span(),
            );
            let in_flight = Arc::clone(&self.in_flight);
            let key = query.clone();
            async move {
                match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        in_flight.set(&key, None);
                        Err(anyhow::Error::new(e)
                            .context("Quote fetch task failed")
                            .into())
                    }
                }
            }
            .boxed()
            .shared()
        });
        if started {
            debug!("Started quote fetch");
        }
        pending.await
    }
}

/// Runs one request to completion: caches every returned quote, then clears the
/// in-flight record whatever the outcome.
async fn run_fetch(
    transport: Arc<dyn Transport>,
    cache: Arc<RateCache>,
    in_flight: Arc<InFlightRequests>,
    query: String,
    url: String,
    compact: bool,
) -> Result<Quotes, FetchError> {
    debug!("Requesting quotes from {url}");
    let outcome = transport
        .get_json(&url)
        .await
        .and_then(|body| parse_quotes(body, compact))
        .map(|quotes| {
            let now = Utc::now();
            for (key, quote) in &quotes {
                cache.write(key, quote.val, now);
            }
            quotes
        });
    in_flight.set(&query, None);
    outcome.map_err(FetchError::from)
}

fn parse_quotes(body: Value, compact: bool) -> Result<Quotes> {
    let results = if compact {
        body
    } else {
        body.get("results")
            .cloned()
            .ok_or_else(|| anyhow!("No results found in quote response"))?
    };
    serde_json::from_value(results).context("Failed to parse quote response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ApiSettings, Settings};
    use crate::rates::testing::{MockTransport, parts};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_build_url_merges_params() {
        let (_, _, _, fetcher) = parts(MockTransport::ok(json!({})), Settings::default());

        assert_eq!(
            fetcher.build_url(&[("q", "EUR_USD")]).unwrap(),
            "http://free.currencyconverterapi.com/api/v3/convert?apiKey=&compact=y&q=EUR_USD"
        );
        assert_eq!(
            fetcher.build_url(&[("compact", "n")]).unwrap(),
            "http://free.currencyconverterapi.com/api/v3/convert?apiKey=&compact=n"
        );
        assert_eq!(
            fetcher.build_url(&[("q", "EUR_USD,GBP_KRW")]).unwrap(),
            "http://free.currencyconverterapi.com/api/v3/convert?apiKey=&compact=y&q=EUR_USD%2CGBP_KRW"
        );
    }

    #[test]
    fn test_build_url_rejects_invalid_base() {
        let settings = Settings {
            api: ApiSettings {
                url: String::new(),
                ..ApiSettings::default()
            },
            ..Settings::default()
        };
        let (_, _, _, fetcher) = parts(MockTransport::ok(json!({})), settings);
        assert!(fetcher.build_url(&[]).is_err());
    }

    #[tokio::test]
    async fn test_compact_fetch_caches_results() {
        let transport = MockTransport::ok(json!({ "EUR_USD": { "val": 1.1 } }));
        let (_, cache, in_flight, fetcher) = parts(transport.clone(), Settings::default());

        let quotes = fetcher.fetch(&["EUR_USD"]).await.unwrap();
        assert_eq!(quotes["EUR_USD"].val, 1.1);
        assert_eq!(transport.calls(), 1);
        assert!(transport.last_url().unwrap().ends_with("q=EUR_USD"));

        assert!(cache.is_fresh("EUR_USD"));
        assert!(!in_flight.is_pending("EUR_USD"));
    }

    #[tokio::test]
    async fn test_full_fetch_returns_results_object() {
        let transport = MockTransport::ok(json!({
            "query": { "count": 2 },
            "results": {
                "USD_EUR": { "id": "USD_EUR", "val": 0.9, "to": "EUR", "fr": "USD" },
                "GBP_USD": { "id": "GBP_USD", "val": 1.3, "to": "USD", "fr": "GBP" }
            }
        }));
        let settings = Settings {
            api: ApiSettings {
                query_params: BTreeMap::from([("compact".to_string(), "n".to_string())]),
                ..ApiSettings::default()
            },
            ..Settings::default()
        };
        let (_, cache, _, fetcher) = parts(transport.clone(), settings);

        let quotes = fetcher.fetch(&["USD_EUR", "GBP_USD"]).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["USD_EUR"].fr.as_deref(), Some("USD"));
        assert_eq!(quotes["GBP_USD"].val, 1.3);
        assert!(cache.has("USD_EUR"));
        assert!(cache.has("GBP_USD"));
        assert!(transport.last_url().unwrap().contains("compact=n"));
    }

    #[tokio::test]
    async fn test_failed_fetch_passes_error_through() {
        let transport = MockTransport::failing("ERROR");
        let (_, cache, in_flight, fetcher) = parts(transport.clone(), Settings::default());

        let err = fetcher.fetch(&["EUR_USD"]).await.unwrap_err();
        assert_eq!(err.to_string(), "ERROR");
        assert!(!cache.has("EUR_USD"));
        assert!(!in_flight.is_pending("EUR_USD"));

        // A later call issues a fresh request
        let _ = fetcher.fetch(&["EUR_USD"]).await;
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_unparsable_response_writes_nothing() {
        let transport = MockTransport::ok(json!({ "EUR_USD": { "rate": 1.1 } }));
        let (_, cache, in_flight, fetcher) = parts(transport, Settings::default());

        let err = fetcher.fetch(&["EUR_USD"]).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse quote response"));
        assert!(!cache.has("EUR_USD"));
        assert!(!in_flight.is_pending("EUR_USD"));
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let transport = MockTransport::ok(json!({ "EUR_USD": { "val": 1.1 } }))
            .with_delay(Duration::from_millis(50));
        let (_, _, in_flight, fetcher) = parts(transport.clone(), Settings::default());

        let first = fetcher.fetch(&["EUR_USD"]);
        let second = fetcher.fetch(&["EUR_USD"]);
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(transport.calls(), 1);
        assert!(!in_flight.is_pending("EUR_USD"));

        // Settled fetches are not reused
        fetcher.fetch(&["EUR_USD"]).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_is_tracked_while_pending() {
        let transport = MockTransport::ok(json!({ "EUR_USD": { "val": 1.1 } }))
            .with_delay(Duration::from_millis(50));
        let (_, _, in_flight, fetcher) = parts(transport, Settings::default());

        let fetch = fetcher.fetch(&["EUR_USD"]);
        tokio::pin!(fetch);
        assert!(futures::poll!(&mut fetch).is_pending());
        assert!(in_flight.is_pending("EUR_USD"));

        fetch.await.unwrap();
        assert!(!in_flight.is_pending("EUR_USD"));
    }

    #[tokio::test]
    async fn test_dropped_fetch_still_completes() {
        let transport = MockTransport::ok(json!({ "EUR_USD": { "val": 1.1 } }))
            .with_delay(Duration::from_millis(20));
        let (_, cache, in_flight, fetcher) = parts(transport, Settings::default());

        {
            let fetch = fetcher.fetch(&["EUR_USD"]);
            tokio::pin!(fetch);
            assert!(futures::poll!(&mut fetch).is_pending());
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.is_fresh("EUR_USD"));
        assert!(!in_flight.is_pending("EUR_USD"));
    }
}
