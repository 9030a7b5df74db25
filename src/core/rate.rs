//! Rate types shared by the cache, fetcher, resolver and converter

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

/// One entry of a quote API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub val: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Quote {
    pub fn new(val: f64) -> Self {
        Self {
            val,
            fr: None,
            to: None,
            id: None,
        }
    }
}

/// Quotes keyed by query, as returned by one fetch.
pub type Quotes = HashMap<String, Quote>;

/// A resolved rate. `expired` is true when the value came from a cache entry older
/// than the validity window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub val: f64,
    pub expired: bool,
}

pub type Rates = HashMap<String, Rate>;

/// A resolved rate applied to a principal amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub val: f64,
    pub expired: bool,
    pub amount: f64,
}

pub type Conversions = HashMap<String, Conversion>;

/// Failure of a quote fetch, shared by every caller waiting on the same request.
///
/// The wrapped error is the transport's own; `Display` and `source` pass it through.
#[derive(Debug, Clone)]
pub struct FetchError(Arc<anyhow::Error>);

impl FetchError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{:#}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}
