//! Network collaborators for the quote fetcher

pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use http::HttpTransport;

/// Fetches a URL and decodes the body as JSON.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value>;
}
