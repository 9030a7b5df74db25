pub mod cli;
pub mod core;
pub mod providers;
pub mod rates;
pub mod store;

pub use rates::CurrencyConverter;

use crate::core::config::AppConfig;
use crate::providers::HttpTransport;
use crate::store::{DiskStore, KeyValueStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Rate { from: String, to: Vec<String> },
    Convert { amount: f64, from: String, to: Vec<String> },
}

/// Builds a converter for `config`, backed by the on-disk store when mirroring is on.
/// A store that cannot be opened leaves the converter memory-only.
pub fn build_converter(config: &AppConfig) -> Result<CurrencyConverter> {
    let store: Option<Arc<dyn KeyValueStore>> = if config.settings.cache_to_store {
        match config
            .default_data_path()
            .and_then(|path| DiskStore::open(&path.join("cache")))
        {
            Ok(store) => Some(Arc::new(store) as Arc<dyn KeyValueStore>),
            Err(e) => {
                warn!("Rate store unavailable, caching in memory only: {e:#}");
                None
            }
        }
    } else {
        None
    };

    let transport = Arc::new(HttpTransport::new()?);
    Ok(CurrencyConverter::new(
        config.settings.clone(),
        transport,
        store,
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxrate starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let converter = build_converter(&config)?;

    match command {
        AppCommand::Rate { from, to } => cli::rates::run_rate(&converter, &from, &to).await,
        AppCommand::Convert { amount, from, to } => {
            cli::rates::run_convert(&converter, amount, &from, &to).await
        }
    }
}
