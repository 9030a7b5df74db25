//! Core types: queries, rates, configuration and logging

pub mod config;
pub mod log;
pub mod query;
pub mod rate;

// Re-export main types for cleaner imports
pub use config::{ApiSettings, AppConfig, Settings, SettingsHandle, SettingsPatch};
pub use query::to_query;
pub use rate::{Conversion, Conversions, FetchError, Quote, Quotes, Rate, Rates};
