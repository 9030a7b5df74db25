use anyhow::{Context, Result};
use chrono::TimeDelta;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://free.currencyconverterapi.com/api/v3/convert";
pub const DEFAULT_STORE_KEY: &str = "CURRENCY_CONVERTER_CACHED_RATES";

/// The `API` block. It is always replaced as a whole, so a block without
/// `queryParams` carries no query parameters at all.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiSettings {
    pub url: String,
    #[serde(rename = "queryParams", default)]
    pub query_params: BTreeMap<String, String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            url: DEFAULT_API_URL.to_string(),
            query_params: BTreeMap::from([
                ("compact".to_string(), "y".to_string()),
                ("apiKey".to_string(), String::new()),
            ]),
        }
    }
}

impl ApiSettings {
    /// `compact=y` selects the flat response shape; anything else the nested `results` one.
    pub fn is_compact(&self) -> bool {
        self.query_params.get("compact").map(String::as_str) == Some("y")
    }

    pub fn api_key(&self) -> Option<&str> {
        self.query_params.get("apiKey").map(String::as_str)
    }
}

/// Converter settings. Field names on the wire are the documented option names.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "RATES_VALIDITY_HOURS")]
    pub rates_validity_hours: f64,
    #[serde(rename = "CACHE_TO_LOCAL_STORAGE")]
    pub cache_to_store: bool,
    #[serde(rename = "LOCAL_STORAGE_VARIABLE_NAME")]
    pub store_key: String,
    #[serde(rename = "API")]
    pub api: ApiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rates_validity_hours: 24.0,
            cache_to_store: true,
            store_key: DEFAULT_STORE_KEY.to_string(),
            api: ApiSettings::default(),
        }
    }
}

/// Partial settings; every present field replaces the current one wholesale.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    #[serde(rename = "RATES_VALIDITY_HOURS")]
    pub rates_validity_hours: Option<f64>,
    #[serde(rename = "CACHE_TO_LOCAL_STORAGE")]
    pub cache_to_store: Option<bool>,
    #[serde(rename = "LOCAL_STORAGE_VARIABLE_NAME")]
    pub store_key: Option<String>,
    #[serde(rename = "API")]
    pub api: Option<ApiSettings>,
}

impl Settings {
    /// Validity window, saturating at the bounds `TimeDelta` can represent.
    pub fn validity(&self) -> TimeDelta {
        let millis = (self.rates_validity_hours * 3_600_000.0) as i64;
        TimeDelta::try_milliseconds(millis).unwrap_or(if millis < 0 {
            TimeDelta::MIN
        } else {
            TimeDelta::MAX
        })
    }

    /// Shallow merge: a patched `API` block replaces the whole block.
    pub fn merge(&mut self, patch: SettingsPatch) {
        if let Some(hours) = patch.rates_validity_hours {
            self.rates_validity_hours = hours;
        }
        if let Some(cache_to_store) = patch.cache_to_store {
            self.cache_to_store = cache_to_store;
        }
        if let Some(store_key) = patch.store_key {
            self.store_key = store_key;
        }
        if let Some(api) = patch.api {
            self.api = api;
        }
    }

    /// Merges untyped overrides. Anything but a JSON object is ignored.
    pub fn merge_value(&mut self, overrides: &Value) -> Result<()> {
        if !overrides.is_object() {
            debug!("Ignoring non-object settings override: {overrides}");
            return Ok(());
        }
        let patch: SettingsPatch = serde_json::from_value(overrides.clone())
            .context("Failed to parse settings override")?;
        self.merge(patch);
        Ok(())
    }
}

/// Settings shared by the parts of one converter instance.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn get(&self) -> Settings {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs `f` under the write lock and returns its result.
    pub fn update<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        let mut settings = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut settings)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub settings: Settings,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the default config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "fxrate", "fxrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "fxrate", "fxrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
