use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::batch::{BatchOptions, DEFAULT_CONCURRENCY, DEFAULT_HTTP_TIMEOUT, DEFAULT_PING_TIMEOUT};
use crate::error::{Error, Result};
use crate::ping_executor::DEFAULT_ATTEMPTS;

const APP_DIR: &str = "reach-probe";
const CONFIG_FILE: &str = "config.json";

/// Persistent defaults for the CLI. Timeouts are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoints_file: PathBuf,
    pub output_file: PathBuf,
    pub ping_timeout: f64,
    pub http_timeout: f64,
    pub ping_attempts: u16,
    pub concurrency: usize,
    pub use_system_proxy: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints_file: PathBuf::from("data/endpoints.json"),
            output_file: PathBuf::from("working-urls.txt"),
            ping_timeout: DEFAULT_PING_TIMEOUT.as_secs_f64(),
            http_timeout: DEFAULT_HTTP_TIMEOUT.as_secs_f64(),
            ping_attempts: DEFAULT_ATTEMPTS,
            concurrency: DEFAULT_CONCURRENCY,
            use_system_proxy: false,
        }
    }
}

fn seconds(value: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(value)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or(fallback)
}

impl AppConfig {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("could not find config directory".into()))?
            .join(APP_DIR);
        Ok(config_dir.join(CONFIG_FILE))
    }

    /// Load the user config, falling back to defaults when it is missing or broken.
    pub fn load() -> Self {
        match Self::get_config_path() {
            Ok(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                warn!("Ignoring config file: {e}");
                Self::default()
            }),
            Ok(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::get_config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)
    }

    /// Options for one batch. Non-positive timeouts fall back to the defaults.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            ping_timeout: seconds(self.ping_timeout, DEFAULT_PING_TIMEOUT),
            http_timeout: seconds(self.http_timeout, DEFAULT_HTTP_TIMEOUT),
            http_check: true,
            concurrency: self.concurrency.max(1),
            use_system_proxy: self.use_system_proxy,
        }
    }
}
