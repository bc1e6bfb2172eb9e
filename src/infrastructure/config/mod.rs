use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::error::{AppError, Result};

pub const CONFIG_FILE: &str = "datagen.toml";
pub const CONFIG_PATH_ENV: &str = "DATAGEN_CONFIG";
pub const ENV_PREFIX: &str = "DATAGEN_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub prediction: PredictionConfig,
    pub preview: PreviewConfig,
    pub export: ExportConfig,
    pub mock: MockConfig,
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Rows shown per group before the "more rows" summary
    pub row_limit: usize,
    /// Rows of the uploaded dataset shown after selection
    pub data_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    pub single_prefix: String,
    pub multi_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockConfig {
    pub enabled: bool,
    pub port: u16,
    pub config_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            prediction: PredictionConfig {
                base_url: "http://localhost:8000/api".to_string(),
                timeout_secs: 120,
            },
            preview: PreviewConfig {
                row_limit: 10,
                data_rows: 5,
            },
            export: ExportConfig {
                single_prefix: "predictions".to_string(),
                multi_prefix: "all_predictions".to_string(),
            },
            mock: MockConfig {
                enabled: false,
                port: 4010,
                config_path: PathBuf::from("mock_routes.json"),
            },
            log_filter: "info".to_string(),
        }
    }
}

impl PredictionConfig {
    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Defaults, then the TOML file, then `DATAGEN_*` environment variables.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config: AppConfig = Self::figment(path)
            .extract()
            .map_err(|err| AppError::ConfigError(format!("Failed to load configuration: {}", err)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.preview.row_limit == 0 {
            return Err(AppError::ConfigError(
                "preview.row_limit must be greater than zero".to_string(),
            ));
        }
        if self.prediction.timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "prediction.timeout_secs must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(self.prediction.base_url()).map_err(|err| {
            AppError::ConfigError(format!(
                "prediction.base_url '{}' is not a valid URL: {}",
                self.prediction.base_url, err
            ))
        })?;
        Ok(())
    }
}
