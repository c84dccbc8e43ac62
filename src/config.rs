//! Configuration management for the model portal

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable overriding the configuration file location
pub const CONFIG_PATH_ENV: &str = "MODEL_PORTAL_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub map: MapConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the server binds to
    pub address: SocketAddr,
}

/// Model artifact locations, relative to `models_dir`
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing the JSON model artifacts
    pub models_dir: String,
    /// Coffee price regression
    pub price_model: String,
    /// Course approval classifier
    pub approval_model: String,
    /// Scaler fitted alongside the approval classifier
    pub approval_scaler: String,
    /// Held-out samples for the approval classifier metrics
    pub approval_evaluation: String,
    /// Category recommender (k-nearest-neighbors)
    pub knn_model: String,
    /// Scaler fitted alongside the recommender
    pub knn_scaler: String,
    /// Label encoder for recommender categories
    pub knn_encoder: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: String,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Username of the account created on first run
    pub admin_username: String,
    /// Password of the account created on first run
    pub admin_password: String,
    /// Name of the session cookie
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Sessions untouched for this long are dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_session_cookie() -> String {
    "portal_session".to_string()
}

fn default_session_idle_secs() -> u64 {
    3600
}

/// Map rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// Directory receiving generated map documents
    pub output_dir: String,
    /// Latitude used when the request supplies none
    pub default_lat: f64,
    /// Longitude used when the request supplies none
    pub default_lon: f64,
    /// Initial zoom level
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

fn default_zoom() -> u8 {
    13
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries (0 disables the reporter)
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 300,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `MODEL_PORTAL_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, with `MODEL_PORTAL__*` overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("MODEL_PORTAL").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                address: SocketAddr::from(([127, 0, 0, 1], 5000)),
            },
            models: ModelsConfig {
                models_dir: "models".to_string(),
                price_model: "linear_regression_model.json".to_string(),
                approval_model: "modelo_aprobacion.json".to_string(),
                approval_scaler: "scaler_aprobacion.json".to_string(),
                approval_evaluation: "evaluacion_aprobacion.json".to_string(),
                knn_model: "knn_model.json".to_string(),
                knn_scaler: "scaler_knn.json".to_string(),
                knn_encoder: "encoder_knn.json".to_string(),
            },
            database: DatabaseConfig {
                path: "portal.db".to_string(),
            },
            auth: AuthConfig {
                admin_username: "admin".to_string(),
                admin_password: "admin123".to_string(),
                session_cookie: default_session_cookie(),
                session_idle_secs: default_session_idle_secs(),
            },
            map: MapConfig {
                output_dir: "static/maps".to_string(),
                default_lat: 4.711,
                default_lon: -74.0721,
                zoom: default_zoom(),
            },
            metrics: MetricsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
