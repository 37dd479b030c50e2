//! Application configuration
//!
//! Settings come from environment variables (optionally via a `.env` file
//! loaded in `main`), deserialized through the `config` crate. The loaded
//! configuration is stored once in a process-wide `OnceLock`; services
//! receive the values they need at construction time instead of reading
//! globals.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::errors::{MinilinkError, Result};

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// SERVER_HOST
    #[serde(default = "default_server_host")]
    pub server_host: String,
    /// SERVER_PORT
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// PUBLIC_URL, prefix of the short URLs handed back to callers
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// STORAGE_BACKEND, "sqlite" (default) or "file"
    #[serde(default = "default_storage_backend")]
    pub storage_backend: String,
    /// DB_FILE_NAME, SQLite database path
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
    /// LINKS_FILE, JSON file path for the file backend
    #[serde(default = "default_links_file")]
    pub links_file: String,

    /// RANDOM_CODE_LENGTH
    #[serde(default = "default_random_code_length")]
    pub random_code_length: usize,
    /// RANDOM_CODE_RETRIES, generation attempts before giving up
    #[serde(default = "default_random_code_retries")]
    pub random_code_retries: usize,

    /// GEOIP_ENABLED
    #[serde(default)]
    pub geoip_enabled: bool,
    /// GEOIP_API_URL, `{ip}` is replaced with the client address
    #[serde(default = "default_geoip_api_url")]
    pub geoip_api_url: String,

    /// LOG_LEVEL
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// LOG_FILE, empty or unset logs to stdout
    #[serde(default)]
    pub log_file: Option<String>,
    /// LOG_FORMAT, "text" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_storage_backend() -> String {
    "sqlite".to_string()
}

fn default_db_file_name() -> String {
    "links.db".to_string()
}

fn default_links_file() -> String {
    "links.json".to_string()
}

fn default_random_code_length() -> usize {
    7
}

fn default_random_code_retries() -> usize {
    5
}

fn default_geoip_api_url() -> String {
    "http://ip-api.com/json/{ip}?fields=status,countryCode,city".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server_host: default_server_host(),
            server_port: default_server_port(),
            public_url: default_public_url(),
            storage_backend: default_storage_backend(),
            db_file_name: default_db_file_name(),
            links_file: default_links_file(),
            random_code_length: default_random_code_length(),
            random_code_retries: default_random_code_retries(),
            geoip_enabled: false,
            geoip_api_url: default_geoip_api_url(),
            log_level: default_log_level(),
            log_file: None,
            log_format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        let loaded = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .map_err(|e| MinilinkError::config(format!("Failed to read environment: {}", e)))?;

        loaded
            .try_deserialize()
            .map_err(|e| MinilinkError::config(format!("Invalid configuration: {}", e)))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Load (once) and return the process-wide configuration.
///
/// # Panics
/// If the environment holds values the configuration cannot parse.
pub fn init_config() -> &'static AppConfig {
    CONFIG.get_or_init(|| AppConfig::load().expect("Failed to load configuration"))
}

/// The process-wide configuration. Falls back to defaults when `init_config`
/// has not run, which keeps library consumers and tests independent of the
/// environment.
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.storage_backend, "sqlite");
        assert_eq!(config.random_code_length, 7);
        assert_eq!(config.random_code_retries, 5);
        assert!(!config.geoip_enabled);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }
}
