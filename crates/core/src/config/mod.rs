//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (INTERCACHE_*)
//! 2. TOML config file (if INTERCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is immutable: the worker parses it once at startup and
//! every component receives the parsed view, never ambient globals.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (INTERCACHE_*)
/// 2. TOML config file (if INTERCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application identifier, the first half of the generation name.
    ///
    /// Set via INTERCACHE_APP_ID environment variable.
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Cache version tag, the second half of the generation name.
    ///
    /// Bumping this on deploy invalidates every previous generation
    /// wholesale at the next activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the controlling page (scheme + host + port).
    ///
    /// Requests to any other origin are never intercepted.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Assets seeded into the current generation at install time.
    ///
    /// Paths are resolved against `origin`. Install fails as a whole if
    /// any of these cannot be fetched with status 200.
    #[serde(default)]
    pub critical_assets: Vec<String>,

    /// Path extensions routed to the image strategy
    /// (cache-first with background refresh).
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Path extensions routed to the document strategy
    /// (network-first with cache fallback).
    #[serde(default = "default_document_extensions")]
    pub document_extensions: Vec<String>,

    /// User-Agent string for network fetches.
    ///
    /// Set via INTERCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via INTERCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via INTERCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Path to the SQLite store database.
    ///
    /// Set via INTERCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_app_id() -> String {
    "intercache".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "https://localhost".into()
}

fn default_image_extensions() -> Vec<String> {
    ["webp", "jpg", "jpeg", "png", "gif", "avif"].map(String::from).to_vec()
}

fn default_document_extensions() -> Vec<String> {
    ["html", "htm"].map(String::from).to_vec()
}

fn default_user_agent() -> String {
    "intercache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./intercache.sqlite")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            critical_assets: Vec::new(),
            image_extensions: default_image_extensions(),
            document_extensions: default_document_extensions(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            db_path: default_db_path(),
        }
    }
}

impl AppConfig {
    /// The current generation's store name: `<app-id>-<version>`.
    ///
    /// Exactly one store with this name is current at any time; all other
    /// names are stale and deleted during activation.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.app_id, self.cache_version)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `INTERCACHE_`
    /// 2. TOML file from `INTERCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("INTERCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("INTERCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
