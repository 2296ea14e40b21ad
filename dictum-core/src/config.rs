//! Runtime settings for engine selection and cache placement.
//!
//! Everything is environment-driven with local-first defaults: absent any
//! configuration the core opens (and if needed creates) an embedded database
//! file under `data/`.

use std::env;
use std::path::PathBuf;

/// Environment variable naming a client/server connection URL.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Environment variable overriding the embedded database file path.
pub const ENV_EMBEDDED_PATH: &str = "DICTUM_DB_PATH";
/// Environment variable overriding the schema snapshot file path.
pub const ENV_CACHE_FILE: &str = "DICTUM_CACHE_FILE";
/// Environment variable overriding the artifact output directory.
pub const ENV_OUTPUT_DIR: &str = "DICTUM_OUTPUT_DIR";

const DEFAULT_EMBEDDED_PATH: &str = "data/dictum.duckdb";
const DEFAULT_CACHE_FILE: &str = "outputs/schema_cache.json";
const DEFAULT_OUTPUT_DIR: &str = "outputs";

/// Resolved settings for one pipeline execution.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Server connection URL, when one is configured.
    pub database_url: Option<String>,
    /// Embedded database file used when no server URL applies.
    pub embedded_path: PathBuf,
    /// Schema snapshot file consulted by the fingerprint cache.
    pub cache_path: PathBuf,
    /// Directory handed to the artifact exporter collaborator.
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: None,
            embedded_path: PathBuf::from(DEFAULT_EMBEDDED_PATH),
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = env::var(ENV_DATABASE_URL) {
            if !url.trim().is_empty() {
                settings.database_url = Some(url);
            }
        }
        if let Ok(path) = env::var(ENV_EMBEDDED_PATH) {
            if !path.trim().is_empty() {
                settings.embedded_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = env::var(ENV_CACHE_FILE) {
            if !path.trim().is_empty() {
                settings.cache_path = PathBuf::from(path);
            }
        }
        if let Ok(dir) = env::var(ENV_OUTPUT_DIR) {
            if !dir.trim().is_empty() {
                settings.output_dir = PathBuf::from(dir);
            }
        }
        settings
    }

    /// Sets the server connection URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Sets the embedded database file path.
    pub fn with_embedded_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.embedded_path = path.into();
        self
    }

    /// Sets the schema snapshot file path.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Sets the artifact output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}
