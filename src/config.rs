// Configuration loading and parsing (config/board.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Built-in default configuration, written to `config/board.toml` on
/// first run.
const DEFAULT_CONFIG: &str = include_str!("../defaults/board.toml");

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsWriteError { message: String },
}

// ---------------------------------------------------------------------------
// board.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    catalog: CatalogSection,
    feed: FeedSection,
    #[serde(default)]
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogSection {
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FeedSection {
    api_url: String,
    ws_url: String,
    poll_interval_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    #[serde(default)]
    path: String,
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_url: String,
    pub feed_api_url: String,
    pub feed_ws_url: String,
    pub poll_interval: Duration,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/board.toml` relative to
/// `base_dir`. This is the lower-level primitive that does not create a
/// default config; prefer [`load_config`].
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config/board.toml");
    let text = std::fs::read_to_string(&path).map_err(|_| ConfigError::FileNotFound {
        path: path.clone(),
    })?;

    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let db_path = if file.database.path.trim().is_empty() {
        default_db_path()
    } else {
        file.database.path
    };

    let config = Config {
        catalog_url: file.catalog.url,
        feed_api_url: file.feed.api_url,
        feed_ws_url: file.feed.ws_url,
        poll_interval: Duration::from_secs(file.feed.poll_interval_secs),
        db_path,
    };

    validate(&config, file.feed.poll_interval_secs)?;
    Ok(config)
}

/// Ensure `config/board.toml` exists, writing the built-in default when
/// missing. Returns whether the file was created.
pub fn ensure_config_file(base_dir: &Path) -> Result<bool, ConfigError> {
    let config_dir = base_dir.join("config");
    let path = config_dir.join("board.toml");
    if path.exists() {
        return Ok(false);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsWriteError {
        message: format!("failed to create config directory: {e}"),
    })?;
    std::fs::write(&path, DEFAULT_CONFIG).map_err(|e| ConfigError::DefaultsWriteError {
        message: format!("failed to write {}: {e}", path.display()),
    })?;
    Ok(true)
}

/// Convenience wrapper: ensures a default config exists relative to the
/// current working directory, then loads it.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

/// Platform data-directory default for the saved-rankings database,
/// falling back to the working directory when no home is resolvable.
fn default_db_path() -> String {
    directories::ProjectDirs::from("", "", "draftdeck")
        .map(|dirs| dirs.data_dir().join("draftdeck.db").display().to_string())
        .unwrap_or_else(|| "draftdeck.db".to_string())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config, poll_interval_secs: u64) -> Result<(), ConfigError> {
    if config.catalog_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "catalog.url".into(),
            message: "must not be empty".into(),
        });
    }
    if config.feed_api_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "feed.api_url".into(),
            message: "must not be empty".into(),
        });
    }
    if config.feed_ws_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "feed.ws_url".into(),
            message: "must not be empty".into(),
        });
    }
    if poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "feed.poll_interval_secs".into(),
            message: "must be greater than 0".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
