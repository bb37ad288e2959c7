//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. `OPCAL_DB_PATH` set: everything comes from the environment, unset
//!    variables keep their defaults
//! 2. Otherwise the first config file found by [`probe_config_paths`]
//! 3. JSON and TOML are both accepted, picked by extension
//!
//! ## Environment Variables
//! - `OPCAL_DB_PATH`: Database file path (selects environment loading)
//! - `OPCAL_DB_POOL_SIZE`: Connection pool size
//! - `OPCAL_DB_ENCRYPTION_KEY`: SQLCipher key
//! - `OPCAL_ESI_BASE_URL`, `OPCAL_SSO_TOKEN_URL`: remote endpoints
//! - `OPCAL_CLIENT_ID`, `OPCAL_CLIENT_SECRET`: SSO application
//! - `OPCAL_USER_AGENT`, `OPCAL_REMOTE_TIMEOUT_SECS`
//! - `OPCAL_SYNC_ENABLED`, `OPCAL_SYNC_CRON`, `OPCAL_SYNC_JOB_TIMEOUT_SECS`,
//!   `OPCAL_SYNC_MAX_CONCURRENT`
//! - `OPCAL_LOG_LEVEL`, `OPCAL_LOG_JSON`
//!
//! ## File Locations
//! The loader probes, in order, the current directory, its parent and
//! grandparent, then the executable's directory, for `config.{json,toml}`
//! and `opcal.{json,toml}`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use opcal_domain::{Config, OpCalError, Result};

const FILE_NAMES: [&str; 4] = ["config.json", "config.toml", "opcal.json", "opcal.toml"];

/// Load configuration from the environment, falling back to a config file.
///
/// # Errors
/// Returns `OpCalError::Config` when neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `OPCAL_*` environment variables.
///
/// # Errors
/// Returns `OpCalError::Config` if `OPCAL_DB_PATH` is missing or a numeric
/// variable does not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("OPCAL_DB_PATH")?;
    if let Some(pool_size) = env_parse("OPCAL_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    config.database.encryption_key = env_opt("OPCAL_DB_ENCRYPTION_KEY");

    if let Some(base_url) = env_opt("OPCAL_ESI_BASE_URL") {
        config.remote.base_url = base_url;
    }
    if let Some(token_url) = env_opt("OPCAL_SSO_TOKEN_URL") {
        config.remote.sso_token_url = token_url;
    }
    if let Some(client_id) = env_opt("OPCAL_CLIENT_ID") {
        config.remote.client_id = client_id;
    }
    config.remote.client_secret = env_opt("OPCAL_CLIENT_SECRET");
    if let Some(user_agent) = env_opt("OPCAL_USER_AGENT") {
        config.remote.user_agent = user_agent;
    }
    if let Some(timeout) = env_parse("OPCAL_REMOTE_TIMEOUT_SECS")? {
        config.remote.timeout_secs = timeout;
    }

    config.sync.enabled = env_bool("OPCAL_SYNC_ENABLED", config.sync.enabled);
    if let Some(cron) = env_opt("OPCAL_SYNC_CRON") {
        config.sync.cron_expression = cron;
    }
    if let Some(timeout) = env_parse("OPCAL_SYNC_JOB_TIMEOUT_SECS")? {
        config.sync.job_timeout_secs = timeout;
    }
    if let Some(max) = env_parse("OPCAL_SYNC_MAX_CONCURRENT")? {
        config.sync.max_concurrent_owners = max;
    }

    if let Some(level) = env_opt("OPCAL_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("OPCAL_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `OpCalError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(OpCalError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            OpCalError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| OpCalError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| OpCalError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| OpCalError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(OpCalError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.extend(cwd.ancestors().skip(1).take(2).map(Path::to_path_buf));
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| OpCalError::Config(format!("Missing required environment variable: {key}")))
}

/// Set and non-empty.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| OpCalError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
