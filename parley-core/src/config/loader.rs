use super::CONFIG_PATH;
use super::ParleyConfig;
use super::defaults::DEFAULT_ENV_PATH;
use super::error::ConfigError;
use dotenvy::from_filename;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::Once;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

pub const MAX_ROUNDS_ENV: &str = "PARLEY_MAX_ROUNDS";
pub const DEBOUNCE_ENV: &str = "PARLEY_DEBOUNCE_MS";

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(DEFAULT_ENV_PATH);
    });
}

/// Load, override from the environment and validate configuration
pub fn load_config(path: Option<&Path>) -> Result<ParleyConfig, ConfigError> {
    ensure_env_loaded();
    let config_path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
    let config = read_config(config_path)?;
    let config = apply_overrides(config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<ParleyConfig, ConfigError> {
    debug!(path = %path.display(), "Reading parley configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path)
}

pub(super) fn parse_config(content: &str, path: &Path) -> Result<ParleyConfig, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply `PARLEY_*` overrides read through `lookup`.
pub fn apply_overrides<F>(mut config: ParleyConfig, lookup: F) -> Result<ParleyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(max_rounds) = parse_override(&lookup, MAX_ROUNDS_ENV)? {
        debug!(max_rounds, "Round budget overridden from environment");
        config.agent.max_rounds = max_rounds;
    }
    if let Some(debounce_ms) = parse_override(&lookup, DEBOUNCE_ENV)? {
        debug!(debounce_ms, "Debounce window overridden from environment");
        config.buffer.debounce_ms = debounce_ms;
    }
    Ok(config)
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidOverride {
            key: key.to_string(),
            value: raw.clone(),
        })
}
