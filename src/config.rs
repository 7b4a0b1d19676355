// Configuration management

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::AppConfig;

/// Environment variables checked for the API key, in priority order
pub const API_KEY_VARS: [&str; 2] = ["REPLY_ROULETTE_API_KEY", "GOOGLE_API_KEY"];

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("reply-roulette");

    fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

    Ok(config_dir)
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

pub fn get_log_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("reply-roulette.log"))
}

/// Loads the config file (creating it with defaults on first run) and applies
/// the API key from the environment. A broken file falls back to defaults.
pub fn load_config() -> Result<AppConfig> {
    let config_path = get_config_path()?;

    let mut config = match load_config_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, path = %config_path.display(), "using default config");
            AppConfig::default()
        }
    };

    config.api_key = resolve_api_key(env_api_key(), config.api_key.take());

    Ok(config)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let default_config = AppConfig::default();
        save_config_to(path, &default_config)?;
        return Ok(default_config);
    }

    let contents = fs::read_to_string(path).context("Failed to read config file")?;

    let config: AppConfig = toml::from_str(&contents).context("Failed to parse config file")?;

    Ok(config)
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, contents).context("Failed to write config file")?;

    Ok(())
}

fn env_api_key() -> Option<String> {
    API_KEY_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
}

/// Environment wins over the file; blank values count as unset.
pub fn resolve_api_key(from_env: Option<String>, from_file: Option<String>) -> Option<String> {
    from_env
        .or(from_file)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}
