use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use hearth_core::lists::{DEFAULT_HIDE_COMPLETED_AFTER_HOURS, DEFAULT_LIST_NAME};
use hearth_core::reconcile::DEFAULT_RECENCY_WINDOW_HOURS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub shopping: ShoppingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShoppingConfig {
    #[serde(default = "default_recency_window_hours")]
    pub recency_window_hours: i64,
    #[serde(default = "default_hide_completed_after_hours")]
    pub hide_completed_after_hours: i64,
    #[serde(default = "default_list_name")]
    pub default_list_name: String,
}

impl Default for ShoppingConfig {
    fn default() -> Self {
        Self {
            recency_window_hours: DEFAULT_RECENCY_WINDOW_HOURS,
            hide_completed_after_hours: DEFAULT_HIDE_COMPLETED_AFTER_HOURS,
            default_list_name: DEFAULT_LIST_NAME.to_string(),
        }
    }
}

fn default_recency_window_hours() -> i64 {
    DEFAULT_RECENCY_WINDOW_HOURS
}
fn default_hide_completed_after_hours() -> i64 {
    DEFAULT_HIDE_COMPLETED_AFTER_HOURS
}
fn default_list_name() -> String {
    DEFAULT_LIST_NAME.to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.auth.jwt_secret.trim().is_empty() {
        anyhow::bail!("auth.jwt_secret must not be empty");
    }

    if config.shopping.recency_window_hours < 0 {
        anyhow::bail!("shopping.recency_window_hours must be >= 0");
    }

    if config.shopping.hide_completed_after_hours < 0 {
        anyhow::bail!("shopping.hide_completed_after_hours must be >= 0");
    }

    let name = config.shopping.default_list_name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        anyhow::bail!("shopping.default_list_name must be 1-100 characters");
    }

    Ok(())
}
