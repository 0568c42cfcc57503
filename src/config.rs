use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use url::Url;

const APP_DIR: &str = ".wanderlog";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
pub const API_BASE_URL_ENV: &str = "WANDERLOG_API_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub db_path: PathBuf,
    pub request_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            db_path: default_root_dir().join("db").join("wanderlog.db"),
            request_timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    /// Loads the config file, falling back to defaults when it does not exist yet.
    pub fn load_or_default() -> Result<Self> {
        if Self::config_path()?.exists() {
            Self::load()
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    /// Base URL of the REST backend; the environment wins over the file.
    pub fn resolve_api_base_url(&self) -> String {
        std::env::var(API_BASE_URL_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.api_base_url.clone())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "api_base_url" => {
                let trimmed = value.trim().trim_end_matches('/');
                Url::parse(trimmed).with_context(|| format!("Invalid URL: {value}"))?;
                self.api_base_url = trimmed.to_string();
            }
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "request_timeout_seconds" => {
                self.request_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("request_timeout_seconds must be a number"))?
                    .max(1);
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: api_base_url|api.base_url, db_path|db.path, request_timeout_seconds|api.timeout_seconds"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "api_base_url" => Some(self.api_base_url.clone()),
            "db_path" => Some(self.db_path.display().to_string()),
            "request_timeout_seconds" => Some(self.request_timeout_seconds.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "api_base_url" | "api.base_url" => "api_base_url",
        "db_path" | "db.path" => "db_path",
        "request_timeout_seconds" | "api.timeout_seconds" => "request_timeout_seconds",
        _ => key,
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
