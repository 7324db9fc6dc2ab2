use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow, Context};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

/// Environment variable that overrides the configured backend address.
pub const API_BASE_ENV: &str = "DOCCHAT_API_BASE";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Missing file means defaults; a file that doesn't parse is an error.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        Ok(config)
    }

    /// Backend address: environment first, then the config file, then the default.
    pub fn api_base(&self) -> String {
        let env_value = std::env::var(API_BASE_ENV).ok();
        Self::resolve_api_base(env_value.as_deref(), self.api_base.as_deref())
    }

    fn resolve_api_base(env_value: Option<&str>, file_value: Option<&str>) -> String {
        [env_value, file_value]
            .into_iter()
            .flatten()
            .map(|v| v.trim().trim_end_matches('/'))
            .find(|v| !v.is_empty())
            .unwrap_or(DEFAULT_API_BASE)
            .to_string()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("docchat").join("config.json"))
    }
}
