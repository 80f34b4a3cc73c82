use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};

use crate::link::DEFAULT_LINK_BASE_URL;
use crate::snapshot::LoadMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON snapshot of the library the session is served from
    snapshot: Option<String>,
    output_directory: String,
    pub show_subscribers: bool,
    pub load_delay_ms: u64,
    pub logout_after_save: bool,
    link_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot: None,
            output_directory: ".".to_string(),
            show_subscribers: false,
            load_delay_ms: 0,
            logout_after_save: true,
            link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        url::Url::parse(&config.link_base_url)
            .wrap_err_with(|| format!("Invalid link_base_url `{}`", config.link_base_url))?;
        Ok(config)
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("spot-export").join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when it is missing
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Write a default config file, if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_else(|| eyre!("No config directory found"))?;
        if path.exists() {
            log::info!("Config already exists at {}", path.display());
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(&Self::default())?;
        std::fs::write(&path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.snapshot.as_deref().map(|path| self.expand_path(path))
    }

    /// Directory `save` writes to when none is given
    pub fn output_directory_path(&self) -> PathBuf {
        self.expand_path(&self.output_directory)
    }

    pub fn link_base_url(&self) -> &str {
        &self.link_base_url
    }

    pub fn load_mode(&self) -> LoadMode {
        if self.load_delay_ms == 0 {
            LoadMode::Immediate
        } else {
            LoadMode::Delayed(Duration::from_millis(self.load_delay_ms))
        }
    }
}
