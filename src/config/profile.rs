//! Tool configuration with a configurable stretch profile
//!
//! The profile names the keys the planner touches and the values it writes.
//! Defaults target VALORANT's `GameUserSettings.ini`; another Unreal title
//! only needs a different `[profile]` table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::keys;

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Overrides the discovered game config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_root: Option<PathBuf>,

    #[serde(default)]
    pub profile: StretchProfile,
}

/// Keys and values that make up a true stretch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StretchProfile {
    #[serde(default = "default_width_keys")]
    pub width_keys: Vec<String>,
    #[serde(default = "default_height_keys")]
    pub height_keys: Vec<String>,

    #[serde(default = "default_fullscreen_key")]
    pub fullscreen_key: String,
    /// Fullscreen enum value that does not letterbox on its own
    #[serde(default = "default_fullscreen_value")]
    pub fullscreen_value: String,

    #[serde(default = "default_hdr_key")]
    pub hdr_key: String,
    #[serde(default = "default_hdr_disabled_value")]
    pub hdr_disabled_value: String,

    #[serde(default = "default_aspect_fill_keys")]
    pub aspect_fill_keys: Vec<String>,
    #[serde(default = "default_aspect_fill_value")]
    pub aspect_fill_value: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn to_strings(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn default_width_keys() -> Vec<String> {
    to_strings(&keys::RESOLUTION_WIDTH)
}

fn default_height_keys() -> Vec<String> {
    to_strings(&keys::RESOLUTION_HEIGHT)
}

fn default_fullscreen_key() -> String {
    keys::FULLSCREEN_MODE.to_string()
}

fn default_fullscreen_value() -> String {
    keys::FULLSCREEN_VALUE.to_string()
}

fn default_hdr_key() -> String {
    keys::HDR_OUTPUT.to_string()
}

fn default_hdr_disabled_value() -> String {
    keys::HDR_DISABLED_VALUE.to_string()
}

fn default_aspect_fill_keys() -> Vec<String> {
    to_strings(&keys::ASPECT_FILL)
}

fn default_aspect_fill_value() -> String {
    keys::ASPECT_FILL_VALUE.to_string()
}

impl Default for StretchProfile {
    fn default() -> Self {
        Self {
            width_keys: default_width_keys(),
            height_keys: default_height_keys(),
            fullscreen_key: default_fullscreen_key(),
            fullscreen_value: default_fullscreen_value(),
            hdr_key: default_hdr_key(),
            hdr_disabled_value: default_hdr_disabled_value(),
            aspect_fill_keys: default_aspect_fill_keys(),
            aspect_fill_value: default_aspect_fill_value(),
        }
    }
}

impl StretchProfile {
    /// Every key the planner may touch, in planning order
    pub fn all_keys(&self) -> impl Iterator<Item = &str> {
        self.width_keys
            .iter()
            .chain(&self.height_keys)
            .chain(std::iter::once(&self.fullscreen_key))
            .chain(std::iter::once(&self.hdr_key))
            .chain(&self.aspect_fill_keys)
            .map(String::as_str)
            .filter(|k| !k.is_empty())
    }

    /// Drop empty key names so a blank entry in the file can't match anything
    fn sanitize(&mut self) {
        for list in [&mut self.width_keys, &mut self.height_keys, &mut self.aspect_fill_keys] {
            let before = list.len();
            list.retain(|k| !k.trim().is_empty());
            if list.len() != before {
                warn!(removed = before - list.len(), "Ignoring empty key names in profile");
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            config_root: None,
            profile: StretchProfile::default(),
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let config_path = Self::path();

        if !config_path.exists() {
            info!("Config file not found, creating default config at {:?}", config_path);
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from {:?}", path))?;
        config.profile.sanitize();

        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config to TOML")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        info!("Saved config to {:?}", path);
        Ok(())
    }
}
