//! Runtime configuration
//!
//! Resolved once at startup and passed explicitly to the store, the
//! fingerprint extractor and the backend. Precedence, lowest first:
//! built-in defaults, `config.toml`, environment, command line.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{config, env, hardware};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Root directory holding one subdirectory per profile
    #[serde(default = "default_profile_dir")]
    pub profile_dir: PathBuf,

    /// DRM connector tree used to discover monitors
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Program invoked to apply layouts
    #[serde(default = "default_xrandr")]
    pub xrandr: String,

    /// Shell command replacing the built-in identity decoder; receives the
    /// EDID path as `$1`
    #[serde(default)]
    pub identity_command: Option<String>,
}

fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(config::APP_DIR);
    path
}

fn default_profile_dir() -> PathBuf {
    config_dir().join(config::PROFILES_DIR)
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from(hardware::SYSFS_DRM)
}

fn default_xrandr() -> String {
    hardware::XRANDR.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile_dir: default_profile_dir(),
            sysfs_root: default_sysfs_root(),
            xrandr: default_xrandr(),
            identity_command: None,
        }
    }
}

impl AppConfig {
    pub fn path() -> PathBuf {
        config_dir().join(config::FILENAME)
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from {:?}", path))?;

        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Apply environment overrides; `lookup` is usually `std::env::var`
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(env::PROFILE_DIR).filter(|v| !v.is_empty()) {
            debug!(profile_dir = %dir, "Profile directory overridden by environment");
            self.profile_dir = PathBuf::from(dir);
        }
        if let Some(command) = lookup(env::IDENTITY_CMD).filter(|v| !v.is_empty()) {
            debug!(command = %command, "Identity decoder overridden by environment");
            self.identity_command = Some(command);
        }
        self
    }

    /// Apply a `--profile-dir` given on the command line
    pub fn with_profile_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.profile_dir = dir;
        }
        self
    }
}
