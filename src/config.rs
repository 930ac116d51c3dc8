use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::host::RadioProfile;

const DEFAULTS: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub radio: RadioConfig,
    pub rest: RestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub poll_interval_ms: u64,
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RadioConfig {
    pub connected: bool,
    pub model: String,
    pub nickname: String,
    pub callsign: String,
    #[serde(default)]
    pub initial_slices: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestConfig {
    #[serde(default)]
    pub latency_ms: u64,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        match user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::defaults(),
        }
    }

    pub fn defaults() -> Result<Self> {
        Self::from_toml_str(DEFAULTS)
    }

    /// Reads a user file. A user file replaces the defaults wholesale, so it
    /// must carry every section.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(raw)?;
        if config.general.poll_interval_ms == 0 {
            anyhow::bail!("general.poll_interval_ms must be greater than zero");
        }
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.general.poll_interval_ms)
    }

    pub fn rest_latency(&self) -> Duration {
        Duration::from_millis(self.rest.latency_ms)
    }

    pub fn radio_profile(&self) -> RadioProfile {
        RadioProfile {
            model: self.radio.model.clone(),
            nickname: self.radio.nickname.clone(),
            callsign: self.radio.callsign.clone(),
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "frstack-functions")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
