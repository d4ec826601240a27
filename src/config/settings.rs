//! Application settings stored as TOML

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};

use crate::constants::{config, naming};
use crate::naming::{NameGenerator, SuffixFormat};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub naming: NamingSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Graph file; defaults to the platform data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Keep the graph in memory only (nothing survives exit)
    #[serde(default)]
    pub in_memory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingSettings {
    #[serde(default = "default_base_name")]
    pub base_name: String,
    #[serde(default)]
    pub suffix_format: SuffixFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Where exported presets are written; defaults to the working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_name() -> String {
    naming::BASE_NAME.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            store: StoreSettings::default(),
            naming: NamingSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            base_name: default_base_name(),
            suffix_format: SuffixFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(config::APP_DIR);
        path.push(config::FILENAME);
        path
    }

    /// Load from the default location, creating the file if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, writing defaults");
            let config = AppConfig::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from {:?}", path))?;
        config.validate();
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Replace values that cannot work with their defaults
    fn validate(&mut self) {
        if self.naming.base_name.trim().is_empty() {
            warn!(using = naming::BASE_NAME, "naming.base_name is empty, using default");
            self.naming.base_name = default_base_name();
        }
        if parse_level(&self.log_level).is_none() {
            warn!(log_level = %self.log_level, "Unknown log_level, using info");
            self.log_level = default_log_level();
        }
    }

    pub fn graph_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(config::APP_DIR);
            path.push(config::GRAPH_FILENAME);
            path
        })
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn name_generator(&self) -> NameGenerator {
        NameGenerator::new(self.naming.base_name.clone(), self.naming.suffix_format)
    }

    /// Log level from `LOG_LEVEL` if set, otherwise from the file
    pub fn tracing_level(&self) -> Level {
        std::env::var(config::LOG_LEVEL_ENV)
            .ok()
            .and_then(|value| parse_level(&value))
            .or_else(|| parse_level(&self.log_level))
            .unwrap_or(Level::INFO)
    }
}

fn parse_level(value: &str) -> Option<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}
