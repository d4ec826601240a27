//! Configuration management for VisionSim presets
//!
//! A single TOML file under the platform config dir holds the store
//! location, naming rules, export directory and log level.

pub mod settings;

pub use settings::{AppConfig, ExportSettings, NamingSettings, StoreSettings};
