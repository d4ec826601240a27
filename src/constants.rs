//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Config and data file locations
pub mod config {
    /// Directory under the platform config/data dir
    pub const APP_DIR: &str = "visionsim";

    /// TOML config file name
    pub const FILENAME: &str = "config.toml";

    /// JSON graph file name (under the data dir)
    pub const GRAPH_FILENAME: &str = "graph.json";

    /// Environment variable that overrides the configured log level
    pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
}

/// Values used when a preset is created from the UI
pub mod defaults {
    /// Initial text of a new preset
    pub const TEXT: &str = "Text for your new preset";

    /// Initial font size
    pub const TEXT_SIZE: f64 = 18.0;

    /// Initial font weight (0.0 = thin, 1.0 = black)
    pub const TEXT_WEIGHT: f64 = 0.5;

    /// Initial blurriness
    pub const BLURRINESS: f64 = 0.0;
}

/// Preset naming
pub mod naming {
    /// Base name for presets created from the UI
    pub const BASE_NAME: &str = "New Preset";
}

/// Exchange file format
pub mod transfer {
    /// Extension of exported preset files
    pub const FILE_EXTENSION: &str = "json";

    /// Background code used when an imported color pair omits it
    pub const FALLBACK_BACKGROUND_CODE: &str = "#FFFFFF";

    /// Text code used when an imported color pair omits it
    pub const FALLBACK_TEXT_CODE: &str = "#000000";

    /// Separator between background and text names in a pair key
    pub const PAIR_KEY_SEPARATOR: char = ',';
}

/// Reference data seeded into every store on open
pub mod seed {
    /// (background name, text name, background code, text code)
    pub const COLOR_PAIRS: [(&str, &str, &str, &str); 5] = [
        ("White", "Black", "#FFFFFF", "#000000"),
        ("Black", "White", "#000000", "#FFFFFF"),
        ("Black", "Yellow", "#000000", "#FFFF00"),
        ("Yellow", "Blue", "#FFFF00", "#0000FF"),
        ("Blue", "Yellow", "#0000FF", "#FFFF00"),
    ];

    /// Effect catalog entries with their initial values
    pub const EFFECTS: [(&str, f64); 2] = [("Blur", 0.0), ("Contrast", 0.0)];
}

/// Thumbnails generated for preset images
pub mod thumbnail {
    /// Thumbnail width in pixels; height follows the aspect ratio
    pub const WIDTH: u32 = 100;
}

/// Display clamping ranges (stored values are never clamped)
pub mod display {
    /// Upper bound of the stored blurriness scale
    pub const MAX_BLURRINESS: f64 = 100.0;

    /// Blurriness is halved to get the filter radius (0-100 -> 0-50)
    pub const BLUR_RADIUS_DIVISOR: f64 = 2.0;

    /// Smallest font size shown
    pub const MIN_TEXT_SIZE: f64 = 8.0;

    /// Largest font size shown
    pub const MAX_TEXT_SIZE: f64 = 72.0;

    /// Weight range
    pub const MIN_TEXT_WEIGHT: f64 = 0.0;
    pub const MAX_TEXT_WEIGHT: f64 = 1.0;
}
