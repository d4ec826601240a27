//! Entity model for the preset graph
//!
//! Entities reference each other only through typed ids. The store owns
//! every row; relationships are plain foreign-key fields checked on commit.

pub mod bytes;
mod ids;

use serde::{Deserialize, Serialize};

pub use ids::{
    ColorId, EffectValueId, EntityKind, ImageDataId, PresetId, TextSettingId, UserIconId, UserId,
    VisualSimulationId,
};

use crate::constants::{defaults, transfer};

/// A person whose presets live in the graph. At most one user is the owner
/// (the local profile); the others arrive through imports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub is_from_countryside: bool,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<UserIconId>,
}

/// A named bundle of one text setting and one visual simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    pub user: UserId,
    pub text_setting: TextSettingId,
    pub visual_simulation: VisualSimulationId,
}

/// Text style of a preset. Size and weight are stored as entered;
/// see [`crate::display`] for the clamped values shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSetting {
    pub id: TextSettingId,
    pub text: String,
    pub size: f64,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<ColorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<ColorId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSimulation {
    pub id: VisualSimulationId,
    pub blurriness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageDataId>,
}

/// Shared background/text color pair, keyed by `code`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorEntity {
    pub id: ColorId,
    pub code: String,
    pub background_code: String,
    pub text_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub id: ImageDataId,
    #[serde(with = "bytes")]
    pub bytes: Vec<u8>,
    #[serde(default, with = "bytes::option", skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIcon {
    pub id: UserIconId,
    #[serde(with = "bytes")]
    pub bytes: Vec<u8>,
}

/// Global effect catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectValue {
    pub id: EffectValueId,
    pub name: String,
    pub value: f64,
}

// ==============================================================================
// Drafts: entity contents before the store assigns ids
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub is_from_countryside: bool,
    pub is_owner: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewColor {
    pub code: String,
    pub background_code: String,
    pub text_code: String,
}

impl NewColor {
    /// Pair key in the `"<background>,<text>"` form used by the seeded colors
    pub fn pair_key(background_name: &str, text_name: &str) -> String {
        format!(
            "{background_name}{}{text_name}",
            transfer::PAIR_KEY_SEPARATOR
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageDraft {
    pub bytes: Vec<u8>,
    pub thumbnail: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSettingDraft {
    pub text: String,
    pub size: f64,
    pub weight: f64,
    pub background_color: Option<ColorId>,
    pub text_color: Option<ColorId>,
}

impl Default for TextSettingDraft {
    fn default() -> Self {
        Self {
            text: defaults::TEXT.to_string(),
            size: defaults::TEXT_SIZE,
            weight: defaults::TEXT_WEIGHT,
            background_color: None,
            text_color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualSimulationDraft {
    pub blurriness: f64,
    pub image: Option<ImageDraft>,
}

impl Default for VisualSimulationDraft {
    fn default() -> Self {
        Self {
            blurriness: defaults::BLURRINESS,
            image: None,
        }
    }
}

/// Everything needed to create a preset. The store only creates presets
/// from a complete draft, so a preset never exists without its children.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetDraft {
    pub name: String,
    pub user: UserId,
    pub text: TextSettingDraft,
    pub visual: VisualSimulationDraft,
}

/// A preset joined with every row it links to
#[derive(Debug, Clone, PartialEq)]
pub struct PresetDetails {
    pub preset: Preset,
    pub user: User,
    pub text_setting: TextSetting,
    pub visual_simulation: VisualSimulation,
    pub image: Option<ImageData>,
    pub background_color: Option<ColorEntity>,
    pub text_color: Option<ColorEntity>,
}
