//! Typed entity identifiers
//!
//! Every entity gets a number from one counter shared by all collections,
//! so comparing two ids of the same type compares their insertion order.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) u64);

        impl $name {
            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies a [`User`](super::User)
    UserId,
    "user"
);
entity_id!(
    /// Identifies a [`Preset`](super::Preset)
    PresetId,
    "preset"
);
entity_id!(TextSettingId, "text_setting");
entity_id!(VisualSimulationId, "visual_simulation");
entity_id!(
    /// Identifies a shared [`ColorEntity`](super::ColorEntity)
    ColorId,
    "color"
);
entity_id!(ImageDataId, "image");
entity_id!(UserIconId, "user_icon");
entity_id!(EffectValueId, "effect");

/// Entity collections, used for change events and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    User,
    Preset,
    TextSetting,
    VisualSimulation,
    Color,
    ImageData,
    UserIcon,
    EffectValue,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Preset => "preset",
            EntityKind::TextSetting => "text setting",
            EntityKind::VisualSimulation => "visual simulation",
            EntityKind::Color => "color",
            EntityKind::ImageData => "image",
            EntityKind::UserIcon => "user icon",
            EntityKind::EffectValue => "effect value",
        };
        f.write_str(name)
    }
}
