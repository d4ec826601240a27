//! Assembles complete preset subgraphs inside an open transaction
//!
//! A preset is always created together with its text setting and visual
//! simulation; the builder decides their contents, resolves shared rows
//! through [`crate::dedup`] and picks a name that is free for the owning user.

use tracing::{debug, info};

use crate::constants::transfer::{FALLBACK_BACKGROUND_CODE, FALLBACK_TEXT_CODE};
use crate::dedup::{self, Resolution};
use crate::error::StoreError;
use crate::model::{
    ColorId, EntityKind, PresetDraft, PresetId, TextSettingDraft, UserId, VisualSimulationDraft,
};
use crate::naming::NameGenerator;
use crate::store::Transaction;
use crate::thumbnail;
use crate::transfer::PresetRecord;

/// What an import created or reused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPreset {
    pub preset: PresetId,
    pub name: String,
    pub user: Resolution<UserId>,
    pub color: Option<Resolution<ColorId>>,
}

pub struct GraphBuilder<'a> {
    naming: &'a NameGenerator,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(naming: &'a NameGenerator) -> Self {
        Self { naming }
    }

    /// New preset with the UI defaults and the next free base name
    pub fn default_preset(
        &self,
        tx: &mut Transaction<'_>,
        user: UserId,
    ) -> Result<PresetId, StoreError> {
        if tx.graph().user(user).is_none() {
            return Err(StoreError::not_found(EntityKind::User, user.raw()));
        }
        let name = self.naming.next(&tx.graph().preset_names(user));
        debug!(preset = %name, %user, "Building default preset");

        tx.create_preset(PresetDraft {
            name,
            user,
            text: TextSettingDraft::default(),
            visual: VisualSimulationDraft::default(),
        })
    }

    /// Rebuild a decoded record as a new preset of the matching user.
    /// Stored colors and users are reused untouched when their key matches.
    pub fn preset_from_record(
        &self,
        tx: &mut Transaction<'_>,
        record: PresetRecord,
    ) -> Result<BuiltPreset, StoreError> {
        let user = dedup::resolve_user(tx, &record.user.name, record.user.is_from_countryside);

        let text = record.text_setting;
        let color = text.color_code.as_deref().map(|code| {
            dedup::resolve_color(
                tx,
                code,
                text.background_color_code
                    .as_deref()
                    .unwrap_or(FALLBACK_BACKGROUND_CODE),
                text.text_color_code.as_deref().unwrap_or(FALLBACK_TEXT_CODE),
            )
        });
        let color_id = color.map(|c| c.id());

        let base = if record.name.trim().is_empty() {
            self.naming.base()
        } else {
            record.name.as_str()
        };
        let name = self.naming.unique(base, &tx.graph().preset_names(user.id()));
        if name != record.name {
            info!(requested = %record.name, assigned = %name, "Renamed imported preset to avoid a collision");
        }

        let preset = tx.create_preset(PresetDraft {
            name: name.clone(),
            user: user.id(),
            text: TextSettingDraft {
                text: text.text_field_data,
                size: text.text_size,
                weight: text.text_weight,
                background_color: color_id,
                text_color: color_id,
            },
            visual: VisualSimulationDraft {
                blurriness: record.visual_simulation.blurriness,
                image: record.visual_simulation.image_data.map(thumbnail::image_draft),
            },
        })?;

        Ok(BuiltPreset {
            preset,
            name,
            user,
            color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::new_user;
    use crate::store::EntityStore;
    use crate::transfer::{TextSettingRecord, UserRecord, VisualSimulationRecord};

    fn record(name: &str, user: &str, color_code: Option<&str>) -> PresetRecord {
        PresetRecord {
            name: name.to_string(),
            text_setting: TextSettingRecord {
                text_field_data: "Sample".to_string(),
                text_size: 22.0,
                text_weight: 0.8,
                color_code: color_code.map(str::to_string),
                background_color_code: Some("#000000".to_string()),
                text_color_code: Some("#FFFF00".to_string()),
            },
            visual_simulation: VisualSimulationRecord {
                blurriness: 40.0,
                image_data: Some(vec![7, 7, 7]),
            },
            user: UserRecord {
                name: user.to_string(),
                is_from_countryside: true,
            },
        }
    }

    #[test]
    fn test_default_preset_values() {
        let store = EntityStore::in_memory();
        let naming = NameGenerator::default();
        let builder = GraphBuilder::new(&naming);

        let mut tx = store.transaction();
        let alice = tx.create_user(new_user("Alice", true));
        let preset = builder.default_preset(&mut tx, alice).unwrap();
        tx.save().unwrap();

        let details = store.preset_details(preset).unwrap();
        assert_eq!(details.preset.name, "New Preset");
        assert_eq!(details.text_setting.size, 18.0);
        assert_eq!(details.text_setting.weight, 0.5);
        assert_eq!(details.visual_simulation.blurriness, 0.0);
        assert!(details.image.is_none());
    }

    #[test]
    fn test_default_presets_get_incrementing_names() {
        let store = EntityStore::in_memory();
        let naming = NameGenerator::default();
        let builder = GraphBuilder::new(&naming);

        let mut tx = store.transaction();
        let alice = tx.create_user(new_user("Alice", true));
        for _ in 0..3 {
            builder.default_preset(&mut tx, alice).unwrap();
        }
        tx.save().unwrap();

        let names: Vec<String> = store
            .fetch_presets(&crate::store::PresetFilter::owned_by(alice), Default::default())
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["New Preset", "New Preset 1", "New Preset 2"]);
    }

    #[test]
    fn test_default_preset_unknown_user() {
        let store = EntityStore::in_memory();
        let naming = NameGenerator::default();
        let mut tx = store.transaction();
        let result = GraphBuilder::new(&naming).default_preset(&mut tx, UserId(42));
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_record_creates_user_color_and_image() {
        let store = EntityStore::in_memory();
        let naming = NameGenerator::default();
        let mut tx = store.transaction();
        let built = GraphBuilder::new(&naming)
            .preset_from_record(&mut tx, record("Reading", "Carol", Some("Black,Yellow")))
            .unwrap();
        tx.save().unwrap();

        assert!(built.user.was_created());
        assert!(built.color.unwrap().was_created());
        let details = store.preset_details(built.preset).unwrap();
        assert_eq!(details.user.name, "Carol");
        assert!(!details.user.is_owner);
        assert_eq!(details.background_color, details.text_color);
        assert_eq!(details.image.unwrap().bytes, vec![7, 7, 7]);
        assert_eq!(details.text_setting.text, "Sample");
    }

    #[test]
    fn test_imported_image_gets_thumbnail() {
        let store = EntityStore::in_memory();
        let naming = NameGenerator::default();
        let mut input = record("Photo", "Carol", None);
        input.visual_simulation.image_data = Some(thumbnail::tests::sample_png(300, 150));

        let mut tx = store.transaction();
        let built = GraphBuilder::new(&naming).preset_from_record(&mut tx, input).unwrap();
        tx.save().unwrap();

        let image = store.preset_details(built.preset).unwrap().image.unwrap();
        assert_eq!(thumbnail::tests::dimensions(&image.thumbnail.unwrap()), (100, 50));
    }

    #[test]
    fn test_record_name_collision_gets_suffix() {
        let store = EntityStore::in_memory();
        let naming = NameGenerator::default();
        let builder = GraphBuilder::new(&naming);

        let mut tx = store.transaction();
        let first = builder.preset_from_record(&mut tx, record("A", "Carol", None)).unwrap();
        let second = builder.preset_from_record(&mut tx, record("A", "Carol", None)).unwrap();
        tx.save().unwrap();

        assert_eq!(first.name, "A");
        assert_eq!(second.name, "A 1");
        assert_eq!(second.user, Resolution::Existing(first.user.id()));
    }

    #[test]
    fn test_empty_record_name_uses_base_name() {
        let store = EntityStore::in_memory();
        let naming = NameGenerator::default();
        let mut tx = store.transaction();
        let built = GraphBuilder::new(&naming)
            .preset_from_record(&mut tx, record("  ", "Carol", None))
            .unwrap();
        assert_eq!(built.name, "New Preset");
    }

    #[test]
    fn test_missing_codes_fall_back_on_creation() {
        let store = EntityStore::in_memory();
        let naming = NameGenerator::default();
        let mut input = record("A", "Carol", Some("Custom"));
        input.text_setting.background_color_code = None;
        input.text_setting.text_color_code = None;

        let mut tx = store.transaction();
        let built = GraphBuilder::new(&naming).preset_from_record(&mut tx, input).unwrap();
        let color = tx.graph().color(built.color.unwrap().id()).unwrap();
        assert_eq!(color.background_code, "#FFFFFF");
        assert_eq!(color.text_code, "#000000");
    }
}
