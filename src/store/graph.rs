//! In-memory arena of every entity, plus the integrity rules checked on commit

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::Violation;
use crate::model::{
    ColorEntity, ColorId, EffectValue, EffectValueId, EntityKind, ImageData, ImageDataId, Preset,
    PresetDetails, PresetId, TextSetting, TextSettingId, User, UserIcon, UserIconId, UserId,
    VisualSimulation, VisualSimulationId,
};

/// How fetched presets and users are ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Case-sensitive name order, ties broken by insertion order
    #[default]
    ByName,
    ByInsertion,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetFilter {
    pub user: Option<UserId>,
    pub exclude_user: Option<UserId>,
    pub name: Option<String>,
}

impl PresetFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(user: UserId) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    pub fn not_owned_by(user: UserId) -> Self {
        Self {
            exclude_user: Some(user),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn matches(&self, preset: &Preset) -> bool {
        self.user.is_none_or(|user| preset.user == user)
            && self.exclude_user.is_none_or(|user| preset.user != user)
            && self.name.as_ref().is_none_or(|name| &preset.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub owner_only: bool,
    pub name: Option<String>,
}

impl UserFilter {
    pub fn owner() -> Self {
        Self {
            owner_only: true,
            name: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            owner_only: false,
            name: Some(name.into()),
        }
    }

    fn matches(&self, user: &User) -> bool {
        (!self.owner_only || user.is_owner) && self.name.as_ref().is_none_or(|name| &user.name == name)
    }
}

/// Every table of the object graph. Ids come from `next_id`, shared by all
/// tables, so id order is insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub(crate) next_id: u64,
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) presets: BTreeMap<PresetId, Preset>,
    pub(crate) text_settings: BTreeMap<TextSettingId, TextSetting>,
    pub(crate) visual_simulations: BTreeMap<VisualSimulationId, VisualSimulation>,
    pub(crate) colors: BTreeMap<ColorId, ColorEntity>,
    pub(crate) images: BTreeMap<ImageDataId, ImageData>,
    pub(crate) user_icons: BTreeMap<UserIconId, UserIcon>,
    pub(crate) effects: BTreeMap<EffectValueId, EffectValue>,
}

impl Graph {
    pub(crate) fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ==========================================================================
    // Reads shared by committed state and open transactions
    // ==========================================================================

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn preset(&self, id: PresetId) -> Option<&Preset> {
        self.presets.get(&id)
    }

    pub fn text_setting(&self, id: TextSettingId) -> Option<&TextSetting> {
        self.text_settings.get(&id)
    }

    pub fn visual_simulation(&self, id: VisualSimulationId) -> Option<&VisualSimulation> {
        self.visual_simulations.get(&id)
    }

    pub fn color(&self, id: ColorId) -> Option<&ColorEntity> {
        self.colors.get(&id)
    }

    pub fn image(&self, id: ImageDataId) -> Option<&ImageData> {
        self.images.get(&id)
    }

    pub fn user_icon(&self, id: UserIconId) -> Option<&UserIcon> {
        self.user_icons.get(&id)
    }

    pub fn fetch_presets(&self, filter: &PresetFilter, order: SortOrder) -> Vec<Preset> {
        let mut presets: Vec<Preset> = self
            .presets
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        // BTreeMap iteration already yields insertion order; a stable sort keeps it for ties
        if order == SortOrder::ByName {
            presets.sort_by(|a, b| a.name.cmp(&b.name));
        }
        presets
    }

    pub fn fetch_users(&self, filter: &UserFilter, order: SortOrder) -> Vec<User> {
        let mut users: Vec<User> = self
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        if order == SortOrder::ByName {
            users.sort_by(|a, b| a.name.cmp(&b.name));
        }
        users
    }

    pub fn fetch_colors(&self) -> Vec<ColorEntity> {
        let mut colors: Vec<ColorEntity> = self.colors.values().cloned().collect();
        colors.sort_by(|a, b| a.code.cmp(&b.code));
        colors
    }

    pub fn fetch_effects(&self) -> Vec<EffectValue> {
        let mut effects: Vec<EffectValue> = self.effects.values().cloned().collect();
        effects.sort_by(|a, b| a.name.cmp(&b.name));
        effects
    }

    /// Exact, case-sensitive lookup by pair key
    pub fn find_color(&self, code: &str) -> Option<&ColorEntity> {
        self.colors.values().find(|c| c.code == code)
    }

    /// Exact, case-sensitive lookup by name; the earliest user wins
    pub fn find_user(&self, name: &str) -> Option<&User> {
        self.users.values().find(|u| u.name == name)
    }

    pub fn find_effect(&self, name: &str) -> Option<&EffectValue> {
        self.effects.values().find(|e| e.name == name)
    }

    pub fn owner(&self) -> Option<&User> {
        self.users.values().find(|u| u.is_owner)
    }

    /// Names already used in one user's preset collection
    pub fn preset_names(&self, user: UserId) -> HashSet<String> {
        self.presets
            .values()
            .filter(|p| p.user == user)
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn preset_details(&self, id: PresetId) -> Option<PresetDetails> {
        let preset = self.presets.get(&id)?;
        let text_setting = self.text_settings.get(&preset.text_setting)?;
        let visual_simulation = self.visual_simulations.get(&preset.visual_simulation)?;
        Some(PresetDetails {
            preset: preset.clone(),
            user: self.users.get(&preset.user)?.clone(),
            text_setting: text_setting.clone(),
            image: visual_simulation
                .image
                .and_then(|image| self.images.get(&image))
                .cloned(),
            visual_simulation: visual_simulation.clone(),
            background_color: text_setting
                .background_color
                .and_then(|c| self.colors.get(&c))
                .cloned(),
            text_color: text_setting
                .text_color
                .and_then(|c| self.colors.get(&c))
                .cloned(),
        })
    }

    // ==========================================================================
    // Integrity
    // ==========================================================================

    /// Check every relationship and uniqueness rule of the graph
    pub fn validate(&self) -> Result<(), Violation> {
        if self.users.values().filter(|u| u.is_owner).count() > 1 {
            return Err(Violation::MultipleOwners);
        }

        let mut user_names = HashSet::new();
        for user in self.users.values() {
            if !user_names.insert(user.name.as_str()) {
                return Err(Violation::DuplicateUserName(user.name.clone()));
            }
        }

        let mut icon_owners: HashMap<UserIconId, usize> = HashMap::new();
        for user in self.users.values() {
            if let Some(icon) = user.icon {
                if !self.user_icons.contains_key(&icon) {
                    return Err(dangling(user.id.to_string(), EntityKind::UserIcon, icon.raw()));
                }
                *icon_owners.entry(icon).or_default() += 1;
            }
        }
        for id in self.user_icons.keys() {
            exactly_one(EntityKind::UserIcon, id.raw(), icon_owners.get(id))?;
        }

        let mut names: HashSet<(UserId, &str)> = HashSet::new();
        let mut text_owners: HashMap<TextSettingId, usize> = HashMap::new();
        let mut visual_owners: HashMap<VisualSimulationId, usize> = HashMap::new();
        for preset in self.presets.values() {
            let Some(user) = self.users.get(&preset.user) else {
                return Err(dangling(preset.id.to_string(), EntityKind::User, preset.user.raw()));
            };
            if !self.text_settings.contains_key(&preset.text_setting) {
                return Err(dangling(
                    preset.id.to_string(),
                    EntityKind::TextSetting,
                    preset.text_setting.raw(),
                ));
            }
            if !self.visual_simulations.contains_key(&preset.visual_simulation) {
                return Err(dangling(
                    preset.id.to_string(),
                    EntityKind::VisualSimulation,
                    preset.visual_simulation.raw(),
                ));
            }
            if !names.insert((preset.user, preset.name.as_str())) {
                return Err(Violation::DuplicatePresetName {
                    user: user.name.clone(),
                    name: preset.name.clone(),
                });
            }
            *text_owners.entry(preset.text_setting).or_default() += 1;
            *visual_owners.entry(preset.visual_simulation).or_default() += 1;
        }

        for setting in self.text_settings.values() {
            exactly_one(EntityKind::TextSetting, setting.id.raw(), text_owners.get(&setting.id))?;
            finite(EntityKind::TextSetting, setting.id.raw(), "size", setting.size)?;
            finite(EntityKind::TextSetting, setting.id.raw(), "weight", setting.weight)?;
            for color in [setting.background_color, setting.text_color].into_iter().flatten() {
                if !self.colors.contains_key(&color) {
                    return Err(dangling(setting.id.to_string(), EntityKind::Color, color.raw()));
                }
            }
        }

        let mut image_owners: HashMap<ImageDataId, usize> = HashMap::new();
        for simulation in self.visual_simulations.values() {
            exactly_one(
                EntityKind::VisualSimulation,
                simulation.id.raw(),
                visual_owners.get(&simulation.id),
            )?;
            finite(
                EntityKind::VisualSimulation,
                simulation.id.raw(),
                "blurriness",
                simulation.blurriness,
            )?;
            if let Some(image) = simulation.image {
                if !self.images.contains_key(&image) {
                    return Err(dangling(simulation.id.to_string(), EntityKind::ImageData, image.raw()));
                }
                *image_owners.entry(image).or_default() += 1;
            }
        }
        for id in self.images.keys() {
            exactly_one(EntityKind::ImageData, id.raw(), image_owners.get(id))?;
        }

        let mut codes = HashSet::new();
        for color in self.colors.values() {
            if !codes.insert(color.code.as_str()) {
                return Err(Violation::DuplicateColorCode(color.code.clone()));
            }
        }

        let mut effect_names = HashSet::new();
        for effect in self.effects.values() {
            finite(EntityKind::EffectValue, effect.id.raw(), "value", effect.value)?;
            if !effect_names.insert(effect.name.as_str()) {
                return Err(Violation::DuplicateEffectName(effect.name.clone()));
            }
        }

        Ok(())
    }
}

fn dangling(from: String, kind: EntityKind, id: u64) -> Violation {
    Violation::DanglingReference { from, kind, id }
}

fn finite(kind: EntityKind, id: u64, field: &'static str, value: f64) -> Result<(), Violation> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Violation::NonFiniteValue { kind, id, field })
    }
}

fn exactly_one(kind: EntityKind, id: u64, owners: Option<&usize>) -> Result<(), Violation> {
    let owners = owners.copied().unwrap_or(0);
    if owners == 1 {
        Ok(())
    } else {
        Err(Violation::OrphanedChild { kind, id, owners })
    }
}
