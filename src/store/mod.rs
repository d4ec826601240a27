//! Entity store: committed graph, serialized transactions and live queries
//!
//! Writers go through [`EntityStore::transaction`], which holds the writer
//! lock and edits a private copy of the committed graph. [`Transaction::save`]
//! validates, persists and publishes that copy in one step, or leaves the
//! committed graph untouched. Readers only ever see committed state.

mod backend;
mod events;
mod graph;
mod watch;

pub use backend::{Backend, JsonFileBackend, MemoryBackend};
pub use events::{Change, ChangeEvent};
pub use graph::{Graph, PresetFilter, SortOrder, UserFilter};
pub use watch::PresetWatch;

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::{SaveFailure, StoreError};
use crate::model::{
    ColorEntity, ColorId, EffectValue, EffectValueId, EntityKind, ImageData, ImageDataId,
    ImageDraft, NewColor, NewUser, Preset, PresetDetails, PresetDraft, PresetId, TextSetting,
    TextSettingId, User, UserIcon, UserIconId, UserId, VisualSimulation, VisualSimulationId,
};
use events::ChangeLog;

/// Buffered change events per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 1024;

pub struct EntityStore {
    committed: RwLock<Graph>,
    writer: Mutex<()>,
    backend: Box<dyn Backend>,
    events: broadcast::Sender<ChangeEvent>,
}

impl EntityStore {
    /// Open a store, loading whatever the backend has persisted.
    /// A graph that fails its integrity check is treated as unreadable.
    pub fn open(backend: impl Backend + 'static) -> Result<Self, StoreError> {
        let graph = backend.load()?.unwrap_or_default();
        graph.validate().map_err(|violation| StoreError::Init {
            path: backend.describe().into(),
            message: violation.to_string(),
        })?;

        info!(backend = %backend.describe(), presets = graph.presets.len(), "Opened entity store");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            committed: RwLock::new(graph),
            writer: Mutex::new(()),
            backend: Box::new(backend),
            events,
        })
    }

    pub fn in_memory() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            committed: RwLock::new(Graph::default()),
            writer: Mutex::new(()),
            backend: Box::new(MemoryBackend::new()),
            events,
        }
    }

    /// Begin a transaction. Blocks while another transaction is open.
    pub fn transaction(&self) -> Transaction<'_> {
        let writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let working = self.read(|graph| graph.clone());
        Transaction {
            store: self,
            _writer: writer,
            working,
            changes: ChangeLog::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Run a closure against the committed graph
    pub fn read<T>(&self, f: impl FnOnce(&Graph) -> T) -> T {
        let graph = self.committed.read().unwrap_or_else(PoisonError::into_inner);
        f(&graph)
    }

    pub fn fetch_presets(&self, filter: &PresetFilter, order: SortOrder) -> Vec<Preset> {
        self.read(|graph| graph.fetch_presets(filter, order))
    }

    pub fn fetch_users(&self, filter: &UserFilter, order: SortOrder) -> Vec<User> {
        self.read(|graph| graph.fetch_users(filter, order))
    }

    pub fn fetch_colors(&self) -> Vec<ColorEntity> {
        self.read(|graph| graph.fetch_colors())
    }

    pub fn fetch_effects(&self) -> Vec<EffectValue> {
        self.read(|graph| graph.fetch_effects())
    }

    pub fn owner(&self) -> Option<User> {
        self.read(|graph| graph.owner().cloned())
    }

    pub fn preset_details(&self, id: PresetId) -> Result<PresetDetails, StoreError> {
        self.read(|graph| graph.preset_details(id))
            .ok_or_else(|| StoreError::not_found(EntityKind::Preset, id.raw()))
    }

    /// Sorted presets matching `filter`, refreshed as commits land
    pub fn watch_presets(&self, filter: PresetFilter) -> PresetWatch<'_> {
        PresetWatch::new(self, filter)
    }

    fn commit(&self, working: Graph, changes: ChangeLog) -> Result<(), SaveFailure> {
        if let Err(violation) = working.validate() {
            warn!(error = %violation, "Rejected commit");
            return Err(SaveFailure::Constraint(violation));
        }

        if let Err(e) = self.backend.persist(&working) {
            warn!(error = %e, backend = %self.backend.describe(), "Rejected commit");
            return Err(e);
        }

        debug!(changes = changes.len(), "Committed transaction");
        *self.committed.write().unwrap_or_else(PoisonError::into_inner) = working;
        for event in changes.into_events() {
            // No receivers is fine
            let _ = self.events.send(event);
        }
        Ok(())
    }
}

/// An open write transaction. Dropping it without [`save`](Self::save)
/// discards every change.
pub struct Transaction<'s> {
    store: &'s EntityStore,
    _writer: MutexGuard<'s, ()>,
    working: Graph,
    changes: ChangeLog,
}

impl Transaction<'_> {
    /// The transaction's own view, including uncommitted writes
    pub fn graph(&self) -> &Graph {
        &self.working
    }

    pub fn fetch_presets(&self, filter: &PresetFilter, order: SortOrder) -> Vec<Preset> {
        self.working.fetch_presets(filter, order)
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Validate, persist and publish. On error nothing is committed.
    pub fn save(self) -> Result<(), SaveFailure> {
        if self.changes.is_empty() {
            return Ok(());
        }
        self.store.commit(self.working, self.changes)
    }

    /// Explicitly discard the transaction
    pub fn rollback(self) {
        debug!(changes = self.changes.len(), "Rolled back transaction");
    }

    fn record(&mut self, collection: EntityKind, id: u64, change: Change) {
        self.changes.record(collection, id, change);
    }

    // ==========================================================================
    // Users
    // ==========================================================================

    pub fn create_user(&mut self, new: NewUser) -> UserId {
        let id = UserId(self.working.allocate());
        self.working.users.insert(
            id,
            User {
                id,
                name: new.name,
                is_from_countryside: new.is_from_countryside,
                is_owner: new.is_owner,
                icon: None,
            },
        );
        self.record(EntityKind::User, id.raw(), Change::Inserted);
        id
    }

    /// Edit a user's plain attributes. The id and icon link cannot be changed
    /// through this; use [`set_user_icon`](Self::set_user_icon).
    pub fn update_user(
        &mut self,
        id: UserId,
        edit: impl FnOnce(&mut User),
    ) -> Result<(), StoreError> {
        let user = self
            .working
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::User, id.raw()))?;
        let icon = user.icon;
        edit(user);
        user.id = id;
        user.icon = icon;
        self.record(EntityKind::User, id.raw(), Change::Updated);
        Ok(())
    }

    /// Replace or remove a user's icon; the previous icon row is deleted
    pub fn set_user_icon(&mut self, id: UserId, bytes: Option<Vec<u8>>) -> Result<(), StoreError> {
        let previous = self
            .working
            .users
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::User, id.raw()))?
            .icon;

        if let Some(old) = previous {
            self.working.user_icons.remove(&old);
            self.record(EntityKind::UserIcon, old.raw(), Change::Deleted);
        }

        let icon = bytes.map(|bytes| {
            let icon = UserIconId(self.working.allocate());
            self.working.user_icons.insert(icon, UserIcon { id: icon, bytes });
            icon
        });
        if let Some(icon) = icon {
            self.record(EntityKind::UserIcon, icon.raw(), Change::Inserted);
        }

        if let Some(user) = self.working.users.get_mut(&id) {
            user.icon = icon;
        }
        self.record(EntityKind::User, id.raw(), Change::Updated);
        Ok(())
    }

    /// Delete a user together with all of its presets and its icon
    pub fn delete_user(&mut self, id: UserId) -> Result<(), StoreError> {
        let user = self
            .working
            .users
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::User, id.raw()))?;
        self.record(EntityKind::User, id.raw(), Change::Deleted);

        let owned: Vec<PresetId> = self
            .working
            .presets
            .values()
            .filter(|p| p.user == id)
            .map(|p| p.id)
            .collect();
        for preset in owned {
            self.delete_preset(preset)?;
        }

        if let Some(icon) = user.icon {
            self.working.user_icons.remove(&icon);
            self.record(EntityKind::UserIcon, icon.raw(), Change::Deleted);
        }
        Ok(())
    }

    // ==========================================================================
    // Presets
    // ==========================================================================

    /// Create a preset together with its text setting, visual simulation and
    /// optional image
    pub fn create_preset(&mut self, draft: PresetDraft) -> Result<PresetId, StoreError> {
        if !self.working.users.contains_key(&draft.user) {
            return Err(StoreError::not_found(EntityKind::User, draft.user.raw()));
        }
        self.ensure_colors(&[draft.text.background_color, draft.text.text_color])?;

        let text_id = TextSettingId(self.working.allocate());
        self.working.text_settings.insert(
            text_id,
            TextSetting {
                id: text_id,
                text: draft.text.text,
                size: draft.text.size,
                weight: draft.text.weight,
                background_color: draft.text.background_color,
                text_color: draft.text.text_color,
            },
        );
        self.record(EntityKind::TextSetting, text_id.raw(), Change::Inserted);

        let image = draft.visual.image.map(|image| self.insert_image(image));
        let visual_id = VisualSimulationId(self.working.allocate());
        self.working.visual_simulations.insert(
            visual_id,
            VisualSimulation {
                id: visual_id,
                blurriness: draft.visual.blurriness,
                image,
            },
        );
        self.record(EntityKind::VisualSimulation, visual_id.raw(), Change::Inserted);

        let id = PresetId(self.working.allocate());
        self.working.presets.insert(
            id,
            Preset {
                id,
                name: draft.name,
                user: draft.user,
                text_setting: text_id,
                visual_simulation: visual_id,
            },
        );
        self.record(EntityKind::Preset, id.raw(), Change::Inserted);
        Ok(id)
    }

    pub fn rename_preset(&mut self, id: PresetId, name: impl Into<String>) -> Result<(), StoreError> {
        let preset = self
            .working
            .presets
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Preset, id.raw()))?;
        preset.name = name.into();
        self.record(EntityKind::Preset, id.raw(), Change::Updated);
        Ok(())
    }

    /// Edit the preset's text setting. Color links must point at existing colors.
    pub fn update_text_setting(
        &mut self,
        preset: PresetId,
        edit: impl FnOnce(&mut TextSetting),
    ) -> Result<(), StoreError> {
        let id = self.preset_row(preset)?.text_setting;
        let mut setting = self
            .working
            .text_settings
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::TextSetting, id.raw()))?
            .clone();
        edit(&mut setting);
        setting.id = id;
        self.ensure_colors(&[setting.background_color, setting.text_color])?;
        self.working.text_settings.insert(id, setting);
        self.record(EntityKind::TextSetting, id.raw(), Change::Updated);
        self.record(EntityKind::Preset, preset.raw(), Change::Updated);
        Ok(())
    }

    pub fn set_blurriness(&mut self, preset: PresetId, blurriness: f64) -> Result<(), StoreError> {
        let id = self.preset_row(preset)?.visual_simulation;
        let simulation = self
            .working
            .visual_simulations
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::VisualSimulation, id.raw()))?;
        simulation.blurriness = blurriness;
        self.record(EntityKind::VisualSimulation, id.raw(), Change::Updated);
        self.record(EntityKind::Preset, preset.raw(), Change::Updated);
        Ok(())
    }

    /// Replace or clear the preset's image; the previous image row is deleted
    pub fn set_preset_image(
        &mut self,
        preset: PresetId,
        image: Option<ImageDraft>,
    ) -> Result<(), StoreError> {
        let id = self.preset_row(preset)?.visual_simulation;
        let previous = self
            .working
            .visual_simulations
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::VisualSimulation, id.raw()))?
            .image;

        if let Some(old) = previous {
            self.working.images.remove(&old);
            self.record(EntityKind::ImageData, old.raw(), Change::Deleted);
        }
        let image = image.map(|image| self.insert_image(image));
        if let Some(simulation) = self.working.visual_simulations.get_mut(&id) {
            simulation.image = image;
        }
        self.record(EntityKind::VisualSimulation, id.raw(), Change::Updated);
        self.record(EntityKind::Preset, preset.raw(), Change::Updated);
        Ok(())
    }

    /// Delete a preset and everything it owns. Colors and the user stay.
    pub fn delete_preset(&mut self, id: PresetId) -> Result<(), StoreError> {
        let preset = self
            .working
            .presets
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Preset, id.raw()))?;
        self.record(EntityKind::Preset, id.raw(), Change::Deleted);

        if self.working.text_settings.remove(&preset.text_setting).is_some() {
            self.record(EntityKind::TextSetting, preset.text_setting.raw(), Change::Deleted);
        }
        if let Some(simulation) = self
            .working
            .visual_simulations
            .remove(&preset.visual_simulation)
        {
            self.record(EntityKind::VisualSimulation, simulation.id.raw(), Change::Deleted);
            if let Some(image) = simulation.image {
                self.working.images.remove(&image);
                self.record(EntityKind::ImageData, image.raw(), Change::Deleted);
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Shared reference data
    // ==========================================================================

    pub fn create_color(&mut self, new: NewColor) -> ColorId {
        let id = ColorId(self.working.allocate());
        self.working.colors.insert(
            id,
            ColorEntity {
                id,
                code: new.code,
                background_code: new.background_code,
                text_code: new.text_code,
            },
        );
        self.record(EntityKind::Color, id.raw(), Change::Inserted);
        id
    }

    /// Delete a color; text settings that used it lose the link
    pub fn delete_color(&mut self, id: ColorId) -> Result<(), StoreError> {
        self.working
            .colors
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Color, id.raw()))?;
        self.record(EntityKind::Color, id.raw(), Change::Deleted);

        let mut touched = Vec::new();
        for setting in self.working.text_settings.values_mut() {
            let mut changed = false;
            if setting.background_color == Some(id) {
                setting.background_color = None;
                changed = true;
            }
            if setting.text_color == Some(id) {
                setting.text_color = None;
                changed = true;
            }
            if changed {
                touched.push(setting.id);
            }
        }
        let presets: Vec<PresetId> = self
            .working
            .presets
            .values()
            .filter(|p| touched.contains(&p.text_setting))
            .map(|p| p.id)
            .collect();
        for setting in touched {
            self.record(EntityKind::TextSetting, setting.raw(), Change::Updated);
        }
        for preset in presets {
            self.record(EntityKind::Preset, preset.raw(), Change::Updated);
        }
        Ok(())
    }

    pub fn create_effect(&mut self, name: impl Into<String>, value: f64) -> EffectValueId {
        let id = EffectValueId(self.working.allocate());
        self.working.effects.insert(
            id,
            EffectValue {
                id,
                name: name.into(),
                value,
            },
        );
        self.record(EntityKind::EffectValue, id.raw(), Change::Inserted);
        id
    }

    pub fn set_effect_value(&mut self, id: EffectValueId, value: f64) -> Result<(), StoreError> {
        let effect = self
            .working
            .effects
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::EffectValue, id.raw()))?;
        effect.value = value;
        self.record(EntityKind::EffectValue, id.raw(), Change::Updated);
        Ok(())
    }

    pub fn delete_effect(&mut self, id: EffectValueId) -> Result<(), StoreError> {
        self.working
            .effects
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::EffectValue, id.raw()))?;
        self.record(EntityKind::EffectValue, id.raw(), Change::Deleted);
        Ok(())
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    fn preset_row(&self, id: PresetId) -> Result<&Preset, StoreError> {
        self.working
            .presets
            .get(&id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Preset, id.raw()))
    }

    fn ensure_colors(&self, colors: &[Option<ColorId>]) -> Result<(), StoreError> {
        for color in colors.iter().flatten() {
            if !self.working.colors.contains_key(color) {
                return Err(StoreError::not_found(EntityKind::Color, color.raw()));
            }
        }
        Ok(())
    }

    fn insert_image(&mut self, image: ImageDraft) -> ImageDataId {
        let id = ImageDataId(self.working.allocate());
        self.working.images.insert(
            id,
            ImageData {
                id,
                bytes: image.bytes,
                thumbnail: image.thumbnail,
            },
        );
        self.record(EntityKind::ImageData, id.raw(), Change::Inserted);
        id
    }
}
