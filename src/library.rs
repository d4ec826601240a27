//! Preset library: the operations a front end drives
//!
//! Wraps an [`EntityStore`] with the owner profile, preset editing, import
//! and export. Failures the user should see are also published as
//! [`Alert`]s so a UI can show them without threading every error through
//! its own state.

use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::builder::{BuiltPreset, GraphBuilder};
use crate::config::AppConfig;
use crate::constants::seed;
use crate::dedup;
use crate::error::{LibraryError, StoreError, TransferError};
use crate::model::{
    ColorEntity, EffectValue, EntityKind, NewColor, NewUser, Preset, PresetDetails, PresetId, User,
    UserId,
};
use crate::naming::NameGenerator;
use crate::store::{
    EntityStore, JsonFileBackend, PresetFilter, PresetWatch, SortOrder, Transaction, UserFilter,
};
use crate::thumbnail;
use crate::transfer::{self, ExportedFile, PendingImport, PresetRecord};

const ALERT_CAPACITY: usize = 64;

/// User-facing failure notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    SaveFailed(String),
    DecodeFailed(String),
    AccessDenied(String),
}

impl Alert {
    pub fn message(&self) -> &str {
        match self {
            Alert::SaveFailed(message)
            | Alert::DecodeFailed(message)
            | Alert::AccessDenied(message) => message,
        }
    }

    fn for_transfer(err: &TransferError) -> Option<Self> {
        match err {
            TransferError::Decode(_) => Some(Alert::DecodeFailed(err.to_string())),
            TransferError::AccessDenied(_) | TransferError::Io { .. } => {
                Some(Alert::AccessDenied(err.to_string()))
            }
            TransferError::Store(StoreError::Save(_)) => Some(Alert::SaveFailed(err.to_string())),
            TransferError::Encode(_) | TransferError::WorkerLost | TransferError::Store(_) => None,
        }
    }
}

/// What to do with the owner's icon on a profile edit
#[derive(Debug, Clone, Default, PartialEq)]
pub enum IconUpdate {
    #[default]
    Keep,
    Replace(Vec<u8>),
    Remove,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub is_from_countryside: Option<bool>,
    pub icon: IconUpdate,
}

/// Text setting fields to change; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextUpdate {
    pub text: Option<String>,
    pub size: Option<f64>,
    pub weight: Option<f64>,
}

pub struct PresetLibrary {
    store: EntityStore,
    naming: NameGenerator,
    alerts: broadcast::Sender<Alert>,
}

impl PresetLibrary {
    /// Open the store described by `config` and seed reference data
    pub fn open(config: &AppConfig) -> Result<Self, StoreError> {
        let store = if config.store.in_memory {
            info!("Using in-memory store, nothing will be saved");
            EntityStore::in_memory()
        } else {
            EntityStore::open(JsonFileBackend::new(config.graph_path()))?
        };
        Self::open_with(store, config.name_generator())
    }

    pub fn open_with(store: EntityStore, naming: NameGenerator) -> Result<Self, StoreError> {
        seed_reference_data(&store)?;
        let (alerts, _) = broadcast::channel(ALERT_CAPACITY);
        Ok(Self {
            store,
            naming,
            alerts,
        })
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn naming(&self) -> &NameGenerator {
        &self.naming
    }

    pub fn subscribe_alerts(&self) -> broadcast::Receiver<Alert> {
        self.alerts.subscribe()
    }

    fn alert(&self, alert: Alert) {
        warn!(alert = ?alert, "Publishing alert");
        // Nobody listening is fine
        let _ = self.alerts.send(alert);
    }

    fn commit(&self, tx: Transaction<'_>) -> Result<(), LibraryError> {
        tx.save().map_err(|failure| {
            self.alert(Alert::SaveFailed(failure.to_string()));
            LibraryError::from(failure)
        })
    }

    fn report_transfer<T>(&self, result: Result<T, TransferError>) -> Result<T, LibraryError> {
        result.map_err(|err| {
            if let Some(alert) = Alert::for_transfer(&err) {
                self.alert(alert);
            }
            LibraryError::from(err)
        })
    }

    // ==========================================================================
    // Owner profile
    // ==========================================================================

    pub fn owner(&self) -> Option<User> {
        self.store.owner()
    }

    pub fn require_owner(&self) -> Result<User, LibraryError> {
        self.owner().ok_or(LibraryError::NoOwner)
    }

    /// Create the owner profile. A non-owner user with the same name (from an
    /// earlier import) is promoted instead of duplicated.
    pub fn setup_owner(
        &self,
        name: &str,
        is_from_countryside: bool,
        icon: Option<Vec<u8>>,
    ) -> Result<UserId, LibraryError> {
        let mut tx = self.store.transaction();
        if let Some(owner) = tx.graph().owner() {
            return Err(LibraryError::OwnerExists(owner.name.clone()));
        }

        let id = match tx.graph().find_user(name).map(|user| user.id) {
            Some(existing) => {
                tx.update_user(existing, |user| {
                    user.is_owner = true;
                    user.is_from_countryside = is_from_countryside;
                })?;
                existing
            }
            None => tx.create_user(NewUser {
                name: name.to_string(),
                is_from_countryside,
                is_owner: true,
            }),
        };
        if icon.is_some() {
            tx.set_user_icon(id, icon)?;
        }
        self.commit(tx)?;

        info!(user = name, %id, "Set up owner profile");
        Ok(id)
    }

    pub fn update_owner_profile(&self, update: ProfileUpdate) -> Result<User, LibraryError> {
        let owner = self.require_owner()?;

        let mut tx = self.store.transaction();
        tx.update_user(owner.id, |user| {
            if let Some(name) = update.name {
                user.name = name;
            }
            if let Some(flag) = update.is_from_countryside {
                user.is_from_countryside = flag;
            }
        })?;
        match update.icon {
            IconUpdate::Keep => {}
            IconUpdate::Replace(bytes) => tx.set_user_icon(owner.id, Some(bytes))?,
            IconUpdate::Remove => tx.set_user_icon(owner.id, None)?,
        }
        let updated = tx
            .graph()
            .user(owner.id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::User, owner.id.raw()))?;
        self.commit(tx)?;

        debug!(user = %updated.name, "Updated owner profile");
        Ok(updated)
    }

    /// Icon bytes of the owner, if one is set
    pub fn owner_icon(&self) -> Option<Vec<u8>> {
        self.store.read(|graph| {
            let icon = graph.owner()?.icon?;
            graph.user_icon(icon).map(|icon| icon.bytes.clone())
        })
    }

    // ==========================================================================
    // Presets
    // ==========================================================================

    /// New preset for the owner with default contents and the next free name
    pub fn create_preset(&self) -> Result<PresetId, LibraryError> {
        let owner = self.require_owner()?;
        let mut tx = self.store.transaction();
        let preset = GraphBuilder::new(&self.naming).default_preset(&mut tx, owner.id)?;
        self.commit(tx)?;
        info!(%preset, user = %owner.name, "Created preset");
        Ok(preset)
    }

    pub fn rename_preset(&self, preset: PresetId, name: &str) -> Result<(), LibraryError> {
        let mut tx = self.store.transaction();
        tx.rename_preset(preset, name)?;
        self.commit(tx)
    }

    pub fn update_text(&self, preset: PresetId, update: TextUpdate) -> Result<(), LibraryError> {
        let mut tx = self.store.transaction();
        tx.update_text_setting(preset, |setting| {
            if let Some(text) = update.text {
                setting.text = text;
            }
            if let Some(size) = update.size {
                setting.size = size;
            }
            if let Some(weight) = update.weight {
                setting.weight = weight;
            }
        })?;
        self.commit(tx)
    }

    /// Link the preset to a color pair by its code, or clear both links
    pub fn set_color(&self, preset: PresetId, code: Option<&str>) -> Result<(), LibraryError> {
        let mut tx = self.store.transaction();
        let color = match code {
            Some(code) => Some(
                tx.graph()
                    .find_color(code)
                    .map(|color| color.id)
                    .ok_or_else(|| LibraryError::UnknownColor(code.to_string()))?,
            ),
            None => None,
        };
        tx.update_text_setting(preset, |setting| {
            setting.background_color = color;
            setting.text_color = color;
        })?;
        self.commit(tx)
    }

    pub fn set_blurriness(&self, preset: PresetId, blurriness: f64) -> Result<(), LibraryError> {
        let mut tx = self.store.transaction();
        tx.set_blurriness(preset, blurriness)?;
        self.commit(tx)
    }

    /// Attach an image (its thumbnail is generated here) or clear it
    pub fn set_image(&self, preset: PresetId, bytes: Option<Vec<u8>>) -> Result<(), LibraryError> {
        let image = bytes.map(thumbnail::image_draft);
        let mut tx = self.store.transaction();
        tx.set_preset_image(preset, image)?;
        self.commit(tx)
    }

    pub fn delete_preset(&self, preset: PresetId) -> Result<(), LibraryError> {
        let mut tx = self.store.transaction();
        tx.delete_preset(preset)?;
        self.commit(tx)?;
        info!(%preset, "Deleted preset");
        Ok(())
    }

    pub fn preset_details(&self, preset: PresetId) -> Result<PresetDetails, LibraryError> {
        Ok(self.store.preset_details(preset)?)
    }

    fn owner_filter(&self) -> Option<PresetFilter> {
        self.owner().map(|owner| PresetFilter::owned_by(owner.id))
    }

    fn others_filter(&self) -> PresetFilter {
        self.owner()
            .map(|owner| PresetFilter::not_owned_by(owner.id))
            .unwrap_or_else(PresetFilter::all)
    }

    /// The owner's presets by name; empty before setup
    pub fn owner_presets(&self) -> Vec<Preset> {
        self.owner_filter()
            .map(|filter| self.store.fetch_presets(&filter, SortOrder::ByName))
            .unwrap_or_default()
    }

    /// Presets of every other user, by name
    pub fn other_presets(&self) -> Vec<Preset> {
        self.store.fetch_presets(&self.others_filter(), SortOrder::ByName)
    }

    pub fn watch_owner_presets(&self) -> Result<PresetWatch<'_>, LibraryError> {
        let filter = self.owner_filter().ok_or(LibraryError::NoOwner)?;
        Ok(self.store.watch_presets(filter))
    }

    pub fn watch_other_presets(&self) -> PresetWatch<'_> {
        self.store.watch_presets(self.others_filter())
    }

    /// Look a preset up by name in the owner's collection
    pub fn find_owner_preset(&self, name: &str) -> Result<Preset, LibraryError> {
        let filter = self.owner_filter().ok_or(LibraryError::NoOwner)?.named(name);
        self.store
            .fetch_presets(&filter, SortOrder::ByName)
            .into_iter()
            .next()
            .ok_or_else(|| LibraryError::UnknownPreset(name.to_string()))
    }

    /// Owner's collection first, then everyone else's
    pub fn find_any_preset(&self, name: &str) -> Result<Preset, LibraryError> {
        if let Ok(preset) = self.find_owner_preset(name) {
            return Ok(preset);
        }
        self.store
            .fetch_presets(&self.others_filter().named(name), SortOrder::ByName)
            .into_iter()
            .next()
            .ok_or_else(|| LibraryError::UnknownPreset(name.to_string()))
    }

    // ==========================================================================
    // Import / export
    // ==========================================================================

    pub fn export_preset(&self, preset: PresetId) -> Result<ExportedFile, LibraryError> {
        self.report_transfer(transfer::export_preset(&self.store, preset))
    }

    pub fn export_to(&self, preset: PresetId, dir: &Path) -> Result<PathBuf, LibraryError> {
        let file = self.export_preset(preset)?;
        self.report_transfer(transfer::write_export(dir, &file))
    }

    pub fn import_bytes(&self, data: &[u8]) -> Result<BuiltPreset, LibraryError> {
        let builder = GraphBuilder::new(&self.naming);
        self.report_transfer(transfer::import_bytes(&self.store, &builder, data))
    }

    pub fn import_file(&self, path: &Path) -> Result<BuiltPreset, LibraryError> {
        let record = self.report_transfer(transfer::read_file(path))?;
        self.import_record(record)
    }

    /// Start reading a picked file on a worker thread
    pub fn begin_import(&self, path: impl Into<PathBuf>) -> PendingImport {
        let pending = transfer::spawn_read(path);
        debug!(path = %pending.path().display(), "Started background preset read");
        pending
    }

    /// Wait for a background read and merge its record
    pub fn finish_import(&self, pending: PendingImport) -> Result<BuiltPreset, LibraryError> {
        let record = self.report_transfer(pending.wait())?;
        self.import_record(record)
    }

    fn import_record(&self, record: PresetRecord) -> Result<BuiltPreset, LibraryError> {
        let builder = GraphBuilder::new(&self.naming);
        self.report_transfer(transfer::import_record(&self.store, &builder, record))
    }

    // ==========================================================================
    // Reference data
    // ==========================================================================

    pub fn colors(&self) -> Vec<ColorEntity> {
        self.store.fetch_colors()
    }

    pub fn effects(&self) -> Vec<EffectValue> {
        self.store.fetch_effects()
    }

    pub fn set_effect(&self, name: &str, value: f64) -> Result<(), LibraryError> {
        let mut tx = self.store.transaction();
        let id = tx
            .graph()
            .find_effect(name)
            .map(|effect| effect.id)
            .ok_or_else(|| LibraryError::UnknownEffect(name.to_string()))?;
        tx.set_effect_value(id, value)?;
        self.commit(tx)
    }

    pub fn users(&self) -> Vec<User> {
        self.store.fetch_users(&UserFilter::default(), SortOrder::ByName)
    }
}

/// Insert the default color pairs and effect catalog where missing
fn seed_reference_data(store: &EntityStore) -> Result<(), StoreError> {
    let mut tx = store.transaction();
    let mut created = 0;
    for (background, text, background_code, text_code) in seed::COLOR_PAIRS {
        let code = NewColor::pair_key(background, text);
        if dedup::resolve_color(&mut tx, &code, background_code, text_code).was_created() {
            created += 1;
        }
    }
    for (name, value) in seed::EFFECTS {
        if tx.graph().find_effect(name).is_none() {
            tx.create_effect(name, value);
            created += 1;
        }
    }

    if tx.has_changes() {
        tx.save()?;
        info!(created, "Seeded reference data");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SaveFailure;
    use crate::store::MemoryBackend;
    use tokio::sync::broadcast::error::TryRecvError;

    fn library() -> PresetLibrary {
        PresetLibrary::open_with(EntityStore::in_memory(), NameGenerator::default()).unwrap()
    }

    fn library_with_owner() -> PresetLibrary {
        let library = library();
        library.setup_owner("Alice", false, None).unwrap();
        library
    }

    const BOB_RECORD: &str = r#"{
        "name": "Reading",
        "textSetting": { "textFieldData": "Hi", "textSize": 20, "textWeight": 0.6,
                         "colorCode": "Black,Yellow" },
        "visualSimulation": { "blurriness": 30 },
        "user": { "name": "Bob", "isFromCountryside": true }
    }"#;

    #[test]
    fn test_open_seeds_reference_data_once() {
        let library = library();
        let codes: Vec<String> = library.colors().into_iter().map(|c| c.code).collect();
        assert_eq!(
            codes,
            vec!["Black,White", "Black,Yellow", "Blue,Yellow", "White,Black", "Yellow,Blue"]
        );
        let effects: Vec<String> = library.effects().into_iter().map(|e| e.name).collect();
        assert_eq!(effects, vec!["Blur", "Contrast"]);

        let graph = library.store().read(|g| g.clone());
        let reopened = PresetLibrary::open_with(
            EntityStore::open(MemoryBackend::with_graph(graph)).unwrap(),
            NameGenerator::default(),
        )
        .unwrap();
        assert_eq!(reopened.colors().len(), 5);
        assert_eq!(reopened.effects().len(), 2);
    }

    #[test]
    fn test_open_from_config_in_memory() {
        let mut config = AppConfig::default();
        config.store.in_memory = true;
        let library = PresetLibrary::open(&config).unwrap();
        assert_eq!(library.colors().len(), 5);
        assert!(library.owner().is_none());
    }

    #[test]
    fn test_open_from_config_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.store.path = Some(dir.path().join("graph.json"));

        {
            let library = PresetLibrary::open(&config).unwrap();
            library.setup_owner("Alice", true, None).unwrap();
            library.create_preset().unwrap();
        }

        let library = PresetLibrary::open(&config).unwrap();
        assert_eq!(library.require_owner().unwrap().name, "Alice");
        assert_eq!(library.owner_presets().len(), 1);
        assert_eq!(library.colors().len(), 5);
    }

    #[test]
    fn test_setup_owner_twice_fails() {
        let library = library_with_owner();
        let result = library.setup_owner("Someone", false, None);
        assert!(matches!(result, Err(LibraryError::OwnerExists(name)) if name == "Alice"));
    }

    #[test]
    fn test_setup_owner_promotes_imported_user() {
        let library = library();
        let built = library.import_bytes(BOB_RECORD.as_bytes()).unwrap();

        let owner = library.setup_owner("Bob", false, Some(vec![1, 2])).unwrap();
        assert_eq!(owner, built.user.id());
        assert_eq!(library.users().len(), 1);
        assert_eq!(library.owner_presets().len(), 1);
        assert_eq!(library.owner_icon(), Some(vec![1, 2]));
    }

    #[test]
    fn test_profile_icon_keep_replace_remove() {
        let library = library();
        library.setup_owner("Alice", false, Some(vec![1])).unwrap();

        let user = library
            .update_owner_profile(ProfileUpdate {
                name: Some("Alicia".to_string()),
                is_from_countryside: Some(true),
                icon: IconUpdate::Keep,
            })
            .unwrap();
        assert_eq!(user.name, "Alicia");
        assert!(user.is_from_countryside);
        assert_eq!(library.owner_icon(), Some(vec![1]));

        library
            .update_owner_profile(ProfileUpdate {
                icon: IconUpdate::Replace(vec![9, 9]),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(library.owner_icon(), Some(vec![9, 9]));
        assert_eq!(library.store().read(|g| g.user_icons.len()), 1);

        library
            .update_owner_profile(ProfileUpdate {
                icon: IconUpdate::Remove,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(library.owner_icon(), None);
        assert!(library.store().read(|g| g.user_icons.is_empty()));
    }

    #[test]
    fn test_profile_edit_without_owner() {
        let result = library().update_owner_profile(ProfileUpdate::default());
        assert!(matches!(result, Err(LibraryError::NoOwner)));
    }

    #[test]
    fn test_create_preset_requires_owner() {
        assert!(matches!(library().create_preset(), Err(LibraryError::NoOwner)));
    }

    #[test]
    fn test_created_presets_get_unique_names() {
        let library = library_with_owner();
        for _ in 0..3 {
            library.create_preset().unwrap();
        }
        let names: Vec<String> = library.owner_presets().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["New Preset", "New Preset 1", "New Preset 2"]);
    }

    #[test]
    fn test_rename_collision_alerts_and_changes_nothing() {
        let library = library_with_owner();
        let first = library.create_preset().unwrap();
        let second = library.create_preset().unwrap();
        let mut alerts = library.subscribe_alerts();
        let before = library.store().read(|g| g.clone());

        let result = library.rename_preset(second, "New Preset");

        assert!(matches!(
            result,
            Err(LibraryError::Store(StoreError::Save(SaveFailure::Constraint(_))))
        ));
        assert!(matches!(alerts.try_recv(), Ok(Alert::SaveFailed(_))));
        assert_eq!(library.store().read(|g| g.clone()), before);

        library.rename_preset(first, "Reading").unwrap();
        assert_eq!(library.preset_details(first).unwrap().preset.name, "Reading");
    }

    #[test]
    fn test_edit_text_color_blur_and_image() {
        let library = library_with_owner();
        let preset = library.create_preset().unwrap();

        library
            .update_text(
                preset,
                TextUpdate {
                    text: Some("Large print".to_string()),
                    size: Some(30.0),
                    ..Default::default()
                },
            )
            .unwrap();
        library.set_color(preset, Some("Yellow,Blue")).unwrap();
        library.set_blurriness(preset, 64.0).unwrap();
        let photo = thumbnail::tests::sample_png(640, 480);
        library.set_image(preset, Some(photo.clone())).unwrap();

        let details = library.preset_details(preset).unwrap();
        assert_eq!(details.text_setting.text, "Large print");
        assert_eq!(details.text_setting.size, 30.0);
        assert_eq!(details.text_setting.weight, 0.5);
        assert_eq!(details.background_color.unwrap().code, "Yellow,Blue");
        assert_eq!(details.text_color.unwrap().text_code, "#0000FF");
        assert_eq!(details.visual_simulation.blurriness, 64.0);
        let image = details.image.unwrap();
        assert_eq!(image.bytes, photo);
        assert_eq!(thumbnail::tests::dimensions(&image.thumbnail.unwrap()), (100, 75));

        library.set_color(preset, None).unwrap();
        library.set_image(preset, None).unwrap();
        let details = library.preset_details(preset).unwrap();
        assert!(details.background_color.is_none());
        assert!(details.image.is_none());
        assert!(library.store().read(|g| g.images.is_empty()));
    }

    #[test]
    fn test_unknown_color_is_rejected() {
        let library = library_with_owner();
        let preset = library.create_preset().unwrap();
        let result = library.set_color(preset, Some("Pink,Green"));
        assert!(matches!(result, Err(LibraryError::UnknownColor(code)) if code == "Pink,Green"));
    }

    #[test]
    fn test_imported_presets_listed_as_others() {
        let library = library_with_owner();
        library.create_preset().unwrap();
        let built = library.import_bytes(BOB_RECORD.as_bytes()).unwrap();

        assert!(!built.color.unwrap().was_created());
        let others = library.other_presets();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].name, "Reading");
        assert_eq!(library.owner_presets().len(), 1);

        assert!(matches!(
            library.find_owner_preset("Reading"),
            Err(LibraryError::UnknownPreset(_))
        ));
        let found = library.find_any_preset("Reading").unwrap();
        library.delete_preset(found.id).unwrap();
        assert!(library.other_presets().is_empty());
        // Bob and the shared color stay
        assert_eq!(library.users().len(), 2);
        assert_eq!(library.colors().len(), 5);
    }

    #[test]
    fn test_decode_failure_alerts() {
        let library = library_with_owner();
        let mut alerts = library.subscribe_alerts();

        let result = library.import_bytes(b"not json");

        assert!(matches!(
            result,
            Err(LibraryError::Transfer(TransferError::Decode(_)))
        ));
        assert!(matches!(alerts.try_recv(), Ok(Alert::DecodeFailed(_))));
        assert!(library.other_presets().is_empty());
    }

    #[test]
    fn test_missing_file_alerts_access() {
        let library = library();
        let dir = tempfile::tempdir().unwrap();
        let mut alerts = library.subscribe_alerts();

        let result = library.import_file(&dir.path().join("gone.json"));

        assert!(result.is_err());
        let alert = alerts.try_recv().unwrap();
        assert!(matches!(alert, Alert::AccessDenied(_)));
        assert!(alert.message().contains("gone.json"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_access_denied() {
        use std::os::unix::fs::PermissionsExt;

        let library = library_with_owner();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.json");
        std::fs::write(&path, BOB_RECORD).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::read(&path).is_ok() {
            // Running with CAP_DAC_OVERRIDE (root); permissions are not enforced
            return;
        }
        let mut alerts = library.subscribe_alerts();
        let before = library.store().read(|g| g.clone());

        let result = library.import_file(&path);

        assert!(matches!(
            result,
            Err(LibraryError::Transfer(TransferError::AccessDenied(denied))) if denied == path
        ));
        assert!(matches!(alerts.try_recv(), Ok(Alert::AccessDenied(_))));
        assert_eq!(library.store().read(|g| g.clone()), before);
    }

    #[test]
    fn test_non_finite_edits_rejected() {
        let library = library_with_owner();
        let preset = library.create_preset().unwrap();
        let mut alerts = library.subscribe_alerts();
        let before = library.store().read(|g| g.clone());

        assert!(library.set_blurriness(preset, f64::NAN).is_err());
        assert!(library
            .update_text(
                preset,
                TextUpdate {
                    size: Some(f64::INFINITY),
                    ..Default::default()
                },
            )
            .is_err());
        assert!(library.set_effect("Blur", f64::NEG_INFINITY).is_err());

        for _ in 0..3 {
            assert!(matches!(alerts.try_recv(), Ok(Alert::SaveFailed(_))));
        }
        assert_eq!(library.store().read(|g| g.clone()), before);
    }

    #[test]
    fn test_file_store_reopens_after_rejected_blur() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.store.path = Some(dir.path().join("graph.json"));

        let exported = {
            let library = PresetLibrary::open(&config).unwrap();
            library.setup_owner("Alice", false, None).unwrap();
            let preset = library.create_preset().unwrap();
            library.set_blurriness(preset, 42.0).unwrap();
            assert!(library.set_blurriness(preset, f64::NAN).is_err());
            library.export_preset(preset).unwrap()
        };

        let library = PresetLibrary::open(&config).unwrap();
        let preset = library.find_owner_preset("New Preset").unwrap();
        let details = library.preset_details(preset.id).unwrap();
        assert_eq!(details.visual_simulation.blurriness, 42.0);

        let target = library_with_owner();
        let built = target.import_bytes(&exported.contents).unwrap();
        let imported = target.preset_details(built.preset).unwrap();
        assert_eq!(imported.visual_simulation.blurriness, 42.0);
    }

    #[test]
    fn test_owner_rename_to_existing_user_rejected() {
        let library = library_with_owner();
        let bob = library.import_bytes(BOB_RECORD.as_bytes()).unwrap().user.id();
        let mut alerts = library.subscribe_alerts();

        let result = library.update_owner_profile(ProfileUpdate {
            name: Some("Bob".to_string()),
            ..Default::default()
        });

        assert!(matches!(
            result,
            Err(LibraryError::Store(StoreError::Save(SaveFailure::Constraint(
                crate::error::Violation::DuplicateUserName(name)
            )))) if name == "Bob"
        ));
        assert!(matches!(alerts.try_recv(), Ok(Alert::SaveFailed(_))));
        assert_eq!(library.require_owner().unwrap().name, "Alice");

        let again = library.import_bytes(BOB_RECORD.as_bytes()).unwrap();
        assert_eq!(again.user, crate::dedup::Resolution::Existing(bob));
        assert!(!library.preset_details(again.preset).unwrap().user.is_owner);
    }

    #[test]
    fn test_racing_setups_leave_one_owner() {
        let library = library();
        let results: Vec<Result<UserId, LibraryError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["Alice", "Bob", "Carol"]
                .into_iter()
                .map(|name| {
                    let library = &library;
                    scope.spawn(move || library.setup_owner(name, false, None))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, LibraryError::OwnerExists(_))));
        assert_eq!(library.users().len(), 1);
    }

    #[test]
    fn test_export_then_background_import() {
        let source = library_with_owner();
        let preset = source.create_preset().unwrap();
        source.set_color(preset, Some("Black,Yellow")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = source.export_to(preset, dir.path()).unwrap();
        assert!(path.ends_with("New Preset.json"));

        let target = library();
        let pending = target.begin_import(&path);
        let built = target.finish_import(pending).unwrap();

        assert_eq!(built.name, "New Preset");
        let details = target.preset_details(built.preset).unwrap();
        assert_eq!(details.user.name, "Alice");
        assert!(!details.user.is_owner);
        assert_eq!(details.background_color.unwrap().code, "Black,Yellow");
        assert_eq!(target.colors().len(), 5);
    }

    #[test]
    fn test_watch_follows_owner_presets() {
        let library = library_with_owner();
        let mut watch = library.watch_owner_presets().unwrap();
        assert!(watch.current().is_empty());

        library.create_preset().unwrap();
        library.import_bytes(BOB_RECORD.as_bytes()).unwrap();

        assert!(watch.refresh());
        assert_eq!(watch.current().len(), 1);
    }

    #[test]
    fn test_set_effect_by_name() {
        let library = library();
        library.set_effect("Blur", 12.5).unwrap();
        let blur = library.effects().into_iter().find(|e| e.name == "Blur").unwrap();
        assert_eq!(blur.value, 12.5);

        let result = library.set_effect("Glare", 1.0);
        assert!(matches!(result, Err(LibraryError::UnknownEffect(_))));
    }

    #[test]
    fn test_no_alerts_for_successful_edits() {
        let library = library_with_owner();
        let mut alerts = library.subscribe_alerts();
        library.create_preset().unwrap();
        assert!(matches!(alerts.try_recv(), Err(TryRecvError::Empty)));
    }
}
