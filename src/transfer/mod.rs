//! Preset exchange files
//!
//! Export projects one preset into a [`PresetRecord`] and writes it as
//! pretty JSON named after the preset. Import decodes first and only then
//! opens a transaction, so a malformed file never touches the store.
//! Reading and decoding may happen on a worker thread ([`spawn_read`]);
//! the decoded record is handed back to the writer to build the graph.

mod record;

pub use record::{PresetRecord, TextSettingRecord, UserRecord, VisualSimulationRecord};

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

use crate::builder::{BuiltPreset, GraphBuilder};
use crate::constants::transfer::FILE_EXTENSION;
use crate::error::{StoreError, TransferError};
use crate::model::PresetId;
use crate::store::EntityStore;

/// Encoded preset plus the file name a share sheet should suggest
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// `<presetName>.json`, with path separators replaced
pub fn file_name_for(preset_name: &str) -> String {
    let stem: String = preset_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let stem = if stem.trim().is_empty() {
        "preset".to_string()
    } else {
        stem
    };
    format!("{stem}.{FILE_EXTENSION}")
}

pub fn export_preset(store: &EntityStore, preset: PresetId) -> Result<ExportedFile, TransferError> {
    let details = store.preset_details(preset)?;
    let record = PresetRecord::from_details(&details);
    Ok(ExportedFile {
        file_name: file_name_for(&record.name),
        contents: record.to_json()?,
    })
}

/// Write an export into `dir`, returning the full path
pub fn write_export(dir: &Path, file: &ExportedFile) -> Result<PathBuf, TransferError> {
    fs::create_dir_all(dir).map_err(|e| TransferError::from_io(dir, e))?;
    let path = dir.join(&file.file_name);
    fs::write(&path, &file.contents).map_err(|e| TransferError::from_io(&path, e))?;
    info!(path = %path.display(), bytes = file.contents.len(), "Exported preset");
    Ok(path)
}

/// Decode and merge in one call
pub fn import_bytes(
    store: &EntityStore,
    builder: &GraphBuilder<'_>,
    data: &[u8],
) -> Result<BuiltPreset, TransferError> {
    let record = PresetRecord::from_json(data)?;
    import_record(store, builder, record)
}

/// Merge an already decoded record in a single transaction
pub fn import_record(
    store: &EntityStore,
    builder: &GraphBuilder<'_>,
    record: PresetRecord,
) -> Result<BuiltPreset, TransferError> {
    let mut tx = store.transaction();
    let built = builder.preset_from_record(&mut tx, record)?;
    tx.save().map_err(StoreError::from)?;

    info!(
        preset = %built.name,
        user_created = built.user.was_created(),
        color_created = built.color.is_some_and(|c| c.was_created()),
        "Imported preset"
    );
    Ok(built)
}

/// Read and decode a picked file on the calling thread
pub fn read_file(path: &Path) -> Result<PresetRecord, TransferError> {
    let data = fs::read(path).map_err(|e| TransferError::from_io(path, e))?;
    PresetRecord::from_json(&data)
}

/// A file being read and decoded on a worker thread
pub struct PendingImport {
    path: PathBuf,
    handle: JoinHandle<Result<PresetRecord, TransferError>>,
}

impl PendingImport {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker is done and take its record
    pub fn wait(self) -> Result<PresetRecord, TransferError> {
        self.handle.join().unwrap_or_else(|_| {
            error!(path = %self.path.display(), "Preset read worker panicked");
            Err(TransferError::WorkerLost)
        })
    }
}

pub fn spawn_read(path: impl Into<PathBuf>) -> PendingImport {
    let path = path.into();
    let worker_path = path.clone();
    let handle = thread::spawn(move || read_file(&worker_path));
    PendingImport { path, handle }
}
