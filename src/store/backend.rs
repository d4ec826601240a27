//! Durable storage for the committed graph
//!
//! The whole graph is written as one pretty-printed JSON document. Writes go
//! to a sibling temp file first and are renamed into place, so a crash never
//! leaves a half-written graph behind.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use super::graph::Graph;
use crate::error::{SaveFailure, StoreError};
use crate::model::{
    ColorEntity, EffectValue, ImageData, Preset, TextSetting, User, UserIcon, VisualSimulation,
};

/// Where committed graphs go
pub trait Backend: Send + Sync {
    /// Previously persisted graph, or `None` for a fresh store
    fn load(&self) -> Result<Option<Graph>, StoreError>;

    fn persist(&self, graph: &Graph) -> Result<(), SaveFailure>;

    fn describe(&self) -> String;
}

/// On-disk layout: one array per table
#[derive(Debug, Default, Serialize, Deserialize)]
struct GraphFile {
    next_id: u64,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    presets: Vec<Preset>,
    #[serde(default)]
    text_settings: Vec<TextSetting>,
    #[serde(default)]
    visual_simulations: Vec<VisualSimulation>,
    #[serde(default)]
    colors: Vec<ColorEntity>,
    #[serde(default)]
    images: Vec<ImageData>,
    #[serde(default)]
    user_icons: Vec<UserIcon>,
    #[serde(default)]
    effects: Vec<EffectValue>,
}

impl From<&Graph> for GraphFile {
    fn from(graph: &Graph) -> Self {
        Self {
            next_id: graph.next_id,
            users: graph.users.values().cloned().collect(),
            presets: graph.presets.values().cloned().collect(),
            text_settings: graph.text_settings.values().cloned().collect(),
            visual_simulations: graph.visual_simulations.values().cloned().collect(),
            colors: graph.colors.values().cloned().collect(),
            images: graph.images.values().cloned().collect(),
            user_icons: graph.user_icons.values().cloned().collect(),
            effects: graph.effects.values().cloned().collect(),
        }
    }
}

impl From<GraphFile> for Graph {
    fn from(file: GraphFile) -> Self {
        let mut graph = Graph {
            next_id: file.next_id,
            users: file.users.into_iter().map(|r| (r.id, r)).collect(),
            presets: file.presets.into_iter().map(|r| (r.id, r)).collect(),
            text_settings: file.text_settings.into_iter().map(|r| (r.id, r)).collect(),
            visual_simulations: file
                .visual_simulations
                .into_iter()
                .map(|r| (r.id, r))
                .collect(),
            colors: file.colors.into_iter().map(|r| (r.id, r)).collect(),
            images: file.images.into_iter().map(|r| (r.id, r)).collect(),
            user_icons: file.user_icons.into_iter().map(|r| (r.id, r)).collect(),
            effects: file.effects.into_iter().map(|r| (r.id, r)).collect(),
        };
        // Never hand out an id that a hand-edited file already uses
        graph.next_id = graph.next_id.max(graph.highest_id());
        graph
    }
}

impl Graph {
    fn highest_id(&self) -> u64 {
        let keys = self
            .users
            .keys()
            .map(|k| k.raw())
            .chain(self.presets.keys().map(|k| k.raw()))
            .chain(self.text_settings.keys().map(|k| k.raw()))
            .chain(self.visual_simulations.keys().map(|k| k.raw()))
            .chain(self.colors.keys().map(|k| k.raw()))
            .chain(self.images.keys().map(|k| k.raw()))
            .chain(self.user_icons.keys().map(|k| k.raw()))
            .chain(self.effects.keys().map(|k| k.raw()));
        keys.max().unwrap_or(0)
    }
}

/// Graph stored in a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Backend for JsonFileBackend {
    fn load(&self) -> Result<Option<Graph>, StoreError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "Graph file not found, starting with an empty store");
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| StoreError::Init {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let file: GraphFile = serde_json::from_str(&contents).map_err(|e| StoreError::Init {
            path: self.path.clone(),
            message: format!("invalid graph file: {e}"),
        })?;

        info!(path = %self.path.display(), presets = file.presets.len(), users = file.users.len(), "Loaded graph");
        Ok(Some(Graph::from(file)))
    }

    fn persist(&self, graph: &Graph) -> Result<(), SaveFailure> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    SaveFailure::Persist(format!(
                        "failed to create directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&GraphFile::from(graph))
            .map_err(|e| SaveFailure::Persist(format!("failed to serialize graph: {e}")))?;

        let temp = self.temp_path();
        fs::write(&temp, json).map_err(|e| {
            SaveFailure::Persist(format!("failed to write {}: {e}", temp.display()))
        })?;
        fs::rename(&temp, &self.path).map_err(|e| {
            SaveFailure::Persist(format!("failed to replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), "Persisted graph");
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps the last committed graph in memory only
#[derive(Debug, Default)]
pub struct MemoryBackend {
    last: Mutex<Option<Graph>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing graph, as if it had been loaded from disk
    pub fn with_graph(graph: Graph) -> Self {
        Self {
            last: Mutex::new(Some(graph)),
        }
    }
}

impl Backend for MemoryBackend {
    fn load(&self) -> Result<Option<Graph>, StoreError> {
        Ok(self
            .last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn persist(&self, graph: &Graph) -> Result<(), SaveFailure> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(graph.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
