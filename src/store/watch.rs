//! Live preset queries
//!
//! A watch keeps the last sorted result of a filter and re-reads it only
//! after a commit touched the preset collection.

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::debug;

use super::events::ChangeEvent;
use super::graph::{PresetFilter, SortOrder};
use super::EntityStore;
use crate::model::{EntityKind, Preset};

pub struct PresetWatch<'s> {
    store: &'s EntityStore,
    filter: PresetFilter,
    events: broadcast::Receiver<ChangeEvent>,
    current: Vec<Preset>,
}

impl<'s> PresetWatch<'s> {
    pub(super) fn new(store: &'s EntityStore, filter: PresetFilter) -> Self {
        // Subscribe before the first read so no commit slips in between
        let events = store.subscribe();
        let current = store.fetch_presets(&filter, SortOrder::ByName);
        Self {
            store,
            filter,
            events,
            current,
        }
    }

    pub fn current(&self) -> &[Preset] {
        &self.current
    }

    pub fn filter(&self) -> &PresetFilter {
        &self.filter
    }

    /// Drain pending change events and re-read if any preset changed.
    /// Returns `true` when the result was re-read.
    pub fn refresh(&mut self) -> bool {
        let mut stale = false;
        loop {
            match self.events.try_recv() {
                Ok(event) => stale |= event.collection == EntityKind::Preset,
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Preset watch lagged behind, re-reading");
                    stale = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if stale {
            self.current = self.store.fetch_presets(&self.filter, SortOrder::ByName);
        }
        stale
    }
}
