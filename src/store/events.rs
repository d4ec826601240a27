//! Change notifications published after each successful commit

use std::collections::BTreeMap;

use crate::model::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Inserted,
    Updated,
    Deleted,
}

/// One row of one collection changed in a committed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: EntityKind,
    pub change: Change,
    pub id: u64,
}

/// Net changes of an open transaction, folded per row so that subscribers
/// only hear about what actually reached the committed graph
#[derive(Debug, Default)]
pub(crate) struct ChangeLog {
    rows: BTreeMap<(EntityKind, u64), Change>,
}

impl ChangeLog {
    pub(crate) fn record(&mut self, collection: EntityKind, id: u64, change: Change) {
        let key = (collection, id);
        let merged = match (self.rows.get(&key).copied(), change) {
            (None, change) => Some(change),
            (Some(Change::Inserted), Change::Updated) => Some(Change::Inserted),
            (Some(Change::Inserted), Change::Deleted) => None,
            (Some(_), change) => Some(change),
        };
        match merged {
            Some(change) => {
                self.rows.insert(key, change);
            }
            None => {
                self.rows.remove(&key);
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn into_events(self) -> Vec<ChangeEvent> {
        self.rows
            .into_iter()
            .map(|((collection, id), change)| ChangeEvent {
                collection,
                change,
                id,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_then_update_stays_insert() {
        let mut log = ChangeLog::default();
        log.record(EntityKind::Preset, 1, Change::Inserted);
        log.record(EntityKind::Preset, 1, Change::Updated);
        assert_eq!(
            log.into_events(),
            vec![ChangeEvent {
                collection: EntityKind::Preset,
                change: Change::Inserted,
                id: 1
            }]
        );
    }

    #[test]
    fn test_insert_then_delete_cancels_out() {
        let mut log = ChangeLog::default();
        log.record(EntityKind::Color, 4, Change::Inserted);
        log.record(EntityKind::Color, 4, Change::Deleted);
        assert!(log.is_empty());
    }

    #[test]
    fn test_update_then_delete_is_delete() {
        let mut log = ChangeLog::default();
        log.record(EntityKind::User, 2, Change::Updated);
        log.record(EntityKind::User, 2, Change::Deleted);
        assert_eq!(log.len(), 1);
        assert_eq!(log.into_events()[0].change, Change::Deleted);
    }
}
