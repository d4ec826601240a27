//! Find-or-create for shared reference rows
//!
//! Color pairs are keyed by their pair code and users by name. Lookups are
//! exact and run against the open transaction, so a row created earlier in
//! the same transaction is found again instead of duplicated. Existing rows
//! are returned as they are; incoming attributes only apply on creation.

use tracing::debug;

use crate::model::{ColorId, NewColor, NewUser, UserId};
use crate::store::Transaction;

/// Outcome of a find-or-create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<T> {
    Existing(T),
    Created(T),
}

impl<T: Copy> Resolution<T> {
    pub fn id(&self) -> T {
        match self {
            Resolution::Existing(id) | Resolution::Created(id) => *id,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// Resolve a color pair by code, creating it with the given codes if absent
pub fn resolve_color(
    tx: &mut Transaction<'_>,
    code: &str,
    background_code: &str,
    text_code: &str,
) -> Resolution<ColorId> {
    if let Some(existing) = tx.graph().find_color(code) {
        if existing.background_code != background_code || existing.text_code != text_code {
            debug!(code, "Keeping stored codes for existing color pair");
        }
        return Resolution::Existing(existing.id);
    }

    let id = tx.create_color(NewColor {
        code: code.to_string(),
        background_code: background_code.to_string(),
        text_code: text_code.to_string(),
    });
    debug!(code, %id, "Created color pair");
    Resolution::Created(id)
}

/// Resolve a user by name, creating a non-owner user if absent
pub fn resolve_user(
    tx: &mut Transaction<'_>,
    name: &str,
    is_from_countryside: bool,
) -> Resolution<UserId> {
    if let Some(existing) = tx.graph().find_user(name) {
        return Resolution::Existing(existing.id);
    }

    let id = tx.create_user(NewUser {
        name: name.to_string(),
        is_from_countryside,
        is_owner: false,
    });
    debug!(user = name, %id, "Created user");
    Resolution::Created(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntityStore;
    use crate::store::tests::new_user;

    #[test]
    fn test_repeated_color_resolution_creates_one_row() {
        let store = EntityStore::in_memory();
        let mut tx = store.transaction();

        let first = resolve_color(&mut tx, "White,Black", "#FFFFFF", "#000000");
        assert!(first.was_created());
        for _ in 0..5 {
            let again = resolve_color(&mut tx, "White,Black", "#FFFFFF", "#000000");
            assert_eq!(again, Resolution::Existing(first.id()));
        }
        tx.save().unwrap();

        assert_eq!(store.fetch_colors().len(), 1);
    }

    #[test]
    fn test_existing_color_codes_win() {
        let store = EntityStore::in_memory();
        let mut tx = store.transaction();
        let original = resolve_color(&mut tx, "Black,Yellow", "#000000", "#FFFF00").id();
        tx.save().unwrap();

        let mut tx = store.transaction();
        let resolved = resolve_color(&mut tx, "Black,Yellow", "#123456", "#654321");
        tx.save().unwrap();

        assert_eq!(resolved, Resolution::Existing(original));
        let color = store.read(|g| g.color(original).cloned()).unwrap();
        assert_eq!(color.background_code, "#000000");
        assert_eq!(color.text_code, "#FFFF00");
    }

    #[test]
    fn test_color_lookup_is_case_sensitive() {
        let store = EntityStore::in_memory();
        let mut tx = store.transaction();
        let lower = resolve_color(&mut tx, "white,black", "#FFFFFF", "#000000");
        let upper = resolve_color(&mut tx, "White,Black", "#FFFFFF", "#000000");
        assert!(upper.was_created());
        assert_ne!(lower.id(), upper.id());
    }

    #[test]
    fn test_user_resolution_reuses_existing() {
        let store = EntityStore::in_memory();
        let mut tx = store.transaction();
        let alice = tx.create_user(new_user("Alice", true));

        let resolved = resolve_user(&mut tx, "Alice", true);
        assert_eq!(resolved, Resolution::Existing(alice));
        assert!(!tx.graph().user(alice).unwrap().is_from_countryside);
    }

    #[test]
    fn test_created_user_is_never_owner() {
        let store = EntityStore::in_memory();
        let mut tx = store.transaction();
        let bob = resolve_user(&mut tx, "Bob", true);
        assert!(bob.was_created());

        let user = tx.graph().user(bob.id()).unwrap();
        assert!(!user.is_owner);
        assert!(user.is_from_countryside);
        assert_eq!(resolve_user(&mut tx, "Bob", false), Resolution::Existing(bob.id()));
    }
}
