//! Property index — item id → property names declared against it.
//!
//! Derived fresh from a [`DeclarationTable`] before every propagation pass and
//! read-only during the pass. Ids that match no tree node are kept; they are
//! simply never looked up.

use hashbrown::HashMap;

use crate::model::{DeclarationTable, ItemId, PropertySet};
use crate::model::property_set::EMPTY;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyIndex {
    declared: HashMap<ItemId, PropertySet>,
}

impl PropertyIndex {
    /// Build the index from a declaration table.
    pub fn build(table: &DeclarationTable) -> Self {
        let mut declared: HashMap<ItemId, PropertySet> = HashMap::new();
        for decl in table.iter() {
            for id in &decl.associated_ids {
                declared.entry(id.clone()).or_default().insert(decl.name.clone());
            }
        }
        Self { declared }
    }

    /// Declared properties for an id; empty when the id carries none.
    pub fn declared(&self, id: &str) -> &PropertySet {
        self.declared.get(id).unwrap_or(&EMPTY)
    }

    pub fn has_declarations(&self, id: &str) -> bool {
        !self.declared(id).is_empty()
    }

    /// Number of ids with at least one declaration.
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &PropertySet)> {
        self.declared.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyDeclaration, property_set};

    fn table() -> DeclarationTable {
        DeclarationTable::new(vec![
            PropertyDeclaration::new("Thickness").with_ids(["Wall", "Slab"]),
            PropertyDeclaration::new("Fire rating").with_ids(["Wall"]),
            PropertyDeclaration::new("Orphan").with_ids(["Not in tree"]),
            PropertyDeclaration::new("Unused"),
        ])
    }

    #[test]
    fn test_build_groups_names_by_id() {
        let index = PropertyIndex::build(&table());
        assert_eq!(index.declared("Wall"), &property_set(["Fire rating", "Thickness"]));
        assert_eq!(index.declared("Slab"), &property_set(["Thickness"]));
        assert!(index.declared("Door").is_empty());
        // Dangling ids are retained.
        assert!(index.has_declarations("Not in tree"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_build_is_idempotent() {
        let t = table();
        assert_eq!(PropertyIndex::build(&t), PropertyIndex::build(&t));
    }

    #[test]
    fn test_duplicate_declarations_merge() {
        let t = DeclarationTable::new(vec![
            PropertyDeclaration::new("Width").with_ids(["Door"]),
            PropertyDeclaration::new("Width").with_ids(["Door", "Window"]),
        ]);
        let index = PropertyIndex::build(&t);
        assert_eq!(index.declared("Door"), &property_set(["Width"]));
        assert_eq!(index.declared("Window"), &property_set(["Width"]));
    }
}
