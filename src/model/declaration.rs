//! Property declarations: which items each property name is declared against.

use serde::{Deserialize, Serialize};

use super::{Forest, ItemId};

/// One property definition and the item ids it is associated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDeclaration {
    pub name: String,
    #[serde(default)]
    pub associated_ids: Vec<ItemId>,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), associated_ids: Vec::new() }
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = impl Into<ItemId>>) -> Self {
        self.associated_ids.extend(ids.into_iter().map(Into::into));
        self
    }
}

/// All property declarations of one document, in document order.
///
/// The same name may appear more than once (a property can be defined in
/// several groups); every occurrence is kept and rewritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationTable {
    pub entries: Vec<PropertyDeclaration>,
}

impl DeclarationTable {
    pub fn new(entries: Vec<PropertyDeclaration>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyDeclaration> {
        self.entries.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|d| d.name == name)
    }

    /// Associated ids for a name (first occurrence).
    pub fn ids_for(&self, name: &str) -> Option<&[ItemId]> {
        self.entries
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.associated_ids.as_slice())
    }

    /// Rewrite every declaration from the forest's final property sets.
    ///
    /// Each entry's id list becomes exactly the nodes (pre-order) holding that
    /// name. Names held by some node but never declared are appended in
    /// first-seen order. Entries no node holds any more stay, with no ids.
    pub fn reconcile(&mut self, forest: &Forest) {
        for entry in &mut self.entries {
            entry.associated_ids = forest
                .iter()
                .filter(|node| node.has_property(&entry.name))
                .map(|node| node.id.clone())
                .collect();
        }

        let mut appended: Vec<PropertyDeclaration> = Vec::new();
        for node in forest.iter() {
            for name in &node.properties {
                if self.contains(name) {
                    continue;
                }
                match appended.iter_mut().find(|d| &d.name == name) {
                    Some(decl) => decl.associated_ids.push(node.id.clone()),
                    None => appended.push(PropertyDeclaration::new(name.clone()).with_ids([node.id.clone()])),
                }
            }
        }
        self.entries.extend(appended);
    }
}
