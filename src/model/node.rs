//! Classification node in the item forest.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use super::PropertySet;

/// Stable item identifier, taken verbatim from the document's `Item/ID`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

/// A node of the classification hierarchy.
///
/// Children are owned exclusively by their parent. `properties` is the set of
/// property names currently attributed to the node; it starts empty and is
/// rewritten in place by propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationNode {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub properties: PropertySet,
    #[serde(default)]
    pub children: Vec<ClassificationNode>,
}

impl ClassificationNode {
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            properties: PropertySet::new(),
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_child(mut self, child: ClassificationNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ClassificationNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_properties(mut self, props: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.properties.extend(props.into_iter().map(Into::into));
        self
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Depth-first search of this subtree, self included.
    pub fn find(&self, id: &str) -> Option<&ClassificationNode> {
        if self.id.as_str() == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut ClassificationNode> {
        if self.id.as_str() == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_descends_into_children() {
        let node = ClassificationNode::new("Wall")
            .with_child(ClassificationNode::new("Curtain wall"))
            .with_child(ClassificationNode::new("Partition")
                .with_child(ClassificationNode::new("Glazed partition")));

        assert!(node.find("Glazed partition").is_some());
        assert!(node.find("Door").is_none());
        assert!(!node.is_leaf());
    }

    #[test]
    fn test_item_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ItemId::from("Slab")).unwrap();
        assert_eq!(json, "\"Slab\"");
    }
}
