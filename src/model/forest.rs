//! Forest — the ordered top-level items of one classification document.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::{ClassificationNode, ItemId, PropertySet};

/// Snapshot of every node's properties, keyed by item id.
pub type TreeState = HashMap<ItemId, PropertySet>;

/// A rooted forest of classification nodes in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    pub roots: Vec<ClassificationNode>,
}

impl Forest {
    pub fn new(roots: Vec<ClassificationNode>) -> Self {
        Self { roots }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes across all trees.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn find(&self, id: &str) -> Option<&ClassificationNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut ClassificationNode> {
        self.roots.iter_mut().find_map(|root| root.find_mut(id))
    }

    /// Pre-order iterator over all nodes (document order).
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: self.roots.iter().rev().collect(),
        }
    }

    /// Every node's properties keyed by id.
    pub fn state(&self) -> TreeState {
        self.iter()
            .map(|node| (node.id.clone(), node.properties.clone()))
            .collect()
    }

    /// Reset every node's properties to the empty set.
    pub fn clear_properties(&mut self) {
        fn clear(node: &mut ClassificationNode) {
            node.properties.clear();
            node.children.iter_mut().for_each(clear);
        }
        self.roots.iter_mut().for_each(clear);
    }

    /// Visit every node mutably, in pre-order.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut ClassificationNode)) {
        fn walk(node: &mut ClassificationNode, f: &mut dyn FnMut(&mut ClassificationNode)) {
            f(node);
            for child in &mut node.children {
                walk(child, f);
            }
        }
        for root in &mut self.roots {
            walk(root, &mut f);
        }
    }

    /// Render the forest as an indented `id: {props}` listing.
    pub fn outline(&self) -> String {
        fn render(node: &ClassificationNode, depth: usize, out: &mut String) {
            let props: Vec<&str> = node.properties.iter().map(String::as_str).collect();
            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!("{}: {{{}}}\n", node.id, props.join(", ")));
            for child in &node.children {
                render(child, depth + 1, out);
            }
        }
        let mut out = String::new();
        for root in &self.roots {
            render(root, 0, &mut out);
        }
        out
    }
}

impl From<Vec<ClassificationNode>> for Forest {
    fn from(roots: Vec<ClassificationNode>) -> Self {
        Self::new(roots)
    }
}

/// Pre-order traversal with an explicit stack.
pub struct PreOrder<'a> {
    stack: Vec<&'a ClassificationNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a ClassificationNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Forest {
        Forest::new(vec![
            ClassificationNode::new("Wall")
                .with_child(ClassificationNode::new("Curtain wall"))
                .with_child(ClassificationNode::new("Partition")),
            ClassificationNode::new("Slab"),
        ])
    }

    #[test]
    fn test_preorder_is_document_order() {
        let forest = sample();
        let ids: Vec<&str> = forest.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Wall", "Curtain wall", "Partition", "Slab"]);
    }

    #[test]
    fn test_outline() {
        let mut forest = sample();
        forest.find_mut("Partition").unwrap().properties.insert("Height".into());
        let outline = forest.outline();
        assert!(outline.contains("  Partition: {Height}\n"));
        assert!(outline.starts_with("Wall: {}\n"));
    }

    #[test]
    fn test_state_covers_all_nodes() {
        let forest = sample();
        assert_eq!(forest.state().len(), 4);
        assert_eq!(forest.len(), 4);
    }
}
