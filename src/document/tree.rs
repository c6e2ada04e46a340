//! Classification tree builder: `Items/Item/Children/Item...` → [`Forest`].

use hashbrown::HashSet;

use super::xml::XmlElement;
use crate::model::{ClassificationNode, Forest, ItemId};

const ITEM: &str = "Item";
const CHILDREN: &str = "Children";
const ID: &str = "ID";
const NAME: &str = "Name";

/// Build the forest under an `Items` element.
///
/// Items missing an `ID` or `Name`, or repeating an id already seen, are
/// logged and skipped together with their subtree.
pub fn build_forest(items: &XmlElement) -> Forest {
    let mut seen = HashSet::new();
    let roots = items
        .children_named(ITEM)
        .filter_map(|item| build_node(item, &mut seen))
        .collect();
    Forest::new(roots)
}

fn build_node(item: &XmlElement, seen: &mut HashSet<ItemId>) -> Option<ClassificationNode> {
    let Some(id) = item.child_text(ID) else {
        tracing::warn!(name = ?item.child_text(NAME), "skipping item without ID");
        return None;
    };
    let Some(name) = item.child_text(NAME) else {
        tracing::warn!(item = %id, "skipping item without Name");
        return None;
    };
    let id = ItemId(id);
    if !seen.insert(id.clone()) {
        tracing::warn!(item = %id, "skipping item with duplicate ID");
        return None;
    }

    let mut node = ClassificationNode::new(id).with_name(name);
    if let Some(children) = item.child(CHILDREN) {
        node.children = children
            .children_named(ITEM)
            .filter_map(|child| build_node(child, seen))
            .collect();
    }
    Some(node)
}
