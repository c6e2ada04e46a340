//! JSON dumps of classification trees.
//!
//! Two views of the same shape (`[{ id, name, properties, children }]`):
//!
//! ```text
//! element tree   → the forest as it stands (e.g. after propagation)
//! document view  → the document's items with only their *declared* properties
//! ```
//!
//! Comparing the document view of an input file with that of its processed
//! output shows exactly which declarations propagation added.

use std::io::Write;
use std::path::Path;

use crate::document::ClassificationDocument;
use crate::index::PropertyIndex;
use crate::model::{ClassificationNode, Forest};
use crate::Result;

/// Write the forest as pretty-printed JSON.
pub fn write_forest_json(forest: &Forest, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, forest)?;
    writeln!(writer)?;
    Ok(())
}

/// Forest of the document with each node holding its declared properties.
pub fn declared_view(document: &ClassificationDocument) -> Result<Forest> {
    let mut forest = document.build_forest()?;
    let index = PropertyIndex::build(&document.declarations()?);
    assign_declared(&mut forest, &index);
    Ok(forest)
}

/// Replace every node's properties with its declared set.
pub fn assign_declared(forest: &mut Forest, index: &PropertyIndex) {
    forest.for_each_mut(|node: &mut ClassificationNode| {
        node.properties = index.declared(node.id.as_str()).clone();
    });
}

/// Write `forest` to `path` as JSON, creating parent directories.
pub fn dump_forest(forest: &Forest, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    write_forest_json(forest, &mut file)?;
    tracing::debug!(path = %path.display(), nodes = forest.len(), "wrote element tree JSON");
    Ok(())
}
