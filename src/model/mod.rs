//! # Classification Model
//!
//! Plain DTOs shared by every stage: the tree builder produces them, the
//! propagator mutates them, the document updater and exporters consume them.
//!
//! Design rule: NO XML types, NO workbook types here.
//! This module is pure data: no I/O and no logging.

pub mod node;
pub mod forest;
pub mod property_set;
pub mod declaration;

pub use node::{ClassificationNode, ItemId};
pub use forest::{Forest, PreOrder, TreeState};
pub use property_set::{PropertySet, property_set, intersect_all};
pub use declaration::{DeclarationTable, PropertyDeclaration};
