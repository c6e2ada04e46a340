//! # Inheritance Propagator
//!
//! Infers property assignments for classification nodes that lack explicit
//! declarations, from purely structural evidence, and iterates to a fixed
//! point.
//!
//! ## One pass
//!
//! For a node `N` with inherited set `P` (the parent's post-update set, empty
//! for roots) and declared set `D(N)` from the [`PropertyIndex`]:
//!
//! 1. `N.properties := D(N) ∪ P`. Declarations are never dropped and parents
//!    always pass everything down.
//! 2. If `D(N)` is empty and some children have declarations of their own:
//!    - all of them identical → `N` adopts that set;
//!    - `N` is a [`MergePolicy::SubtypeMerge`] category → `N` adopts the
//!      intersection of its listed subtypes' declared sets;
//!    - `N` is a [`MergePolicy::ConservativeSkip`] category → nothing;
//!    - otherwise → [`Diagnostic::InconsistentChildren`], `N` left as-is.
//! 3. Recurse with `N.properties` as the children's `P`.
//!
//! ## Fixed point
//!
//! ```text
//! loop {
//!     index  = PropertyIndex::build(table)
//!     pass(forest, index)
//!     table.reconcile(forest)          // inferred sets become declarations
//!     if PropertyIndex::build(table) == index && forest.state() == previous { done }
//! }
//! ```
//!
//! Inferred sets feed the next pass as declarations, so a parent whose
//! children only gained declarations this pass is resolved on the next one.
//! Sets only ever grow, which bounds the loop; the iteration cap and the
//! wall-time budget still guard it.

use std::time::Instant;

use serde::Serialize;

use crate::config::{MergePolicy, PropagationConfig};
use crate::index::PropertyIndex;
use crate::model::{ClassificationNode, DeclarationTable, Forest, ItemId, PropertySet, intersect_all};
use crate::{Error, Result};

// ============================================================================
// Reports
// ============================================================================

/// Non-fatal finding of a propagation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A node without declarations whose declaring children disagree, and
    /// which has no exception entry.
    InconsistentChildren {
        id: ItemId,
        children: Vec<(ItemId, PropertySet)>,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::InconsistentChildren { id, children } => write!(
                f,
                "children of {id} have inconsistent properties ({} declaring children)",
                children.len()
            ),
        }
    }
}

/// How a node's set was inferred from its children during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inference {
    SiblingAgreement,
    SubtypeMerge,
}

/// Outcome of a single pass over the forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Nodes that adopted a set from their children.
    pub inferred: Vec<ItemId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of a full run to the fixed point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Iterations executed, the final (unchanged) one included.
    pub iterations: usize,
    /// Diagnostics of the final pass.
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Propagator
// ============================================================================

pub struct Propagator<'c> {
    config: &'c PropagationConfig,
}

impl<'c> Propagator<'c> {
    pub fn new(config: &'c PropagationConfig) -> Self {
        Self { config }
    }

    /// Iterate index → pass → reconcile until neither the index nor the tree
    /// changes. On success `table` holds the reconciled declarations.
    pub fn run(&self, forest: &mut Forest, table: &mut DeclarationTable) -> Result<PropagationReport> {
        let started = Instant::now();
        let budget = self.config.max_wall_time();
        let mut previous = forest.state();

        for iteration in 1..=self.config.max_iterations {
            let index = PropertyIndex::build(table);
            let pass = self.pass(forest, &index);
            table.reconcile(forest);

            let state = forest.state();
            let next_index = PropertyIndex::build(table);
            tracing::debug!(
                iteration,
                inferred = pass.inferred.len(),
                diagnostics = pass.diagnostics.len(),
                "propagation pass complete"
            );

            if next_index == index && state == previous {
                for diagnostic in &pass.diagnostics {
                    tracing::warn!("{diagnostic}");
                }
                tracing::info!(iterations = iteration, nodes = state.len(), "propagation converged");
                return Ok(PropagationReport {
                    iterations: iteration,
                    diagnostics: pass.diagnostics,
                });
            }
            previous = state;

            if let Some(limit) = budget {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(Error::Timeout {
                        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        iterations: iteration,
                    });
                }
            }
        }

        Err(Error::NonConvergence { iterations: self.config.max_iterations })
    }

    /// One whole-forest pass against a fixed index.
    pub fn pass(&self, forest: &mut Forest, index: &PropertyIndex) -> PassReport {
        let mut report = PassReport::default();
        let root_inherited = PropertySet::new();
        for root in &mut forest.roots {
            self.visit(root, &root_inherited, index, &mut report);
        }
        report
    }

    fn visit(
        &self,
        node: &mut ClassificationNode,
        inherited: &PropertySet,
        index: &PropertyIndex,
        report: &mut PassReport,
    ) {
        let declared = index.declared(node.id.as_str());
        let mut properties: PropertySet = declared.union(inherited).cloned().collect();

        if declared.is_empty() {
            if let Some((adopted, how)) = self.infer_from_children(node, index, report) {
                tracing::debug!(item = %node.id, via = ?how, adopted = adopted.len(), "inferred from children");
                report.inferred.push(node.id.clone());
                properties.extend(adopted);
            }
        }
        node.properties = properties;

        for child in &mut node.children {
            self.visit(child, &node.properties, index, report);
        }
    }

    /// Upward/sibling inference for a node without declarations of its own.
    fn infer_from_children(
        &self,
        node: &ClassificationNode,
        index: &PropertyIndex,
        report: &mut PassReport,
    ) -> Option<(PropertySet, Inference)> {
        let declaring: Vec<(&ItemId, &PropertySet)> = node
            .children
            .iter()
            .filter(|child| index.has_declarations(child.id.as_str()))
            .map(|child| (&child.id, index.declared(child.id.as_str())))
            .collect();

        let (_, first) = declaring.first()?;
        if declaring.iter().all(|(_, declared)| declared == first) {
            return Some(((*first).clone(), Inference::SiblingAgreement));
        }

        match self.config.exception(node.id.as_str()) {
            Some(MergePolicy::SubtypeMerge { subtypes }) => {
                let merged = intersect_all(
                    declaring
                        .iter()
                        .filter(|(id, _)| subtypes.contains(*id))
                        .map(|(_, declared)| *declared),
                )?;
                (!merged.is_empty()).then_some((merged, Inference::SubtypeMerge))
            }
            Some(MergePolicy::ConservativeSkip) => None,
            None => {
                report.diagnostics.push(Diagnostic::InconsistentChildren {
                    id: node.id.clone(),
                    children: declaring
                        .iter()
                        .map(|(id, declared)| ((*id).clone(), (*declared).clone()))
                        .collect(),
                });
                None
            }
        }
    }
}

/// Run propagation with the given config.
pub fn propagate(
    forest: &mut Forest,
    table: &mut DeclarationTable,
    config: &PropagationConfig,
) -> Result<PropagationReport> {
    Propagator::new(config).run(forest, table)
}
