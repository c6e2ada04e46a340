//! # bimids — Property Inheritance for Classification Documents
//!
//! Normalizes property declarations across a building-element classification
//! hierarchy so that every item carries the properties it semantically
//! inherits, then writes the result back into the classification XML.
//!
//! ## Design Principles
//!
//! 1. **Tree is the truth**: the classification tree is built once per
//!    document; declarations are reconciled *from* it after every pass
//! 2. **Clean DTOs**: `ClassificationNode`, `PropertyDeclaration`, `ItemId`
//!    cross all boundaries
//! 3. **Policy is data**: sibling-disagreement exceptions live in
//!    `PipelineConfig`, not in code
//! 4. **Bounded**: every document has an iteration cap and a wall-time budget
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bimids::{Pipeline, PipelineConfig};
//!
//! # fn example() -> bimids::Result<()> {
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let processed = pipeline.process_file("classification.xml".as_ref())?;
//!
//! println!("{} iterations, language {}", processed.report.iterations, processed.language);
//! processed.document.save("classification_processed.xml".as_ref())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Stages
//!
//! | Stage | Module | Description |
//! |-------|--------|-------------|
//! | Parse | `document` | XML → element tree + declaration table |
//! | Strip | `document` | Remove language-specific bookkeeping properties |
//! | Propagate | `propagate` | Downward inheritance + upward inference to a fixpoint |
//! | Update | `document` | Rewrite `ClassificationIDs`, scaffold new definitions |
//! | Export | `export`, `inheritance` | JSON dumps and inheritance profiles |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod index;
pub mod config;
pub mod propagate;
pub mod document;
pub mod inheritance;
pub mod export;
pub mod bsdd;
pub mod batch;

use std::path::Path;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    ClassificationNode, ItemId, Forest, PropertySet,
    DeclarationTable, PropertyDeclaration,
};

// ============================================================================
// Re-exports: Pipeline stages
// ============================================================================

pub use config::{PipelineConfig, PropagationConfig, LanguageConfig, BsddConfig, MergePolicy};
pub use index::PropertyIndex;
pub use propagate::{Propagator, PropagationReport, Diagnostic, propagate};
pub use document::ClassificationDocument;
pub use inheritance::{InheritanceProfile, InheritanceRule};
pub use batch::{BatchReport, BatchRunner};

// ============================================================================
// Top-level Pipeline handle
// ============================================================================

/// The primary entry point. A `Pipeline` owns the configuration and runs
/// documents through parse → strip → propagate → update.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

/// Result of running one document through the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    /// Detected language profile name.
    pub language: String,
    /// Tree as parsed, before propagation (declared properties only).
    pub input_tree: Forest,
    /// Tree after propagation; every node holds its full property set.
    pub forest: Forest,
    pub report: PropagationReport,
    /// The rewritten document.
    pub document: ClassificationDocument,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a document already in memory.
    pub fn process_str(&self, text: &str) -> Result<ProcessedDocument> {
        self.process(ClassificationDocument::parse(text)?)
    }

    /// Load and process a document from disk.
    pub fn process_file(&self, path: &Path) -> Result<ProcessedDocument> {
        self.process(ClassificationDocument::load(path)?)
    }

    pub fn process(&self, mut document: ClassificationDocument) -> Result<ProcessedDocument> {
        // Phase 1: Language
        let language = document.detect_language(&self.config.languages);
        if let Some(profile) = self.config.languages.profile(&language) {
            let removed = document.strip_properties(&profile.removed_properties)?;
            tracing::debug!(language = %language, removed, "stripped language properties");
        }

        // Phase 2: Tree + declarations
        let mut table = document.declarations()?;
        let mut forest = document.build_forest()?;
        let input_tree = {
            let mut tree = forest.clone();
            export::assign_declared(&mut tree, &PropertyIndex::build(&table));
            tree
        };

        // Phase 3: Propagate
        let report = propagate(&mut forest, &mut table, &self.config.propagation)?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("element tree after propagation:\n{}", forest.outline());
        }

        // Phase 4: Write back
        document.apply_declarations(&table)?;
        tracing::info!(
            language = %language,
            nodes = forest.len(),
            declarations = table.len(),
            iterations = report.iterations,
            "document processed"
        );

        Ok(ProcessedDocument { language, input_tree, forest, report, document })
    }

    /// Propagate, then describe the result as an inheritance profile.
    pub fn export_profile(&self, path: &Path) -> Result<InheritanceProfile> {
        let processed = self.process_file(path)?;
        Ok(InheritanceProfile::export(&processed.forest))
    }

    /// Recompute the document's tree from `profile` and write the resulting
    /// declarations back. Language stripping still applies; propagation
    /// does not run.
    pub fn apply_profile(&self, path: &Path, profile: &InheritanceProfile) -> Result<ClassificationDocument> {
        let mut document = ClassificationDocument::load(path)?;
        let language = document.detect_language(&self.config.languages);
        if let Some(language) = self.config.languages.profile(&language) {
            document.strip_properties(&language.removed_properties)?;
        }

        let mut table = document.declarations()?;
        let mut forest = document.build_forest()?;
        profile.apply(&mut forest);
        table.reconcile(&forest);
        document.apply_declarations(&table)?;
        Ok(document)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing section: <{0}>")]
    MissingSection(String),

    #[error("Propagation did not converge within {iterations} iterations")]
    NonConvergence { iterations: usize },

    #[error("Propagation timed out after {elapsed_ms} ms ({iterations} iterations)")]
    Timeout { elapsed_ms: u64, iterations: usize },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
