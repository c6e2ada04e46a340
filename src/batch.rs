//! Batch processing of classification documents.
//!
//! ```text
//! input/               output/
//!   a.xml      ──→       a_processed.xml
//!   b.xml      ──→       b_processed.xml
//!
//! dump/ (optional)
//!   input_json/a.json                  declared properties as read
//!   element_tree_json/element_tree_a.json   propagated tree
//!   output_json/a_processed.json       declared properties as written
//! ```
//!
//! Documents are independent: a failure is logged and recorded, and the
//! remaining documents are still processed.

use std::path::{Path, PathBuf};

use crate::export::{declared_view, dump_forest};
use crate::{Pipeline, Result};

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Output path of every document that was written.
    pub processed: Vec<PathBuf>,
    /// Input path and error message of every document that failed.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct BatchRunner<'p> {
    pipeline: &'p Pipeline,
    output_dir: PathBuf,
    dump_dir: Option<PathBuf>,
}

impl<'p> BatchRunner<'p> {
    pub fn new(pipeline: &'p Pipeline, output_dir: impl Into<PathBuf>) -> Self {
        Self { pipeline, output_dir: output_dir.into(), dump_dir: None }
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Process a single `.xml` file or every `.xml` file directly inside a
    /// directory, in name order.
    pub fn run(&self, input: &Path) -> Result<BatchReport> {
        let inputs = discover(input)?;
        std::fs::create_dir_all(&self.output_dir)?;
        tracing::info!(documents = inputs.len(), output = %self.output_dir.display(), "starting batch");

        let mut report = BatchReport::default();
        for path in inputs {
            match self.process_one(&path) {
                Ok(output) => {
                    tracing::info!(input = %path.display(), output = %output.display(), "processed");
                    report.processed.push(output);
                }
                Err(e) => {
                    tracing::error!(input = %path.display(), error = %e, "failed to process document");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        tracing::info!(processed = report.processed.len(), failed = report.failed.len(), "batch complete");
        Ok(report)
    }

    fn process_one(&self, path: &Path) -> Result<PathBuf> {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let processed = self.pipeline.process_file(path)?;

        let output = self.output_dir.join(format!("{stem}_processed.xml"));
        processed.document.save(&output)?;

        if let Some(dump) = &self.dump_dir {
            dump_forest(&processed.input_tree, &dump.join("input_json").join(format!("{stem}.json")))?;
            dump_forest(
                &processed.forest,
                &dump.join("element_tree_json").join(format!("element_tree_{stem}.json")),
            )?;
            dump_forest(
                &declared_view(&processed.document)?,
                &dump.join("output_json").join(format!("{stem}_processed.json")),
            )?;
        }
        Ok(output)
    }
}

/// Input documents: the file itself, or the directory's `.xml` entries sorted
/// by name.
fn discover(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xml")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xml", "a.XML", "notes.txt"] {
            std::fs::write(dir.path().join(name), "<x/>").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.xml")).unwrap();

        let found = discover(dir.path()).unwrap();
        let names: Vec<_> = found.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["a.XML", "b.xml"]);
    }

    #[test]
    fn test_single_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.xml");
        std::fs::write(&file, "<x/>").unwrap();
        assert_eq!(discover(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(discover(&dir.path().join("absent")), Err(crate::Error::Io(_))));
    }
}
