//! # Pipeline Configuration
//!
//! Everything the pipeline would otherwise hard-code lives here as data: the
//! exception table consulted when siblings disagree, the per-language list of
//! properties stripped before processing, iteration limits, and the bSDD
//! dictionary header.
//!
//! Every section is `#[serde(default)]`, so a config file only needs the keys
//! it overrides:
//!
//! ```json
//! {
//!   "propagation": {
//!     "max_iterations": 64,
//!     "exceptions": { "Stair": { "policy": "conservative_skip" } }
//!   }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::ItemId;
use crate::{Error, Result};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub propagation: PropagationConfig,
    pub languages: LanguageConfig,
    pub bsdd: BsddConfig,
}

impl PipelineConfig {
    /// Load a JSON config file; missing keys fall back to defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.propagation.max_iterations == 0 {
            return Err(Error::Config("propagation.max_iterations must be at least 1".into()));
        }
        if !self.languages.profiles.is_empty()
            && self.languages.profile(&self.languages.default_language).is_none()
        {
            return Err(Error::Config(format!(
                "default language '{}' has no profile",
                self.languages.default_language
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Propagation
// ============================================================================

/// How a node whose children disagree is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MergePolicy {
    /// Composite category: adopt the intersection of the declared sets of the
    /// listed subtype children.
    SubtypeMerge { subtypes: Vec<ItemId> },
    /// Children legitimately differ: do nothing, say nothing.
    ConservativeSkip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Hard cap on build-index → pass → reconcile iterations per document.
    pub max_iterations: usize,
    /// Optional wall-clock budget per document, in milliseconds.
    pub max_wall_time_ms: Option<u64>,
    /// Item id → policy applied when its children's declarations disagree.
    pub exceptions: HashMap<ItemId, MergePolicy>,
}

impl PropagationConfig {
    pub fn exception(&self, id: &str) -> Option<&MergePolicy> {
        self.exceptions.get(id)
    }

    pub fn max_wall_time(&self) -> Option<Duration> {
        self.max_wall_time_ms.map(Duration::from_millis)
    }

    pub fn with_exception(mut self, id: impl Into<ItemId>, policy: MergePolicy) -> Self {
        self.exceptions.insert(id.into(), policy);
        self
    }

    /// Config with no exception entries at all.
    pub fn without_exceptions() -> Self {
        Self { exceptions: HashMap::new(), ..Self::default() }
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        let covering = MergePolicy::SubtypeMerge {
            subtypes: [
                "Ceiling", "Revêtement de plafond",
                "Cladding", "Revêtement de paroi",
                "Flooring", "Revêtement de sol",
                "Roofing", "Couverture de toiture",
            ]
            .into_iter()
            .map(ItemId::from)
            .collect(),
        };

        let mut exceptions = HashMap::new();
        exceptions.insert(ItemId::from("Covering"), covering.clone());
        exceptions.insert(ItemId::from("Revêtement"), covering);
        exceptions.insert(ItemId::from("Chimney"), MergePolicy::ConservativeSkip);
        exceptions.insert(ItemId::from("Cheminée"), MergePolicy::ConservativeSkip);

        Self {
            max_iterations: 32,
            max_wall_time_ms: Some(60_000),
            exceptions,
        }
    }
}

// ============================================================================
// Languages
// ============================================================================

/// Per-language property names: markers used for detection, and the
/// definitions deleted before propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub name: String,
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(default)]
    pub removed_properties: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Checked in order; the first profile with a declared marker wins.
    pub profiles: Vec<LanguageProfile>,
    pub default_language: String,
}

impl LanguageConfig {
    pub fn profile(&self, name: &str) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        let strings = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            profiles: vec![
                LanguageProfile {
                    name: "French".into(),
                    markers: strings(&["Fonction structurelle", "État de rénovation"]),
                    removed_properties: strings(&["Position", "Fonction structurelle", "État de rénovation"]),
                },
                LanguageProfile {
                    name: "English".into(),
                    markers: strings(&["IsLoadBearing", "Renovation Status"]),
                    removed_properties: strings(&["Position", "IsLoadBearing", "Renovation Status"]),
                },
            ],
            default_language: "English".into(),
        }
    }
}

// ============================================================================
// bSDD export
// ============================================================================

/// Dictionary header and workbook layout for the bSDD converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BsddConfig {
    pub organization_code: String,
    pub dictionary_code: String,
    pub dictionary_version: String,
    pub dictionary_name: String,
    pub status: String,
    pub change_request_email_address: String,
    pub language_iso_code: String,
    pub license: String,
    pub license_url: String,
    pub quality_assurance_procedure: String,
    pub model_version: String,
    pub property_sheet: String,
    pub class_sheet: String,
    /// Column-1 value marking the header row of the property sheet.
    pub property_header_marker: String,
    /// Column-1 value marking the header row of the class sheet.
    pub class_header_marker: String,
    pub ifc_class_base_uri: String,
}

impl Default for BsddConfig {
    fn default() -> Self {
        Self {
            organization_code: "bw".into(),
            dictionary_code: "BIMids".into(),
            dictionary_version: "0.2".into(),
            dictionary_name: "BIMids".into(),
            status: "Preview".into(),
            change_request_email_address: "louis.casteleyn@buildwise.be".into(),
            language_iso_code: "EN".into(),
            license: "CC BY-ND 4.0".into(),
            license_url: "https://creativecommons.org/licenses/by-nd/4.0/legalcode".into(),
            quality_assurance_procedure:
                "This content is in draft and still under development. Do not use this as final content".into(),
            model_version: "2.0".into(),
            property_sheet: "Property definitions".into(),
            class_sheet: "IFC mapping".into(),
            property_header_marker: "VALUE".into(),
            class_header_marker: "ELEMENT".into(),
            ifc_class_base_uri: "https://identifier.buildingsmart.org/uri/buildingsmart/ifc/4.3/class".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_both_languages() {
        let config = PropagationConfig::default();
        assert!(matches!(config.exception("Covering"), Some(MergePolicy::SubtypeMerge { .. })));
        assert!(matches!(config.exception("Revêtement"), Some(MergePolicy::SubtypeMerge { .. })));
        assert_eq!(config.exception("Cheminée"), Some(&MergePolicy::ConservativeSkip));
        assert_eq!(config.exception("Wall"), None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(r#"{
            "propagation": {
                "max_iterations": 5,
                "exceptions": { "Stair": { "policy": "conservative_skip" } }
            }
        }"#).unwrap();

        assert_eq!(config.propagation.max_iterations, 5);
        assert_eq!(config.propagation.exception("Stair"), Some(&MergePolicy::ConservativeSkip));
        // Replaced table: the built-in entries are gone.
        assert_eq!(config.propagation.exception("Chimney"), None);
        assert_eq!(config.languages.default_language, "English");
        assert_eq!(config.bsdd.dictionary_code, "BIMids");
    }

    #[test]
    fn test_subtype_merge_from_json() {
        let config = PipelineConfig::from_json(r#"{
            "propagation": { "exceptions": {
                "Finishes": { "policy": "subtype_merge", "subtypes": ["Paint", "Tiles"] }
            } }
        }"#).unwrap();
        assert_eq!(
            config.propagation.exception("Finishes"),
            Some(&MergePolicy::SubtypeMerge { subtypes: vec!["Paint".into(), "Tiles".into()] })
        );
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = PipelineConfig::from_json(r#"{ "propagation": { "max_iterations": 0 } }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_default_language_rejected() {
        let err = PipelineConfig::from_json(r#"{ "languages": { "default_language": "Dutch" } }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
