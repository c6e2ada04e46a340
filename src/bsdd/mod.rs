//! # bSDD Dictionary Export
//!
//! Converts the BIMids requirements workbook into a buildingSMART Data
//! Dictionary import file.
//!
//! ```text
//! "Property definitions" sheet ─┐
//!                               ├─ DictionaryBuilder ─→ bsdd_output.json
//! "IFC mapping" sheet ──────────┘
//! ```
//!
//! Sheets are read as positional rows: column meaning is fixed by position,
//! header rows are recognised by a marker value in column 1.

pub mod workbook;

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::BsddConfig;
use crate::Result;
pub use workbook::{SheetRows, Workbook};

// ============================================================================
// Dictionary schema
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dictionary {
    pub organization_code: String,
    pub dictionary_code: String,
    pub dictionary_version: String,
    pub dictionary_name: String,
    pub release_date: String,
    pub status: String,
    pub change_request_email_address: String,
    pub language_iso_code: String,
    pub license: String,
    pub license_url: String,
    pub quality_assurance_procedure: String,
    pub model_version: String,
    pub classes: Vec<DictionaryClass>,
    pub properties: Vec<DictionaryProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DictionaryProperty {
    pub code: String,
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DictionaryClass {
    pub code: String,
    pub name: String,
    pub class_type: String,
    pub definition: String,
    pub creator_language_iso_code: String,
    pub related_ifc_entity_names_list: Vec<String>,
    pub class_relations: Vec<ClassRelation>,
    pub class_properties: Vec<ClassProperty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClassRelation {
    pub relation_type: String,
    pub related_class_uri: String,
}

/// Property attached to a class. The workbook carries no class/property
/// matrix yet, so generated classes have none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClassProperty {
    pub property_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_set: Option<String>,
}

impl Dictionary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// bSDD code for a human-readable name: lowercase, no spaces, `/` → `_`.
pub fn code_for(name: &str) -> String {
    name.to_lowercase().replace(' ', "").replace('/', "_")
}

fn cell(row: &[Option<String>], col: usize) -> Option<&str> {
    row.get(col).and_then(|c| c.as_deref()).filter(|c| !c.trim().is_empty())
}

pub struct DictionaryBuilder<'c> {
    config: &'c BsddConfig,
    release_date: NaiveDateTime,
}

impl<'c> DictionaryBuilder<'c> {
    pub fn new(config: &'c BsddConfig) -> Self {
        Self { config, release_date: chrono::Local::now().naive_local() }
    }

    pub fn release_date(mut self, date: NaiveDateTime) -> Self {
        self.release_date = date;
        self
    }

    /// Assemble the dictionary from the two sheets' rows.
    pub fn build(&self, property_rows: &SheetRows, class_rows: &SheetRows) -> Dictionary {
        let c = self.config;
        let properties = self.properties(property_rows);
        let classes = self.classes(class_rows);
        tracing::info!(properties = properties.len(), classes = classes.len(), "assembled bSDD dictionary");

        Dictionary {
            organization_code: c.organization_code.clone(),
            dictionary_code: c.dictionary_code.clone(),
            dictionary_version: c.dictionary_version.clone(),
            dictionary_name: c.dictionary_name.clone(),
            release_date: self.release_date.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            status: c.status.clone(),
            change_request_email_address: c.change_request_email_address.clone(),
            language_iso_code: c.language_iso_code.clone(),
            license: c.license.clone(),
            license_url: c.license_url.clone(),
            quality_assurance_procedure: c.quality_assurance_procedure.clone(),
            model_version: c.model_version.clone(),
            classes,
            properties,
        }
    }

    /// Read both sheets from a workbook and assemble.
    pub fn build_from_workbook<R: std::io::Read + std::io::Seek>(
        &self,
        workbook: &mut Workbook<R>,
    ) -> Result<Dictionary> {
        let property_rows = workbook.rows(&self.config.property_sheet)?;
        let class_rows = workbook.rows(&self.config.class_sheet)?;
        Ok(self.build(&property_rows, &class_rows))
    }

    fn properties(&self, rows: &SheetRows) -> Vec<DictionaryProperty> {
        let mut out: Vec<DictionaryProperty> = Vec::new();
        for row in rows {
            let (Some(name), Some(definition)) = (cell(row, 0), cell(row, 1)) else { continue };
            if definition == self.config.property_header_marker {
                continue;
            }
            let code = code_for(name);
            if out.iter().any(|p| p.code == code) {
                continue;
            }
            out.push(DictionaryProperty {
                code,
                name: name.to_string(),
                definition: definition.to_string(),
            });
        }
        out
    }

    fn classes(&self, rows: &SheetRows) -> Vec<DictionaryClass> {
        let mut out: Vec<DictionaryClass> = Vec::new();
        for row in rows {
            let (Some(name), Some(ifc_class)) = (cell(row, 1), cell(row, 2)) else { continue };
            if name == self.config.class_header_marker {
                continue;
            }
            let code = code_for(name);
            if out.iter().any(|c| c.code == code) {
                continue;
            }
            let entity = ifc_class.split('.').next().unwrap_or(ifc_class).to_string();
            out.push(DictionaryClass {
                code,
                name: name.to_string(),
                class_type: "Class".into(),
                definition: format!("Represents a {}.", name.to_lowercase()),
                creator_language_iso_code: self.config.language_iso_code.clone(),
                related_ifc_entity_names_list: vec![entity],
                class_relations: vec![ClassRelation {
                    relation_type: "IsEqualTo".into(),
                    related_class_uri: format!(
                        "{}/{}",
                        self.config.ifc_class_base_uri.trim_end_matches('/'),
                        ifc_class.replace('.', "")
                    ),
                }],
                class_properties: Vec::new(),
            });
        }
        out
    }
}

/// Convert a workbook file into a bSDD JSON file.
pub fn convert_workbook(workbook: &Path, output: &Path, config: &BsddConfig) -> Result<Dictionary> {
    let mut book = Workbook::open(workbook)?;
    let dictionary = DictionaryBuilder::new(config).build_from_workbook(&mut book)?;
    dictionary.save(output)?;
    tracing::info!(path = %output.display(), "bSDD JSON written");
    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[Option<&str>]) -> Vec<Option<String>> {
        cells.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn test_code_for() {
        assert_eq!(code_for("Fire Rating"), "firerating");
        assert_eq!(code_for("Door/Window"), "door_window");
    }

    #[test]
    fn test_properties_skip_header_blank_and_duplicates() {
        let config = BsddConfig::default();
        let rows = vec![
            row(&[Some("PROPERTY"), Some("VALUE")]),
            row(&[Some("Fire rating"), Some("Resistance to fire in minutes")]),
            row(&[Some("Fire Rating"), Some("Duplicate code")]),
            row(&[Some("Width"), None]),
            row(&[]),
        ];
        let dict = DictionaryBuilder::new(&config).build(&rows, &Vec::new());
        assert_eq!(dict.properties.len(), 1);
        assert_eq!(dict.properties[0].code, "firerating");
        assert_eq!(dict.properties[0].definition, "Resistance to fire in minutes");
    }

    #[test]
    fn test_class_ifc_mapping() {
        let config = BsddConfig::default();
        let rows = vec![
            row(&[None, Some("ELEMENT"), Some("IFC")]),
            row(&[Some("AR"), Some("Curtain Wall"), Some("IfcCurtainWall.USERDEFINED")]),
        ];
        let dict = DictionaryBuilder::new(&config).build(&Vec::new(), &rows);
        let class = &dict.classes[0];
        assert_eq!(dict.classes.len(), 1);
        assert_eq!(class.code, "curtainwall");
        assert_eq!(class.definition, "Represents a curtain wall.");
        assert_eq!(class.related_ifc_entity_names_list, vec!["IfcCurtainWall"]);
        assert_eq!(
            class.class_relations[0].related_class_uri,
            "https://identifier.buildingsmart.org/uri/buildingsmart/ifc/4.3/class/IfcCurtainWallUSERDEFINED"
        );
    }

    #[test]
    fn test_json_uses_pascal_case_keys() {
        let config = BsddConfig::default();
        let date = NaiveDateTime::parse_from_str("2024-09-10 08:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let dict = DictionaryBuilder::new(&config).release_date(date).build(&Vec::new(), &Vec::new());
        let value: serde_json::Value = serde_json::from_str(&dict.to_json().unwrap()).unwrap();
        assert_eq!(value["OrganizationCode"], "bw");
        assert_eq!(value["ReleaseDate"], "2024-09-10T08:30:00.000000");
        assert_eq!(value["ChangeRequestEmailAddress"], "louis.casteleyn@buildwise.be");
        assert!(value["Classes"].as_array().unwrap().is_empty());
    }
}
