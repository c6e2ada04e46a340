//! # Classification Documents
//!
//! Adapter between the vendor classification XML and the model:
//!
//! ```text
//! <…>
//!   <System>
//!     <Name/> <EditionVersion/>
//!     <Items>
//!       <Item> <ID/> <Name/> <Children> <Item/>… </Children> </Item>
//!     </Items>
//!   </System>
//!   <PropertyDefinitionGroups>
//!     <PropertyDefinitionGroup>
//!       <PropertyDefinitions>
//!         <PropertyDefinition>
//!           <Name/> …
//!           <ClassificationIDs>
//!             <ClassificationID> <ItemID/> <SystemIDName/> <SystemIDVersion/> </ClassificationID>
//!           </ClassificationIDs>
//!         </PropertyDefinition>
//! ```
//!
//! Only `Items` (read) and the `PropertyDefinition` entries (read and
//! rewritten) are interpreted; everything else passes through untouched.

pub mod xml;
pub mod tree;

use std::path::Path;

use crate::config::LanguageConfig;
use crate::model::{DeclarationTable, Forest, PropertyDeclaration};
use crate::{Error, Result};
use xml::{XmlDocument, XmlElement};

// Element names of the classification schema.
const SYSTEM: &str = "System";
const SYSTEM_NAME: &str = "Name";
const SYSTEM_VERSION: &str = "EditionVersion";
const ITEMS: &str = "Items";
const GROUPS: &str = "PropertyDefinitionGroups";
const GROUP: &str = "PropertyDefinitionGroup";
const GROUP_DEFINITIONS: &str = "PropertyDefinitions";
const DEFINITION: &str = "PropertyDefinition";
const DEFINITION_NAME: &str = "Name";
const CLASSIFICATION_IDS: &str = "ClassificationIDs";
const CLASSIFICATION_ID: &str = "ClassificationID";
const ITEM_ID: &str = "ItemID";

/// Classification system the document's items belong to; stamped on every
/// written `ClassificationID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub name: String,
    pub version: String,
}

/// A classification XML document.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationDocument {
    xml: XmlDocument,
}

impl ClassificationDocument {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self { xml: XmlDocument::parse(text)? })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn xml(&self) -> &XmlDocument {
        &self.xml
    }

    pub fn to_xml_string(&self) -> Result<String> {
        self.xml.to_xml_string()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml_string()?)?;
        Ok(())
    }

    // ========================================================================
    // Structure
    // ========================================================================

    pub fn system(&self) -> Result<SystemInfo> {
        let system = self
            .xml
            .root
            .find(SYSTEM)
            .ok_or_else(|| Error::MissingSection(SYSTEM.into()))?;
        Ok(SystemInfo {
            name: system.child_text(SYSTEM_NAME).unwrap_or_default(),
            version: system.child_text(SYSTEM_VERSION).unwrap_or_default(),
        })
    }

    /// Classification tree from the first `Items` element.
    pub fn build_forest(&self) -> Result<Forest> {
        let items = self
            .xml
            .root
            .find(ITEMS)
            .ok_or_else(|| Error::MissingSection(ITEMS.into()))?;
        Ok(tree::build_forest(items))
    }

    fn groups(&self) -> Result<&XmlElement> {
        self.xml
            .root
            .find(GROUPS)
            .ok_or_else(|| Error::MissingSection(GROUPS.into()))
    }

    fn groups_mut(&mut self) -> Result<&mut XmlElement> {
        self.xml
            .root
            .find_mut(GROUPS)
            .ok_or_else(|| Error::MissingSection(GROUPS.into()))
    }

    /// Names of every property definition, document order.
    pub fn property_names(&self) -> Result<Vec<String>> {
        Ok(self
            .groups()?
            .descendants(DEFINITION)
            .into_iter()
            .filter_map(|def| def.child_text(DEFINITION_NAME))
            .collect())
    }

    // ========================================================================
    // Languages
    // ========================================================================

    /// First language profile with a declared marker property, else the
    /// configured default.
    pub fn detect_language(&self, languages: &LanguageConfig) -> String {
        let names = self.property_names().unwrap_or_default();
        languages
            .profiles
            .iter()
            .find(|profile| profile.markers.iter().any(|m| names.contains(m)))
            .map(|profile| profile.name.clone())
            .unwrap_or_else(|| languages.default_language.clone())
    }

    /// Delete every property definition whose name is listed.
    pub fn strip_properties(&mut self, names: &[String]) -> Result<usize> {
        if names.is_empty() {
            return Ok(0);
        }
        let removed = self.groups_mut()?.remove_where(&|e| {
            e.name == DEFINITION
                && e.child_text(DEFINITION_NAME).is_some_and(|n| names.contains(&n))
        });
        Ok(removed)
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Every property definition and the item ids it is declared against.
    pub fn declarations(&self) -> Result<DeclarationTable> {
        let mut entries = Vec::new();
        for def in self.groups()?.descendants(DEFINITION) {
            let Some(name) = def.child_text(DEFINITION_NAME) else {
                tracing::warn!("skipping property definition without Name");
                continue;
            };
            let ids = def
                .descendants(CLASSIFICATION_ID)
                .into_iter()
                .filter_map(|cid| cid.child_text(ITEM_ID));
            entries.push(PropertyDeclaration::new(name).with_ids(ids));
        }
        Ok(DeclarationTable::new(entries))
    }

    /// Rewrite every definition's `ClassificationIDs` from the table and
    /// append scaffolded definitions for names the document lacks.
    pub fn apply_declarations(&mut self, table: &DeclarationTable) -> Result<()> {
        let system = self.system()?;
        let groups = self.groups_mut()?;

        let mut existing: Vec<String> = Vec::new();
        groups.visit_mut(DEFINITION, &mut |def| {
            let Some(name) = def.child_text(DEFINITION_NAME) else { return };
            let ids = table.ids_for(&name).unwrap_or_default();
            if def.child(CLASSIFICATION_IDS).is_none() {
                def.push(XmlElement::new(CLASSIFICATION_IDS));
            }
            let Some(container) = def.child_mut(CLASSIFICATION_IDS) else { return };
            container.children.clear();
            for id in ids {
                container.push(classification_id(id.as_str(), &system));
            }
            existing.push(name);
        });

        let missing: Vec<&PropertyDeclaration> = table
            .iter()
            .filter(|decl| !existing.contains(&decl.name))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let group = groups
            .child_mut(GROUP)
            .ok_or_else(|| Error::MissingSection(GROUP.into()))?;
        let target = if group.child(GROUP_DEFINITIONS).is_some() {
            group
                .child_mut(GROUP_DEFINITIONS)
                .ok_or_else(|| Error::MissingSection(GROUP_DEFINITIONS.into()))?
        } else {
            group
        };
        for decl in missing {
            tracing::debug!(property = %decl.name, items = decl.associated_ids.len(), "adding property definition");
            target.push(scaffold_definition(decl, &system));
        }
        Ok(())
    }
}

fn classification_id(item: &str, system: &SystemInfo) -> XmlElement {
    XmlElement::new(CLASSIFICATION_ID)
        .with_child(XmlElement::with_text(ITEM_ID, item))
        .with_child(XmlElement::with_text("SystemIDName", system.name.as_str()))
        .with_child(XmlElement::with_text("SystemIDVersion", system.version.as_str()))
}

/// Minimal string-valued definition for a property the document never
/// declared.
fn scaffold_definition(decl: &PropertyDeclaration, system: &SystemInfo) -> XmlElement {
    let mut ids = XmlElement::new(CLASSIFICATION_IDS);
    for id in &decl.associated_ids {
        ids.push(classification_id(id.as_str(), system));
    }

    XmlElement::new(DEFINITION)
        .with_child(XmlElement::with_text(DEFINITION_NAME, decl.name.as_str()))
        .with_child(XmlElement::new("Description"))
        .with_child(
            XmlElement::new("ValueDescriptor")
                .with_attribute("Type", "SingleValueDescriptor")
                .with_child(XmlElement::with_text("ValueType", "String")),
        )
        .with_child(XmlElement::with_text("MeasureType", "Default"))
        .with_child(
            XmlElement::new("DefaultValue")
                .with_child(XmlElement::with_text("DefaultValueType", "Basic"))
                .with_child(
                    XmlElement::new("Variant")
                        .with_attribute("Type", "StringVariant")
                        .with_child(XmlElement::with_text("Status", "UserUndefined")),
                ),
        )
        .with_child(ids)
}
