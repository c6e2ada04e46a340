//! Inheritance profiles: a compact, editable description of a propagated tree.
//!
//! Each entry says how a node's property set differs from its parent's:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `not_inherited_from` | parent properties this node drops |
//! | `new_properties` | properties this node adds |
//! | `never_inherit_to` | properties of this node that none of its children get |
//!
//! Nodes identical to their parent (and with no interesting descendants) are
//! left out. Exporting a forest and applying the result to the same forest
//! reproduces every property set; editing the profile first is how property
//! inheritance is curated by hand.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::{ClassificationNode, Forest, ItemId, PropertySet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceRule {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "PropertySet::is_empty")]
    pub not_inherited_from: PropertySet,
    #[serde(default, skip_serializing_if = "PropertySet::is_empty")]
    pub new_properties: PropertySet,
    #[serde(default, skip_serializing_if = "PropertySet::is_empty")]
    pub never_inherit_to: PropertySet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<InheritanceRule>,
}

impl InheritanceRule {
    fn is_trivial(&self) -> bool {
        self.not_inherited_from.is_empty()
            && self.new_properties.is_empty()
            && self.never_inherit_to.is_empty()
            && self.children.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InheritanceProfile {
    pub rules: Vec<InheritanceRule>,
}

impl InheritanceProfile {
    /// Describe every node of the forest relative to its parent.
    pub fn export(forest: &Forest) -> Self {
        let root_inherited = PropertySet::new();
        let rules = forest
            .roots
            .iter()
            .filter_map(|root| export_node(root, &root_inherited))
            .collect();
        Self { rules }
    }

    /// Recompute every node's properties from the profile, top down.
    pub fn apply(&self, forest: &mut Forest) {
        let mut lookup = HashMap::new();
        for rule in &self.rules {
            index_rule(rule, &mut lookup);
        }
        let root_inherited = PropertySet::new();
        for root in &mut forest.roots {
            apply_node(root, &root_inherited, &lookup);
        }
    }

    /// Rule for an id anywhere in the profile.
    pub fn rule(&self, id: &str) -> Option<&InheritanceRule> {
        fn find<'a>(rules: &'a [InheritanceRule], id: &str) -> Option<&'a InheritanceRule> {
            rules.iter().find_map(|r| if r.id.as_str() == id { Some(r) } else { find(&r.children, id) })
        }
        find(&self.rules, id)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

fn export_node(node: &ClassificationNode, inherited: &PropertySet) -> Option<InheritanceRule> {
    let children: Vec<InheritanceRule> = node
        .children
        .iter()
        .filter_map(|child| export_node(child, &node.properties))
        .collect();

    let never_inherit_to = if node.is_leaf() {
        PropertySet::new()
    } else {
        let reached: PropertySet = node
            .children
            .iter()
            .flat_map(|child| child.properties.iter().cloned())
            .collect();
        node.properties.difference(&reached).cloned().collect()
    };

    let rule = InheritanceRule {
        id: node.id.clone(),
        not_inherited_from: inherited.difference(&node.properties).cloned().collect(),
        new_properties: node.properties.difference(inherited).cloned().collect(),
        never_inherit_to,
        children,
    };
    (!rule.is_trivial()).then_some(rule)
}

fn index_rule<'a>(rule: &'a InheritanceRule, lookup: &mut HashMap<&'a str, &'a InheritanceRule>) {
    lookup.insert(rule.id.as_str(), rule);
    for child in &rule.children {
        index_rule(child, lookup);
    }
}

fn apply_node(
    node: &mut ClassificationNode,
    inherited: &PropertySet,
    lookup: &HashMap<&str, &InheritanceRule>,
) {
    let rule = lookup.get(node.id.as_str()).copied();

    let mut properties = inherited.clone();
    if let Some(rule) = rule {
        properties.retain(|p| !rule.not_inherited_from.contains(p));
        properties.extend(rule.new_properties.iter().cloned());
    }
    node.properties = properties;

    let passed_down: PropertySet = match rule {
        Some(rule) => node.properties.difference(&rule.never_inherit_to).cloned().collect(),
        None => node.properties.clone(),
    };
    for child in &mut node.children {
        apply_node(child, &passed_down, lookup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::property_set;

    fn forest() -> Forest {
        Forest::new(vec![
            ClassificationNode::new("Wall")
                .with_properties(["Thickness", "Fire rating"])
                .with_children([
                    ClassificationNode::new("Curtain wall").with_properties(["Thickness", "Glazing"]),
                    ClassificationNode::new("Partition").with_properties(["Thickness"]),
                ]),
            ClassificationNode::new("Slab"),
        ])
    }

    #[test]
    fn test_export_describes_differences() {
        let profile = InheritanceProfile::export(&forest());
        let wall = profile.rule("Wall").unwrap();
        assert_eq!(wall.new_properties, property_set(["Fire rating", "Thickness"]));
        assert_eq!(wall.never_inherit_to, property_set(["Fire rating"]));

        let curtain = profile.rule("Curtain wall").unwrap();
        assert_eq!(curtain.not_inherited_from, property_set(["Fire rating"]));
        assert_eq!(curtain.new_properties, property_set(["Glazing"]));

        // Identical to nothing-inherited and empty: omitted.
        assert!(profile.rule("Slab").is_none());
    }

    #[test]
    fn test_never_inherit_blocks_descendants() {
        let mut forest = Forest::new(vec![
            ClassificationNode::new("Stair").with_child(
                ClassificationNode::new("Spiral stair").with_child(ClassificationNode::new("Steel spiral stair")),
            ),
        ]);
        let profile = InheritanceProfile::from_json(r#"[
            { "id": "Stair", "new_properties": ["Riser height", "Handrail"], "never_inherit_to": ["Handrail"] }
        ]"#).unwrap();

        profile.apply(&mut forest);

        assert_eq!(forest.find("Stair").unwrap().properties, property_set(["Handrail", "Riser height"]));
        assert_eq!(forest.find("Spiral stair").unwrap().properties, property_set(["Riser height"]));
        assert_eq!(forest.find("Steel spiral stair").unwrap().properties, property_set(["Riser height"]));
    }

    #[test]
    fn test_json_omits_empty_fields() {
        let json = InheritanceProfile::export(&forest()).to_json().unwrap();
        assert!(!json.contains("\"not_inherited_from\": []"));
        assert!(json.contains("never_inherit_to"));
    }
}
