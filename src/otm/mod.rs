// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Open Threat Model documents: trust zones, components and the data flows between them.
//!
//! Parsing only checks YAML shape. Referential integrity is checked by
//! [`OpenThreatModel::validate`], which the renderer runs before it touches the graph.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenThreatModel {
    #[serde(default)]
    pub otm_version: String,
    #[serde(default)]
    pub project: OtmProject,
    #[serde(default)]
    pub trust_zones: Vec<TrustZone>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub data_flows: Vec<DataFlow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtmProject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustZone {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<TrustRisk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustRisk {
    #[serde(default)]
    pub trust_rating: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Parent reference of a zone or component: `{trustZone: id}` or `{component: id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
}

impl ParentRef {
    pub fn trust_zone(id: impl Into<String>) -> Self {
        Self {
            trust_zone: Some(id.into()),
            component: None,
        }
    }

    pub fn component(id: impl Into<String>) -> Self {
        Self {
            trust_zone: None,
            component: Some(id.into()),
        }
    }

    /// The referenced id. A trust zone reference wins if both are (invalidly) present.
    pub fn id(&self) -> Option<&str> {
        self.trust_zone.as_deref().or(self.component.as_deref())
    }

    pub fn is_trust_zone(&self) -> bool {
        self.trust_zone.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlow {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub bidirectional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    TrustZone,
    Component,
    DataFlow,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TrustZone => "trust zone",
            Self::Component => "component",
            Self::DataFlow => "data flow",
        })
    }
}

/// Every referential problem found in a model, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid threat model: {}", .problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("threat model is empty")]
    Empty,
    #[error("threat model is not valid OTM YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl OpenThreatModel {
    /// Display name of a trust zone or component.
    pub fn get_name_by_id(&self, id: &str) -> Option<&str> {
        self.trust_zones
            .iter()
            .find(|zone| zone.id == id)
            .map(|zone| zone.name.as_str())
            .or_else(|| {
                self.components
                    .iter()
                    .find(|component| component.id == id)
                    .map(|component| component.name.as_str())
            })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        if self.otm_version.trim().is_empty() {
            problems.push("otmVersion is missing".to_owned());
        }
        if self.project.id.trim().is_empty() {
            problems.push("project id is missing".to_owned());
        }
        if self.project.name.trim().is_empty() {
            problems.push("project name is missing".to_owned());
        }

        let mut kinds = BTreeMap::<&str, ElementKind>::new();
        let elements = self
            .trust_zones
            .iter()
            .map(|zone| (ElementKind::TrustZone, zone.id.as_str()))
            .chain(
                self.components
                    .iter()
                    .map(|component| (ElementKind::Component, component.id.as_str())),
            )
            .chain(
                self.data_flows
                    .iter()
                    .map(|flow| (ElementKind::DataFlow, flow.id.as_str())),
            );
        for (kind, id) in elements {
            if id.trim().is_empty() {
                problems.push(format!("{kind} with an empty id"));
                continue;
            }
            if let Some(previous) = kinds.insert(id, kind) {
                problems.push(format!("duplicate id {id:?} ({previous} and {kind})"));
            }
        }

        let zone_ids = self
            .trust_zones
            .iter()
            .map(|zone| zone.id.as_str())
            .collect::<BTreeSet<_>>();
        let component_ids = self
            .components
            .iter()
            .map(|component| component.id.as_str())
            .collect::<BTreeSet<_>>();

        let parents = self
            .trust_zones
            .iter()
            .map(|zone| (ElementKind::TrustZone, zone.id.as_str(), zone.parent.as_ref()))
            .chain(self.components.iter().map(|component| {
                (
                    ElementKind::Component,
                    component.id.as_str(),
                    component.parent.as_ref(),
                )
            }));
        for (kind, id, parent) in parents {
            let Some(parent) = parent else {
                continue;
            };
            match (parent.trust_zone.as_deref(), parent.component.as_deref()) {
                (Some(zone), None) => {
                    if !zone_ids.contains(zone) {
                        problems.push(format!("{kind} {id:?} has unknown parent trust zone {zone:?}"));
                    }
                }
                (None, Some(component)) => {
                    if !component_ids.contains(component) {
                        problems.push(format!(
                            "{kind} {id:?} has unknown parent component {component:?}"
                        ));
                    }
                }
                (Some(_), Some(_)) => {
                    problems.push(format!("{kind} {id:?} names both a trust zone and a component as parent"));
                }
                (None, None) => {
                    problems.push(format!("{kind} {id:?} has an empty parent"));
                }
            }
        }

        for flow in &self.data_flows {
            for (end, target) in [("source", &flow.source), ("destination", &flow.destination)] {
                let target = target.as_str();
                if !zone_ids.contains(target) && !component_ids.contains(target) {
                    problems.push(format!(
                        "data flow {:?} has unknown {end} {target:?}",
                        flow.id
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { problems })
        }
    }
}

/// Turns threat model text into an [`OpenThreatModel`].
pub trait ThreatModelParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<OpenThreatModel, ParseError>;
}

/// Parses the Open Threat Model YAML format (JSON documents are accepted too, being YAML).
#[derive(Debug, Clone, Copy, Default)]
pub struct OtmYamlParser;

impl ThreatModelParser for OtmYamlParser {
    fn parse(&self, text: &str) -> Result<OpenThreatModel, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{OtmYamlParser, ParentRef, ParseError, ThreatModelParser};

    const SAMPLE: &str = r#"
otmVersion: 0.2.0
project:
  name: Payments
  id: payments
trustZones:
  - id: internet
    name: Internet
    risk:
      trustRating: 1
  - id: dmz
    name: DMZ
    parent:
      trustZone: internet
components:
  - id: web
    name: Web Server
    type: web-server
    parent:
      trustZone: dmz
  - id: db
    name: Database
    parent:
      component: web
dataFlows:
  - id: f1
    name: SQL
    source: web
    destination: db
    bidirectional: true
"#;

    #[test]
    fn parses_camel_case_document() {
        let model = OtmYamlParser.parse(SAMPLE).unwrap();
        assert_eq!(model.otm_version, "0.2.0");
        assert_eq!(model.trust_zones.len(), 2);
        assert_eq!(model.trust_zones[1].parent, Some(ParentRef::trust_zone("internet")));
        assert_eq!(model.components[0].kind.as_deref(), Some("web-server"));
        assert_eq!(model.components[1].parent, Some(ParentRef::component("web")));
        assert!(model.data_flows[0].bidirectional);
        model.validate().unwrap();
    }

    #[test]
    fn looks_up_names_across_zones_and_components() {
        let model = OtmYamlParser.parse(SAMPLE).unwrap();
        assert_eq!(model.get_name_by_id("dmz"), Some("DMZ"));
        assert_eq!(model.get_name_by_id("db"), Some("Database"));
        assert_eq!(model.get_name_by_id("f1"), None);
    }

    #[test]
    fn empty_text_is_a_parse_error() {
        assert!(matches!(OtmYamlParser.parse("  \n"), Err(ParseError::Empty)));
    }

    #[test]
    fn wrong_shape_is_a_parse_error() {
        assert!(matches!(
            OtmYamlParser.parse("components: 42"),
            Err(ParseError::Yaml(_))
        ));
    }

    #[test]
    fn validation_collects_every_problem() {
        let text = r#"
otmVersion: 0.2.0
project:
  name: Broken
  id: broken
trustZones:
  - id: z1
    name: Zone
components:
  - id: z1
    name: Clash
  - id: c2
    name: Orphan
    parent:
      trustZone: nowhere
  - id: c3
    name: Wrong kind
    parent:
      component: z1x
dataFlows:
  - id: f1
    name: Lost
    source: c2
    destination: ghost
"#;
        let model = OtmYamlParser.parse(text).unwrap();
        let err = model.validate().unwrap_err();

        assert_eq!(err.problems.len(), 4, "{:?}", err.problems);
        assert!(err.problems[0].contains("duplicate id \"z1\""));
        assert!(err.problems[1].contains("unknown parent trust zone \"nowhere\""));
        assert!(err.problems[2].contains("unknown parent component \"z1x\""));
        assert!(err.problems[3].contains("unknown destination \"ghost\""));
    }

    #[test]
    fn parent_of_the_wrong_kind_is_rejected() {
        let text = r#"
otmVersion: 0.2.0
project: {name: P, id: p}
trustZones:
  - {id: z, name: Z}
components:
  - id: c
    name: C
    parent: {component: z}
"#;
        let err = OtmYamlParser.parse(text).unwrap().validate().unwrap_err();
        assert_eq!(err.problems, vec!["component \"c\" has unknown parent component \"z\""]);
    }

    #[test]
    fn missing_header_fields_fail_validation() {
        let model = OtmYamlParser.parse("trustZones: []").unwrap();
        let err = model.validate().unwrap_err();
        assert_eq!(err.problems.len(), 3);
        assert!(err.to_string().starts_with("invalid threat model: otmVersion is missing"));
    }
}
