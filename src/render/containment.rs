// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Turns flat parent-pointer-linked zones and components into a containment forest.
//!
//! Every step works on id-ordered maps and the nested structure is first built as an id graph,
//! so the result does not depend on input order and a malformed cycle is reported before any
//! tree is materialised.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use crate::otm::{OpenThreatModel, ParentRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContainerKind {
    Component,
    Zone,
}

impl ContainerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Zone => "zone",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One zone or component as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainmentInput<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub parent: Option<ParentLink<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink<'a> {
    pub id: &'a str,
    pub is_zone: bool,
}

impl<'a> ContainmentInput<'a> {
    pub fn new(id: &'a str, name: &'a str) -> Self {
        Self {
            id,
            name,
            parent: None,
        }
    }

    pub fn in_zone(mut self, zone: &'a str) -> Self {
        self.parent = Some(ParentLink {
            id: zone,
            is_zone: true,
        });
        self
    }

    pub fn in_component(mut self, component: &'a str) -> Self {
        self.parent = Some(ParentLink {
            id: component,
            is_zone: false,
        });
        self
    }
}

/// A container with its direct leaf members and nested containers.
///
/// `leaf_children` maps child id to display name. `nested_children` is sorted by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainmentNode {
    pub kind: ContainerKind,
    pub id: String,
    pub name: String,
    pub leaf_children: BTreeMap<String, String>,
    pub nested_children: Vec<ContainmentNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainmentError {
    #[error("containment cycle detected at {id:?}")]
    CycleDetected { id: String },
}

#[derive(Debug)]
struct Draft<'a> {
    kind: ContainerKind,
    name: &'a str,
    leaves: BTreeMap<&'a str, &'a str>,
    nested: BTreeSet<&'a str>,
}

impl<'a> Draft<'a> {
    fn new(kind: ContainerKind, name: &'a str) -> Self {
        Self {
            kind,
            name,
            leaves: BTreeMap::new(),
            nested: BTreeSet::new(),
        }
    }
}

/// Resolves the containment forest of `components` and `zones`.
///
/// Returns the root containers sorted by id. Components without a parent that contain nothing
/// do not appear; they are not containers.
pub fn resolve_containment<'a>(
    components: &[ContainmentInput<'a>],
    zones: &[ContainmentInput<'a>],
) -> Result<Vec<ContainmentNode>, ContainmentError> {
    let mut names = BTreeMap::<&'a str, &'a str>::new();
    for element in components.iter().chain(zones) {
        names.insert(element.id, element.name);
    }

    let mut drafts = BTreeMap::<&'a str, Draft<'a>>::new();

    // Parents of components, with the component as a leaf.
    for component in components {
        let Some(parent) = component.parent else {
            continue;
        };
        let draft = ensure_parent(&mut drafts, &names, parent);
        draft.leaves.insert(component.id, component.name);
    }

    // Every zone is a container; a zone nests directly under its parent.
    for zone in zones {
        let draft = drafts
            .entry(zone.id)
            .or_insert_with(|| Draft::new(ContainerKind::Zone, zone.name));
        draft.kind = ContainerKind::Zone;
        if draft.name.is_empty() {
            draft.name = zone.name;
        }

        if let Some(parent) = zone.parent {
            ensure_parent(&mut drafts, &names, parent).nested.insert(zone.id);
        }
    }

    // Leaves that are containers themselves move to the nested set.
    let container_ids = drafts.keys().copied().collect::<BTreeSet<_>>();
    for draft in drafts.values_mut() {
        let promoted = draft
            .leaves
            .keys()
            .copied()
            .filter(|id| container_ids.contains(id))
            .collect::<Vec<_>>();
        for id in promoted {
            draft.leaves.remove(id);
            draft.nested.insert(id);
        }
    }

    let order = finish_order(&drafts)?;

    let mut parent_counts = BTreeMap::<&str, usize>::new();
    for child in drafts.values().flat_map(|draft| draft.nested.iter().copied()) {
        *parent_counts.entry(child).or_default() += 1;
    }

    // Children finish before their parents, so every nested child is built by the time its
    // parent is. A child shared by several parents (duplicate ids) is copied into each.
    let mut built = BTreeMap::<&str, ContainmentNode>::new();
    for id in order {
        let Some(draft) = drafts.get(id) else {
            continue;
        };
        let nested_children = draft
            .nested
            .iter()
            .filter_map(|child| match parent_counts.get_mut(child) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    built.get(child).cloned()
                }
                _ => built.remove(child),
            })
            .collect();
        built.insert(
            id,
            ContainmentNode {
                kind: draft.kind,
                id: id.to_owned(),
                name: draft.name.to_owned(),
                leaf_children: draft
                    .leaves
                    .iter()
                    .map(|(id, name)| ((*id).to_owned(), (*name).to_owned()))
                    .collect(),
                nested_children,
            },
        );
    }

    Ok(drafts
        .keys()
        .filter(|id| !parent_counts.contains_key(*id))
        .filter_map(|id| built.remove(id))
        .collect())
}

/// [`resolve_containment`] over the zones and components of a threat model.
pub fn resolve_model_containment(
    model: &OpenThreatModel,
) -> Result<Vec<ContainmentNode>, ContainmentError> {
    let components = model
        .components
        .iter()
        .map(|component| ContainmentInput {
            id: &component.id,
            name: &component.name,
            parent: parent_link(component.parent.as_ref()),
        })
        .collect::<Vec<_>>();
    let zones = model
        .trust_zones
        .iter()
        .map(|zone| ContainmentInput {
            id: &zone.id,
            name: &zone.name,
            parent: parent_link(zone.parent.as_ref()),
        })
        .collect::<Vec<_>>();

    resolve_containment(&components, &zones)
}

fn parent_link(parent: Option<&ParentRef>) -> Option<ParentLink<'_>> {
    let parent = parent?;
    parent.id().map(|id| ParentLink {
        id,
        is_zone: parent.is_trust_zone(),
    })
}

fn ensure_parent<'d, 'a>(
    drafts: &'d mut BTreeMap<&'a str, Draft<'a>>,
    names: &BTreeMap<&'a str, &'a str>,
    parent: ParentLink<'a>,
) -> &'d mut Draft<'a> {
    let kind = if parent.is_zone {
        ContainerKind::Zone
    } else {
        ContainerKind::Component
    };
    let draft = drafts.entry(parent.id).or_insert_with(|| {
        Draft::new(kind, names.get(parent.id).copied().unwrap_or_default())
    });
    if kind == ContainerKind::Zone {
        draft.kind = ContainerKind::Zone;
    }
    draft
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

/// Post-order over the nested edges (children before parents).
///
/// Fails on the first container that is reachable from itself.
fn finish_order<'a>(drafts: &BTreeMap<&'a str, Draft<'a>>) -> Result<Vec<&'a str>, ContainmentError> {
    let mut marks = BTreeMap::<&str, Mark>::new();
    let mut order = Vec::with_capacity(drafts.len());

    for &start in drafts.keys() {
        if marks.contains_key(start) {
            continue;
        }

        let mut stack = vec![(start, children_of(drafts, start))];
        marks.insert(start, Mark::OnPath);

        while let Some((id, children)) = stack.last_mut() {
            match children.next() {
                Some(child) => match marks.get(child) {
                    Some(Mark::OnPath) => {
                        return Err(ContainmentError::CycleDetected {
                            id: child.to_owned(),
                        });
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::OnPath);
                        stack.push((child, children_of(drafts, child)));
                    }
                },
                None => {
                    let id = *id;
                    marks.insert(id, Mark::Done);
                    order.push(id);
                    stack.pop();
                }
            }
        }
    }

    Ok(order)
}

fn children_of<'s, 'a>(
    drafts: &'s BTreeMap<&'a str, Draft<'a>>,
    id: &str,
) -> std::vec::IntoIter<&'a str> {
    drafts
        .get(id)
        .map(|draft| draft.nested.iter().copied().collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
}
