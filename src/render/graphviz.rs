// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use thiserror::Error;

use crate::otm::{DataFlow, OpenThreatModel, ValidationError};

use super::containment::{resolve_model_containment, ContainmentError, ContainmentNode};

const INDENT: &str = "    ";
const CLUSTER_COLOR: &str = "lightskyblue";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Containment(#[from] ContainmentError),
}

/// Renders `model` as a Graphviz digraph: one cluster per container, one edge per flow.
///
/// The model is validated first and its validation error is returned unchanged.
pub fn render_graphviz(model: &OpenThreatModel) -> Result<String, RenderError> {
    model.validate()?;
    let roots = resolve_model_containment(model)?;

    let mut out = String::from("digraph G {\n");
    let placed = write_clusters(&mut out, &roots);

    for component in &model.components {
        if !placed.contains(component.id.as_str()) {
            write_node(&mut out, 1, &component.id, &component.name);
        }
    }

    for flow in &model.data_flows {
        write_edge(&mut out, flow, &flow.source, &flow.destination);
        if flow.bidirectional {
            write_edge(&mut out, flow, &flow.destination, &flow.source);
        }
    }

    out.push_str("}\n");
    Ok(out)
}

enum Step<'a> {
    Enter(&'a ContainmentNode, usize),
    Exit(&'a ContainmentNode, usize),
}

/// Writes the cluster forest and returns the ids it placed (containers and leaves).
fn write_clusters<'a>(out: &mut String, roots: &'a [ContainmentNode]) -> BTreeSet<&'a str> {
    let mut placed = BTreeSet::new();
    let mut stack = roots
        .iter()
        .rev()
        .map(|root| Step::Enter(root, 1))
        .collect::<Vec<_>>();

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node, depth) => {
                placed.insert(node.id.as_str());
                let pad = INDENT.repeat(depth);
                let _ = writeln!(out, "{pad}subgraph cluster_{} {{", sanitise_id(&node.id));
                let _ = writeln!(out, "{pad}{INDENT}label=\"{}\"", escape_label(&node.name));
                let _ = writeln!(out, "{pad}{INDENT}bgcolor={CLUSTER_COLOR}");

                stack.push(Step::Exit(node, depth));
                stack.extend(
                    node.nested_children
                        .iter()
                        .rev()
                        .map(|child| Step::Enter(child, depth + 1)),
                );
            }
            Step::Exit(node, depth) => {
                for (id, name) in &node.leaf_children {
                    placed.insert(id.as_str());
                    write_node(out, depth + 1, id, name);
                }
                let _ = writeln!(out, "{}}}", INDENT.repeat(depth));
            }
        }
    }

    placed
}

fn write_node(out: &mut String, depth: usize, id: &str, name: &str) {
    let _ = writeln!(
        out,
        "{}{}[label=\"{}\"]",
        INDENT.repeat(depth),
        sanitise_id(id),
        escape_label(name)
    );
}

fn write_edge(out: &mut String, flow: &DataFlow, from: &str, to: &str) {
    let _ = write!(out, "{INDENT}{} -> {}", sanitise_id(from), sanitise_id(to));
    if !flow.name.is_empty() {
        let _ = write!(out, "[label=\"{}\"]", escape_label(&flow.name));
    }
    out.push('\n');
}

/// Maps an element id onto a DOT identifier.
///
/// Characters outside `[A-Za-z0-9_]` become `_`, and a leading digit gets a `_` prefix.
pub fn sanitise_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 1);
    if id.chars().next().map_or(true, |ch| ch.is_ascii_digit()) {
        out.push('_');
    }
    out.extend(id.chars().map(|ch| {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            ch
        } else {
            '_'
        }
    }));
    out
}

fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            ch => out.push(ch),
        }
    }
    out
}
