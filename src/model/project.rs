// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::ProjectId;

/// The mutable part of a project, as supplied by clients on create/update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescription {
    #[serde(default)]
    pub name: String,
    /// Name of the workspace the project belongs to. This field is the source of truth for
    /// membership; the workspace index only mirrors it.
    #[serde(default)]
    pub workspace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub owner_contact: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ProjectDescription {
    pub fn new(name: impl Into<String>, workspace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workspace: workspace.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(flatten)]
    pub description: ProjectDescription,
}

impl Project {
    pub fn new(id: ProjectId, description: ProjectDescription) -> Self {
        Self { id, description }
    }

    pub fn name(&self) -> &str {
        &self.description.name
    }

    pub fn workspace(&self) -> &str {
        &self.description.workspace
    }
}
