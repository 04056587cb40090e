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
use super::project::Project;

/// Denormalized view of workspace membership: workspace name to its member projects.
///
/// `Project::workspace` is authoritative. The index is a cache that may drift after a crash
/// between the project write and the index write; rebuilding it from project records repairs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceIndex {
    #[serde(default)]
    pub details: BTreeMap<String, WorkspaceDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDetail {
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl WorkspaceIndex {
    /// Groups the given projects by their workspace field.
    pub fn from_projects<'a>(projects: impl IntoIterator<Item = &'a Project>) -> Self {
        let mut index = Self::default();
        for project in projects {
            index
                .details
                .entry(project.workspace().to_owned())
                .or_default()
                .projects
                .push(project.clone());
        }
        index
    }

    pub fn members(&self, workspace: &str) -> &[Project] {
        self.details
            .get(workspace)
            .map(|detail| detail.projects.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, workspace: &str, project_id: &ProjectId) -> bool {
        self.members(workspace).iter().any(|p| &p.id == project_id)
    }

    /// Records `project` under its workspace, replacing a stale entry with the same id.
    pub fn add_project(&mut self, project: &Project) {
        let detail = self.details.entry(project.workspace().to_owned()).or_default();
        match detail.projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => *existing = project.clone(),
            None => detail.projects.push(project.clone()),
        }
    }

    /// Removes `project` from the member list of its own workspace only.
    ///
    /// Returns whether an entry was removed.
    pub fn remove_project(&mut self, project: &Project) -> bool {
        let Some(detail) = self.details.get_mut(project.workspace()) else {
            return false;
        };
        let before = detail.projects.len();
        detail.projects.retain(|p| p.id != project.id);
        detail.projects.len() != before
    }

    /// Replaces the member list of `workspace` wholesale.
    pub fn set_members(&mut self, workspace: impl Into<String>, projects: Vec<Project>) {
        self.details.insert(workspace.into(), WorkspaceDetail { projects });
    }
}
