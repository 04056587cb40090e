// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::io;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{Message, ModelRecord, Project, ProjectDescription, ProjectId, WorkspaceIndex};

use super::keys::{decode_key, encode_key, workspace_index_key, Table};
use super::kv::{KeyStore, SqliteKeyStore, StoreError, WriteTxn};
use super::writeback::IndexWriteback;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{table} not found: {id}")]
    NotFound { table: &'static str, id: String },
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("cannot decode {table} record {id:?}: {source}")]
    Decode {
        table: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode {table} record: {source}")]
    Encode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot start index write-back worker: {0}")]
    Worker(#[source] io::Error),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    fn not_found(table: Table, id: &ProjectId) -> Self {
        Self::NotFound {
            table: table.name(),
            id: id.as_str().to_owned(),
        }
    }
}

/// Applies a project's workspace move to the index.
///
/// Runs on the background writer inside the write transaction that saves the index, so
/// `index` and `projects` are the state current at that moment. `workspaces` holds the old and
/// the new workspace name.
pub trait WorkspaceSummariser: Send + Sync {
    fn summarise(&self, index: &mut WorkspaceIndex, projects: &[Project], workspaces: &[String]);
}

/// Recomputes the member lists of the named workspaces from project records and leaves every
/// other workspace as stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildSummariser;

impl WorkspaceSummariser for RebuildSummariser {
    fn summarise(&self, index: &mut WorkspaceIndex, projects: &[Project], workspaces: &[String]) {
        for workspace in workspaces {
            let members = projects
                .iter()
                .filter(|project| project.workspace() == workspace)
                .cloned()
                .collect();
            index.set_members(workspace.clone(), members);
        }
    }
}

/// Leaves the stored index unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredIndexSummariser;

impl WorkspaceSummariser for StoredIndexSummariser {
    fn summarise(&self, _index: &mut WorkspaceIndex, _projects: &[Project], _workspaces: &[String]) {}
}

/// A workspace move waiting for the background writer.
struct IndexJob {
    summariser: Box<dyn WorkspaceSummariser>,
    workspaces: [String; 2],
}

/// Owner of every persisted record: projects, the workspace index and per-project models.
///
/// No transaction spans two logical entities. Project and model writes of one `create_project`
/// are separate units of work, and so are project deletes and the index update that follows.
/// Every index change is a read-modify-write inside one transaction, whether it runs on the
/// caller's thread or on the background writer.
#[derive(Debug)]
pub struct ProjectRepository<S: KeyStore = SqliteKeyStore> {
    store: Arc<S>,
    writeback: IndexWriteback<IndexJob>,
}

impl<S: KeyStore> ProjectRepository<S> {
    pub fn new(store: S) -> Result<Self, RepositoryError> {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Result<Self, RepositoryError> {
        let writeback = IndexWriteback::spawn({
            let store = store.clone();
            move |jobs: Vec<IndexJob>| apply_index_jobs(&*store, &jobs)
        })
        .map_err(RepositoryError::Worker)?;

        Ok(Self { store, writeback })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists a new project under a fresh id, then its empty model, then records its
    /// workspace membership.
    ///
    /// A failure after the project write leaves a project without a model; [`Self::ensure_model`]
    /// repairs that.
    pub fn create_project(&self, description: ProjectDescription) -> Result<Project, RepositoryError> {
        let project = Project::new(ProjectId::random(), description);

        self.put_record(Table::Project, &project.id, &project)?;
        self.put_record(Table::Model, &project.id, &ModelRecord::default())?;
        self.modify_index(|index| index.add_project(&project))?;

        info!(
            project_id = %project.id,
            workspace = %project.workspace(),
            "created project"
        );
        Ok(project)
    }

    /// Creates the empty model record for `id` if none exists. Returns whether one was created.
    pub fn ensure_model(&self, id: &ProjectId) -> Result<bool, RepositoryError> {
        let key = encode_key(Table::Model, id.as_str());
        let bytes = encode(Table::Model, &ModelRecord::default())?;

        let created = self.store.update(|txn| {
            if txn.get(&key)?.is_some() {
                return Ok(false);
            }
            txn.put(key.clone(), bytes)?;
            Ok(true)
        })?;

        if created {
            info!(project_id = %id, "initialised missing model record");
        }
        Ok(created)
    }

    pub fn get_project(&self, id: &ProjectId) -> Result<Project, RepositoryError> {
        self.get_record(Table::Project, id)?
            .ok_or_else(|| RepositoryError::not_found(Table::Project, id))
    }

    /// All projects sorted by name. Records that fail to decode are skipped.
    pub fn list_projects(&self) -> Result<Vec<Project>, RepositoryError> {
        let prefix = Table::Project.prefix();
        let entries = self.store.view(|txn| txn.scan_prefix(&prefix))?;

        let mut projects = decode_projects(entries);
        projects.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(projects)
    }

    /// Deletes the project record, then removes it from its workspace's member list.
    ///
    /// The model record is kept on purpose: it stays behind as history of the deleted project.
    pub fn delete_project(&self, id: &ProjectId) -> Result<Project, RepositoryError> {
        let project = self.get_project(id)?;

        let key = encode_key(Table::Project, id.as_str());
        self.store.update(|txn| txn.delete(&key))?;

        let removed = self.modify_index(|index| index.remove_project(&project))?;

        info!(
            project_id = %id,
            workspace = %project.workspace(),
            removed_from_index = removed,
            "deleted project"
        );
        Ok(project)
    }

    /// Update-or-create.
    ///
    /// An existing project gets `description` as its new mutable state. When its workspace
    /// changes, `summariser` updates the index over the old and new workspace names on the
    /// background writer. Otherwise the project's index entry is refreshed in place. An unknown
    /// (or malformed) id creates a new project with a fresh id instead.
    pub fn update_project(
        &self,
        id: &str,
        description: ProjectDescription,
        summariser: impl WorkspaceSummariser + 'static,
    ) -> Result<Project, RepositoryError> {
        let existing = match ProjectId::new(id) {
            Ok(id) => match self.get_project(&id) {
                Ok(project) => Some(project),
                Err(err) if err.is_not_found() => None,
                Err(err) => return Err(err),
            },
            Err(_) => None,
        };

        let Some(mut project) = existing else {
            info!(requested_id = id, "project to update not found, creating a new one");
            return self.create_project(description);
        };

        let old_workspace = project.workspace().to_owned();
        project.description = description;
        self.put_record(Table::Project, &project.id, &project)?;

        if old_workspace == project.workspace() {
            self.modify_index(|index| index.add_project(&project))?;
        } else {
            self.writeback.schedule(IndexJob {
                summariser: Box::new(summariser),
                workspaces: [old_workspace, project.workspace().to_owned()],
            });
        }

        debug!(project_id = %project.id, "updated project");
        Ok(project)
    }

    /// The workspace index. The first read on an empty store creates and persists an empty one.
    pub fn get_workspaces(&self) -> Result<WorkspaceIndex, RepositoryError> {
        let key = workspace_index_key();
        if let Some(bytes) = self.store.view(|txn| txn.get(&key))? {
            return decode(Table::WorkspaceIndex, "", &bytes);
        }
        self.modify_index(|index| index.clone())
    }

    pub fn save_workspaces(&self, index: &WorkspaceIndex) -> Result<(), RepositoryError> {
        let bytes = encode(Table::WorkspaceIndex, index)?;
        self.store
            .update(|txn| txn.put(workspace_index_key(), bytes))?;
        Ok(())
    }

    /// Recomputes the whole workspace index from project records and persists it.
    pub fn rebuild_workspaces(&self) -> Result<WorkspaceIndex, RepositoryError> {
        let (index, projects) = update_index(&*self.store, |index, txn| {
            let projects = decode_projects(txn.scan_prefix(&Table::Project.prefix())?);
            *index = WorkspaceIndex::from_projects(&projects);
            Ok((index.clone(), projects.len()))
        })?;
        info!(
            workspaces = index.details.len(),
            projects,
            "rebuilt workspace index"
        );
        Ok(index)
    }

    /// Waits for background index updates scheduled by [`Self::update_project`].
    pub fn flush_index_writes(&self) {
        self.writeback.flush();
    }

    /// Background index updates applied so far.
    pub fn index_writes_completed(&self) -> u64 {
        self.writeback.written()
    }

    pub fn get_model(&self, id: &ProjectId) -> Result<ModelRecord, RepositoryError> {
        self.get_record(Table::Model, id)?
            .ok_or_else(|| RepositoryError::not_found(Table::Model, id))
    }

    /// Overwrites the model of an existing project with the incoming envelope's texts.
    ///
    /// There is no merge: a blank half in `incoming` replaces whatever was stored. The returned
    /// envelope is `incoming` with its visual model stripped of the editor wrapper. An id with
    /// no project record is `NotFound` and writes nothing.
    pub fn update_model(&self, id: &ProjectId, incoming: &Message) -> Result<Message, RepositoryError> {
        self.get_project(id)?;

        let record = ModelRecord::from_incoming(&incoming.threat_model, &incoming.visual_model);
        self.put_record(Table::Model, id, &record)?;

        debug!(
            project_id = %id,
            threat_is_updated = record.threat_is_updated,
            visual_is_updated = record.visual_is_updated,
            "updated model"
        );

        let mut reply = incoming.clone();
        reply.visual_model = record.visual_model;
        Ok(reply)
    }

    fn put_record<T: Serialize>(
        &self,
        table: Table,
        id: &ProjectId,
        value: &T,
    ) -> Result<(), RepositoryError> {
        let key = encode_key(table, id.as_str());
        let bytes = encode(table, value)?;
        self.store.update(|txn| txn.put(key, bytes))?;
        Ok(())
    }

    fn get_record<T: DeserializeOwned>(
        &self,
        table: Table,
        id: &ProjectId,
    ) -> Result<Option<T>, RepositoryError> {
        let key = encode_key(table, id.as_str());
        match self.store.view(|txn| txn.get(&key))? {
            Some(bytes) => decode(table, id.as_str(), &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn modify_index<T>(
        &self,
        f: impl FnOnce(&mut WorkspaceIndex) -> T,
    ) -> Result<T, RepositoryError> {
        update_index(&*self.store, |index, _| Ok(f(index)))
    }
}

/// Applies a batch of workspace moves in one index transaction, against the project records
/// as they are when the batch runs.
fn apply_index_jobs<S: KeyStore>(store: &S, jobs: &[IndexJob]) -> Result<(), RepositoryError> {
    update_index(store, |index, txn| {
        let projects = decode_projects(txn.scan_prefix(&Table::Project.prefix())?);
        for job in jobs {
            job.summariser.summarise(index, &projects, &job.workspaces);
        }
        Ok(())
    })?;
    debug!(jobs = jobs.len(), "applied workspace index jobs");
    Ok(())
}

/// Read-modify-write of the index inside one write transaction. Nothing is written when `f`
/// fails.
fn update_index<S: KeyStore, T>(
    store: &S,
    f: impl FnOnce(&mut WorkspaceIndex, &dyn WriteTxn) -> Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    let key = workspace_index_key();
    store.update(|txn| {
        let staged = read_index(&*txn, &key).and_then(|mut index| {
            let out = f(&mut index, &*txn)?;
            Ok((encode(Table::WorkspaceIndex, &index)?, out))
        });
        match staged {
            Ok((bytes, out)) => {
                txn.put(key.clone(), bytes)?;
                Ok(Ok(out))
            }
            Err(err) => Ok(Err(err)),
        }
    })?
}

fn read_index(txn: &dyn WriteTxn, key: &[u8]) -> Result<WorkspaceIndex, RepositoryError> {
    match txn.get(key)? {
        Some(bytes) => decode(Table::WorkspaceIndex, "", &bytes),
        None => Ok(WorkspaceIndex::default()),
    }
}

fn decode_projects(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<Project> {
    let mut projects = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        match serde_json::from_slice::<Project>(&value) {
            Ok(project) => projects.push(project),
            Err(err) => {
                let id = decode_key(&key).map(|(_, id)| id).unwrap_or_default();
                warn!(project_id = %id, error = %err, "skipping undecodable project record");
            }
        }
    }
    projects
}

fn encode<T: Serialize>(table: Table, value: &T) -> Result<Vec<u8>, RepositoryError> {
    serde_json::to_vec(value).map_err(|source| RepositoryError::Encode {
        table: table.name(),
        source,
    })
}

fn decode<T: DeserializeOwned>(table: Table, id: &str, bytes: &[u8]) -> Result<T, RepositoryError> {
    serde_json::from_slice(bytes).map_err(|source| RepositoryError::Decode {
        table: table.name(),
        id: id.to_owned(),
        source,
    })
}
