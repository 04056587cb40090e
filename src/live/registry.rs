// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::model::{Message, ProjectId};

/// Write side of one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub remote: SocketAddr,
    pub outbound: mpsc::UnboundedSender<Message>,
}

impl ConnectionHandle {
    pub fn new(remote: SocketAddr, outbound: mpsc::UnboundedSender<Message>) -> Self {
        Self { remote, outbound }
    }

    /// Queues `message` for the connection. Returns `false` if the connection is gone.
    pub fn send(&self, message: Message) -> bool {
        self.outbound.send(message).is_ok()
    }
}

type Sessions = BTreeMap<ProjectId, BTreeMap<SocketAddr, ConnectionHandle>>;

/// Live connections per project, keyed by remote address.
///
/// One mutex guards every project.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `handle` to the set of `project_id`. A handle with the same address replaces the
    /// previous one.
    pub fn register(&self, project_id: ProjectId, handle: ConnectionHandle) {
        let remote = handle.remote;
        let mut sessions = self.lock();
        let replaced = sessions
            .entry(project_id.clone())
            .or_default()
            .insert(remote, handle)
            .is_some();
        debug!(project_id = %project_id, remote = %remote, replaced, "registered live connection");
    }

    /// Removes `remote` from every project it appears under and drops projects left empty.
    ///
    /// Returns the number of registrations removed.
    pub fn deregister(&self, remote: SocketAddr) -> usize {
        let mut sessions = self.lock();
        let mut removed = 0;
        sessions.retain(|_, connections| {
            if connections.remove(&remote).is_some() {
                removed += 1;
            }
            !connections.is_empty()
        });
        debug!(remote = %remote, removed, "deregistered live connection");
        removed
    }

    /// Live connections of `project_id`, ordered by address.
    pub fn connections_for(&self, project_id: &ProjectId) -> Vec<ConnectionHandle> {
        self.lock()
            .get(project_id)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn project_count(&self) -> usize {
        self.lock().len()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().values().map(BTreeMap::len).sum()
    }
}
