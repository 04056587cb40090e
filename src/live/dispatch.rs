// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::model::{DecodeError, Message, MessageType};
use crate::otm::{OtmYamlParser, ParseError, ThreatModelParser};
use crate::render::{render_graphviz, RenderError};
use crate::store::{KeyStore, ProjectRepository, RepositoryError, SqliteKeyStore};

use super::registry::{ConnectionHandle, SessionRegistry};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Routes envelopes of live connections to the repository and the renderer.
///
/// Replies go to the originating connection only. Other viewers of the same project are not
/// notified; [`SessionRegistry::connections_for`] is there for callers that want to fan out.
pub struct MessageDispatcher<S: KeyStore = SqliteKeyStore> {
    repository: Arc<ProjectRepository<S>>,
    registry: Arc<SessionRegistry>,
    parser: Arc<dyn ThreatModelParser>,
}

impl<S: KeyStore> Clone for MessageDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            registry: self.registry.clone(),
            parser: self.parser.clone(),
        }
    }
}

impl<S: KeyStore> MessageDispatcher<S> {
    pub fn new(repository: Arc<ProjectRepository<S>>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            repository,
            registry,
            parser: Arc::new(OtmYamlParser),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ThreatModelParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn repository(&self) -> &Arc<ProjectRepository<S>> {
        &self.repository
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Handles one envelope. Returns the reply, or `None` for message types without one.
    pub fn dispatch(&self, message: &Message) -> Option<Message> {
        match &message.kind {
            MessageType::UpdateModel => Some(
                self.update_model(message)
                    .unwrap_or_else(|err| message.clone().with_error(err)),
            ),
            MessageType::ProcessModel => Some(
                self.process_model(message)
                    .unwrap_or_else(|err| Message::error_reply(MessageType::Graphviz, message, err)),
            ),
            MessageType::GetModel => Some(
                self.get_model(message)
                    .unwrap_or_else(|err| Message::error_reply(MessageType::UpdateUi, message, err)),
            ),
            other => {
                warn!(
                    message_type = %other,
                    project_id = %message.project_id,
                    "unhandled message type"
                );
                None
            }
        }
    }

    fn update_model(&self, message: &Message) -> Result<Message, DispatchError> {
        let project_id = message.project_id()?;
        Ok(self.repository.update_model(&project_id, message)?)
    }

    fn process_model(&self, message: &Message) -> Result<Message, DispatchError> {
        let model = self.parser.parse(&message.threat_model)?;
        let dot = render_graphviz(&model)?;
        Ok(Message {
            kind: MessageType::Graphviz,
            project_id: message.project_id.clone(),
            workspace: message.workspace.clone(),
            visual_model: dot,
            ..Message::default()
        })
    }

    fn get_model(&self, message: &Message) -> Result<Message, DispatchError> {
        let project_id = message.project_id()?;
        let record = self.repository.get_model(&project_id)?;
        let mut reply = Message::from_model(MessageType::UpdateUi, &project_id, record);
        reply.workspace = message.workspace.clone();
        Ok(reply)
    }

    /// Serves one live connection until its inbound stream ends or yields a decode error.
    ///
    /// The connection is registered under the project of `first`, `first` is processed, then
    /// every further envelope in arrival order. A `first` without a valid project id is
    /// rejected without registering. The connection is deregistered before returning.
    pub async fn run_connection<I>(
        &self,
        remote: SocketAddr,
        first: Message,
        mut inbound: I,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> Result<(), DecodeError>
    where
        I: Stream<Item = Result<Message, DecodeError>> + Unpin,
    {
        let project_id = match first.project_id() {
            Ok(project_id) => project_id,
            Err(err) => {
                warn!(remote = %remote, error = %err, "rejecting live connection");
                return Err(err);
            }
        };

        let handle = ConnectionHandle::new(remote, outbound);
        self.registry.register(project_id.clone(), handle.clone());
        info!(remote = %remote, project_id = %project_id, "live connection opened");

        self.process(&handle, first).await;
        let outcome = loop {
            match inbound.next().await {
                Some(Ok(message)) => self.process(&handle, message).await,
                Some(Err(err)) => {
                    warn!(remote = %remote, error = %err, "closing live connection on bad envelope");
                    break Err(err);
                }
                None => break Ok(()),
            }
        };

        self.registry.deregister(remote);
        info!(remote = %remote, project_id = %project_id, "live connection closed");
        outcome
    }

    /// Dispatches on the blocking pool, then queues the reply. Envelopes of one connection
    /// are processed one at a time.
    async fn process(&self, handle: &ConnectionHandle, message: Message) {
        debug!(
            remote = %handle.remote,
            message_type = %message.kind,
            project_id = %message.project_id,
            "received message"
        );
        let dispatcher = self.clone();
        let reply = match tokio::task::spawn_blocking(move || dispatcher.dispatch(&message)).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(remote = %handle.remote, error = %err, "message handler failed");
                return;
            }
        };
        if let Some(reply) = reply {
            if !handle.send(reply) {
                debug!(remote = %handle.remote, "connection gone before reply was queued");
            }
        }
    }
}
