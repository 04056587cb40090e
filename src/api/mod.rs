// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! HTTP surface: JSON project/workspace routes plus the live channel upgrade.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::live::{MessageDispatcher, SessionRegistry};
use crate::model::{
    DecodeError, IdError, Message, MessageType, Project, ProjectDescription, ProjectId,
    WorkspaceIndex,
};
use crate::store::{KeyStore, ProjectRepository, RebuildSummariser, RepositoryError, SqliteKeyStore};

pub mod ws;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed request body: {0}")]
    Body(#[from] serde_json::Error),
    #[error(transparent)]
    Envelope(#[from] DecodeError),
    #[error("invalid project id: {0}")]
    InvalidId(#[from] IdError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("repository task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Body(_) | Self::Envelope(_) | Self::InvalidId(_) => StatusCode::BAD_REQUEST,
            Self::Repository(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Self::Repository(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Shared handler state. Cheap to clone.
pub struct AppState<S: KeyStore = SqliteKeyStore> {
    pub repository: Arc<ProjectRepository<S>>,
    pub dispatcher: MessageDispatcher<S>,
    pub app_version: Arc<str>,
}

impl<S: KeyStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            dispatcher: self.dispatcher.clone(),
            app_version: self.app_version.clone(),
        }
    }
}

impl<S: KeyStore> AppState<S> {
    pub fn new(repository: Arc<ProjectRepository<S>>, app_version: impl Into<Arc<str>>) -> Self {
        let dispatcher = MessageDispatcher::new(repository.clone(), Arc::new(SessionRegistry::new()));
        Self {
            repository,
            dispatcher,
            app_version: app_version.into(),
        }
    }
}

pub fn router<S: KeyStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/version", get(version::<S>))
        .route("/api/workspaces", get(workspaces::<S>))
        .route("/api/projects", get(projects::<S>))
        .route("/api/project/{id}", get(project::<S>))
        .route("/api/project/model/{id}", get(project_model::<S>))
        .route("/api/project/delete", post(delete_project::<S>))
        .route("/api/project/create", post(create_project::<S>))
        .route("/api/project/update", post(update_project::<S>))
        .route("/api/project/updatemodel", post(update_model::<S>))
        .route("/api/message", get(ws::message_socket::<S>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(rename = "ProjectID")]
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(rename = "projectID", default)]
    pub project_id: String,
    #[serde(default)]
    pub description: ProjectDescription,
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(body)?)
}

/// Runs `f` against the repository on the blocking pool.
async fn with_repository<S, T, F>(state: &AppState<S>, f: F) -> Result<T, ApiError>
where
    S: KeyStore,
    T: Send + 'static,
    F: FnOnce(&ProjectRepository<S>) -> Result<T, RepositoryError> + Send + 'static,
{
    let repository = state.repository.clone();
    Ok(tokio::task::spawn_blocking(move || f(&*repository)).await??)
}

pub async fn version<S: KeyStore>(State(state): State<AppState<S>>) -> Json<String> {
    Json(state.app_version.to_string())
}

pub async fn workspaces<S: KeyStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<WorkspaceIndex>, ApiError> {
    Ok(Json(with_repository(&state, |repo| repo.get_workspaces()).await?))
}

pub async fn projects<S: KeyStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(with_repository(&state, |repo| repo.list_projects()).await?))
}

pub async fn project<S: KeyStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let id = ProjectId::new(id)?;
    Ok(Json(with_repository(&state, move |repo| repo.get_project(&id)).await?))
}

pub async fn project_model<S: KeyStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let id = ProjectId::new(id)?;
    let record = with_repository(&state, {
        let id = id.clone();
        move |repo| repo.get_model(&id)
    })
    .await?;
    Ok(Json(Message::from_model(MessageType::UpdateUi, &id, record)))
}

pub async fn delete_project<S: KeyStore>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<String>, ApiError> {
    let request: DeleteRequest = decode_body(&body)?;
    let id = ProjectId::new(request.project_id)?;
    let deleted = with_repository(&state, move |repo| repo.delete_project(&id)).await?;
    Ok(Json(deleted.id.into_string()))
}

pub async fn create_project<S: KeyStore>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<Project>, ApiError> {
    let description: ProjectDescription = decode_body(&body)?;
    Ok(Json(with_repository(&state, move |repo| repo.create_project(description)).await?))
}

pub async fn update_project<S: KeyStore>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<Project>, ApiError> {
    let request: UpdateRequest = decode_body(&body)?;
    let project = with_repository(&state, move |repo| {
        repo.update_project(&request.project_id, request.description, RebuildSummariser)
    })
    .await?;
    Ok(Json(project))
}

pub async fn update_model<S: KeyStore>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<Message>, ApiError> {
    let message = Message::decode(&body)?;
    let id = message.project_id()?;
    Ok(Json(with_repository(&state, move |repo| repo.update_model(&id, &message)).await?))
}
