// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{IdError, ProjectId};
use super::model_record::ModelRecord;

/// Discriminator of a [`Message`].
///
/// Unknown discriminators decode into [`MessageType::Other`] so a client sending a newer type
/// does not break the envelope decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    UpdateModel,
    ProcessModel,
    GetModel,
    UpdateUi,
    Graphviz,
    #[default]
    Empty,
    Other(String),
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::UpdateModel => "update_model",
            Self::ProcessModel => "process_model",
            Self::GetModel => "get_model",
            Self::UpdateUi => "update_ui",
            Self::Graphviz => "graphviz",
            Self::Empty => "",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for MessageType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "update_model" => Self::UpdateModel,
            "process_model" => Self::ProcessModel,
            "get_model" => Self::GetModel,
            "update_ui" => Self::UpdateUi,
            "graphviz" => Self::Graphviz,
            "" => Self::Empty,
            _ => Self::Other(raw),
        }
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Other(raw) => raw,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The envelope exchanged on the live channel and on the non-live model update path.
///
/// Requests and responses share this shape; an error response carries `has_error = true` and a
/// message in `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    #[serde(rename = "projectID", default)]
    pub project_id: String,
    #[serde(default)]
    pub workspace: String,
    #[serde(rename = "threatModel", default)]
    pub threat_model: String,
    #[serde(rename = "visualModel", default)]
    pub visual_model: String,
    #[serde(rename = "hasError", default)]
    pub has_error: bool,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid project id {value:?}: {source}")]
    ProjectId {
        value: String,
        #[source]
        source: IdError,
    },
}

impl Message {
    pub fn new(kind: MessageType, project_id: impl Into<String>) -> Self {
        Self {
            kind,
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn project_id(&self) -> Result<ProjectId, DecodeError> {
        ProjectId::new(self.project_id.clone()).map_err(|source| DecodeError::ProjectId {
            value: self.project_id.clone(),
            source,
        })
    }

    /// Builds a model-carrying envelope for `project_id` from a stored record.
    pub fn from_model(kind: MessageType, project_id: &ProjectId, record: ModelRecord) -> Self {
        Self {
            kind,
            project_id: project_id.as_str().to_owned(),
            threat_model: record.threat_model,
            visual_model: record.visual_model,
            ..Self::default()
        }
    }

    /// An error reply of type `kind` addressed to the same project/workspace as `request`.
    pub fn error_reply(kind: MessageType, request: &Message, error: impl fmt::Display) -> Self {
        Self {
            kind,
            project_id: request.project_id.clone(),
            workspace: request.workspace.clone(),
            has_error: true,
            error: error.to_string(),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.has_error = true;
        self.error = error.to_string();
        self
    }
}
