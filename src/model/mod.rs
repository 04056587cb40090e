// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core records and the wire envelope.
//!
//! Projects own one model record each; workspaces are a derived grouping of projects.

pub mod ids;
pub mod message;
pub mod model_record;
pub mod project;
pub mod workspace;

pub use ids::{IdError, ProjectId, MAX_PROJECT_ID_LEN};
pub use message::{DecodeError, Message, MessageType};
pub use model_record::{strip_visual_wrapper, ModelRecord};
pub use project::{Project, ProjectDescription};
pub use workspace::{WorkspaceDetail, WorkspaceIndex};
