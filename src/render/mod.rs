// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagram rendering for threat models.
//!
//! `containment` resolves zones and components into a nested forest; `graphviz` turns that
//! forest plus the data flows into DOT text.

pub mod containment;
pub mod graphviz;

pub use containment::{
    resolve_containment, resolve_model_containment, ContainerKind, ContainmentError,
    ContainmentInput, ContainmentNode, ParentLink,
};
pub use graphviz::{render_graphviz, sanitise_id, RenderError};
