// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Zonemap: threat-model projects grouped into workspaces, served over HTTP and a live
//! WebSocket channel, with Graphviz rendering of trust zones and data flows.

pub mod api;
pub mod config;
pub mod live;
pub mod model;
pub mod otm;
pub mod render;
pub mod store;
