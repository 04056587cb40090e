// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Live sessions: which connections watch which project, and what each envelope does.

pub mod dispatch;
pub mod registry;

pub use dispatch::{DispatchError, MessageDispatcher};
pub use registry::{ConnectionHandle, SessionRegistry};
