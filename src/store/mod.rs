// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for projects, the workspace index and per-project models.
//!
//! `kv` is the transactional key/value layer, `keys` its table layout, and `repository` the
//! entity operations on top.

pub mod keys;
pub mod kv;
pub mod repository;
mod writeback;

pub use keys::Table;
pub use kv::{KeyStore, ReadTxn, SqliteKeyStore, StoreError, WriteDurability, WriteTxn};
pub use repository::{
    ProjectRepository, RebuildSummariser, RepositoryError, StoredIndexSummariser,
    WorkspaceSummariser,
};
