// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Server configuration assembled from CLI options and the environment.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::store::{SqliteKeyStore, StoreError, WriteDurability};

pub const DEFAULT_API_PORT: u16 = 18273;
pub const DATA_DIR_ENV: &str = "ZONEMAP_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "zonemap-data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub app_name: String,
    pub app_version: String,
    pub data_dir: PathBuf,
    pub api_port: u16,
    /// Listen on the loopback interface only.
    pub bind_localhost: bool,
    pub durability: WriteDurability,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_owned(),
            app_version: env!("CARGO_PKG_VERSION").to_owned(),
            data_dir: data_dir_from(env::var(DATA_DIR_ENV).ok()),
            api_port: DEFAULT_API_PORT,
            bind_localhost: false,
            durability: WriteDurability::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        let ip = if self.bind_localhost {
            Ipv4Addr::LOCALHOST
        } else {
            Ipv4Addr::UNSPECIFIED
        };
        SocketAddr::new(IpAddr::V4(ip), self.api_port)
    }

    /// Opens the key store inside `data_dir` with the configured durability.
    pub fn open_store(&self) -> Result<SqliteKeyStore, StoreError> {
        SqliteKeyStore::open(&self.data_dir)?.with_durability(self.durability)
    }
}

/// Resolves the data directory from an optional environment value; blank values fall back to
/// [`DEFAULT_DATA_DIR`].
pub fn data_dir_from(value: Option<String>) -> PathBuf {
    match value {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_DATA_DIR),
    }
}
