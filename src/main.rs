// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Zonemap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Zonemap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Zonemap server entrypoint.
//!
//! Serves the JSON API under `/api/*` and the live channel at `/api/message`.

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use zonemap::config::{ServerConfig, DEFAULT_API_PORT, DATA_DIR_ENV, DEFAULT_DATA_DIR};
use zonemap::store::{ProjectRepository, WriteDurability};

const DEFAULT_LOG_FILTER: &str = "zonemap=info";

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--port <port>] [--bind-localhost] [--data-dir <dir>] [--durable-writes]\n\n--port selects the HTTP port (0 = ephemeral; default {DEFAULT_API_PORT}).\n--bind-localhost listens on 127.0.0.1 only instead of every interface.\n--data-dir defaults to ${DATA_DIR_ENV}, or ./{DEFAULT_DATA_DIR} when unset.\n\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported).\n\nLog verbosity follows RUST_LOG (default {DEFAULT_LOG_FILTER})."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    port: Option<u16>,
    bind_localhost: bool,
    data_dir: Option<String>,
    durable_writes: bool,
}

impl CliOptions {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::default();
        if let Some(port) = self.port {
            config.api_port = port;
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = PathBuf::from(dir);
        }
        config.bind_localhost = self.bind_localhost;
        if self.durable_writes {
            config.durability = WriteDurability::Durable;
        }
        config
    }
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--port" => {
                if options.port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.port = Some(port);
            }
            "--bind-localhost" => {
                if options.bind_localhost {
                    return Err(());
                }
                options.bind_localhost = true;
            }
            "--data-dir" => {
                if options.data_dir.is_some() {
                    return Err(());
                }
                let dir = args.next().ok_or(())?;
                options.data_dir = Some(dir);
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            _ => return Err(()),
        }
    }

    Ok(options)
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "zonemap".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        init_logging();
        let config = options.into_config();

        let store = config.open_store()?;
        let repository = Arc::new(ProjectRepository::new(store)?);
        let state = zonemap::api::AppState::new(repository, config.app_version.clone());
        let router = zonemap::api::router(state);

        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
            let addr = listener.local_addr()?;
            info!(
                app = %config.app_name,
                version = %config.app_version,
                addr = %addr,
                data_dir = ?config.data_dir,
                "listening"
            );

            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("zonemap: {err}");
        std::process::exit(1);
    }
}
