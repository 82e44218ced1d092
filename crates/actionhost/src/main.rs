// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Actionhost - Local Web-Action Host
//!
//! An HTTP server responsible for:
//! - Resolving `/api/v1/web/{package}/{item}` to manifest actions and sequences
//! - Building the platform parameter envelope
//! - Running locally built actions with per-activation identity
//! - Translating action results into HTTP responses

use tracing::{info, warn};

use actionhost::config::Config;
use actionhost::runtime::{DevServerRuntime, DevServerRuntimeBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "actionhost=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        manifest = %config.manifest_path.display(),
        dist_dir = %config.dist_dir.display(),
        namespace = %config.namespace,
        "Starting actionhost"
    );

    // Manifest errors are fatal
    let runtime: DevServerRuntime = DevServerRuntimeBuilder::from_config(&config)?
        .build()?
        .start()
        .await?;

    info!(addr = %runtime.local_addr(), "Action host ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Graceful shutdown
    runtime.shutdown().await?;

    info!("actionhost shut down");

    Ok(())
}
