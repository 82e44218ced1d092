// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for actionhost.
//!
//! This module provides [`DevServerRuntime`] which allows embedding the action
//! host into an existing tokio application instead of running it as a
//! standalone server.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use actionhost::loader::ProcessLoader;
//! use actionhost::manifest::ActionConfig;
//! use actionhost::runtime::DevServerRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ActionConfig::load("manifest.yml")?;
//!
//!     let runtime = DevServerRuntime::builder()
//!         .config(config)
//!         .loader(Arc::new(ProcessLoader::new("dist")))
//!         .bind_addr("127.0.0.1:9080".parse()?)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     // ... run your application ...
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::auth::AuthGate;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::invoker::ActionInvoker;
use crate::loader::{ActionLoader, ProcessLoader};
use crate::manifest::ActionConfig;
use crate::server::router;

/// Builder for creating a [`DevServerRuntime`].
pub struct DevServerRuntimeBuilder {
    config: Option<ActionConfig>,
    loader: Option<Arc<dyn ActionLoader>>,
    bind_addr: SocketAddr,
    namespace: String,
    project_dir: PathBuf,
    auth: AuthGate,
}

impl Default for DevServerRuntimeBuilder {
    fn default() -> Self {
        Self {
            config: None,
            loader: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 9080)),
            namespace: "local".to_string(),
            project_dir: PathBuf::from("."),
            auth: AuthGate::new(),
        }
    }
}

impl DevServerRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded from [`Config`]: reads the manifest and uses a
    /// [`ProcessLoader`] over the configured dist directory.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let manifest = ActionConfig::load(&config.manifest_path)?;
        let auth = if config.strict_auth {
            AuthGate::strict()
        } else {
            AuthGate::new()
        };
        Ok(Self::new()
            .config(manifest)
            .loader(Arc::new(ProcessLoader::new(std::path::absolute(
                &config.dist_dir,
            )?)))
            .bind_addr(config.http_addr)
            .namespace(&config.namespace)
            .project_dir(std::path::absolute(&config.project_dir)?)
            .auth_gate(auth))
    }

    /// Set the action manifest (required).
    pub fn config(mut self, config: ActionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the action loader (required).
    pub fn loader(mut self, loader: Arc<dyn ActionLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the bind address for the HTTP server. Port 0 picks a free port.
    ///
    /// Default: `127.0.0.1:9080`
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the namespace reported to actions.
    ///
    /// Default: `local`
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the root that `function` paths are resolved against.
    ///
    /// Default: `.`
    pub fn project_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_dir = path.into();
        self
    }

    /// Set the auth gate.
    pub fn auth_gate(mut self, auth: AuthGate) -> Self {
        self.auth = auth;
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<DevServerRuntimeConfig> {
        let config = self
            .config
            .ok_or_else(|| anyhow::anyhow!("config is required"))?;
        let loader = self
            .loader
            .ok_or_else(|| anyhow::anyhow!("loader is required"))?;

        let invoker = ActionInvoker::new(loader)
            .with_auth_gate(self.auth)
            .with_namespace(self.namespace)
            .with_project_dir(self.project_dir);

        Ok(DevServerRuntimeConfig {
            dispatcher: Arc::new(Dispatcher::new(Arc::new(config), invoker)),
            bind_addr: self.bind_addr,
        })
    }
}

/// Configuration for a [`DevServerRuntime`].
pub struct DevServerRuntimeConfig {
    dispatcher: Arc<Dispatcher>,
    bind_addr: SocketAddr,
}

impl DevServerRuntimeConfig {
    /// The dispatcher the server will use.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Bind the listener and spawn the HTTP server task.
    pub async fn start(self) -> Result<DevServerRuntime> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let config = self.dispatcher.config();
        info!(
            bind_addr = %local_addr,
            packages = config.packages.len(),
            actions = config.action_count(),
            sequences = config.sequence_count(),
            loader = self.dispatcher.invoker().loader().loader_type(),
            "DevServerRuntime started"
        );

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let app = router(self.dispatcher.clone());
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .map_err(anyhow::Error::from)
        });

        Ok(DevServerRuntime {
            server_handle,
            shutdown_tx,
            dispatcher: self.dispatcher,
            local_addr,
        })
    }
}

/// A running action host that can be embedded in an application.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct DevServerRuntime {
    server_handle: JoinHandle<Result<()>>,
    shutdown_tx: watch::Sender<bool>,
    dispatcher: Arc<Dispatcher>,
    local_addr: SocketAddr,
}

impl DevServerRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> DevServerRuntimeBuilder {
        DevServerRuntimeBuilder::new()
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The dispatcher behind the server.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Check if the server task is still running.
    pub fn is_running(&self) -> bool {
        !self.server_handle.is_finished()
    }

    /// Gracefully shut down the server, letting in-flight requests finish.
    pub async fn shutdown(self) -> Result<()> {
        info!("DevServerRuntime shutting down...");

        let _ = self.shutdown_tx.send(true);

        match self.server_handle.await {
            Ok(Ok(())) => {
                info!("DevServerRuntime shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("DevServerRuntime server error during shutdown: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("DevServerRuntime server task panicked: {}", e);
                Err(anyhow::anyhow!("server task panicked: {}", e))
            }
        }
    }
}
