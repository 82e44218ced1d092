// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for actionhost.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Path to the action manifest (YAML)
    pub manifest_path: PathBuf,
    /// Root that relative `function` paths in the manifest are resolved against
    pub project_dir: PathBuf,
    /// Build output root (`<dist>/<package>/<action>-temp/main`)
    pub dist_dir: PathBuf,
    /// Namespace reported to actions through `__OW_NAMESPACE` / `__OW_ACTION_NAME`
    pub namespace: String,
    /// Require `x-gw-ims-org-id` in addition to `authorization` for auth-gated actions
    pub strict_auth: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `ACTIONHOST_HOST`: listen host (default: 127.0.0.1)
    /// - `ACTIONHOST_PORT`: listen port (default: 9080)
    /// - `ACTIONHOST_MANIFEST`: manifest path (default: manifest.yml)
    /// - `ACTIONHOST_PROJECT_DIR`: project root (default: the manifest's directory)
    /// - `ACTIONHOST_DIST_DIR`: build output root (default: dist)
    /// - `ACTIONHOST_NAMESPACE`: namespace (default: local)
    /// - `ACTIONHOST_STRICT_AUTH`: `true`/`1` to also require the org header
    pub fn from_env() -> Result<Self, ConfigError> {
        let host: IpAddr = std::env::var("ACTIONHOST_HOST")
            .unwrap_or_else(|_| "127.0.0.1".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("ACTIONHOST_HOST", "must be an IP address"))?;

        let port: u16 = std::env::var("ACTIONHOST_PORT")
            .unwrap_or_else(|_| "9080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("ACTIONHOST_PORT", "must be a valid port number"))?;

        let manifest_path = PathBuf::from(
            std::env::var("ACTIONHOST_MANIFEST").unwrap_or_else(|_| "manifest.yml".to_string()),
        );

        // Function paths in the manifest are written relative to the manifest itself
        let project_dir = match std::env::var("ACTIONHOST_PROJECT_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => manifest_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        let dist_dir = PathBuf::from(
            std::env::var("ACTIONHOST_DIST_DIR").unwrap_or_else(|_| "dist".to_string()),
        );

        let namespace =
            std::env::var("ACTIONHOST_NAMESPACE").unwrap_or_else(|_| "local".to_string());
        if namespace.is_empty() || namespace.contains('/') {
            return Err(ConfigError::Invalid(
                "ACTIONHOST_NAMESPACE",
                "must be a non-empty name without '/'",
            ));
        }

        let strict_auth = std::env::var("ACTIONHOST_STRICT_AUTH")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            http_addr: SocketAddr::new(host, port),
            manifest_path,
            project_dir,
            dist_dir,
            namespace,
            strict_auth,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
