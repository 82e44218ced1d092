// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for actionhost.
//!
//! Per-request failures never surface as [`Error`]: the invoker converts them
//! into an [`InvocationResult`](crate::response::InvocationResult). This type
//! covers start-up and embedding failures, which are fatal.

use thiserror::Error;

/// Actionhost errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The action manifest could not be loaded.
    #[error("Manifest error: {0}")]
    Manifest(#[from] crate::manifest::ManifestError),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type using actionhost Error.
pub type Result<T> = std::result::Result<T, Error>;
