// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Actionhost - Local Web-Action Host
//!
//! This crate runs serverless actions locally with the request and response
//! semantics of the hosted platform. It maps HTTP requests to actions or
//! sequences declared in a manifest, invokes the locally built code with the
//! platform's parameter envelope, and turns the return value into an HTTP
//! response.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 HTTP clients (browser, curl, SPA dev server)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │ /api/v1/web/{package}/{item}/...
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        actionhost (This Crate)                           │
//! │                             Port 9080                                    │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐     │
//! │  │ Dispatcher  │─▶│  Resolver   │  │  Envelope   │  │  Auth Gate  │     │
//! │  │             │  │             │  │  Builder    │  │             │     │
//! │  └──────┬──────┘  └─────────────┘  └─────────────┘  └─────────────┘     │
//! │         │                                                               │
//! │         ├──────────────▶ Sequence Invoker ─┐                             │
//! │         ▼                                  ▼                             │
//! │  ┌──────────────────────────────────────────────┐                       │
//! │  │ Action Invoker: auth → load → execute → normalize                    │
//! │  └──────────────────────────────────────────────┘                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │ spawn, envelope on stdin
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 dist/{package}/{action}-temp/main                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # HTTP Routes
//!
//! | Route | Description |
//! |-------|-------------|
//! | `ANY /api/v1/web/{package}/{item}/{rest...}` | Web action or sequence |
//! | `ANY /api/v1/{package}/{item}/{rest...}` | Same dispatch; warns for non-web actions |
//!
//! # Status Codes
//!
//! | Status | When |
//! |--------|------|
//! | 200 | Action returned without an explicit status |
//! | 204 | Action returned nothing |
//! | 400 | Load or execution failure, unknown sequence step |
//! | 401 | Auth-gated action without the required headers |
//! | 404 | Unknown package or item |
//!
//! Any other status an action returns is passed through.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `ACTIONHOST_HOST` | No | `127.0.0.1` | Listen host |
//! | `ACTIONHOST_PORT` | No | `9080` | Listen port |
//! | `ACTIONHOST_MANIFEST` | No | `manifest.yml` | Action manifest |
//! | `ACTIONHOST_PROJECT_DIR` | No | manifest directory | Root for `function` paths |
//! | `ACTIONHOST_DIST_DIR` | No | `dist` | Build output root |
//! | `ACTIONHOST_NAMESPACE` | No | `local` | Namespace reported to actions |
//! | `ACTIONHOST_STRICT_AUTH` | No | `false` | Also require `x-gw-ims-org-id` |
//!
//! # Modules
//!
//! - [`config`]: Server configuration from environment variables
//! - [`manifest`]: Action, sequence and package definitions
//! - [`interpolate`]: Environment variable substitution in static inputs
//! - [`params`]: Invocation envelope construction
//! - [`resolver`]: Path to action/sequence resolution
//! - [`auth`]: Header-based authorization gate
//! - [`loader`]: Action implementation backends
//! - [`invoker`]: Single action invocation
//! - [`sequence`]: Sequence invocation
//! - [`response`]: Return value normalization
//! - [`dispatcher`]: Request entry point
//! - [`server`]: axum adapter

#![deny(missing_docs)]

/// Header-based authorization gate.
pub mod auth;

/// Server configuration loaded from environment variables.
pub mod config;

/// Request entry point.
pub mod dispatcher;

/// Error types for start-up and embedding.
pub mod error;

/// Environment variable substitution.
pub mod interpolate;

/// Single action invocation.
pub mod invoker;

/// Action implementation backends (process, in-process registry).
pub mod loader;

/// Manifest model and YAML loading.
pub mod manifest;

/// Invocation envelope construction.
pub mod params;

/// Path to action/sequence resolution.
pub mod resolver;

/// Action return value normalization.
pub mod response;

/// Embeddable runtime.
pub mod runtime;

/// Sequence invocation.
pub mod sequence;

/// HTTP adapter.
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
