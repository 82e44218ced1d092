// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Loader module - action implementation backends.

pub mod process;
pub mod registry;
mod traits;

pub use process::ProcessLoader;
pub use registry::FunctionRegistry;
pub use traits::*;
