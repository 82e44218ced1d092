// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process loader.
//!
//! Loads actions from the build output directory and runs them as child
//! processes. A built action lives at:
//! - Module: {DIST_DIR}/{package}/{action}-temp/
//! - Entry point: {DIST_DIR}/{package}/{action}-temp/main (executable)
//!
//! The entry point reads the envelope as JSON from stdin and writes its
//! return value as JSON to stdout. Empty stdout means "no response".
//! Anything written to stderr is logged as action output.
//!
//! Every `load` inspects the module again and replaces the cached entry, so
//! a rebuild between two requests is picked up by the second one. A failed
//! load evicts the entry.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::traits::*;
use crate::manifest::ActionDefinition;
use crate::params::Params;

/// Suffix of a built module directory.
pub const MODULE_SUFFIX: &str = "-temp";
/// Executable every module must provide.
pub const ENTRY_POINT: &str = "main";

/// A module as it was found at load time.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// Module directory.
    pub path: PathBuf,
    /// Executable entry point inside the module.
    pub entry_point: PathBuf,
    /// Entry point modification time, if the platform reports one.
    pub modified: Option<SystemTime>,
    /// Entry point size in bytes.
    pub size: u64,
    /// How many times this path has been loaded, starting at 1.
    pub generation: u64,
    /// When the module was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModule {
    fn differs_from(&self, other: &LoadedModule) -> bool {
        self.modified != other.modified || self.size != other.size
    }
}

/// Loader for built executables under a dist directory.
pub struct ProcessLoader {
    dist_dir: PathBuf,
    modules: DashMap<PathBuf, LoadedModule>,
}

impl ProcessLoader {
    /// Create a loader rooted at `dist_dir`.
    pub fn new(dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            dist_dir: dist_dir.into(),
            modules: DashMap::new(),
        }
    }

    /// Build output root.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Module directory for an action.
    pub fn module_path(&self, package: &str, action: &str) -> PathBuf {
        self.dist_dir
            .join(package)
            .join(format!("{}{}", action, MODULE_SUFFIX))
    }

    /// The currently cached module for a path.
    pub fn cached(&self, module_path: &Path) -> Option<LoadedModule> {
        self.modules.get(module_path).map(|m| m.clone())
    }

    /// Evict a path from the cache, returning what was cached.
    pub fn invalidate_path(&self, module_path: &Path) -> Option<LoadedModule> {
        self.modules.remove(module_path).map(|(_, m)| m)
    }

    /// Number of cached modules.
    pub fn cached_count(&self) -> usize {
        self.modules.len()
    }

    async fn inspect(&self, module_path: &Path) -> Result<(PathBuf, std::fs::Metadata), LoadError> {
        let dir = match tokio::fs::metadata(module_path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(module_path.to_path_buf()));
            }
            Err(e) => return Err(LoadError::Io(e)),
        };
        if !dir.is_dir() {
            return Err(LoadError::NotFound(module_path.to_path_buf()));
        }

        let entry_point = module_path.join(ENTRY_POINT);
        let meta = match tokio::fs::metadata(&entry_point).await {
            Ok(meta) if meta.is_file() && is_executable(&meta) => meta,
            Ok(_) => return Err(LoadError::NoMain(module_path.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NoMain(module_path.to_path_buf()));
            }
            Err(e) => return Err(LoadError::Io(e)),
        };
        Ok((entry_point, meta))
    }
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}

#[async_trait]
impl ActionLoader for ProcessLoader {
    fn loader_type(&self) -> &'static str {
        "process"
    }

    async fn load(&self, action: &ActionDefinition) -> Result<Arc<dyn ActionFunction>, LoadError> {
        let module_path = self.module_path(&action.package, &action.name);

        let (entry_point, meta) = match self.inspect(&module_path).await {
            Ok(found) => found,
            Err(e) => {
                self.invalidate_path(&module_path);
                return Err(e);
            }
        };

        let mut module = LoadedModule {
            path: module_path.clone(),
            entry_point,
            modified: meta.modified().ok(),
            size: meta.len(),
            generation: 1,
            loaded_at: Utc::now(),
        };

        // Generation is read and bumped under the shard lock
        let previous = match self.modules.entry(module_path.clone()) {
            Entry::Occupied(mut slot) => {
                module.generation = slot.get().generation + 1;
                Some(slot.insert(module.clone()))
            }
            Entry::Vacant(slot) => {
                slot.insert(module.clone());
                None
            }
        };

        match &previous {
            Some(prev) if module.differs_from(prev) => info!(
                action = %action.qualified_name(),
                generation = module.generation,
                "Reloaded rebuilt action"
            ),
            Some(_) => {}
            None => debug!(
                action = %action.qualified_name(),
                path = %module_path.display(),
                "Loaded action"
            ),
        }

        Ok(Arc::new(ProcessFunction { module }))
    }

    fn invalidate(&self, action: &ActionDefinition) {
        self.invalidate_path(&self.module_path(&action.package, &action.name));
    }
}

/// A loaded module, invoked by spawning its entry point.
pub struct ProcessFunction {
    module: LoadedModule,
}

impl ProcessFunction {
    /// The module this function runs.
    pub fn module(&self) -> &LoadedModule {
        &self.module
    }
}

#[async_trait]
impl ActionFunction for ProcessFunction {
    async fn call(
        &self,
        params: Params,
        context: &ActivationContext,
    ) -> Result<Option<Value>, ExecutionError> {
        // Fall back to the module directory when the source tree is absent
        let working_dir = if context.working_dir.is_dir() {
            context.working_dir.as_path()
        } else {
            self.module.path.as_path()
        };

        let mut cmd = Command::new(&self.module.entry_point);
        cmd.current_dir(working_dir)
            .envs(context.env_vars())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        // stdin is written while stdout and stderr are drained
        let payload = serde_json::to_vec(&Value::Object(params))?;
        let stdin = child.stdin.take();
        let writer = tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(&payload).await
                    && e.kind() != std::io::ErrorKind::BrokenPipe
                {
                    return Err(e);
                }
            }
            Ok(())
        });

        let output = child.wait_with_output().await?;
        if let Ok(Err(e)) = writer.await {
            warn!(activation_id = %context.activation_id, error = %e, "Failed to write action input");
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            info!(activation_id = %context.activation_id, "{}", line);
        }

        if !output.status.success() {
            return Err(ExecutionError::ExitCode {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(stdout)
            .map(Some)
            .map_err(|e| ExecutionError::InvalidOutput(e.to_string()))
    }
}
