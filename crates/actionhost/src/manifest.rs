// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Action manifest.
//!
//! The manifest declares packages, their actions and sequences. It is parsed
//! once at start-up into an [`ActionConfig`] and never changes afterwards;
//! only the action implementations are reloaded per request.
//!
//! ```yaml
//! packages:
//!   my-app:
//!     inputs:
//!       LOG_LEVEL: debug
//!     actions:
//!       generic:
//!         function: actions/generic/index.js
//!         runtime: nodejs:18
//!         web: 'yes'
//!         inputs:
//!           API_KEY: $SERVICE_API_KEY
//!         annotations:
//!           require-adobe-auth: true
//!           final: true
//!     sequences:
//!       math:
//!         actions: addNumbers, squareNumber
//!         web: 'yes'
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// Static inputs declared on a package or action.
pub type Inputs = serde_json::Map<String, Value>;

/// Errors raised while loading the manifest.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The manifest is not valid YAML or does not match the expected shape.
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The manifest parsed but declares something unusable.
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

/// Web exposure of an action, from `web` or the `web-export` annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WebExport {
    /// Not reachable without platform credentials.
    #[default]
    No,
    /// Web action; bodies are decoded into parameters.
    Yes,
    /// Raw web action; the body is passed through as `__ow_body`.
    Raw,
}

impl std::str::FromStr for WebExport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "true" => Ok(WebExport::Yes),
            "no" | "false" => Ok(WebExport::No),
            "raw" => Ok(WebExport::Raw),
            _ => Err(format!("unknown web export value: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for WebExport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(true) => Ok(WebExport::Yes),
            Repr::Flag(false) => Ok(WebExport::No),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Action annotations. Unknown annotations are kept in `other`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Annotations {
    /// Gate invocations on the presence of authorization headers.
    #[serde(rename = "require-adobe-auth", default)]
    pub require_adobe_auth: bool,
    /// Static inputs cannot be overridden by request parameters.
    #[serde(rename = "final", default)]
    pub final_params: bool,
    /// Same meaning as the action's `web` attribute.
    #[serde(rename = "web-export", default)]
    pub web_export: Option<WebExport>,
    /// Treat the action as raw regardless of `web`.
    #[serde(rename = "raw-http", default)]
    pub raw_http: bool,
    /// Any other annotation, verbatim.
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// A single deployable action.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionDefinition {
    /// Owning package (filled in from the manifest key).
    #[serde(skip)]
    pub package: String,
    /// Action name (filled in from the manifest key).
    #[serde(skip)]
    pub name: String,
    /// Path to the action source, relative to the project root.
    pub function: PathBuf,
    /// Declared runtime, e.g. `nodejs:18`.
    #[serde(default)]
    pub runtime: Option<String>,
    /// Action-level static inputs.
    #[serde(default)]
    pub inputs: Inputs,
    /// Annotations.
    #[serde(default)]
    pub annotations: Annotations,
    /// Web exposure.
    #[serde(default)]
    pub web: Option<WebExport>,
}

impl ActionDefinition {
    /// Create an action definition.
    pub fn new(
        package: impl Into<String>,
        name: impl Into<String>,
        function: impl Into<PathBuf>,
    ) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            function: function.into(),
            runtime: None,
            inputs: Inputs::new(),
            annotations: Annotations::default(),
            web: None,
        }
    }

    /// Add a static input.
    pub fn input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    /// Set web exposure.
    pub fn web(mut self, web: WebExport) -> Self {
        self.web = Some(web);
        self
    }

    /// Set the `require-adobe-auth` annotation.
    pub fn require_auth(mut self, required: bool) -> Self {
        self.annotations.require_adobe_auth = required;
        self
    }

    /// Set the `final` annotation.
    pub fn final_params(mut self, final_params: bool) -> Self {
        self.annotations.final_params = final_params;
        self
    }

    /// Effective web exposure: `web` wins over the `web-export` annotation.
    pub fn web_export(&self) -> WebExport {
        self.web
            .or(self.annotations.web_export)
            .unwrap_or_default()
    }

    /// Whether the action is reachable as a web action in production.
    pub fn is_web_action(&self) -> bool {
        self.web_export() != WebExport::No
    }

    /// Whether the action receives its body unparsed.
    pub fn is_raw(&self) -> bool {
        self.web_export() == WebExport::Raw || self.annotations.raw_http
    }

    /// Whether the action is gated on authorization headers.
    pub fn requires_auth(&self) -> bool {
        self.annotations.require_adobe_auth
    }

    /// `package/action`.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.package, self.name)
    }
}

/// An ordered chain of actions in one package.
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceDefinition {
    /// Owning package (filled in from the manifest key).
    #[serde(skip)]
    pub package: String,
    /// Sequence name (filled in from the manifest key).
    #[serde(skip)]
    pub name: String,
    /// Step action names, in order. Not validated until invocation.
    #[serde(deserialize_with = "deserialize_action_list", default)]
    pub actions: Vec<String>,
    /// Web exposure.
    #[serde(default)]
    pub web: Option<WebExport>,
}

impl SequenceDefinition {
    /// Create a sequence definition from a comma-separated action list.
    pub fn new(package: impl Into<String>, name: impl Into<String>, actions: &str) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            actions: split_action_list(actions),
            web: None,
        }
    }

    /// Whether the sequence receives its body unparsed.
    pub fn is_raw(&self) -> bool {
        self.web == Some(WebExport::Raw)
    }
}

fn split_action_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn deserialize_action_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Joined(s) => split_action_list(&s),
        Repr::List(items) => items
            .iter()
            .flat_map(|item| split_action_list(item))
            .collect(),
    })
}

/// A package: shared inputs plus its actions and sequences.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDefinition {
    /// Package-level static inputs, overridden by action-level inputs.
    #[serde(default)]
    pub inputs: Inputs,
    /// Actions by name.
    #[serde(default)]
    pub actions: BTreeMap<String, ActionDefinition>,
    /// Sequences by name.
    #[serde(default)]
    pub sequences: BTreeMap<String, SequenceDefinition>,
}

/// All packages known to the server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionConfig {
    /// Packages by name.
    #[serde(default)]
    pub packages: BTreeMap<String, PackageDefinition>,
}

impl ActionConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a manifest from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ManifestError> {
        let mut config: ActionConfig = serde_yaml::from_str(text)?;

        for (package_name, package) in config.packages.iter_mut() {
            check_name("package", package_name)?;
            for (name, action) in package.actions.iter_mut() {
                check_name("action", name)?;
                action.package = package_name.clone();
                action.name = name.clone();
            }
            for (name, sequence) in package.sequences.iter_mut() {
                check_name("sequence", name)?;
                sequence.package = package_name.clone();
                sequence.name = name.clone();
            }
        }

        Ok(config)
    }

    /// Look up a package.
    pub fn package(&self, name: &str) -> Option<&PackageDefinition> {
        self.packages.get(name)
    }

    /// Add (or replace) an action, creating its package if needed.
    pub fn add_action(&mut self, action: ActionDefinition) -> &mut Self {
        self.packages
            .entry(action.package.clone())
            .or_default()
            .actions
            .insert(action.name.clone(), action);
        self
    }

    /// Add (or replace) a sequence, creating its package if needed.
    pub fn add_sequence(&mut self, sequence: SequenceDefinition) -> &mut Self {
        self.packages
            .entry(sequence.package.clone())
            .or_default()
            .sequences
            .insert(sequence.name.clone(), sequence);
        self
    }

    /// Set a package-level static input, creating the package if needed.
    pub fn package_input(
        &mut self,
        package: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.packages
            .entry(package.into())
            .or_default()
            .inputs
            .insert(key.into(), value.into());
        self
    }

    /// Number of actions across all packages.
    pub fn action_count(&self) -> usize {
        self.packages.values().map(|p| p.actions.len()).sum()
    }

    /// Number of sequences across all packages.
    pub fn sequence_count(&self) -> usize {
        self.packages.values().map(|p| p.sequences.len()).sum()
    }
}

fn check_name(kind: &str, name: &str) -> Result<(), ManifestError> {
    if name.is_empty() || name.contains('/') {
        return Err(ManifestError::Invalid(format!(
            "{} name '{}' must be non-empty and must not contain '/'",
            kind, name
        )));
    }
    Ok(())
}
