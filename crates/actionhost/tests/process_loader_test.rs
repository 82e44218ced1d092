// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end tests running built actions as child processes.
//!
//! Modules are shell scripts standing in for build output.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use actionhost::dispatcher::Dispatcher;
use actionhost::invoker::ActionInvoker;
use actionhost::loader::ProcessLoader;
use actionhost::manifest::ActionConfig;
use actionhost::params::WebRequest;
use actionhost::response::InvocationResult;

const MANIFEST: &str = r#"
packages:
  app:
    actions:
      whoami:
        function: actions/whoami/index.js
        web: 'yes'
      reader:
        function: actions/reader/index.js
        web: 'yes'
      crash:
        function: actions/crash/index.js
        web: 'yes'
      changing:
        function: actions/changing/index.js
        web: 'yes'
      missing:
        function: actions/missing/index.js
        web: 'yes'
"#;

struct Project {
    root: TempDir,
    dispatcher: Dispatcher,
    loader: Arc<ProcessLoader>,
}

impl Project {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let loader = Arc::new(ProcessLoader::new(root.path().join("dist")));
        let invoker = ActionInvoker::new(loader.clone())
            .with_namespace("dev")
            .with_project_dir(root.path());
        let config = ActionConfig::from_yaml_str(MANIFEST).unwrap();
        Self {
            dispatcher: Dispatcher::new(Arc::new(config), invoker),
            loader,
            root,
        }
    }

    fn build(&self, action: &str, script: &str) {
        write_main(&self.root.path().join("dist/app").join(format!("{}-temp", action)), script);
    }

    fn source_dir(&self, action: &str) -> std::path::PathBuf {
        let dir = self.root.path().join("actions").join(action);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

fn write_main(module: &Path, script: &str) {
    std::fs::create_dir_all(module).unwrap();
    let main = module.join("main");
    let staging = module.join("main.new");
    std::fs::write(&staging, script).unwrap();
    std::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o755)).unwrap();
    std::fs::rename(&staging, &main).unwrap();
}

#[tokio::test]
async fn test_activation_identity_reaches_the_child() {
    let project = Project::new();
    project.build(
        "whoami",
        "#!/bin/sh\ncat > /dev/null\nprintf '{\"body\":{\"id\":\"%s\",\"name\":\"%s\",\"ns\":\"%s\"}}' \"$__OW_ACTIVATION_ID\" \"$__OW_ACTION_NAME\" \"$__OW_NAMESPACE\"\n",
    );

    let first = project
        .dispatcher
        .dispatch("app/whoami", &WebRequest::new("GET"))
        .await;
    let second = project
        .dispatcher
        .dispatch("app/whoami", &WebRequest::new("GET"))
        .await;

    assert_eq!(first.status_code, 200);
    assert_eq!(first.body["name"], json!("/dev/app/whoami"));
    assert_eq!(first.body["ns"], json!("dev"));
    assert_eq!(first.body["id"].as_str().unwrap().len(), 32);
    assert_ne!(first.body["id"], second.body["id"]);
    assert!(std::env::var("__OW_ACTIVATION_ID").is_err());
}

#[tokio::test]
async fn test_runs_in_source_directory_with_envelope_on_stdin() {
    let project = Project::new();
    std::fs::write(project.source_dir("reader").join("config.txt"), "local-config").unwrap();
    project.build(
        "reader",
        "#!/bin/sh\ninput=$(cat)\nprintf '{\"body\":{\"file\":\"%s\",\"input\":%s}}' \"$(cat config.txt)\" \"$input\"\n",
    );
    let cwd_before = std::env::current_dir().unwrap();

    let result = project
        .dispatcher
        .dispatch("app/reader/x", &WebRequest::new("GET").query("q=1"))
        .await;

    assert_eq!(result.status_code, 200);
    assert_eq!(result.body["file"], json!("local-config"));
    assert_eq!(result.body["input"]["q"], json!("1"));
    assert_eq!(result.body["input"]["__ow_path"], json!("/x"));
    assert_eq!(std::env::current_dir().unwrap(), cwd_before);
}

#[tokio::test]
async fn test_failed_process_is_generic_400() {
    let project = Project::new();
    project.build("crash", "#!/bin/sh\necho 'stack trace here' >&2\nexit 1\n");

    let result = project
        .dispatcher
        .dispatch("app/crash", &WebRequest::new("GET"))
        .await;

    assert_eq!(
        result,
        InvocationResult::error(400, "Response is not valid 'message/http'.")
    );
}

#[tokio::test]
async fn test_missing_build_is_load_failure() {
    let project = Project::new();

    let result = project
        .dispatcher
        .dispatch("app/missing", &WebRequest::new("GET"))
        .await;

    assert_eq!(
        result,
        InvocationResult::error(
            400,
            "Response is not valid 'message/http'. missing action not found, or does not export main"
        )
    );
}

#[tokio::test]
async fn test_rebuilt_action_is_picked_up() {
    let project = Project::new();
    project.build("changing", "#!/bin/sh\necho '{\"body\":\"v1\"}'\n");

    let result = project
        .dispatcher
        .dispatch("app/changing", &WebRequest::new("GET"))
        .await;
    assert_eq!(result.body, json!("v1"));

    project.build("changing", "#!/bin/sh\necho '{\"body\":\"version two\"}'\n");

    let result = project
        .dispatcher
        .dispatch("app/changing", &WebRequest::new("GET"))
        .await;
    assert_eq!(result.body, json!("version two"));

    let module = project
        .loader
        .cached(&project.loader.module_path("app", "changing"))
        .unwrap();
    assert_eq!(module.generation, 2);
}
