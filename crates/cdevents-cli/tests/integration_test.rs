//! Integration tests for the cdevents CLI
//!
//! These tests verify the command flows against real files:
//! - Loading config from a TOML file
//! - Inspecting events stored on disk
//! - Schema lookup from a schema directory
//! - Rejecting incompatible or non-conformant events

use std::path::Path;

use clap::Parser;
use serde_json::Value;

use cdevents_cli::commands::{self, Cli};
use cdevents_cli::config::CliConfig;

const QUEUED_EVENT: &str = r#"{
    "context": {
        "version": "0.4.1",
        "id": "271069a8-fc18-44f1-b38f-9d70a1695819",
        "source": "/event/source/123",
        "type": "dev.cdevents.pipelinerun.queued.0.2.0",
        "timestamp": "2023-03-20T14:27:05.315384Z",
        "links": [
            {"linkType": "RELATION", "target": {"contextId": "change-1"}, "linkKind": "triggered-by"}
        ]
    },
    "subject": {
        "id": "mySubject123",
        "type": "pipelineRun",
        "content": {"pipelineName": "myPipeline", "url": "https://www.example.com/mySubject123"}
    },
    "customData": {"hello": "world"},
    "customDataContentType": "application/json"
}"#;

/// Write `content` to `name` inside `dir` and return the full path as a string
fn write_file(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("failed to write file");
    path.to_string_lossy().to_string()
}

fn run(args: &[&str], config: &CliConfig) -> anyhow::Result<commands::Output> {
    let cli = Cli::parse_from(std::iter::once("cdevents").chain(args.iter().copied()));
    commands::run(cli, config, std::io::empty())
}

#[test]
fn test_load_config_file() {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = write_file(
        temp_dir.path(),
        "config.toml",
        "[producer]\nsource = \"/ci/from-file\"\n\n[output]\npretty = true\n",
    );

    let config = CliConfig::load_from(Path::new(&path)).unwrap();
    assert_eq!(config.source(), "/ci/from-file");
    assert!(config.pretty());
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = write_file(temp_dir.path(), "config.toml", "[producer\nsource = 1");
    assert!(CliConfig::load_from(Path::new(&path)).is_err());
}

#[test]
fn test_inspect_file_with_schema_dir() {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let event_path = write_file(temp_dir.path(), "event.json", QUEUED_EVENT);
    write_file(temp_dir.path(), "pipelinerun-queued-event.json", r#"{"type": "object"}"#);
    let schema_dir = temp_dir.path().to_string_lossy().to_string();

    let output = run(
        &["inspect", &event_path, "--schema-dir", &schema_dir, "--expect", "dev.cdevents.pipelinerun.queued.0.1.0"],
        &CliConfig::default(),
    )
    .unwrap();
    assert!(output.success);

    let summary: Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(summary["type"], "dev.cdevents.pipelinerun.queued.0.2.0");
    assert_eq!(summary["builtin"], true);
    assert_eq!(summary["links"], 1);
    assert_eq!(summary["customData"], "json");
    assert_eq!(summary["schemaAvailable"], true);
}

#[test]
fn test_inspect_missing_schema_file() {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let event_path = write_file(temp_dir.path(), "event.json", QUEUED_EVENT);
    let schema_dir = temp_dir.path().join("schemas");
    std::fs::create_dir(&schema_dir).unwrap();
    let schema_dir = schema_dir.to_string_lossy().to_string();

    let output = run(&["inspect", &event_path, "--schema-dir", &schema_dir], &CliConfig::default()).unwrap();
    let summary: Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(summary["schemaAvailable"], false);
}

#[test]
fn test_inspect_rejects_incompatible_expectation() {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let event_path = write_file(temp_dir.path(), "event.json", QUEUED_EVENT);

    let err = run(
        &["inspect", &event_path, "--expect", "dev.cdevents.pipelinerun.started.0.2.0"],
        &CliConfig::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("not compatible"));
}

#[test]
fn test_inspect_rejects_unknown_link_type() {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let bad = QUEUED_EVENT.replace("RELATION", "BOGUS");
    let event_path = write_file(temp_dir.path(), "event.json", &bad);

    let err = run(&["inspect", &event_path], &CliConfig::default()).unwrap_err();
    assert!(err.to_string().contains("unknown link type `BOGUS`"));
}

#[test]
fn test_inspect_missing_file() {
    let err = run(&["inspect", "/nonexistent/event.json"], &CliConfig::default()).unwrap_err();
    assert!(err.to_string().contains("failed to read"));
}
