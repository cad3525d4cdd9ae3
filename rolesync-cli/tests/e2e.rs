//! End-to-end integration tests for rolesync-cli
//!
//! These tests run the built binary against a fake GitLab and are gated
//! behind the `integration` feature flag. Run with:
//!
//! ```sh
//! cargo test -p rolesync-cli --features integration
//! ```

#![cfg(feature = "integration")]

use std::path::Path;
use std::process::Output;

use serde_json::json;
use tempfile::TempDir;
use tokio::process::Command;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn rolesync(args: &[&str], project_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rolesync"))
        .args(args)
        .env("ROLESYNC_PROJECT_CONFIG_DIR", project_dir)
        .env("XDG_CONFIG_HOME", project_dir.join("xdg"))
        .output()
        .await
        .expect("Failed to run rolesync")
}

fn write_config(dir: &Path, url: &str, members: &str) -> std::path::PathBuf {
    std::fs::write(dir.join("token.txt"), "glpat-e2e\n").unwrap();
    let config = dir.join("config.toml");
    std::fs::write(
        &config,
        format!("[gitlab]\nurl = \"{url}\"\ntoken_file = \"token.txt\"\n\n[members]\n{members}"),
    )
    .unwrap();
    config
}

/// Test that rolesync --help works
#[tokio::test]
async fn rolesync_help_works() {
    let dir = TempDir::new().unwrap();
    let output = rolesync(&["--help"], dir.path()).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Converge GitLab group roles"));
    assert!(stdout.contains("reconcile"));
    assert!(stdout.contains("config"));
}

/// Test that rolesync reconcile --help shows all flags
#[tokio::test]
async fn rolesync_reconcile_help_shows_all_flags() {
    let dir = TempDir::new().unwrap();
    let output = rolesync(&["reconcile", "--help"], dir.path()).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--dry-run"));
    assert!(stdout.contains("--url"));
    assert!(stdout.contains("--token-file"));
    assert!(stdout.contains("--ca-bundle"));
}

/// Test that --url without --token-file is rejected by argument parsing
#[tokio::test]
async fn rolesync_url_requires_token_file() {
    let dir = TempDir::new().unwrap();
    let output = rolesync(
        &["reconcile", "--url", "https://gitlab.example.com"],
        dir.path(),
    )
    .await;

    assert!(!output.status.success());
}

/// Test that rolesync config path shows paths
#[tokio::test]
async fn rolesync_config_path_shows_paths() {
    let dir = TempDir::new().unwrap();
    let output = rolesync(&["config", "path"], dir.path()).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("User config:"));
    assert!(stdout.contains("Project config:"));
}

/// Test that config show never prints an inline token
#[tokio::test]
async fn rolesync_config_show_redacts_token() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[gitlab]\nurl = \"https://gitlab.example.com\"\nprivate_token = \"glpat-hidden\"\n",
    )
    .unwrap();

    let output = rolesync(&["config", "show"], dir.path()).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("https://gitlab.example.com"));
    assert!(!stdout.contains("glpat-hidden"));
}

/// Test that a missing token file fails before any request is made
#[tokio::test]
async fn rolesync_missing_token_file_fails_fast() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &server.uri(), "\"alice.doe\" = \"Owner\"\n");
    std::fs::remove_file(dir.path().join("token.txt")).unwrap();

    let output = rolesync(&["reconcile", "--config", config.to_str().unwrap()], dir.path()).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("token file"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

/// Test a full reconcile: one role update, one addition, sub-group left alone
#[tokio::test]
async fn rolesync_reconcile_updates_and_adds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &server.uri(),
        "\"alice.doe\" = \"Owner\"\n\"bob.doe\" = \"Maintainer\"\n",
    );

    Mock::given(method("GET"))
        .and(path("/api/v4/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "full_path": "platform"},
            {"id": 2, "full_path": "platform/infra"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups/1/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 11, "username": "alice.doe", "access_level": 30},
            {"id": 13, "username": "mallory", "access_level": 50}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups/2/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v4/groups/1/members/11"))
        .and(body_json(json!({"access_level": 50})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/users"))
        .and(query_param("username", "bob.doe"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 12, "username": "bob.doe"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v4/groups/1/members"))
        .and(body_json(json!({"user_id": 12, "access_level": 40})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let output = rolesync(&["reconcile", "--config", config.to_str().unwrap()], dir.path()).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("group platform"));
    assert!(stdout.contains("updating user alice.doe role from Developer to Owner"));
    assert!(stdout.contains("adding user bob.doe as Maintainer"));
    assert!(stdout.contains("group platform/infra"));
    assert!(!stdout.contains("skipping"));
    assert!(stdout.contains("1 updated, 1 added"));
    server.verify().await;
}

/// Test that explicit flags work without any config file for the connection
#[tokio::test]
async fn rolesync_explicit_flags_dry_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("token.txt"), "glpat-e2e").unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[members]\n\"carol.doe\" = \"Developer\"\n",
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v4/groups"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 5, "full_path": "design"}])),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v4/groups/5/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 21, "username": "carol.doe", "access_level": 10}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let token_file = dir.path().join("token.txt");
    let output = rolesync(
        &[
            "reconcile",
            "--dry-run",
            "--url",
            &server.uri(),
            "--token-file",
            token_file.to_str().unwrap(),
        ],
        dir.path(),
    )
    .await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[dry-run] design group: updating user carol.doe role from Guest to Developer"));
    server.verify().await;
}
