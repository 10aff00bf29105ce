//! Integration tests for the `sitectl` binary.
//!
//! Argument parsing, config handling and exit codes run without a server;
//! the site commands at the bottom talk to a wiremock stand-in.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_VAR: &str = "CLI_TEST_SERVER_TOKEN";

// ── Helpers ─────────────────────────────────────────────────────────

/// A `sitectl` command whose config directory is `home`.
fn sitectl(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("sitectl");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env(TOKEN_VAR, "test-token")
        .env_remove("SITECTL_SERVER")
        .env_remove("SITECTL_PROJECT")
        .env_remove("SITECTL_OUTPUT")
        .env_remove("SITECTL_INSECURE")
        .env_remove("SITECTL_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(home: &Path, contents: &str) {
    let dir = home.join("sitectl");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

fn rest_server_config(url: &str) -> String {
    format!(
        r#"
default_server = "dev"

[servers.dev]
url = "{url}"
mode = "rest"
token_env = "{TOKEN_VAR}"
"#
    )
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_usage() {
    let home = TempDir::new().unwrap();
    let output = sitectl(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn help_lists_top_level_commands() {
    let home = TempDir::new().unwrap();
    sitectl(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("site")
            .and(predicate::str::contains("static"))
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn version_flag() {
    let home = TempDir::new().unwrap();
    sitectl(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sitectl"));
}

#[test]
fn site_subcommands_exist() {
    let home = TempDir::new().unwrap();
    sitectl(home.path()).args(["site", "--help"]).assert().success().stdout(
        predicate::str::contains("create")
            .and(predicate::str::contains("transfer"))
            .and(predicate::str::contains("migrate"))
            .and(predicate::str::contains("control"))
            .and(predicate::str::contains("unshare"))
            .and(predicate::str::contains("security"))
            .and(predicate::str::contains("validate"))
            .and(predicate::str::contains("prerender")),
    );
}

#[test]
fn static_subcommands_exist() {
    let home = TempDir::new().unwrap();
    sitectl(home.path()).args(["static", "--help"]).assert().success().stdout(
        predicate::str::contains("upload")
            .and(predicate::str::contains("download"))
            .and(predicate::str::contains("delete")),
    );
}

#[test]
fn completions_zsh() {
    let home = TempDir::new().unwrap();
    sitectl(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Argument errors ─────────────────────────────────────────────────

#[test]
fn unknown_control_action_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    let output = sitectl(home.path())
        .args(["site", "control", "launch", "blog"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("launch"));
}

#[test]
fn create_requires_a_template() {
    let home = TempDir::new().unwrap();
    sitectl(home.path())
        .args(["site", "create", "blog"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--template"));
}

#[test]
fn migrate_source_and_template_file_conflict() {
    let home = TempDir::new().unwrap();
    sitectl(home.path())
        .args([
            "site", "migrate", "blog", "--source", "ic", "--template-file", "t.zip",
            "--repository", "Repo",
        ])
        .assert()
        .code(2);
}

// ── Server selection ────────────────────────────────────────────────

#[test]
fn no_server_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    sitectl(home.path())
        .args(["site", "validate", "blog"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No server selected"));
}

#[test]
fn unknown_server_lists_the_configured_ones() {
    let home = TempDir::new().unwrap();
    write_config(home.path(), &rest_server_config("https://dev.example.com"));
    sitectl(home.path())
        .args(["--server", "prod", "site", "validate", "blog"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("prod").and(predicate::str::contains("dev")));
}

#[test]
fn static_delete_needs_yes_without_a_terminal() {
    let home = TempDir::new().unwrap();
    write_config(home.path(), &rest_server_config("https://dev.example.com"));
    sitectl(home.path())
        .args(["static", "delete", "blog"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires confirmation"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_add_then_list_and_show() {
    let home = TempDir::new().unwrap();
    sitectl(home.path())
        .args([
            "config", "add", "dev", "--url", "https://dev.example.com", "--mode", "rest",
            "--username", "admin", "--password-env", "DEV_PASSWORD",
        ])
        .assert()
        .success();

    let saved = std::fs::read_to_string(home.path().join("sitectl").join("config.toml")).unwrap();
    assert!(saved.contains("default_server = \"dev\""));

    sitectl(home.path())
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dev").and(predicate::str::contains("https://dev.example.com")));

    sitectl(home.path())
        .args(["--output", "json", "config", "show", "dev"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"mode\": \"rest\"")
                .and(predicate::str::contains("\"password_env\": \"DEV_PASSWORD\"")),
        );
}

#[test]
fn config_show_redacts_plaintext_password() {
    let home = TempDir::new().unwrap();
    write_config(
        home.path(),
        r#"
[servers.dev]
url = "https://dev.example.com"
username = "admin"
password = "welcome1"
"#,
    );
    sitectl(home.path())
        .args(["config", "show", "dev"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[servers.dev]")
                .and(predicate::str::contains("welcome1").not()),
        );
}

#[test]
fn config_add_rejects_a_bad_url() {
    let home = TempDir::new().unwrap();
    sitectl(home.path())
        .args(["config", "add", "dev", "--url", "not a url"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid URL"));
}

#[test]
fn config_use_unknown_server() {
    let home = TempDir::new().unwrap();
    sitectl(home.path())
        .args(["config", "use", "prod"])
        .assert()
        .code(4);
}

// ── Site commands against a stand-in server ─────────────────────────

async fn mount_site(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/sites/management/api/v1/sites/name:blog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn run_blocking(mut cmd: Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn bringing_a_draft_site_online_fails_the_precondition() {
    let server = MockServer::start().await;
    mount_site(
        &server,
        json!({
            "id": "S1", "name": "blog",
            "runtimeStatus": "offline", "publishStatus": "unpublished"
        }),
    )
    .await;
    let home = TempDir::new().unwrap();
    write_config(home.path(), &rest_server_config(&server.uri()));

    let mut cmd = sitectl(home.path());
    cmd.args(["site", "control", "bring-online", "blog"]);
    let output = run_blocking(cmd).await;

    assert_eq!(output.status.code(), Some(9));
    assert!(combined_output(&output).contains("publish it first"));
}

#[tokio::test]
async fn taking_an_offline_site_offline_fails_the_precondition() {
    let server = MockServer::start().await;
    mount_site(
        &server,
        json!({
            "id": "S1", "name": "blog",
            "runtimeStatus": "offline", "publishStatus": "published"
        }),
    )
    .await;
    let home = TempDir::new().unwrap();
    write_config(home.path(), &rest_server_config(&server.uri()));

    let mut cmd = sitectl(home.path());
    cmd.args(["--quiet", "site", "control", "take-offline", "blog"]);
    let output = run_blocking(cmd).await;
    assert_eq!(output.status.code(), Some(9));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("site blog is already offline"));
}
