//! Integration tests for CLI commands

#![allow(deprecated)]

use assert_cmd::{assert::OutputAssertExt, cargo::CommandCargoExt};
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn ytmcp(cwd: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ytmcp").unwrap();
    cmd.current_dir(cwd.path())
        .env_remove("YTMCP_CONFIG")
        .env_remove("MCP_SERVER_URL")
        .env_remove("MCP_PORT");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    ytmcp(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("tools"));
}

#[test]
fn test_search_rejects_empty_query() {
    let tmp = TempDir::new().unwrap();
    ytmcp(&tmp)
        .args(["search", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn test_search_rejects_unknown_kind() {
    let tmp = TempDir::new().unwrap();
    ytmcp(&tmp)
        .args(["search", "rust", "--kind", "shorts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown content kind"));
}

#[test]
fn test_invalid_project_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join(".ytmcp.toml"), "[client]\nserver_url = \"ftp://nope\"\n").unwrap();

    ytmcp(&tmp)
        .args(["search", "rust"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_serve_rejects_unknown_mode() {
    let tmp = TempDir::new().unwrap();
    ytmcp(&tmp)
        .args(["serve", "--mode", "websocket"])
        .assert()
        .failure();
}
