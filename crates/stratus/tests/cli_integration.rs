//! CLI integration tests for the Stratus binary.
//!
//! These run the binary for parsing and configuration validation only; no
//! server is started.

use assert_cmd::Command;
use predicates::prelude::*;

const CONSOLE_VARS: &[&str] = &[
    "CONSOLE_CLIENT_ID",
    "CONSOLE_CLIENT_SECRET",
    "CONSOLE_HOSTNAME",
    "CONSOLE_LOGIN_URL",
    "CONSOLE_UAA_URL",
    "CONSOLE_API_URL",
    "CONSOLE_LOG_URL",
    "SESSION_BACKEND",
    "SESSION_KEY",
    "SESSION_DIR",
    "REDIS_URL",
    "REDIS_PASSWORD",
    "SECURE_COOKIES",
    "LOCAL_CF",
    "TIC_SECRET",
    "PORT",
    "BIND_ADDRESS",
    "BUILD_INFO",
    "STRATUS_LOG_DIR",
];

/// Get a command for the stratus binary with no console settings inherited.
fn stratus() -> Command {
    let mut cmd = Command::cargo_bin("stratus").unwrap();
    for var in CONSOLE_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// A command with every required setting present.
fn configured() -> Command {
    let mut cmd = stratus();
    cmd.env("CONSOLE_CLIENT_ID", "console")
        .env("CONSOLE_CLIENT_SECRET", "super-secret")
        .env("CONSOLE_HOSTNAME", "https://console.example.com")
        .env("CONSOLE_LOGIN_URL", "https://login.example.com")
        .env("CONSOLE_UAA_URL", "https://uaa.example.com")
        .env("CONSOLE_API_URL", "https://api.example.com")
        .env("SESSION_KEY", "0123456789abcdef0123456789abcdef");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    stratus()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    stratus()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stratus"));
}

#[test]
fn test_serve_help_names_env_vars() {
    stratus()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CONSOLE_CLIENT_ID"))
        .stdout(predicate::str::contains("SESSION_BACKEND"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Validation Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_ok() {
    configured()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("file"))
        .stdout(predicate::str::contains("super-secret").not());
}

#[test]
fn test_config_json() {
    configured()
        .args(["config", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""session_backend": "file""#))
        .stdout(predicate::str::contains(r#""bind_address": "0.0.0.0:9999""#));
}

#[test]
fn test_config_reports_log_url() {
    configured()
        .env("CONSOLE_LOG_URL", "https://logs.example.com")
        .args(["config", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""log_url": "https://logs.example.com""#));

    configured()
        .env("CONSOLE_LOG_URL", "not a url")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("log url"));
}

#[test]
fn test_missing_client_id_fails() {
    configured()
        .env_remove("CONSOLE_CLIENT_ID")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("client id"));
}

#[test]
fn test_insecure_cookies_need_local_target() {
    configured()
        .env("SECURE_COOKIES", "false")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("insecure cookies"));

    configured()
        .env("SECURE_COOKIES", "false")
        .env("LOCAL_CF", "true")
        .arg("config")
        .assert()
        .success();
}

#[test]
fn test_redis_backend_needs_url() {
    configured()
        .env("SESSION_BACKEND", "redis")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("redis url"));
}

#[test]
fn test_unknown_backend_rejected() {
    configured()
        .env("SESSION_BACKEND", "memcached")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("memcached"));
}

#[test]
fn test_port_from_env() {
    configured()
        .env("PORT", "8181")
        .args(["config", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.0.0.0:8181"));
}
