//! E2E CLI tests covering:
//! - `grv init` config scaffolding
//! - Session commands (`whoami`, `logout`, `login` without an identity service)
//! - `grv stats`, `grv sync` offline behavior
//! - `grv export` in every format
//!
//! Each test runs `grv` as a subprocess against an isolated data directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::Path;
use tempfile::TempDir;

const ADMIN: &str = "admin@example.org";

fn grv_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("grv"));
    cmd.current_dir(dir);
    cmd.env("GRIEVANCE_HOME", dir);
    cmd.env("GRIEVANCE_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd.env_remove("GRIEVANCE_PASSWORD");
    cmd
}

fn setup() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("config.toml"),
        format!(
            "[organization]\nname = \"Masjid Uji\"\n\n[auth.users.\"{ADMIN}\"]\nrole = \"admin\"\nname = \"Pak Admin\"\ndepartment = \"Sekretariat\"\n"
        ),
    )
    .expect("write config");
    dir
}

fn sign_in_admin(dir: &Path) {
    let session = json!({
        "user": { "id": "uid-1", "email": ADMIN, "access_token": "token" },
        "profile": { "role": "admin", "name": "Pak Admin", "department": "Sekretariat" }
    });
    std::fs::write(dir.join("user_session.json"), session.to_string()).expect("write session");
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = grv_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("grv should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

fn seed(dir: &Path) {
    sign_in_admin(dir);
    run_json(
        dir,
        &["add", "-r", "A", "-c", "Sarana", "-p", "High", "-d", "Lampu mati", "--cost", "50000"],
    );
    let id = run_json(
        dir,
        &["add", "-r", "B \"Pak\"", "-c", "Kebersihan", "-p", "Low", "-d", "Karpet, kotor"],
    )["complaint"]["id"]
        .as_str()
        .expect("id")
        .to_string();
    run_json(dir, &["status", &id, "selesai"]);
}

// ---------------------------------------------------------------------------
// Init and session
// ---------------------------------------------------------------------------

#[test]
fn init_writes_config_and_refuses_overwrite() {
    let dir = TempDir::new().expect("tempdir");
    grv_cmd(dir.path()).args(["init"]).assert().success();
    let content = std::fs::read_to_string(dir.path().join("config.toml")).expect("config");
    assert!(content.contains("Masjid Al-Fajar"));
    assert!(content.contains("[auth.users."));

    grv_cmd(dir.path())
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    grv_cmd(dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn init_repairs_a_broken_config_with_force() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("config.toml"), "[ui\n").expect("write");
    grv_cmd(dir.path())
        .args(["whoami", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
    grv_cmd(dir.path()).args(["init", "--force"]).assert().success();
    grv_cmd(dir.path()).args(["whoami"]).assert().success();
}

#[test]
fn whoami_reports_anonymous_then_saved_session() {
    let dir = setup();
    let anon = run_json(dir.path(), &["whoami"]);
    assert_eq!(anon["logged_in"], false);
    assert_eq!(anon["name"], "User");

    sign_in_admin(dir.path());
    let me = run_json(dir.path(), &["whoami"]);
    assert_eq!(me["logged_in"], true);
    assert_eq!(me["email"], ADMIN);
    assert_eq!(me["role"], "admin");
    assert_eq!(me["department"], "Sekretariat");
}

#[test]
fn session_for_unregistered_email_is_discarded() {
    let dir = setup();
    let session = json!({
        "user": { "id": "u", "email": "stranger@example.org", "access_token": "t" },
        "profile": { "role": "admin", "name": "", "department": "" }
    });
    std::fs::write(dir.path().join("user_session.json"), session.to_string()).expect("write");

    assert_eq!(run_json(dir.path(), &["whoami"])["logged_in"], false);
    assert!(!dir.path().join("user_session.json").exists());
}

#[test]
fn logout_clears_the_saved_session() {
    let dir = setup();
    sign_in_admin(dir.path());
    let out = run_json(dir.path(), &["logout"]);
    assert_eq!(out["logged_out"], true);
    assert!(!dir.path().join("user_session.json").exists());
    assert_eq!(run_json(dir.path(), &["whoami"])["logged_in"], false);
}

#[test]
fn login_without_identity_service_fails_cleanly() {
    let dir = setup();
    grv_cmd(dir.path())
        .args(["login", "--email", ADMIN, "--password", "secret", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3004"));
    assert!(!dir.path().join("user_session.json").exists());
}

// ---------------------------------------------------------------------------
// Stats and sync
// ---------------------------------------------------------------------------

#[test]
fn stats_summarize_the_collection() {
    let dir = setup();
    seed(dir.path());

    let stats = run_json(dir.path(), &["stats"]);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["done"], 1);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["high_priority"], 1);
    assert_eq!(stats["total_cost"], 50000);
    assert_eq!(stats["completion_rate"], 50);
    assert_eq!(stats["source"], "cache");
}

#[test]
fn sync_without_remote_falls_back_to_cache() {
    let dir = setup();
    seed(dir.path());
    let out = run_json(dir.path(), &["sync"]);
    assert_eq!(out["source"], "cache");
    assert_eq!(out["count"], 2);
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[test]
fn export_csv_quotes_fields() {
    let dir = setup();
    seed(dir.path());
    grv_cmd(dir.path())
        .args(["export", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("No,ID,Tanggal,Pelapor"))
        .stdout(predicate::str::contains("\"B \"\"Pak\"\"\""))
        .stdout(predicate::str::contains("\"Karpet, kotor\""));
}

#[test]
fn export_json_respects_filters() {
    let dir = setup();
    seed(dir.path());
    let output = grv_cmd(dir.path())
        .args(["export", "json", "--status", "selesai"])
        .output()
        .expect("export");
    assert!(output.status.success());
    let records: Value = serde_json::from_slice(&output.stdout).expect("json array");
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "Selesai");
}

#[test]
fn export_txt_report_has_header_and_footer() {
    let dir = setup();
    seed(dir.path());
    grv_cmd(dir.path())
        .args(["export", "txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LAPORAN KELUHAN MASJID UJI"))
        .stdout(predicate::str::contains("STATISTIK"))
        .stdout(predicate::str::contains("Generated:"));
}

#[test]
fn export_table_paginates() {
    let dir = setup();
    seed(dir.path());
    grv_cmd(dir.path())
        .args(["export", "table", "--rows", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Halaman 1 dari 2"))
        .stdout(predicate::str::contains("Halaman 2 dari 2"));
}

#[test]
fn export_table_of_empty_view_falls_back_to_text() {
    let dir = setup();
    seed(dir.path());
    grv_cmd(dir.path())
        .args(["export", "table", "-s", "tidak-ada-yang-cocok"])
        .assert()
        .success()
        .stdout(predicate::str::contains("LAPORAN KELUHAN MASJID UJI"))
        .stdout(predicate::str::contains("Halaman").not());
}

#[test]
fn export_to_file_reports_path() {
    let dir = setup();
    seed(dir.path());
    let target = dir.path().join("out.csv");
    let target_str = target.to_str().expect("utf-8 path");
    let out = run_json(dir.path(), &["export", "csv", "-o", target_str]);
    assert_eq!(out["records"], 2);
    assert_eq!(out["kind"], "csv");
    let written = std::fs::read_to_string(&target).expect("file written");
    assert!(written.starts_with("No,ID,"));
}

#[test]
fn export_save_uses_the_monthly_file_name() {
    let dir = setup();
    seed(dir.path());
    let out = run_json(dir.path(), &["export", "csv", "--save"]);
    let path = out["path"].as_str().expect("path");
    assert!(path.starts_with("Laporan_Keluhan_"), "unexpected name {path}");
    assert!(path.ends_with(".csv"));
    assert!(dir.path().join(path).exists());
}
