//! End-to-end CLI tests for the padron binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

mod support;
use support::range_server::mount_range_file;
use support::socket_guard::start_mock_server_or_skip;
use support::zip_fixture::write_zip;

fn padron() -> Command {
    let mut cmd = Command::cargo_bin("padron").unwrap();
    for var in [
        "PADRON_URL",
        "PADRON_PARTS",
        "PADRON_ARCHIVE",
        "PADRON_DATABASE",
        "PADRON_COLUMNS",
        "PADRON_TABLE",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    padron()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reduced taxpayer registry"))
        .stdout(predicate::str::contains("--skip-download"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    padron()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("padron"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    padron()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_skip_download_imports_existing_archive() {
    let dir = TempDir::new().unwrap();
    let archive = write_zip(
        dir.path(),
        "p.zip",
        &[("p.txt", b"RUC|NOMBRE\n1|uno\n2|dos\n")],
    );
    let db = dir.path().join("p.db");

    padron()
        .args(["--skip-download", "--no-progress", "--json", "--table", "t", "--columns", "id,name"])
        .arg("--archive")
        .arg(&archive)
        .arg("--database")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rows\": 2"))
        .stdout(predicate::str::contains("\"download\": null"));

    assert!(db.exists());
}

#[test]
fn test_missing_archive_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    padron()
        .args(["--skip-download", "--no-progress"])
        .arg("--archive")
        .arg(dir.path().join("absent.zip"))
        .arg("--database")
        .arg(dir.path().join("p.db"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("import"));
}

#[test]
fn test_invalid_column_name_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    padron()
        .args(["--skip-download", "--columns", "id,bad name"])
        .arg("--archive")
        .arg(dir.path().join("p.zip"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid import schema"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_then_import() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let fixture = write_zip(
        dir.path(),
        "fixture.zip",
        &[("padron.txt", b"RUC|NOMBRE\n10|diez\n20|veinte\n30|treinta\n")],
    );
    mount_range_file(&server, "/padron.zip", std::fs::read(&fixture).unwrap()).await;

    let url = format!("{}/padron.zip", server.uri());
    let archive = dir.path().join("downloaded.zip");
    let db = dir.path().join("p.db");
    let scratch = dir.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();

    let mut cmd = padron();
    cmd.args(["--no-progress", "-q", "--parts", "3", "--table", "t", "--columns", "id,name"])
        .arg("--url")
        .arg(&url)
        .arg("--archive")
        .arg(&archive)
        .arg("--database")
        .arg(&db)
        .arg("--scratch-dir")
        .arg(&scratch);
    let assert = tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap();
    assert.success();

    assert_eq!(std::fs::read(&archive).unwrap(), std::fs::read(&fixture).unwrap());
    assert!(std::fs::read_dir(&scratch).unwrap().next().is_none());
}
