//! End-to-end smoke tests for the operations binaries.

use assert_cmd::Command;
use tempfile::TempDir;

#[test]
fn test_seed_refresh_migrate_pipeline() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.db");
    let target = dir.path().join("target.db");

    Command::cargo_bin("ticketops-seed")
        .unwrap()
        .args(["--count", "20", "--seed", "1", "--yes"])
        .arg("--db")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicates::str::contains("Seeded"));

    Command::cargo_bin("ticketops-refresh")
        .unwrap()
        .arg("--yes")
        .arg("--db")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicates::str::contains("Processed: 20"));

    Command::cargo_bin("ticketops-migrate")
        .unwrap()
        .arg("--yes")
        .arg("--source")
        .arg(&source)
        .arg("--target")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicates::str::contains("Migration completed successfully"));
}

#[test]
fn test_seed_cancels_without_confirmation() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tickets.db");

    Command::cargo_bin("ticketops-seed")
        .unwrap()
        .args(["--count", "5", "--seed", "1"])
        .arg("--db")
        .arg(&db)
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicates::str::contains("Seed cancelled"));

    assert!(!db.exists());
}
