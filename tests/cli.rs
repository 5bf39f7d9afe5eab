// Black-box tests for the `chit` binary. Each test gets its own HOME so the
// settings file, data dir and export dir all live in a temp directory.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Env {
    home: TempDir,
}

impl Env {
    fn new() -> Self {
        Self { home: tempfile::tempdir().unwrap() }
    }

    fn data_dir(&self) -> PathBuf {
        self.home.path().join("data")
    }

    fn chit(&self) -> Command {
        let mut cmd = Command::cargo_bin("chit").unwrap();
        cmd.env("HOME", self.home.path())
            .env_remove("OPENAI_API_KEY")
            .env_remove("RUST_LOG")
            .current_dir(self.home.path());
        cmd
    }

    fn initialized() -> Self {
        let env = Self::new();
        env.chit()
            .args(["init", "--data-dir", env.data_dir().to_str().unwrap()])
            .assert()
            .success();
        env
    }

    fn write(&self, name: &str, body: &[u8]) -> PathBuf {
        let path = self.home.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn upload(&self, path: &Path) {
        self.chit()
            .args(["upload", path.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 uploaded"));
    }
}

#[test]
fn init_creates_database_and_status_reports_it() {
    let env = Env::initialized();
    assert!(env.data_dir().join("chit.db").exists());
    assert!(env.data_dir().join("uploads").is_dir());

    env.chit()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Receipts:      0"))
        .stdout(predicate::str::contains("FX rate:       20"));
}

#[test]
fn commands_before_init_point_at_init() {
    let env = Env::new();
    env.chit()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("chit init"));
}

#[test]
fn upload_skips_unsupported_files() {
    let env = Env::initialized();
    let notes = env.write("notes.txt", b"hello");
    env.chit()
        .args(["upload", notes.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 uploaded, 0 duplicate, 1 unsupported"));
}

#[test]
fn duplicate_upload_is_skipped() {
    let env = Env::initialized();
    let scan = env.write("scan.jpg", b"not really a jpeg");
    env.upload(&scan);
    env.chit()
        .args(["upload", scan.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already uploaded"));
}

#[test]
fn upload_review_and_export_csv() {
    let env = Env::initialized();
    let scan = env.write("scan.jpg", b"not really a jpeg");
    env.upload(&scan);

    env.chit()
        .args(["list", "--pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pending"));

    env.chit()
        .args([
            "review", "1",
            "--restaurant", "Café René",
            "--date", "2025-10-15",
            "--amount", "1000",
            "--fx-rate", "20",
            "--markup", "2.5",
            "--cost-center", "Sales",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025_10_Cafe_Rene.pdf"))
        .stdout(predicate::str::contains("$51.25"));

    let out = env.home.path().join("report.csv");
    env.chit()
        .args(["export", "csv", "--output", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 receipts"));

    let csv = std::fs::read_to_string(&out).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Date,Provider,Detail,Amount,Reimbursement,Account,Country,Cost Center")
    );
    assert_eq!(lines.next(), Some("15/10/2025,Café René,,51.25,,Client Meals,MX,Sales"));
}

#[test]
fn split_needs_two_cost_centers() {
    let env = Env::initialized();
    let scan = env.write("scan.jpg", b"bytes");
    env.upload(&scan);

    env.chit()
        .args(["split", "1", "--cost-center", "Sales"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 2 cost centers"));

    env.chit()
        .args(["review", "1", "--amount", "300", "--restaurant", "Cafe", "--date", "2025-10-15"])
        .assert()
        .success();
    env.chit()
        .args(["split", "1", "--cost-center", "Sales", "--cost-center", "Ops", "--cost-center", "R&D"])
        .assert()
        .success()
        .stdout(predicate::str::contains("into 3 receipts"))
        .stdout(predicate::str::contains("2025_10_Cafe_3.pdf"));

    env.chit()
        .arg("show")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Receipt 1 not found."));
}

#[test]
fn missing_ids_are_reported_not_errors() {
    let env = Env::initialized();
    env.chit()
        .args(["delete", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Receipt 42 not found."));
    env.chit()
        .args(["review", "42", "--amount", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Receipt 42 not found."));
}

#[test]
fn reprice_rejects_bad_rates() {
    let env = Env::initialized();
    env.chit()
        .args(["reprice", "--fx-rate", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FX rate must be a positive number"));
    env.chit()
        .args(["reprice", "--fx-rate", "-3"])
        .assert()
        .failure();
    env.chit()
        .args(["reprice", "--fx-rate", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid number for fx-rate"));

    env.chit()
        .args(["reprice", "--fx-rate", "18.5", "--markup", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Repriced 0 receipt(s)"));
    env.chit()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("FX rate:       18.5"));
}

#[test]
fn review_rejects_bad_date_without_writing() {
    let env = Env::initialized();
    let scan = env.write("scan.png", b"bytes");
    env.upload(&scan);
    env.chit()
        .args(["review", "1", "--date", "15/10/2025"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected YYYY-MM-DD"));
    env.chit()
        .args(["list", "--reviewed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No receipts."));
}

#[test]
fn export_with_nothing_reviewed_fails() {
    let env = Env::initialized();
    env.chit()
        .args(["export", "csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No reviewed receipts"));
}

#[test]
fn clear_removes_records_and_files() {
    let env = Env::initialized();
    let scan = env.write("scan.jpg", b"bytes");
    env.upload(&scan);
    env.chit()
        .args(["clear", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 receipt(s) and 1 file(s)."));
    assert_eq!(std::fs::read_dir(env.data_dir().join("uploads")).unwrap().count(), 0);
}

#[test]
fn cost_centers_fall_back_then_remember() {
    let env = Env::initialized();
    env.chit()
        .args(["cost-centers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Corporate"));
    env.chit()
        .args(["cost-centers", "add", "Research"])
        .assert()
        .success();
    env.chit()
        .args(["suggest", "cc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Research"));
    env.chit()
        .args(["suggest", "vendor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown field"));
}

#[test]
fn load_switches_only_to_an_existing_store() {
    let env = Env::initialized();
    let empty = env.home.path().join("elsewhere");
    std::fs::create_dir_all(&empty).unwrap();
    env.chit()
        .args(["load", empty.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No database found"));

    let scan = env.write("scan.jpg", b"bytes");
    env.upload(&scan);
    env.chit()
        .args(["load", env.data_dir().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 receipts, 1 pending review"));
}
