//! CLI argument parsing and command behavior tests.

#![allow(deprecated)]

use assert_cmd::Command;
use camino::{Utf8Path, Utf8PathBuf};
use migrafix_edit::BackupVault;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn migrafix() -> Command {
    let mut cmd = Command::cargo_bin("migrafix").expect("migrafix binary");
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn utf8(td: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf8 tempdir")
}

fn create_temp_repo() -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    let root = td.path();
    fs::create_dir_all(root.join("src/main/java/demo")).unwrap();
    fs::write(
        root.join("src/main/java/demo/User.java"),
        "package demo;\n\nimport javax.persistence.Entity;\n\n@Entity\npublic class User {}\n",
    )
    .unwrap();
    fs::write(root.join("pom.xml"), "<project></project>\n").unwrap();
    td
}

/// Back up `User.java`, then overwrite it. Returns the manifest path.
fn backed_up_then_edited(repo: &Utf8Path, backups: &Utf8Path) -> Utf8PathBuf {
    let mut vault = BackupVault::create(repo, &backups.join("demo_backup")).unwrap();
    vault.snapshot(["src/main/java/demo/User.java"]).unwrap();
    fs::write(repo.join("src/main/java/demo/User.java"), "edited\n").unwrap();
    vault.manifest_path()
}

#[test]
fn help_lists_subcommands() {
    migrafix()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("rules"));
}

#[test]
fn unknown_subcommand_fails() {
    migrafix().arg("upgrade").assert().failure();
}

#[test]
fn unknown_provider_is_rejected_by_parser() {
    let temp = create_temp_repo();
    migrafix()
        .current_dir(temp.path())
        .args(["migrate", "--provider", "bard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider"));
}

#[test]
fn file_limit_below_ten_is_rejected_by_parser() {
    let temp = create_temp_repo();
    migrafix()
        .current_dir(temp.path())
        .args(["migrate", "--max-files", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-files"));
}

#[test]
fn rules_text_lists_builtin_renames() {
    migrafix()
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("javax.persistence -> jakarta.persistence"))
        .stdout(predicate::str::contains("javax.annotation.processing"));
}

#[test]
fn rules_json_includes_configured_mapping() {
    let temp = create_temp_repo();
    fs::write(
        temp.path().join("migrafix.toml"),
        "[[namespaces.mappings]]\nfrom = \"javax.legacy\"\nto = \"jakarta.legacy\"\n",
    )
    .unwrap();

    let out = migrafix()
        .current_dir(temp.path())
        .args(["rules", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("json output");
    let mappings = value["mappings"].as_array().expect("mappings array");
    assert!(mappings.iter().any(|m| m["from"] == "javax.legacy" && m["to"] == "jakarta.legacy"));
    assert!(value["exclusions"].as_array().is_some_and(|e| !e.is_empty()));
}

#[test]
fn migrate_without_api_key_fails_with_hint() {
    let temp = create_temp_repo();
    migrafix()
        .current_dir(temp.path())
        .arg("migrate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no generation provider configured"));

    let unchanged = fs::read_to_string(temp.path().join("src/main/java/demo/User.java")).unwrap();
    assert!(unchanged.contains("javax.persistence.Entity"));
}

#[test]
fn invalid_config_fails() {
    let temp = create_temp_repo();
    fs::write(temp.path().join("migrafix.toml"), "[generation\nworkers = ").unwrap();
    migrafix()
        .current_dir(temp.path())
        .arg("migrate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("migrafix.toml"));
}

#[test]
fn restore_puts_original_back() {
    let temp = create_temp_repo();
    let backups = tempfile::tempdir().unwrap();
    let repo = utf8(&temp);
    let manifest = backed_up_then_edited(&repo, &utf8(&backups));

    migrafix()
        .args(["restore", "--manifest", manifest.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("restored src/main/java/demo/User.java"));

    let restored = fs::read_to_string(repo.join("src/main/java/demo/User.java")).unwrap();
    assert!(restored.contains("import javax.persistence.Entity;"));
}

#[test]
fn restore_dry_run_leaves_files_alone() {
    let temp = create_temp_repo();
    let backups = tempfile::tempdir().unwrap();
    let repo = utf8(&temp);
    let manifest = backed_up_then_edited(&repo, &utf8(&backups));

    migrafix()
        .args(["restore", "--dry-run", "--manifest", manifest.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("would restore src/main/java/demo/User.java"));

    let current = fs::read_to_string(repo.join("src/main/java/demo/User.java")).unwrap();
    assert_eq!(current, "edited\n");
}

#[test]
fn restore_with_tampered_copy_fails() {
    let temp = create_temp_repo();
    let backups = tempfile::tempdir().unwrap();
    let repo = utf8(&temp);
    let manifest = backed_up_then_edited(&repo, &utf8(&backups));
    let copy = manifest.parent().unwrap().join("src%2Fmain%2Fjava%2Fdemo%2FUser.java");
    fs::write(&copy, "tampered\n").unwrap();

    migrafix()
        .args(["restore", "--manifest", manifest.as_str()])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed src/main/java/demo/User.java"));

    let current = fs::read_to_string(repo.join("src/main/java/demo/User.java")).unwrap();
    assert_eq!(current, "edited\n");
}

#[test]
fn restore_missing_manifest_fails() {
    migrafix()
        .args(["restore", "--manifest", "/nonexistent/manifest.json"])
        .assert()
        .code(1);
}
