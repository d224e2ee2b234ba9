use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use migrafix_edit::{BackupError, BackupVault, backup_name, load_manifest, restore};
use migrafix_hash::sha256_hex;
use migrafix_types::backup::BACKUP_MANIFEST_FILE;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn repo() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    fs::create_dir_all(root.join("src/main/java")).unwrap();
    fs::write(
        root.join("src/main/java/A.java"),
        "import javax.persistence.Entity;\n",
    )
    .unwrap();
    fs::write(root.join("pom.xml"), "<project/>\n").unwrap();
    (temp, root)
}

fn vault(root: &Utf8Path) -> BackupVault {
    BackupVault::create(root, &root.join("out/backups/demo_backup_20260101_000000")).unwrap()
}

#[test]
fn snapshot_writes_copies_and_manifest() {
    let (_t, root) = repo();
    let mut v = vault(&root);
    let manifest = v.snapshot(["src/main/java/A.java", "pom.xml"]).unwrap().clone();

    assert_eq!(manifest.len(), 2);
    let entry = &manifest.entries["src/main/java/A.java"];
    assert_eq!(entry.backup_path, backup_name("src/main/java/A.java"));
    let copy = fs::read(v.dir().join(&entry.backup_path)).unwrap();
    assert_eq!(sha256_hex(&copy), entry.sha256);

    let on_disk = load_manifest(&v.dir().join(BACKUP_MANIFEST_FILE)).unwrap();
    assert_eq!(on_disk, manifest);
}

#[test]
fn snapshot_is_idempotent() {
    let (_t, root) = repo();
    let mut v = vault(&root);
    v.snapshot(["pom.xml"]).unwrap();
    let first = v.manifest().clone();

    // Modify the original; a repeated snapshot must keep the first copy.
    fs::write(root.join("pom.xml"), "<changed/>\n").unwrap();
    v.snapshot(["pom.xml"]).unwrap();
    assert_eq!(v.manifest(), &first);
}

#[test]
fn missing_file_fails_closed() {
    let (_t, root) = repo();
    let mut v = vault(&root);
    let err = v.snapshot(["pom.xml", "does/not/exist.java"]).unwrap_err();
    assert!(matches!(err, BackupError::Read { .. }));
    assert!(v.manifest().is_empty());
    assert!(!v.manifest_path().exists());
}

#[test]
fn restore_round_trip() {
    let (_t, root) = repo();
    let mut v = vault(&root);
    v.snapshot(["src/main/java/A.java"]).unwrap();

    fs::write(
        root.join("src/main/java/A.java"),
        "import jakarta.persistence.Entity;\n",
    )
    .unwrap();

    let dry = restore(&v.manifest_path(), None, true).unwrap();
    assert_eq!(dry.restored, vec!["src/main/java/A.java".to_string()]);
    assert_eq!(
        fs::read_to_string(root.join("src/main/java/A.java")).unwrap(),
        "import jakarta.persistence.Entity;\n"
    );

    let report = restore(&v.manifest_path(), None, false).unwrap();
    assert!(report.is_clean());
    assert_eq!(
        fs::read_to_string(root.join("src/main/java/A.java")).unwrap(),
        "import javax.persistence.Entity;\n"
    );
}

#[test]
fn restore_to_other_root_and_checksum_guard() {
    let (_t, root) = repo();
    let mut v = vault(&root);
    v.snapshot(["src/main/java/A.java", "pom.xml"]).unwrap();
    fs::write(v.dir().join(backup_name("pom.xml")), "tampered").unwrap();

    let other = TempDir::new().unwrap();
    let other_root = Utf8PathBuf::from_path_buf(other.path().to_path_buf()).unwrap();
    let report = restore(&v.manifest_path(), Some(&other_root), false).unwrap();

    assert_eq!(report.restored, vec!["src/main/java/A.java".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, "pom.xml");
    assert!(other_root.join("src/main/java/A.java").exists());
    assert!(!other_root.join("pom.xml").exists());
}
