use coffer_fs::{
    PathState, PermissionMode, ReplaceOptions, modified, probe, remove_existing, replace_file,
    set_modified,
};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

#[test]
fn test_probe_then_remove_collided_file() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("report.txt");
    std::fs::write(&target, "stale").unwrap();

    let state = probe(&target).unwrap();
    assert_eq!(state, PathState::File);
    assert!(state.exists());

    remove_existing(&target, state).unwrap();
    assert_eq!(probe(&target).unwrap(), PathState::Missing);
}

#[test]
fn test_non_empty_directory_survives_removal_attempt() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("d");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("inner.txt"), "inner").unwrap();

    let state = probe(&target).unwrap();
    assert!(state.is_non_empty_directory());
    assert!(remove_existing(&target, state).is_err());
    assert_eq!(std::fs::read_to_string(target.join("inner.txt")).unwrap(), "inner");
}

#[test]
fn test_shadow_swap_leaves_no_shadow() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("bundle.tar");
    let shadow = dir.path().join(".bundle.tar.shadow");
    std::fs::write(&original, b"v1").unwrap();
    std::fs::write(&shadow, b"v2").unwrap();

    replace_file(&shadow, &original, ReplaceOptions::new()).unwrap();

    assert_eq!(std::fs::read(&original).unwrap(), b"v2");
    assert!(!shadow.exists());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn test_restore_metadata_on_extracted_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bin");
    std::fs::write(&path, b"\x7fELF").unwrap();

    let when = UNIX_EPOCH + Duration::from_secs(1_234_567_890);
    set_modified(&path, when).unwrap();
    PermissionMode::from_stored(Some(0o755), cfg!(unix))
        .apply_to_path(&path)
        .unwrap();

    assert_eq!(modified(&path).unwrap(), when);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
