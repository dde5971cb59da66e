use hashledger::engine::{ScanConfig, ScanEngine};
use hashledger::ledger::Ledger;
use hashledger::store::ResultStore;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_spaces_and_unicode_in_paths() {
    let state = tempdir().unwrap();
    let tree = tempdir().unwrap();
    let dir = tree.path().join("my photos/été 2024");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("plage à midi.jpg"), b"jpeg").unwrap();
    fs::write(dir.join("日本語.txt"), b"text").unwrap();

    let config = ScanConfig::new(
        tree.path(),
        state.path().join("processed_dirs"),
        state.path().join("processed_files.csv"),
    );
    let report = ScanEngine::new(config.clone()).run().unwrap();
    assert_eq!(report.files_hashed, 2);

    let ledger = Ledger::load(&config.ledger_path).unwrap().into_ledger();
    assert_eq!(ledger.is_processed(&dir), Some(true));

    let records = ResultStore::read_all(&config.results_path).unwrap();
    let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
    assert!(paths.iter().any(|p| p.ends_with("été 2024/plage à midi.jpg")));
    assert!(paths.iter().any(|p| p.ends_with("日本語.txt")));
}

#[cfg(unix)]
#[test]
fn test_tab_in_file_name_round_trips() {
    let state = tempdir().unwrap();
    let tree = tempdir().unwrap();
    fs::write(tree.path().join("odd\tname.txt"), b"tabbed").unwrap();

    let config = ScanConfig::new(
        tree.path(),
        state.path().join("processed_dirs"),
        state.path().join("processed_files.csv"),
    );
    ScanEngine::new(config.clone()).run().unwrap();

    let records = ResultStore::read_all(&config.results_path).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].path.ends_with("odd\tname.txt"));
    assert_eq!(records[0].size, 6);
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_unicode_file_name_is_diverted() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let state = tempdir().unwrap();
    let tree = tempdir().unwrap();
    fs::write(tree.path().join(OsStr::from_bytes(b"bad\xffname")), b"x").unwrap();
    fs::write(tree.path().join("good"), b"y").unwrap();

    let config = ScanConfig::new(
        tree.path(),
        state.path().join("processed_dirs"),
        state.path().join("processed_files.csv"),
    );
    let report = ScanEngine::new(config.clone()).run().unwrap();

    assert_eq!(report.files_hashed, 2);
    assert_eq!(report.rows_written, 1);
    assert_eq!(report.rows_diverted, 1);
    assert_eq!(report.directories_pending, 0);

    let records = ResultStore::read_all(&config.results_path).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].path.ends_with("good"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_unicode_directory_is_scanned_and_diverted() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let state = tempdir().unwrap();
    let tree = tempdir().unwrap();
    let bad_dir = tree.path().join(OsStr::from_bytes(b"bad\xffdir"));
    fs::create_dir_all(bad_dir.join("nested")).unwrap();
    fs::write(bad_dir.join("inside.txt"), b"inside").unwrap();
    fs::write(bad_dir.join("nested/deeper.txt"), b"deeper").unwrap();
    fs::write(tree.path().join("good"), b"good").unwrap();

    let config = ScanConfig::new(
        tree.path(),
        state.path().join("processed_dirs"),
        state.path().join("processed_files.csv"),
    );
    let report = ScanEngine::new(config.clone()).run().unwrap();

    assert_eq!(report.directories_total, 3);
    assert_eq!(report.directories_pending, 0);
    assert_eq!(report.files_hashed, 3);
    assert_eq!(report.rows_written, 1);
    assert_eq!(report.rows_diverted, 2);

    // The raw-bytes ledger key survives a save and reload.
    let ledger = Ledger::load(&config.ledger_path).unwrap().into_ledger();
    assert_eq!(ledger.is_processed(&bad_dir), Some(true));
    assert_eq!(ledger.is_processed(&bad_dir.join("nested")), Some(true));

    let rerun = ScanEngine::new(config).run().unwrap();
    assert_eq!(rerun.files_hashed, 0);
}

#[test]
fn test_empty_tree() {
    let state = tempdir().unwrap();
    let tree = tempdir().unwrap();

    let config = ScanConfig::new(
        tree.path(),
        state.path().join("processed_dirs"),
        state.path().join("processed_files.csv"),
    );
    let report = ScanEngine::new(config.clone()).run().unwrap();

    assert_eq!(report.files_hashed, 0);
    assert_eq!(report.directories_total, 1);
    assert_eq!(report.directories_pending, 0);
    assert_eq!(
        fs::read_to_string(&config.results_path).unwrap(),
        "path\tsize\thash\n"
    );
}
