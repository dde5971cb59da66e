#![cfg(unix)]

use hashledger::engine::{EngineError, ErrorPolicy, ScanConfig, ScanEngine, ScanReport};
use hashledger::ledger::{Ledger, LedgerError};
use hashledger::progress::ProgressCallback;
use hashledger::scanner::HashError;
use hashledger::store::ResultStore;
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn set_mode(path: &Path, mode: u32) {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

/// Privileged users can read anything; permission tests are meaningless then.
fn permissions_enforced(path: &Path) -> bool {
    File::open(path).is_err()
}

struct Setup {
    state: TempDir,
    tree: TempDir,
    locked: PathBuf,
}

impl Setup {
    fn with_unreadable_file() -> Self {
        let state = tempdir().unwrap();
        let tree = tempdir().unwrap();
        fs::create_dir(tree.path().join("ok")).unwrap();
        fs::write(tree.path().join("ok/fine.txt"), b"fine").unwrap();
        fs::create_dir(tree.path().join("z")).unwrap();
        fs::write(tree.path().join("z/readable.txt"), b"readable").unwrap();
        let locked = tree.path().join("z/secret.txt");
        fs::write(&locked, b"secret").unwrap();
        set_mode(&locked, 0o000);
        Self {
            state,
            tree,
            locked,
        }
    }

    fn config(&self, policy: ErrorPolicy) -> ScanConfig {
        ScanConfig::new(
            self.tree.path(),
            self.state.path().join("processed_dirs"),
            self.state.path().join("processed_files.csv"),
        )
        .with_error_policy(policy)
    }
}

impl Drop for Setup {
    fn drop(&mut self) {
        let _ = fs::set_permissions(&self.locked, fs::Permissions::from_mode(0o644));
    }
}

#[test]
fn test_skip_policy_records_failure_and_completes_directory() {
    let setup = Setup::with_unreadable_file();
    if !permissions_enforced(&setup.locked) {
        return;
    }

    let config = setup.config(ErrorPolicy::Skip);
    let report = ScanEngine::new(config.clone()).run().unwrap();

    assert_eq!(report.files_hashed, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, setup.locked);
    assert!(report.skipped[0].reason.contains("Permission denied"));
    assert_eq!(report.directories_pending, 0);

    let ledger = Ledger::load(&config.ledger_path).unwrap().into_ledger();
    assert_eq!(
        ledger.is_processed(&setup.tree.path().join("z")),
        Some(true)
    );

    let records = ResultStore::read_all(&config.results_path).unwrap();
    assert_eq!(records.len(), 2);
    assert!(!records.iter().any(|r| r.path.ends_with("secret.txt")));
}

#[test]
fn test_abort_policy_fails_run_and_keeps_completed_work() {
    let setup = Setup::with_unreadable_file();
    if !permissions_enforced(&setup.locked) {
        return;
    }

    let config = setup.config(ErrorPolicy::Abort);
    let err = ScanEngine::new(config.clone()).run().unwrap_err();
    assert!(matches!(err, EngineError::Hash(HashError::PermissionDenied(_))));

    // Directories before the failure were checkpointed, the failing one was not.
    let ledger = Ledger::load(&config.ledger_path).unwrap().into_ledger();
    assert_eq!(
        ledger.is_processed(&setup.tree.path().join("ok")),
        Some(true)
    );
    assert_eq!(
        ledger.is_processed(&setup.tree.path().join("z")),
        Some(false)
    );
    let records = ResultStore::read_all(&config.results_path).unwrap();
    assert!(records.iter().any(|r| r.path.ends_with("fine.txt")));
}

#[test]
fn test_unlistable_directory_stays_pending() {
    let state = tempdir().unwrap();
    let tree = tempdir().unwrap();
    let closed = tree.path().join("closed");
    fs::create_dir(&closed).unwrap();
    fs::write(closed.join("inside.txt"), b"x").unwrap();
    fs::write(tree.path().join("top.txt"), b"top").unwrap();
    set_mode(&closed, 0o000);

    let enforced = fs::read_dir(&closed).is_err();
    let config = ScanConfig::new(
        tree.path(),
        state.path().join("processed_dirs"),
        state.path().join("processed_files.csv"),
    );
    let result = ScanEngine::new(config.clone()).run();
    set_mode(&closed, 0o755);
    if !enforced {
        return;
    }

    let report = result.unwrap();
    assert_eq!(report.files_hashed, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, closed);
    assert_eq!(report.directories_pending, 1);

    // Once readable, the next run picks it up.
    let report = ScanEngine::new(config).run().unwrap();
    assert_eq!(report.files_hashed, 1);
    assert_eq!(report.directories_pending, 0);
}

#[test]
fn test_corrupt_ledger_is_fatal_and_preserves_results() {
    let state = tempdir().unwrap();
    let tree = tempdir().unwrap();
    fs::write(tree.path().join("a"), b"a").unwrap();
    let config = ScanConfig::new(
        tree.path(),
        state.path().join("processed_dirs"),
        state.path().join("processed_files.csv"),
    );

    ScanEngine::new(config.clone()).run().unwrap();
    let results_before = fs::read_to_string(&config.results_path).unwrap();

    fs::write(&config.ledger_path, b"{ not json").unwrap();
    let err = ScanEngine::new(config.clone()).run().unwrap_err();

    assert!(matches!(
        err,
        EngineError::Ledger(LedgerError::Corrupt { .. })
    ));
    assert_eq!(
        fs::read_to_string(&config.results_path).unwrap(),
        results_before
    );
}

/// How the second file of a directory is changed after the first is hashed.
#[derive(Clone, Copy)]
enum Change {
    /// Delete it.
    Remove,
    /// Replace it with a directory, so reading it fails for any user.
    ReplaceWithDirectory,
}

/// Applies a [`Change`] to `target` once the first file has been hashed.
struct ChangeAfterFirstFile {
    target: PathBuf,
    change: Change,
}

impl ProgressCallback for ChangeAfterFirstFile {
    fn on_scan_start(&self, _pending_dirs: usize) {}

    fn on_files_processed(&self, count: usize) {
        if count != 1 {
            return;
        }
        fs::remove_file(&self.target).unwrap();
        if let Change::ReplaceWithDirectory = self.change {
            fs::create_dir(&self.target).unwrap();
        }
    }

    fn on_scan_end(&self, _files_processed: usize) {}
}

struct ChangingTree {
    state: TempDir,
    tree: TempDir,
    dir: PathBuf,
    target: PathBuf,
}

impl ChangingTree {
    fn new() -> Self {
        let state = tempdir().unwrap();
        let tree = tempdir().unwrap();
        let dir = tree.path().join("d");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("a.txt"), b"first").unwrap();
        let target = dir.join("b.txt");
        fs::write(&target, b"second").unwrap();
        Self {
            state,
            tree,
            dir,
            target,
        }
    }

    fn config(&self, policy: ErrorPolicy) -> ScanConfig {
        ScanConfig::new(
            self.tree.path(),
            self.state.path().join("processed_dirs"),
            self.state.path().join("processed_files.csv"),
        )
        .with_progress_interval(1)
        .with_error_policy(policy)
    }

    fn run(&self, policy: ErrorPolicy, change: Change) -> Result<ScanReport, EngineError> {
        let callback = Arc::new(ChangeAfterFirstFile {
            target: self.target.clone(),
            change,
        });
        ScanEngine::new(self.config(policy))
            .with_progress_callback(callback)
            .run()
    }
}

#[test]
fn test_skip_policy_records_unreadable_file_for_any_user() {
    let tree = ChangingTree::new();
    let config = tree.config(ErrorPolicy::Skip);

    let report = tree.run(ErrorPolicy::Skip, Change::ReplaceWithDirectory).unwrap();

    assert_eq!(report.files_hashed, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, tree.target);
    assert_eq!(report.directories_pending, 0);

    let ledger = Ledger::load(&config.ledger_path).unwrap().into_ledger();
    assert_eq!(ledger.is_processed(&tree.dir), Some(true));
    let records = ResultStore::read_all(&config.results_path).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].path.ends_with("a.txt"));
}

#[test]
fn test_abort_policy_stops_on_unreadable_file_for_any_user() {
    let tree = ChangingTree::new();
    let config = tree.config(ErrorPolicy::Abort);

    let err = tree
        .run(ErrorPolicy::Abort, Change::ReplaceWithDirectory)
        .unwrap_err();
    assert!(matches!(err, EngineError::Hash(HashError::Io { .. })));

    // The row hashed before the failure was flushed; the directory was not
    // marked processed.
    let ledger = Ledger::load(&config.ledger_path).unwrap().into_ledger();
    assert_eq!(ledger.is_processed(&tree.dir), Some(false));
    let records = ResultStore::read_all(&config.results_path).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].path.ends_with("a.txt"));
}

#[test]
fn test_vanished_file_aborts_under_abort_policy() {
    let tree = ChangingTree::new();

    let err = tree.run(ErrorPolicy::Abort, Change::Remove).unwrap_err();
    assert!(matches!(err, EngineError::Hash(HashError::NotFound(_))));
}

#[test]
fn test_vanished_file_is_ignored_under_skip_policy() {
    let tree = ChangingTree::new();
    let config = tree.config(ErrorPolicy::Skip);

    let report = tree.run(ErrorPolicy::Skip, Change::Remove).unwrap();

    assert_eq!(report.files_hashed, 1);
    assert!(report.skipped.is_empty());
    let ledger = Ledger::load(&config.ledger_path).unwrap().into_ledger();
    assert_eq!(ledger.is_processed(&tree.dir), Some(true));
}
