use hashledger::duplicates::DuplicateReport;
use hashledger::engine::{ScanConfig, ScanEngine};
use hashledger::progress::ProgressCallback;
use hashledger::scanner::{hash_to_hex, Hasher};
use hashledger::store::ResultStore;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

struct Workspace {
    state: TempDir,
    tree: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            state: tempdir().unwrap(),
            tree: tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.tree.path()
    }

    fn ledger(&self) -> PathBuf {
        self.state.path().join("processed_dirs")
    }

    fn results(&self) -> PathBuf {
        self.state.path().join("processed_files.csv")
    }

    fn config(&self) -> ScanConfig {
        ScanConfig::new(self.root(), self.ledger(), self.results())
    }

    fn write(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn results_text(&self) -> String {
        fs::read_to_string(self.results()).unwrap()
    }
}

#[derive(Default)]
struct FlushCounter {
    flushes: AtomicUsize,
}

impl ProgressCallback for FlushCounter {
    fn on_scan_start(&self, _pending_dirs: usize) {}
    fn on_files_processed(&self, _count: usize) {}
    fn on_flush(&self, _rows: usize) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_scan_end(&self, _files_processed: usize) {}
}

#[test]
fn test_scan_writes_header_and_rows() {
    let ws = Workspace::new();
    let a = ws.write("a.txt", b"hello");
    ws.write("nested/deeper/b.bin", &[0u8; 300]);

    let report = ScanEngine::new(ws.config()).run().unwrap();
    assert_eq!(report.files_hashed, 2);

    let text = ws.results_text();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("path\tsize\thash"));

    let expected = format!(
        "{}\t5\t{}",
        a.display(),
        hash_to_hex(&Hasher::new().hash_bytes(b"hello"))
    );
    assert!(text.lines().any(|l| l == expected), "missing row {expected}");
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn test_rerun_is_idempotent() {
    let ws = Workspace::new();
    ws.write("x/1", b"one");
    ws.write("y/2", b"two");

    ScanEngine::new(ws.config()).run().unwrap();
    let before = ws.results_text();

    let second = ScanEngine::new(ws.config()).run().unwrap();
    assert!(!second.fresh_run);
    assert_eq!(second.files_hashed, 0);
    assert_eq!(second.rows_written, 0);
    assert_eq!(second.directories_pending, 0);
    assert_eq!(ws.results_text(), before);
}

#[test]
fn test_twelve_thousand_files_flush_in_batches() {
    let ws = Workspace::new();
    let dir = ws.root().join("bulk");
    fs::create_dir(&dir).unwrap();
    for i in 0..12_001 {
        fs::write(dir.join(format!("f{i:05}")), i.to_string()).unwrap();
    }

    let counter = Arc::new(FlushCounter::default());
    let report = ScanEngine::new(ws.config())
        .with_progress_callback(counter.clone())
        .run()
        .unwrap();

    // Two intermediate flushes plus the final one.
    assert!(counter.flushes.load(Ordering::SeqCst) >= 3);
    assert_eq!(report.flushes, counter.flushes.load(Ordering::SeqCst));
    assert_eq!(report.files_hashed, 12_001);
    assert_eq!(report.rows_written, 12_001);

    let text = ws.results_text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 12_002);
    assert_eq!(lines[0], "path\tsize\thash");
    assert_eq!(lines.iter().filter(|l| **l == "path\tsize\thash").count(), 1);

    let unique: HashSet<&str> = lines[1..]
        .iter()
        .map(|l| l.split('\t').next().unwrap())
        .collect();
    assert_eq!(unique.len(), 12_001);
}

#[test]
fn test_resumed_run_appends_without_new_header() {
    let ws = Workspace::new();
    ws.write("first/a", b"a");
    ScanEngine::new(ws.config()).run().unwrap();

    ws.write("second/b", b"b");
    let report = ScanEngine::new(ws.config()).run().unwrap();
    assert!(!report.fresh_run);
    assert_eq!(report.files_hashed, 1);

    let text = ws.results_text();
    assert_eq!(text.matches("path\tsize\thash").count(), 1);
    assert_eq!(text.lines().count(), 3);
}

#[test]
fn test_deleting_ledger_starts_fresh_and_truncates_results() {
    let ws = Workspace::new();
    ws.write("a", b"a");
    ScanEngine::new(ws.config()).run().unwrap();
    ScanEngine::new(ws.config()).run().unwrap();

    fs::remove_file(ws.ledger()).unwrap();
    let report = ScanEngine::new(ws.config()).run().unwrap();

    assert!(report.fresh_run);
    let text = ws.results_text();
    assert_eq!(text.lines().count(), 2);
    assert_eq!(text.matches("path\tsize\thash").count(), 1);
}

#[test]
fn test_missing_results_file_is_recreated_on_resume() {
    let ws = Workspace::new();
    ws.write("a/1", b"1");
    ScanEngine::new(ws.config()).run().unwrap();
    fs::remove_file(ws.results()).unwrap();

    ws.write("b/2", b"2");
    ScanEngine::new(ws.config()).run().unwrap();

    let text = ws.results_text();
    assert!(text.starts_with("path\tsize\thash\n"));
    assert_eq!(text.lines().count(), 2);
}

#[cfg(unix)]
#[test]
fn test_symlinks_and_special_files_are_not_hashed() {
    use std::os::unix::fs::symlink;

    let ws = Workspace::new();
    let target = ws.write("real/target.txt", b"data");
    symlink(&target, ws.root().join("link.txt")).unwrap();
    symlink(ws.root().join("real"), ws.root().join("linked_dir")).unwrap();

    let report = ScanEngine::new(ws.config()).run().unwrap();

    assert_eq!(report.files_hashed, 1);
    let text = ws.results_text();
    assert!(!text.contains("link.txt"));
    assert!(!text.contains("linked_dir"));
}

#[test]
fn test_duplicates_found_across_runs_and_batches() {
    let ws = Workspace::new();
    ws.write("batch1/a", b"same content");
    ws.write("batch1/b", b"unique");
    ScanEngine::new(ws.config().with_flush_threshold(0))
        .run()
        .unwrap();

    ws.write("later/c", b"same content");
    ScanEngine::new(ws.config()).run().unwrap();

    let report = DuplicateReport::from_results_file(&ws.results(), 100).unwrap();
    assert_eq!(report.groups.len(), 1);
    let paths = &report.groups[0].paths;
    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("batch1/a"));
    assert!(paths[1].ends_with("later/c"));
    assert_eq!(report.summary.total_files, 3);
}

#[test]
fn test_chunked_hashing_matches_results_file() {
    let ws = Workspace::new();
    let content: Vec<u8> = (0..5_000u32).map(|i| (i % 251) as u8).collect();
    ws.write("big", &content);
    ws.write("copy/big", &content);

    ScanEngine::new(ws.config().with_large_file_threshold(64))
        .run()
        .unwrap();

    let records = ResultStore::read_all(&ws.results()).unwrap();
    assert_eq!(records.len(), 2);
    let expected = hash_to_hex(&Hasher::new().hash_bytes(&content));
    assert!(records.iter().all(|r| r.hash == expected && r.size == 5_000));
}
