//! Logging setup tests.

use vercetti::logging::{LoggingGuard, LOG_FILE_PREFIX};

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    // Only test in this binary that installs the global subscriber.
    let guard = vercetti::logging::init_production(&logs_dir).expect("logging init");
    tracing::info!("logging smoke test");
    drop(guard);

    assert!(logs_dir.exists(), "logs directory should be created");
    let has_log_file = std::fs::read_dir(&logs_dir)
        .expect("read logs dir")
        .filter_map(Result::ok)
        .any(|entry| entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX));
    assert!(has_log_file, "a rotated log file should exist");
}
