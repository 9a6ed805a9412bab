/// Unit tests for the logging system
///
/// These tests swap the global logger, so they run serially.

use crate::log::{set_logger, reset_logger, LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};

/// Test logger that captures entries into a shared vector
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn install_capture_logger() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    set_logger(CaptureLogger {
        entries: entries.clone(),
    });
    entries
}

#[test]
#[serial]
fn test_info_macro_dispatches_to_logger() {
    let entries = install_capture_logger();

    crate::engine_info!("pulsar::test", "hello {}", 42);

    {
        let entries = entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, LogSeverity::Info);
        assert_eq!(entries[0].source, "pulsar::test");
        assert_eq!(entries[0].message, "hello 42");
        assert!(entries[0].file.is_none());
        assert!(entries[0].line.is_none());
    }

    reset_logger();
}

#[test]
#[serial]
fn test_error_macro_includes_file_and_line() {
    let entries = install_capture_logger();

    crate::engine_error!("pulsar::test", "bad thing");

    {
        let entries = entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, LogSeverity::Error);
        assert!(entries[0].file.is_some());
        assert!(entries[0].line.is_some());
    }

    reset_logger();
}

#[test]
#[serial]
fn test_engine_err_produces_backend_error() {
    let entries = install_capture_logger();

    let status = crate::engine_err!("pulsar::test", "submit failed: {}", 7);
    assert_eq!(
        status,
        crate::error::Status::BackendError("submit failed: 7".to_string())
    );
    assert_eq!(entries.lock().unwrap().len(), 1);

    reset_logger();
}

#[test]
#[serial]
fn test_engine_bail_early_returns() {
    let entries = install_capture_logger();

    fn failing() -> crate::error::Result<()> {
        crate::engine_bail!("pulsar::test", "bailing out");
    }

    let result = failing();
    assert!(result.is_err());
    assert_eq!(entries.lock().unwrap().len(), 1);

    reset_logger();
}

#[test]
#[serial]
fn test_engine_fatal_panics_after_logging() {
    let entries = install_capture_logger();

    let result = std::panic::catch_unwind(|| {
        crate::engine_fatal!("pulsar::test", "invariant violated");
    });
    assert!(result.is_err());
    assert_eq!(entries.lock().unwrap().len(), 1);

    reset_logger();
}

#[test]
#[serial]
fn test_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}
