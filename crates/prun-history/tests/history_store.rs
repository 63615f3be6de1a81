//! End-to-end behaviour of the history store over the memory driver

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use prun_history::{
    create_history_with, destroy_history, CassandraHistory, History, HistoryError, MemoryDriver,
    HISTORY_VERSION,
};
use tempfile::NamedTempFile;

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", json).unwrap();
    file
}

fn default_config() -> NamedTempFile {
    config_file(r#"{"remotes": "10.0.0.1,10.0.0.2"}"#)
}

fn collect(history: &dyn History) -> BTreeSet<(String, String)> {
    let mut rows = BTreeSet::new();
    history
        .get_all(&mut |key, value| {
            rows.insert((key.to_string(), value.to_string()));
        })
        .unwrap();
    rows
}

fn row(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

#[test]
fn test_initialize_then_shutdown_releases_everything() {
    let driver = MemoryDriver::new();
    let history = CassandraHistory::new(driver.clone());
    let config = default_config();

    history.initialize(config.path()).unwrap();
    assert!(driver.live_resources() > 0);

    history.shutdown();
    assert_eq!(driver.live_resources(), 0);
    assert!(!history.is_ready());

    // Idempotent
    history.shutdown();
    assert_eq!(driver.live_resources(), 0);
}

#[test]
fn test_example_scenario() {
    let driver = MemoryDriver::new();
    let history = create_history_with(HISTORY_VERSION, driver.clone()).unwrap();
    let config = default_config();

    history.initialize(config.path()).unwrap();
    assert_eq!(
        driver.connections(),
        vec![vec!["10.0.0.1:9042".to_string(), "10.0.0.2:9042".to_string()]]
    );

    history.put("job-1", "payload-A").unwrap();
    history.put("job-2", "payload-B").unwrap();
    assert_eq!(
        collect(history.as_ref()),
        BTreeSet::from([row("job-1", "payload-A"), row("job-2", "payload-B")])
    );

    history.delete("job-1").unwrap();
    assert_eq!(
        collect(history.as_ref()),
        BTreeSet::from([row("job-2", "payload-B")])
    );

    destroy_history(history);
    assert_eq!(driver.live_resources(), 0);
}

#[test]
fn test_put_overwrites_existing_key() {
    let history = CassandraHistory::new(MemoryDriver::new());
    let config = default_config();
    history.initialize(config.path()).unwrap();

    history.put("job-1", "first").unwrap();
    history.put("job-1", "second").unwrap();
    assert_eq!(collect(&history), BTreeSet::from([row("job-1", "second")]));
}

#[test]
fn test_operations_before_initialize_are_noops() {
    let driver = MemoryDriver::new();
    let history = CassandraHistory::new(driver.clone());

    history.put("job-1", "payload").unwrap();
    history.delete("job-1").unwrap();

    let mut calls = 0;
    history.get_all(&mut |_, _| calls += 1).unwrap();
    assert_eq!(calls, 0);
    assert!(driver.records().is_empty());
    assert_eq!(driver.live_resources(), 0);
}

#[test]
fn test_operations_after_shutdown_are_noops() {
    let driver = MemoryDriver::new();
    let history = CassandraHistory::new(driver.clone());
    let config = default_config();
    history.initialize(config.path()).unwrap();
    history.put("job-1", "payload").unwrap();
    history.shutdown();

    history.put("job-2", "payload").unwrap();
    history.delete("job-1").unwrap();
    let mut calls = 0;
    history.get_all(&mut |_, _| calls += 1).unwrap();

    assert_eq!(calls, 0);
    assert_eq!(driver.records().len(), 1);
    assert_eq!(driver.records()[0].job_id, "job-1");
}

#[test]
fn test_records_survive_reinitialize() {
    let driver = MemoryDriver::new();
    let history = CassandraHistory::new(driver.clone());
    let config = default_config();

    history.initialize(config.path()).unwrap();
    history.put("job-1", "payload").unwrap();
    history.shutdown();

    history.initialize(config.path()).unwrap();
    assert_eq!(collect(&history), BTreeSet::from([row("job-1", "payload")]));
    assert_eq!(driver.live_sessions(), 1);
}

#[test]
fn test_unreadable_config_path() {
    let driver = MemoryDriver::new();
    let history = CassandraHistory::new(driver.clone());
    let dir = tempfile::tempdir().unwrap();

    let err = history.initialize(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, HistoryError::Config(_)));
    assert!(!history.is_ready());
    assert_eq!(driver.live_resources(), 0);
}

#[test]
fn test_malformed_config() {
    let history = CassandraHistory::new(MemoryDriver::new());

    let not_json = config_file("remotes = 10.0.0.1");
    assert!(matches!(
        history.initialize(not_json.path()),
        Err(HistoryError::Config(_))
    ));

    let no_remotes = config_file(r#"{"port": 9042}"#);
    assert!(matches!(
        history.initialize(no_remotes.path()),
        Err(HistoryError::Config(_))
    ));

    let empty_remotes = config_file(r#"{"remotes": " , "}"#);
    assert!(matches!(
        history.initialize(empty_remotes.path()),
        Err(HistoryError::Config(_))
    ));
    assert!(!history.is_ready());
}

#[test]
fn test_connection_failure() {
    let driver = MemoryDriver::new();
    driver.fail_connect("No hosts available for the control connection");
    let history = CassandraHistory::new(driver.clone());
    let config = default_config();

    let err = history.initialize(config.path()).unwrap_err();
    assert_eq!(
        err,
        HistoryError::Connection("No hosts available for the control connection".to_string())
    );
    assert!(!history.is_ready());
    assert_eq!(driver.live_resources(), 0);
}

#[test]
fn test_preparation_failure() {
    let driver = MemoryDriver::new();
    driver.fail_prepare("unconfigured table jobs");
    let history = CassandraHistory::new(driver.clone());
    let config = default_config();

    let err = history.initialize(config.path()).unwrap_err();
    assert_eq!(err, HistoryError::Preparation("unconfigured table jobs".to_string()));
    assert!(!history.is_ready());
    assert_eq!(driver.live_resources(), 0);

    // Nothing half-initialized is reachable
    history.put("job-1", "payload").unwrap();
    assert!(driver.records().is_empty());
}

#[test]
fn test_write_failure_keeps_connection() {
    let driver = MemoryDriver::new();
    let history = CassandraHistory::new(driver.clone());
    let config = default_config();
    history.initialize(config.path()).unwrap();

    driver.fail_execute("Operation timed out");
    assert_eq!(
        history.put("job-1", "payload"),
        Err(HistoryError::Write("Operation timed out".to_string()))
    );
    assert_eq!(
        history.delete("job-1"),
        Err(HistoryError::Delete("Operation timed out".to_string()))
    );
    assert!(history.is_ready());

    driver.reset_behaviour();
    history.put("job-1", "payload").unwrap();
    assert_eq!(collect(&history), BTreeSet::from([row("job-1", "payload")]));
}

#[test]
fn test_read_failure() {
    let driver = MemoryDriver::new();
    let history = CassandraHistory::new(driver.clone());
    let config = default_config();
    history.initialize(config.path()).unwrap();
    history.put("job-1", "payload").unwrap();

    driver.fail_query("Cannot achieve consistency level ONE");
    let mut calls = 0;
    let err = history.get_all(&mut |_, _| calls += 1).unwrap_err();
    assert_eq!(
        err,
        HistoryError::Read("Cannot achieve consistency level ONE".to_string())
    );
    assert_eq!(calls, 0);
    assert!(history.is_ready());
}

#[test]
fn test_shutdown_during_inflight_put() {
    let driver = MemoryDriver::new();
    let history = Arc::new(CassandraHistory::new(driver.clone()));
    let config = default_config();
    history.initialize(config.path()).unwrap();

    driver.set_latency(Duration::from_millis(300));
    let writer = {
        let history = Arc::clone(&history);
        thread::spawn(move || history.put("job-1", "payload"))
    };

    thread::sleep(Duration::from_millis(100));
    history.shutdown();
    assert!(!history.is_ready());

    assert_eq!(writer.join().unwrap(), Ok(()));
    assert_eq!(driver.records().len(), 1);
    assert_eq!(driver.live_resources(), 0);
}

#[test]
fn test_concurrent_writers_and_shutdown() {
    let driver = MemoryDriver::new();
    let history = Arc::new(CassandraHistory::new(driver.clone()));
    let config = default_config();
    history.initialize(config.path()).unwrap();
    driver.set_latency(Duration::from_millis(1));

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let history = Arc::clone(&history);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("job-{}-{}", w, i);
                    history.put(&key, "payload").unwrap();
                    if i % 3 == 0 {
                        history.delete(&key).unwrap();
                    }
                }
                history.get_all(&mut |_, _| {}).unwrap();
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    history.shutdown();

    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(driver.live_resources(), 0);
}
