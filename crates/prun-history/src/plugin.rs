//! Versioned plugin factory
//!
//! Hosts probe compatibility by asking for the interface version they were
//! built against; a mismatch yields `None` rather than an error.

use crate::driver::ClusterDriver;
use crate::{CassandraHistory, History, ScyllaDriver, HISTORY_VERSION};

/// Create an uninitialized ScyllaDB-backed store
pub fn create_history(interface_version: u32) -> Option<Box<dyn History>> {
    create_history_with(interface_version, ScyllaDriver)
}

/// Create an uninitialized store over `driver`
pub fn create_history_with<D: ClusterDriver>(
    interface_version: u32,
    driver: D,
) -> Option<Box<dyn History>> {
    if interface_version != HISTORY_VERSION {
        tracing::debug!(
            "History interface version {} requested, {} provided",
            interface_version,
            HISTORY_VERSION
        );
        return None;
    }
    Some(Box::new(CassandraHistory::new(driver)))
}

/// Release a store obtained from [`create_history`]
pub fn destroy_history(history: Box<dyn History>) {
    history.shutdown();
    drop(history);
}
