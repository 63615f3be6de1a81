//! prun History - Cluster-backed job history store
//!
//! This crate persists job records of the prun job manager in a replicated
//! CQL cluster (Cassandra / ScyllaDB). The job manager talks to it through the
//! [`History`] trait and obtains instances from the versioned plugin factory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Job manager (host)                      │
//! └──────────────┬──────────────────────────────────────────┘
//!                │ create_history(HISTORY_VERSION)
//!     ┌──────────▼──────────┐
//!     │  CassandraHistory   │  initialize / put / delete / get_all
//!     └──────────┬──────────┘
//!                │ Arc<DbConnection> snapshot per call
//!     ┌──────────▼──────────┐
//!     │    DbConnection     │  cluster + session + prepared statements
//!     └──────────┬──────────┘
//!                │ block_on(driver future)
//!     ┌──────────▼──────────┐
//!     │   ClusterDriver     │  ScyllaDriver | MemoryDriver
//!     └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use prun_history::{create_history, destroy_history, HISTORY_VERSION};
//! use std::path::Path;
//!
//! # fn example() -> prun_history::Result<()> {
//! let history = create_history(HISTORY_VERSION).expect("interface version mismatch");
//! history.initialize(Path::new("history.json"))?;
//! history.put("job-1", "{\"exe\":\"sleep\"}")?;
//! history.get_all(&mut |job_id, job_descr| println!("{job_id}: {job_descr}"))?;
//! destroy_history(history);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod ffi;
pub mod history;
#[cfg(any(test, feature = "memory-driver"))]
pub mod memory;
pub mod plugin;
pub mod record;
pub mod scylla_driver;
pub mod store;

pub use config::HistoryConfig;
pub use connection::DbConnection;
pub use driver::{ClusterDriver, ClusterSession, RowStream};
pub use error::{DriverError, HistoryError, Result};
pub use history::{History, HISTORY_VERSION};
#[cfg(any(test, feature = "memory-driver"))]
pub use memory::MemoryDriver;
pub use plugin::{create_history, create_history_with, destroy_history};
pub use record::JobRecord;
pub use scylla_driver::ScyllaDriver;
pub use store::{CassandraHistory, JobRows};
