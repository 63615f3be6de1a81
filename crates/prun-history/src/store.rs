//! Cluster-backed history store
//!
//! [`CassandraHistory`] publishes the current connection together with its
//! config behind one `RwLock`. Every operation clones the connection `Arc`
//! and releases the lock before touching the network, so a concurrent
//! `shutdown` only drops the store's reference; the connection itself goes
//! away once the last in-flight operation finishes with it.

use futures::StreamExt;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

use crate::driver::{ClusterDriver, ClusterSession, RowStream};
use crate::{DbConnection, History, HistoryConfig, HistoryError, JobRecord, Result};

const INSERT_JOB: &str = "INSERT INTO prun.jobs (job_id, job_descr) VALUES (?, ?);";
const DELETE_JOB: &str = "DELETE FROM prun.jobs WHERE job_id = ?;";
const SELECT_JOBS: &str = "SELECT job_id, job_descr FROM prun.jobs;";

/// Connection and the config it was opened from; present only when ready
struct Published<D: ClusterDriver> {
    db: Arc<DbConnection<D>>,
    config: HistoryConfig,
}

/// History store over any [`ClusterDriver`]
pub struct CassandraHistory<D: ClusterDriver> {
    driver: D,
    state: RwLock<Option<Published<D>>>,
}

impl<D: ClusterDriver> CassandraHistory<D> {
    /// Create an uninitialized store
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            state: RwLock::new(None),
        }
    }

    /// Whether a connection is currently published.
    ///
    /// Operations on a store that is not ready are skipped without error.
    pub fn is_ready(&self) -> bool {
        self.state.read().is_some()
    }

    /// Config loaded by the last successful `initialize`
    pub fn config(&self) -> Option<HistoryConfig> {
        self.state.read().as_ref().map(|state| state.config.clone())
    }

    /// Initialize from an already loaded config.
    ///
    /// Any current connection is released first, so a failure leaves the
    /// store not ready.
    pub fn initialize_with(&self, config: HistoryConfig) -> Result<()> {
        self.reconnect(Ok(config))
    }

    /// Lazy cursor over every stored record, or `None` when not ready
    pub fn records(&self) -> Result<Option<JobRows<D>>> {
        let Some(db) = self.connection() else {
            tracing::debug!("History get_all skipped: not connected");
            return Ok(None);
        };
        let Some(session) = db.session() else {
            return Ok(None);
        };

        let rows = db.block_on(session.query_rows(SELECT_JOBS)).map_err(|e| {
            tracing::warn!("History read failed: {}", e);
            HistoryError::Read(e.to_string())
        })?;
        Ok(Some(JobRows::new(db, rows)))
    }

    fn connection(&self) -> Option<Arc<DbConnection<D>>> {
        self.state.read().as_ref().map(|state| Arc::clone(&state.db))
    }

    /// Unpublish the current state; the connection is dropped outside the lock
    fn release(&self) -> bool {
        let released = self.state.write().take();
        released.is_some()
    }

    fn reconnect(&self, config: Result<HistoryConfig>) -> Result<()> {
        self.release();

        let config = config?;
        let contact_points = config.contact_points()?;
        let db = Arc::new(self.open(&config, &contact_points)?);

        let replaced = self.state.write().replace(Published { db, config });
        drop(replaced);
        tracing::info!("History store connected to {}", contact_points.join(","));
        Ok(())
    }

    fn open(&self, config: &HistoryConfig, contact_points: &[String]) -> Result<DbConnection<D>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads())
            .thread_name("prun-history-io")
            .enable_all()
            .build()
            .map_err(|e| {
                HistoryError::Connection(format!("couldn't start driver runtime: {}", e))
            })?;

        let mut db = DbConnection::new(runtime);
        db.set_cluster(self.driver.new_cluster(contact_points));

        db.connect(&self.driver).map_err(|e| {
            tracing::warn!("History connect failed: {}", e);
            HistoryError::Connection(e.to_string())
        })?;

        let insert = db.prepare(INSERT_JOB).map_err(preparation_error)?;
        db.set_prepared_insert(insert);

        let delete = db.prepare(DELETE_JOB).map_err(preparation_error)?;
        db.set_prepared_delete(delete);

        Ok(db)
    }
}

fn preparation_error(e: crate::DriverError) -> HistoryError {
    tracing::warn!("History statement preparation failed: {}", e);
    HistoryError::Preparation(e.to_string())
}

impl<D: ClusterDriver> History for CassandraHistory<D> {
    /// Releases the current connection before reading the config, so an
    /// unreadable config also leaves the store not ready.
    fn initialize(&self, config_path: &Path) -> Result<()> {
        self.reconnect(HistoryConfig::from_file(config_path))
    }

    fn shutdown(&self) {
        if self.release() {
            tracing::info!("History store shut down");
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let Some(db) = self.connection() else {
            tracing::debug!("History put skipped: not connected");
            return Ok(());
        };
        let (Some(session), Some(insert)) = (db.session(), db.prepared_insert()) else {
            return Ok(());
        };

        db.block_on(session.execute(insert, &[key, value]))
            .map_err(|e| {
                tracing::warn!("History put of {} failed: {}", key, e);
                HistoryError::Write(e.to_string())
            })
    }

    fn delete(&self, key: &str) -> Result<()> {
        let Some(db) = self.connection() else {
            tracing::debug!("History delete skipped: not connected");
            return Ok(());
        };
        let (Some(session), Some(delete)) = (db.session(), db.prepared_delete()) else {
            return Ok(());
        };

        db.block_on(session.execute(delete, &[key]))
            .map_err(|e| {
                tracing::warn!("History delete of {} failed: {}", key, e);
                HistoryError::Delete(e.to_string())
            })
    }

    fn get_all(&self, callback: &mut dyn FnMut(&str, &str)) -> Result<()> {
        let Some(rows) = self.records()? else {
            return Ok(());
        };
        for record in rows {
            let record = record?;
            callback(&record.job_id, &record.job_descr);
        }
        Ok(())
    }
}

/// Single-pass cursor over stored job records.
///
/// Holds its own reference to the connection, so it stays valid across a
/// concurrent `shutdown`. Each `next` may block while the driver fetches the
/// following page.
pub struct JobRows<D: ClusterDriver> {
    db: Arc<DbConnection<D>>,
    rows: RowStream,
    finished: bool,
}

impl<D: ClusterDriver> JobRows<D> {
    fn new(db: Arc<DbConnection<D>>, rows: RowStream) -> Self {
        Self {
            db,
            rows,
            finished: false,
        }
    }
}

impl<D: ClusterDriver> Iterator for JobRows<D> {
    type Item = Result<JobRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.db.block_on(self.rows.next()) {
            Some(Ok(record)) => Some(Ok(record)),
            Some(Err(e)) => {
                self.finished = true;
                tracing::warn!("History read failed mid-scan: {}", e);
                Some(Err(HistoryError::Read(e.to_string())))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl<D: ClusterDriver> std::iter::FusedIterator for JobRows<D> {}
