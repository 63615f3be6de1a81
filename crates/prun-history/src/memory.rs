//! In-process cluster driver
//!
//! Keeps the jobs table in a shared map and counts every live cluster
//! descriptor, session and prepared statement, so tests can check that a
//! connection lifetime releases all of its resources. Failures and latency
//! can be injected per operation kind.
//!
//! The driver is cheap to clone; clones share the table, the counters and
//! the injected behaviour.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::driver::{ClusterDriver, ClusterSession, RowStream};
use crate::{DriverError, JobRecord};

/// Live resource counter that decrements when dropped
#[derive(Debug)]
struct Tracked(Arc<AtomicUsize>);

impl Tracked {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct LiveResources {
    clusters: Arc<AtomicUsize>,
    sessions: Arc<AtomicUsize>,
    prepared: Arc<AtomicUsize>,
}

/// Injected failures and delays
#[derive(Debug, Clone, Default)]
struct Behaviour {
    connect_error: Option<String>,
    prepare_error: Option<String>,
    execute_error: Option<String>,
    query_error: Option<String>,
    row_error: Option<(usize, String)>,
    latency: Option<Duration>,
}

/// Statement recognised by the memory session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Delete,
}

/// Cluster descriptor of the memory driver
#[derive(Debug)]
pub struct MemoryCluster {
    contact_points: Vec<String>,
    _live: Tracked,
}

impl MemoryCluster {
    pub fn contact_points(&self) -> &[String] {
        &self.contact_points
    }
}

/// Prepared statement of the memory driver
#[derive(Debug)]
pub struct MemoryPrepared {
    kind: StatementKind,
    _live: Tracked,
}

impl MemoryPrepared {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }
}

/// Session of the memory driver
pub struct MemorySession {
    table: Arc<RwLock<BTreeMap<String, String>>>,
    behaviour: Arc<Mutex<Behaviour>>,
    prepared_counter: Arc<AtomicUsize>,
    _live: Tracked,
}

/// In-memory [`ClusterDriver`]
#[derive(Clone, Default)]
pub struct MemoryDriver {
    table: Arc<RwLock<BTreeMap<String, String>>>,
    live: Arc<LiveResources>,
    behaviour: Arc<Mutex<Behaviour>>,
    connections: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following connect fail with `message`
    pub fn fail_connect(&self, message: impl Into<String>) {
        self.behaviour.lock().connect_error = Some(message.into());
    }

    /// Make every following prepare fail with `message`
    pub fn fail_prepare(&self, message: impl Into<String>) {
        self.behaviour.lock().prepare_error = Some(message.into());
    }

    /// Make every following execute fail with `message`
    pub fn fail_execute(&self, message: impl Into<String>) {
        self.behaviour.lock().execute_error = Some(message.into());
    }

    /// Make every following query fail with `message`
    pub fn fail_query(&self, message: impl Into<String>) {
        self.behaviour.lock().query_error = Some(message.into());
    }

    /// Let following queries yield `rows` rows, then fail with `message`
    pub fn fail_rows_after(&self, rows: usize, message: impl Into<String>) {
        self.behaviour.lock().row_error = Some((rows, message.into()));
    }

    /// Delay every execute by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.behaviour.lock().latency = Some(latency);
    }

    /// Drop all injected failures and delays
    pub fn reset_behaviour(&self) {
        *self.behaviour.lock() = Behaviour::default();
    }

    pub fn live_clusters(&self) -> usize {
        self.live.clusters.load(Ordering::SeqCst)
    }

    pub fn live_sessions(&self) -> usize {
        self.live.sessions.load(Ordering::SeqCst)
    }

    pub fn live_prepared(&self) -> usize {
        self.live.prepared.load(Ordering::SeqCst)
    }

    /// Sum of all live resources
    pub fn live_resources(&self) -> usize {
        self.live_clusters() + self.live_sessions() + self.live_prepared()
    }

    /// Contact points of every successful connect, oldest first
    pub fn connections(&self) -> Vec<Vec<String>> {
        self.connections.lock().clone()
    }

    /// Current table contents ordered by job id
    pub fn records(&self) -> Vec<JobRecord> {
        self.table
            .read()
            .iter()
            .map(|(job_id, job_descr)| JobRecord::new(job_id.clone(), job_descr.clone()))
            .collect()
    }
}

fn statement_kind(statement: &str) -> Option<StatementKind> {
    let verb = statement.split_whitespace().next()?.to_ascii_uppercase();
    match verb.as_str() {
        "INSERT" => Some(StatementKind::Insert),
        "DELETE" => Some(StatementKind::Delete),
        _ => None,
    }
}

#[async_trait]
impl ClusterDriver for MemoryDriver {
    type Cluster = MemoryCluster;
    type Session = MemorySession;

    fn new_cluster(&self, contact_points: &[String]) -> MemoryCluster {
        MemoryCluster {
            contact_points: contact_points.to_vec(),
            _live: Tracked::acquire(&self.live.clusters),
        }
    }

    async fn connect(&self, cluster: &MemoryCluster) -> Result<MemorySession, DriverError> {
        let error = self.behaviour.lock().connect_error.clone();
        if let Some(message) = error {
            return Err(DriverError::new(message));
        }
        self.connections.lock().push(cluster.contact_points.clone());

        Ok(MemorySession {
            table: Arc::clone(&self.table),
            behaviour: Arc::clone(&self.behaviour),
            prepared_counter: Arc::clone(&self.live.prepared),
            _live: Tracked::acquire(&self.live.sessions),
        })
    }
}

#[async_trait]
impl ClusterSession for MemorySession {
    type Prepared = MemoryPrepared;

    async fn prepare(&self, statement: &str) -> Result<MemoryPrepared, DriverError> {
        let error = self.behaviour.lock().prepare_error.clone();
        if let Some(message) = error {
            return Err(DriverError::new(message));
        }
        let kind = statement_kind(statement)
            .ok_or_else(|| DriverError::new(format!("unsupported statement: {}", statement)))?;

        Ok(MemoryPrepared {
            kind,
            _live: Tracked::acquire(&self.prepared_counter),
        })
    }

    async fn execute(&self, prepared: &MemoryPrepared, params: &[&str]) -> Result<(), DriverError> {
        let (error, latency) = {
            let behaviour = self.behaviour.lock();
            (behaviour.execute_error.clone(), behaviour.latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = error {
            return Err(DriverError::new(message));
        }

        match (prepared.kind, params) {
            (StatementKind::Insert, [job_id, job_descr]) => {
                self.table
                    .write()
                    .insert(job_id.to_string(), job_descr.to_string());
                Ok(())
            }
            (StatementKind::Delete, [job_id]) => {
                self.table.write().remove(*job_id);
                Ok(())
            }
            (kind, _) => Err(DriverError::new(format!(
                "{:?} statement bound with {} values",
                kind,
                params.len()
            ))),
        }
    }

    async fn query_rows(&self, statement: &str) -> Result<RowStream, DriverError> {
        let (error, row_error) = {
            let behaviour = self.behaviour.lock();
            (behaviour.query_error.clone(), behaviour.row_error.clone())
        };
        if let Some(message) = error {
            return Err(DriverError::new(message));
        }
        if !statement.trim_start().to_ascii_uppercase().starts_with("SELECT") {
            return Err(DriverError::new(format!("not a query: {}", statement)));
        }

        let mut rows: Vec<Result<JobRecord, DriverError>> = self
            .table
            .read()
            .iter()
            .map(|(job_id, job_descr)| Ok(JobRecord::new(job_id.clone(), job_descr.clone())))
            .collect();
        if let Some((after, message)) = row_error {
            rows.truncate(after);
            rows.push(Err(DriverError::new(message)));
        }
        Ok(futures::stream::iter(rows).boxed())
    }
}
