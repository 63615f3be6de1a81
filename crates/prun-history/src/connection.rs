//! Cluster session manager
//!
//! [`DbConnection`] owns every native resource of one connection lifetime:
//! the cluster descriptor, the session, the insert and delete statements, and
//! the runtime the driver futures run on. Each resource is released exactly
//! once, when the last `Arc<DbConnection>` holder drops it.

use std::future::Future;
use tokio::runtime::Runtime;

use crate::driver::{ClusterDriver, ClusterSession, Prepared};
use crate::DriverError;

/// Connection state shared between concurrent history operations
pub struct DbConnection<D: ClusterDriver> {
    cluster: Option<D::Cluster>,
    session: Option<D::Session>,
    prepared_insert: Option<Prepared<D>>,
    prepared_delete: Option<Prepared<D>>,
    /// Declared last so it outlives every resource above
    runtime: Runtime,
}

impl<D: ClusterDriver> DbConnection<D> {
    /// Create an empty connection driven by `runtime`
    pub fn new(runtime: Runtime) -> Self {
        Self {
            cluster: None,
            session: None,
            prepared_insert: None,
            prepared_delete: None,
            runtime,
        }
    }

    pub fn set_cluster(&mut self, cluster: D::Cluster) {
        self.cluster = Some(cluster);
    }

    pub fn set_session(&mut self, session: D::Session) {
        self.session = Some(session);
    }

    pub fn set_prepared_insert(&mut self, prepared: Prepared<D>) {
        self.prepared_insert = Some(prepared);
    }

    pub fn set_prepared_delete(&mut self, prepared: Prepared<D>) {
        self.prepared_delete = Some(prepared);
    }

    pub fn cluster(&self) -> Option<&D::Cluster> {
        self.cluster.as_ref()
    }

    pub fn session(&self) -> Option<&D::Session> {
        self.session.as_ref()
    }

    pub fn prepared_insert(&self) -> Option<&Prepared<D>> {
        self.prepared_insert.as_ref()
    }

    pub fn prepared_delete(&self) -> Option<&Prepared<D>> {
        self.prepared_delete.as_ref()
    }

    /// Session and both statements are in place
    pub fn is_ready(&self) -> bool {
        self.session.is_some() && self.prepared_insert.is_some() && self.prepared_delete.is_some()
    }

    /// Block the calling thread until `future` resolves.
    ///
    /// Must not be called from inside an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Connect a session to the stored cluster descriptor
    pub fn connect(&mut self, driver: &D) -> Result<(), DriverError> {
        let cluster = self
            .cluster
            .as_ref()
            .ok_or_else(|| DriverError::new("cluster descriptor not set"))?;
        let session = self.runtime.block_on(driver.connect(cluster))?;
        self.session = Some(session);
        Ok(())
    }

    /// Prepare `statement` on the connected session
    pub fn prepare(&self, statement: &str) -> Result<Prepared<D>, DriverError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| DriverError::new("session is not connected"))?;
        self.runtime.block_on(session.prepare(statement))
    }
}

impl<D: ClusterDriver> Drop for DbConnection<D> {
    fn drop(&mut self) {
        // Driver resources may own background tasks; release them in context.
        let _guard = self.runtime.enter();

        if let Some(session) = self.session.take() {
            drop(session);
            tracing::debug!("History session released");
        }
        if let Some(cluster) = self.cluster.take() {
            drop(cluster);
            tracing::debug!("History cluster descriptor released");
        }
        if let Some(prepared) = self.prepared_insert.take() {
            drop(prepared);
            tracing::debug!("History insert statement released");
        }
        if let Some(prepared) = self.prepared_delete.take() {
            drop(prepared);
            tracing::debug!("History delete statement released");
        }
    }
}
