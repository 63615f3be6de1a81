//! Cluster driver seam
//!
//! The store needs very little from a cluster client library: an unconnected
//! cluster descriptor, a connected session, prepared statements, bind+execute,
//! and a row cursor over an unparameterized query. Drivers expose those as
//! futures; [`crate::DbConnection`] turns them into blocking calls.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{DriverError, JobRecord};

/// Single-pass cursor over `(job_id, job_descr)` rows
pub type RowStream = BoxStream<'static, std::result::Result<JobRecord, DriverError>>;

/// Prepared statement type of a driver's session
pub type Prepared<D> = <<D as ClusterDriver>::Session as ClusterSession>::Prepared;

/// Entry point of a cluster client library
#[async_trait]
pub trait ClusterDriver: Send + Sync + 'static {
    /// Unconnected cluster descriptor (contact points and client settings)
    type Cluster: Send + Sync + 'static;

    /// Live session bound to a cluster
    type Session: ClusterSession;

    /// Describe a cluster reachable through `contact_points` (`host:port`)
    fn new_cluster(&self, contact_points: &[String]) -> Self::Cluster;

    /// Open a session against `cluster`
    async fn connect(
        &self,
        cluster: &Self::Cluster,
    ) -> std::result::Result<Self::Session, DriverError>;
}

/// Statement execution over a connected session
#[async_trait]
pub trait ClusterSession: Send + Sync + 'static {
    /// Reusable statement template; every execution binds its own values
    type Prepared: Send + Sync + 'static;

    async fn prepare(&self, statement: &str) -> std::result::Result<Self::Prepared, DriverError>;

    /// Bind `params` positionally as text values and execute
    async fn execute(
        &self,
        prepared: &Self::Prepared,
        params: &[&str],
    ) -> std::result::Result<(), DriverError>;

    /// Run an unparameterized query returning two text columns
    async fn query_rows(&self, statement: &str) -> std::result::Result<RowStream, DriverError>;
}
