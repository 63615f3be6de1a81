//! ScyllaDB / Cassandra driver
//!
//! Production [`ClusterDriver`] speaking the CQL native protocol through the
//! `scylla` crate.

use async_trait::async_trait;
use futures::StreamExt;
use scylla::prepared_statement::PreparedStatement;
use scylla::transport::errors::{NewSessionError, QueryError};
use scylla::{Session, SessionBuilder};

use crate::driver::{ClusterDriver, ClusterSession, RowStream};
use crate::{DriverError, JobRecord};

impl From<QueryError> for DriverError {
    fn from(e: QueryError) -> Self {
        DriverError::new(e.to_string())
    }
}

impl From<NewSessionError> for DriverError {
    fn from(e: NewSessionError) -> Self {
        DriverError::new(e.to_string())
    }
}

/// Cluster driver backed by `scylla::Session`
#[derive(Debug, Clone, Copy, Default)]
pub struct ScyllaDriver;

/// Contact points a session will be built from
#[derive(Debug, Clone)]
pub struct ScyllaCluster {
    known_nodes: Vec<String>,
}

impl ScyllaCluster {
    pub fn known_nodes(&self) -> &[String] {
        &self.known_nodes
    }
}

/// Connected CQL session
pub struct ScyllaSession {
    session: Session,
}

#[async_trait]
impl ClusterDriver for ScyllaDriver {
    type Cluster = ScyllaCluster;
    type Session = ScyllaSession;

    fn new_cluster(&self, contact_points: &[String]) -> ScyllaCluster {
        ScyllaCluster {
            known_nodes: contact_points.to_vec(),
        }
    }

    async fn connect(&self, cluster: &ScyllaCluster) -> Result<ScyllaSession, DriverError> {
        let session = SessionBuilder::new()
            .known_nodes(&cluster.known_nodes)
            .build()
            .await?;
        tracing::debug!("Connected to cluster via {:?}", cluster.known_nodes);
        Ok(ScyllaSession { session })
    }
}

#[async_trait]
impl ClusterSession for ScyllaSession {
    type Prepared = PreparedStatement;

    async fn prepare(&self, statement: &str) -> Result<PreparedStatement, DriverError> {
        Ok(self.session.prepare(statement).await?)
    }

    async fn execute(
        &self,
        prepared: &PreparedStatement,
        params: &[&str],
    ) -> Result<(), DriverError> {
        self.session.execute(prepared, params.to_vec()).await?;
        Ok(())
    }

    async fn query_rows(&self, statement: &str) -> Result<RowStream, DriverError> {
        let rows = self.session.query_iter(statement, ()).await?;
        let rows = rows.into_typed::<(String, String)>().map(|row| {
            row.map(|(job_id, job_descr)| JobRecord { job_id, job_descr })
                .map_err(|e| DriverError::new(e.to_string()))
        });
        Ok(rows.boxed())
    }
}
