//! Stored job records

use serde::{Deserialize, Serialize};

/// One row of the `prun.jobs` table.
///
/// `job_descr` is an opaque payload; the store never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub job_descr: String,
}

impl JobRecord {
    pub fn new(job_id: impl Into<String>, job_descr: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            job_descr: job_descr.into(),
        }
    }
}
