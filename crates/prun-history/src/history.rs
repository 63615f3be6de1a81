//! Host-facing history interface

use std::path::Path;

use crate::Result;

/// Interface version this crate was built against.
///
/// The plugin factory refuses to hand out stores to hosts asking for any
/// other version.
pub const HISTORY_VERSION: u32 = 1;

/// Capability set the job manager depends on.
///
/// All methods block the calling thread until the cluster answers. They may
/// be called concurrently from several threads. `put`, `delete` and `get_all`
/// are silent no-ops while the store is not initialized.
pub trait History: Send + Sync {
    /// Load the config at `config_path`, connect and prepare statements
    fn initialize(&self, config_path: &Path) -> Result<()>;

    /// Release the connection and forget the config. Idempotent.
    fn shutdown(&self);

    /// Insert or overwrite the record for `key`
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the record for `key`
    fn delete(&self, key: &str) -> Result<()>;

    /// Invoke `callback(job_id, job_descr)` for every stored record, in
    /// cursor order, on the calling thread
    fn get_all(&self, callback: &mut dyn FnMut(&str, &str)) -> Result<()>;
}
