//! History store configuration
//!
//! Loaded from a JSON file handed over by the host at `initialize`. Only
//! `remotes` is required; unknown fields are ignored because the host shares
//! one config file between several components.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use crate::{HistoryError, Result};

/// Default CQL native protocol port
pub const DEFAULT_PORT: u16 = 9042;

/// Default number of driver I/O threads
pub const DEFAULT_IO_THREADS: usize = 2;

/// Main history configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Comma or whitespace separated cluster contact points
    pub remotes: String,

    /// Port used for contact points that do not name one
    #[serde(default = "default_port")]
    pub port: u16,

    /// Worker threads of the driver runtime
    #[serde(default = "default_io_threads")]
    pub io_threads: usize,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_io_threads() -> usize {
    DEFAULT_IO_THREADS
}

impl HistoryConfig {
    /// Create a configuration for the given contact points
    pub fn new(remotes: impl Into<String>) -> Self {
        Self {
            remotes: remotes.into(),
            port: DEFAULT_PORT,
            io_threads: DEFAULT_IO_THREADS,
        }
    }

    /// Set the default port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the driver thread count
    pub fn with_io_threads(mut self, io_threads: usize) -> Self {
        self.io_threads = io_threads;
        self
    }

    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HistoryError::Config(format!("couldn't open {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            HistoryError::Config(format!("couldn't parse {}: {}", path.display(), e))
        })
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| HistoryError::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| {
            HistoryError::Config(format!("couldn't write {}: {}", path.display(), e))
        })
    }

    /// Resolve `remotes` into `host:port` contact points.
    ///
    /// Fails when the list holds no address at all.
    pub fn contact_points(&self) -> Result<Vec<String>> {
        let points: Vec<String> = self
            .remotes
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|entry| !entry.is_empty())
            .map(|entry| with_default_port(entry, self.port))
            .collect();

        if points.is_empty() {
            return Err(HistoryError::Config(
                "remotes: no cluster contact points given".to_string(),
            ));
        }
        Ok(points)
    }

    /// Runtime worker count, never zero
    pub fn worker_threads(&self) -> usize {
        self.io_threads.max(1)
    }
}

fn with_default_port(entry: &str, port: u16) -> String {
    if entry.parse::<SocketAddr>().is_ok() {
        return entry.to_string();
    }
    if let Ok(ip) = entry.parse::<IpAddr>() {
        return SocketAddr::new(ip, port).to_string();
    }
    match entry.rsplit_once(':') {
        Some((host, p)) if !host.contains(':') && p.parse::<u16>().is_ok() => entry.to_string(),
        _ => format!("{}:{}", entry, port),
    }
}
