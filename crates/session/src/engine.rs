//! Engine collaborator contract
//!
//! The analytical engine is external to the harness. The session controller
//! only needs to open a connection with a given resource budget, load
//! extensions, register the storage secret, attach a database and run
//! statements. Anything that can do that implements [`EngineConnector`].

use crate::secret::BackendSecret;
use nvmefs_core::config::EngineSection;
use nvmefs_core::limits::{SPILL_MEMORY_LIMIT, SPILL_THREADS};
use nvmefs_core::{Result, Row};
use serde::{Deserialize, Serialize};

/// Settings passed to the engine when a connection is opened.
///
/// `memory_limit` and `threads` together form the reproducibility contract
/// for spill workloads: the same workload under the same pair spills the same
/// way and produces the same rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Database to open on connect; `None` opens an in-memory database
    pub database: Option<String>,
    /// Engine memory limit, e.g. `"75MB"`
    pub memory_limit: Option<String>,
    /// Worker thread count
    pub threads: Option<u32>,
    /// Allow loading locally built extensions
    pub allow_unsigned_extensions: bool,
}

impl EngineConfig {
    /// In-memory database allowing unsigned extensions, engine defaults otherwise
    pub fn new() -> Self {
        Self {
            allow_unsigned_extensions: true,
            ..Self::default()
        }
    }

    /// Budget that forces TPC-H SF1 to spill: 75MB, one worker
    pub fn spill_profile() -> Self {
        Self::new()
            .memory_limit(SPILL_MEMORY_LIMIT)
            .threads(SPILL_THREADS)
    }

    /// Open `database` on connect
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the memory limit
    pub fn memory_limit(mut self, limit: impl Into<String>) -> Self {
        self.memory_limit = Some(limit.into());
        self
    }

    /// Set the worker thread count
    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Settings as engine option pairs, in a stable order
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        let mut settings = vec![(
            "allow_unsigned_extensions",
            self.allow_unsigned_extensions.to_string(),
        )];
        if let Some(limit) = &self.memory_limit {
            settings.push(("memory_limit", limit.clone()));
        }
        if let Some(threads) = self.threads {
            settings.push(("threads", threads.to_string()));
        }
        settings
    }
}

impl From<&EngineSection> for EngineConfig {
    fn from(section: &EngineSection) -> Self {
        Self {
            database: None,
            memory_limit: section.memory_limit.clone(),
            threads: section.threads,
            allow_unsigned_extensions: section.allow_unsigned_extensions,
        }
    }
}

/// An open engine connection.
pub trait EngineConnection: Send {
    /// Load an extension by name or by path to its packaged artifact
    fn load_extension(&mut self, extension: &str) -> Result<()>;

    /// Register the storage backend secret
    fn register_secret(&mut self, secret: &BackendSecret) -> Result<()>;

    /// Attach `uri` read-write under `alias` and make it the default database
    fn attach(&mut self, uri: &str, alias: &str) -> Result<()>;

    /// Run a statement and collect every produced row
    fn query(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Run a statement, discarding any rows
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.query(sql).map(|_| ())
    }

    /// Close the connection, flushing anything the engine buffers
    fn close(&mut self) -> Result<()>;
}

/// Opens engine connections.
pub trait EngineConnector: Send + Sync {
    /// Open a new connection with `config`
    fn connect(&self, config: &EngineConfig) -> Result<Box<dyn EngineConnection>>;
}

impl<C: EngineConnector + ?Sized> EngineConnector for std::sync::Arc<C> {
    fn connect(&self, config: &EngineConfig) -> Result<Box<dyn EngineConnection>> {
        (**self).connect(config)
    }
}
