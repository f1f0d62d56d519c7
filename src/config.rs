//! Configuration for Store
//!
//! Provides a builder pattern for configuring the storage connection.

use std::time::Duration;

/// Default pool size
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time a statement waits on a locked database
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database URL (`sqlite::memory:`, `sqlite://data.db`)
    pub database_url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Enforce foreign key constraints on every connection
    pub foreign_keys: bool,
    /// Create the database file if it does not exist
    pub create_if_missing: bool,
    /// How long a statement waits for a lock before failing
    pub busy_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration builder
    pub fn builder(database_url: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder::new(database_url)
    }
}

/// Builder for StoreConfig
#[derive(Debug)]
pub struct StoreConfigBuilder {
    database_url: String,
    max_connections: u32,
    foreign_keys: bool,
    create_if_missing: bool,
    busy_timeout: Duration,
}

impl StoreConfigBuilder {
    /// Create a new builder with the database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            foreign_keys: true,
            create_if_missing: true,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Set the pool size (default: 5, minimum 1)
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Enable or disable foreign key enforcement (default: true)
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Create the database file when missing (default: true)
    pub fn create_if_missing(mut self, enabled: bool) -> Self {
        self.create_if_missing = enabled;
        self
    }

    /// Set the lock wait timeout (default: 5s)
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> StoreConfig {
        StoreConfig {
            database_url: self.database_url,
            max_connections: self.max_connections,
            foreign_keys: self.foreign_keys,
            create_if_missing: self.create_if_missing,
            busy_timeout: self.busy_timeout,
        }
    }
}
