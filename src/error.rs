//! Error types for RankPool
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::types::PoolId;

/// Result type alias using PoolError
pub type Result<T> = std::result::Result<T, PoolError>;

/// Unified error type for RankPool operations
#[derive(Debug, Error)]
pub enum PoolError {
    // -------------------------------------------------------------------------
    // Client Errors
    // -------------------------------------------------------------------------
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Pool {0} does not exist")]
    PoolNotFound(PoolId),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pool data corruption detected: {0}")]
    Corruption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PoolError {
    /// True for failures of the underlying storage (I/O, corruption, encoding).
    ///
    /// These are fatal for the request and are never retried.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            PoolError::Io(_)
                | PoolError::Corruption(_)
                | PoolError::Storage(_)
                | PoolError::Serialization(_)
        )
    }
}

impl From<bincode::Error> for PoolError {
    fn from(e: bincode::Error) -> Self {
        PoolError::Serialization(e.to_string())
    }
}
