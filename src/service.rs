//! Pool Service
//!
//! Composes the pool store and the percentile engine into the three
//! client-facing operations.
//!
//! ## Responsibilities
//! - Reject empty additions before touching storage
//! - Report create-vs-extend and deleted-vs-absent outcomes
//! - Sort and rank outside of any pool lock

use std::sync::Arc;

use crate::config::Config;
use crate::error::{PoolError, Result};
use crate::percentile::Quantile;
use crate::protocol::Command;
use crate::store::{AppendKind, DeleteResult, PoolStore};
use crate::types::{Percentile, PoolId};

/// Result of executing a protocol command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Added(AppendKind),
    Quantile(Quantile),
    Deletion(DeleteResult),
    Pong,
}

/// The pool service
///
/// Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct PoolService {
    store: Arc<PoolStore>,
}

impl PoolService {
    /// Wrap an already opened store
    pub fn new(store: Arc<PoolStore>) -> Self {
        Self { store }
    }

    /// Open the store described by `config` and wrap it
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(PoolStore::from_config(config)?)))
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Outcome> {
        match command {
            Command::Add { pool_id, values } => {
                self.add_values(pool_id, &values).map(Outcome::Added)
            }
            Command::Query { pool_id, percentile } => self
                .query_percentile(pool_id, percentile)
                .map(Outcome::Quantile),
            Command::Delete { pool_id } => self.delete_pool(pool_id).map(Outcome::Deletion),
            Command::Ping => Ok(Outcome::Pong),
        }
    }

    /// Append values to a pool, creating it on first use
    pub fn add_values(&self, pool_id: PoolId, values: &[f64]) -> Result<AppendKind> {
        if values.is_empty() {
            return Err(PoolError::InvalidInput(
                "values must contain at least one number".to_string(),
            ));
        }

        self.store.append(pool_id, values)
    }

    /// Nearest-rank percentile and total count of a pool
    pub fn query_percentile(&self, pool_id: PoolId, percentile: Percentile) -> Result<Quantile> {
        if !self.store.exists(pool_id) {
            return Err(PoolError::PoolNotFound(pool_id));
        }

        let values = self.store.read_all(pool_id)?;
        let result = crate::percentile::percentile(percentile.get(), values)?;

        tracing::debug!(
            pool = %pool_id,
            percentile = %percentile,
            quantile = result.quantile,
            total = result.total,
            "Answered percentile query"
        );
        Ok(result)
    }

    /// Delete a pool
    pub fn delete_pool(&self, pool_id: PoolId) -> Result<DeleteResult> {
        self.store.delete(pool_id)
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<PoolStore> {
        &self.store
    }
}
