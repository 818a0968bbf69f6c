//! Validated input types
//!
//! Everything that reaches the pool service has already passed through one of
//! these constructors, so the core never re-checks ranges.

use std::fmt;
use std::num::NonZeroU64;

use crate::error::{PoolError, Result};

/// Identifier of a pool (always positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolId(NonZeroU64);

impl PoolId {
    /// Build a pool ID, rejecting zero
    pub fn new(id: u64) -> Result<Self> {
        NonZeroU64::new(id)
            .map(Self)
            .ok_or_else(|| PoolError::InvalidInput("pool id must be a positive integer".to_string()))
    }

    /// The raw numeric ID
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for PoolId {
    type Error = PoolError;

    fn try_from(id: u64) -> Result<Self> {
        Self::new(id)
    }
}

/// A percentile in the half-open range (0, 100]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentile(f64);

impl Percentile {
    /// Build a percentile, rejecting NaN and anything outside (0, 100]
    pub fn new(p: f64) -> Result<Self> {
        if p.is_finite() && p > 0.0 && p <= 100.0 {
            Ok(Self(p))
        } else {
            Err(PoolError::InvalidInput(format!(
                "percentile must be in (0, 100], got {}",
                p
            )))
        }
    }

    /// The raw percentile value
    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
