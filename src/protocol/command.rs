//! Command definitions
//!
//! Represents commands from clients. Fields are already validated.

use crate::types::{Percentile, PoolId};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Add = 0x01,
    Query = 0x02,
    Delete = 0x03,
    Ping = 0x04,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Append values to a pool (creating it if needed)
    Add { pool_id: PoolId, values: Vec<f64> },

    /// Percentile and total count of a pool
    Query { pool_id: PoolId, percentile: Percentile },

    /// Delete a pool
    Delete { pool_id: PoolId },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Add { .. } => CommandType::Add,
            Command::Query { .. } => CommandType::Query,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
        }
    }
}
