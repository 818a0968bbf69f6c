//! # RankPool
//!
//! A durable store of append-only numeric pools with:
//! - Exact nearest-rank percentile queries
//! - One checksummed, append-only file per pool
//! - Torn-write recovery on startup
//! - Per-pool reader/writer locking
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │          (acceptor + worker pool, typed decoding)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    PoolService                               │
//! │           (AddValues / QueryPercentile / DeletePool)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │  PoolStore  │          │  Percentile  │
//!   │ (per-pool   │ snapshot │ (nearest     │
//!   │  RwLock)    │ ───────► │  rank)       │
//!   └──────┬──────┘          └──────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │ Pool files  │
//!   │ (segments)  │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod types;

pub mod store;
pub mod percentile;
pub mod service;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PoolError, Result};
pub use config::Config;
pub use types::{Percentile, PoolId};
pub use percentile::Quantile;
pub use service::PoolService;
pub use store::{AppendKind, DeleteResult, PoolStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of RankPool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
