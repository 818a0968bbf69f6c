//! Pool Store Module
//!
//! Durable, keyed, growable numeric storage.
//!
//! ## Responsibilities
//! - One append-only file per pool, extended in place
//! - Create-or-extend append semantics
//! - CRC32 checksums per appended batch
//! - Torn-write recovery on startup
//! - Per-pool reader/writer locking
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── MANIFEST           (bincode: format version, creation time)
//!   └── pools/
//!       ├── pool_1.pool
//!       └── pool_42.pool
//! ```
//!
//! ## Pool File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (8 bytes)                                        │
//! │   Magic: "RPOL" (4) | Version: u16 (2) | Reserved (2)   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Segment 1                                               │
//! │ ┌──────────┬────────────┬────────────┬────────────────┐ │
//! │ │Count (4) │ HdrCRC (4) │ BodyCRC (4)│ Count × i64    │ │
//! │ └──────────┴────────────┴────────────┴────────────────┘ │
//! ├─────────────────────────────────────────────────────────┤
//! │ Segment 2 ... (one per append)                          │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod manifest;
mod pool_file;
mod pool_store;
mod segment;

pub use manifest::{StoreManifest, FORMAT_VERSION};
pub use pool_file::{PoolFile, RecoveryResult};
pub use pool_store::{truncate_value, PoolStore};
pub use segment::{encode_segment, scan_segments, SegmentScan, SEGMENT_HEADER_SIZE, VALUE_SIZE};

/// What an append did to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendKind {
    /// The pool did not exist and was created with the values
    Created,

    /// The values were appended to an existing pool
    Extended,
}

impl AppendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppendKind::Created => "inserted",
            AppendKind::Extended => "appended",
        }
    }
}

/// Outcome of deleting a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    /// The pool existed and has been removed
    Deleted,

    /// There was no such pool
    NotFound,
}

impl DeleteResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteResult::Deleted => "deleted",
            DeleteResult::NotFound => "not found",
        }
    }
}
