//! Store manifest
//!
//! Small bincode file at the root of the data directory recording which
//! on-disk format the store was created with.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

use super::pool_file::{TEMP_EXTENSION, VERSION};

/// Format version written by this build
pub const FORMAT_VERSION: u16 = VERSION;

/// Store-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    /// Pool file format version
    pub format_version: u16,

    /// Timestamp (unix millis) when the store was created
    pub created_at_ms: u64,
}

impl StoreManifest {
    pub const FILENAME: &'static str = "MANIFEST";

    /// Load the manifest from `dir`, writing a fresh one if none exists
    pub fn load_or_create(dir: &Path) -> Result<Self> {
        let path = dir.join(Self::FILENAME);

        if path.exists() {
            let bytes = fs::read(&path)?;
            let manifest: Self = bincode::deserialize(&bytes)?;

            if manifest.format_version != FORMAT_VERSION {
                return Err(PoolError::Storage(format!(
                    "Unsupported store format version {} (expected {})",
                    manifest.format_version, FORMAT_VERSION
                )));
            }
            return Ok(manifest);
        }

        let manifest = Self {
            format_version: FORMAT_VERSION,
            created_at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        };

        let tmp_path = path.with_extension(TEMP_EXTENSION);
        fs::write(&tmp_path, bincode::serialize(&manifest)?)?;
        fs::rename(&tmp_path, &path)?;

        tracing::debug!("Wrote store manifest to {}", path.display());
        Ok(manifest)
    }
}
