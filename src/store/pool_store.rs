//! Pool Store
//!
//! Keyed container of pool files with per-pool locking.
//!
//! ## Responsibilities
//! - Discover and recover existing pool files on startup
//! - Create a pool on its first append, extend it afterwards
//! - Hand out materialized copies of a pool's values
//! - Delete whole pools

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{Config, SyncStrategy};
use crate::error::{PoolError, Result};
use crate::types::PoolId;

use super::manifest::StoreManifest;
use super::pool_file::{PoolFile, TEMP_EXTENSION};
use super::{AppendKind, DeleteResult};

/// State of one pool behind its lock
enum Slot {
    /// Reserved by an append that has not created the file yet
    Vacant,

    /// Live pool
    Open(PoolFile),

    /// Deleted (or failed to create); no longer reachable from the map
    Retired,
}

type SlotRef = Arc<RwLock<Slot>>;

/// Durable store of all pools
///
/// ## Concurrency:
/// - `slots`: RwLock over the ID → slot map, held only for lookups/inserts
/// - each slot: its own RwLock; append/delete take it for writing,
///   read_all/exists/len for reading
/// - lock order is slot → map; nothing waits on a slot while holding the map
pub struct PoolStore {
    /// Root data directory
    data_dir: PathBuf,

    /// Directory holding the pool files
    pools_dir: PathBuf,

    manifest: StoreManifest,

    sync_strategy: SyncStrategy,

    slots: RwLock<HashMap<PoolId, SlotRef>>,
}

impl PoolStore {
    const POOLS_DIR: &'static str = "pools";
    const FILE_PREFIX: &'static str = "pool_";
    const FILE_EXTENSION: &'static str = "pool";

    /// Open or create a store rooted at `data_dir`
    ///
    /// On startup:
    /// 1. Create directories and load/write the manifest
    /// 2. Remove leftovers of interrupted pool creation
    /// 3. Open and validate every pool file (truncating torn tails)
    pub fn open(data_dir: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let manifest = StoreManifest::load_or_create(data_dir)?;

        let pools_dir = data_dir.join(Self::POOLS_DIR);
        fs::create_dir_all(&pools_dir)?;

        let mut slots = HashMap::new();
        let mut truncated = 0usize;

        for entry in fs::read_dir(&pools_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            if path.extension() == Some(OsStr::new(TEMP_EXTENSION)) {
                tracing::warn!("Removing unfinished pool file {}", path.display());
                fs::remove_file(&path)?;
                continue;
            }

            let Some(id) = Self::parse_pool_id(&path) else {
                continue;
            };

            let (file, recovery) = PoolFile::open(&path, sync_strategy)?;
            if recovery.was_truncated {
                truncated += 1;
                tracing::warn!(
                    pool = %id,
                    torn_bytes = recovery.torn_bytes,
                    "Truncated partial segment left by an interrupted append"
                );
            }
            tracing::trace!(
                pool = %id,
                segments = recovery.segments_recovered,
                values = recovery.values_recovered,
                "Recovered pool"
            );

            slots.insert(id, Arc::new(RwLock::new(Slot::Open(file))));
        }

        tracing::info!(
            pools = slots.len(),
            truncated,
            "Pool store opened at {}",
            data_dir.display()
        );

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            pools_dir,
            manifest,
            sync_strategy,
            slots: RwLock::new(slots),
        })
    }

    /// Open using the storage settings of a config
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.data_dir, config.sync_strategy)
    }

    /// True iff the pool currently exists
    pub fn exists(&self, id: PoolId) -> bool {
        match self.slot(id) {
            Some(slot) => matches!(*slot.read(), Slot::Open(_)),
            None => false,
        }
    }

    /// Append values to a pool, creating it if needed
    ///
    /// Values are truncated toward zero before storage.
    pub fn append(&self, id: PoolId, values: &[f64]) -> Result<AppendKind> {
        if values.is_empty() {
            return Err(PoolError::InvalidInput(
                "values must contain at least one number".to_string(),
            ));
        }

        let values = values
            .iter()
            .map(|&v| truncate_value(v))
            .collect::<Result<Vec<i64>>>()?;

        loop {
            let slot = self.slot_or_insert(id);
            let mut guard = slot.write();

            if let Slot::Open(file) = &mut *guard {
                file.append(&values)?;
                tracing::debug!(pool = %id, added = values.len(), total = file.len(), "Extended pool");
                return Ok(AppendKind::Extended);
            }

            // Deleted while we waited for the lock; look the ID up again
            if matches!(*guard, Slot::Retired) {
                continue;
            }

            match PoolFile::create(&self.pool_path(id), &values, self.sync_strategy) {
                Ok(file) => {
                    *guard = Slot::Open(file);
                    tracing::info!(pool = %id, values = values.len(), "Created pool");
                    return Ok(AppendKind::Created);
                }
                Err(e) => {
                    *guard = Slot::Retired;
                    self.detach(id, &slot);
                    return Err(e);
                }
            }
        }
    }

    /// Read every value of a pool, in insertion order
    pub fn read_all(&self, id: PoolId) -> Result<Vec<i64>> {
        let slot = self.slot(id).ok_or(PoolError::PoolNotFound(id))?;
        let guard = slot.read();

        match &*guard {
            Slot::Open(file) => file.read_all(),
            Slot::Vacant | Slot::Retired => Err(PoolError::PoolNotFound(id)),
        }
    }

    /// Delete a pool and its file
    pub fn delete(&self, id: PoolId) -> Result<DeleteResult> {
        let Some(slot) = self.slot(id) else {
            return Ok(DeleteResult::NotFound);
        };
        let mut guard = slot.write();

        match &*guard {
            Slot::Open(file) => file.remove()?,
            Slot::Vacant | Slot::Retired => return Ok(DeleteResult::NotFound),
        }

        *guard = Slot::Retired;
        self.detach(id, &slot);

        tracing::info!(pool = %id, "Deleted pool");
        Ok(DeleteResult::Deleted)
    }

    /// Number of values in a pool, without reading them
    pub fn len(&self, id: PoolId) -> Option<u64> {
        let slot = self.slot(id)?;
        let guard = slot.read();
        match &*guard {
            Slot::Open(file) => Some(file.len()),
            Slot::Vacant | Slot::Retired => None,
        }
    }

    /// IDs of all live pools, ascending
    pub fn pool_ids(&self) -> Vec<PoolId> {
        let slots: Vec<(PoolId, SlotRef)> = self
            .slots
            .read()
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        let mut ids: Vec<PoolId> = slots
            .into_iter()
            .filter(|(_, slot)| matches!(*slot.read(), Slot::Open(_)))
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    /// Number of live pools
    pub fn pool_count(&self) -> usize {
        self.pool_ids().len()
    }

    /// Sync every pool file and release the store
    pub fn close(self) -> Result<()> {
        let slots = std::mem::take(&mut *self.slots.write());
        let count = slots.len();

        for (_, slot) in slots {
            let mut guard = slot.write();
            if let Slot::Open(file) = &mut *guard {
                file.sync()?;
            }
        }

        tracing::info!(pools = count, "Pool store closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn pools_dir(&self) -> &Path {
        &self.pools_dir
    }

    pub fn manifest(&self) -> &StoreManifest {
        &self.manifest
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn slot(&self, id: PoolId) -> Option<SlotRef> {
        self.slots.read().get(&id).cloned()
    }

    fn slot_or_insert(&self, id: PoolId) -> SlotRef {
        if let Some(slot) = self.slot(id) {
            return slot;
        }
        let mut slots = self.slots.write();
        Arc::clone(
            slots
                .entry(id)
                .or_insert_with(|| Arc::new(RwLock::new(Slot::Vacant))),
        )
    }

    /// Drop `slot` from the map if it is still the one registered for `id`
    fn detach(&self, id: PoolId, slot: &SlotRef) {
        let mut slots = self.slots.write();
        if slots.get(&id).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(&id);
        }
    }

    /// "pool_42.pool" in the pools directory
    fn pool_path(&self, id: PoolId) -> PathBuf {
        self.pools_dir
            .join(format!("{}{}.{}", Self::FILE_PREFIX, id, Self::FILE_EXTENSION))
    }

    /// "pool_42.pool" → Some(42)
    fn parse_pool_id(path: &Path) -> Option<PoolId> {
        if path.extension()? != Self::FILE_EXTENSION {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let id = name.strip_prefix(Self::FILE_PREFIX)?.parse::<u64>().ok()?;
        PoolId::new(id).ok()
    }
}

/// Truncate a submitted number toward zero for storage
///
/// `-1.2 → -1`, `2.9 → 2`. NaN, infinities and values outside the `i64`
/// range are rejected.
pub fn truncate_value(value: f64) -> Result<i64> {
    if !value.is_finite() {
        return Err(PoolError::InvalidInput(format!(
            "value {} is not a finite number",
            value
        )));
    }

    let truncated = value.trunc();
    // i64::MIN is exactly representable; i64::MAX rounds up to 2^63
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(PoolError::InvalidInput(format!(
            "value {} is outside the storable integer range",
            value
        )));
    }

    Ok(truncated as i64)
}
