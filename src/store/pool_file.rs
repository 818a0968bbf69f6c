//! Pool File
//!
//! A single pool's append-only file: header followed by segments.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

use crate::config::SyncStrategy;
use crate::error::{PoolError, Result};

use super::segment::{encode_segment, scan_segments};

/// Magic bytes identifying a RankPool pool file
pub(crate) const MAGIC: &[u8; 4] = b"RPOL";

/// Current pool file format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Reserved (2) = 8 bytes
pub(crate) const FILE_HEADER_SIZE: u64 = 8;

/// Extension of a pool file that is still being created
pub(crate) const TEMP_EXTENSION: &str = "tmp";

/// Result of validating a pool file on open
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of valid segments found
    pub segments_recovered: u64,

    /// Number of values across those segments
    pub values_recovered: u64,

    /// Bytes of a partial trailing segment that were cut off
    pub torn_bytes: u64,

    /// Whether the file was truncated (partial write removed)
    pub was_truncated: bool,
}

/// Open handle on one pool's file
///
/// Writes always go to `committed_len`, so bytes of a failed append are
/// overwritten (and truncated) rather than exposed to readers.
#[derive(Debug)]
pub struct PoolFile {
    /// Path to the pool file
    path: PathBuf,

    /// Read/write handle used for appends
    file: File,

    /// Values stored in the file
    value_count: u64,

    /// End of the last complete segment
    committed_len: u64,

    sync_strategy: SyncStrategy,

    /// Appends written since the last fsync
    appends_since_sync: usize,
}

impl PoolFile {
    /// Create a new pool file holding `values`
    ///
    /// The file is written and synced under a temporary name, then renamed
    /// into place, so a crash never leaves a pool file without its first batch.
    /// The directory is synced after the rename so the new name is durable.
    pub fn create(path: &Path, values: &[i64], sync_strategy: SyncStrategy) -> Result<Self> {
        if path.exists() {
            return Err(PoolError::Storage(format!(
                "Pool file already exists: {}",
                path.display()
            )));
        }

        let segment = encode_segment(values)?;
        let tmp_path = path.with_extension(TEMP_EXTENSION);

        if let Err(e) = Self::write_new(&tmp_path, &segment) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        fs::rename(&tmp_path, path)?;
        sync_parent_dir(path)?;

        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            value_count: values.len() as u64,
            committed_len: FILE_HEADER_SIZE + segment.len() as u64,
            sync_strategy,
            appends_since_sync: 0,
        })
    }

    fn write_new(path: &Path, segment: &[u8]) -> Result<()> {
        let mut header = BytesMut::with_capacity(FILE_HEADER_SIZE as usize);
        header.put_slice(MAGIC);
        header.put_u16_le(VERSION);
        header.put_u16_le(0);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&header)?;
        file.write_all(segment)?;
        file.sync_all()?;
        Ok(())
    }

    /// Open an existing pool file, validating every segment
    ///
    /// A torn trailing segment is truncated away. A bad header or a
    /// checksum mismatch in a complete segment is `Corruption`.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<(Self, RecoveryResult)> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;

        if contents.len() < FILE_HEADER_SIZE as usize {
            return Err(PoolError::Corruption(format!(
                "{}: file too short for header ({} bytes)",
                path.display(),
                contents.len()
            )));
        }
        if &contents[0..4] != MAGIC {
            return Err(PoolError::Corruption(format!(
                "{}: invalid magic {:?}",
                path.display(),
                &contents[0..4]
            )));
        }
        let version = u16::from_le_bytes([contents[4], contents[5]]);
        if version != VERSION {
            return Err(PoolError::Corruption(format!(
                "{}: unsupported pool file version {}",
                path.display(),
                version
            )));
        }

        let scan = scan_segments(&contents[FILE_HEADER_SIZE as usize..], None).map_err(|e| {
            match e {
                PoolError::Corruption(msg) => {
                    PoolError::Corruption(format!("{}: {}", path.display(), msg))
                }
                other => other,
            }
        })?;

        let committed_len = FILE_HEADER_SIZE + scan.valid_bytes;
        let was_truncated = scan.torn_bytes > 0;
        if was_truncated {
            file.set_len(committed_len)?;
            file.sync_all()?;
        }

        let recovery = RecoveryResult {
            segments_recovered: scan.segments,
            values_recovered: scan.values,
            torn_bytes: scan.torn_bytes,
            was_truncated,
        };

        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                value_count: scan.values,
                committed_len,
                sync_strategy,
                appends_since_sync: 0,
            },
            recovery,
        ))
    }

    /// Append a batch as a new segment at the end of the file
    ///
    /// Previously written segments are never touched. If the write fails the
    /// file is cut back to its last committed length before returning.
    pub fn append(&mut self, values: &[i64]) -> Result<()> {
        let segment = encode_segment(values)?;

        if let Err(e) = self.write_at_end(&segment) {
            if let Err(rollback) = self.file.set_len(self.committed_len) {
                tracing::error!(
                    "Failed to roll back partial append to {}: {}",
                    self.path.display(),
                    rollback
                );
            }
            return Err(e);
        }

        self.committed_len += segment.len() as u64;
        self.value_count += values.len() as u64;
        self.appends_since_sync += 1;

        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNAppends { count } => self.appends_since_sync >= count.max(1),
        };
        if due {
            self.sync()?;
        }

        Ok(())
    }

    fn write_at_end(&mut self, segment: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(self.committed_len))?;
        self.file.write_all(segment)?;
        Ok(())
    }

    /// Read every stored value, in insertion order
    ///
    /// Uses its own file handle so concurrent readers do not share a cursor.
    pub fn read_all(&self) -> Result<Vec<i64>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(FILE_HEADER_SIZE))?;

        let mut buf = vec![0u8; (self.committed_len - FILE_HEADER_SIZE) as usize];
        file.read_exact(&mut buf)?;

        let mut values = Vec::with_capacity(self.value_count as usize);
        let scan = scan_segments(&buf, Some(&mut values))?;

        if scan.torn_bytes != 0 || scan.values != self.value_count {
            return Err(PoolError::Corruption(format!(
                "{}: expected {} values, found {}",
                self.path.display(),
                self.value_count,
                scan.values
            )));
        }

        Ok(values)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.appends_since_sync = 0;
        Ok(())
    }

    /// Remove the file from disk, syncing the directory entry away
    pub fn remove(&self) -> Result<()> {
        fs::remove_file(&self.path)?;
        sync_parent_dir(&self.path)?;
        Ok(())
    }

    /// Number of values stored
    pub fn len(&self) -> u64 {
        self.value_count
    }

    pub fn is_empty(&self) -> bool {
        self.value_count == 0
    }

    /// Size of the committed part of the file in bytes
    pub fn committed_len(&self) -> u64 {
        self.committed_len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Fsync the directory holding `path` so a rename or unlink survives power loss
#[cfg(unix)]
pub(crate) fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()?;
    Ok(())
}

/// Directories cannot be opened for syncing here
#[cfg(not(unix))]
pub(crate) fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
