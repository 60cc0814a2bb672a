mod cache_tests;
mod compactor_tests;
mod gc_tests;
mod updater_tests;

use crate::{CacheDir, CueballFormat, LocalDiskRemote, PartitionUpdater};
use anyhow::Result;
use compress::BlockCodec;
use cueball::{CueballOptions, CueballWriter};
use curly::{CurlyOptions, CurlyWriter};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Small geometry used across the test modules: 2-byte hashes, 4-byte
/// values, 4 buckets.
pub fn options() -> CueballOptions {
    CueballOptions::new(2, 4, 2)
}

pub fn curly_options() -> CurlyOptions {
    CurlyOptions::new(2, 5, 2)
}

/// Spreads keys across buckets; big-endian keeps numeric order.
pub fn k(n: u16) -> Vec<u8> {
    (n * 1000).to_be_bytes().to_vec()
}

pub fn v(n: u32) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

/// Writes a cueball version file directly into the remote namespace.
pub fn seed_remote_cueball(remote_dir: &Path, name: &str, entries: &[(u16, u32)]) -> Result<()> {
    let mut w = CueballWriter::create(remote_dir.join(name), options())?;
    for &(key, value) in entries {
        w.write(&k(key), &v(value))?;
    }
    w.close()?;
    Ok(())
}

/// Writes a curly record/index version pair directly into the remote
/// namespace.
pub fn seed_remote_curly(
    remote_dir: &Path,
    record_name: &str,
    index_name: &str,
    entries: &[(u16, &[u8])],
) -> Result<()> {
    let mut w = CurlyWriter::create(
        remote_dir.join(record_name),
        remote_dir.join(index_name),
        curly_options(),
    )?;
    for &(key, value) in entries {
        w.write(&k(key), value)?;
    }
    w.close()?;
    Ok(())
}

/// One partition's worth of collaborators rooted in a temp directory:
/// `remote/`, `cache/`, `work/`, and `partition/`.
pub struct Fixture {
    pub dir: TempDir,
    pub remote: Arc<LocalDiskRemote>,
    pub cache: Arc<CacheDir>,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let remote = Arc::new(LocalDiskRemote::new(dir.path().join("remote"))?);
        let cache = Arc::new(CacheDir::open(dir.path().join("cache"))?);
        Ok(Self { dir, remote, cache })
    }

    pub fn partition_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("partition")
    }

    pub fn work_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("work")
    }

    /// An updater over the fixture's partition with the small cueball
    /// geometry and uncompressed output.
    pub fn cueball_updater(&self) -> PartitionUpdater {
        PartitionUpdater::new(
            self.partition_dir(),
            self.work_dir(),
            Arc::clone(&self.cache),
            Arc::clone(&self.remote) as Arc<dyn crate::RemoteFileOps>,
            Arc::new(CueballFormat::new(options(), BlockCodec::None)),
        )
    }
}
