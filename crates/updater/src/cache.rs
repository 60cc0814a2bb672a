use crate::error::{Result, UpdateError};
use crate::remote::RemoteFileOps;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// A local directory of fetched remote files, shared by every partition
/// of a domain on the same disk.
///
/// Fetches write to a uniquely named scratch path and rename into place,
/// so concurrent fetches of the same file by different partitions cannot
/// corrupt it; one of them wins the rename and both read a complete file.
pub struct CacheDir {
    root: PathBuf,
    scratch_counter: AtomicU64,
}

impl CacheDir {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            scratch_counter: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path of `name`, whether or not it is cached yet.
    #[must_use]
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.path_of(name).exists()
    }

    /// Ensures `name` is cached, fetching it from `remote` if absent.
    /// Returns the cached path and the bytes fetched (zero on a cache
    /// hit).
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::MissingRemoteFile`] when the remote does
    /// not have the file.
    pub fn fetch(&self, remote: &dyn RemoteFileOps, name: &str) -> Result<(PathBuf, u64)> {
        let dest = self.path_of(name);
        if dest.exists() {
            return Ok((dest, 0));
        }
        if !remote.exists(name)? {
            return Err(UpdateError::MissingRemoteFile(name.to_string()));
        }

        let serial = self.scratch_counter.fetch_add(1, Ordering::Relaxed);
        let scratch = self
            .root
            .join(format!("{}.{}.{}.tmp", name, std::process::id(), serial));
        let mut src = remote.open(name)?;
        let mut out = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&scratch)?;
        let fetched = io::copy(&mut src, &mut out)?;
        out.sync_all()?;
        fs::rename(&scratch, &dest)?;
        tracing::debug!(file = name, bytes = fetched, "Fetched remote file into cache");
        Ok((dest, fetched))
    }

    /// Deletes every cached file whose name is not in `keep`. Scratch
    /// files are always removed.
    pub fn prune(&self, keep: &HashSet<String>) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = match name.to_str() {
                Some(name) => name,
                None => continue,
            };
            if !name.ends_with(".tmp") && keep.contains(name) {
                continue;
            }
            fs::remove_file(entry.path())?;
            removed += 1;
        }
        if removed > 0 {
            tracing::info!(removed, cache = %self.root.display(), "Pruned fetch cache");
        }
        Ok(removed)
    }
}
