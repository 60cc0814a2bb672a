use crate::error::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// File operations over one partition's remote namespace.
///
/// The coordination and transfer layers behind this trait are external
/// collaborators; names are flat (no subdirectories) and match the local
/// partition file naming.
pub trait RemoteFileOps: Send + Sync {
    /// Names present in the namespace, unordered.
    fn list(&self) -> Result<Vec<String>>;

    fn exists(&self, name: &str) -> Result<bool>;

    /// Opens `name` for reading.
    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>>;

    /// Stores `name` from `src`, atomically with respect to concurrent
    /// readers of the namespace. Returns the number of bytes stored.
    fn store(&self, name: &str, src: &mut dyn Read) -> Result<u64>;

    fn delete(&self, name: &str) -> Result<()>;
}

/// A remote namespace backed by a local directory. Serves tests and
/// single-host deployments where "remote" is another disk or mount.
pub struct LocalDiskRemote {
    root: PathBuf,
    scratch_counter: AtomicU64,
}

impl LocalDiskRemote {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            scratch_counter: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl RemoteFileOps for LocalDiskRemote {
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(".tmp") {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.root.join(name).exists())
    }

    fn open(&self, name: &str) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(self.root.join(name))?))
    }

    fn store(&self, name: &str, src: &mut dyn Read) -> Result<u64> {
        // Unique scratch name per store call; concurrent writers of the
        // same name race on the rename, last one wins, neither corrupts.
        let serial = self.scratch_counter.fetch_add(1, Ordering::Relaxed);
        let scratch = self
            .root
            .join(format!("{}.{}.{}.tmp", name, std::process::id(), serial));
        let mut out = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&scratch)?;
        let copied = io::copy(src, &mut out)?;
        out.flush()?;
        out.sync_all()?;
        fs::rename(&scratch, self.root.join(name))?;
        Ok(copied)
    }

    fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.root.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
