use crate::error::Result;
use crate::location::CurlyLocation;
use crate::options::CurlyOptions;
use codec::varint;
use cueball::{CueballStats, CueballWriter};
use std::collections::HashMap;
use std::fs::{rename, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Counters reported when a curly writer closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CurlyStats {
    /// Bytes appended to the record file. Folded records append nothing,
    /// so size-delta accounting must use this rather than a per-record
    /// estimate.
    pub record_bytes_written: u64,
    /// Logical records accepted (index entries written).
    pub records_written: u64,
    /// Records that reused an earlier identical value's location.
    pub records_folded: u64,
    /// Key index counters.
    pub index: CueballStats,
}

/// Writes a curly version: an append-only record file plus its cueball
/// key index.
///
/// Keys must arrive in strictly increasing key-hash order (the index
/// writer enforces this). Like every writer in this workspace, both files
/// are built at temp paths and renamed into place on
/// [`close`](CurlyWriter::close).
pub struct CurlyWriter {
    record_file: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    index: CueballWriter,
    options: CurlyOptions,
    /// Bytes committed to the record file so far; with grouping this is
    /// also the file offset the buffered block will land at.
    offset: u64,
    /// Session map for value folding: exact value bytes to the location
    /// of their first occurrence.
    folded: HashMap<Vec<u8>, CurlyLocation>,
    /// Buffered uncompressed block (grouped mode only).
    block: Vec<u8>,
    stats: CurlyStats,
}

impl CurlyWriter {
    /// Creates a writer for the record file at `record_path` and its key
    /// index at `index_path`.
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(
        record_path: P,
        index_path: Q,
        options: CurlyOptions,
    ) -> Result<Self> {
        let final_path = record_path.as_ref().to_path_buf();
        let tmp_path = tmp_sibling(&final_path);
        let raw = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let index = CueballWriter::create(index_path, options.index)?;
        Ok(Self {
            record_file: BufWriter::new(raw),
            tmp_path,
            final_path,
            index,
            options,
            offset: 0,
            folded: HashMap::new(),
            block: Vec::new(),
            stats: CurlyStats::default(),
        })
    }

    /// Appends `value` under `key_hash`.
    ///
    /// With value folding enabled, a value byte-identical to one already
    /// written in this session reuses the earlier record's location and
    /// appends nothing to the record file.
    ///
    /// # Errors
    ///
    /// Propagates key-order violations from the index writer and any I/O
    /// or encoding failure.
    pub fn write(&mut self, key_hash: &[u8], value: &[u8]) -> Result<()> {
        if self.options.value_folding {
            if let Some(&location) = self.folded.get(value) {
                let slot = location.encode(self.options.location_size())?;
                self.index.write(key_hash, &slot)?;
                self.stats.records_written += 1;
                self.stats.records_folded += 1;
                return Ok(());
            }
        }

        let location = match self.options.block_grouping {
            None => {
                let location = CurlyLocation::direct(self.offset);
                let prefix_len = varint::write(&mut self.record_file, value.len() as u64)?;
                self.record_file.write_all(value)?;
                let appended = prefix_len as u64 + value.len() as u64;
                self.offset += appended;
                self.stats.record_bytes_written += appended;
                location
            }
            Some(grouping) => {
                if self.block.len() >= grouping.target_block_size {
                    self.cut_block()?;
                }
                let location = CurlyLocation::grouped(self.offset, self.block.len() as u64);
                varint::encode(value.len() as u64, &mut self.block);
                self.block.extend_from_slice(value);
                location
            }
        };

        let slot = location.encode(self.options.location_size())?;
        self.index.write(key_hash, &slot)?;
        self.stats.records_written += 1;
        if self.options.value_folding {
            self.folded.insert(value.to_vec(), location);
        }
        Ok(())
    }

    /// Bytes appended to the record file so far. With grouping enabled
    /// this excludes the still-buffered block.
    #[must_use]
    pub fn record_bytes_written(&self) -> u64 {
        self.stats.record_bytes_written
    }

    /// Logical records accepted so far.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.stats.records_written
    }

    /// Records folded onto an earlier identical value so far.
    #[must_use]
    pub fn records_folded(&self) -> u64 {
        self.stats.records_folded
    }

    /// Compresses and appends the buffered record block.
    fn cut_block(&mut self) -> Result<()> {
        let grouping = match self.options.block_grouping {
            Some(g) => g,
            None => return Ok(()),
        };
        if self.block.is_empty() {
            return Ok(());
        }
        let compressed = grouping.codec.compress(&self.block)?;
        let prefix_len = varint::write(&mut self.record_file, compressed.len() as u64)?;
        let appended = prefix_len as u64 + compressed.len() as u64;
        self.offset += appended;
        self.record_file.write_all(&compressed)?;
        self.stats.record_bytes_written += appended;
        self.block.clear();
        Ok(())
    }

    /// Flushes any buffered block, fsyncs both files, and renames them
    /// into place: the key index first, the record file last.
    ///
    /// The record file only takes its final name once the index is fully
    /// installed, so a failure writing the index footer cannot leave a
    /// record file that nothing can resolve keys against.
    pub fn close(mut self) -> Result<CurlyStats> {
        self.cut_block()?;
        self.record_file.flush()?;
        let inner = self
            .record_file
            .into_inner()
            .map_err(|e| crate::CurlyError::Io(e.into_error()))?;
        inner.sync_all()?;

        self.stats.index = self.index.close()?;

        rename(&self.tmp_path, &self.final_path)?;
        sync_parent_dir(&self.final_path);
        Ok(self.stats)
    }
}

/// Returns `<path>.tmp` without clobbering the format suffix.
pub(crate) fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tmp", name))
}

/// Best-effort fsync of the parent directory after a rename.
pub(crate) fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}
