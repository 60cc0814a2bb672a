use crate::error::Result;
use compress::BlockCodec;
use cueball::{CueballMerger, CueballOptions, CueballReader, CueballWriter, Get};
use curly::{
    CurlyCompactingMerger, CurlyFilePair, CurlyMerger, CurlyOptions, CurlyReader, CurlyWriter,
};
use domain::{FileFormat, FileKind, PartitionFileName};
use std::io;
use std::path::{Path, PathBuf};

/// Counters from one merge or compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    pub records_written: u64,
    pub bytes_written: u64,
}

/// Point-lookup view of one installed partition version.
pub trait PartitionReader: Send + Sync {
    fn get(&self, key_hash: &[u8]) -> Result<Get>;

    fn get_bulk(&self, key_hashes: &[Vec<u8>]) -> Result<Vec<Get>>;
}

/// Capability surface of one storage format, selected by domain
/// configuration. The updater and compactor are format-agnostic and work
/// entirely through this trait.
///
/// A version's on-disk shape is a list of files in a fixed order
/// ([`file_names`](StorageFormat::file_names)); every path-list argument
/// below follows that order.
pub trait StorageFormat: Send + Sync {
    fn format(&self) -> FileFormat;

    /// File names of one version, in canonical order.
    fn file_names(&self, version: u32, kind: FileKind) -> Vec<String>;

    /// [`file_names`](StorageFormat::file_names) resolved under `dir`.
    fn version_paths(&self, dir: &Path, version: u32, kind: FileKind) -> Vec<PathBuf> {
        self.file_names(version, kind)
            .into_iter()
            .map(|name| dir.join(name))
            .collect()
    }

    /// Folds `base` plus `deltas` (ascending version order) into the
    /// files at `output`.
    fn merge(&self, base: &[PathBuf], deltas: &[Vec<PathBuf>], output: &[PathBuf])
        -> Result<MergeStats>;

    /// Like [`merge`](StorageFormat::merge) but reclaiming superseded
    /// records where the format distinguishes the two.
    fn compact(
        &self,
        base: &[PathBuf],
        deltas: &[Vec<PathBuf>],
        output: &[PathBuf],
    ) -> Result<MergeStats> {
        self.merge(base, deltas, output)
    }

    /// Writes a valid zero-record base at `output`, so an adopted empty
    /// version is detectable as the current version later.
    fn write_empty_base(&self, output: &[PathBuf]) -> Result<()>;

    /// Opens a reader over the version files at `paths`.
    fn open_reader(&self, paths: &[PathBuf]) -> Result<Box<dyn PartitionReader>>;
}

fn single(paths: &[PathBuf]) -> Result<&PathBuf> {
    match paths {
        [path] => Ok(path),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("expected one file path, got {}", paths.len()),
        )
        .into()),
    }
}

fn pair(paths: &[PathBuf]) -> Result<CurlyFilePair> {
    match paths {
        [record, index] => Ok(CurlyFilePair::new(record.clone(), index.clone())),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("expected record and index paths, got {}", paths.len()),
        )
        .into()),
    }
}

/// Fixed-value-size storage: one cueball file per version.
pub struct CueballFormat {
    options: CueballOptions,
    output_codec: BlockCodec,
}

impl CueballFormat {
    #[must_use]
    pub fn new(options: CueballOptions, output_codec: BlockCodec) -> Self {
        Self {
            options,
            output_codec,
        }
    }
}

impl StorageFormat for CueballFormat {
    fn format(&self) -> FileFormat {
        FileFormat::Cueball
    }

    fn file_names(&self, version: u32, kind: FileKind) -> Vec<String> {
        vec![PartitionFileName::new(version, kind, FileFormat::Cueball).to_string()]
    }

    fn merge(
        &self,
        base: &[PathBuf],
        deltas: &[Vec<PathBuf>],
        output: &[PathBuf],
    ) -> Result<MergeStats> {
        let mut delta_paths = Vec::with_capacity(deltas.len());
        for delta in deltas {
            delta_paths.push(single(delta)?.as_path());
        }
        let stats = CueballMerger::merge(
            single(base)?,
            &delta_paths,
            single(output)?,
            self.options,
            self.output_codec,
            None,
        )?;
        Ok(MergeStats {
            records_written: stats.records_written,
            bytes_written: stats.bytes_written,
        })
    }

    fn write_empty_base(&self, output: &[PathBuf]) -> Result<()> {
        let writer = CueballWriter::create(single(output)?, self.options)?;
        writer.close()?;
        Ok(())
    }

    fn open_reader(&self, paths: &[PathBuf]) -> Result<Box<dyn PartitionReader>> {
        Ok(Box::new(CueballPartitionReader {
            reader: CueballReader::open(single(paths)?, self.options)?,
        }))
    }
}

struct CueballPartitionReader {
    reader: CueballReader,
}

impl PartitionReader for CueballPartitionReader {
    fn get(&self, key_hash: &[u8]) -> Result<Get> {
        Ok(self.reader.get(key_hash)?)
    }

    fn get_bulk(&self, key_hashes: &[Vec<u8>]) -> Result<Vec<Get>> {
        Ok(self.reader.get_bulk(key_hashes)?)
    }
}

/// Variable-length record storage: a curly record file plus its cueball
/// key index per version.
pub struct CurlyFormat {
    options: CurlyOptions,
    output_index_codec: BlockCodec,
}

impl CurlyFormat {
    #[must_use]
    pub fn new(options: CurlyOptions, output_index_codec: BlockCodec) -> Self {
        Self {
            options,
            output_index_codec,
        }
    }
}

impl StorageFormat for CurlyFormat {
    fn format(&self) -> FileFormat {
        FileFormat::Curly
    }

    fn file_names(&self, version: u32, kind: FileKind) -> Vec<String> {
        vec![
            PartitionFileName::new(version, kind, FileFormat::Curly).to_string(),
            PartitionFileName::new(version, kind, FileFormat::Cueball).to_string(),
        ]
    }

    fn merge(
        &self,
        base: &[PathBuf],
        deltas: &[Vec<PathBuf>],
        output: &[PathBuf],
    ) -> Result<MergeStats> {
        let delta_pairs = deltas.iter().map(|d| pair(d)).collect::<Result<Vec<_>>>()?;
        let delta_refs: Vec<&CurlyFilePair> = delta_pairs.iter().collect();
        let stats = CurlyMerger::merge(
            &pair(base)?,
            &delta_refs,
            &pair(output)?,
            self.options,
            self.output_index_codec,
        )?;
        Ok(MergeStats {
            records_written: stats.records_written,
            bytes_written: stats.record_bytes_written + stats.index.bytes_written,
        })
    }

    fn compact(
        &self,
        base: &[PathBuf],
        deltas: &[Vec<PathBuf>],
        output: &[PathBuf],
    ) -> Result<MergeStats> {
        let delta_pairs = deltas.iter().map(|d| pair(d)).collect::<Result<Vec<_>>>()?;
        let delta_refs: Vec<&CurlyFilePair> = delta_pairs.iter().collect();
        let stats = CurlyCompactingMerger::merge(
            &pair(base)?,
            &delta_refs,
            &pair(output)?,
            self.options,
            self.options,
        )?;
        Ok(MergeStats {
            records_written: stats.records_written,
            bytes_written: stats.record_bytes_written + stats.index.bytes_written,
        })
    }

    fn write_empty_base(&self, output: &[PathBuf]) -> Result<()> {
        let files = pair(output)?;
        let writer = CurlyWriter::create(&files.record_path, &files.index_path, self.options)?;
        writer.close()?;
        Ok(())
    }

    fn open_reader(&self, paths: &[PathBuf]) -> Result<Box<dyn PartitionReader>> {
        let files = pair(paths)?;
        Ok(Box::new(CurlyPartitionReader {
            reader: CurlyReader::open(&files.record_path, &files.index_path, self.options)?,
        }))
    }
}

struct CurlyPartitionReader {
    reader: CurlyReader,
}

impl PartitionReader for CurlyPartitionReader {
    fn get(&self, key_hash: &[u8]) -> Result<Get> {
        Ok(self.reader.get(key_hash)?)
    }

    fn get_bulk(&self, key_hashes: &[Vec<u8>]) -> Result<Vec<Get>> {
        Ok(self.reader.get_bulk(key_hashes)?)
    }
}
