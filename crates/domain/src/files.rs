use crate::error::Result;
use std::fmt;
use std::fs;
use std::path::Path;

/// Role of one partition file within a version chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileKind {
    Base,
    Delta,
}

impl FileKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Base => "base",
            FileKind::Delta => "delta",
        }
    }
}

/// On-disk format suffix of one partition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileFormat {
    Cueball,
    Curly,
}

impl FileFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FileFormat::Cueball => "cueball",
            FileFormat::Curly => "curly",
        }
    }
}

/// Parsed name of one partition file: `NNNNN.base|delta.cueball|curly`
/// with the version number zero-padded to at least five digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionFileName {
    pub version: u32,
    pub kind: FileKind,
    pub format: FileFormat,
}

impl PartitionFileName {
    #[must_use]
    pub fn new(version: u32, kind: FileKind, format: FileFormat) -> Self {
        Self {
            version,
            kind,
            format,
        }
    }

    /// Parses a file name; returns `None` for names that are not
    /// partition files (scratch files, foreign files).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let mut parts = name.split('.');
        let version_part = parts.next()?;
        let kind_part = parts.next()?;
        let format_part = parts.next()?;
        if parts.next().is_some() || version_part.len() < 5 {
            return None;
        }
        let version = version_part.parse().ok()?;
        let kind = match kind_part {
            "base" => FileKind::Base,
            "delta" => FileKind::Delta,
            _ => return None,
        };
        let format = match format_part {
            "cueball" => FileFormat::Cueball,
            "curly" => FileFormat::Curly,
            _ => return None,
        };
        Some(Self {
            version,
            kind,
            format,
        })
    }
}

impl fmt::Display for PartitionFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:05}.{}.{}",
            self.version,
            self.kind.as_str(),
            self.format.as_str()
        )
    }
}

/// Lists the parseable partition files in `dir`, sorted ascending.
/// A missing directory is an empty partition, not an error.
pub fn local_files(dir: &Path) -> Result<Vec<PartitionFileName>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(parsed) = name.to_str().and_then(PartitionFileName::parse) {
            files.push(parsed);
        }
    }
    files.sort();
    Ok(files)
}

/// Highest-numbered local base of `format` in `dir`, the partition's
/// current version. `None` means no version is installed.
pub fn detect_current_version(dir: &Path, format: FileFormat) -> Result<Option<u32>> {
    Ok(local_files(dir)?
        .into_iter()
        .filter(|f| f.kind == FileKind::Base && f.format == format)
        .map(|f| f.version)
        .max())
}
