use crate::error::{DomainError, Result};
use std::collections::BTreeMap;

/// Chain position of one domain version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionKind {
    /// Complete and self-sufficient.
    Base,
    /// Partial; holds only keys changed since `parent`.
    Delta { parent: u32 },
}

/// Byte and record counts for one partition of one version, as reported
/// by the builder that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionStats {
    pub num_bytes: u64,
    pub num_records: u64,
}

/// One immutable version of a domain.
///
/// Versions form a singly linked chain: each delta names its parent, and
/// walking parents from any version reaches the nearest ancestor base.
/// `defunct` marks a version eligible for remote deletion independent of
/// its chain position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainVersion {
    pub number: u32,
    pub kind: VersionKind,
    /// Close timestamp (epoch millis); `None` while still being built.
    pub closed_at: Option<u64>,
    pub defunct: bool,
    /// Per-partition counts, indexed by partition number.
    pub partitions: Vec<PartitionStats>,
}

impl DomainVersion {
    /// A closed base version.
    #[must_use]
    pub fn base(number: u32) -> Self {
        Self {
            number,
            kind: VersionKind::Base,
            closed_at: Some(0),
            defunct: false,
            partitions: Vec::new(),
        }
    }

    /// A closed delta version on top of `parent`.
    #[must_use]
    pub fn delta(number: u32, parent: u32) -> Self {
        Self {
            number,
            kind: VersionKind::Delta { parent },
            closed_at: Some(0),
            defunct: false,
            partitions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_partitions(mut self, partitions: Vec<PartitionStats>) -> Self {
        self.partitions = partitions;
        self
    }

    #[must_use]
    pub fn is_base(&self) -> bool {
        matches!(self.kind, VersionKind::Base)
    }

    /// Parent version number; `None` for a base.
    #[must_use]
    pub fn parent(&self) -> Option<u32> {
        match self.kind {
            VersionKind::Base => None,
            VersionKind::Delta { parent } => Some(parent),
        }
    }

    /// Total bytes across all partitions.
    #[must_use]
    pub fn total_num_bytes(&self) -> u64 {
        self.partitions.iter().map(|p| p.num_bytes).sum()
    }

    /// `true` when every partition of this version carries zero bytes.
    /// Empty versions are adopted without fetching anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(|p| p.num_bytes == 0)
    }
}

/// The known version chain of one domain, keyed by version number.
#[derive(Debug, Clone, Default)]
pub struct DomainVersions {
    versions: BTreeMap<u32, DomainVersion>,
}

impl DomainVersions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, version: DomainVersion) {
        self.versions.insert(version.number, version);
    }

    /// Looks up a version by number.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownVersion`] if absent.
    pub fn get(&self, number: u32) -> Result<&DomainVersion> {
        self.versions
            .get(&number)
            .ok_or(DomainError::UnknownVersion(number))
    }

    #[must_use]
    pub fn contains(&self, number: u32) -> bool {
        self.versions.contains_key(&number)
    }

    /// Highest closed, non-defunct version number, if any.
    #[must_use]
    pub fn latest_closed(&self) -> Option<&DomainVersion> {
        self.versions
            .values()
            .rev()
            .find(|v| v.closed_at.is_some() && !v.defunct)
    }

    /// All versions marked defunct, in ascending number order.
    pub fn defunct(&self) -> impl Iterator<Item = &DomainVersion> {
        self.versions.values().filter(|v| v.defunct)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainVersion> {
        self.versions.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
