use crate::error::{DomainError, Result};
use crate::files::{FileFormat, FileKind, PartitionFileName};
use crate::version::DomainVersions;

/// The files needed to materialize one target version: a base plus the
/// deltas applying on top of it, in ascending version order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalUpdatePlan {
    pub base: u32,
    pub deltas: Vec<u32>,
}

impl IncrementalUpdatePlan {
    /// The version this plan materializes.
    #[must_use]
    pub fn target(&self) -> u32 {
        self.deltas.last().copied().unwrap_or(self.base)
    }

    /// Every remote file this plan needs, in fetch order.
    ///
    /// A curly version is a record file plus its cueball key index, so
    /// each curly version contributes two names.
    #[must_use]
    pub fn remote_files(&self, format: FileFormat) -> Vec<PartitionFileName> {
        let mut files = Vec::new();
        let mut push = |version: u32, kind: FileKind| {
            files.push(PartitionFileName::new(version, kind, format));
            if format == FileFormat::Curly {
                files.push(PartitionFileName::new(version, kind, FileFormat::Cueball));
            }
        };
        push(self.base, FileKind::Base);
        for &delta in &self.deltas {
            push(delta, FileKind::Delta);
        }
        files
    }
}

/// Computes incremental update plans from a domain's version chain.
pub struct UpdatePlanner;

impl UpdatePlanner {
    /// Parent version of `number`: `None` for a base, the named parent
    /// for a delta.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownVersion`] if `number` is not in the
    /// chain.
    pub fn parent_of(versions: &DomainVersions, number: u32) -> Result<Option<u32>> {
        Ok(versions.get(number)?.parent())
    }

    /// Walks the parent chain from `target` down to its nearest ancestor
    /// base, returning that base and the deltas between them in
    /// ascending version order.
    ///
    /// # Errors
    ///
    /// Fails on an unknown target, a delta naming a parent absent from
    /// the chain, or a chain with no base beneath the target.
    pub fn plan(versions: &DomainVersions, target: u32) -> Result<IncrementalUpdatePlan> {
        let mut deltas = Vec::new();
        let mut at = versions.get(target)?;
        let mut steps = 0usize;
        loop {
            // A parent cycle would otherwise walk forever.
            steps += 1;
            if steps > versions.len() {
                return Err(DomainError::NoBaseAncestor(target));
            }
            match at.parent() {
                None => {
                    deltas.reverse();
                    return Ok(IncrementalUpdatePlan {
                        base: at.number,
                        deltas,
                    });
                }
                Some(parent) => {
                    deltas.push(at.number);
                    at = versions.get(parent).map_err(|_| {
                        DomainError::MissingParent {
                            version: at.number,
                            parent,
                        }
                    })?;
                }
            }
        }
    }
}
