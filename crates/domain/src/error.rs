use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Errors raised by domain metadata and update planning.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An underlying I/O error while scanning a partition directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A version number absent from the known version chain.
    #[error("unknown domain version {0}")]
    UnknownVersion(u32),

    /// A delta whose parent is absent from the known version chain. The
    /// chain is broken and no plan through it is safe.
    #[error("version {version} names missing parent {parent}")]
    MissingParent { version: u32, parent: u32 },

    /// Planning reached a delta with no base beneath it.
    #[error("no base ancestor beneath version {0}")]
    NoBaseAncestor(u32),
}
