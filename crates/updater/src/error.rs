use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Errors failing one update, compaction, or maintenance attempt.
///
/// None of these are retried internally: a failed attempt leaves the
/// partition's installed base untouched and the caller owns retry and
/// backoff policy.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A file the update plan requires is absent from the remote store.
    #[error("missing remote file: {0}")]
    MissingRemoteFile(String),

    /// The update was cancelled between states. Reported as a failure,
    /// never as silent success.
    #[error("update interrupted")]
    Interrupted,

    /// A fixed-value-store failure (corrupt footer, order violation, ...).
    #[error(transparent)]
    Cueball(#[from] cueball::CueballError),

    /// A record-log failure.
    #[error(transparent)]
    Curly(#[from] curly::CurlyError),

    /// A version-chain or planning failure.
    #[error(transparent)]
    Domain(#[from] domain::DomainError),
}
