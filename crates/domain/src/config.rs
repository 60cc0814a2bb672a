use crate::files::FileFormat;
use crate::partitioner::{Crc32KeyHasher, Crc32Partitioner, KeyHasher, Partitioner};
use cueball::CueballOptions;
use curly::CurlyOptions;

/// Storage-engine selection and geometry for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineConfig {
    /// Fixed-value-size files.
    Cueball(CueballOptions),
    /// Variable-length record logs with a cueball key index.
    Curly(CurlyOptions),
}

impl EngineConfig {
    /// Width of the key hash every file of this domain uses.
    #[must_use]
    pub fn key_hash_size(&self) -> usize {
        match self {
            EngineConfig::Cueball(options) => options.key_hash_size,
            EngineConfig::Curly(options) => options.index.key_hash_size,
        }
    }

    /// Format suffix of this domain's partition files.
    #[must_use]
    pub fn format(&self) -> FileFormat {
        match self {
            EngineConfig::Cueball(_) => FileFormat::Cueball,
            EngineConfig::Curly(_) => FileFormat::Curly,
        }
    }
}

/// A sharded, versioned key-value namespace: a name, a partition count,
/// the functions routing keys to partitions and hashes, and the storage
/// engine its files use.
pub struct Domain {
    name: String,
    num_partitions: usize,
    engine: EngineConfig,
    partitioner: Box<dyn Partitioner>,
    key_hasher: Box<dyn KeyHasher>,
}

impl Domain {
    /// Creates a domain with the default CRC32 partitioner and hasher.
    ///
    /// # Panics
    ///
    /// Panics if `num_partitions` is zero.
    #[must_use]
    pub fn new(name: impl Into<String>, num_partitions: usize, engine: EngineConfig) -> Self {
        assert!(num_partitions > 0, "domain needs at least one partition");
        Self {
            name: name.into(),
            num_partitions,
            engine,
            partitioner: Box::new(Crc32Partitioner),
            key_hasher: Box::new(Crc32KeyHasher),
        }
    }

    #[must_use]
    pub fn with_partitioner(mut self, partitioner: Box<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    #[must_use]
    pub fn with_key_hasher(mut self, key_hasher: Box<dyn KeyHasher>) -> Self {
        self.key_hasher = key_hasher;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    #[must_use]
    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Partition owning `key`.
    #[must_use]
    pub fn partition_for_key(&self, key: &[u8]) -> usize {
        self.partitioner.partition(key, self.num_partitions)
    }

    /// Fixed-width key hash of `key` under this domain's geometry.
    #[must_use]
    pub fn hash_key(&self, key: &[u8]) -> Vec<u8> {
        self.key_hasher.hash(key, self.engine.key_hash_size())
    }
}
