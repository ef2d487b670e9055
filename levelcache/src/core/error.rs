use std::fmt;
use thiserror::Error;

/// Kind of cache access that was attempted against an empty level stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    BulkRead,
    BulkWrite,
}

impl Operation {
    /// Whether this is one of the multi-key operations
    pub fn is_bulk(&self) -> bool {
        matches!(self, Self::BulkRead | Self::BulkWrite)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::BulkRead => "bulk read",
            Self::BulkWrite => "bulk write",
        };
        f.write_str(name)
    }
}

/// Main error type for LevelCache operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelCacheError {
    #[error("Cache initialization failed: {0}")]
    Initialization(String),

    #[error("Invalid level capacity: {0}")]
    LevelCreation(usize),

    #[error("Level limit exceeded: {current} of {max} levels in use")]
    LevelLimitExceeded { current: usize, max: usize },

    #[error("Cache level with id {0} not found")]
    UnknownTier(usize),

    #[error("No levels found for {0}")]
    NoTiers(Operation),
}

/// Result type alias for LevelCache operations
pub type Result<T> = std::result::Result<T, LevelCacheError>;
