//! Compiler and session configuration.

/// Configuration for [`Compiler`](crate::Compiler).
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// Structural statement cache configuration.
    pub cache: StatementCacheConfig,
}

impl CompilerConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of independently locked cache shards (at least 1).
    pub fn cache_shards(mut self, shards: usize) -> Self {
        self.cache.shards = shards.max(1);
        self
    }

    /// Compile every request afresh.
    pub fn no_cache(mut self) -> Self {
        self.cache.enabled = false;
        self
    }
}

/// Structural statement cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementCacheConfig {
    pub enabled: bool,
    pub shards: usize,
}

impl Default for StatementCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            shards: 16,
        }
    }
}

/// Configuration for [`Session`](crate::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Rows per multi-row statement in `insert_all`/`update_all`/`merge_all`.
    pub batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

impl SessionConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}
