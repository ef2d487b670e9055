use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::{EvictionPolicy, LevelCacheError, Result};

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name identifying the cache instance; must not be blank
    pub cache_name: String,
    /// Consumed by front-ends deciding how verbose to be; the core ignores it
    pub logging_enabled: bool,
    /// Hint for sizing external worker pools
    pub concurrency_level: usize,
    /// Upper bound on the number of levels
    pub max_levels: usize,
    /// Levels created, in order, when the cache is constructed
    pub levels: Vec<LevelConfig>,
}

/// Shape of a level created at construction time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub capacity: usize,
    #[serde(default)]
    pub policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_name: "level-cache-default".to_string(),
            logging_enabled: false,
            concurrency_level: 5,
            max_levels: 100,
            levels: Vec::new(),
        }
    }
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let config: CacheConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Reject settings the cache cannot be built from
    pub fn validate(&self) -> Result<()> {
        if self.cache_name.trim().is_empty() {
            return Err(LevelCacheError::Initialization(
                "cache name cannot be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Chaining builder for [`CacheConfig`]
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.config.cache_name = name.into();
        self
    }

    pub fn logging_enabled(mut self, enabled: bool) -> Self {
        self.config.logging_enabled = enabled;
        self
    }

    pub fn concurrency_level(mut self, level: usize) -> Self {
        self.config.concurrency_level = level;
        self
    }

    pub fn max_levels(mut self, max: usize) -> Self {
        self.config.max_levels = max;
        self
    }

    /// Append a level to create at construction time
    pub fn level(mut self, capacity: usize, policy: impl Into<EvictionPolicy>) -> Self {
        self.config.levels.push(LevelConfig {
            capacity,
            policy: policy.into(),
        });
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}
