//! Configuration for the staging and transfer pipeline.

use std::path::PathBuf;

use crate::PipelineError;
use crate::Result;
use crate::copy::DEFAULT_CHUNK_SIZE;

/// Default archive file extension.
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "kitty";

/// Default maximum depth for tree mirroring.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 64;

/// How top-level name clashes in a staging root are resolved.
///
/// A clash happens when a directly selected file and a selected tree (or
/// two selected items from different parents) share a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// The later copy overwrites the earlier one.
    LastWriterWins,
    /// The operation fails with [`PipelineError::NameCollision`].
    Reject,
    /// The later copy is renamed `name (1).ext`, `name (2).ext`, ...
    #[default]
    Suffix,
}

/// Pipeline configuration.
///
/// # Examples
///
/// ```
/// use kitty_core::config::CollisionPolicy;
/// use kitty_core::config::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_collision_policy(CollisionPolicy::Reject)
///     .with_compression_level(9);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory under which staging roots are created.
    ///
    /// Default: the OS temp directory.
    pub staging_dir: PathBuf,

    /// Extension appended to archive base names, without the dot.
    ///
    /// Default: `"kitty"`.
    pub archive_extension: String,

    /// Chunk size of the streaming copy.
    ///
    /// Default: 256 KiB.
    pub copy_buffer_size: usize,

    /// Deepest tree level mirrored into staging.
    ///
    /// Default: 64.
    pub max_tree_depth: usize,

    /// Staging-root collision policy.
    ///
    /// Default: [`CollisionPolicy::Suffix`].
    pub collision_policy: CollisionPolicy,

    /// Compression level (1-9).
    ///
    /// Default: `6`.
    pub compression_level: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir(),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            copy_buffer_size: DEFAULT_CHUNK_SIZE,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            collision_policy: CollisionPolicy::default(),
            compression_level: 6,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Sets the archive extension. A leading dot is ignored.
    #[must_use]
    pub fn with_archive_extension(mut self, extension: &str) -> Self {
        self.archive_extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Sets the copy chunk size.
    #[must_use]
    pub const fn with_copy_buffer_size(mut self, size: usize) -> Self {
        self.copy_buffer_size = size;
        self
    }

    /// Sets the maximum mirroring depth.
    #[must_use]
    pub const fn with_max_tree_depth(mut self, depth: usize) -> Self {
        self.max_tree_depth = depth;
        self
    }

    /// Sets the collision policy.
    #[must_use]
    pub const fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Sets the compression level.
    ///
    /// Out-of-range levels are reported by [`validate`](Self::validate).
    #[must_use]
    pub const fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = level;
        self
    }

    /// zstd level for the configured compression level.
    ///
    /// Level 6 maps to zstd's default of 3; 1 and 2 map directly; 7, 8 and 9
    /// map to 10, 15 and 19.
    #[allow(clippy::match_same_arms)]
    #[must_use]
    pub const fn zstd_level(&self) -> i32 {
        match self.compression_level {
            6 => 3,
            1 => 1,
            2 => 2,
            7 => 10,
            8 => 15,
            9 => 19,
            _ => 3,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfiguration`] if:
    /// - the compression level is outside 1-9
    /// - the archive extension is empty or contains a path separator
    /// - the copy buffer size or maximum tree depth is zero
    pub fn validate(&self) -> Result<()> {
        let reason = if !(1..=9).contains(&self.compression_level) {
            format!(
                "compression level must be 1-9, got {}",
                self.compression_level
            )
        } else if self.archive_extension.is_empty()
            || self.archive_extension.contains(['/', '\\'])
        {
            format!("invalid archive extension {:?}", self.archive_extension)
        } else if self.copy_buffer_size == 0 {
            "copy buffer size must be non-zero".to_string()
        } else if self.max_tree_depth == 0 {
            "maximum tree depth must be non-zero".to_string()
        } else {
            return Ok(());
        };
        Err(PipelineError::InvalidConfiguration { reason })
    }
}
