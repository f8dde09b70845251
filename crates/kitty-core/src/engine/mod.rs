//! Archive engine boundary.
//!
//! The pipeline hands concrete staged paths to an [`ArchiveEngine`] and only
//! distinguishes success from failure: a zero status (compression) or a
//! returned top-level name (extraction). Both calls block and are always
//! made off the interactive thread.

pub mod tar_zst;

use std::path::Path;
use std::path::PathBuf;

use crate::progress::ProgressSender;

pub use tar_zst::TarZstEngine;

/// Compression succeeded.
pub const STATUS_OK: i32 = 0;

/// Reading inputs or writing the archive failed.
pub const STATUS_IO_ERROR: i32 = 1;

/// An input path was missing or unusable.
pub const STATUS_INVALID_INPUT: i32 = 2;

/// Concrete compression request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// Top-level paths to archive, in order.
    pub input_paths: Vec<PathBuf>,
    /// Archive file to create.
    pub output_path: PathBuf,
}

/// External compression and decompression collaborator.
///
/// # Examples
///
/// ```
/// use kitty_core::engine::ArchiveEngine;
/// use kitty_core::engine::ArchiveRequest;
/// use kitty_core::progress::ProgressSender;
/// use std::path::Path;
///
/// struct AlwaysFails;
///
/// impl ArchiveEngine for AlwaysFails {
///     fn compress(&self, _: &ArchiveRequest, _: &ProgressSender) -> i32 {
///         7
///     }
///
///     fn decompress(&self, _: &Path, _: &Path, _: &ProgressSender) -> Option<String> {
///         None
///     }
/// }
/// ```
pub trait ArchiveEngine: Send + Sync {
    /// Writes an archive of `request.input_paths` to `request.output_path`.
    ///
    /// Returns [`STATUS_OK`] on success; any other value is an
    /// engine-defined failure.
    fn compress(&self, request: &ArchiveRequest, progress: &ProgressSender) -> i32;

    /// Expands `archive` into `output_dir`.
    ///
    /// Returns the name of the single top-level entry created directly
    /// under `output_dir`, or `None` on failure.
    fn decompress(
        &self,
        archive: &Path,
        output_dir: &Path,
        progress: &ProgressSender,
    ) -> Option<String>;
}
