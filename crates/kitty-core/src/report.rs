//! Operation reports.

use std::time::Duration;

use serde::Serialize;

/// Report of a compression run, from staging to the staged archive.
///
/// # Examples
///
/// ```
/// use kitty_core::report::CompressionReport;
///
/// let mut report = CompressionReport::default();
/// report.bytes_staged = 1000;
/// report.archive_size = 250;
/// assert_eq!(report.compression_ratio(), 4.0);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompressionReport {
    /// Final file name of the archive.
    pub archive_name: String,

    /// Files copied into the staging root.
    pub files_staged: usize,

    /// Directories created in the staging root, top-level trees included.
    pub directories_staged: usize,

    /// Bytes copied into the staging root.
    pub bytes_staged: u64,

    /// Size of the archive produced by the engine.
    pub archive_size: u64,

    /// Wall time from staging to engine completion.
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,

    /// Top-level names that were renamed or replaced by the collision policy.
    pub collisions: Vec<String>,
}

impl CompressionReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns staged bytes divided by archive size, or `0.0` when either
    /// is zero.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_staged == 0 || self.archive_size == 0 {
            return 0.0;
        }
        self.bytes_staged as f64 / self.archive_size as f64
    }

    /// Returns whether the collision policy had to act.
    #[must_use]
    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }
}

/// Report of publishing a result into a destination tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    /// Name of the item created directly under the destination: the archive
    /// file, or the extraction root folder.
    pub target_name: String,

    /// Files written.
    pub files_written: usize,

    /// Directories created. Directories that already existed are reused and
    /// not counted.
    pub directories_created: usize,

    /// Pre-existing files deleted before being rewritten.
    pub items_replaced: usize,

    /// Bytes streamed into the destination.
    pub bytes_written: u64,

    /// Wall time of the operation.
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl PublishReport {
    /// Creates an empty report for `target_name`.
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            ..Self::default()
        }
    }

    /// Returns files plus directories created.
    #[must_use]
    pub const fn total_items(&self) -> usize {
        self.files_written + self.directories_created
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_ratio_edge_cases() {
        let mut report = CompressionReport::new();
        assert!((report.compression_ratio() - 0.0).abs() < f64::EPSILON);
        report.bytes_staged = 300;
        assert!((report.compression_ratio() - 0.0).abs() < f64::EPSILON);
        report.archive_size = 100;
        assert!((report.compression_ratio() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_publish_report_totals() {
        let mut report = PublishReport::new("photos");
        report.files_written = 4;
        report.directories_created = 2;
        assert_eq!(report.target_name, "photos");
        assert_eq!(report.total_items(), 6);
    }
}
