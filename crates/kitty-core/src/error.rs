//! Error types for the staging and transfer pipeline.

use std::io;
use thiserror::Error;

use crate::guard::OperationKind;
use crate::guard::OperationState;

/// Result type alias using `PipelineError`.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Broad class of a pipeline failure.
///
/// Every class is terminal for the operation it interrupts and none is fatal
/// to the process: the guard is released and the session returns to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Nothing was selected.
    Selection,
    /// A same-kind operation is already running, or a guard transition was
    /// illegal.
    Guard,
    /// Copying input into the staging area failed.
    Staging,
    /// The archive engine reported failure.
    Engine,
    /// The destination could not be written after the engine succeeded.
    Destination,
    /// The pipeline was configured with invalid values.
    Configuration,
}

/// Errors that can occur while staging, running the engine, or publishing.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No file or tree reference is selected.
    #[error("nothing selected")]
    NothingSelected,

    /// An operation of the same kind holds the guard.
    #[error("{kind} operation already in progress")]
    AlreadyRunning {
        /// Kind of the rejected operation.
        kind: OperationKind,
    },

    /// A guard transition that the state machine does not allow.
    #[error("illegal {kind} transition: {from} -> {to}")]
    IllegalTransition {
        /// Kind whose latch was addressed.
        kind: OperationKind,
        /// State the caller expected to leave.
        from: OperationState,
        /// State the caller tried to enter.
        to: OperationState,
    },

    /// A source stream could not be opened or a copy failed mid-stream.
    #[error("staging failed for '{item}': {source}")]
    Staging {
        /// Display name of the item being staged.
        item: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Tree mirroring descended deeper than the configured limit.
    #[error("tree depth limit of {max} exceeded at '{item}'")]
    DepthLimitExceeded {
        /// Display name of the item where the limit was hit.
        item: String,
        /// Configured maximum depth.
        max: usize,
    },

    /// Tree mirroring reached a handle already on the current descent path.
    #[error("directory cycle detected at '{item}'")]
    CycleDetected {
        /// Display name of the repeated tree.
        item: String,
    },

    /// Two inputs map to the same staging-root name under the `Reject`
    /// collision policy.
    #[error("name collision in staging root: '{name}'")]
    NameCollision {
        /// Colliding top-level name.
        name: String,
    },

    /// The engine returned a non-zero compression status.
    #[error("compression failed (engine status {status})")]
    CompressionFailed {
        /// Engine-defined status code.
        status: i32,
    },

    /// The engine returned no top-level entry for an extraction.
    #[error("extraction failed")]
    ExtractionFailed,

    /// The destination was inaccessible or an item could not be created.
    #[error("destination error during {kind}: {reason}")]
    Destination {
        /// Operation whose result was being published.
        kind: OperationKind,
        /// What went wrong.
        reason: String,
        /// Underlying I/O error, when there was one.
        #[source]
        source: Option<io::Error>,
    },

    /// Configuration values are out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason the configuration was rejected.
        reason: String,
    },

    /// I/O failure in the local staging area.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// Wraps an I/O error raised while staging `item`.
    pub fn staging(item: impl Into<String>, source: io::Error) -> Self {
        Self::Staging {
            item: item.into(),
            source,
        }
    }

    /// Wraps a failure to write into the destination.
    pub fn destination(
        kind: OperationKind,
        reason: impl Into<String>,
        source: Option<io::Error>,
    ) -> Self {
        Self::Destination {
            kind,
            reason: reason.into(),
            source,
        }
    }

    /// Returns the error class.
    ///
    /// # Examples
    ///
    /// ```
    /// use kitty_core::ErrorCategory;
    /// use kitty_core::PipelineError;
    ///
    /// let err = PipelineError::CompressionFailed { status: 3 };
    /// assert_eq!(err.category(), ErrorCategory::Engine);
    /// ```
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NothingSelected => ErrorCategory::Selection,
            Self::AlreadyRunning { .. } | Self::IllegalTransition { .. } => ErrorCategory::Guard,
            Self::Staging { .. }
            | Self::DepthLimitExceeded { .. }
            | Self::CycleDetected { .. }
            | Self::NameCollision { .. }
            | Self::Io(_) => ErrorCategory::Staging,
            Self::CompressionFailed { .. } | Self::ExtractionFailed => ErrorCategory::Engine,
            Self::Destination { .. } => ErrorCategory::Destination,
            Self::InvalidConfiguration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns `true` if the engine had already succeeded when this error
    /// occurred.
    #[must_use]
    pub const fn after_engine_success(&self) -> bool {
        matches!(self, Self::Destination { .. })
    }

    /// Returns the human-readable status line surfaced to the user.
    ///
    /// Engine failures map to fixed generic messages; the specific engine
    /// status is only available through `Display`.
    ///
    /// # Examples
    ///
    /// ```
    /// use kitty_core::PipelineError;
    ///
    /// let err = PipelineError::CompressionFailed { status: 7 };
    /// assert_eq!(err.status_message(), "Compression failed.");
    /// ```
    #[must_use]
    pub fn status_message(&self) -> String {
        match self {
            Self::NothingSelected => "No input selected.".to_string(),
            Self::AlreadyRunning {
                kind: OperationKind::Compress,
            } => "Already compressing...".to_string(),
            Self::AlreadyRunning {
                kind: OperationKind::Extract,
            } => "Extraction already in progress...".to_string(),
            Self::CompressionFailed { .. } => "Compression failed.".to_string(),
            Self::ExtractionFailed => "Failed to extract: extraction failed".to_string(),
            Self::Destination {
                kind: OperationKind::Compress,
                ..
            } => "Failed to save archive.".to_string(),
            Self::Destination {
                kind: OperationKind::Extract,
                reason,
                ..
            } => format!("Failed to extract: {reason}"),
            other => format!("Error: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::NothingSelected;
        assert_eq!(err.to_string(), "nothing selected");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
        assert_eq!(err.category(), ErrorCategory::Staging);
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            PipelineError::NothingSelected.category(),
            ErrorCategory::Selection
        );
        assert_eq!(
            PipelineError::AlreadyRunning {
                kind: OperationKind::Extract
            }
            .category(),
            ErrorCategory::Guard
        );
        assert_eq!(
            PipelineError::staging("a.txt", io::Error::other("boom")).category(),
            ErrorCategory::Staging
        );
        assert_eq!(
            PipelineError::ExtractionFailed.category(),
            ErrorCategory::Engine
        );
        assert_eq!(
            PipelineError::destination(OperationKind::Compress, "gone", None).category(),
            ErrorCategory::Destination
        );
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            PipelineError::NothingSelected.status_message(),
            "No input selected."
        );
        assert_eq!(
            PipelineError::AlreadyRunning {
                kind: OperationKind::Compress
            }
            .status_message(),
            "Already compressing..."
        );
        assert_eq!(
            PipelineError::destination(OperationKind::Compress, "denied", None).status_message(),
            "Failed to save archive."
        );
        assert_eq!(
            PipelineError::destination(OperationKind::Extract, "denied", None).status_message(),
            "Failed to extract: denied"
        );
        let staging = PipelineError::staging("a.txt", io::Error::other("boom"));
        assert!(staging.status_message().starts_with("Error: "));
        assert!(staging.status_message().contains("a.txt"));
    }

    #[test]
    fn test_after_engine_success() {
        assert!(PipelineError::destination(OperationKind::Extract, "x", None).after_engine_success());
        assert!(!PipelineError::ExtractionFailed.after_engine_success());
    }
}
