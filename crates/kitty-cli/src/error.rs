//! Error conversion utilities for CLI.
//!
//! Converts kitty-core's typed errors (thiserror) into user-facing
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use kitty_core::ErrorCategory;
use kitty_core::PipelineError;

/// Converts a `PipelineError` into an anyhow error whose first line is the
/// status message, followed by the cause and a hint where one helps.
pub fn convert_pipeline_error(err: PipelineError) -> anyhow::Error {
    let status = err.status_message();
    match &err {
        PipelineError::NothingSelected => anyhow!(
            "{status}\n\
             HINT: Pass one or more FILE arguments, or a folder with --tree."
        ),
        PipelineError::AlreadyRunning { .. } => anyhow!(
            "{status}\n\
             HINT: Wait for the running operation to finish."
        ),
        PipelineError::DepthLimitExceeded { max, .. } => anyhow!(
            "{status}\n\
             HINT: The folder is nested deeper than {max} levels. Use --max-depth to allow more."
        ),
        PipelineError::NameCollision { name } => anyhow!(
            "{status}\n\
             HINT: Two inputs are both named '{name}'. Use --on-collision suffix to keep both."
        ),
        PipelineError::CycleDetected { .. } => anyhow!(
            "{status}\n\
             HINT: The folder contains a link back to one of its parents."
        ),
        PipelineError::InvalidConfiguration { .. } => anyhow!(
            "{status}\n\
             HINT: Check --level, --name and --staging-dir."
        ),
        _ => match err.category() {
            ErrorCategory::Staging => anyhow!(
                "{status}\n\
                 HINT: An input could not be copied. Check that it is readable and that the \
                 staging directory has free space."
            ),
            ErrorCategory::Destination => anyhow!(
                "{status}\n  Cause: {err}\n\
                 HINT: Check that the output folder exists and is writable."
            ),
            ErrorCategory::Engine => anyhow!(
                "{status}\n  Cause: {err}\n\
                 HINT: The archive may be corrupted or not a kitty archive."
            ),
            _ => anyhow::Error::from(err),
        },
    }
}

/// Adds CLI context to a pipeline result.
pub fn add_pipeline_context<T>(result: Result<T, PipelineError>) -> anyhow::Result<T> {
    result.map_err(convert_pipeline_error)
}
