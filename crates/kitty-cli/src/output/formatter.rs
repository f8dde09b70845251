//! Output formatter trait for CLI results.

use anyhow::Result;
use kitty_core::CompressionReport;
use kitty_core::PublishReport;
use kitty_core::Status;
use kitty_core::prefs::DisplayMode;
use serde::Serialize;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format a compression whose archive was saved
    fn format_compression_result(
        &self,
        compression: &CompressionReport,
        saved: &PublishReport,
        status: &Status,
    ) -> Result<()>;

    /// Format extraction result
    fn format_extraction_result(&self, report: &PublishReport, status: &Status) -> Result<()>;

    /// Format the display mode, with the status line when it changed
    fn format_theme(&self, mode: DisplayMode, changed: Option<&Status>) -> Result<()>;

    /// Format error message
    fn format_error(&self, operation: &str, error: &anyhow::Error);

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, message: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: OutcomeStatus::Success,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> JsonOutput<()> {
        JsonOutput {
            operation: operation.into(),
            status: OutcomeStatus::Error,
            message: None,
            data: None,
            error: Some(error.into()),
        }
    }
}
