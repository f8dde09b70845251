//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use kitty_core::CompressionReport;
use kitty_core::PublishReport;
use kitty_core::Status;
use kitty_core::prefs::DisplayMode;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CompressionOutput<'a> {
    compression: &'a CompressionReport,
    saved: &'a PublishReport,
}

#[derive(Serialize)]
struct ThemeOutput {
    display_mode: DisplayMode,
    changed: bool,
}

impl OutputFormatter for JsonFormatter {
    fn format_compression_result(
        &self,
        compression: &CompressionReport,
        saved: &PublishReport,
        status: &Status,
    ) -> Result<()> {
        let data = CompressionOutput { compression, saved };
        Self::output(&JsonOutput::success("compress", status.to_string(), data))
    }

    fn format_extraction_result(&self, report: &PublishReport, status: &Status) -> Result<()> {
        Self::output(&JsonOutput::success("extract", status.to_string(), report))
    }

    fn format_theme(&self, mode: DisplayMode, changed: Option<&Status>) -> Result<()> {
        let message = changed.map_or_else(|| mode.to_string(), ToString::to_string);
        let data = ThemeOutput {
            display_mode: mode,
            changed: changed.is_some(),
        };
        Self::output(&JsonOutput::success("theme", message, data))
    }

    fn format_error(&self, operation: &str, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error(operation, format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            message,
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
