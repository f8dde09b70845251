//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use kitty_core::CompressionReport;
use kitty_core::PublishReport;
use kitty_core::Status;
use kitty_core::prefs::DisplayMode;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn headline(&self, status: &Status) {
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {status}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(&status.to_string());
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_compression_result(
        &self,
        compression: &CompressionReport,
        saved: &PublishReport,
        status: &Status,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline(status);
        self.line(&format!("  Files staged:     {}", compression.files_staged));
        self.line(&format!(
            "  Folders staged:   {}",
            compression.directories_staged
        ));
        self.line(&format!(
            "  Input size:       {}",
            Self::format_size(compression.bytes_staged)
        ));
        self.line(&format!(
            "  Archive size:     {}",
            Self::format_size(saved.bytes_written)
        ));

        if self.verbose {
            self.line(&format!(
                "  Ratio:            {:.2}",
                compression.compression_ratio()
            ));
            if saved.items_replaced > 0 {
                self.line("  Replaced an existing archive");
            }
            self.line(&format!(
                "  Duration:         {:?}",
                compression.duration + saved.duration
            ));
        }

        Ok(())
    }

    fn format_extraction_result(&self, report: &PublishReport, status: &Status) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline(status);
        self.line(&format!("  Folder:           {}", report.target_name));
        self.line(&format!("  Files written:    {}", report.files_written));
        self.line(&format!(
            "  Folders created:  {}",
            report.directories_created
        ));
        self.line(&format!(
            "  Total size:       {}",
            Self::format_size(report.bytes_written)
        ));

        if self.verbose {
            self.line(&format!("  Replaced:         {}", report.items_replaced));
            self.line(&format!("  Duration:         {:?}", report.duration));
        }

        Ok(())
    }

    fn format_theme(&self, mode: DisplayMode, changed: Option<&Status>) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        match changed {
            Some(status) => self.headline(status),
            None => self.line(&mode.to_string()),
        }
        Ok(())
    }

    fn format_error(&self, _operation: &str, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}
