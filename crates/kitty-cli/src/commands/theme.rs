//! Theme command: reads and toggles the persisted display mode.

use crate::cli::ThemeAction;
use crate::cli::ThemeArgs;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use kitty_core::Status;
use kitty_core::prefs::Preferences;

pub fn execute(args: &ThemeArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let mut prefs = Preferences::load(&args.prefs);

    match args.action.unwrap_or(ThemeAction::Show) {
        ThemeAction::Show => formatter.format_theme(prefs.display_mode, None),
        ThemeAction::Toggle => {
            let mode = prefs.toggle_display_mode();
            prefs.save(&args.prefs).with_context(|| {
                format!("failed to write preferences to '{}'", args.prefs.display())
            })?;
            tracing::debug!(mode = mode.name(), "display mode saved");
            formatter.format_theme(mode, Some(&Status::DisplayModeChanged(mode)))
        }
    }
}
