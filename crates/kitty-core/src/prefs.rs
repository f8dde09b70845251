//! Persisted user preferences.
//!
//! The only persisted state is the display mode, stored as a small JSON
//! document. Loading never fails: a missing or unreadable file yields the
//! defaults.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

/// Light or dark presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Light theme.
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

impl DisplayMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Short name, e.g. `"Dark"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Mode", self.name())
    }
}

/// Preference document.
///
/// # Examples
///
/// ```
/// use kitty_core::prefs::DisplayMode;
/// use kitty_core::prefs::Preferences;
///
/// let mut prefs = Preferences::default();
/// assert_eq!(prefs.toggle_display_mode(), DisplayMode::Dark);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Current display mode.
    pub display_mode: DisplayMode,
}

impl Preferences {
    /// Reads preferences from `path`, falling back to defaults.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "cannot read preferences");
                }
                return Self::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed preferences");
            Self::default()
        })
    }

    /// Writes preferences to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }

    /// Flips the display mode and returns the new one.
    pub fn toggle_display_mode(&mut self) -> DisplayMode {
        self.display_mode = self.display_mode.toggled();
        self.display_mode
    }
}
