//! Base-name derivation for archives and extraction roots.
//!
//! The archive written for a selection is named after its first-selected
//! reference, and an extracted tree is placed in a folder named after the
//! archive itself. Both use the same derivation: the display name with its
//! final extension removed, falling back to the raw handle identifier when
//! the provider offers no display name.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::storage::Handle;
use crate::storage::StorageProvider;

/// Removes the final `.extension` from `name`.
///
/// Names without a dot are returned unchanged, as are dot-files such as
/// `.profile` whose only dot is the leading one.
///
/// # Examples
///
/// ```
/// use kitty_core::naming::strip_extension;
///
/// assert_eq!(strip_extension("report.v2.kitty"), "report.v2");
/// assert_eq!(strip_extension("README"), "README");
/// assert_eq!(strip_extension(".profile"), ".profile");
/// ```
#[must_use]
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Derives the base name of a reference.
///
/// With a display name, its extension is stripped. Without one, the raw
/// identifier is parsed: everything up to the last `:` is dropped, then
/// everything up to the last `/`, then the extension. Returns `None` when
/// nothing usable remains.
///
/// # Examples
///
/// ```
/// use kitty_core::naming::compute_base_name;
///
/// assert_eq!(
///     compute_base_name(Some("report.v2.kitty"), "ignored").as_deref(),
///     Some("report.v2")
/// );
/// assert_eq!(
///     compute_base_name(None, "primary:Downloads/archive.kitty").as_deref(),
///     Some("archive")
/// );
/// ```
#[must_use]
pub fn compute_base_name(display_name: Option<&str>, raw_id: &str) -> Option<String> {
    let base = match display_name {
        Some(name) => strip_extension(name),
        None => {
            let after_scheme = raw_id.rsplit(':').next().unwrap_or(raw_id);
            let segment = after_scheme.rsplit('/').next().unwrap_or(after_scheme);
            strip_extension(segment)
        }
    };
    (!base.is_empty()).then(|| base.to_string())
}

/// Derives the base name of a handle through its provider.
pub fn base_name_of(storage: &dyn StorageProvider, handle: &Handle) -> Option<String> {
    compute_base_name(storage.display_name(handle).as_deref(), handle.as_str())
}

/// Display name of a handle, falling back to the last identifier segment.
pub fn display_name_or_segment(storage: &dyn StorageProvider, handle: &Handle) -> Option<String> {
    storage.display_name(handle).or_else(|| {
        handle
            .as_str()
            .rsplit(['/', ':'])
            .next()
            .filter(|segment| !segment.is_empty())
            .map(ToString::to_string)
    })
}

/// Joins a base name and an archive extension.
///
/// # Examples
///
/// ```
/// use kitty_core::naming::archive_file_name;
///
/// assert_eq!(archive_file_name("photos", "kitty"), "photos.kitty");
/// ```
#[must_use]
pub fn archive_file_name(base: &str, extension: &str) -> String {
    format!("{base}.{extension}")
}

/// Time-stamped base name used when no reference yields one.
#[must_use]
pub fn fallback_base_name(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{prefix}_{millis}")
}

/// Returns `name` with ` (n)` inserted before its extension.
///
/// # Examples
///
/// ```
/// use kitty_core::naming::numbered_name;
///
/// assert_eq!(numbered_name("notes.txt", 1), "notes (1).txt");
/// assert_eq!(numbered_name("photos", 2), "photos (2)");
/// ```
#[must_use]
pub fn numbered_name(name: &str, n: usize) -> String {
    let stem = strip_extension(name);
    let extension = &name[stem.len()..];
    format!("{stem} ({n}){extension}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("a.tar.zst"), "a.tar");
        assert_eq!(strip_extension("trailing."), "trailing");
        assert_eq!(strip_extension(""), "");
    }

    #[test]
    fn test_display_name_wins_over_raw_id() {
        assert_eq!(
            compute_base_name(Some("photo.jpg"), "primary:Other/thing.bin").as_deref(),
            Some("photo")
        );
    }

    #[test]
    fn test_raw_id_without_scheme() {
        assert_eq!(
            compute_base_name(None, "Downloads/notes.txt").as_deref(),
            Some("notes")
        );
        assert_eq!(compute_base_name(None, "plain").as_deref(), Some("plain"));
    }

    #[test]
    fn test_raw_id_uses_last_colon() {
        assert_eq!(
            compute_base_name(None, "content:tree:primary:Docs/a.kitty").as_deref(),
            Some("a")
        );
    }

    #[test]
    fn test_empty_results_are_none() {
        assert_eq!(compute_base_name(None, "primary:Downloads/"), None);
        assert_eq!(compute_base_name(Some(""), "x"), None);
    }

    #[test]
    fn test_base_name_of_unnamed_handle() {
        let storage = MemoryStorage::new();
        let root = storage.root();
        let handle = storage
            .add_unnamed_file(&root, "primary:Downloads/archive.kitty", b"")
            .unwrap();
        assert_eq!(base_name_of(&storage, &handle).as_deref(), Some("archive"));
        assert_eq!(
            display_name_or_segment(&storage, &handle).as_deref(),
            Some("archive.kitty")
        );
    }

    #[test]
    fn test_fallback_base_name_prefix() {
        assert!(fallback_base_name("archive").starts_with("archive_"));
    }

    #[test]
    fn test_numbered_name_dotfile() {
        assert_eq!(numbered_name(".env", 3), ".env (3)");
    }
}
