//! Opaque, permission-scoped storage abstraction.
//!
//! The pipeline never sees real paths on the user side: items are addressed
//! through [`Handle`]s handed out by a [`StorageProvider`], which decides what
//! a handle means and which operations are allowed on it.

pub mod local;
pub mod memory;

use std::fmt;
use std::io;
use std::io::Read;
use std::io::Write;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Opaque reference to an item granted by a storage provider.
///
/// The raw identifier carries no guaranteed structure. Providers commonly
/// use a `scheme:path` shape, which naming falls back to when no display
/// name is available.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    /// Wraps a raw provider identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw provider identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a storage item is a leaf or a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Leaf with byte content.
    File,
    /// Tree with enumerable children.
    Directory,
}

/// One child returned by [`StorageProvider::list_children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    /// Handle of the child.
    pub handle: Handle,
    /// Display name, when the provider knows one.
    pub name: Option<String>,
    /// File or directory.
    pub kind: ItemKind,
}

impl ChildEntry {
    /// Returns `true` for directory children.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == ItemKind::Directory
    }
}

/// Handle-based storage collaborator.
///
/// Implementations must be shareable across the interactive thread and the
/// worker running an operation.
pub trait StorageProvider: Send + Sync {
    /// Opens a readable stream on a file.
    fn open_read(&self, handle: &Handle) -> io::Result<Box<dyn Read + Send>>;

    /// Opens a writable stream on a file, truncating existing content.
    fn open_write(&self, handle: &Handle) -> io::Result<Box<dyn Write + Send>>;

    /// Lists the children of a tree in provider-defined order.
    fn list_children(&self, tree: &Handle) -> io::Result<Vec<ChildEntry>>;

    /// Looks up a direct child by display name.
    fn find_child(&self, tree: &Handle, name: &str) -> io::Result<Option<ChildEntry>> {
        Ok(self
            .list_children(tree)?
            .into_iter()
            .find(|child| child.name.as_deref() == Some(name)))
    }

    /// Creates an empty file named `name` under `tree`.
    fn create_file(&self, tree: &Handle, name: &str) -> io::Result<Handle>;

    /// Creates a directory named `name` under `tree`.
    fn create_directory(&self, tree: &Handle, name: &str) -> io::Result<Handle>;

    /// Deletes an item; directories are deleted with their contents.
    fn delete(&self, handle: &Handle) -> io::Result<()>;

    /// Friendly name of an item, if the provider knows one.
    fn display_name(&self, handle: &Handle) -> Option<String>;

    /// Kind of an item.
    fn kind(&self, handle: &Handle) -> io::Result<ItemKind>;
}

/// Rejects names that would address anything but a direct child.
pub(crate) fn validate_child_name(name: &str) -> io::Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid item name: {name:?}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip() {
        let handle = Handle::new("primary:Downloads/a.txt");
        assert_eq!(handle.as_str(), "primary:Downloads/a.txt");
        assert_eq!(handle.to_string(), "primary:Downloads/a.txt");
    }

    #[test]
    fn test_validate_child_name() {
        assert!(validate_child_name("report.txt").is_ok());
        assert!(validate_child_name("with space (1).txt").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b", "nul\0"] {
            assert!(validate_child_name(bad).is_err(), "{bad:?} accepted");
        }
    }
}
