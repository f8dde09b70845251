//! Filesystem-backed storage provider with explicit grants.
//!
//! Handles are `file:` identifiers over absolute paths, but every operation
//! is checked against the set of granted roots. Nothing outside a granted
//! root can be read, listed, created or deleted, and revoking a grant
//! immediately invalidates every handle beneath it.

use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;

use super::ChildEntry;
use super::Handle;
use super::ItemKind;
use super::StorageProvider;
use super::validate_child_name;

const SCHEME: &str = "file:";

/// Storage provider over the local filesystem.
///
/// # Examples
///
/// ```no_run
/// use kitty_core::storage::LocalStorage;
/// use kitty_core::storage::StorageProvider;
///
/// let storage = LocalStorage::new();
/// let docs = storage.grant("/home/user/docs")?;
/// for child in storage.list_children(&docs)? {
///     println!("{:?}", child.name);
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalStorage {
    grants: Arc<RwLock<Vec<PathBuf>>>,
}

impl LocalStorage {
    /// Creates a provider with no grants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants access to `path` and everything below it.
    ///
    /// Returns the handle of `path` itself.
    pub fn grant(&self, path: impl AsRef<Path>) -> io::Result<Handle> {
        let canonical = fs::canonicalize(path.as_ref())?;
        let mut grants = self
            .grants
            .write()
            .map_err(|_| io::Error::other("grant table poisoned"))?;
        if !grants.contains(&canonical) {
            tracing::debug!(path = %canonical.display(), "storage grant added");
            grants.push(canonical.clone());
        }
        Ok(Self::handle_for(&canonical))
    }

    /// Revokes a grant previously returned by [`grant`](Self::grant).
    pub fn revoke(&self, handle: &Handle) -> io::Result<()> {
        let path = Self::raw_path(handle)?;
        let mut grants = self
            .grants
            .write()
            .map_err(|_| io::Error::other("grant table poisoned"))?;
        grants.retain(|granted| granted != &path);
        tracing::debug!(path = %path.display(), "storage grant revoked");
        Ok(())
    }

    fn handle_for(path: &Path) -> Handle {
        Handle::new(format!("{SCHEME}{}", path.display()))
    }

    fn raw_path(handle: &Handle) -> io::Result<PathBuf> {
        handle
            .as_str()
            .strip_prefix(SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a local handle: {handle}"),
                )
            })
    }

    fn resolve(&self, handle: &Handle) -> io::Result<PathBuf> {
        let path = Self::raw_path(handle)?;
        let mut components = path.components();
        let normalized = matches!(
            components.next(),
            Some(Component::RootDir | Component::Prefix(_))
        ) && components.all(|c| match c {
            Component::Normal(_) => true,
            Component::RootDir => cfg!(windows),
            Component::Prefix(_) | Component::CurDir | Component::ParentDir => false,
        });
        if !normalized {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("handle path is not normalized: {}", path.display()),
            ));
        }
        let grants = self
            .grants
            .read()
            .map_err(|_| io::Error::other("grant table poisoned"))?;
        if grants.iter().any(|root| path.starts_with(root)) {
            Ok(path)
        } else {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("no grant covers {}", path.display()),
            ))
        }
    }

    fn resolve_child(&self, tree: &Handle, name: &str) -> io::Result<PathBuf> {
        validate_child_name(name)?;
        let dir = self.resolve(tree)?;
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", dir.display()),
            ));
        }
        Ok(dir.join(name))
    }
}

impl StorageProvider for LocalStorage {
    fn open_read(&self, handle: &Handle) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(self.resolve(handle)?)?))
    }

    fn open_write(&self, handle: &Handle) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(self.resolve(handle)?)?))
    }

    fn list_children(&self, tree: &Handle) -> io::Result<Vec<ChildEntry>> {
        let dir = self.resolve(tree)?;
        fs::read_dir(&dir)?
            .map(|entry| -> io::Result<Option<ChildEntry>> {
                let entry = entry?;
                let file_type = entry.file_type()?;
                let path = entry.path();
                let kind = if file_type.is_dir() {
                    ItemKind::Directory
                } else if file_type.is_file() {
                    ItemKind::File
                } else {
                    tracing::warn!(path = %path.display(), "skipping link or special file");
                    return Ok(None);
                };
                Ok(Some(ChildEntry {
                    handle: Self::handle_for(&path),
                    name: Some(entry.file_name().to_string_lossy().into_owned()),
                    kind,
                }))
            })
            .filter_map(Result::transpose)
            .collect()
    }

    fn find_child(&self, tree: &Handle, name: &str) -> io::Result<Option<ChildEntry>> {
        let path = self.resolve_child(tree, name)?;
        match fs::symlink_metadata(&path) {
            Ok(metadata) => Ok(Some(ChildEntry {
                handle: Self::handle_for(&path),
                name: Some(name.to_string()),
                kind: if metadata.is_dir() {
                    ItemKind::Directory
                } else {
                    ItemKind::File
                },
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_file(&self, tree: &Handle, name: &str) -> io::Result<Handle> {
        let path = self.resolve_child(tree, name)?;
        File::options().write(true).create_new(true).open(&path)?;
        Ok(Self::handle_for(&path))
    }

    fn create_directory(&self, tree: &Handle, name: &str) -> io::Result<Handle> {
        let path = self.resolve_child(tree, name)?;
        fs::create_dir(&path)?;
        Ok(Self::handle_for(&path))
    }

    fn delete(&self, handle: &Handle) -> io::Result<()> {
        let path = self.resolve(handle)?;
        if fs::symlink_metadata(&path)?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
    }

    fn display_name(&self, handle: &Handle) -> Option<String> {
        Self::raw_path(handle)
            .ok()?
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    fn kind(&self, handle: &Handle) -> io::Result<ItemKind> {
        if fs::metadata(self.resolve(handle)?)?.is_dir() {
            Ok(ItemKind::Directory)
        } else {
            Ok(ItemKind::File)
        }
    }
}
