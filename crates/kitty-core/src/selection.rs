//! Input registry: the user's current selection.
//!
//! A [`Selection`] is an immutable snapshot. Commands on the
//! [`InputRegistry`] build a new snapshot and swap it in, so an operation
//! that took a snapshot never observes a selection mid-mutation.
//!
//! Files and the working tree are tracked independently: selecting files
//! replaces the file subset only, selecting a tree replaces the single tree
//! reference only. Both update the selection order, which exists solely to
//! find the first-selected reference for archive naming.

use std::io;

use crate::naming;
use crate::storage::Handle;
use crate::storage::ItemKind;
use crate::storage::StorageProvider;

/// Whether a reference denotes one file or a whole tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Single file.
    File,
    /// Directory tree.
    Tree,
}

/// One selected item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputReference {
    /// Provider handle.
    pub handle: Handle,
    /// File or tree.
    pub kind: ReferenceKind,
    /// Friendly name, when the provider offers one.
    pub display_name: Option<String>,
}

impl InputReference {
    /// Creates a file reference.
    pub fn file(handle: Handle, display_name: Option<String>) -> Self {
        Self {
            handle,
            kind: ReferenceKind::File,
            display_name,
        }
    }

    /// Creates a tree reference.
    pub fn tree(handle: Handle, display_name: Option<String>) -> Self {
        Self {
            handle,
            kind: ReferenceKind::Tree,
            display_name,
        }
    }

    /// Builds a reference by asking `storage` for the kind and name of
    /// `handle`.
    pub fn resolve(storage: &dyn StorageProvider, handle: Handle) -> io::Result<Self> {
        let kind = match storage.kind(&handle)? {
            ItemKind::File => ReferenceKind::File,
            ItemKind::Directory => ReferenceKind::Tree,
        };
        let display_name = storage.display_name(&handle);
        Ok(Self {
            handle,
            kind,
            display_name,
        })
    }

    /// Base name used for naming archives.
    #[must_use]
    pub fn base_name(&self) -> Option<String> {
        naming::compute_base_name(self.display_name.as_deref(), self.handle.as_str())
    }

    /// Name used for the staged copy, with a generic fallback.
    #[must_use]
    pub fn staging_name(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| {
            match self.kind {
                ReferenceKind::File => "file",
                ReferenceKind::Tree => "folder",
            }
            .to_string()
        })
    }
}

/// How a selection will be staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Exactly one file and no tree.
    SingleFile,
    /// Any other combination.
    Multi,
}

/// Outcome of a selection command, reported instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStatus {
    /// Files replaced the file subset.
    FilesSelected(usize),
    /// A tree replaced the working tree.
    TreeSelected(String),
    /// The command selected nothing and cleared its subset.
    NothingSelected,
}

/// Immutable selection snapshot.
///
/// # Examples
///
/// ```
/// use kitty_core::selection::InputReference;
/// use kitty_core::selection::Selection;
/// use kitty_core::selection::SelectionMode;
/// use kitty_core::storage::Handle;
///
/// let (selection, _) = Selection::default()
///     .with_files(vec![InputReference::file(Handle::new("mem:1"), Some("a.txt".into()))]);
/// assert_eq!(selection.mode(), SelectionMode::SingleFile);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    files: Vec<InputReference>,
    tree: Option<InputReference>,
    order: Vec<Handle>,
}

impl Selection {
    /// Returns a snapshot whose file subset is `files`.
    ///
    /// Duplicate handles keep their first occurrence. Newly selected handles
    /// move to the end of the selection order and handles of files that are
    /// no longer selected leave it.
    #[must_use]
    pub fn with_files(&self, files: Vec<InputReference>) -> (Self, SelectionStatus) {
        let mut unique: Vec<InputReference> = Vec::with_capacity(files.len());
        for reference in files {
            if !unique.iter().any(|r| r.handle == reference.handle) {
                unique.push(reference);
            }
        }

        let mut next = Self {
            files: unique,
            tree: self.tree.clone(),
            order: Vec::new(),
        };
        let incoming: Vec<Handle> = next.files.iter().map(|r| r.handle.clone()).collect();
        next.order = self.reordered(&next, &incoming);

        let status = if next.files.is_empty() {
            SelectionStatus::NothingSelected
        } else {
            SelectionStatus::FilesSelected(next.files.len())
        };
        (next, status)
    }

    /// Returns a snapshot whose working tree is `tree`.
    #[must_use]
    pub fn with_tree(&self, tree: Option<InputReference>) -> (Self, SelectionStatus) {
        let mut next = Self {
            files: self.files.clone(),
            tree,
            order: Vec::new(),
        };
        let incoming: Vec<Handle> = next.tree.iter().map(|r| r.handle.clone()).collect();
        next.order = self.reordered(&next, &incoming);

        let status = match &next.tree {
            Some(tree) => SelectionStatus::TreeSelected(
                tree.display_name
                    .clone()
                    .unwrap_or_else(|| tree.handle.to_string()),
            ),
            None => SelectionStatus::NothingSelected,
        };
        (next, status)
    }

    fn reordered(&self, next: &Self, incoming: &[Handle]) -> Vec<Handle> {
        let mut order: Vec<Handle> = self
            .order
            .iter()
            .filter(|h| !incoming.contains(h) && next.contains(h))
            .cloned()
            .collect();
        order.extend(incoming.iter().cloned());
        order
    }

    fn contains(&self, handle: &Handle) -> bool {
        self.files.iter().any(|r| &r.handle == handle)
            || self.tree.as_ref().is_some_and(|r| &r.handle == handle)
    }

    /// Selected files in selection order.
    #[must_use]
    pub fn files(&self) -> &[InputReference] {
        &self.files
    }

    /// Selected working tree.
    #[must_use]
    pub const fn tree(&self) -> Option<&InputReference> {
        self.tree.as_ref()
    }

    /// Handles in the order they were last selected.
    #[must_use]
    pub fn order(&self) -> &[Handle] {
        &self.order
    }

    /// The earliest reference still in the selection order.
    #[must_use]
    pub fn first_selected(&self) -> Option<&InputReference> {
        let first = self.order.first()?;
        self.tree
            .iter()
            .chain(self.files.iter())
            .find(|r| &r.handle == first)
    }

    /// Returns `true` if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.tree.is_none()
    }

    /// Staging mode for this selection.
    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        if self.files.len() == 1 && self.tree.is_none() {
            SelectionMode::SingleFile
        } else {
            SelectionMode::Multi
        }
    }
}

/// Holder of the current selection snapshot.
#[derive(Debug, Clone, Default)]
pub struct InputRegistry {
    current: Selection,
}

impl InputRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the file subset.
    pub fn apply_file_selection(&mut self, files: Vec<InputReference>) -> SelectionStatus {
        let (next, status) = self.current.with_files(files);
        self.current = next;
        status
    }

    /// Replaces the working tree.
    pub fn apply_tree_selection(&mut self, tree: Option<InputReference>) -> SelectionStatus {
        let (next, status) = self.current.with_tree(tree);
        self.current = next;
        status
    }

    /// Clears everything.
    pub fn reset(&mut self) {
        self.current = Selection::default();
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Selection {
        self.current.clone()
    }

    /// Borrow of the current snapshot.
    #[must_use]
    pub const fn current(&self) -> &Selection {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str) -> InputReference {
        InputReference::file(Handle::new(id), Some(format!("{id}.txt")))
    }

    fn tree(id: &str) -> InputReference {
        InputReference::tree(Handle::new(id), Some(id.to_string()))
    }

    fn ids(selection: &Selection) -> Vec<&str> {
        selection.order().iter().map(Handle::as_str).collect()
    }

    #[test]
    fn test_mode_detection() {
        let mut registry = InputRegistry::new();
        assert_eq!(registry.current().mode(), SelectionMode::Multi);
        assert!(registry.current().is_empty());

        registry.apply_file_selection(vec![file("a")]);
        assert_eq!(registry.current().mode(), SelectionMode::SingleFile);

        registry.apply_tree_selection(Some(tree("t")));
        assert_eq!(registry.current().mode(), SelectionMode::Multi);

        registry.apply_tree_selection(None);
        registry.apply_file_selection(vec![file("a"), file("b")]);
        assert_eq!(registry.current().mode(), SelectionMode::Multi);
    }

    #[test]
    fn test_files_replace_previous_files_only() {
        let mut registry = InputRegistry::new();
        registry.apply_tree_selection(Some(tree("t")));
        registry.apply_file_selection(vec![file("a"), file("b")]);
        registry.apply_file_selection(vec![file("c")]);

        let current = registry.current();
        assert_eq!(current.files().len(), 1);
        assert!(current.tree().is_some());
        assert_eq!(ids(current), vec!["t", "c"]);
    }

    #[test]
    fn test_reselection_moves_to_end() {
        let mut registry = InputRegistry::new();
        registry.apply_file_selection(vec![file("a")]);
        registry.apply_tree_selection(Some(tree("t")));
        registry.apply_file_selection(vec![file("a")]);

        assert_eq!(ids(registry.current()), vec!["t", "a"]);
        assert_eq!(
            registry.current().first_selected().map(|r| r.kind),
            Some(ReferenceKind::Tree)
        );
    }

    #[test]
    fn test_duplicate_handles_collapse() {
        let (selection, status) = Selection::default().with_files(vec![file("a"), file("a")]);
        assert_eq!(status, SelectionStatus::FilesSelected(1));
        assert_eq!(ids(&selection), vec!["a"]);
    }

    #[test]
    fn test_empty_selection_clears_subset() {
        let mut registry = InputRegistry::new();
        registry.apply_file_selection(vec![file("a")]);
        let status = registry.apply_file_selection(Vec::new());

        assert_eq!(status, SelectionStatus::NothingSelected);
        assert!(registry.current().is_empty());
        assert!(registry.current().order().is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let mut registry = InputRegistry::new();
        registry.apply_file_selection(vec![file("a")]);
        let snapshot = registry.snapshot();
        registry.reset();

        assert_eq!(snapshot.files().len(), 1);
        assert!(registry.current().is_empty());
    }

    #[test]
    fn test_staging_name_fallbacks() {
        let unnamed_file = InputReference::file(Handle::new("x"), None);
        let unnamed_tree = InputReference::tree(Handle::new("y"), None);
        assert_eq!(unnamed_file.staging_name(), "file");
        assert_eq!(unnamed_tree.staging_name(), "folder");
    }
}
