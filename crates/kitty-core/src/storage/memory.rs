//! In-memory storage provider.
//!
//! Holds a tree of named items behind opaque `mem:` handles. Besides serving
//! as a provider for embedders, it supports fault injection (failing reads
//! after a byte count, failing creates) and items without display names,
//! which makes every pipeline error path reachable from tests.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::io;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use super::ChildEntry;
use super::Handle;
use super::ItemKind;
use super::StorageProvider;
use super::validate_child_name;

const ROOT_ID: &str = "mem:root";

#[derive(Debug)]
enum NodeData {
    File(Vec<u8>),
    Directory(Vec<String>),
}

#[derive(Debug)]
struct Node {
    name: Option<String>,
    parent: Option<String>,
    data: NodeData,
}

#[derive(Debug, Default)]
struct Tree {
    nodes: HashMap<String, Node>,
    next_id: u64,
    read_faults: HashMap<String, u64>,
    create_faults: HashSet<String>,
}

impl Tree {
    fn node(&self, id: &str) -> io::Result<&Node> {
        self.nodes.get(id).ok_or_else(|| not_found(id))
    }

    fn children(&self, id: &str) -> io::Result<&[String]> {
        match &self.node(id)?.data {
            NodeData::Directory(children) => Ok(children),
            NodeData::File(_) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {id}"),
            )),
        }
    }

    fn insert(
        &mut self,
        parent: &str,
        id: Option<String>,
        name: Option<String>,
        data: NodeData,
    ) -> io::Result<Handle> {
        self.children(parent)?;
        let id = id.unwrap_or_else(|| {
            self.next_id += 1;
            format!("mem:{}", self.next_id)
        });
        if self.nodes.contains_key(&id) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("handle already exists: {id}"),
            ));
        }
        self.nodes.insert(
            id.clone(),
            Node {
                name,
                parent: Some(parent.to_string()),
                data,
            },
        );
        if let Some(Node {
            data: NodeData::Directory(children),
            ..
        }) = self.nodes.get_mut(parent)
        {
            children.push(id.clone());
        }
        Ok(Handle::new(id))
    }

    fn remove_subtree(&mut self, id: &str, visited: &mut HashSet<String>) {
        if !visited.insert(id.to_string()) {
            return;
        }
        if let Some(node) = self.nodes.remove(id)
            && let NodeData::Directory(children) = node.data
        {
            for child in children {
                self.remove_subtree(&child, visited);
            }
        }
    }
}

fn not_found(id: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such item: {id}"))
}

/// Thread-safe in-memory storage tree.
///
/// Clones share the same tree.
///
/// # Examples
///
/// ```
/// use kitty_core::storage::MemoryStorage;
/// use kitty_core::storage::StorageProvider;
///
/// let storage = MemoryStorage::new();
/// let docs = storage.add_directory(&storage.root(), "docs")?;
/// storage.add_file(&docs, "a.txt", b"alpha")?;
///
/// let children = storage.list_children(&docs)?;
/// assert_eq!(children[0].name.as_deref(), Some("a.txt"));
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    tree: Arc<Mutex<Tree>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Creates an empty tree with a single root directory.
    #[must_use]
    pub fn new() -> Self {
        let mut tree = Tree::default();
        tree.nodes.insert(
            ROOT_ID.to_string(),
            Node {
                name: Some("root".to_string()),
                parent: None,
                data: NodeData::Directory(Vec::new()),
            },
        );
        Self {
            tree: Arc::new(Mutex::new(tree)),
        }
    }

    /// Handle of the root directory.
    #[must_use]
    pub fn root(&self) -> Handle {
        Handle::new(ROOT_ID)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Tree>> {
        self.tree
            .lock()
            .map_err(|_| io::Error::other("memory storage lock poisoned"))
    }

    /// Adds a directory under `parent`.
    pub fn add_directory(&self, parent: &Handle, name: &str) -> io::Result<Handle> {
        self.lock()?.insert(
            parent.as_str(),
            None,
            Some(name.to_string()),
            NodeData::Directory(Vec::new()),
        )
    }

    /// Adds a file with `content` under `parent`.
    pub fn add_file(&self, parent: &Handle, name: &str, content: &[u8]) -> io::Result<Handle> {
        self.lock()?.insert(
            parent.as_str(),
            None,
            Some(name.to_string()),
            NodeData::File(content.to_vec()),
        )
    }

    /// Adds a file that has no display name and uses `raw_id` as its handle.
    pub fn add_unnamed_file(
        &self,
        parent: &Handle,
        raw_id: &str,
        content: &[u8],
    ) -> io::Result<Handle> {
        self.lock()?.insert(
            parent.as_str(),
            Some(raw_id.to_string()),
            None,
            NodeData::File(content.to_vec()),
        )
    }

    /// Lists an existing item as an additional child of `parent`.
    ///
    /// Linking an ancestor produces a directory cycle.
    pub fn link(&self, parent: &Handle, child: &Handle) -> io::Result<()> {
        let mut tree = self.lock()?;
        tree.node(child.as_str())?;
        match tree.nodes.get_mut(parent.as_str()).map(|n| &mut n.data) {
            Some(NodeData::Directory(children)) => {
                children.push(child.as_str().to_string());
                Ok(())
            }
            Some(NodeData::File(_)) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {parent}"),
            )),
            None => Err(not_found(parent.as_str())),
        }
    }

    /// Makes reads of any file named `name` fail after `after_bytes` bytes.
    pub fn fail_reads(&self, name: &str, after_bytes: u64) -> io::Result<()> {
        self.lock()?
            .read_faults
            .insert(name.to_string(), after_bytes);
        Ok(())
    }

    /// Makes creation of any item named `name` fail.
    pub fn fail_creates(&self, name: &str) -> io::Result<()> {
        self.lock()?.create_faults.insert(name.to_string());
        Ok(())
    }

    /// Returns the content of a file.
    pub fn read(&self, handle: &Handle) -> io::Result<Vec<u8>> {
        match &self.lock()?.node(handle.as_str())?.data {
            NodeData::File(content) => Ok(content.clone()),
            NodeData::Directory(_) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {handle}"),
            )),
        }
    }

    /// Returns every file below `tree` keyed by `/`-joined relative path.
    ///
    /// Empty directories appear with a trailing `/` and no content.
    pub fn snapshot(&self, tree: &Handle) -> io::Result<BTreeMap<String, Vec<u8>>> {
        let guard = self.lock()?;
        let mut out = BTreeMap::new();
        let mut stack = vec![(tree.as_str().to_string(), String::new())];
        let mut visited = HashSet::new();

        while let Some((id, prefix)) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let children = guard.children(&id)?;
            if children.is_empty() && !prefix.is_empty() {
                out.insert(format!("{prefix}/"), Vec::new());
            }
            for child_id in children {
                let child = guard.node(child_id)?;
                let name = child.name.clone().unwrap_or_else(|| child_id.clone());
                let path = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                match &child.data {
                    NodeData::File(content) => {
                        out.insert(path, content.clone());
                    }
                    NodeData::Directory(_) => stack.push((child_id.clone(), path)),
                }
            }
        }

        Ok(out)
    }

    /// Number of items in the tree, including the root.
    pub fn item_count(&self) -> io::Result<usize> {
        Ok(self.lock()?.nodes.len())
    }

    fn create(&self, tree: &Handle, name: &str, data: NodeData) -> io::Result<Handle> {
        validate_child_name(name)?;
        let mut guard = self.lock()?;
        if guard.create_faults.contains(name) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("create denied: {name}"),
            ));
        }
        guard.insert(tree.as_str(), None, Some(name.to_string()), data)
    }
}

struct MemoryReader {
    data: Cursor<Vec<u8>>,
    fail_after: Option<u64>,
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(limit) = self.fail_after else {
            return self.data.read(buf);
        };
        let position = self.data.position();
        if position >= limit {
            return Err(io::Error::other("injected read failure"));
        }
        let allowed = usize::try_from(limit - position).unwrap_or(usize::MAX);
        let end = buf.len().min(allowed);
        self.data.read(&mut buf[..end])
    }
}

struct MemoryWriter {
    tree: Arc<Mutex<Tree>>,
    id: String,
    buf: Vec<u8>,
}

impl MemoryWriter {
    fn commit(&self) -> io::Result<()> {
        let mut tree = self
            .tree
            .lock()
            .map_err(|_| io::Error::other("memory storage lock poisoned"))?;
        match tree.nodes.get_mut(&self.id).map(|n| &mut n.data) {
            Some(NodeData::File(content)) => {
                content.clone_from(&self.buf);
                Ok(())
            }
            Some(NodeData::Directory(_)) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", self.id),
            )),
            None => Err(not_found(&self.id)),
        }
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        if let Err(e) = self.commit() {
            tracing::warn!(error = %e, id = %self.id, "memory writer commit failed");
        }
    }
}

impl StorageProvider for MemoryStorage {
    fn open_read(&self, handle: &Handle) -> io::Result<Box<dyn Read + Send>> {
        let guard = self.lock()?;
        let node = guard.node(handle.as_str())?;
        let NodeData::File(content) = &node.data else {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {handle}"),
            ));
        };
        let fail_after = node
            .name
            .as_ref()
            .and_then(|name| guard.read_faults.get(name).copied());
        Ok(Box::new(MemoryReader {
            data: Cursor::new(content.clone()),
            fail_after,
        }))
    }

    fn open_write(&self, handle: &Handle) -> io::Result<Box<dyn Write + Send>> {
        let mut guard = self.lock()?;
        match guard.nodes.get_mut(handle.as_str()).map(|n| &mut n.data) {
            Some(NodeData::File(content)) => content.clear(),
            Some(NodeData::Directory(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::IsADirectory,
                    format!("is a directory: {handle}"),
                ));
            }
            None => return Err(not_found(handle.as_str())),
        }
        Ok(Box::new(MemoryWriter {
            tree: Arc::clone(&self.tree),
            id: handle.as_str().to_string(),
            buf: Vec::new(),
        }))
    }

    fn list_children(&self, tree: &Handle) -> io::Result<Vec<ChildEntry>> {
        let guard = self.lock()?;
        guard
            .children(tree.as_str())?
            .iter()
            .map(|id| {
                let node = guard.node(id)?;
                Ok(ChildEntry {
                    handle: Handle::new(id.clone()),
                    name: node.name.clone(),
                    kind: match node.data {
                        NodeData::File(_) => ItemKind::File,
                        NodeData::Directory(_) => ItemKind::Directory,
                    },
                })
            })
            .collect()
    }

    fn create_file(&self, tree: &Handle, name: &str) -> io::Result<Handle> {
        self.create(tree, name, NodeData::File(Vec::new()))
    }

    fn create_directory(&self, tree: &Handle, name: &str) -> io::Result<Handle> {
        self.create(tree, name, NodeData::Directory(Vec::new()))
    }

    fn delete(&self, handle: &Handle) -> io::Result<()> {
        let mut guard = self.lock()?;
        let parent = guard.node(handle.as_str())?.parent.clone();
        let Some(parent) = parent else {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot delete the root",
            ));
        };
        if let Some(Node {
            data: NodeData::Directory(children),
            ..
        }) = guard.nodes.get_mut(&parent)
        {
            children.retain(|id| id != handle.as_str());
        }
        guard.remove_subtree(handle.as_str(), &mut HashSet::new());
        Ok(())
    }

    fn display_name(&self, handle: &Handle) -> Option<String> {
        self.lock()
            .ok()?
            .nodes
            .get(handle.as_str())
            .and_then(|node| node.name.clone())
    }

    fn kind(&self, handle: &Handle) -> io::Result<ItemKind> {
        match self.lock()?.node(handle.as_str())?.data {
            NodeData::File(_) => Ok(ItemKind::File),
            NodeData::Directory(_) => Ok(ItemKind::Directory),
        }
    }
}
