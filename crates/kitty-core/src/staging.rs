//! Staging materializer.
//!
//! Copies handle-based input out of a [`StorageProvider`] into a concrete,
//! exclusively owned temporary directory the archive engine can read. Every
//! staging root is a [`tempfile::TempDir`], so it is deleted when its owner
//! drops it, on success and on every error path alike.

use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::PipelineError;
use crate::Result;
use crate::config::CollisionPolicy;
use crate::config::PipelineConfig;
use crate::copy::CopyBuffer;
use crate::copy::copy_stream;
use crate::naming;
use crate::selection::InputReference;
use crate::selection::ReferenceKind;
use crate::selection::Selection;
use crate::selection::SelectionMode;
use crate::storage::Handle;
use crate::storage::ItemKind;
use crate::storage::StorageProvider;
use crate::storage::validate_child_name;

/// Exclusively owned temporary directory for one operation.
#[derive(Debug)]
pub struct StagingRoot {
    dir: TempDir,
}

impl StagingRoot {
    /// Creates a fresh directory named `{prefix}XXXXXX` under the configured
    /// staging directory.
    pub fn create(config: &PipelineConfig, prefix: &str) -> Result<Self> {
        fs::create_dir_all(&config.staging_dir)?;
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&config.staging_dir)?;
        tracing::debug!(path = %dir.path().display(), "staging root created");
        Ok(Self { dir })
    }

    /// Concrete path of the root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Deletes the root now, logging instead of failing if removal fails.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove staging root");
        } else {
            tracing::debug!(path = %path.display(), "staging root removed");
        }
    }
}

/// Staged compression input.
#[derive(Debug)]
pub struct StagedInputs {
    root: StagingRoot,
    input_paths: Vec<PathBuf>,
    /// Files copied.
    pub files: usize,
    /// Directories created.
    pub directories: usize,
    /// Bytes copied.
    pub bytes: u64,
    /// Top-level names touched by the collision policy.
    pub collisions: Vec<String>,
}

impl StagedInputs {
    /// Top-level staged paths, one per selected file or tree, in staging
    /// order.
    #[must_use]
    pub fn input_paths(&self) -> &[PathBuf] {
        &self.input_paths
    }

    /// Staging root holding the inputs.
    #[must_use]
    pub const fn root(&self) -> &StagingRoot {
        &self.root
    }

    /// Deletes the staging root.
    pub fn close(self) {
        self.root.close();
    }
}

/// Staged extraction input: one archive copy and an empty output directory.
#[derive(Debug)]
pub struct StagedArchive {
    root: StagingRoot,
    archive_path: PathBuf,
    output_dir: PathBuf,
    /// Bytes copied.
    pub bytes: u64,
}

impl StagedArchive {
    /// Local copy of the archive.
    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Directory the engine extracts into.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Empties the output directory after a failed extraction.
    pub fn clear_output(&self) -> Result<()> {
        if self.output_dir.exists() {
            fs::remove_dir_all(&self.output_dir)?;
        }
        fs::create_dir(&self.output_dir)?;
        Ok(())
    }

    /// Deletes the staging root.
    pub fn close(self) {
        self.root.close();
    }
}

/// Stages a selection for compression.
///
/// Dispatches on [`Selection::mode`]: a lone file goes through
/// [`materialize_single_file`], everything else is mirrored into one shared
/// root.
///
/// # Errors
///
/// Returns [`PipelineError::NothingSelected`] for an empty selection, and
/// staging errors for unreadable sources or local I/O failures. The staging
/// root is deleted before any error is returned.
pub fn materialize_selection(
    storage: &dyn StorageProvider,
    selection: &Selection,
    config: &PipelineConfig,
) -> Result<StagedInputs> {
    if selection.is_empty() {
        return Err(PipelineError::NothingSelected);
    }
    match (selection.mode(), selection.files()) {
        (SelectionMode::SingleFile, [file]) => materialize_single_file(storage, file, config),
        _ => materialize_multi(storage, selection, config),
    }
}

/// Copies one file into a fresh `input_*` directory, keeping its display
/// name.
pub fn materialize_single_file(
    storage: &dyn StorageProvider,
    file: &InputReference,
    config: &PipelineConfig,
) -> Result<StagedInputs> {
    let root = StagingRoot::create(config, "input_")?;
    let mut stager = Stager::new(storage, config);
    let dest = root.path().join(safe_name(&file.staging_name()));
    stager.copy_file(&file.handle, &file.staging_name(), &dest)?;

    Ok(stager.finish(root, vec![dest]))
}

fn materialize_multi(
    storage: &dyn StorageProvider,
    selection: &Selection,
    config: &PipelineConfig,
) -> Result<StagedInputs> {
    let root = StagingRoot::create(config, "stage_")?;
    let mut stager = Stager::new(storage, config);
    let mut input_paths = Vec::new();

    for reference in selection.tree().into_iter().chain(selection.files()) {
        let name = stager.claim_top_level(root.path(), &reference.staging_name())?;
        let dest = root.path().join(&name);
        match reference.kind {
            ReferenceKind::Tree => {
                let mut path = Vec::new();
                stager.mirror_tree(&reference.handle, &name, &dest, 0, &mut path)?;
            }
            ReferenceKind::File => stager.copy_file(&reference.handle, &name, &dest)?,
        }
        if !input_paths.contains(&dest) {
            input_paths.push(dest);
        }
    }

    Ok(stager.finish(root, input_paths))
}

/// Copies an archive into a fresh `extract_*` root next to an empty `out`
/// directory.
pub fn materialize_archive(
    storage: &dyn StorageProvider,
    archive: &Handle,
    config: &PipelineConfig,
) -> Result<StagedArchive> {
    let root = StagingRoot::create(config, "extract_")?;
    let display = naming::display_name_or_segment(storage, archive)
        .unwrap_or_else(|| "archive".to_string());
    let archive_path = root.path().join(safe_name(&display));
    let output_dir = root.path().join("out");
    fs::create_dir(&output_dir)?;

    let mut stager = Stager::new(storage, config);
    stager.copy_file(archive, &display, &archive_path)?;

    Ok(StagedArchive {
        root,
        archive_path,
        output_dir,
        bytes: stager.bytes,
    })
}

/// Replaces names a provider may report but the local filesystem cannot
/// hold as one path component.
fn safe_name(name: &str) -> String {
    if validate_child_name(name).is_ok() {
        name.to_string()
    } else {
        "unknown".to_string()
    }
}

struct Stager<'a> {
    storage: &'a dyn StorageProvider,
    config: &'a PipelineConfig,
    buffer: CopyBuffer,
    claimed: HashSet<String>,
    files: usize,
    directories: usize,
    bytes: u64,
    collisions: Vec<String>,
}

impl<'a> Stager<'a> {
    fn new(storage: &'a dyn StorageProvider, config: &'a PipelineConfig) -> Self {
        Self {
            storage,
            config,
            buffer: CopyBuffer::with_size(config.copy_buffer_size),
            claimed: HashSet::new(),
            files: 0,
            directories: 0,
            bytes: 0,
            collisions: Vec::new(),
        }
    }

    fn finish(self, root: StagingRoot, input_paths: Vec<PathBuf>) -> StagedInputs {
        tracing::debug!(
            files = self.files,
            directories = self.directories,
            bytes = self.bytes,
            "staging complete"
        );
        StagedInputs {
            root,
            input_paths,
            files: self.files,
            directories: self.directories,
            bytes: self.bytes,
            collisions: self.collisions,
        }
    }

    /// Picks the staging-root name for a top-level item under the collision
    /// policy.
    fn claim_top_level(&mut self, root: &Path, name: &str) -> Result<String> {
        let name = safe_name(name);
        if self.claimed.insert(name.clone()) {
            return Ok(name);
        }

        self.collisions.push(name.clone());
        match self.config.collision_policy {
            CollisionPolicy::Reject => Err(PipelineError::NameCollision { name }),
            CollisionPolicy::LastWriterWins => {
                tracing::warn!(name = %name, "replacing staged item with same name");
                remove_path(&root.join(&name))?;
                Ok(name)
            }
            CollisionPolicy::Suffix => {
                let renamed = (1..)
                    .map(|n| naming::numbered_name(&name, n))
                    .find(|candidate| !self.claimed.contains(candidate))
                    .unwrap_or_else(|| naming::fallback_base_name(&name));
                tracing::debug!(from = %name, to = %renamed, "renamed colliding staged item");
                self.claimed.insert(renamed.clone());
                Ok(renamed)
            }
        }
    }

    /// Depth-first mirror of `tree` into `dest`.
    ///
    /// `path` holds the handles of the trees currently being descended, so a
    /// provider that links a tree into its own subtree is caught on the
    /// first repeat.
    fn mirror_tree(
        &mut self,
        tree: &Handle,
        name: &str,
        dest: &Path,
        depth: usize,
        path: &mut Vec<Handle>,
    ) -> Result<()> {
        if path.contains(tree) {
            return Err(PipelineError::CycleDetected {
                item: name.to_string(),
            });
        }
        if depth > self.config.max_tree_depth {
            return Err(PipelineError::DepthLimitExceeded {
                item: name.to_string(),
                max: self.config.max_tree_depth,
            });
        }

        fs::create_dir(dest).map_err(|e| PipelineError::staging(name, e))?;
        self.directories += 1;

        let children = self
            .storage
            .list_children(tree)
            .map_err(|e| PipelineError::staging(name, e))?;

        path.push(tree.clone());
        for child in children {
            let child_name = safe_name(child.name.as_deref().unwrap_or("unknown"));
            let child_dest = dest.join(&child_name);
            match child.kind {
                ItemKind::Directory => {
                    self.mirror_tree(&child.handle, &child_name, &child_dest, depth + 1, path)?;
                }
                ItemKind::File => self.copy_file(&child.handle, &child_name, &child_dest)?,
            }
        }
        path.pop();
        Ok(())
    }

    fn copy_file(&mut self, source: &Handle, name: &str, dest: &Path) -> Result<()> {
        let mut reader = self
            .storage
            .open_read(source)
            .map_err(|e| PipelineError::staging(name, e))?;
        let mut writer = File::create(dest).map_err(|e| PipelineError::staging(name, e))?;
        let copied = copy_stream(&mut reader, &mut writer, &mut self.buffer)
            .map_err(|e| PipelineError::staging(name, e))?;

        tracing::debug!(item = %name, bytes = copied, "staged file");
        self.files += 1;
        self.bytes += copied;
        Ok(())
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
