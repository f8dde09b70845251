//! Result publisher: moves engine output back through the storage provider.
//!
//! Publishing always overwrites files. A same-named file at the destination
//! is deleted before a fresh one is created; same-named directories are
//! reused. A file never gets deleted to make room for a directory.

use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use walkdir::WalkDir;

use crate::PipelineError;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::copy_stream;
use crate::guard::OperationKind;
use crate::report::PublishReport;
use crate::staging::StagingRoot;
use crate::storage::Handle;
use crate::storage::StorageProvider;

/// A staged archive waiting for a destination.
///
/// Owns the local staging directory holding the archive; dropping the
/// transfer without publishing it deletes the archive.
#[derive(Debug)]
pub struct PendingTransfer {
    root: StagingRoot,
    archive_path: PathBuf,
    file_name: String,
    size: u64,
}

impl PendingTransfer {
    pub(crate) fn new(root: StagingRoot, archive_path: PathBuf, file_name: String) -> Result<Self> {
        let size = fs::metadata(&archive_path)?.len();
        Ok(Self {
            root,
            archive_path,
            file_name,
            size,
        })
    }

    /// Name the archive will be published under.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Overrides the published name.
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Local path of the staged archive.
    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Archive size in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Abandons the transfer and deletes the staged archive.
    pub fn discard(self) {
        tracing::debug!(name = %self.file_name, "pending transfer discarded");
        self.root.close();
    }
}

/// Writes a pending archive into `dest`, replacing a same-named item.
///
/// The local copy is deleted whether or not the write succeeds.
pub fn publish_archive(
    storage: &dyn StorageProvider,
    pending: PendingTransfer,
    dest: &Handle,
    buffer: &mut CopyBuffer,
) -> Result<PublishReport> {
    let start = Instant::now();
    let result = write_archive(storage, &pending, dest, buffer);
    pending.discard();

    let mut report = result?;
    report.duration = start.elapsed();
    tracing::info!(name = %report.target_name, bytes = report.bytes_written, "archive published");
    Ok(report)
}

fn write_archive(
    storage: &dyn StorageProvider,
    pending: &PendingTransfer,
    dest: &Handle,
    buffer: &mut CopyBuffer,
) -> Result<PublishReport> {
    let name = pending.file_name();
    let fail = |e: io::Error| {
        PipelineError::destination(OperationKind::Compress, format!("cannot write '{name}'"), Some(e))
    };
    let mut report = PublishReport::new(name);

    if let Some(existing) = storage.find_child(dest, name).map_err(fail)? {
        storage.delete(&existing.handle).map_err(fail)?;
        report.items_replaced += 1;
    }
    let target = storage.create_file(dest, name).map_err(fail)?;
    let mut writer = storage.open_write(&target).map_err(fail)?;
    let mut reader = File::open(pending.archive_path())?;
    report.bytes_written = copy_stream(&mut reader, &mut writer, buffer).map_err(fail)?;
    report.files_written = 1;
    Ok(report)
}

/// Recreates the engine output at `source` under `dest/folder_name`.
///
/// `source` is either the extracted top-level directory, whose contents are
/// mirrored, or a single extracted file, which is written into the folder.
pub fn publish_tree(
    storage: &dyn StorageProvider,
    source: &Path,
    dest: &Handle,
    folder_name: &str,
    buffer: &mut CopyBuffer,
) -> Result<PublishReport> {
    let start = Instant::now();
    let mut publisher = TreePublisher {
        storage,
        buffer,
        report: PublishReport::new(folder_name),
    };

    storage.kind(dest).map_err(|e| {
        PipelineError::destination(OperationKind::Extract, "Destination not accessible", Some(e))
    })?;
    let root = publisher
        .find_or_create_dir(dest, folder_name)
        .map_err(|e| {
            PipelineError::destination(OperationKind::Extract, "Cannot create output folder", Some(e))
        })?;

    if source.is_file() {
        let name = source
            .file_name()
            .map_or_else(|| folder_name.to_string(), |n| n.to_string_lossy().into_owned());
        publisher.replace_file(&root, &name, source)?;
    } else {
        publisher.mirror(source, root)?;
    }

    let mut report = publisher.report;
    report.duration = start.elapsed();
    tracing::info!(
        folder = %folder_name,
        files = report.files_written,
        directories = report.directories_created,
        "tree published"
    );
    Ok(report)
}

struct TreePublisher<'a> {
    storage: &'a dyn StorageProvider,
    buffer: &'a mut CopyBuffer,
    report: PublishReport,
}

impl TreePublisher<'_> {
    fn mirror(&mut self, source: &Path, root: Handle) -> Result<()> {
        let mut dirs: HashMap<PathBuf, Handle> = HashMap::new();
        dirs.insert(PathBuf::new(), root);

        for entry in WalkDir::new(source)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|_| io::Error::other("walked outside extraction root"))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let parent = relative
                .parent()
                .and_then(|p| dirs.get(p))
                .cloned()
                .ok_or_else(|| io::Error::other("parent directory was not published"))?;

            if entry.file_type().is_dir() {
                let handle = self.find_or_create_dir(&parent, &name).map_err(|e| {
                    PipelineError::destination(
                        OperationKind::Extract,
                        format!("Failed to create dir {name}"),
                        Some(e),
                    )
                })?;
                dirs.insert(relative.to_path_buf(), handle);
            } else if entry.file_type().is_file() {
                self.replace_file(&parent, &name, entry.path())?;
            }
        }
        Ok(())
    }

    fn find_or_create_dir(&mut self, parent: &Handle, name: &str) -> io::Result<Handle> {
        if let Some(existing) = self.storage.find_child(parent, name)? {
            if existing.is_directory() {
                return Ok(existing.handle);
            }
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{name}' exists and is not a folder"),
            ));
        }
        let handle = self.storage.create_directory(parent, name)?;
        self.report.directories_created += 1;
        tracing::debug!(dir = %name, "directory created");
        Ok(handle)
    }

    fn replace_file(&mut self, parent: &Handle, name: &str, source: &Path) -> Result<()> {
        let fail = |e: io::Error| {
            PipelineError::destination(
                OperationKind::Extract,
                format!("Failed to create file {name}"),
                Some(e),
            )
        };

        if let Some(existing) = self.storage.find_child(parent, name).map_err(fail)? {
            self.storage.delete(&existing.handle).map_err(fail)?;
            self.report.items_replaced += 1;
        }
        let target = self.storage.create_file(parent, name).map_err(fail)?;
        let mut writer = self.storage.open_write(&target).map_err(fail)?;
        let mut reader = File::open(source)?;
        let copied = copy_stream(&mut reader, &mut writer, self.buffer).map_err(fail)?;

        self.report.files_written += 1;
        self.report.bytes_written += copied;
        tracing::debug!(file = %name, bytes = copied, "file published");
        Ok(())
    }
}
