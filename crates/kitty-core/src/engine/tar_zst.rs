//! Default engine: a tar stream compressed with zstd.
//!
//! Every input contributes entries relative to its parent directory, so a
//! tree input `.../stage/docs` is stored as `docs/...` and a file input as
//! its bare file name. On extraction the top-level layout decides the name
//! returned to the pipeline:
//!
//! - no entries: an empty `empty` directory
//! - a single top-level name (one file, or one common directory): that name
//! - anything else: all entries moved under a synthetic `files` directory

use std::collections::BTreeSet;
use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use tar::Builder;
use tar::EntryType;
use tar::Header;
use walkdir::WalkDir;

use super::ArchiveEngine;
use super::ArchiveRequest;
use super::STATUS_INVALID_INPUT;
use super::STATUS_IO_ERROR;
use super::STATUS_OK;
use crate::naming;
use crate::progress::ByteProgress;
use crate::progress::ProgressReader;
use crate::progress::ProgressSender;

/// Name returned for an archive without entries.
pub const EMPTY_ROOT: &str = "empty";

/// Directory that collects entries without a common top-level name.
pub const FILES_ROOT: &str = "files";

/// zstd-compressed tar engine.
///
/// # Examples
///
/// ```no_run
/// use kitty_core::engine::ArchiveEngine;
/// use kitty_core::engine::ArchiveRequest;
/// use kitty_core::engine::TarZstEngine;
/// use kitty_core::guard::OperationKind;
/// use kitty_core::progress::ProgressSender;
/// use std::path::PathBuf;
///
/// let engine = TarZstEngine::new();
/// let request = ArchiveRequest {
///     input_paths: vec![PathBuf::from("/tmp/stage/docs")],
///     output_path: PathBuf::from("/tmp/out/docs.kitty"),
/// };
/// let status = engine.compress(&request, &ProgressSender::disabled(OperationKind::Compress));
/// assert_eq!(status, 0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TarZstEngine {
    level: i32,
}

impl Default for TarZstEngine {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl TarZstEngine {
    /// Creates an engine at zstd's default level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine at an explicit zstd level.
    #[must_use]
    pub const fn with_level(level: i32) -> Self {
        Self { level }
    }

    /// zstd level in use.
    #[must_use]
    pub const fn level(&self) -> i32 {
        self.level
    }

    fn write_archive(&self, request: &ArchiveRequest, sender: &ProgressSender) -> io::Result<()> {
        let total = request
            .input_paths
            .iter()
            .map(|input| tree_size(input))
            .sum::<io::Result<u64>>()?;
        let mut progress = ByteProgress::new(sender.clone(), total);

        let file = File::create(&request.output_path)?;
        let mut encoder = zstd::Encoder::new(file, self.level)?;
        encoder.include_checksum(true)?;
        let mut builder = Builder::new(encoder);

        for input in &request.input_paths {
            let parent = input.parent().ok_or_else(|| invalid_input(input))?;
            for entry in WalkDir::new(input).follow_links(false).sort_by_file_name() {
                let entry = entry.map_err(io::Error::from)?;
                let relative = entry
                    .path()
                    .strip_prefix(parent)
                    .map_err(|_| invalid_input(entry.path()))?;
                let file_type = entry.file_type();

                if file_type.is_dir() {
                    builder.append_dir(relative, entry.path())?;
                } else if file_type.is_file() {
                    let source = File::open(entry.path())?;
                    let mut header = Header::new_gnu();
                    header.set_metadata(&source.metadata()?);
                    builder.append_data(
                        &mut header,
                        relative,
                        ProgressReader::new(source, &mut progress),
                    )?;
                } else {
                    tracing::warn!(path = %entry.path().display(), "skipping special file");
                }
            }
        }

        let mut file = builder.into_inner()?.finish()?;
        file.flush()?;
        progress.finish();
        Ok(())
    }

    fn read_archive(
        archive: &Path,
        output_dir: &Path,
        sender: &ProgressSender,
    ) -> io::Result<String> {
        let total = fs::metadata(archive)?.len();
        let mut progress = ByteProgress::new(sender.clone(), total);

        let top_level = {
            let reader = ProgressReader::new(File::open(archive)?, &mut progress);
            let mut tar = tar::Archive::new(zstd::Decoder::new(reader)?);
            unpack_entries(&mut tar, output_dir)?
        };
        progress.finish();

        match top_level.len() {
            0 => {
                fs::create_dir_all(output_dir.join(EMPTY_ROOT))?;
                Ok(EMPTY_ROOT.to_string())
            }
            1 => Ok(top_level.into_iter().next().unwrap_or_default()),
            _ => gather_under_files_root(output_dir, &top_level),
        }
    }
}

impl ArchiveEngine for TarZstEngine {
    fn compress(&self, request: &ArchiveRequest, progress: &ProgressSender) -> i32 {
        if request.input_paths.is_empty()
            || request
                .input_paths
                .iter()
                .any(|p| p.file_name().is_none() || !p.exists())
        {
            tracing::error!(inputs = ?request.input_paths, "invalid compression input");
            return STATUS_INVALID_INPUT;
        }

        match self.write_archive(request, progress) {
            Ok(()) => {
                tracing::debug!(output = %request.output_path.display(), "archive written");
                STATUS_OK
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                tracing::error!(error = %e, "invalid compression input");
                STATUS_INVALID_INPUT
            }
            Err(e) => {
                tracing::error!(error = %e, "compression failed");
                STATUS_IO_ERROR
            }
        }
    }

    fn decompress(
        &self,
        archive: &Path,
        output_dir: &Path,
        progress: &ProgressSender,
    ) -> Option<String> {
        match Self::read_archive(archive, output_dir, progress) {
            Ok(name) => {
                tracing::debug!(root = %name, "archive expanded");
                Some(name)
            }
            Err(e) => {
                tracing::error!(archive = %archive.display(), error = %e, "extraction failed");
                None
            }
        }
    }
}

/// Unpacks regular files and directories, returning the distinct top-level
/// names.
fn unpack_entries<R: Read>(
    tar: &mut tar::Archive<R>,
    output_dir: &Path,
) -> io::Result<BTreeSet<String>> {
    let mut top_level = BTreeSet::new();

    for entry in tar.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let relative = checked_relative(&path)?;
        let Some(top) = relative.components().next() else {
            continue;
        };
        let top = top.as_os_str().to_string_lossy().into_owned();

        let dest = output_dir.join(&relative);
        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&dest)?;
                top_level.insert(top);
            }
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                entry.unpack(&dest)?;
                top_level.insert(top);
            }
            other => {
                tracing::warn!(path = %path.display(), kind = ?other, "skipping unsupported entry");
            }
        }
    }

    Ok(top_level)
}

/// Rejects absolute paths and any `..` component.
fn checked_relative(path: &Path) -> io::Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("entry escapes extraction root: {}", path.display()),
                ));
            }
        }
    }
    Ok(relative)
}

fn gather_under_files_root(output_dir: &Path, names: &BTreeSet<String>) -> io::Result<String> {
    let root_name = (0..)
        .map(|n| {
            if n == 0 {
                FILES_ROOT.to_string()
            } else {
                naming::numbered_name(FILES_ROOT, n)
            }
        })
        .find(|candidate| !names.contains(candidate))
        .unwrap_or_else(|| naming::fallback_base_name(FILES_ROOT));

    let root = output_dir.join(&root_name);
    fs::create_dir(&root)?;
    for name in names {
        fs::rename(output_dir.join(name), root.join(name))?;
    }
    Ok(root_name)
}

fn tree_size(path: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(io::Error::from)?.len();
        }
    }
    Ok(total)
}

fn invalid_input(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("unusable input path: {}", path.display()),
    )
}
