//! Interactive session: selection state plus one status line.
//!
//! A [`Session`] is what a front end drives. It owns the input registry,
//! the selected archive and any pending transfer, turns every pipeline
//! outcome into a [`Status`], and resets itself after each terminal
//! outcome so the next operation starts from a clean slate.

use std::fmt;

use crate::PipelineError;
use crate::Result;
use crate::guard::OperationKind;
use crate::pipeline::Pipeline;
use crate::prefs::DisplayMode;
use crate::progress::ProgressSender;
use crate::publish::PendingTransfer;
use crate::report::CompressionReport;
use crate::report::PublishReport;
use crate::selection::InputReference;
use crate::selection::InputRegistry;
use crate::selection::SelectionStatus;
use crate::storage::Handle;

/// User-facing status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Nothing has happened yet, or the session was reset.
    Ready,
    /// Files replaced the file selection.
    FilesSelected(usize),
    /// A file selection came back empty.
    NoFilesSelected,
    /// A folder became the working tree.
    FolderSelected(String),
    /// A folder selection came back empty.
    NoFolderPicked,
    /// An archive was picked for extraction.
    ArchiveSelected(String),
    /// Extraction was requested without an archive.
    NoArchiveSelected,
    /// Compression was requested without input.
    NoInputSelected,
    /// A compression is already in flight.
    AlreadyCompressing,
    /// An extraction is already in flight.
    ExtractionInProgress,
    /// The archive is staged and waits for a destination.
    ChooseSaveFolder,
    /// The archive was written under this name.
    ArchiveSaved(String),
    /// Saving was requested without a staged archive.
    NothingToSave,
    /// The staged archive was abandoned.
    SaveCancelled,
    /// Extraction finished.
    Extracted,
    /// The display mode was switched.
    DisplayModeChanged(DisplayMode),
    /// Any other failure, carrying its generic message.
    Failed(String),
}

impl Status {
    /// Maps a pipeline error to the status shown for it.
    #[must_use]
    pub fn from_error(err: &PipelineError) -> Self {
        match err {
            PipelineError::NothingSelected => Self::NoInputSelected,
            PipelineError::AlreadyRunning {
                kind: OperationKind::Compress,
            } => Self::AlreadyCompressing,
            PipelineError::AlreadyRunning {
                kind: OperationKind::Extract,
            } => Self::ExtractionInProgress,
            other => Self::Failed(other.status_message()),
        }
    }

    /// Returns `true` for statuses that report a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed(_)
                | Self::NoInputSelected
                | Self::NoArchiveSelected
                | Self::NothingToSave
                | Self::AlreadyCompressing
                | Self::ExtractionInProgress
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::FilesSelected(n) => write!(f, "Selected {n} file(s)"),
            Self::NoFilesSelected => f.write_str("No files selected."),
            Self::FolderSelected(name) => write!(f, "Selected folder: {name}"),
            Self::NoFolderPicked => f.write_str("No folder picked."),
            Self::ArchiveSelected(name) => write!(f, "Selected archive: {name}"),
            Self::NoArchiveSelected => f.write_str("No archive selected."),
            Self::NoInputSelected => f.write_str("No input selected."),
            Self::AlreadyCompressing => f.write_str("Already compressing..."),
            Self::ExtractionInProgress => f.write_str("Extraction already in progress..."),
            Self::ChooseSaveFolder => f.write_str("Choose folder to save archive"),
            Self::ArchiveSaved(name) => write!(f, "Archive saved: {name}"),
            Self::NothingToSave => f.write_str("No archive to save."),
            Self::SaveCancelled => f.write_str("Save cancelled."),
            Self::Extracted => f.write_str("Extracted to chosen folder."),
            Self::DisplayModeChanged(mode) => write!(f, "Switched to {} mode", mode.name()),
            Self::Failed(message) => f.write_str(message),
        }
    }
}

/// Stateful front-end controller over a [`Pipeline`].
#[derive(Debug)]
pub struct Session {
    pipeline: Pipeline,
    registry: InputRegistry,
    archive: Option<Handle>,
    pending: Option<PendingTransfer>,
    status: Status,
}

impl Session {
    /// Creates an idle session.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            registry: InputRegistry::new(),
            archive: None,
            pending: None,
            status: Status::Ready,
        }
    }

    /// Underlying pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Current selection registry.
    #[must_use]
    pub const fn registry(&self) -> &InputRegistry {
        &self.registry
    }

    /// Latest status line.
    #[must_use]
    pub const fn status(&self) -> &Status {
        &self.status
    }

    /// Archive picked for extraction.
    #[must_use]
    pub const fn selected_archive(&self) -> Option<&Handle> {
        self.archive.as_ref()
    }

    /// Staged archive awaiting a destination.
    #[must_use]
    pub const fn pending(&self) -> Option<&PendingTransfer> {
        self.pending.as_ref()
    }

    /// Replaces the selected files.
    pub fn select_files(&mut self, handles: Vec<Handle>) -> &Status {
        let storage = self.pipeline.storage();
        let references = handles
            .into_iter()
            .map(|handle| {
                let name = storage.display_name(&handle);
                InputReference::file(handle, name)
            })
            .collect();
        self.status = match self.registry.apply_file_selection(references) {
            SelectionStatus::FilesSelected(n) => Status::FilesSelected(n),
            _ => Status::NoFilesSelected,
        };
        &self.status
    }

    /// Replaces the working tree.
    pub fn select_tree(&mut self, handle: Option<Handle>) -> &Status {
        let reference = handle.map(|handle| {
            let name = self.pipeline.storage().display_name(&handle);
            InputReference::tree(handle, name)
        });
        self.status = match self.registry.apply_tree_selection(reference) {
            SelectionStatus::TreeSelected(name) => Status::FolderSelected(name),
            _ => Status::NoFolderPicked,
        };
        &self.status
    }

    /// Picks the archive for the next extraction.
    pub fn select_archive(&mut self, handle: Option<Handle>) -> &Status {
        self.status = match &handle {
            Some(h) => Status::ArchiveSelected(
                crate::naming::display_name_or_segment(self.pipeline.storage(), h)
                    .unwrap_or_else(|| h.to_string()),
            ),
            None => Status::NoArchiveSelected,
        };
        self.archive = handle;
        &self.status
    }

    /// Compresses the current selection and keeps the result pending.
    ///
    /// On success the status asks for a destination. On failure the session
    /// resets, except when another compression holds the guard.
    pub fn compress(&mut self, progress: &ProgressSender) -> Result<CompressionReport> {
        let selection = self.registry.snapshot();
        match self.pipeline.compress(&selection, progress) {
            Ok((pending, report)) => {
                if let Some(stale) = self.pending.replace(pending) {
                    stale.discard();
                }
                self.status = Status::ChooseSaveFolder;
                Ok(report)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Publishes the pending archive into `dest`.
    pub fn save(&mut self, dest: &Handle) -> Result<PublishReport> {
        let Some(pending) = self.pending.take() else {
            self.status = Status::NothingToSave;
            return Err(PipelineError::NothingSelected);
        };
        let name = pending.file_name().to_string();
        let outcome = self.pipeline.save_archive(pending, dest);
        match outcome {
            Ok(report) => {
                self.reset();
                self.status = Status::ArchiveSaved(name);
                Ok(report)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Renames the pending archive. Returns `false` if nothing is pending.
    pub fn rename_pending(&mut self, file_name: impl Into<String>) -> bool {
        self.pending = self
            .pending
            .take()
            .map(|pending| pending.with_file_name(file_name));
        self.pending.is_some()
    }

    /// Abandons the pending archive.
    pub fn cancel_save(&mut self) -> &Status {
        self.reset();
        self.status = Status::SaveCancelled;
        &self.status
    }

    /// Extracts the selected archive into `dest`.
    pub fn extract(&mut self, dest: &Handle, progress: &ProgressSender) -> Result<PublishReport> {
        let Some(archive) = self.archive.clone() else {
            self.status = Status::NoArchiveSelected;
            return Err(PipelineError::NothingSelected);
        };
        match self.pipeline.extract(&archive, dest, progress) {
            Ok(report) => {
                self.reset();
                self.status = Status::Extracted;
                Ok(report)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Records a display-mode switch.
    pub fn display_mode_changed(&mut self, mode: DisplayMode) -> &Status {
        self.status = Status::DisplayModeChanged(mode);
        &self.status
    }

    /// Clears the selection, the selected archive and any pending transfer.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.archive = None;
        if let Some(pending) = self.pending.take() {
            pending.discard();
        }
        self.status = Status::Ready;
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        if !matches!(err, PipelineError::AlreadyRunning { .. }) {
            self.reset();
        }
        tracing::warn!(error = %err, "operation failed");
        self.status = Status::from_error(&err);
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::engine::TarZstEngine;
    use crate::storage::{MemoryStorage, StorageProvider};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn new_session(storage: &MemoryStorage, staging: &TempDir) -> Session {
        let pipeline = Pipeline::new(
            Arc::new(storage.clone()),
            Arc::new(TarZstEngine::new()),
            PipelineConfig::default().with_staging_dir(staging.path()),
        )
        .unwrap();
        Session::new(pipeline)
    }

    fn compress_progress() -> ProgressSender {
        ProgressSender::disabled(OperationKind::Compress)
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(Status::FilesSelected(3).to_string(), "Selected 3 file(s)");
        assert_eq!(
            Status::ArchiveSaved("a.kitty".into()).to_string(),
            "Archive saved: a.kitty"
        );
        assert_eq!(
            Status::from_error(&PipelineError::CompressionFailed { status: 1 }).to_string(),
            "Compression failed."
        );
        assert_eq!(
            Status::DisplayModeChanged(DisplayMode::Dark).to_string(),
            "Switched to Dark mode"
        );
    }

    #[test]
    fn test_compress_without_input() {
        let temp = TempDir::new().unwrap();
        let storage = MemoryStorage::new();
        let mut session = new_session(&storage, &temp);

        assert!(session.compress(&compress_progress()).is_err());
        assert_eq!(session.status().to_string(), "No input selected.");
    }

    #[test]
    fn test_compress_then_save_resets() {
        let temp = TempDir::new().unwrap();
        let storage = MemoryStorage::new();
        let root = storage.root();
        let file = storage.add_file(&root, "notes.txt", b"hello").unwrap();
        let dest = storage.add_directory(&root, "dest").unwrap();
        let mut session = new_session(&storage, &temp);

        assert_eq!(session.select_files(vec![file]), &Status::FilesSelected(1));
        session.compress(&compress_progress()).unwrap();
        assert_eq!(session.status(), &Status::ChooseSaveFolder);
        assert!(session.pending().is_some());

        session.save(&dest).unwrap();
        assert_eq!(session.status().to_string(), "Archive saved: notes.kitty");
        assert!(session.registry().current().is_empty());
        assert!(session.pending().is_none());
        assert!(storage.find_child(&dest, "notes.kitty").unwrap().is_some());
    }

    #[test]
    fn test_rename_pending_before_save() {
        let temp = TempDir::new().unwrap();
        let storage = MemoryStorage::new();
        let root = storage.root();
        let file = storage.add_file(&root, "notes.txt", b"hello").unwrap();
        let mut session = new_session(&storage, &temp);

        assert!(!session.rename_pending("early.kitty"));
        session.select_files(vec![file]);
        session.compress(&compress_progress()).unwrap();
        assert!(session.rename_pending("renamed.kitty"));
        session.save(&root).unwrap();

        assert_eq!(session.status().to_string(), "Archive saved: renamed.kitty");
        assert!(storage.find_child(&root, "renamed.kitty").unwrap().is_some());
    }

    #[test]
    fn test_cancel_save_discards_pending() {
        let temp = TempDir::new().unwrap();
        let storage = MemoryStorage::new();
        let file = storage.add_file(&storage.root(), "a.txt", b"a").unwrap();
        let mut session = new_session(&storage, &temp);

        session.select_files(vec![file]);
        session.compress(&compress_progress()).unwrap();
        session.cancel_save();

        assert_eq!(session.status(), &Status::SaveCancelled);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_extract_without_archive() {
        let temp = TempDir::new().unwrap();
        let storage = MemoryStorage::new();
        let mut session = new_session(&storage, &temp);

        let err = session
            .extract(&storage.root(), &ProgressSender::disabled(OperationKind::Extract))
            .unwrap_err();
        assert!(matches!(err, PipelineError::NothingSelected));
        assert_eq!(session.status(), &Status::NoArchiveSelected);
    }

    #[test]
    fn test_failure_resets_selection() {
        let temp = TempDir::new().unwrap();
        let storage = MemoryStorage::new();
        let file = storage.add_file(&storage.root(), "bad.bin", &[0; 32]).unwrap();
        storage.fail_reads("bad.bin", 4).unwrap();
        let mut session = new_session(&storage, &temp);

        session.select_files(vec![file]);
        let err = session.compress(&compress_progress()).unwrap_err();

        assert!(matches!(err, PipelineError::Staging { .. }));
        assert!(session.status().is_failure());
        assert!(session.registry().current().is_empty());
        assert!(!session.pipeline().guard().is_running(OperationKind::Compress));
    }

    #[test]
    fn test_already_running_keeps_selection() {
        let temp = TempDir::new().unwrap();
        let storage = MemoryStorage::new();
        let file = storage.add_file(&storage.root(), "a.txt", b"a").unwrap();
        let mut session = new_session(&storage, &temp);
        session.select_files(vec![file]);

        let _held = session
            .pipeline()
            .guard()
            .try_acquire(OperationKind::Compress)
            .unwrap();
        let guard = session.pipeline().guard().clone();
        assert!(guard.is_running(OperationKind::Compress));

        session.compress(&compress_progress()).unwrap_err();
        assert_eq!(session.status(), &Status::AlreadyCompressing);
        assert_eq!(session.registry().current().files().len(), 1);
    }
}
