//! Orchestration: selection to staging to engine to publisher.
//!
//! Each public operation takes its latch from the [`OperationGuard`] before
//! doing anything else and holds the resulting token until the last byte of
//! staging is cleaned up, so the latch is released exactly once on every
//! exit path. The `spawn_*` variants acquire on the calling thread and run
//! the work on a worker thread, returning the progress receiver at once.

use std::io;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::PipelineError;
use crate::Result;
use crate::config::PipelineConfig;
use crate::copy::CopyBuffer;
use crate::engine::ArchiveEngine;
use crate::engine::ArchiveRequest;
use crate::engine::STATUS_OK;
use crate::guard::GuardToken;
use crate::guard::OperationGuard;
use crate::guard::OperationKind;
use crate::naming;
use crate::progress::ProgressReceiver;
use crate::progress::ProgressSender;
use crate::progress::progress_channel;
use crate::publish::PendingTransfer;
use crate::publish::publish_archive;
use crate::publish::publish_tree;
use crate::report::CompressionReport;
use crate::report::PublishReport;
use crate::selection::Selection;
use crate::staging::StagingRoot;
use crate::staging::materialize_archive;
use crate::staging::materialize_selection;
use crate::storage::Handle;
use crate::storage::StorageProvider;

/// Fallback archive base name prefix when no reference yields a name.
const ARCHIVE_FALLBACK_PREFIX: &str = "archive";

/// Fallback extraction folder prefix when the archive yields no name.
const EXTRACT_FALLBACK_PREFIX: &str = "extracted";

/// Output of a successful compression: the staged archive and its report.
pub type CompressionOutcome = (PendingTransfer, CompressionReport);

/// The staging and transfer pipeline.
///
/// Clones share the storage provider, engine and guard.
///
/// # Examples
///
/// ```no_run
/// use kitty_core::config::PipelineConfig;
/// use kitty_core::engine::TarZstEngine;
/// use kitty_core::pipeline::Pipeline;
/// use kitty_core::selection::InputReference;
/// use kitty_core::selection::InputRegistry;
/// use kitty_core::storage::LocalStorage;
/// use std::sync::Arc;
///
/// let storage = Arc::new(LocalStorage::new());
/// let docs = storage.grant("/home/user/docs")?;
/// let out = storage.grant("/home/user/backups")?;
///
/// let pipeline = Pipeline::new(storage, Arc::new(TarZstEngine::new()), PipelineConfig::default())?;
///
/// let mut registry = InputRegistry::new();
/// registry.apply_tree_selection(Some(InputReference::tree(docs, Some("docs".into()))));
///
/// let operation = pipeline.spawn_compress(registry.snapshot())?;
/// for event in operation.progress().iter() {
///     println!("{}", pipeline.guard().label(event.percent));
/// }
/// let (pending, _report) = operation.join()?;
/// pipeline.save_archive(pending, &out)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct Pipeline {
    storage: Arc<dyn StorageProvider>,
    engine: Arc<dyn ArchiveEngine>,
    guard: OperationGuard,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("guard", &self.guard)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline after validating `config`.
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        engine: Arc<dyn ArchiveEngine>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            storage,
            engine,
            guard: OperationGuard::new(),
            config,
        })
    }

    /// Guard shared by every clone of this pipeline.
    #[must_use]
    pub const fn guard(&self) -> &OperationGuard {
        &self.guard
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Storage provider.
    #[must_use]
    pub fn storage(&self) -> &dyn StorageProvider {
        self.storage.as_ref()
    }

    /// Stages `selection`, runs the engine and returns the staged archive.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NothingSelected`] for an empty selection
    /// - [`PipelineError::AlreadyRunning`] if a compression is in flight
    /// - staging errors, with the staging root already deleted
    /// - [`PipelineError::CompressionFailed`] on a non-zero engine status
    pub fn compress(
        &self,
        selection: &Selection,
        progress: &ProgressSender,
    ) -> Result<CompressionOutcome> {
        let token = self.acquire_compress(selection)?;
        let outcome = self.run_compress(selection, progress);
        drop(token);
        outcome
    }

    /// Runs [`compress`](Self::compress) on a worker thread.
    pub fn spawn_compress(&self, selection: Selection) -> Result<Operation<CompressionOutcome>> {
        let token = self.acquire_compress(&selection)?;
        let (tx, rx) = progress_channel(OperationKind::Compress);
        let pipeline = self.clone();
        let worker = thread::Builder::new()
            .name("kitty-compress".to_string())
            .spawn(move || {
                let _token = token;
                pipeline.run_compress(&selection, &tx)
            })?;
        Ok(Operation::new(OperationKind::Compress, rx, worker))
    }

    /// Publishes a staged archive into `dest`, replacing a same-named item.
    ///
    /// The staged archive is deleted whether or not publishing succeeds.
    pub fn save_archive(&self, pending: PendingTransfer, dest: &Handle) -> Result<PublishReport> {
        let mut buffer = CopyBuffer::with_size(self.config.copy_buffer_size);
        publish_archive(self.storage.as_ref(), pending, dest, &mut buffer)
    }

    /// Extracts `archive` into a folder under `dest` named after the
    /// archive's base name.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::AlreadyRunning`] if an extraction is in flight
    /// - staging errors if the archive cannot be copied in
    /// - [`PipelineError::ExtractionFailed`] if the engine returns nothing
    /// - [`PipelineError::Destination`] if publishing fails
    pub fn extract(
        &self,
        archive: &Handle,
        dest: &Handle,
        progress: &ProgressSender,
    ) -> Result<PublishReport> {
        let token = self.guard.try_acquire(OperationKind::Extract)?;
        let outcome = self.run_extract(archive, dest, progress);
        drop(token);
        outcome
    }

    /// Runs [`extract`](Self::extract) on a worker thread.
    pub fn spawn_extract(&self, archive: Handle, dest: Handle) -> Result<Operation<PublishReport>> {
        let token = self.guard.try_acquire(OperationKind::Extract)?;
        let (tx, rx) = progress_channel(OperationKind::Extract);
        let pipeline = self.clone();
        let worker = thread::Builder::new()
            .name("kitty-extract".to_string())
            .spawn(move || {
                let _token = token;
                pipeline.run_extract(&archive, &dest, &tx)
            })?;
        Ok(Operation::new(OperationKind::Extract, rx, worker))
    }

    fn acquire_compress(&self, selection: &Selection) -> Result<GuardToken> {
        if selection.is_empty() {
            return Err(PipelineError::NothingSelected);
        }
        self.guard.try_acquire(OperationKind::Compress)
    }

    fn run_compress(
        &self,
        selection: &Selection,
        progress: &ProgressSender,
    ) -> Result<CompressionOutcome> {
        let start = Instant::now();
        let staged = materialize_selection(self.storage.as_ref(), selection, &self.config)?;

        let base = selection
            .first_selected()
            .and_then(|first| first.base_name())
            .unwrap_or_else(|| naming::fallback_base_name(ARCHIVE_FALLBACK_PREFIX));
        let file_name = naming::archive_file_name(&base, &self.config.archive_extension);
        let out = StagingRoot::create(&self.config, "out_")?;
        let request = ArchiveRequest {
            input_paths: staged.input_paths().to_vec(),
            output_path: out.path().join(&file_name),
        };

        tracing::info!(
            archive = %file_name,
            inputs = request.input_paths.len(),
            mode = ?selection.mode(),
            "compression started"
        );
        let status = self.engine.compress(&request, progress);

        let mut report = CompressionReport {
            archive_name: file_name.clone(),
            files_staged: staged.files,
            directories_staged: staged.directories,
            bytes_staged: staged.bytes,
            collisions: staged.collisions.clone(),
            ..CompressionReport::default()
        };
        staged.close();

        if status != STATUS_OK {
            tracing::error!(status, "engine reported compression failure");
            out.close();
            return Err(PipelineError::CompressionFailed { status });
        }

        let pending = PendingTransfer::new(out, request.output_path, file_name)?;
        report.archive_size = pending.size();
        report.duration = start.elapsed();
        tracing::info!(
            archive = %report.archive_name,
            size = report.archive_size,
            "compression finished"
        );
        Ok((pending, report))
    }

    fn run_extract(
        &self,
        archive: &Handle,
        dest: &Handle,
        progress: &ProgressSender,
    ) -> Result<PublishReport> {
        let start = Instant::now();
        let folder_name = naming::base_name_of(self.storage.as_ref(), archive)
            .unwrap_or_else(|| naming::fallback_base_name(EXTRACT_FALLBACK_PREFIX));
        let staged = materialize_archive(self.storage.as_ref(), archive, &self.config)?;

        tracing::info!(archive = %archive, folder = %folder_name, "extraction started");
        let Some(top_level) =
            self.engine
                .decompress(staged.archive_path(), staged.output_dir(), progress)
        else {
            if let Err(e) = staged.clear_output() {
                tracing::warn!(error = %e, "failed to clear extraction output");
            }
            staged.close();
            return Err(PipelineError::ExtractionFailed);
        };

        let source = staged.output_dir().join(&top_level);
        let mut buffer = CopyBuffer::with_size(self.config.copy_buffer_size);
        let published = publish_tree(
            self.storage.as_ref(),
            &source,
            dest,
            &folder_name,
            &mut buffer,
        );
        staged.close();

        let mut report = published?;
        report.duration = start.elapsed();
        Ok(report)
    }
}

/// An operation running on a worker thread.
#[derive(Debug)]
pub struct Operation<T> {
    kind: OperationKind,
    progress: ProgressReceiver,
    worker: JoinHandle<Result<T>>,
}

impl<T> Operation<T> {
    fn new(kind: OperationKind, progress: ProgressReceiver, worker: JoinHandle<Result<T>>) -> Self {
        Self {
            kind,
            progress,
            worker,
        }
    }

    /// Kind of the running operation.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Progress events of this operation. Iteration ends once the worker
    /// has finished.
    #[must_use]
    pub const fn progress(&self) -> &ProgressReceiver {
        &self.progress
    }

    /// Waits for the worker and returns its outcome.
    ///
    /// The latch is already released when this returns.
    pub fn join(self) -> Result<T> {
        self.worker.join().unwrap_or_else(|_| {
            Err(PipelineError::Io(io::Error::other(format!(
                "{} worker panicked",
                self.kind
            ))))
        })
    }
}
