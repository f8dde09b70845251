//! Staging and transfer pipeline for handle-based archives.
//!
//! `kitty-core` compresses an arbitrary mix of files and directory trees
//! reachable only through opaque storage handles, and extracts archives back
//! into such storage. The pipeline:
//!
//! 1. snapshots the user's selection ([`selection`])
//! 2. copies it into a throwaway local staging root ([`staging`])
//! 3. runs an [`ArchiveEngine`] under a per-kind single-flight guard
//!    ([`guard`]), relaying progress over a per-operation channel
//!    ([`progress`])
//! 4. publishes the result back through the [`StorageProvider`]
//!    ([`publish`]), overwriting same-named items
//!
//! Every staging directory is deleted on every exit path.
//!
//! # Examples
//!
//! ```no_run
//! use kitty_core::Pipeline;
//! use kitty_core::PipelineConfig;
//! use kitty_core::engine::TarZstEngine;
//! use kitty_core::guard::OperationKind;
//! use kitty_core::progress::ProgressSender;
//! use kitty_core::storage::LocalStorage;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(LocalStorage::new());
//! let archive = storage.grant("/home/user/photos.kitty")?;
//! let dest = storage.grant("/home/user/restore")?;
//!
//! let pipeline = Pipeline::new(storage, Arc::new(TarZstEngine::new()), PipelineConfig::default())?;
//! let report = pipeline.extract(&archive, &dest, &ProgressSender::disabled(OperationKind::Extract))?;
//! println!("Restored {} files into {}", report.files_written, report.target_name);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod copy;
pub mod engine;
pub mod error;
pub mod guard;
pub mod naming;
pub mod pipeline;
pub mod prefs;
pub mod progress;
pub mod publish;
pub mod report;
pub mod selection;
pub mod session;
pub mod staging;
pub mod storage;

// Re-export main API types
pub use config::CollisionPolicy;
pub use config::PipelineConfig;
pub use engine::ArchiveEngine;
pub use engine::ArchiveRequest;
pub use error::ErrorCategory;
pub use error::PipelineError;
pub use error::Result;
pub use guard::OperationGuard;
pub use guard::OperationKind;
pub use pipeline::Pipeline;
pub use progress::ProgressEvent;
pub use publish::PendingTransfer;
pub use report::CompressionReport;
pub use report::PublishReport;
pub use selection::InputReference;
pub use selection::InputRegistry;
pub use selection::Selection;
pub use selection::SelectionMode;
pub use session::Session;
pub use session::Status;
pub use storage::Handle;
pub use storage::StorageProvider;
