//! Extract command implementation.

use super::base_config;
use super::grant_dir;
use super::grant_file;
use super::resolve_dir;
use crate::cli::ExtractArgs;
use crate::error::add_pipeline_context;
use crate::output::OutputFormatter;
use crate::progress::run_with_progress;
use anyhow::Result;
use kitty_core::OperationKind;
use kitty_core::Pipeline;
use kitty_core::Session;
use kitty_core::engine::TarZstEngine;
use kitty_core::storage::LocalStorage;
use std::sync::Arc;

pub fn execute(
    args: &ExtractArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let output_dir = resolve_dir(args.output_dir.as_ref())?;

    let storage = Arc::new(LocalStorage::new());
    let archive = grant_file(&storage, &args.archive)?;
    let dest = grant_dir(&storage, &output_dir)?;

    let pipeline = add_pipeline_context(Pipeline::new(
        storage,
        Arc::new(TarZstEngine::new()),
        base_config(&args.staging),
    ))?;
    let guard = pipeline.guard().clone();
    let mut session = Session::new(pipeline);
    let status = session.select_archive(Some(archive));
    tracing::debug!(%status, "archive selected");

    let outcome = run_with_progress(&guard, OperationKind::Extract, show_progress, |tx| {
        session.extract(&dest, tx)
    })?;
    let report = add_pipeline_context(outcome)?;

    formatter.format_extraction_result(&report, session.status())
}
