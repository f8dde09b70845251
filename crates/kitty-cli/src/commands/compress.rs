//! Compress command implementation.

use super::base_config;
use super::grant_dir;
use super::grant_file;
use super::resolve_dir;
use crate::cli::CompressArgs;
use crate::error::add_pipeline_context;
use crate::output::OutputFormatter;
use crate::progress::run_with_progress;
use anyhow::Result;
use anyhow::bail;
use kitty_core::OperationKind;
use kitty_core::Pipeline;
use kitty_core::Session;
use kitty_core::engine::TarZstEngine;
use kitty_core::storage::LocalStorage;
use std::sync::Arc;

pub fn execute(
    args: &CompressArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let output_dir = resolve_dir(args.output.as_ref())?;

    let mut config = base_config(&args.staging).with_collision_policy(args.on_collision.into());
    if let Some(level) = args.level {
        config = config.with_compression_level(level);
    }
    if let Some(depth) = args.max_depth {
        config = config.with_max_tree_depth(usize::try_from(depth).unwrap_or(usize::MAX));
    }
    let archive_name = args
        .name
        .as_deref()
        .map(|name| with_extension(name, &config.archive_extension))
        .transpose()?;

    let storage = Arc::new(LocalStorage::new());
    let files = args
        .files
        .iter()
        .map(|path| grant_file(&storage, path))
        .collect::<Result<Vec<_>>>()?;
    let tree = args
        .tree
        .as_deref()
        .map(|path| grant_dir(&storage, path))
        .transpose()?;
    let dest = grant_dir(&storage, &output_dir)?;

    let engine = TarZstEngine::with_level(config.zstd_level());
    let pipeline = add_pipeline_context(Pipeline::new(storage, Arc::new(engine), config))?;
    let guard = pipeline.guard().clone();
    let mut session = Session::new(pipeline);

    if !files.is_empty() {
        let status = session.select_files(files);
        tracing::debug!(%status, "files selected");
    }
    if tree.is_some() {
        let status = session.select_tree(tree);
        tracing::debug!(%status, "folder selected");
    }

    let outcome = run_with_progress(&guard, OperationKind::Compress, show_progress, |tx| {
        session.compress(tx)
    })?;
    let mut compression = add_pipeline_context(outcome)?;
    tracing::debug!(status = %session.status(), "archive staged");

    if compression.has_collisions() {
        formatter.format_warning(&format!(
            "Duplicate names were resolved: {}",
            compression.collisions.join(", ")
        ));
    }
    if let Some(name) = archive_name {
        session.rename_pending(name);
    }

    let saved = add_pipeline_context(session.save(&dest))?;
    compression.archive_name.clone_from(&saved.target_name);
    formatter.format_compression_result(&compression, &saved, session.status())
}

/// Appends `.{extension}` unless `name` already ends with it.
fn with_extension(name: &str, extension: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        bail!("invalid archive name '{name}'\nHINT: --name takes a file name, not a path.");
    }
    let suffix = format!(".{extension}");
    if name.ends_with(&suffix) {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}{suffix}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("photos", "kitty").unwrap(), "photos.kitty");
        assert_eq!(with_extension("photos.kitty", "kitty").unwrap(), "photos.kitty");
        assert_eq!(with_extension("a.tar", "kitty").unwrap(), "a.tar.kitty");
    }

    #[test]
    fn test_with_extension_rejects_paths() {
        assert!(with_extension("../x", "kitty").is_err());
        assert!(with_extension("  ", "kitty").is_err());
        assert!(with_extension("..", "kitty").is_err());
    }
}
