//! Subcommand implementations.

pub mod completion;
pub mod compress;
pub mod extract;
pub mod theme;

use crate::cli::StagingArgs;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use kitty_core::Handle;
use kitty_core::PipelineConfig;
use kitty_core::storage::LocalStorage;
use std::env;
use std::path::Path;
use std::path::PathBuf;

/// Pipeline configuration shared by every subcommand.
fn base_config(staging: &StagingArgs) -> PipelineConfig {
    let config = PipelineConfig::default();
    match &staging.staging_dir {
        Some(dir) => config.with_staging_dir(dir),
        None => config,
    }
}

/// The given folder, or the current directory.
fn resolve_dir(dir: Option<&PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir.clone()),
        None => env::current_dir().context("failed to get current directory"),
    }
}

fn grant_file(storage: &LocalStorage, path: &Path) -> Result<Handle> {
    if path.is_dir() {
        bail!(
            "'{}' is a folder\n\
             HINT: Pass folders with --tree.",
            path.display()
        );
    }
    storage
        .grant(path)
        .with_context(|| format!("cannot access '{}'", path.display()))
}

fn grant_dir(storage: &LocalStorage, path: &Path) -> Result<Handle> {
    let handle = storage
        .grant(path)
        .with_context(|| format!("cannot access folder '{}'", path.display()))?;
    if !path.is_dir() {
        bail!("'{}' is not a folder", path.display());
    }
    Ok(handle)
}
