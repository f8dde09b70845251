//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_complete::Shell;
use kitty_core::CollisionPolicy;
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kitty")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress files and a folder into one archive
    Compress(CompressArgs),
    /// Extract an archive into a folder named after it
    Extract(ExtractArgs),
    /// Show or toggle the display mode
    Theme(ThemeArgs),
    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct CompressArgs {
    /// Files to compress
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Folder to compress, contents included
    #[arg(short, long, value_name = "DIR")]
    pub tree: Option<PathBuf>,

    /// Folder the archive is saved into (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Archive file name (default: first selected item's name)
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Compression level (1-9)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u8).range(1..=9))]
    pub level: Option<u8>,

    /// What to do when two inputs share a top-level name
    #[arg(long, value_enum, default_value_t = CollisionArg::Suffix)]
    pub on_collision: CollisionArg,

    /// Deepest folder level copied from the tree
    #[arg(long, value_name = "DEPTH", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_depth: Option<u64>,

    #[command(flatten)]
    pub staging: StagingArgs,
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Folder the extracted folder is created in (default: current directory)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub staging: StagingArgs,
}

#[derive(clap::Args)]
pub struct StagingArgs {
    /// Directory for temporary staging copies (default: system temp dir)
    #[arg(long, value_name = "DIR", env = "KITTY_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ThemeArgs {
    #[command(subcommand)]
    pub action: Option<ThemeAction>,

    /// Preferences file
    #[arg(long, value_name = "PATH", env = "KITTY_PREFS", default_value_os_t = default_prefs_path())]
    pub prefs: PathBuf,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ThemeAction {
    /// Print the current display mode
    Show,
    /// Switch between light and dark mode
    Toggle,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
pub enum CollisionArg {
    /// Keep the last copy
    Overwrite,
    /// Fail the compression
    Reject,
    /// Rename later copies to `name (1).ext`
    Suffix,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(arg: CollisionArg) -> Self {
        match arg {
            CollisionArg::Overwrite => Self::LastWriterWins,
            CollisionArg::Reject => Self::Reject,
            CollisionArg::Suffix => Self::Suffix,
        }
    }
}

/// `$XDG_CONFIG_HOME/kitty/prefs.json`, falling back to `~/.config`.
fn default_prefs_path() -> PathBuf {
    let config_home = env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(env::temp_dir);
    config_home.join("kitty").join("prefs.json")
}
