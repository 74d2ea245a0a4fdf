use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "organizer")]
#[command(about = "Sort a folder by extension, date, size or content", long_about = None)]
pub struct Cli {
    /// Print the JSON response envelope instead of a summary
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct Target {
    /// Folder to organize
    pub path: PathBuf,
    /// Include files in subfolders
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Move files into one folder per extension
    Extension(Target),
    /// Move files into YYYY-MM folders (recursive runs flatten the tree first)
    Date {
        #[command(flatten)]
        target: Target,
        /// Skip the confirmation prompt for recursive runs
        #[arg(short, long)]
        yes: bool,
    },
    /// Move temporary and lock files into a review folder
    Temp(Target),
    /// Move files larger than a threshold into a review folder
    Size {
        #[command(flatten)]
        target: Target,
        /// Size threshold in bytes, overrides the configured default
        #[arg(short, long)]
        threshold: Option<u64>,
    },
    /// Move duplicate copies into a review folder, keeping the first of each group
    Duplicate(Target),
    /// Validate and run an advisor action list read from a JSON file
    Ai {
        #[command(flatten)]
        target: Target,
        /// File holding the action list (a JSON array or {"actions": [...]})
        #[arg(short, long)]
        actions: PathBuf,
    },
    /// List duplicate groups without moving anything
    FindDuplicates(Target),
    /// Print configuration values
    PrintConfig,
}
