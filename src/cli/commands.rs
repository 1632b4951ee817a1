use clap::{Args, Parser, Subcommand};

use crate::view::ViewMode;

#[derive(Parser)]
#[command(name = "bt", about = concat!("beadtree v", env!("CARGO_PKG_VERSION"), " - a live outline of your beads issues"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,

    /// Log to stderr (-v info, -vv debug). BEADTREE_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the outline as the TUI shows it
    Tree(TreeArgs),
    /// Show issue counts
    Stats(StatsArgs),
    /// Build the graph and report problems
    Check,
}

/// Filter options shared by the read commands
#[derive(Args)]
pub struct ViewArgs {
    /// Only issues whose title or id contains this text (plus their ancestors)
    #[arg(long, short)]
    pub filter: Option<String>,
    /// View mode: all, active or ready
    #[arg(long, short, default_value = "all")]
    pub mode: ViewMode,
}

#[derive(Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// Expand every issue with children
    #[arg(long, short = 'e')]
    pub expand_all: bool,
}

#[derive(Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub view: ViewArgs,
}
