//! CLI argument definitions for Rivet.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "rivet",
    version,
    about = "Dependency resolution and build memoization for Rivet projects"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the project's dependency graph and print the flattened set
    Resolve {
        /// Project directory (defaults to the current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Local package store to resolve packages from
        #[arg(short, long)]
        packages: Option<PathBuf>,
        /// Target framework
        #[arg(short, long, default_value = "rivet-1.0")]
        target: String,
    },

    /// Print the resolved dependency tree
    Tree {
        /// Project directory (defaults to the current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Local package store to resolve packages from
        #[arg(short, long)]
        packages: Option<PathBuf>,
        /// Target framework
        #[arg(short, long, default_value = "rivet-1.0")]
        target: String,
        /// Maximum tree depth to print
        #[arg(long)]
        depth: Option<usize>,
        /// Show the path from the root to a specific library instead
        #[arg(long)]
        path: Option<String>,
    },

    /// Build the project through the memoizing cache
    Build {
        /// Project directory (defaults to the current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Local package store to resolve packages from
        #[arg(short, long)]
        packages: Option<PathBuf>,
        /// Target framework
        #[arg(short, long, default_value = "rivet-1.0")]
        target: String,
        /// Build configuration
        #[arg(short, long, default_value = "debug")]
        config: String,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
