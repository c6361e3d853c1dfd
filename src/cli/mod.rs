// src/cli/mod.rs
//! CLI definitions for canvas
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! Management contexts:
//! - `template` - Template lifecycle, dump/load, push and pull
//! - `package` - Packages of a template
//! - `repo` - Repositories of a template
//! - `machine` - Machine lifecycle and synchronization
//!
//! `diff` compares any two of: a template, a machine, a file or the live
//! system.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod machine;
mod package;
mod repo;
mod template;

pub use machine::MachineCommands;
pub use package::PackageCommands;
pub use repo::RepoCommands;
pub use template::TemplateCommands;

#[derive(Parser)]
#[command(name = "canvas")]
#[command(version)]
#[command(about = "Keep machines in sync with declarative package templates", long_about = None)]
pub struct Cli {
    /// Configuration file (default: $CANVAS_CONFIG, then the user and system config)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database file (overrides the configuration)
    #[arg(short, long, global = true)]
    pub db_path: Option<String>,

    /// Owner for bare template and machine names (overrides the configuration)
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Template management
    #[command(subcommand)]
    Template(TemplateCommands),

    /// Packages of a template
    #[command(subcommand)]
    Package(PackageCommands),

    /// Repositories of a template
    #[command(subcommand)]
    Repo(RepoCommands),

    /// Machine management and synchronization
    #[command(subcommand)]
    Machine(MachineCommands),

    /// Show the changes that take FROM to TO
    ///
    /// Each side is a template (`owner:name`), a machine
    /// (`machine:owner:name`), or a packagelist/dump file. With one
    /// argument the live system is compared against it; with none, the live
    /// system is compared against the configured machine's template.
    Diff {
        /// Starting side
        from: Option<String>,

        /// Target side
        to: Option<String>,

        /// Include dependency-installed packages of the live system
        #[arg(long)]
        all: bool,

        /// Print the change-set as JSON
        #[arg(long)]
        json: bool,
    },
}
