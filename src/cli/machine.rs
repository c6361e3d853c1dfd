// src/cli/machine.rs
//! Machine management commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum MachineCommands {
    /// Register a machine
    Add {
        /// Machine identity (owner:name or name)
        machine: String,

        /// Template the machine follows
        #[arg(short, long)]
        template: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Change a machine's metadata or template
    Update {
        machine: String,

        #[arg(short, long)]
        template: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Delete a machine (its template is kept)
    Rm { machine: String },

    /// List machines
    List {
        /// List machines of every owner
        #[arg(short, long)]
        all: bool,
    },

    /// Show how a machine differs from its template
    Diff {
        /// Machine (default: the configured machine)
        machine: Option<String>,

        /// Compare the live system instead of the last snapshot
        #[arg(long)]
        live: bool,

        /// Include dependency-installed packages
        #[arg(long)]
        all: bool,
    },

    /// Pull the machine's template onto the live system
    Sync {
        /// Machine (default: the configured machine)
        machine: Option<String>,

        /// Remove packages the template does not mention and apply version changes
        #[arg(long)]
        clean: bool,

        /// Also install immediate dependencies of new packages
        #[arg(long)]
        with_deps: bool,

        /// Also remove immediate dependencies of removed packages
        #[arg(long)]
        remove_deps: bool,

        /// Include dependency-installed packages
        #[arg(long)]
        all: bool,

        /// Compare against the last snapshot instead of querying the system
        #[arg(long)]
        incremental: bool,

        /// Show what would be done without making changes
        #[arg(long)]
        dry_run: bool,
    },
}
