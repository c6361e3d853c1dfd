// src/cli/package.rs
//! Template package commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum PackageCommands {
    /// Add packages to a template
    ///
    /// Tokens are `[~]name[#epoch@version-release][:arch]`; `~` marks a
    /// package that must not be installed.
    Add {
        template: String,

        #[arg(required = true)]
        packages: Vec<String>,

        /// Also add immediate dependencies
        #[arg(long)]
        with_deps: bool,
    },

    /// Remove packages from a template
    Rm {
        template: String,

        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// List a template's packages
    List {
        template: String,

        /// Show the effective list with includes applied
        #[arg(short, long)]
        effective: bool,
    },
}
