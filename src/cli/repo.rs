// src/cli/repo.rs
//! Template repository commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum RepoCommands {
    /// Add or replace a repository in a template
    Add {
        template: String,

        /// Repository id
        id: String,

        /// Human readable name (default: the id)
        #[arg(long)]
        name: Option<String>,

        /// Base URL (repeatable)
        #[arg(long)]
        baseurl: Vec<String>,

        #[arg(long)]
        metalink: Option<String>,

        #[arg(long)]
        mirrorlist: Option<String>,

        /// Lower is preferred
        #[arg(long, default_value = "1000")]
        cost: i32,

        /// Lower is preferred
        #[arg(long, default_value = "99")]
        priority: i32,

        /// Add the repository disabled
        #[arg(long)]
        disabled: bool,

        /// GPG key URL (repeatable)
        #[arg(long)]
        gpgkey: Vec<String>,

        /// Turn signature checking on or off
        #[arg(long)]
        gpgcheck: Option<bool>,

        /// Fail instead of skipping when the repository is unreachable
        #[arg(long)]
        no_skip_if_unavailable: bool,

        /// Package glob to hide from this repository (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Only take packages matching this glob from the repository (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Metadata lifetime, e.g. 6h or never
        #[arg(long)]
        metadata_expire: Option<String>,

        /// Keep the repository on installed systems (kickstart --install)
        #[arg(long)]
        install: bool,
    },

    /// Remove a repository from a template
    Rm { template: String, id: String },

    /// List a template's repositories
    List {
        template: String,

        /// Show the effective list with includes applied
        #[arg(short, long)]
        effective: bool,
    },
}
