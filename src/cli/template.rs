// src/cli/template.rs
//! Template management commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Create a template
    Add {
        /// Template identity (owner:name or name)
        template: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Make the template visible to other users
        #[arg(long)]
        public: bool,

        /// Include another template (repeatable, applied in order)
        #[arg(short, long = "include")]
        includes: Vec<String>,

        /// Seed packages and repositories from a packagelist or dump file
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Change a template's metadata or includes
    Update {
        template: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Make the template public
        #[arg(long, conflicts_with = "private")]
        public: bool,

        /// Make the template private
        #[arg(long)]
        private: bool,

        /// Append an include
        #[arg(short, long = "include")]
        includes: Vec<String>,

        /// Drop an include
        #[arg(long = "uninclude")]
        unincludes: Vec<String>,
    },

    /// Delete a template
    Rm {
        template: String,

        /// Also delete machines assigned to it
        #[arg(long)]
        cascade: bool,
    },

    /// List templates
    List {
        /// List templates of every owner
        #[arg(short, long)]
        all: bool,
    },

    /// Write a template to stdout or a file
    Dump {
        template: String,

        /// toml, json, yaml or kickstart
        #[arg(short, long, default_value = "toml")]
        format: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Dump the effective composition (includes applied)
        #[arg(long)]
        effective: bool,
    },

    /// Create or replace a template from a dump
    Load {
        /// Dump file
        file: String,

        /// Format (default: from the file extension)
        #[arg(short, long)]
        format: Option<String>,

        /// Replace an existing template of the same identity
        #[arg(long)]
        replace: bool,
    },

    /// Record the live system into a template
    Push {
        template: String,

        /// Also record removals and inclusion flips
        #[arg(long)]
        clean: bool,

        /// Include dependency-installed packages
        #[arg(long)]
        all: bool,

        /// Record exact versions of new packages
        #[arg(long)]
        keep_versions: bool,

        /// Show what would be recorded without storing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Bring the live system towards a template
    Pull {
        template: String,

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

        /// Show what would be done without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Show what a pull of this template would change on the live system
    Diff {
        template: String,

        /// Include dependency-installed packages
        #[arg(long)]
        all: bool,
    },
}
