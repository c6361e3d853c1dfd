// src/agent/mod.rs

//! Machine-side capabilities
//!
//! The synchronization controller never shells out itself. Everything it
//! needs from the machine it is running on goes through [`SystemAgent`]:
//! reading the live composition and applying package and repository
//! changes. [`RpmAgent`] implements it with `rpm` and `dnf`.

mod rpm;

pub use rpm::{RpmAgent, apply_repo_changes, parse_installed};

use crate::error::Result;
use crate::model::Composition;
use crate::package::PackageEntry;
use crate::repository::RepoDefinition;

/// Options for reading a machine's live composition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveOptions {
    /// Include packages installed only as dependencies
    pub all: bool,
}

pub trait SystemAgent {
    /// Packages and repositories currently present on the machine
    fn live_composition(&self, options: LiveOptions) -> Result<Composition>;

    fn install(&self, packages: &[PackageEntry]) -> Result<()>;

    fn remove(&self, packages: &[PackageEntry]) -> Result<()>;

    /// Move installed packages to the version the entries name
    fn upgrade(&self, packages: &[PackageEntry]) -> Result<()>;

    /// Write `add` repository definitions and drop `remove` ones
    fn apply_repos(&self, add: &[RepoDefinition], remove: &[RepoDefinition]) -> Result<()>;
}
