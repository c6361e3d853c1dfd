// src/sync/mod.rs

//! Push/pull synchronization between templates and machines
//!
//! - **Pull** brings a machine towards a template: `from` is the machine,
//!   `to` is the template's effective composition.
//! - **Push** records a machine into a template: `from` is the template,
//!   `to` is the machine.
//! - **Diff** is the same computation returned as a report.
//!
//! Planning is pure (see [`plan_pull`] and [`plan_push`]); the
//! [`SyncController`] gathers the inputs from the store and the system
//! agent and carries the plan out.

mod controller;
mod plan;

pub use controller::{PreparedPush, SyncController, Target};
pub use plan::{PullPlan, PushPlan, plan_pull, plan_push};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// How much of a change-set a synchronization applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Add and update; remove only what the target explicitly excludes
    #[default]
    Additive,
    /// Apply everything so the result matches the target
    Clean,
}

impl FromStr for SyncMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "additive" => Ok(SyncMode::Additive),
            "clean" => Ok(SyncMode::Clean),
            other => Err(Error::ParseError(format!(
                "unknown sync mode '{}' (expected additive or clean)",
                other
            ))),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Additive => write!(f, "additive"),
            SyncMode::Clean => write!(f, "clean"),
        }
    }
}

/// Options for pulling a template onto a machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    pub mode: SyncMode,

    /// Also install the immediate dependencies of added packages
    pub with_deps: bool,

    /// Also remove the immediate dependencies of removed packages
    pub remove_deps: bool,

    /// Compare against every installed package, not only user-installed ones
    pub all: bool,

    /// Compare against the machine's last snapshot instead of its live state
    pub incremental: bool,

    /// Plan only
    pub dry_run: bool,
}

/// Options for pushing a machine's state into a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOptions {
    pub mode: SyncMode,

    /// Compare against every installed package, not only user-installed ones
    pub all: bool,

    /// Record exact versions of new packages instead of bare names
    pub keep_versions: bool,

    /// Plan only
    pub dry_run: bool,
}
