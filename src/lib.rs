// src/lib.rs

//! Canvas template/machine reconciliation
//!
//! Canvas keeps machines in step with declarative templates: named,
//! owned recipes of software repositories and packages.
//!
//! # Architecture
//!
//! - Compositions: templates, live machines and packagelist files are all
//!   sets of package entries and repositories, so any two can be diffed
//! - Templates include other templates; precedence is a fold over layers
//! - Pull brings a machine towards a template, push records a machine into
//!   a template, both driven by one diff engine
//! - Storage and the package manager sit behind traits
//!   ([`TemplateStore`], [`SystemAgent`], [`DependencySource`])

pub mod agent;
pub mod config;
pub mod db;
pub mod dependencies;
mod error;
pub mod model;
pub mod package;
pub mod repository;
pub mod store;
pub mod sync;

pub use agent::{LiveOptions, RpmAgent, SystemAgent};
pub use config::CanvasConfig;
pub use db::SqliteStore;
pub use dependencies::{DependencySource, Direction, Expansion, NoDependencies, expand};
pub use error::{Error, Result};
pub use model::{
    ChangeSet, Composition, DumpFormat, Identity, Machine, PackageChange, ResolvedTemplate,
    Template, compute_diff,
};
pub use package::{InclusionMode, PackageEntry, PackageSpec, parse_token};
pub use repository::{RepoDefinition, select_candidate};
pub use store::{DeletePolicy, MemoryStore, TemplateStore};
pub use sync::{PullOptions, PullPlan, PushOptions, PushPlan, SyncController, SyncMode, Target};
