// src/sync/controller.rs

//! Synchronization controller
//!
//! Gathers compositions from the template store and the system agent,
//! plans with [`plan_pull`]/[`plan_push`] and applies the result.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{PullOptions, PullPlan, PushOptions, PushPlan, plan_pull, plan_push};
use crate::agent::{LiveOptions, SystemAgent};
use crate::dependencies::DependencySource;
use crate::error::{Error, Result};
use crate::model::{
    ChangeSet, Composition, Identity, Template, compute_diff, read_composition_file,
    resolve_template,
};
use crate::store::TemplateStore;

/// Prefix marking a diff argument as a machine
pub const MACHINE_PREFIX: &str = "machine:";

/// One side of a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Effective composition of a stored template
    Template(Identity),
    /// Last recorded snapshot of a machine
    Machine(Identity),
    /// Packagelist or template dump on disk
    File(PathBuf),
    /// The system this client runs on
    Live,
}

impl Target {
    /// Interpret a command line argument
    ///
    /// `machine:owner:name` (or `machine:name`) names a machine; anything
    /// that exists on disk or contains a path separator is a file;
    /// everything else is a template identity.
    pub fn parse(arg: &str, default_owner: &str) -> Result<Self> {
        if let Some(rest) = arg.strip_prefix(MACHINE_PREFIX) {
            return Ok(Target::Machine(Identity::parse(rest, default_owner)?));
        }
        if arg.contains(std::path::MAIN_SEPARATOR) || Path::new(arg).exists() {
            return Ok(Target::File(PathBuf::from(arg)));
        }
        Ok(Target::Template(Identity::parse(arg, default_owner)?))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Template(id) => write!(f, "{}", id),
            Target::Machine(id) => write!(f, "{}{}", MACHINE_PREFIX, id),
            Target::File(path) => write!(f, "{}", path.display()),
            Target::Live => write!(f, "live system"),
        }
    }
}

/// A push planned against a known template revision
#[derive(Debug, Clone)]
pub struct PreparedPush {
    /// Template as read when planning
    pub template: Template,
    pub plan: PushPlan,
}

impl PreparedPush {
    pub fn base_revision(&self) -> u64 {
        self.template.revision
    }
}

pub struct SyncController<'a> {
    store: &'a dyn TemplateStore,
    agent: &'a dyn SystemAgent,
    deps: &'a dyn DependencySource,
}

impl<'a> SyncController<'a> {
    pub fn new(
        store: &'a dyn TemplateStore,
        agent: &'a dyn SystemAgent,
        deps: &'a dyn DependencySource,
    ) -> Self {
        Self { store, agent, deps }
    }

    /// Template to pull: the one named, else the machine's assignment
    fn pull_template(&self, machine: Option<&Identity>, template: Option<&Identity>) -> Result<Identity> {
        match (template, machine) {
            (Some(template), _) => Ok(template.clone()),
            (None, Some(machine)) => Ok(self.store.get_machine(machine)?.template),
            (None, None) => Err(Error::TemplateNotFound(
                "no template named and no machine to take one from".to_string(),
            )),
        }
    }

    /// Plan a pull without touching the machine
    pub fn plan_pull(
        &self,
        machine: Option<&Identity>,
        template: Option<&Identity>,
        options: &PullOptions,
    ) -> Result<PullPlan> {
        let template = self.pull_template(machine, template)?;
        let target = self.store.effective_composition(&template)?;

        let snapshot = match (options.incremental, machine) {
            (true, Some(machine)) => self.store.get_machine(machine)?.snapshot,
            _ => None,
        };
        let current = match snapshot {
            Some(snapshot) => {
                debug!("Pulling against last snapshot");
                snapshot
            }
            None => self.agent.live_composition(LiveOptions { all: options.all })?,
        };

        Ok(plan_pull(&current, &target, options, self.deps))
    }

    /// Bring the machine towards a template
    ///
    /// Repositories are written first so new packages can be found, then
    /// removals, installs and upgrades run. When a machine identity is
    /// given its snapshot is updated afterwards.
    pub fn pull(
        &self,
        machine: Option<&Identity>,
        template: Option<&Identity>,
        options: &PullOptions,
    ) -> Result<PullPlan> {
        let plan = self.plan_pull(machine, template, options)?;

        for warning in &plan.warnings {
            warn!("{}", warning);
        }

        if options.dry_run {
            return Ok(plan);
        }

        if !plan.repos_apply.is_empty() || !plan.repos_remove.is_empty() {
            self.agent.apply_repos(&plan.repos_apply, &plan.repos_remove)?;
        }
        if !plan.remove.is_empty() {
            self.agent.remove(&plan.remove)?;
        }
        if !plan.install.is_empty() {
            self.agent.install(&plan.install)?;
        }
        if !plan.upgrade.is_empty() {
            self.agent.upgrade(&plan.upgrade)?;
        }

        if let Some(machine) = machine {
            self.store.put_machine_snapshot(machine, &plan.result)?;
        }

        info!(
            "Pull complete: {} installed, {} upgraded, {} removed",
            plan.install.len(),
            plan.upgrade.len(),
            plan.remove.len()
        );
        Ok(plan)
    }

    /// Plan a push of the live system into `template`
    ///
    /// The template is read once; the plan and the revision later checked
    /// by [`commit_push`](Self::commit_push) both come from that read.
    pub fn prepare_push(&self, template: &Identity, options: &PushOptions) -> Result<PreparedPush> {
        let stored = self.store.get_template(template)?;
        let resolved = resolve_template(&stored, |include| self.store.get_template(include))?;
        let live = self.agent.live_composition(LiveOptions { all: options.all })?;

        let plan = plan_push(&stored.composition, &resolved.composition, &live, options);
        debug!(
            "Push plan for {} at revision {}: {} change(s)",
            template,
            stored.revision,
            plan.applied.package_change_count() + plan.applied.repo_change_count()
        );

        Ok(PreparedPush {
            template: stored,
            plan,
        })
    }

    /// Store a prepared push
    ///
    /// Fails with `ConflictingRevision` if the template changed since the
    /// push was prepared. Returns the new revision.
    pub fn commit_push(&self, prepared: &PreparedPush) -> Result<u64> {
        let mut template = prepared.template.clone();
        template.composition = prepared.plan.result.clone();
        let revision = self.store.put_template(&template, prepared.base_revision())?;
        info!("Pushed into {} (revision {})", template.id, revision);
        Ok(revision)
    }

    /// Plan and store a push in one step
    pub fn push(&self, template: &Identity, options: &PushOptions) -> Result<PreparedPush> {
        let prepared = self.prepare_push(template, options)?;
        if !options.dry_run && prepared.plan.has_changes() {
            self.commit_push(&prepared)?;
        }
        Ok(prepared)
    }

    /// Composition behind one side of a diff
    pub fn composition(&self, target: &Target, all: bool) -> Result<Composition> {
        match target {
            Target::Template(id) => self.store.effective_composition(id),
            Target::Machine(id) => {
                let machine = self.store.get_machine(id)?;
                Ok(machine.snapshot.unwrap_or_else(|| {
                    warn!("Machine {} has never been synchronized", id);
                    Composition::new()
                }))
            }
            Target::File(path) => read_composition_file(path),
            Target::Live => self.agent.live_composition(LiveOptions { all }),
        }
    }

    /// Diff any two targets
    pub fn diff_targets(&self, from: &Target, to: &Target, all: bool) -> Result<ChangeSet> {
        if from == to {
            return Err(Error::AmbiguousTarget(from.to_string()));
        }
        let from = self.composition(from, all)?;
        let to = self.composition(to, all)?;
        Ok(compute_diff(&from, &to))
    }
}
