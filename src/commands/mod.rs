// src/commands/mod.rs
//! Command handlers for the canvas CLI

mod diff;
mod machine;
mod package;
mod repo;
mod template;

pub use diff::cmd_diff;
pub use machine::{
    cmd_machine_add, cmd_machine_diff, cmd_machine_list, cmd_machine_rm, cmd_machine_sync,
    cmd_machine_update,
};
pub use package::{cmd_package_add, cmd_package_list, cmd_package_rm};
pub use repo::{cmd_repo_add, cmd_repo_list, cmd_repo_rm};
pub use template::{
    cmd_template_add, cmd_template_diff, cmd_template_dump, cmd_template_list, cmd_template_load,
    cmd_template_pull, cmd_template_push, cmd_template_rm, cmd_template_update,
};

use anyhow::{Context as _, Result, anyhow};
use canvas::{
    CanvasConfig, ChangeSet, Identity, PullOptions, PullPlan, RpmAgent, SqliteStore, SyncMode,
    Template, TemplateStore,
};

/// Settings shared by every command
pub struct Context {
    pub config: CanvasConfig,
    pub owner: String,
}

impl Context {
    pub fn new(config: CanvasConfig, owner: Option<String>) -> Self {
        let owner = owner.unwrap_or_else(|| config.default_owner());
        Self { config, owner }
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.config.db_path)
            .with_context(|| format!("Failed to open database {}", self.config.db_path))
    }

    pub fn agent(&self) -> RpmAgent {
        RpmAgent::new(self.config.agent.clone())
    }

    /// Parse an `owner:name` argument, defaulting the owner
    pub fn identity(&self, arg: &str) -> Result<Identity> {
        Ok(Identity::parse(arg, &self.owner)?)
    }

    /// The configured machine this client runs on
    pub fn local_machine(&self) -> Result<Identity> {
        let machine = self.config.machine.as_deref().ok_or_else(|| {
            anyhow!("No machine given and none configured (set `machine` in canvas.toml)")
        })?;
        self.identity(machine)
    }

    /// Machine argument, or the configured one
    pub fn machine_or_local(&self, arg: Option<&str>) -> Result<Identity> {
        match arg {
            Some(arg) => self.identity(arg),
            None => self.local_machine(),
        }
    }

    /// Pull options from command line flags layered over the configuration
    pub fn pull_options(
        &self,
        clean: bool,
        with_deps: bool,
        remove_deps: bool,
        all: bool,
        dry_run: bool,
    ) -> PullOptions {
        PullOptions {
            mode: if clean {
                SyncMode::Clean
            } else {
                self.config.sync.mode
            },
            with_deps: with_deps || self.config.sync.with_deps,
            remove_deps,
            all: all || self.config.sync.all,
            incremental: false,
            dry_run,
        }
    }
}

/// Read-modify-write a stored template at the revision it was read at
pub(crate) fn update_template<F>(
    store: &dyn TemplateStore,
    id: &Identity,
    edit: F,
) -> Result<Template>
where
    F: FnOnce(&mut Template) -> Result<()>,
{
    let mut template = store.get_template(id)?;
    let revision = template.revision;
    edit(&mut template)?;
    template.revision = store.put_template(&template, revision)?;
    Ok(template)
}

/// Print a change-set, or a note when there is nothing to do
pub(crate) fn print_changeset(changes: &ChangeSet) {
    if changes.is_empty() {
        println!("No differences.");
        return;
    }
    print!("{}", changes);
    println!(
        "\n{} package change(s), {} repository change(s)",
        changes.package_change_count(),
        changes.repo_change_count()
    );
}

/// Print the actions of a pull
pub(crate) fn print_pull_plan(plan: &PullPlan, dry_run: bool) {
    for warning in &plan.warnings {
        println!("warning: {}", warning);
    }

    if !plan.has_actions() {
        println!("Nothing to do.");
        return;
    }

    if dry_run {
        println!("Would apply:");
    }
    for line in plan.lines() {
        println!("  {}", line);
    }
    println!(
        "\n{} to install, {} to upgrade, {} to remove",
        plan.install.len(),
        plan.upgrade.len(),
        plan.remove.len()
    );
}
