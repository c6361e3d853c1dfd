// src/commands/machine.rs

//! Machine commands: lifecycle, diff and sync

use anyhow::Result;
use canvas::{Machine, SyncController, Target, TemplateStore};

use super::{Context, print_changeset, print_pull_plan};

pub fn cmd_machine_add(
    ctx: &Context,
    machine: &str,
    template: &str,
    description: Option<String>,
    location: Option<String>,
) -> Result<()> {
    let store = ctx.open_store()?;

    let mut machine = Machine::new(ctx.identity(machine)?, ctx.identity(template)?);
    machine.description = description;
    machine.location = location;

    store.add_machine(&machine)?;
    println!("Registered machine {} following {}", machine.id, machine.template);
    Ok(())
}

pub fn cmd_machine_update(
    ctx: &Context,
    machine: &str,
    template: Option<&str>,
    description: Option<String>,
    location: Option<String>,
) -> Result<()> {
    let store = ctx.open_store()?;
    let mut machine = store.get_machine(&ctx.identity(machine)?)?;

    if let Some(template) = template {
        machine.template = ctx.identity(template)?;
    }
    if description.is_some() {
        machine.description = description;
    }
    if location.is_some() {
        machine.location = location;
    }

    store.put_machine(&machine)?;
    println!("Updated machine {}", machine.id);
    Ok(())
}

pub fn cmd_machine_rm(ctx: &Context, machine: &str) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(machine)?;
    store.delete_machine(&id)?;
    println!("Removed machine {}", id);
    Ok(())
}

pub fn cmd_machine_list(ctx: &Context, all: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let owner = if all { None } else { Some(ctx.owner.as_str()) };
    let machines = store.list_machines(owner)?;

    if machines.is_empty() {
        println!("No machines.");
        return Ok(());
    }

    for machine in &machines {
        println!(
            "{:<32} -> {:<32} synced: {}",
            machine.id.to_string(),
            machine.template.to_string(),
            machine.synced_at.as_deref().unwrap_or("never")
        );
        if let Some(location) = &machine.location {
            println!("    location: {}", location);
        }
    }
    Ok(())
}

pub fn cmd_machine_diff(ctx: &Context, machine: Option<&str>, live: bool, all: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let agent = ctx.agent();
    let id = ctx.machine_or_local(machine)?;
    let template = store.get_machine(&id)?.template;

    let from = if live { Target::Live } else { Target::Machine(id) };
    let controller = SyncController::new(&store, &agent, &agent);
    let changes = controller.diff_targets(&from, &Target::Template(template), all)?;
    print_changeset(&changes);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_machine_sync(
    ctx: &Context,
    machine: Option<&str>,
    clean: bool,
    with_deps: bool,
    remove_deps: bool,
    all: bool,
    incremental: bool,
    dry_run: bool,
) -> Result<()> {
    let store = ctx.open_store()?;
    let agent = ctx.agent();
    let id = ctx.machine_or_local(machine)?;

    let mut options = ctx.pull_options(clean, with_deps, remove_deps, all, dry_run);
    options.incremental = incremental;

    let controller = SyncController::new(&store, &agent, &agent);
    let plan = controller.pull(Some(&id), None, &options)?;
    print_pull_plan(&plan, dry_run);
    if !dry_run {
        println!("Machine {} synchronized", id);
    }
    Ok(())
}
