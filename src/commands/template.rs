// src/commands/template.rs

//! Template commands: lifecycle, dump/load, push, pull and diff

use std::path::Path;

use anyhow::{Result, anyhow};
use canvas::model::{dump_template, load_template, read_composition_file};
use canvas::{
    DeletePolicy, DumpFormat, PushOptions, SyncController, SyncMode, Target, Template,
    TemplateStore,
};
use tracing::info;

use super::{Context, print_changeset, print_pull_plan, update_template};

pub fn cmd_template_add(
    ctx: &Context,
    template: &str,
    title: Option<String>,
    description: Option<String>,
    public: bool,
    includes: &[String],
    file: Option<&str>,
) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;

    let mut template = Template::new(id);
    template.title = title;
    template.description = description;
    template.public = public;
    for include in includes {
        template.add_include(ctx.identity(include)?)?;
    }
    if let Some(file) = file {
        template.composition = read_composition_file(Path::new(file))?;
        info!(
            "Seeded {} package(s) and {} repo(s) from {}",
            template.composition.package_count(),
            template.composition.repo_count(),
            file
        );
    }

    store.add_template(&template)?;
    println!("Created template {}", template.id);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_template_update(
    ctx: &Context,
    template: &str,
    title: Option<String>,
    description: Option<String>,
    public: bool,
    private: bool,
    includes: &[String],
    unincludes: &[String],
) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;

    let includes = includes
        .iter()
        .map(|i| ctx.identity(i))
        .collect::<Result<Vec<_>>>()?;
    let unincludes = unincludes
        .iter()
        .map(|i| ctx.identity(i))
        .collect::<Result<Vec<_>>>()?;

    let updated = update_template(&store, &id, |t| {
        if title.is_some() {
            t.title = title;
        }
        if description.is_some() {
            t.description = description;
        }
        if public {
            t.public = true;
        } else if private {
            t.public = false;
        }
        for include in &unincludes {
            if !t.remove_include(include) {
                return Err(anyhow!("{} does not include {}", t.id, include));
            }
        }
        for include in includes {
            t.add_include(include)?;
        }
        Ok(())
    })?;

    println!("Updated template {} (revision {})", updated.id, updated.revision);
    Ok(())
}

pub fn cmd_template_rm(ctx: &Context, template: &str, cascade: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;
    let policy = if cascade {
        DeletePolicy::Cascade
    } else {
        DeletePolicy::Block
    };

    let removed = store.delete_template(&id, policy)?;
    for machine in &removed {
        println!("Removed machine {}", machine);
    }
    println!("Removed template {}", id);
    Ok(())
}

pub fn cmd_template_list(ctx: &Context, all: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let owner = if all { None } else { Some(ctx.owner.as_str()) };
    let templates = store.list_templates(owner)?;

    if templates.is_empty() {
        println!("No templates.");
        return Ok(());
    }

    for template in &templates {
        let visibility = if template.public { "public" } else { "private" };
        println!(
            "{:<32} {:<8} {:>4} pkg {:>3} repo  {}",
            template.id.to_string(),
            visibility,
            template.composition.package_count(),
            template.composition.repo_count(),
            template.display_title()
        );
        if !template.includes.is_empty() {
            let includes: Vec<String> = template.includes.iter().map(|i| i.to_string()).collect();
            println!("    includes: {}", includes.join(", "));
        }
    }
    Ok(())
}

pub fn cmd_template_dump(
    ctx: &Context,
    template: &str,
    format: &str,
    output: Option<&str>,
    effective: bool,
) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;
    let format: DumpFormat = format.parse()?;

    let mut template = store.get_template(&id)?;
    if effective || format == DumpFormat::Kickstart {
        template.composition = store.effective_composition(&id)?;
    }

    let text = dump_template(&template, format)?;
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("Wrote {} ({}) to {}", id, format, path);
        }
        None => print!("{}", text),
    }
    Ok(())
}

pub fn cmd_template_load(
    ctx: &Context,
    file: &str,
    format: Option<&str>,
    replace: bool,
) -> Result<()> {
    let store = ctx.open_store()?;
    let path = Path::new(file);

    let format = match format {
        Some(format) => format.parse()?,
        None => DumpFormat::from_path(path)
            .ok_or_else(|| anyhow!("Cannot tell the dump format of {}; pass --format", file))?,
    };
    let template = load_template(&std::fs::read_to_string(path)?, format)?;

    match store.get_template(&template.id) {
        Ok(existing) if replace => {
            let revision = store.put_template(&template, existing.revision)?;
            println!("Replaced template {} (revision {})", template.id, revision);
        }
        Ok(_) => {
            return Err(anyhow!(
                "Template {} already exists; use --replace to overwrite it",
                template.id
            ));
        }
        Err(canvas::Error::TemplateNotFound(_)) => {
            store.add_template(&template)?;
            println!("Loaded template {}", template.id);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn cmd_template_push(
    ctx: &Context,
    template: &str,
    clean: bool,
    all: bool,
    keep_versions: bool,
    dry_run: bool,
) -> Result<()> {
    let store = ctx.open_store()?;
    let agent = ctx.agent();
    let id = ctx.identity(template)?;

    let options = PushOptions {
        mode: if clean {
            SyncMode::Clean
        } else {
            ctx.config.sync.mode
        },
        all: all || ctx.config.sync.all,
        keep_versions,
        dry_run,
    };

    let controller = SyncController::new(&store, &agent, &agent);
    let prepared = controller.push(&id, &options)?;

    for reason in &prepared.plan.skipped {
        println!("skipped: {}", reason);
    }
    if !prepared.plan.has_changes() {
        println!("Template {} already matches this system.", id);
        return Ok(());
    }

    print_changeset(&prepared.plan.applied);
    if dry_run {
        println!("Dry run: template {} not modified", id);
    } else {
        println!("Pushed into template {}", id);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_template_pull(
    ctx: &Context,
    template: &str,
    clean: bool,
    with_deps: bool,
    remove_deps: bool,
    all: bool,
    dry_run: bool,
) -> Result<()> {
    let store = ctx.open_store()?;
    let agent = ctx.agent();
    let id = ctx.identity(template)?;
    let options = ctx.pull_options(clean, with_deps, remove_deps, all, dry_run);

    // Record a snapshot when this system is the machine following the template
    let machine = match ctx.local_machine() {
        Ok(machine) if store.get_machine(&machine).is_ok_and(|m| m.template == id) => Some(machine),
        _ => None,
    };

    let controller = SyncController::new(&store, &agent, &agent);
    let plan = controller.pull(machine.as_ref(), Some(&id), &options)?;
    print_pull_plan(&plan, dry_run);
    Ok(())
}

pub fn cmd_template_diff(ctx: &Context, template: &str, all: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let agent = ctx.agent();
    let id = ctx.identity(template)?;

    let controller = SyncController::new(&store, &agent, &agent);
    let changes = controller.diff_targets(&Target::Live, &Target::Template(id), all || ctx.config.sync.all)?;
    print_changeset(&changes);
    Ok(())
}
