// src/commands/package.rs

//! Package commands on a template's own entries

use anyhow::{Result, anyhow};
use canvas::{Direction, NoDependencies, TemplateStore, expand, parse_token};

use super::{Context, update_template};

pub fn cmd_package_add(
    ctx: &Context,
    template: &str,
    packages: &[String],
    with_deps: bool,
) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;

    let requested = packages
        .iter()
        .map(|p| parse_token(p))
        .collect::<canvas::Result<Vec<_>>>()?;

    let expansion = if with_deps {
        let agent = ctx.agent();
        expand(&requested, Direction::Add, true, &agent)
    } else {
        expand(&requested, Direction::Add, false, &NoDependencies)
    };
    for warning in &expansion.warnings {
        println!("warning: {}", warning);
    }

    let updated = update_template(&store, &id, |t| {
        for entry in &expansion.packages {
            t.composition.merge_package(entry.clone())?;
        }
        Ok(())
    })?;

    for entry in &expansion.packages {
        println!("  + {}", entry);
    }
    println!(
        "Added {} package(s) to {} (revision {})",
        expansion.packages.len(),
        updated.id,
        updated.revision
    );
    Ok(())
}

pub fn cmd_package_rm(ctx: &Context, template: &str, packages: &[String]) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;

    let names = packages
        .iter()
        .map(|p| parse_token(p).map(|e| e.spec.name))
        .collect::<canvas::Result<Vec<_>>>()?;

    let updated = update_template(&store, &id, |t| {
        for name in &names {
            if t.composition.remove_package(name).is_none() {
                return Err(anyhow!("Package {} is not in template {}", name, t.id));
            }
        }
        Ok(())
    })?;

    for name in &names {
        println!("  - {}", name);
    }
    println!(
        "Removed {} package(s) from {} (revision {})",
        names.len(),
        updated.id,
        updated.revision
    );
    Ok(())
}

pub fn cmd_package_list(ctx: &Context, template: &str, effective: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;

    if effective {
        let resolved = store.resolve(&id)?;
        if resolved.composition.package_count() == 0 {
            println!("No packages.");
            return Ok(());
        }
        for entry in resolved.composition.packages() {
            match resolved.package_sources.get(entry.name()) {
                Some(source) if *source != id => println!("{:<48} (from {})", entry, source),
                _ => println!("{}", entry),
            }
        }
        return Ok(());
    }

    let template = store.get_template(&id)?;
    if template.composition.package_count() == 0 {
        println!("No packages.");
        return Ok(());
    }
    for entry in template.composition.packages() {
        println!("{}", entry);
    }
    Ok(())
}
