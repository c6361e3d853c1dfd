// src/commands/repo.rs

//! Repository commands on a template's own definitions

use anyhow::Result;
use canvas::{Error, RepoDefinition, TemplateStore};

use super::{Context, update_template};

pub fn cmd_repo_add(ctx: &Context, template: &str, repo: RepoDefinition) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;

    if repo.source().is_none() {
        println!(
            "warning: repository {} has no baseurl, metalink or mirrorlist",
            repo.id
        );
    }

    let repo_id = repo.id.clone();
    let mut replaced = false;
    let updated = update_template(&store, &id, |t| {
        replaced = t.composition.add_repo(repo)?.is_some();
        Ok(())
    })?;

    let verb = if replaced { "Replaced" } else { "Added" };
    println!(
        "{} repository {} in {} (revision {})",
        verb, repo_id, updated.id, updated.revision
    );
    Ok(())
}

pub fn cmd_repo_rm(ctx: &Context, template: &str, repo_id: &str) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;

    let updated = update_template(&store, &id, |t| {
        if t.composition.remove_repo(repo_id).is_none() {
            return Err(Error::RepoNotFound(format!("{} in {}", repo_id, t.id)).into());
        }
        Ok(())
    })?;

    println!(
        "Removed repository {} from {} (revision {})",
        repo_id, updated.id, updated.revision
    );
    Ok(())
}

pub fn cmd_repo_list(ctx: &Context, template: &str, effective: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let id = ctx.identity(template)?;

    let (composition, sources) = if effective {
        let resolved = store.resolve(&id)?;
        (resolved.composition, resolved.repo_sources)
    } else {
        (store.get_template(&id)?.composition, Default::default())
    };

    if composition.repo_count() == 0 {
        println!("No repositories.");
        return Ok(());
    }

    for repo in composition.repos() {
        let state = if repo.enabled { "enabled" } else { "disabled" };
        let url = repo.source().map(|s| s.url()).unwrap_or("-");
        print!(
            "{:<24} {:<8} cost={:<5} priority={:<3} {}",
            repo.id, state, repo.cost, repo.priority, url
        );
        match sources.get(&repo.id) {
            Some(source) if *source != id => println!("  (from {})", source),
            _ => println!(),
        }
    }
    Ok(())
}
