// src/commands/diff.rs

//! Generic diff between templates, machines, files and the live system

use anyhow::Result;
use canvas::{SyncController, Target, TemplateStore};
use tracing::debug;

use super::{Context, print_changeset};

pub fn cmd_diff(
    ctx: &Context,
    from: Option<&str>,
    to: Option<&str>,
    all: bool,
    json: bool,
) -> Result<()> {
    let store = ctx.open_store()?;
    let agent = ctx.agent();
    let all = all || ctx.config.sync.all;

    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (
            Target::parse(from, &ctx.owner)?,
            Target::parse(to, &ctx.owner)?,
        ),
        (Some(target), None) => (Target::Live, Target::parse(target, &ctx.owner)?),
        (None, _) => {
            let machine = store.get_machine(&ctx.local_machine()?)?;
            (Target::Live, Target::Template(machine.template))
        }
    };
    debug!("Diffing {} -> {}", from, to);

    let controller = SyncController::new(&store, &agent, &agent);
    let changes = controller.diff_targets(&from, &to, all)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    } else {
        print_changeset(&changes);
    }
    Ok(())
}
