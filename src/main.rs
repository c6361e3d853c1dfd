// src/main.rs

use anyhow::Result;
use canvas::{CanvasConfig, RepoDefinition};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, MachineCommands, PackageCommands, RepoCommands, TemplateCommands};
use commands::Context;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = CanvasConfig::load(cli.config.as_deref())?;
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
    }
    debug!("Using database {}", config.db_path);
    let ctx = Context::new(config, cli.owner);

    match cli.command {
        Commands::Template(cmd) => match cmd {
            TemplateCommands::Add {
                template,
                title,
                description,
                public,
                includes,
                file,
            } => commands::cmd_template_add(
                &ctx,
                &template,
                title,
                description,
                public,
                &includes,
                file.as_deref(),
            ),
            TemplateCommands::Update {
                template,
                title,
                description,
                public,
                private,
                includes,
                unincludes,
            } => commands::cmd_template_update(
                &ctx,
                &template,
                title,
                description,
                public,
                private,
                &includes,
                &unincludes,
            ),
            TemplateCommands::Rm { template, cascade } => {
                commands::cmd_template_rm(&ctx, &template, cascade)
            }
            TemplateCommands::List { all } => commands::cmd_template_list(&ctx, all),
            TemplateCommands::Dump {
                template,
                format,
                output,
                effective,
            } => commands::cmd_template_dump(&ctx, &template, &format, output.as_deref(), effective),
            TemplateCommands::Load {
                file,
                format,
                replace,
            } => commands::cmd_template_load(&ctx, &file, format.as_deref(), replace),
            TemplateCommands::Push {
                template,
                clean,
                all,
                keep_versions,
                dry_run,
            } => commands::cmd_template_push(&ctx, &template, clean, all, keep_versions, dry_run),
            TemplateCommands::Pull {
                template,
                clean,
                with_deps,
                remove_deps,
                all,
                dry_run,
            } => commands::cmd_template_pull(
                &ctx,
                &template,
                clean,
                with_deps,
                remove_deps,
                all,
                dry_run,
            ),
            TemplateCommands::Diff { template, all } => {
                commands::cmd_template_diff(&ctx, &template, all)
            }
        },

        Commands::Package(cmd) => match cmd {
            PackageCommands::Add {
                template,
                packages,
                with_deps,
            } => commands::cmd_package_add(&ctx, &template, &packages, with_deps),
            PackageCommands::Rm { template, packages } => {
                commands::cmd_package_rm(&ctx, &template, &packages)
            }
            PackageCommands::List {
                template,
                effective,
            } => commands::cmd_package_list(&ctx, &template, effective),
        },

        Commands::Repo(cmd) => match cmd {
            RepoCommands::Add {
                template,
                id,
                name,
                baseurl,
                metalink,
                mirrorlist,
                cost,
                priority,
                disabled,
                gpgkey,
                gpgcheck,
                no_skip_if_unavailable,
                exclude,
                include,
                metadata_expire,
                install,
            } => {
                let mut repo = RepoDefinition::new(id)
                    .with_cost(cost)
                    .with_priority(priority);
                if name.is_some() {
                    repo.name = name;
                }
                repo.baseurl = baseurl;
                repo.metalink = metalink;
                repo.mirrorlist = mirrorlist;
                repo.enabled = !disabled;
                repo.gpgkey = gpgkey;
                repo.gpgcheck = gpgcheck;
                repo.skip_if_unavailable = !no_skip_if_unavailable;
                repo.exclude = exclude;
                repo.include = include;
                repo.metadata_expire = metadata_expire;
                repo.install = install;
                commands::cmd_repo_add(&ctx, &template, repo)
            }
            RepoCommands::Rm { template, id } => commands::cmd_repo_rm(&ctx, &template, &id),
            RepoCommands::List {
                template,
                effective,
            } => commands::cmd_repo_list(&ctx, &template, effective),
        },

        Commands::Machine(cmd) => match cmd {
            MachineCommands::Add {
                machine,
                template,
                description,
                location,
            } => commands::cmd_machine_add(&ctx, &machine, &template, description, location),
            MachineCommands::Update {
                machine,
                template,
                description,
                location,
            } => commands::cmd_machine_update(
                &ctx,
                &machine,
                template.as_deref(),
                description,
                location,
            ),
            MachineCommands::Rm { machine } => commands::cmd_machine_rm(&ctx, &machine),
            MachineCommands::List { all } => commands::cmd_machine_list(&ctx, all),
            MachineCommands::Diff { machine, live, all } => {
                commands::cmd_machine_diff(&ctx, machine.as_deref(), live, all)
            }
            MachineCommands::Sync {
                machine,
                clean,
                with_deps,
                remove_deps,
                all,
                incremental,
                dry_run,
            } => commands::cmd_machine_sync(
                &ctx,
                machine.as_deref(),
                clean,
                with_deps,
                remove_deps,
                all,
                incremental,
                dry_run,
            ),
        },

        Commands::Diff {
            from,
            to,
            all,
            json,
        } => commands::cmd_diff(&ctx, from.as_deref(), to.as_deref(), all, json),
    }
}
