// src/agent/rpm.rs

//! RPM/DNF system agent
//!
//! The installed package set comes from the RPM database via `rpm -qa`;
//! `dnf repoquery --userinstalled` narrows it to packages a user asked for.
//! Repositories are the `.repo` files in the configured repo directory.
//! Package changes are handed to the configured package manager.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use super::{LiveOptions, SystemAgent};
use crate::config::AgentConfig;
use crate::dependencies::DependencySource;
use crate::error::{Error, Result};
use crate::model::Composition;
use crate::package::{PackageEntry, PackageSpec, is_valid_name};
use crate::repository::{RepoDefinition, parse_repo_file, render_repo_file};

const QUERY_FORMAT: &str = "%{NAME}\t%{EPOCH}\t%{VERSION}\t%{RELEASE}\t%{ARCH}\n";

/// Pseudo-packages the RPM database reports that are not installable
const IGNORED_PACKAGES: &[&str] = &["gpg-pubkey", "gpg-pubkey-release"];

fn field(value: &str) -> Option<&str> {
    match value.trim() {
        "" | "(none)" => None,
        v => Some(v),
    }
}

/// Parse `rpm -qa` output in the agent's query format
///
/// Names outside the package name character class cannot be represented
/// in a composition and are skipped with a warning. When several
/// architectures of one package are installed the first one listed is
/// kept.
pub fn parse_installed(output: &str) -> Vec<PackageEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 5 {
            continue;
        }

        let name = parts[0].trim();
        if name.is_empty() || IGNORED_PACKAGES.contains(&name) {
            continue;
        }
        if !is_valid_name(name) {
            warn!("Skipping installed package with unsupported name: {}", name);
            continue;
        }
        if !seen.insert(name.to_string()) {
            debug!("Multiple architectures of {} installed, keeping first", name);
            continue;
        }

        let mut spec = PackageSpec::new(name);
        if let (Some(version), Some(release)) = (field(parts[2]), field(parts[3])) {
            spec = spec.with_evr(field(parts[1]).and_then(|e| e.parse().ok()), version, release);
        }
        if let Some(arch) = field(parts[4]) {
            spec = spec.with_arch(arch);
        }

        if spec.validate().is_err() {
            warn!("Skipping installed package with unparsable version: {}", line);
            continue;
        }
        entries.push(PackageEntry::included(spec));
    }

    entries
}

/// Every `.repo` file in `dir`, in file name order
fn read_repo_dir(dir: &Path) -> Result<Vec<(PathBuf, Vec<RepoDefinition>)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "repo"))
        .collect();
    paths.sort();

    let mut files = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(&path)?;
        match parse_repo_file(&content) {
            Ok(repos) => files.push((path, repos)),
            Err(e) => warn!("Ignoring unreadable repo file {}: {}", path.display(), e),
        }
    }
    Ok(files)
}

/// Write added/modified repositories into `dir` and drop removed ones
///
/// A repository already defined in some file is rewritten in place; new
/// ones get their own `canvas-<id>.repo`. A file left with no sections is
/// deleted.
pub fn apply_repo_changes(dir: &Path, add: &[RepoDefinition], remove: &[RepoDefinition]) -> Result<()> {
    let mut files = read_repo_dir(dir)?;
    let mut dirty: BTreeSet<usize> = BTreeSet::new();

    for repo in remove {
        for (index, (_, repos)) in files.iter_mut().enumerate() {
            let before = repos.len();
            repos.retain(|r| r.id != repo.id);
            if repos.len() != before {
                dirty.insert(index);
            }
        }
    }

    for repo in add {
        let existing = files.iter_mut().enumerate().find_map(|(index, (_, repos))| {
            repos
                .iter_mut()
                .find(|r| r.id == repo.id)
                .map(|slot| (index, slot))
        });

        match existing {
            Some((index, slot)) => {
                *slot = repo.clone();
                dirty.insert(index);
            }
            None => {
                files.push((dir.join(format!("canvas-{}.repo", repo.id)), vec![repo.clone()]));
                dirty.insert(files.len() - 1);
            }
        }
    }

    if !dirty.is_empty() {
        std::fs::create_dir_all(dir)?;
    }

    for index in dirty {
        let (path, repos) = &files[index];
        if repos.is_empty() {
            info!("Removing empty repo file {}", path.display());
            std::fs::remove_file(path)?;
        } else {
            info!("Writing repo file {}", path.display());
            std::fs::write(path, render_repo_file(repos))?;
        }
    }

    Ok(())
}

/// System agent for RPM-based distributions
#[derive(Debug, Clone)]
pub struct RpmAgent {
    config: AgentConfig,
}

impl RpmAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    fn capture(&self, program: &str, args: &[&str]) -> Result<String> {
        debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::AgentError(format!("Failed to run {}: {}. Is it installed?", program, e)))?;

        if !output.status.success() {
            return Err(Error::AgentError(format!(
                "{} {} failed: {}",
                program,
                args.first().unwrap_or(&""),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a package manager transaction
    fn transact(&self, verb: &str, targets: &[String]) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }

        let program = which::which(&self.config.package_manager).map_err(|e| {
            Error::AgentError(format!(
                "package manager '{}' not found: {}",
                self.config.package_manager, e
            ))
        })?;

        let mut cmd = Command::new(&program);
        cmd.arg(verb);
        if self.config.assume_yes {
            cmd.arg("-y");
        }
        cmd.args(targets);

        info!("{} {} {}", self.config.package_manager, verb, targets.join(" "));
        let status = cmd.status().map_err(|e| {
            Error::AgentError(format!("Failed to run {}: {}", program.display(), e))
        })?;

        if !status.success() {
            return Err(Error::AgentError(format!(
                "{} {} exited with {}",
                self.config.package_manager, verb, status
            )));
        }
        Ok(())
    }

    fn user_installed(&self) -> Result<HashSet<String>> {
        let output = self.capture(
            &self.config.package_manager,
            &["repoquery", "--userinstalled", "--qf", "%{name}\n"],
        )?;
        Ok(output
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }
}

impl SystemAgent for RpmAgent {
    fn live_composition(&self, options: LiveOptions) -> Result<Composition> {
        let output = self.capture("rpm", &["-qa", "--queryformat", QUERY_FORMAT])?;
        let mut installed = parse_installed(&output);
        debug!("Found {} installed packages", installed.len());

        if !options.all {
            let user = self.user_installed()?;
            installed.retain(|e| user.contains(e.name()));
            debug!("{} packages were installed by a user", installed.len());
        }

        let mut composition = Composition::from_packages(installed)?;
        for (_, repos) in read_repo_dir(&self.config.repo_dir)? {
            for repo in repos {
                composition.add_repo(repo)?;
            }
        }

        Ok(composition)
    }

    fn install(&self, packages: &[PackageEntry]) -> Result<()> {
        let targets: Vec<String> = packages.iter().map(|e| e.spec.nevra()).collect();
        self.transact("install", &targets)
    }

    fn remove(&self, packages: &[PackageEntry]) -> Result<()> {
        let targets: Vec<String> = packages.iter().map(|e| e.spec.nevra()).collect();
        self.transact("remove", &targets)
    }

    fn upgrade(&self, packages: &[PackageEntry]) -> Result<()> {
        for entry in packages {
            let target = [entry.spec.nevra()];
            if let Err(e) = self.transact("upgrade", &target) {
                if !entry.spec.has_evr() {
                    return Err(e);
                }
                // A pinned older version cannot be reached by upgrading
                debug!("Upgrade of {} failed ({}), trying downgrade", target[0], e);
                self.transact("downgrade", &target)?;
            }
        }
        Ok(())
    }

    fn apply_repos(&self, add: &[RepoDefinition], remove: &[RepoDefinition]) -> Result<()> {
        apply_repo_changes(&self.config.repo_dir, add, remove)
    }
}

impl DependencySource for RpmAgent {
    fn requires(&self, package: &PackageSpec) -> Result<Vec<PackageSpec>> {
        let nevra = package.nevra();
        let output = self
            .capture(
                &self.config.package_manager,
                &["repoquery", "--requires", "--resolve", "--qf", "%{name}\n", &nevra],
            )
            .map_err(|e| Error::DependencyUnresolvable {
                package: package.name.clone(),
                reason: e.to_string(),
            })?;

        let names: BTreeSet<&str> = output
            .lines()
            .map(str::trim)
            .filter(|n| is_valid_name(n) && *n != package.name)
            .collect();

        Ok(names.into_iter().map(PackageSpec::new).collect())
    }
}
