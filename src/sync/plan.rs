// src/sync/plan.rs

//! Pure pull and push planning

use tracing::{debug, warn};

use super::{PullOptions, PushOptions, SyncMode};
use crate::dependencies::{DependencySource, Direction, UnresolvedDependency, expand};
use crate::model::{ChangeSet, Composition, compute_diff};
use crate::package::{PackageEntry, PackageSpec};
use crate::repository::RepoDefinition;

/// What a pull will do to a machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullPlan {
    /// Full change-set from the machine to the target
    pub changeset: ChangeSet,

    /// The part of `changeset` the sync mode applies
    pub applied: ChangeSet,

    pub install: Vec<PackageEntry>,
    pub upgrade: Vec<PackageEntry>,
    pub remove: Vec<PackageEntry>,

    /// Repository definitions to write (added or modified)
    pub repos_apply: Vec<RepoDefinition>,
    pub repos_remove: Vec<RepoDefinition>,

    /// Dependency lookups that failed; the packages themselves are kept
    pub warnings: Vec<UnresolvedDependency>,

    /// Machine composition once the plan has been carried out
    pub result: Composition,
}

impl PullPlan {
    /// Whether carrying out the plan would touch the machine
    pub fn has_actions(&self) -> bool {
        !self.install.is_empty()
            || !self.upgrade.is_empty()
            || !self.remove.is_empty()
            || !self.repos_apply.is_empty()
            || !self.repos_remove.is_empty()
    }

    /// Human-readable summary, one line per action
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for repo in &self.repos_apply {
            lines.push(format!("repo {}", repo.id));
        }
        for repo in &self.repos_remove {
            lines.push(format!("-repo {}", repo.id));
        }
        for entry in &self.install {
            lines.push(format!("+{}", entry));
        }
        for entry in &self.upgrade {
            lines.push(format!("~{}", entry));
        }
        for entry in &self.remove {
            lines.push(format!("-{}", entry.spec));
        }
        lines
    }
}

/// Plan a pull that takes a machine at `from` towards `to`
///
/// Additive pulls install new packages, flip inclusion modes (which is how
/// explicit exclusions get removed) and write added or modified
/// repositories. Clean pulls additionally apply version changes and remove
/// everything the target does not mention, so that `result` carries exactly
/// the target's keys.
pub fn plan_pull(
    from: &Composition,
    to: &Composition,
    options: &PullOptions,
    deps: &dyn DependencySource,
) -> PullPlan {
    let changeset = compute_diff(from, to);
    let clean = options.mode == SyncMode::Clean;

    let mut applied = ChangeSet::new();
    applied.packages_to_add = changeset.packages_to_add.clone();
    applied.packages_to_modify = changeset
        .packages_to_modify
        .iter()
        .filter(|c| clean || c.is_mode_change())
        .cloned()
        .collect();
    applied.repos_to_add = changeset.repos_to_add.clone();
    applied.repos_to_modify = changeset.repos_to_modify.clone();
    if clean {
        applied.packages_to_remove = changeset.packages_to_remove.clone();
        applied.repos_to_remove = changeset.repos_to_remove.clone();
    }

    let mut install: Vec<PackageEntry> = applied
        .packages_to_add
        .iter()
        .filter(|e| e.is_included())
        .cloned()
        .collect();
    let mut upgrade = Vec::new();
    let mut remove: Vec<PackageEntry> = applied
        .packages_to_remove
        .iter()
        .filter(|e| e.is_included())
        .cloned()
        .collect();

    for change in &applied.packages_to_modify {
        if change.is_version_change() {
            upgrade.push(change.to.clone());
        } else if change.to.is_included() {
            install.push(change.to.clone());
        } else if change.from.is_included() {
            remove.push(change.from.clone());
        }
    }

    let mut warnings = Vec::new();

    let expansion = expand(&install, Direction::Add, options.with_deps, deps);
    warnings.extend(expansion.warnings);
    let install: Vec<PackageEntry> = expansion
        .packages
        .into_iter()
        .filter(|e| match to.package(e.name()) {
            Some(target) if target.is_excluded() => {
                warn!("Not installing {}: excluded by the target", e.name());
                false
            }
            _ => true,
        })
        .filter(|e| {
            // Dependencies the machine already has need no action
            to.contains_package(e.name()) || !from.package(e.name()).is_some_and(|f| f.is_included())
        })
        .collect();

    let expansion = expand(&remove, Direction::Remove, options.remove_deps, deps);
    warnings.extend(expansion.warnings);
    let remove: Vec<PackageEntry> = expansion
        .packages
        .into_iter()
        .filter(|e| match to.package(e.name()) {
            Some(target) if target.is_included() => {
                debug!("Keeping {}: required by the target", e.name());
                false
            }
            _ => true,
        })
        .collect();

    let repos_apply: Vec<RepoDefinition> = applied
        .repos_to_add
        .iter()
        .cloned()
        .chain(applied.repos_to_modify.iter().map(|c| c.to.clone()))
        .collect();
    let repos_remove = applied.repos_to_remove.clone();

    let result = applied.apply_to(from);

    debug!(
        "Pull plan ({}): {} install, {} upgrade, {} remove, {} repo(s)",
        options.mode,
        install.len(),
        upgrade.len(),
        remove.len(),
        repos_apply.len() + repos_remove.len()
    );

    PullPlan {
        changeset,
        applied,
        install,
        upgrade,
        remove,
        repos_apply,
        repos_remove,
        warnings,
        result,
    }
}

/// What a push will change in a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushPlan {
    /// Full change-set from the template's effective composition to the machine
    pub changeset: ChangeSet,

    /// The part of `changeset` recorded into the template
    pub applied: ChangeSet,

    /// Changes that could not be recorded, with the reason
    pub skipped: Vec<String>,

    /// The template's own composition after the push
    pub result: Composition,
}

impl PushPlan {
    pub fn has_changes(&self) -> bool {
        !self.applied.is_empty()
    }
}

fn recorded_spec(live: &PackageSpec, previous: Option<&PackageSpec>, keep_versions: bool) -> PackageSpec {
    let pinned = previous.is_some_and(PackageSpec::has_evr);
    if keep_versions || pinned {
        live.clone()
    } else {
        live.without_evr()
    }
}

/// Plan a push of a machine at `live` into a template
///
/// `own` is the template's own composition and `effective` its composition
/// with includes applied; the diff is taken against `effective` and
/// recorded into `own`. Additive pushes record new packages, version
/// changes and repository additions. Clean pushes also record mode flips
/// and removals; removing a package that only arrives through an include
/// is recorded as an exclusion in the template itself.
///
/// Exclusions the machine already satisfies are left alone.
pub fn plan_push(
    own: &Composition,
    effective: &Composition,
    live: &Composition,
    options: &PushOptions,
) -> PushPlan {
    let changeset = compute_diff(effective, live);
    let clean = options.mode == SyncMode::Clean;

    let mut result = own.clone();
    let mut applied = ChangeSet::new();
    let mut skipped = Vec::new();

    for entry in &changeset.packages_to_add {
        let spec = recorded_spec(&entry.spec, None, options.keep_versions);
        let recorded = PackageEntry {
            spec,
            mode: entry.mode,
        };
        if result.add_package(recorded).is_ok() {
            applied.packages_to_add.push(entry.clone());
        }
    }

    for change in &changeset.packages_to_modify {
        if change.is_mode_change() && !clean {
            skipped.push(format!(
                "{} is excluded by the template (use a clean push to include it)",
                change.name()
            ));
            continue;
        }
        let spec = recorded_spec(&change.to.spec, Some(&change.from.spec), options.keep_versions);
        let recorded = PackageEntry {
            spec,
            mode: change.to.mode,
        };
        if result.add_package(recorded).is_ok() {
            applied.packages_to_modify.push(change.clone());
        }
    }

    for entry in &changeset.packages_to_remove {
        if entry.is_excluded() {
            continue;
        }
        if !clean {
            skipped.push(format!("{} is not installed (kept by additive push)", entry.name()));
            continue;
        }
        if result.remove_package(entry.name()).is_none() {
            // Only present through an include: override it locally
            let exclusion = PackageEntry::excluded(entry.spec.without_evr());
            if result.add_package(exclusion).is_err() {
                continue;
            }
        }
        applied.packages_to_remove.push(entry.clone());
    }

    for repo in &changeset.repos_to_add {
        if result.add_repo(repo.clone()).is_ok() {
            applied.repos_to_add.push(repo.clone());
        }
    }
    for change in &changeset.repos_to_modify {
        if result.add_repo(change.to.clone()).is_ok() {
            applied.repos_to_modify.push(change.clone());
        }
    }
    for repo in &changeset.repos_to_remove {
        if !clean {
            skipped.push(format!("repo {} is not configured (kept by additive push)", repo.id));
        } else if result.remove_repo(&repo.id).is_some() {
            applied.repos_to_remove.push(repo.clone());
        } else {
            warn!("Repo {} comes from an included template and cannot be removed", repo.id);
            skipped.push(format!("repo {} comes from an included template", repo.id));
        }
    }

    PushPlan {
        changeset,
        applied,
        skipped,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::NoDependencies;

    fn composition(tokens: &[&str]) -> Composition {
        Composition::from_packages(tokens.iter().map(|t| PackageEntry::parse(t).unwrap())).unwrap()
    }

    fn names(entries: &[PackageEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name()).collect()
    }

    fn pull(from: &Composition, to: &Composition, mode: SyncMode) -> PullPlan {
        let options = PullOptions {
            mode,
            ..Default::default()
        };
        plan_pull(from, to, &options, &NoDependencies)
    }

    #[test]
    fn test_additive_pull_never_removes_unmentioned() {
        let machine = composition(&["bash", "firefox", "totem"]);
        let target = composition(&["kodi", "~totem"]);

        let plan = pull(&machine, &target, SyncMode::Additive);
        assert_eq!(names(&plan.install), vec!["kodi"]);
        assert_eq!(names(&plan.remove), vec!["totem"]);
        assert!(plan.result.contains_package("bash"));
        assert!(plan.result.contains_package("firefox"));
        assert!(plan.result.package("totem").unwrap().is_excluded());
    }

    #[test]
    fn test_additive_pull_skips_version_changes() {
        let plan = pull(
            &composition(&["kodi@17.0-1"]),
            &composition(&["kodi@18.0-1"]),
            SyncMode::Additive,
        );
        assert!(plan.upgrade.is_empty());
        assert!(!plan.has_actions());
    }

    #[test]
    fn test_clean_pull_matches_target() {
        let machine = composition(&["bash", "kodi@17.0-1", "totem"]);
        let target = composition(&["kodi@18.0-1", "vlc", "~totem"]);

        let plan = pull(&machine, &target, SyncMode::Clean);
        assert_eq!(names(&plan.install), vec!["vlc"]);
        assert_eq!(names(&plan.upgrade), vec!["kodi"]);
        assert_eq!(names(&plan.remove), vec!["bash", "totem"]);
        assert!(compute_diff(&plan.result, &target).is_empty());

        let again = pull(&plan.result, &target, SyncMode::Clean);
        assert!(again.changeset.is_empty());
        assert!(!again.has_actions());
    }

    #[test]
    fn test_excluded_target_not_installed_is_noop() {
        let plan = pull(&composition(&[]), &composition(&["~totem"]), SyncMode::Clean);
        assert_eq!(plan.changeset.packages_to_add.len(), 1);
        assert!(!plan.has_actions());
    }

    #[test]
    fn test_push_additive_records_new_packages_without_versions() {
        let own = composition(&["kodi"]);
        let live = composition(&["kodi@18.0-1:x86_64", "vlc@3.0-1:x86_64"]);

        let plan = plan_push(&own, &own, &live, &PushOptions::default());
        assert_eq!(plan.result.package("vlc").unwrap().render(), "vlc:x86_64");
        assert_eq!(plan.result.package("kodi").unwrap().render(), "kodi");
        assert_eq!(plan.applied.added_names(), vec!["vlc"]);
    }

    #[test]
    fn test_push_updates_pinned_versions() {
        let own = composition(&["kodi@17.0-1"]);
        let live = composition(&["kodi@18.0-1:x86_64"]);
        let plan = plan_push(&own, &own, &live, &PushOptions::default());
        assert_eq!(plan.result.package("kodi").unwrap().render(), "kodi@18.0-1:x86_64");
    }

    #[test]
    fn test_push_additive_keeps_removals() {
        let own = composition(&["kodi", "vlc"]);
        let live = composition(&["kodi"]);
        let plan = plan_push(&own, &own, &live, &PushOptions::default());
        assert!(plan.result.contains_package("vlc"));
        assert_eq!(plan.skipped.len(), 1);
    }

    #[test]
    fn test_push_clean_excludes_inherited() {
        let own = composition(&["kodi"]);
        let effective = composition(&["kodi", "nano", "~totem"]);
        let live = composition(&["kodi"]);

        let options = PushOptions {
            mode: SyncMode::Clean,
            ..Default::default()
        };
        let plan = plan_push(&own, &effective, &live, &options);
        assert!(plan.result.package("nano").unwrap().is_excluded());
        assert!(!plan.result.contains_package("totem"));
        assert_eq!(plan.applied.removed_names(), vec!["nano"]);
    }
}
