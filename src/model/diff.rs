// src/model/diff.rs

//! Diff computation between two compositions.
//!
//! `compute_diff(from, to)` classifies every package name and repository
//! id: present only in `to` is an addition, present only in `from` is a
//! removal, present in both but not identical is a modification. Swapping
//! the arguments swaps additions and removals, which is what lets push and
//! pull share one engine.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::Composition;
use crate::package::PackageEntry;
use crate::repository::{RepoChange, RepoDefinition, diff_repos};

/// Keyed three-way classification, in key order
pub(crate) struct Classified<'a, V> {
    pub added: Vec<&'a V>,
    pub removed: Vec<&'a V>,
    pub modified: Vec<(&'a V, &'a V)>,
}

pub(crate) fn classify<'a, V>(
    from: &'a BTreeMap<String, V>,
    to: &'a BTreeMap<String, V>,
    same: impl Fn(&V, &V) -> bool,
) -> Classified<'a, V> {
    let mut classified = Classified {
        added: Vec::new(),
        removed: Vec::new(),
        modified: Vec::new(),
    };

    for (key, old) in from {
        match to.get(key) {
            None => classified.removed.push(old),
            Some(new) if !same(old, new) => classified.modified.push((old, new)),
            Some(_) => {}
        }
    }

    for (key, new) in to {
        if !from.contains_key(key) {
            classified.added.push(new);
        }
    }

    classified
}

/// A package present on both sides that is not identical
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageChange {
    pub from: PackageEntry,
    pub to: PackageEntry,
}

impl PackageChange {
    pub fn name(&self) -> &str {
        self.to.name()
    }

    /// Inclusion mode flipped (install target vs. removal target)
    pub fn is_mode_change(&self) -> bool {
        self.from.mode != self.to.mode
    }

    /// Both sides are install targets; only version or arch differ
    pub fn is_version_change(&self) -> bool {
        !self.is_mode_change() && self.to.is_included()
    }
}

/// Add/remove/modify decomposition of two compositions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub packages_to_add: Vec<PackageEntry>,
    pub packages_to_remove: Vec<PackageEntry>,
    pub packages_to_modify: Vec<PackageChange>,
    pub repos_to_add: Vec<RepoDefinition>,
    pub repos_to_remove: Vec<RepoDefinition>,
    pub repos_to_modify: Vec<RepoChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no changes are needed
    pub fn is_empty(&self) -> bool {
        self.packages_to_add.is_empty()
            && self.packages_to_remove.is_empty()
            && self.packages_to_modify.is_empty()
            && self.repos_to_add.is_empty()
            && self.repos_to_remove.is_empty()
            && self.repos_to_modify.is_empty()
    }

    pub fn package_change_count(&self) -> usize {
        self.packages_to_add.len() + self.packages_to_remove.len() + self.packages_to_modify.len()
    }

    pub fn repo_change_count(&self) -> usize {
        self.repos_to_add.len() + self.repos_to_remove.len() + self.repos_to_modify.len()
    }

    /// Names of packages added, in order
    pub fn added_names(&self) -> Vec<&str> {
        self.packages_to_add.iter().map(|e| e.name()).collect()
    }

    /// Names of packages removed, in order
    pub fn removed_names(&self) -> Vec<&str> {
        self.packages_to_remove.iter().map(|e| e.name()).collect()
    }

    /// Apply every change to `base`
    ///
    /// For `diff(a, b)` the result of applying to `a` matches `b` on every
    /// key, so re-diffing the result against `b` yields an empty change-set.
    pub fn apply_to(&self, base: &Composition) -> Composition {
        let mut result = base.clone();

        for entry in &self.packages_to_remove {
            result.remove_package(entry.name());
        }
        for entry in &self.packages_to_add {
            result.packages.insert(entry.spec.name.clone(), entry.clone());
        }
        for change in &self.packages_to_modify {
            result
                .packages
                .insert(change.to.spec.name.clone(), change.to.clone());
        }

        for repo in &self.repos_to_remove {
            result.remove_repo(&repo.id);
        }
        for repo in self
            .repos_to_add
            .iter()
            .chain(self.repos_to_modify.iter().map(|c| &c.to))
        {
            result.repos.insert(repo.id.clone(), repo.clone());
        }

        result
    }

    /// One human-readable line per change
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for repo in &self.repos_to_add {
            lines.push(format!("+repo {}", repo.id));
        }
        for repo in &self.repos_to_remove {
            lines.push(format!("-repo {}", repo.id));
        }
        for change in &self.repos_to_modify {
            lines.push(format!(
                "~repo {} ({})",
                change.id(),
                change.changed_fields().join(", ")
            ));
        }

        for entry in &self.packages_to_add {
            lines.push(format!("+{}", entry));
        }
        for entry in &self.packages_to_remove {
            lines.push(format!("-{}", entry));
        }
        for change in &self.packages_to_modify {
            lines.push(format!("~{} {} -> {}", change.name(), change.from, change.to));
        }

        lines
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

fn same_package(a: &PackageEntry, b: &PackageEntry) -> bool {
    a.is_identical(b)
}

/// Compute the change-set that takes `from` to `to`
pub fn compute_diff(from: &Composition, to: &Composition) -> ChangeSet {
    let packages = classify(from.package_map(), to.package_map(), same_package);
    let repos = diff_repos(from.repo_map(), to.repo_map());

    ChangeSet {
        packages_to_add: packages.added.into_iter().cloned().collect(),
        packages_to_remove: packages.removed.into_iter().cloned().collect(),
        packages_to_modify: packages
            .modified
            .into_iter()
            .map(|(from, to)| PackageChange {
                from: from.clone(),
                to: to.clone(),
            })
            .collect(),
        repos_to_add: repos.added,
        repos_to_remove: repos.removed,
        repos_to_modify: repos.modified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::parse_token;

    fn composition(tokens: &[&str]) -> Composition {
        Composition::from_packages(tokens.iter().map(|t| parse_token(t).unwrap())).unwrap()
    }

    fn samples() -> Vec<Composition> {
        let mut with_repo = composition(&["kodi", "~vlc"]);
        with_repo
            .add_repo(RepoDefinition::new("rpmfusion").with_baseurl("http://x/"))
            .unwrap();

        let mut moved_repo = composition(&["kodi@18.0-1:x86_64"]);
        moved_repo
            .add_repo(
                RepoDefinition::new("rpmfusion")
                    .with_baseurl("http://y/")
                    .with_cost(50),
            )
            .unwrap();

        vec![
            Composition::new(),
            composition(&["kodi"]),
            composition(&["kodi@18.0-1:x86_64", "totem", "vlc"]),
            composition(&["~totem", "~vlc", "kodi"]),
            composition(&["foo#1@2.0-1", "bar:noarch"]),
            with_repo,
            moved_repo,
        ]
    }

    #[test]
    fn test_empty_diff() {
        let diff = compute_diff(&Composition::new(), &Composition::new());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_identity() {
        for a in samples() {
            assert!(compute_diff(&a, &a).is_empty());
        }
    }

    #[test]
    fn test_diff_symmetry() {
        for a in samples() {
            for b in samples() {
                let ab = compute_diff(&a, &b);
                let ba = compute_diff(&b, &a);
                assert_eq!(ab.packages_to_add, ba.packages_to_remove);
                assert_eq!(ab.packages_to_remove, ba.packages_to_add);
                assert_eq!(ab.repos_to_add, ba.repos_to_remove);
                assert_eq!(ab.repos_to_remove, ba.repos_to_add);
                assert_eq!(ab.packages_to_modify.len(), ba.packages_to_modify.len());
                for change in &ab.packages_to_modify {
                    let reverse = ba
                        .packages_to_modify
                        .iter()
                        .find(|c| c.name() == change.name())
                        .unwrap();
                    assert_eq!(reverse.from, change.to);
                    assert_eq!(reverse.to, change.from);
                }

                assert_eq!(ab.repos_to_modify.len(), ba.repos_to_modify.len());
                for change in &ab.repos_to_modify {
                    let reverse = ba
                        .repos_to_modify
                        .iter()
                        .find(|c| c.id() == change.id())
                        .unwrap();
                    assert_eq!(reverse.from, change.to);
                    assert_eq!(reverse.to, change.from);
                }
            }
        }
    }

    #[test]
    fn test_apply_reaches_target() {
        for a in samples() {
            for b in samples() {
                let applied = compute_diff(&a, &b).apply_to(&a);
                assert!(compute_diff(&applied, &b).is_empty());
            }
        }
    }

    #[test]
    fn test_classification() {
        let from = composition(&["kodi@17.0-1", "totem", "vlc"]);
        let to = composition(&["kodi@18.0-1", "~vlc", "mpv"]);

        let diff = compute_diff(&from, &to);
        assert_eq!(diff.added_names(), vec!["mpv"]);
        assert_eq!(diff.removed_names(), vec!["totem"]);

        let modified: Vec<&str> = diff.packages_to_modify.iter().map(|c| c.name()).collect();
        assert_eq!(modified, vec!["kodi", "vlc"]);
        assert!(diff.packages_to_modify[0].is_version_change());
        assert!(diff.packages_to_modify[1].is_mode_change());
        assert_eq!(diff.packages_to_modify[0].from.render(), "kodi@17.0-1");
    }

    #[test]
    fn test_exclusion_only_in_target_is_an_add() {
        let diff = compute_diff(&composition(&[]), &composition(&["~totem"]));
        assert_eq!(diff.packages_to_add.len(), 1);
        assert!(diff.packages_to_add[0].is_excluded());
    }

    #[test]
    fn test_unversioned_matches_versioned() {
        let diff = compute_diff(&composition(&["kodi@18.0-1:x86_64"]), &composition(&["kodi"]));
        assert!(diff.is_empty());

        let diff = compute_diff(
            &composition(&["kodi:x86_64"]),
            &composition(&["kodi:i686"]),
        );
        assert_eq!(diff.packages_to_modify.len(), 1);
    }

    #[test]
    fn test_lexical_order() {
        let diff = compute_diff(&composition(&[]), &composition(&["zsh", "bash", "mc"]));
        assert_eq!(diff.added_names(), vec!["bash", "mc", "zsh"]);
    }

    #[test]
    fn test_lines() {
        let from = composition(&["totem", "kodi@17.0-1"]);
        let to = composition(&["~totem", "kodi@18.0-1", "mpv"]);
        let diff = compute_diff(&from, &to);
        assert_eq!(
            diff.lines(),
            vec![
                "+mpv",
                "~kodi kodi@17.0-1 -> kodi@18.0-1",
                "~totem totem -> ~totem",
            ]
        );
    }
}
