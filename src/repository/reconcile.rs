// src/repository/reconcile.rs

//! Repository reconciliation: three-way diff, inheritance overlay and
//! candidate selection.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::RepoDefinition;
use crate::model::classify;

/// A repository present on both sides with differing attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoChange {
    pub from: RepoDefinition,
    pub to: RepoDefinition,
}

impl RepoChange {
    pub fn id(&self) -> &str {
        &self.to.id
    }

    /// Names of the attributes that differ
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let (a, b) = (&self.from, &self.to);
        let mut fields = Vec::new();

        if a.display_name() != b.display_name() {
            fields.push("name");
        }
        if a.baseurl != b.baseurl {
            fields.push("baseurl");
        }
        if a.metalink != b.metalink {
            fields.push("metalink");
        }
        if a.mirrorlist != b.mirrorlist {
            fields.push("mirrorlist");
        }
        if a.cost != b.cost {
            fields.push("cost");
        }
        if a.priority != b.priority {
            fields.push("priority");
        }
        if a.enabled != b.enabled {
            fields.push("enabled");
        }
        if a.gpgkey != b.gpgkey {
            fields.push("gpgkey");
        }
        if a.gpgcheck != b.gpgcheck {
            fields.push("gpgcheck");
        }
        if a.skip_if_unavailable != b.skip_if_unavailable {
            fields.push("skip_if_unavailable");
        }
        if a.exclude != b.exclude {
            fields.push("exclude");
        }
        if a.install != b.install {
            fields.push("install");
        }

        fields
    }
}

/// Repository part of a change-set, each list in id order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoChanges {
    pub added: Vec<RepoDefinition>,
    pub removed: Vec<RepoDefinition>,
    pub modified: Vec<RepoChange>,
}

impl RepoChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

fn same_repo(a: &RepoDefinition, b: &RepoDefinition) -> bool {
    a.clone().normalized() == b.clone().normalized()
}

/// Classify repositories by id: only in `to` is added, only in `from` is
/// removed, any attribute difference on a shared id is modified.
pub fn diff_repos(
    from: &BTreeMap<String, RepoDefinition>,
    to: &BTreeMap<String, RepoDefinition>,
) -> RepoChanges {
    let classified = classify(from, to, same_repo);

    RepoChanges {
        added: classified.added.into_iter().cloned().collect(),
        removed: classified.removed.into_iter().cloned().collect(),
        modified: classified
            .modified
            .into_iter()
            .map(|(from, to)| RepoChange {
                from: from.clone(),
                to: to.clone(),
            })
            .collect(),
    }
}

/// Lay `layer` over `base`: a repository id defined in `layer` replaces the
/// base definition as a whole record.
pub fn overlay_repos(
    base: &mut BTreeMap<String, RepoDefinition>,
    layer: &BTreeMap<String, RepoDefinition>,
) {
    for (id, repo) in layer {
        base.insert(id.clone(), repo.clone());
    }
}

/// Preference order between two repositories offering the same package
///
/// Lower priority wins, then lower cost. Ties fall back to id order so the
/// result is deterministic.
pub fn compare_candidates(a: &RepoDefinition, b: &RepoDefinition) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then(a.cost.cmp(&b.cost))
        .then_with(|| a.id.cmp(&b.id))
}

/// Pick the preferred enabled repository among candidates
pub fn select_candidate<'a>(
    candidates: impl IntoIterator<Item = &'a RepoDefinition>,
) -> Option<&'a RepoDefinition> {
    candidates
        .into_iter()
        .filter(|repo| repo.enabled)
        .min_by(|a, b| compare_candidates(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repos(list: &[RepoDefinition]) -> BTreeMap<String, RepoDefinition> {
        list.iter().map(|r| (r.id.clone(), r.clone())).collect()
    }

    #[test]
    fn test_diff_repos_three_way() {
        let from = repos(&[
            RepoDefinition::new("fedora").with_baseurl("http://a/"),
            RepoDefinition::new("old"),
            RepoDefinition::new("updates").with_priority(10),
        ]);
        let to = repos(&[
            RepoDefinition::new("fedora").with_baseurl("http://a/"),
            RepoDefinition::new("new"),
            RepoDefinition::new("updates").with_priority(20),
        ]);

        let changes = diff_repos(&from, &to);
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].id, "new");
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].id, "old");
        assert_eq!(changes.modified.len(), 1);
        assert_eq!(changes.modified[0].id(), "updates");
        assert_eq!(changes.modified[0].changed_fields(), vec!["priority"]);
    }

    #[test]
    fn test_diff_repos_ignores_defaulted_name() {
        let mut unnamed = RepoDefinition::new("fedora");
        unnamed.name = None;
        let from = repos(&[unnamed]);
        let to = repos(&[RepoDefinition::new("fedora")]);
        assert!(diff_repos(&from, &to).is_empty());
    }

    #[test]
    fn test_overlay_replaces_whole_record() {
        let mut base = repos(&[RepoDefinition::new("extras")
            .with_baseurl("http://included/")
            .with_priority(1)]);
        let layer = repos(&[RepoDefinition::new("extras").with_mirrorlist("http://own/list")]);

        overlay_repos(&mut base, &layer);

        let extras = &base["extras"];
        assert!(extras.baseurl.is_empty());
        assert_eq!(extras.priority, 99);
        assert_eq!(extras.mirrorlist.as_deref(), Some("http://own/list"));
    }

    #[test]
    fn test_select_candidate_cost_breaks_priority_tie() {
        let a = RepoDefinition::new("a").with_priority(10).with_cost(50);
        let b = RepoDefinition::new("b").with_priority(10).with_cost(20);
        assert_eq!(select_candidate([&a, &b]).map(|r| r.id.as_str()), Some("b"));
    }

    #[test]
    fn test_select_candidate_priority_wins_over_cost() {
        let a = RepoDefinition::new("a").with_priority(5).with_cost(5000);
        let b = RepoDefinition::new("b").with_priority(10).with_cost(1);
        assert_eq!(select_candidate([&a, &b]).map(|r| r.id.as_str()), Some("a"));
    }

    #[test]
    fn test_select_candidate_skips_disabled() {
        let mut a = RepoDefinition::new("a").with_priority(1);
        a.enabled = false;
        let b = RepoDefinition::new("b");
        assert_eq!(select_candidate([&a, &b]).map(|r| r.id.as_str()), Some("b"));
        assert!(select_candidate([&a]).is_none());
    }
}
