// src/model/mod.rs

//! Compositions, templates and machines
//!
//! A [`Composition`] is the unit of comparison: a set of package entries
//! keyed by name and a set of repositories keyed by id. Templates, a
//! machine's live state and ad-hoc packagelist files are all compositions,
//! so any two of them can be diffed.
//!
//! Templates may include other templates. The effective composition of a
//! template is a fold over its layers: each included template's effective
//! composition in order, then the template's own entries, with later layers
//! replacing earlier ones by package name and repository id.

mod diff;
mod dump;
mod resolve;
mod template;

pub use diff::{ChangeSet, PackageChange, compute_diff};
pub(crate) use diff::classify;
pub use dump::{
    DumpFormat, DumpHeader, TemplateDump, dump_template, load_template, parse_kickstart,
    read_composition_file,
};
pub use resolve::{ResolvedTemplate, resolve_template};
pub use template::{Identity, Machine, Template};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::package::PackageEntry;
use crate::repository::{RepoDefinition, overlay_repos};

/// Packages and repositories presented by a template or machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CompositionData", into = "CompositionData")]
pub struct Composition {
    packages: BTreeMap<String, PackageEntry>,
    repos: BTreeMap<String, RepoDefinition>,
}

/// Serialized shape of a composition: plain lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CompositionData {
    #[serde(default)]
    packages: Vec<PackageEntry>,
    #[serde(default)]
    repos: Vec<RepoDefinition>,
}

impl TryFrom<CompositionData> for Composition {
    type Error = Error;

    fn try_from(data: CompositionData) -> Result<Self> {
        let mut composition = Composition::new();
        for entry in data.packages {
            composition.add_package(entry)?;
        }
        for repo in data.repos {
            composition.add_repo(repo)?;
        }
        Ok(composition)
    }
}

impl From<Composition> for CompositionData {
    fn from(composition: Composition) -> Self {
        Self {
            packages: composition.packages.into_values().collect(),
            repos: composition.repos.into_values().collect(),
        }
    }
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a packages-only composition
    pub fn from_packages(entries: impl IntoIterator<Item = PackageEntry>) -> Result<Self> {
        let mut composition = Self::new();
        for entry in entries {
            composition.add_package(entry)?;
        }
        Ok(composition)
    }

    /// Fold layers in order; later layers override earlier ones by key
    pub fn layered<'a>(layers: impl IntoIterator<Item = &'a Composition>) -> Self {
        let mut composition = Self::new();
        for layer in layers {
            composition.overlay(layer);
        }
        composition
    }

    /// All package entries in name order
    pub fn packages(&self) -> impl Iterator<Item = &PackageEntry> {
        self.packages.values()
    }

    /// Entries that are install targets
    pub fn included(&self) -> impl Iterator<Item = &PackageEntry> {
        self.packages.values().filter(|e| e.is_included())
    }

    /// Entries that must be absent
    pub fn excluded(&self) -> impl Iterator<Item = &PackageEntry> {
        self.packages.values().filter(|e| e.is_excluded())
    }

    pub fn package(&self, name: &str) -> Option<&PackageEntry> {
        self.packages.get(name)
    }

    pub fn contains_package(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// All repositories in id order
    pub fn repos(&self) -> impl Iterator<Item = &RepoDefinition> {
        self.repos.values()
    }

    pub fn repo(&self, id: &str) -> Option<&RepoDefinition> {
        self.repos.get(id)
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn repo_count(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.repos.is_empty()
    }

    pub(crate) fn package_map(&self) -> &BTreeMap<String, PackageEntry> {
        &self.packages
    }

    pub(crate) fn repo_map(&self) -> &BTreeMap<String, RepoDefinition> {
        &self.repos
    }

    /// Add a package, replacing any entry with the same name
    ///
    /// Returns the replaced entry, if any.
    pub fn add_package(&mut self, entry: PackageEntry) -> Result<Option<PackageEntry>> {
        entry.spec.validate()?;
        Ok(self.packages.insert(entry.spec.name.clone(), entry))
    }

    /// Add a package unless the existing entry is more explicit
    ///
    /// A spec without an arch does not displace an otherwise matching entry
    /// that names one. Everything else replaces by name, as `add_package`.
    pub fn merge_package(&mut self, entry: PackageEntry) -> Result<()> {
        if let Some(existing) = self.packages.get(&entry.spec.name) {
            let less_explicit = existing.mode == entry.mode
                && existing.spec.arch.is_some()
                && entry.spec.arch.is_none()
                && existing.spec.is_identical(&entry.spec);
            if less_explicit {
                return Ok(());
            }
        }
        self.add_package(entry)?;
        Ok(())
    }

    pub fn remove_package(&mut self, name: &str) -> Option<PackageEntry> {
        self.packages.remove(name)
    }

    /// Add or replace a repository by id
    pub fn add_repo(&mut self, repo: RepoDefinition) -> Result<Option<RepoDefinition>> {
        repo.validate()?;
        let repo = repo.normalized();
        Ok(self.repos.insert(repo.id.clone(), repo))
    }

    pub fn remove_repo(&mut self, id: &str) -> Option<RepoDefinition> {
        self.repos.remove(id)
    }

    /// Lay another composition over this one
    pub fn overlay(&mut self, layer: &Composition) {
        for (name, entry) in &layer.packages {
            self.packages.insert(name.clone(), entry.clone());
        }
        overlay_repos(&mut self.repos, &layer.repos);
    }

    /// Copy keeping only included packages (what a machine actually has)
    pub fn installed_view(&self) -> Composition {
        Composition {
            packages: self
                .packages
                .iter()
                .filter(|(_, e)| e.is_included())
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect(),
            repos: self.repos.clone(),
        }
    }

    /// Render as kickstart `repo` lines plus a `%packages` section
    pub fn to_kickstart(&self) -> String {
        let mut out = String::new();

        for repo in self.repos.values() {
            out.push_str(&repo.to_kickstart());
            out.push('\n');
        }

        if !self.repos.is_empty() {
            out.push('\n');
        }

        out.push_str("%packages\n");
        for entry in self.packages.values() {
            if entry.is_excluded() {
                out.push('-');
            }
            out.push_str(&entry.spec.nevra());
            out.push('\n');
        }
        out.push_str("%end\n");

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{PackageSpec, parse_token};

    fn entry(token: &str) -> PackageEntry {
        parse_token(token).unwrap()
    }

    #[test]
    fn test_add_package_replaces_by_name() {
        let mut composition = Composition::new();
        composition.add_package(entry("totem")).unwrap();
        let replaced = composition.add_package(entry("~totem")).unwrap();

        assert_eq!(replaced, Some(entry("totem")));
        assert_eq!(composition.package_count(), 1);
        assert!(composition.package("totem").unwrap().is_excluded());
    }

    #[test]
    fn test_add_package_validates() {
        let mut composition = Composition::new();
        let mut bad = PackageSpec::new("foo");
        bad.version = Some("1.0".to_string());
        assert!(composition.add_package(PackageEntry::included(bad)).is_err());
    }

    #[test]
    fn test_merge_keeps_more_explicit_arch() {
        let mut composition = Composition::new();
        composition.add_package(entry("glibc:i686")).unwrap();
        composition.merge_package(entry("glibc")).unwrap();
        assert_eq!(composition.package("glibc").unwrap().render(), "glibc:i686");

        composition.merge_package(entry("glibc:x86_64")).unwrap();
        assert_eq!(composition.package("glibc").unwrap().render(), "glibc:x86_64");

        composition.merge_package(entry("~glibc")).unwrap();
        assert!(composition.package("glibc").unwrap().is_excluded());
    }

    #[test]
    fn test_layered_later_wins() {
        let base = Composition::from_packages([entry("foo@1.0-1"), entry("bar")]).unwrap();
        let own = Composition::from_packages([entry("foo@2.0-1")]).unwrap();

        let effective = Composition::layered([&base, &own]);
        assert_eq!(effective.package("foo").unwrap().render(), "foo@2.0-1");
        assert!(effective.contains_package("bar"));
    }

    #[test]
    fn test_serde_shape_is_lists() {
        let mut composition = Composition::from_packages([entry("kodi"), entry("~vlc")]).unwrap();
        composition
            .add_repo(RepoDefinition::new("rpmfusion").with_baseurl("http://x/"))
            .unwrap();

        let json = serde_json::to_value(&composition).unwrap();
        assert_eq!(json["packages"].as_array().unwrap().len(), 2);
        assert_eq!(json["packages"][1]["mode"], "excluded");
        assert_eq!(json["repos"][0]["id"], "rpmfusion");

        let back: Composition = serde_json::from_value(json).unwrap();
        assert_eq!(back, composition);
    }

    #[test]
    fn test_deserialize_rejects_invalid_entries() {
        let result: std::result::Result<Composition, _> =
            serde_json::from_str(r#"{"packages":[{"name":"bad name"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_installed_view_drops_exclusions() {
        let composition = Composition::from_packages([entry("kodi"), entry("~vlc")]).unwrap();
        let view = composition.installed_view();
        assert!(view.contains_package("kodi"));
        assert!(!view.contains_package("vlc"));
    }

    #[test]
    fn test_to_kickstart() {
        let mut composition =
            Composition::from_packages([entry("kodi@18.0-1:x86_64"), entry("~totem")]).unwrap();
        composition
            .add_repo(RepoDefinition::new("fedora").with_baseurl("http://dl/fedora/"))
            .unwrap();

        assert_eq!(
            composition.to_kickstart(),
            "repo --name=\"fedora\" --baseurl=http://dl/fedora/\n\n%packages\nkodi-18.0-1.x86_64\n-totem\n%end\n"
        );
    }
}
