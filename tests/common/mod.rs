// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use canvas::{
    Composition, DependencySource, Error, Identity, LiveOptions, PackageEntry, PackageSpec,
    RepoDefinition, Result, SqliteStore, SystemAgent, Template, TemplateStore, parse_token,
};
use tempfile::TempDir;

/// In-process stand-in for a machine's package manager.
///
/// Tracks installed packages and configured repositories, records every
/// call it receives, and answers dependency queries from a fixed table.
#[derive(Default)]
pub struct FakeAgent {
    live: Mutex<Composition>,
    /// Packages present only as dependencies of something else
    dependency_only: Mutex<BTreeSet<String>>,
    requires: HashMap<String, Vec<PackageSpec>>,
    calls: Mutex<Vec<String>>,
}

impl FakeAgent {
    pub fn with_packages(tokens: &[&str]) -> Self {
        let agent = Self::default();
        *agent.live.lock().unwrap() = composition(tokens);
        agent
    }

    pub fn with_repo(self, repo: RepoDefinition) -> Self {
        self.live.lock().unwrap().add_repo(repo).unwrap();
        self
    }

    /// Declare `package`'s immediate dependencies
    pub fn requiring(mut self, package: &str, deps: &[&str]) -> Self {
        self.requires.insert(
            package.to_string(),
            deps.iter().map(|d| PackageSpec::new(*d)).collect(),
        );
        self
    }

    /// Mark an installed package as pulled in by a dependency
    pub fn as_dependency(self, name: &str) -> Self {
        self.dependency_only.lock().unwrap().insert(name.to_string());
        self
    }

    pub fn installed(&self) -> Vec<String> {
        self.live
            .lock()
            .unwrap()
            .packages()
            .map(|e| e.name().to_string())
            .collect()
    }

    pub fn live(&self) -> Composition {
        self.live.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, verb: &str, packages: &[PackageEntry]) {
        let names: Vec<&str> = packages.iter().map(|e| e.name()).collect();
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", verb, names.join(" ")));
    }
}

impl SystemAgent for FakeAgent {
    fn live_composition(&self, options: LiveOptions) -> Result<Composition> {
        let live = self.live.lock().unwrap().clone();
        if options.all {
            return Ok(live);
        }
        let hidden = self.dependency_only.lock().unwrap();
        let mut view = live.clone();
        for name in hidden.iter() {
            view.remove_package(name);
        }
        Ok(view)
    }

    fn install(&self, packages: &[PackageEntry]) -> Result<()> {
        self.record("install", packages);
        let mut live = self.live.lock().unwrap();
        for entry in packages {
            live.add_package(PackageEntry::included(entry.spec.clone()))?;
        }
        Ok(())
    }

    fn remove(&self, packages: &[PackageEntry]) -> Result<()> {
        self.record("remove", packages);
        let mut live = self.live.lock().unwrap();
        for entry in packages {
            if live.remove_package(entry.name()).is_none() {
                return Err(Error::AgentError(format!("{} is not installed", entry.name())));
            }
        }
        Ok(())
    }

    fn upgrade(&self, packages: &[PackageEntry]) -> Result<()> {
        self.record("upgrade", packages);
        let mut live = self.live.lock().unwrap();
        for entry in packages {
            live.add_package(PackageEntry::included(entry.spec.clone()))?;
        }
        Ok(())
    }

    fn apply_repos(&self, add: &[RepoDefinition], remove: &[RepoDefinition]) -> Result<()> {
        let mut live = self.live.lock().unwrap();
        for repo in remove {
            live.remove_repo(&repo.id);
        }
        for repo in add {
            live.add_repo(repo.clone())?;
        }
        Ok(())
    }
}

impl DependencySource for FakeAgent {
    fn requires(&self, package: &PackageSpec) -> Result<Vec<PackageSpec>> {
        match self.requires.get(&package.name) {
            Some(deps) => Ok(deps.clone()),
            None => Ok(Vec::new()),
        }
    }
}

/// Build a composition from package tokens
pub fn composition(tokens: &[&str]) -> Composition {
    Composition::from_packages(tokens.iter().map(|t| parse_token(t).unwrap())).unwrap()
}

pub fn id(s: &str) -> Identity {
    Identity::parse(s, "firnsy").unwrap()
}

/// A template with the given own packages and includes
pub fn template(name: &str, tokens: &[&str], includes: &[&str]) -> Template {
    let mut template = Template::new(id(name));
    template.composition = composition(tokens);
    for include in includes {
        template.add_include(id(include)).unwrap();
    }
    template
}

pub fn store_templates(store: &dyn TemplateStore, templates: Vec<Template>) {
    for template in templates {
        store.add_template(&template).unwrap();
    }
}

/// Create an on-disk SQLite store.
///
/// Returns (TempDir, store) - keep the TempDir alive to prevent cleanup.
pub fn sqlite_store() -> (TempDir, SqliteStore) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir
        .path()
        .join("canvas.db")
        .to_str()
        .unwrap()
        .to_string();
    let store = SqliteStore::open(&db_path).unwrap();
    (temp_dir, store)
}

pub fn names(entries: &[PackageEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name()).collect()
}
