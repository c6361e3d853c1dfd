// src/dependencies/mod.rs

//! Dependency expansion for synchronization requests
//!
//! Expansion is shallow: each requested package contributes
//! its immediate declared dependencies and nothing further. Resolving the
//! full closure is the package manager's job once the request reaches it.
//!
//! Lookup failures never abort an expansion. The package is kept, its
//! dependencies are skipped, and an [`UnresolvedDependency`] warning is
//! attached to the result.

use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::error::Result;
use crate::package::{PackageEntry, PackageSpec};

/// Source of declared package dependencies
pub trait DependencySource {
    /// Immediate dependencies declared by `package`
    fn requires(&self, package: &PackageSpec) -> Result<Vec<PackageSpec>>;
}

/// A source that declares no dependencies
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependencySource for NoDependencies {
    fn requires(&self, _package: &PackageSpec) -> Result<Vec<PackageSpec>> {
        Ok(Vec::new())
    }
}

/// Whether the requested packages are being added or removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Add,
    Remove,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Add => write!(f, "add"),
            Direction::Remove => write!(f, "remove"),
        }
    }
}

/// Dependency lookup that failed during expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedDependency {
    pub package: String,
    pub reason: String,
}

impl fmt::Display for UnresolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dependencies of {} not expanded: {}", self.package, self.reason)
    }
}

/// Result of an expansion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Requested packages plus expanded dependencies, in name order
    pub packages: Vec<PackageEntry>,
    pub warnings: Vec<UnresolvedDependency>,
}

impl Expansion {
    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(|e| e.name()).collect()
    }
}

/// Expand `requested` by one level of declared dependencies
///
/// With `with_deps` unset the request is returned unchanged (sorted by
/// name). Dependencies take the mode of the entry that pulled them in, and
/// never displace an entry that was requested explicitly. Excluded entries
/// are not expanded when adding: excluding a package says nothing about
/// what it depends on.
pub fn expand(
    requested: &[PackageEntry],
    direction: Direction,
    with_deps: bool,
    source: &dyn DependencySource,
) -> Expansion {
    let mut packages: BTreeMap<String, PackageEntry> = requested
        .iter()
        .map(|e| (e.spec.name.clone(), e.clone()))
        .collect();
    let mut warnings = Vec::new();

    if with_deps {
        let mut found: BTreeMap<String, PackageEntry> = BTreeMap::new();

        for entry in requested {
            if direction == Direction::Add && entry.is_excluded() {
                continue;
            }

            match source.requires(&entry.spec) {
                Ok(deps) => {
                    debug!("{} declares {} dependencies", entry.name(), deps.len());
                    for dep in deps {
                        if dep.name == entry.spec.name || packages.contains_key(&dep.name) {
                            continue;
                        }
                        found.entry(dep.name.clone()).or_insert(PackageEntry {
                            spec: dep,
                            mode: entry.mode,
                        });
                    }
                }
                Err(e) => {
                    warn!("Could not expand dependencies of {}: {}", entry.name(), e);
                    warnings.push(UnresolvedDependency {
                        package: entry.spec.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "Expanded {} request by {} dependencies",
            direction,
            found.len()
        );
        packages.extend(found);
    }

    Expansion {
        packages: packages.into_values().collect(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;

    struct Table(HashMap<&'static str, Vec<&'static str>>);

    impl DependencySource for Table {
        fn requires(&self, package: &PackageSpec) -> Result<Vec<PackageSpec>> {
            match self.0.get(package.name.as_str()) {
                Some(deps) => Ok(deps.iter().map(|d| PackageSpec::new(*d)).collect()),
                None => Err(Error::DependencyUnresolvable {
                    package: package.name.clone(),
                    reason: "no metadata".to_string(),
                }),
            }
        }
    }

    fn table() -> Table {
        Table(HashMap::from([
            ("kodi", vec!["kodi-data", "libcec"]),
            ("kodi-data", vec!["fonts"]),
            ("libcec", vec![]),
            ("vlc", vec!["libcec"]),
        ]))
    }

    fn entries(tokens: &[&str]) -> Vec<PackageEntry> {
        tokens.iter().map(|t| PackageEntry::parse(t).unwrap()).collect()
    }

    #[test]
    fn test_without_deps_is_identity() {
        let requested = entries(&["vlc", "kodi"]);
        let expansion = expand(&requested, Direction::Add, false, &table());
        assert_eq!(expansion.names(), vec!["kodi", "vlc"]);
        assert!(expansion.warnings.is_empty());
    }

    #[test]
    fn test_one_level_only() {
        let expansion = expand(&entries(&["kodi"]), Direction::Add, true, &table());
        assert_eq!(expansion.names(), vec!["kodi", "kodi-data", "libcec"]);
    }

    #[test]
    fn test_shared_dependency_appears_once() {
        let expansion = expand(&entries(&["kodi", "vlc"]), Direction::Add, true, &table());
        assert_eq!(expansion.names(), vec!["kodi", "kodi-data", "libcec", "vlc"]);
    }

    #[test]
    fn test_requested_entry_wins_over_dependency() {
        let expansion = expand(
            &entries(&["kodi", "libcec@4.0-1"]),
            Direction::Add,
            true,
            &table(),
        );
        let libcec = expansion.packages.iter().find(|e| e.name() == "libcec").unwrap();
        assert_eq!(libcec.render(), "libcec@4.0-1");
    }

    #[test]
    fn test_excluded_not_expanded_on_add() {
        let expansion = expand(&entries(&["~kodi"]), Direction::Add, true, &table());
        assert_eq!(expansion.names(), vec!["kodi"]);
    }

    #[test]
    fn test_remove_with_deps() {
        let expansion = expand(&entries(&["vlc"]), Direction::Remove, true, &table());
        assert_eq!(expansion.names(), vec!["libcec", "vlc"]);
    }

    #[test]
    fn test_lookup_failure_is_a_warning() {
        let expansion = expand(&entries(&["mystery", "vlc"]), Direction::Add, true, &table());
        assert_eq!(expansion.names(), vec!["libcec", "mystery", "vlc"]);
        assert_eq!(expansion.warnings.len(), 1);
        assert_eq!(expansion.warnings[0].package, "mystery");
    }
}
