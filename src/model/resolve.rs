// src/model/resolve.rs

//! Effective composition of a template with its includes applied
//!
//! Includes form a directed graph that may contain cycles if left
//! unchecked. Resolution is an explicit depth-first walk that keeps the set
//! of templates on the current path and fails on the first revisit. The
//! walk yields an ordered list of layers which is then folded, so
//! precedence is decided by layer order alone.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use super::{Composition, Identity, Template};
use crate::error::{Error, Result};

/// A template with all includes expanded
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub id: Identity,

    /// Effective packages and repositories
    pub composition: Composition,

    /// Template each package entry was taken from
    pub package_sources: BTreeMap<String, Identity>,

    /// Template each repository definition was taken from
    pub repo_sources: BTreeMap<String, Identity>,

    /// Templates in the order their layers were applied
    pub layers: Vec<Identity>,
}

struct Frame {
    template: Template,
    next_include: usize,
}

/// Resolve `root`'s includes, fetching included templates with `fetch`
pub fn resolve_template<F>(root: &Template, mut fetch: F) -> Result<ResolvedTemplate>
where
    F: FnMut(&Identity) -> Result<Template>,
{
    let mut stack = vec![Frame {
        template: root.clone(),
        next_include: 0,
    }];
    let mut on_path: HashSet<Identity> = HashSet::from([root.id.clone()]);
    let mut fetched: HashMap<Identity, Template> = HashMap::new();
    let mut layers: Vec<(Identity, Composition)> = Vec::new();

    loop {
        let include = match stack.last_mut() {
            None => break,
            Some(frame) => {
                let include = frame.template.includes.get(frame.next_include).cloned();
                if include.is_some() {
                    frame.next_include += 1;
                }
                include
            }
        };

        match include {
            Some(include) => {
                if on_path.contains(&include) {
                    let mut path: Vec<String> =
                        stack.iter().map(|f| f.template.id.to_string()).collect();
                    path.push(include.to_string());
                    return Err(Error::CircularInclusion { path });
                }

                let template = match fetched.get(&include) {
                    Some(template) => template.clone(),
                    None => {
                        debug!("Fetching included template {}", include);
                        let template = fetch(&include)?;
                        fetched.insert(include.clone(), template.clone());
                        template
                    }
                };

                on_path.insert(include);
                stack.push(Frame {
                    template,
                    next_include: 0,
                });
            }
            None => {
                if let Some(frame) = stack.pop() {
                    on_path.remove(&frame.template.id);
                    layers.push((frame.template.id, frame.template.composition));
                }
            }
        }
    }

    let mut composition = Composition::new();
    let mut package_sources = BTreeMap::new();
    let mut repo_sources = BTreeMap::new();
    let mut order = Vec::with_capacity(layers.len());

    for (id, layer) in &layers {
        for entry in layer.packages() {
            package_sources.insert(entry.spec.name.clone(), id.clone());
        }
        for repo in layer.repos() {
            repo_sources.insert(repo.id.clone(), id.clone());
        }
        composition.overlay(layer);
        order.push(id.clone());
    }

    debug!(
        "Resolved {} into {} layer(s), {} package(s), {} repo(s)",
        root.id,
        order.len(),
        composition.package_count(),
        composition.repo_count()
    );

    Ok(ResolvedTemplate {
        id: root.id.clone(),
        composition,
        package_sources,
        repo_sources,
        layers: order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::parse_token;
    use crate::repository::RepoDefinition;

    fn template(name: &str, includes: &[&str], packages: &[&str]) -> Template {
        let mut t = Template::new(Identity::new("firnsy", name));
        for include in includes {
            t.includes.push(Identity::new("firnsy", *include));
        }
        for token in packages {
            t.composition.add_package(parse_token(token).unwrap()).unwrap();
        }
        t
    }

    fn fetcher(templates: Vec<Template>) -> impl FnMut(&Identity) -> Result<Template> {
        let map: HashMap<Identity, Template> =
            templates.into_iter().map(|t| (t.id.clone(), t)).collect();
        move |id| {
            map.get(id)
                .cloned()
                .ok_or_else(|| Error::TemplateNotFound(id.to_string()))
        }
    }

    #[test]
    fn test_no_includes() {
        let root = template("htpc", &[], &["kodi"]);
        let resolved = resolve_template(&root, fetcher(vec![])).unwrap();
        assert_eq!(resolved.composition, root.composition);
        assert_eq!(resolved.layers, vec![root.id.clone()]);
    }

    #[test]
    fn test_own_entries_override_included() {
        let y = template("y", &[], &["foo@1.0-1", "bar"]);
        let x = template("x", &["y"], &["foo@2.0-1"]);

        let resolved = resolve_template(&x, fetcher(vec![y])).unwrap();
        let foo = resolved.composition.package("foo").unwrap();
        assert_eq!(foo.render(), "foo@2.0-1");
        assert!(resolved.composition.contains_package("bar"));
        assert_eq!(resolved.package_sources["foo"], Identity::new("firnsy", "x"));
        assert_eq!(resolved.package_sources["bar"], Identity::new("firnsy", "y"));
    }

    #[test]
    fn test_later_includes_override_earlier() {
        let a = template("a", &[], &["foo@1.0-1"]);
        let b = template("b", &[], &["~foo"]);
        let root = template("root", &["a", "b"], &[]);

        let resolved = resolve_template(&root, fetcher(vec![a, b])).unwrap();
        assert!(resolved.composition.package("foo").unwrap().is_excluded());
        assert_eq!(
            resolved.layers,
            vec![
                Identity::new("firnsy", "a"),
                Identity::new("firnsy", "b"),
                Identity::new("firnsy", "root"),
            ]
        );
    }

    #[test]
    fn test_included_repo_replaced_whole() {
        let mut base = template("base", &[], &[]);
        base.composition
            .add_repo(RepoDefinition::new("extras").with_baseurl("http://base/").with_priority(1))
            .unwrap();
        let mut root = template("root", &["base"], &[]);
        root.composition
            .add_repo(RepoDefinition::new("extras").with_metalink("http://own/"))
            .unwrap();

        let resolved = resolve_template(&root, fetcher(vec![base])).unwrap();
        let extras = resolved.composition.repo("extras").unwrap();
        assert!(extras.baseurl.is_empty());
        assert_eq!(extras.priority, 99);
        assert_eq!(resolved.repo_sources["extras"], Identity::new("firnsy", "root"));
    }

    #[test]
    fn test_cycle_detected() {
        let a = template("a", &["b"], &[]);
        let b = template("b", &["a"], &[]);

        let err = resolve_template(&a, fetcher(vec![a.clone(), b])).unwrap_err();
        match err {
            Error::CircularInclusion { path } => {
                assert_eq!(path, vec!["firnsy:a", "firnsy:b", "firnsy:a"]);
            }
            other => panic!("expected CircularInclusion, got {:?}", other),
        }
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let d = template("d", &[], &["shared"]);
        let b = template("b", &["d"], &[]);
        let c = template("c", &["d"], &[]);
        let a = template("a", &["b", "c"], &[]);

        let resolved = resolve_template(&a, fetcher(vec![b, c, d])).unwrap();
        assert!(resolved.composition.contains_package("shared"));
    }

    #[test]
    fn test_missing_include() {
        let a = template("a", &["ghost"], &[]);
        assert!(matches!(
            resolve_template(&a, fetcher(vec![])),
            Err(Error::TemplateNotFound(_))
        ));
    }
}
