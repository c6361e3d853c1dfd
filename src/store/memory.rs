// src/store/memory.rs

//! In-memory template store

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use super::{DeletePolicy, TemplateStore, referential_conflict, validate_includes};
use crate::error::{Error, Result};
use crate::model::{Composition, Identity, Machine, Template};

#[derive(Debug, Default)]
struct State {
    templates: HashMap<Identity, Template>,
    machines: HashMap<Identity, Machine>,
}

impl State {
    fn template(&self, id: &Identity) -> Result<Template> {
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| Error::TemplateNotFound(id.to_string()))
    }

    fn machines_for(&self, template: &Identity) -> Vec<Identity> {
        let mut ids: Vec<Identity> = self
            .machines
            .values()
            .filter(|m| &m.template == template)
            .map(|m| m.id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// `HashMap`-backed store guarded by a `RwLock`
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl TemplateStore for MemoryStore {
    fn get_template(&self, id: &Identity) -> Result<Template> {
        self.read().template(id)
    }

    fn add_template(&self, template: &Template) -> Result<u64> {
        let mut state = self.write();
        if state.templates.contains_key(&template.id) {
            return Err(Error::AlreadyExists(format!("template {}", template.id)));
        }
        validate_includes(template, |id| state.template(id))?;

        let mut stored = template.clone();
        stored.revision = 1;
        state.templates.insert(stored.id.clone(), stored);
        debug!("Added template {}", template.id);
        Ok(1)
    }

    fn put_template(&self, template: &Template, expected_revision: u64) -> Result<u64> {
        let mut state = self.write();
        validate_includes(template, |id| state.template(id))?;

        let current = state
            .templates
            .get(&template.id)
            .ok_or_else(|| Error::TemplateNotFound(template.id.to_string()))?;

        if current.revision != expected_revision {
            return Err(Error::ConflictingRevision {
                template: template.id.to_string(),
                expected: expected_revision,
                found: current.revision,
            });
        }

        let mut stored = template.clone();
        stored.revision = expected_revision + 1;
        let revision = stored.revision;
        state.templates.insert(stored.id.clone(), stored);
        debug!("Stored template {} at revision {}", template.id, revision);
        Ok(revision)
    }

    fn list_templates(&self, owner: Option<&str>) -> Result<Vec<Template>> {
        let mut templates: Vec<Template> = self
            .read()
            .templates
            .values()
            .filter(|t| owner.is_none_or(|o| t.id.owner == o))
            .cloned()
            .collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(templates)
    }

    fn delete_template(&self, id: &Identity, policy: DeletePolicy) -> Result<Vec<Identity>> {
        let mut state = self.write();
        if !state.templates.contains_key(id) {
            return Err(Error::TemplateNotFound(id.to_string()));
        }

        let machines = state.machines_for(id);
        if !machines.is_empty() && policy == DeletePolicy::Block {
            return Err(referential_conflict(id, &machines));
        }

        for machine in &machines {
            state.machines.remove(machine);
        }
        state.templates.remove(id);
        Ok(machines)
    }

    fn get_machine(&self, id: &Identity) -> Result<Machine> {
        self.read()
            .machines
            .get(id)
            .cloned()
            .ok_or_else(|| Error::MachineNotFound(id.to_string()))
    }

    fn add_machine(&self, machine: &Machine) -> Result<()> {
        let mut state = self.write();
        if state.machines.contains_key(&machine.id) {
            return Err(Error::AlreadyExists(format!("machine {}", machine.id)));
        }
        if !state.templates.contains_key(&machine.template) {
            return Err(Error::TemplateNotFound(machine.template.to_string()));
        }
        state.machines.insert(machine.id.clone(), machine.clone());
        Ok(())
    }

    fn put_machine(&self, machine: &Machine) -> Result<()> {
        let mut state = self.write();
        if !state.machines.contains_key(&machine.id) {
            return Err(Error::MachineNotFound(machine.id.to_string()));
        }
        if !state.templates.contains_key(&machine.template) {
            return Err(Error::TemplateNotFound(machine.template.to_string()));
        }
        state.machines.insert(machine.id.clone(), machine.clone());
        Ok(())
    }

    fn list_machines(&self, owner: Option<&str>) -> Result<Vec<Machine>> {
        let mut machines: Vec<Machine> = self
            .read()
            .machines
            .values()
            .filter(|m| owner.is_none_or(|o| m.id.owner == o))
            .cloned()
            .collect();
        machines.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(machines)
    }

    fn delete_machine(&self, id: &Identity) -> Result<()> {
        self.write()
            .machines
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::MachineNotFound(id.to_string()))
    }

    fn machines_for_template(&self, id: &Identity) -> Result<Vec<Identity>> {
        Ok(self.read().machines_for(id))
    }

    fn put_machine_snapshot(&self, id: &Identity, composition: &Composition) -> Result<()> {
        let mut state = self.write();
        let machine = state
            .machines
            .get_mut(id)
            .ok_or_else(|| Error::MachineNotFound(id.to_string()))?;
        machine.snapshot = Some(composition.clone());
        machine.synced_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageEntry;

    fn id(name: &str) -> Identity {
        Identity::new("firnsy", name)
    }

    #[test]
    fn test_put_template_compare_and_apply() {
        let store = MemoryStore::new();
        let template = Template::new(id("htpc"));
        assert_eq!(store.add_template(&template).unwrap(), 1);

        let mut edited = store.get_template(&id("htpc")).unwrap();
        edited
            .composition
            .add_package(PackageEntry::parse("kodi").unwrap())
            .unwrap();
        assert_eq!(store.put_template(&edited, 1).unwrap(), 2);

        let err = store.put_template(&edited, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::ConflictingRevision { expected: 1, found: 2, .. }
        ));
    }

    #[test]
    fn test_add_template_twice() {
        let store = MemoryStore::new();
        store.add_template(&Template::new(id("htpc"))).unwrap();
        assert!(matches!(
            store.add_template(&Template::new(id("htpc"))),
            Err(Error::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_concurrent_adds_store_one_template() {
        let store = MemoryStore::new();

        let results: Vec<Result<u64>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    scope.spawn(move || {
                        let mut template = Template::new(id("htpc"));
                        template.title = Some(format!("writer {}", i));
                        store.add_template(&template)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let added = results.iter().filter(|r| r.is_ok()).count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(Error::AlreadyExists(_))))
            .count();
        assert_eq!(added, 1);
        assert_eq!(refused, 7);
        assert_eq!(store.get_template(&id("htpc")).unwrap().revision, 1);
    }

    #[test]
    fn test_concurrent_puts_cannot_close_a_cycle() {
        let store = MemoryStore::new();
        store.add_template(&Template::new(id("a"))).unwrap();
        store.add_template(&Template::new(id("b"))).unwrap();

        let mut a = Template::new(id("a"));
        a.includes.push(id("b"));
        let mut b = Template::new(id("b"));
        b.includes.push(id("a"));

        let (ra, rb) = std::thread::scope(|scope| {
            let ha = scope.spawn(|| store.put_template(&a, 1));
            let hb = scope.spawn(|| store.put_template(&b, 1));
            (ha.join().unwrap(), hb.join().unwrap())
        });

        // Whichever write lands second sees the first and is refused
        assert!(ra.is_ok() != rb.is_ok());
        assert!(store.resolve(&id("a")).is_ok());
        assert!(store.resolve(&id("b")).is_ok());
    }

    #[test]
    fn test_put_rejects_include_cycle() {
        let store = MemoryStore::new();
        let mut a = Template::new(id("a"));
        store.add_template(&a).unwrap();
        let mut b = Template::new(id("b"));
        b.includes.push(id("a"));
        store.add_template(&b).unwrap();

        a.includes.push(id("b"));
        assert!(matches!(
            store.put_template(&a, 1),
            Err(Error::CircularInclusion { .. })
        ));
    }

    #[test]
    fn test_delete_template_policies() {
        let store = MemoryStore::new();
        store.add_template(&Template::new(id("htpc"))).unwrap();
        store
            .add_machine(&Machine::new(id("lounge"), id("htpc")))
            .unwrap();

        assert!(matches!(
            store.delete_template(&id("htpc"), DeletePolicy::Block),
            Err(Error::ReferentialConflict { .. })
        ));

        let removed = store.delete_template(&id("htpc"), DeletePolicy::Cascade).unwrap();
        assert_eq!(removed, vec![id("lounge")]);
        assert!(store.get_machine(&id("lounge")).is_err());
        assert!(store.get_template(&id("htpc")).is_err());
    }

    #[test]
    fn test_machine_requires_template() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.add_machine(&Machine::new(id("lounge"), id("missing"))),
            Err(Error::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot() {
        let store = MemoryStore::new();
        store.add_template(&Template::new(id("htpc"))).unwrap();
        store
            .add_machine(&Machine::new(id("lounge"), id("htpc")))
            .unwrap();

        let composition =
            Composition::from_packages([PackageEntry::parse("kodi").unwrap()]).unwrap();
        store.put_machine_snapshot(&id("lounge"), &composition).unwrap();

        let machine = store.get_machine(&id("lounge")).unwrap();
        assert_eq!(machine.snapshot, Some(composition));
        assert!(machine.synced_at.is_some());
    }
}
