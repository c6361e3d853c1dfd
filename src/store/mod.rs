// src/store/mod.rs

//! Persistence contract for templates and machines
//!
//! The engine only talks to storage through [`TemplateStore`]. Two
//! implementations ship with the crate: [`MemoryStore`] for tests and
//! ad-hoc diffs, and [`crate::db::SqliteStore`] for the CLI.
//!
//! Writes to a template are compare-and-apply: `put_template` takes the
//! revision the caller read and fails with `ConflictingRevision` when the
//! stored revision has moved on.

mod memory;

pub use memory::MemoryStore;

use crate::error::{Error, Result};
use crate::model::{Composition, Identity, Machine, ResolvedTemplate, Template, resolve_template};

/// What to do with machines still assigned to a template being deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Refuse with `ReferentialConflict`
    #[default]
    Block,
    /// Delete the assigned machines along with the template
    Cascade,
}

pub trait TemplateStore {
    fn get_template(&self, id: &Identity) -> Result<Template>;

    /// Store a new template at revision 1
    fn add_template(&self, template: &Template) -> Result<u64>;

    /// Replace a stored template if its revision still equals `expected_revision`
    ///
    /// Returns the new revision.
    fn put_template(&self, template: &Template, expected_revision: u64) -> Result<u64>;

    /// All templates, optionally restricted to one owner, in identity order
    fn list_templates(&self, owner: Option<&str>) -> Result<Vec<Template>>;

    /// Delete a template; returns the machines removed by a cascade
    fn delete_template(&self, id: &Identity, policy: DeletePolicy) -> Result<Vec<Identity>>;

    fn get_machine(&self, id: &Identity) -> Result<Machine>;

    /// Register a machine; its template must exist
    fn add_machine(&self, machine: &Machine) -> Result<()>;

    /// Update an existing machine's metadata and template assignment
    fn put_machine(&self, machine: &Machine) -> Result<()>;

    fn list_machines(&self, owner: Option<&str>) -> Result<Vec<Machine>>;

    fn delete_machine(&self, id: &Identity) -> Result<()>;

    /// Machines assigned to a template
    fn machines_for_template(&self, id: &Identity) -> Result<Vec<Identity>>;

    /// Record the composition a machine had after synchronizing
    fn put_machine_snapshot(&self, id: &Identity, composition: &Composition) -> Result<()>;

    /// Resolve a template's includes
    fn resolve(&self, id: &Identity) -> Result<ResolvedTemplate> {
        let root = self.get_template(id)?;
        resolve_template(&root, |include| self.get_template(include))
    }

    /// Effective composition of a template (includes applied)
    fn effective_composition(&self, id: &Identity) -> Result<Composition> {
        Ok(self.resolve(id)?.composition)
    }
}

/// Check that a template's includes exist and do not loop back to it
///
/// The template is resolved as if it were already stored, so a write that
/// would close a cycle is rejected before it lands. Stores call this with
/// `fetch` reading under the same lock or transaction as the write.
pub fn validate_includes<F>(template: &Template, mut fetch: F) -> Result<()>
where
    F: FnMut(&Identity) -> Result<Template>,
{
    resolve_template(template, |include| {
        if include == &template.id {
            Ok(template.clone())
        } else {
            fetch(include)
        }
    })?;
    Ok(())
}

/// Build the `ReferentialConflict` error for a template still in use
pub(crate) fn referential_conflict(template: &Identity, machines: &[Identity]) -> Error {
    Error::ReferentialConflict {
        template: template.to_string(),
        machines: machines.iter().map(|m| m.to_string()).collect(),
    }
}
