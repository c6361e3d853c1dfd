// src/db/store.rs

//! `TemplateStore` backed by SQLite

use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::models::{MachineRecord, TemplateRecord};
use crate::error::{Error, Result};
use crate::model::{Composition, Identity, Machine, Template};
use crate::store::{DeletePolicy, TemplateStore, referential_conflict, validate_includes};

/// SQLite-backed template store
///
/// Template writes run in a transaction that re-reads the stored revision,
/// so two writers racing on the same template cannot both succeed.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_path`
    pub fn open(db_path: &str) -> Result<Self> {
        super::init(db_path)?;
        Ok(Self::from_connection(super::open(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(super::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn template_record(conn: &Connection, id: &Identity) -> Result<TemplateRecord> {
    TemplateRecord::find_by_identity(conn, &id.owner, &id.name)?
        .ok_or_else(|| Error::TemplateNotFound(id.to_string()))
}

fn template_row_id(conn: &Connection, id: &Identity) -> Result<i64> {
    template_record(conn, id)?
        .id
        .ok_or_else(|| Error::TemplateNotFound(id.to_string()))
}

fn machine_record(conn: &Connection, id: &Identity) -> Result<MachineRecord> {
    MachineRecord::find_by_identity(conn, &id.owner, &id.name)?
        .ok_or_else(|| Error::MachineNotFound(id.to_string()))
}

fn machine_row_id(conn: &Connection, id: &Identity) -> Result<i64> {
    machine_record(conn, id)?
        .id
        .ok_or_else(|| Error::MachineNotFound(id.to_string()))
}

impl TemplateStore for SqliteStore {
    fn get_template(&self, id: &Identity) -> Result<Template> {
        let conn = self.conn();
        template_record(&conn, id)?.to_template()
    }

    fn add_template(&self, template: &Template) -> Result<u64> {
        let mut conn = self.conn();
        super::transaction(&mut conn, |tx| {
            if TemplateRecord::find_by_identity(tx, &template.id.owner, &template.id.name)?.is_some() {
                return Err(Error::AlreadyExists(format!("template {}", template.id)));
            }
            validate_includes(template, |id| template_record(tx, id)?.to_template())?;

            let mut record = TemplateRecord::from_template(template)?;
            record.revision = 1;
            record.insert(tx)?;
            Ok(())
        })?;

        info!("Added template {}", template.id);
        Ok(1)
    }

    fn put_template(&self, template: &Template, expected_revision: u64) -> Result<u64> {
        let mut conn = self.conn();
        let revision = super::transaction(&mut conn, |tx| {
            validate_includes(template, |id| template_record(tx, id)?.to_template())?;
            let current = template_record(tx, &template.id)?;
            let found = current.revision as u64;
            if found != expected_revision {
                return Err(Error::ConflictingRevision {
                    template: template.id.to_string(),
                    expected: expected_revision,
                    found,
                });
            }

            let row_id = current
                .id
                .ok_or_else(|| Error::TemplateNotFound(template.id.to_string()))?;
            let mut record = TemplateRecord::from_template(template)?;
            record.revision = current.revision + 1;
            record.update(tx, row_id)?;
            Ok(record.revision as u64)
        })?;

        debug!("Stored template {} at revision {}", template.id, revision);
        Ok(revision)
    }

    fn list_templates(&self, owner: Option<&str>) -> Result<Vec<Template>> {
        let conn = self.conn();
        TemplateRecord::list(&conn, owner)?
            .iter()
            .map(TemplateRecord::to_template)
            .collect()
    }

    fn delete_template(&self, id: &Identity, policy: DeletePolicy) -> Result<Vec<Identity>> {
        let mut conn = self.conn();
        let removed = super::transaction(&mut conn, |tx| {
            let row_id = template_row_id(tx, id)?;
            let machines = MachineRecord::find_by_template(tx, row_id)?;
            let ids: Vec<Identity> = machines
                .iter()
                .map(|m| Identity::new(&m.owner, &m.name))
                .collect();

            if !ids.is_empty() && policy == DeletePolicy::Block {
                return Err(referential_conflict(id, &ids));
            }

            for machine in &machines {
                if let Some(machine_id) = machine.id {
                    MachineRecord::delete(tx, machine_id)?;
                }
            }
            TemplateRecord::delete(tx, row_id)?;
            Ok(ids)
        })?;

        info!(
            "Deleted template {} ({} machine(s) removed)",
            id,
            removed.len()
        );
        Ok(removed)
    }

    fn get_machine(&self, id: &Identity) -> Result<Machine> {
        let conn = self.conn();
        machine_record(&conn, id)?.to_machine()
    }

    fn add_machine(&self, machine: &Machine) -> Result<()> {
        let mut conn = self.conn();
        super::transaction(&mut conn, |tx| {
            if MachineRecord::find_by_identity(tx, &machine.id.owner, &machine.id.name)?.is_some() {
                return Err(Error::AlreadyExists(format!("machine {}", machine.id)));
            }
            let template_id = template_row_id(tx, &machine.template)?;
            MachineRecord::from_machine(machine, template_id)?.insert(tx)?;
            Ok(())
        })?;

        info!("Added machine {} (template {})", machine.id, machine.template);
        Ok(())
    }

    fn put_machine(&self, machine: &Machine) -> Result<()> {
        let mut conn = self.conn();
        super::transaction(&mut conn, |tx| {
            let row_id = machine_row_id(tx, &machine.id)?;
            let template_id = template_row_id(tx, &machine.template)?;
            MachineRecord::from_machine(machine, template_id)?.update(tx, row_id)
        })
    }

    fn list_machines(&self, owner: Option<&str>) -> Result<Vec<Machine>> {
        let conn = self.conn();
        MachineRecord::list(&conn, owner)?
            .iter()
            .map(MachineRecord::to_machine)
            .collect()
    }

    fn delete_machine(&self, id: &Identity) -> Result<()> {
        let conn = self.conn();
        let row_id = machine_row_id(&conn, id)?;
        MachineRecord::delete(&conn, row_id)
    }

    fn machines_for_template(&self, id: &Identity) -> Result<Vec<Identity>> {
        let conn = self.conn();
        let row_id = template_row_id(&conn, id)?;
        Ok(MachineRecord::find_by_template(&conn, row_id)?
            .into_iter()
            .map(|m| Identity::new(m.owner, m.name))
            .collect())
    }

    fn put_machine_snapshot(&self, id: &Identity, composition: &Composition) -> Result<()> {
        let conn = self.conn();
        let row_id = machine_row_id(&conn, id)?;
        let snapshot = serde_json::to_string(composition)?;
        let synced_at = chrono::Utc::now().to_rfc3339();
        MachineRecord::set_snapshot(&conn, row_id, &snapshot, &synced_at)?;
        debug!("Recorded snapshot for {} ({} package(s))", id, composition.package_count());
        Ok(())
    }
}
