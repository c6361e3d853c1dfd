// src/db/models/machine.rs

//! Machine rows

use crate::error::Result;
use crate::model::{Identity, Machine};
use rusqlite::{Connection, OptionalExtension, Row, params};

const SELECT: &str = "SELECT m.id, m.owner, m.name, m.description, m.location, m.template_id,
                             t.owner, t.name, m.snapshot, m.synced_at
                      FROM machines m JOIN templates t ON t.id = m.template_id";

/// A row in the `machines` table joined with its template's identity
#[derive(Debug, Clone)]
pub struct MachineRecord {
    pub id: Option<i64>,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub template_id: i64,
    pub template_owner: String,
    pub template_name: String,
    pub snapshot: Option<String>,
    pub synced_at: Option<String>,
}

impl MachineRecord {
    pub fn from_machine(machine: &Machine, template_id: i64) -> Result<Self> {
        let snapshot = match &machine.snapshot {
            Some(composition) => Some(serde_json::to_string(composition)?),
            None => None,
        };

        Ok(Self {
            id: None,
            owner: machine.id.owner.clone(),
            name: machine.id.name.clone(),
            description: machine.description.clone(),
            location: machine.location.clone(),
            template_id,
            template_owner: machine.template.owner.clone(),
            template_name: machine.template.name.clone(),
            snapshot,
            synced_at: machine.synced_at.clone(),
        })
    }

    pub fn to_machine(&self) -> Result<Machine> {
        let mut machine = Machine::new(
            Identity::new(&self.owner, &self.name),
            Identity::new(&self.template_owner, &self.template_name),
        );
        machine.description = self.description.clone();
        machine.location = self.location.clone();
        machine.snapshot = match &self.snapshot {
            Some(json) => Some(serde_json::from_str(json)?),
            None => None,
        };
        machine.synced_at = self.synced_at.clone();
        Ok(machine)
    }

    /// Insert this machine into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO machines (owner, name, description, location, template_id, snapshot, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &self.owner,
                &self.name,
                &self.description,
                &self.location,
                self.template_id,
                &self.snapshot,
                &self.synced_at,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_identity(conn: &Connection, owner: &str, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("{} WHERE m.owner = ?1 AND m.name = ?2", SELECT))?;
        let record = stmt
            .query_row(params![owner, name], Self::from_row)
            .optional()?;
        Ok(record)
    }

    pub fn list(conn: &Connection, owner: Option<&str>) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE (?1 IS NULL OR m.owner = ?1) ORDER BY m.owner, m.name",
            SELECT
        ))?;
        let records = stmt
            .query_map([owner], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Machines assigned to a template row
    pub fn find_by_template(conn: &Connection, template_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE m.template_id = ?1 ORDER BY m.owner, m.name",
            SELECT
        ))?;
        let records = stmt
            .query_map([template_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Update metadata and template assignment
    pub fn update(&self, conn: &Connection, id: i64) -> Result<()> {
        conn.execute(
            "UPDATE machines SET description = ?1, location = ?2, template_id = ?3 WHERE id = ?4",
            params![&self.description, &self.location, self.template_id, id],
        )?;
        Ok(())
    }

    pub fn set_snapshot(conn: &Connection, id: i64, snapshot: &str, synced_at: &str) -> Result<()> {
        conn.execute(
            "UPDATE machines SET snapshot = ?1, synced_at = ?2 WHERE id = ?3",
            params![snapshot, synced_at, id],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM machines WHERE id = ?1", [id])?;
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            owner: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            location: row.get(4)?,
            template_id: row.get(5)?,
            template_owner: row.get(6)?,
            template_name: row.get(7)?,
            snapshot: row.get(8)?,
            synced_at: row.get(9)?,
        })
    }
}
