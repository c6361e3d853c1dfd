// src/db/models/template.rs

//! Template rows
//!
//! Includes and the own composition are stored as JSON documents; the row
//! keeps them as text and converts on demand so a malformed document shows
//! up as a JSON error instead of a column type error.

use crate::error::Result;
use crate::model::{Identity, Template};
use rusqlite::{Connection, OptionalExtension, Row, params};

const COLUMNS: &str =
    "id, owner, name, title, description, public, includes, composition, revision, created_at, updated_at";

/// A row in the `templates` table
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    pub id: Option<i64>,
    pub owner: String,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub public: bool,
    pub includes: String,
    pub composition: String,
    pub revision: i64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl TemplateRecord {
    pub fn from_template(template: &Template) -> Result<Self> {
        Ok(Self {
            id: None,
            owner: template.id.owner.clone(),
            name: template.id.name.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
            public: template.public,
            includes: serde_json::to_string(&template.includes)?,
            composition: serde_json::to_string(&template.composition)?,
            revision: template.revision as i64,
            created_at: None,
            updated_at: None,
        })
    }

    pub fn to_template(&self) -> Result<Template> {
        let mut template = Template::new(Identity::new(&self.owner, &self.name));
        template.title = self.title.clone();
        template.description = self.description.clone();
        template.public = self.public;
        template.includes = serde_json::from_str(&self.includes)?;
        template.composition = serde_json::from_str(&self.composition)?;
        template.revision = self.revision as u64;
        Ok(template)
    }

    /// Insert this template into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO templates (owner, name, title, description, public, includes, composition, revision)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &self.owner,
                &self.name,
                &self.title,
                &self.description,
                self.public,
                &self.includes,
                &self.composition,
                self.revision,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    pub fn find_by_identity(conn: &Connection, owner: &str, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM templates WHERE owner = ?1 AND name = ?2",
            COLUMNS
        ))?;
        let record = stmt
            .query_row(params![owner, name], Self::from_row)
            .optional()?;
        Ok(record)
    }

    /// List templates, optionally for one owner, ordered by identity
    pub fn list(conn: &Connection, owner: Option<&str>) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM templates WHERE (?1 IS NULL OR owner = ?1) ORDER BY owner, name",
            COLUMNS
        ))?;
        let records = stmt
            .query_map([owner], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Overwrite the stored row with this record's values
    pub fn update(&self, conn: &Connection, id: i64) -> Result<()> {
        conn.execute(
            "UPDATE templates
             SET title = ?1, description = ?2, public = ?3, includes = ?4,
                 composition = ?5, revision = ?6, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?7",
            params![
                &self.title,
                &self.description,
                self.public,
                &self.includes,
                &self.composition,
                self.revision,
                id,
            ],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM templates WHERE id = ?1", [id])?;
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            owner: row.get(1)?,
            name: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            public: row.get(5)?,
            includes: row.get(6)?,
            composition: row.get(7)?,
            revision: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}
