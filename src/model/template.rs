// src/model/template.rs

//! Template and machine records

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Composition;
use crate::error::{Error, Result};
use crate::package::is_valid_name;

/// Owner-qualified identity of a template or machine, written `owner:name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub owner: String,
    pub name: String,
}

impl Identity {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner:name`, or a bare `name` owned by `default_owner`
    pub fn parse(s: &str, default_owner: &str) -> Result<Self> {
        let (owner, name) = match s.split_once(':') {
            Some((owner, name)) => (owner, name),
            None => (default_owner, s),
        };

        for part in [owner, name] {
            if !is_valid_name(part) {
                return Err(Error::InvalidSyntax(format!(
                    "invalid identity '{}': expected owner:name",
                    s
                )));
            }
        }

        Ok(Self::new(owner, name))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner, self.name)
    }
}

/// A named, owned recipe of repositories and packages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: Identity,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: bool,
    /// Included templates, applied in order before this template's own entries
    #[serde(default)]
    pub includes: Vec<Identity>,
    /// This template's own entries (without includes applied)
    #[serde(default)]
    pub composition: Composition,
    /// Persisted revision; 0 until first stored
    #[serde(default)]
    pub revision: u64,
}

impl Template {
    pub fn new(id: Identity) -> Self {
        Self {
            id,
            title: None,
            description: None,
            public: false,
            includes: Vec::new(),
            composition: Composition::new(),
            revision: 0,
        }
    }

    /// Title shown to users, defaulting to the template name
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id.name)
    }

    /// Append an include, ignoring duplicates and self-references
    pub fn add_include(&mut self, id: Identity) -> Result<()> {
        if id == self.id {
            return Err(Error::CircularInclusion {
                path: vec![self.id.to_string(), id.to_string()],
            });
        }
        if !self.includes.contains(&id) {
            self.includes.push(id);
        }
        Ok(())
    }

    pub fn remove_include(&mut self, id: &Identity) -> bool {
        let before = self.includes.len();
        self.includes.retain(|i| i != id);
        self.includes.len() != before
    }
}

/// A managed system assigned to exactly one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: Identity,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub template: Identity,
    /// Composition recorded at the last synchronization
    #[serde(default)]
    pub snapshot: Option<Composition>,
    /// RFC 3339 timestamp of the last synchronization
    #[serde(default)]
    pub synced_at: Option<String>,
}

impl Machine {
    pub fn new(id: Identity, template: Identity) -> Self {
        Self {
            id,
            description: None,
            location: None,
            template,
            snapshot: None,
            synced_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parse() {
        let id = Identity::parse("firnsy:htpc", "root").unwrap();
        assert_eq!(id, Identity::new("firnsy", "htpc"));
        assert_eq!(id.to_string(), "firnsy:htpc");

        let id = Identity::parse("htpc", "csmart").unwrap();
        assert_eq!(id.owner, "csmart");

        assert!(Identity::parse("firnsy:", "root").is_err());
        assert!(Identity::parse("a:b:c", "root").is_err());
    }

    #[test]
    fn test_add_include_rejects_self() {
        let mut template = Template::new(Identity::new("firnsy", "htpc"));
        assert!(matches!(
            template.add_include(Identity::new("firnsy", "htpc")),
            Err(Error::CircularInclusion { .. })
        ));

        template.add_include(Identity::new("firnsy", "base")).unwrap();
        template.add_include(Identity::new("firnsy", "base")).unwrap();
        assert_eq!(template.includes.len(), 1);
        assert!(template.remove_include(&Identity::new("firnsy", "base")));
        assert!(template.includes.is_empty());
    }
}
