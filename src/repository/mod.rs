// src/repository/mod.rs

//! Repository definitions carried by templates and machines
//!
//! A repository is identified by its id (same character class as package
//! names). Exactly one of `baseurl`, `metalink` or `mirrorlist` is expected
//! to be populated, but multiples are accepted; when a single source must be
//! chosen the order is baseurl, then metalink, then mirrorlist.

mod format;
mod reconcile;

pub use format::{parse_kickstart_repo, parse_repo_file, render_repo_file};
pub use reconcile::{RepoChange, RepoChanges, compare_candidates, diff_repos, overlay_repos, select_candidate};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::package::is_valid_name;

/// Default repository cost (lower is preferred)
pub const DEFAULT_COST: i32 = 1000;

/// Default repository priority (lower is preferred)
pub const DEFAULT_PRIORITY: i32 = 99;

fn default_cost() -> i32 {
    DEFAULT_COST
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A software repository definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDefinition {
    pub id: String,

    /// Human readable label, defaults to the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub baseurl: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirrorlist: Option<String>,

    #[serde(default = "default_cost")]
    pub cost: i32,

    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpgkey: Vec<String>,

    /// Signature checking, `None` leaves the package manager default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpgcheck: Option<bool>,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub skip_if_unavailable: bool,

    /// Package globs hidden from this repository
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Only these package globs are taken from this repository
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Metadata lifetime as the package manager spells it (`6h`, `never`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_expire: Option<String>,

    /// Keep the repository configured on the installed system (kickstart `--install`)
    #[serde(default, skip_serializing_if = "is_false")]
    pub install: bool,
}

/// The single URL source a client should use for a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoSource<'a> {
    Baseurl(&'a str),
    Metalink(&'a str),
    Mirrorlist(&'a str),
}

impl<'a> RepoSource<'a> {
    pub fn url(&self) -> &'a str {
        match self {
            RepoSource::Baseurl(url) | RepoSource::Metalink(url) | RepoSource::Mirrorlist(url) => {
                url
            }
        }
    }
}

impl RepoDefinition {
    /// Create a repository with default attributes and no URL source
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: Some(id.clone()),
            id,
            baseurl: Vec::new(),
            metalink: None,
            mirrorlist: None,
            cost: DEFAULT_COST,
            priority: DEFAULT_PRIORITY,
            enabled: true,
            gpgkey: Vec::new(),
            gpgcheck: None,
            skip_if_unavailable: true,
            exclude: Vec::new(),
            include: Vec::new(),
            metadata_expire: None,
            install: false,
        }
    }

    pub fn with_baseurl(mut self, url: impl Into<String>) -> Self {
        self.baseurl.push(url.into());
        self
    }

    pub fn with_metalink(mut self, url: impl Into<String>) -> Self {
        self.metalink = Some(url.into());
        self
    }

    pub fn with_mirrorlist(mut self, url: impl Into<String>) -> Self {
        self.mirrorlist = Some(url.into());
        self
    }

    pub fn with_cost(mut self, cost: i32) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Label shown to users
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Fill in defaulted fields so equal repositories compare equal
    pub fn normalized(mut self) -> Self {
        if self.name.as_deref().is_none_or(str::is_empty) {
            self.name = Some(self.id.clone());
        }
        self
    }

    /// Validate the id
    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(&self.id) {
            return Err(Error::InvalidSyntax(format!(
                "invalid repository id '{}'",
                self.id
            )));
        }
        Ok(())
    }

    /// Pick the URL source a client should use
    pub fn source(&self) -> Option<RepoSource<'_>> {
        if let Some(url) = self.baseurl.iter().find(|u| !u.is_empty()) {
            return Some(RepoSource::Baseurl(url));
        }
        if let Some(url) = self.metalink.as_deref().filter(|u| !u.is_empty()) {
            return Some(RepoSource::Metalink(url));
        }
        self.mirrorlist
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(RepoSource::Mirrorlist)
    }

    /// Render as a kickstart `repo` line
    pub fn to_kickstart(&self) -> String {
        let mut line = format!("repo --name=\"{}\"", self.id);

        match self.source() {
            Some(RepoSource::Baseurl(url)) => line.push_str(&format!(" --baseurl={}", url)),
            Some(RepoSource::Metalink(url)) => line.push_str(&format!(" --metalink={}", url)),
            Some(RepoSource::Mirrorlist(url)) => line.push_str(&format!(" --mirrorlist={}", url)),
            None => {}
        }

        if self.cost != DEFAULT_COST {
            line.push_str(&format!(" --cost={}", self.cost));
        }

        if !self.exclude.is_empty() {
            line.push_str(&format!(" --excludepkgs={}", self.exclude.join(",")));
        }

        if !self.include.is_empty() {
            line.push_str(&format!(" --includepkgs={}", self.include.join(",")));
        }

        if self.install {
            line.push_str(" --install");
        }

        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let repo = RepoDefinition::new("fedora");
        assert_eq!(repo.cost, 1000);
        assert_eq!(repo.priority, 99);
        assert!(repo.enabled);
        assert!(repo.skip_if_unavailable);
        assert_eq!(repo.display_name(), "fedora");
    }

    #[test]
    fn test_source_resolution_order() {
        let repo = RepoDefinition::new("updates")
            .with_mirrorlist("https://mirrors.example.com/list")
            .with_metalink("https://mirrors.example.com/metalink");
        assert_eq!(
            repo.source(),
            Some(RepoSource::Metalink("https://mirrors.example.com/metalink"))
        );

        let repo = repo.with_baseurl("https://dl.example.com/updates/");
        assert_eq!(repo.source().map(|s| s.url()), Some("https://dl.example.com/updates/"));

        assert_eq!(RepoDefinition::new("empty").source(), None);
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let repo: RepoDefinition =
            serde_json::from_str(r#"{"id":"rpmfusion","baseurl":["http://x/"]}"#).unwrap();
        let repo = repo.normalized();
        assert_eq!(repo.cost, DEFAULT_COST);
        assert_eq!(repo.priority, DEFAULT_PRIORITY);
        assert!(repo.enabled);
        assert!(repo.skip_if_unavailable);
        assert_eq!(repo, RepoDefinition::new("rpmfusion").with_baseurl("http://x/"));
    }

    #[test]
    fn test_validate_id() {
        assert!(RepoDefinition::new("korora-extras").validate().is_ok());
        assert!(RepoDefinition::new("bad id").validate().is_err());
    }

    #[test]
    fn test_to_kickstart() {
        let mut repo = RepoDefinition::new("fedora")
            .with_baseurl("http://dl.fedoraproject.org/pub/fedora/")
            .with_cost(500);
        repo.exclude = vec!["kernel*".to_string()];
        repo.install = true;
        assert_eq!(
            repo.to_kickstart(),
            "repo --name=\"fedora\" --baseurl=http://dl.fedoraproject.org/pub/fedora/ --cost=500 --excludepkgs=kernel* --install"
        );
    }
}
