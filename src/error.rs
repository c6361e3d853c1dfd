// src/error.rs

//! Error types shared across the Canvas library

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the reconciliation engine and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed package or repository token
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Machine not found: {0}")]
    MachineNotFound(String),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Two arguments resolve to the same identity
    #[error("Ambiguous target: both sides resolve to {0}")]
    AmbiguousTarget(String),

    /// Template includes revisit a template already on the resolution path
    #[error("Circular inclusion: {}", .path.join(" -> "))]
    CircularInclusion { path: Vec<String> },

    /// Persisted template changed since the diff was computed
    #[error("Template {template} changed since diff (expected revision {expected}, found {found})")]
    ConflictingRevision {
        template: String,
        expected: u64,
        found: u64,
    },

    /// Template is still assigned to machines
    #[error("Template {template} is referenced by machine(s): {}", .machines.join(", "))]
    ReferentialConflict {
        template: String,
        machines: Vec<String>,
    },

    #[error("Dependency lookup failed for {package}: {reason}")]
    DependencyUnresolvable { package: String, reason: String },

    /// External package manager or system query failed
    #[error("Agent error: {0}")]
    AgentError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}
