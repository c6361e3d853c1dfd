// src/package/mod.rs

//! Package specifications and composition entries
//!
//! Packages are referenced everywhere by a compact token:
//!
//! ```text
//! [~|+]name[#epoch@version-release][:arch]
//! ```
//!
//! - `kodi` - any version of kodi
//! - `kodi@18.0-1` - a specific version and release
//! - `kodi#2@18.0-1:x86_64` - fully qualified, including epoch and arch
//! - `~totem` - totem must not be installed
//!
//! A token parses into a [`PackageEntry`]: a [`PackageSpec`] together with
//! its [`InclusionMode`].

mod parser;

pub use parser::{is_valid_name, parse_nevra, parse_package_list, parse_token, render_package_list};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Whether an entry is an install target or an explicit removal target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InclusionMode {
    #[default]
    Included,
    Excluded,
}

impl InclusionMode {
    pub fn is_excluded(self) -> bool {
        self == InclusionMode::Excluded
    }
}

impl fmt::Display for InclusionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InclusionMode::Included => write!(f, "included"),
            InclusionMode::Excluded => write!(f, "excluded"),
        }
    }
}

/// A package name with optional epoch, version, release and architecture
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

impl PackageSpec {
    /// Create a spec that matches any version of `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            epoch: None,
            version: None,
            release: None,
            arch: None,
        }
    }

    /// Set version and release (and optionally epoch)
    pub fn with_evr(
        mut self,
        epoch: Option<u64>,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        self.epoch = epoch;
        self.version = Some(version.into());
        self.release = Some(release.into());
        self
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// Drop epoch, version and release, keeping name and arch
    pub fn without_evr(&self) -> Self {
        Self {
            name: self.name.clone(),
            epoch: None,
            version: None,
            release: None,
            arch: self.arch.clone(),
        }
    }

    /// Check the structural invariants of a spec
    ///
    /// Epoch requires version and release; version and release come in pairs.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(&self.name) {
            return Err(Error::InvalidSyntax(format!(
                "invalid package name '{}'",
                self.name
            )));
        }
        if self.version.is_some() != self.release.is_some() {
            return Err(Error::InvalidSyntax(format!(
                "package '{}' must specify both version and release",
                self.name
            )));
        }
        if self.epoch.is_some() && self.version.is_none() {
            return Err(Error::InvalidSyntax(format!(
                "package '{}' has an epoch without version-release",
                self.name
            )));
        }
        Ok(())
    }

    /// Whether two specs name the same package
    pub fn same_package(&self, other: &PackageSpec) -> bool {
        self.name == other.name
    }

    /// Whether two specs agree on every field both of them specify
    ///
    /// An absent field on either side matches anything.
    pub fn is_identical(&self, other: &PackageSpec) -> bool {
        fn agree<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }

        self.name == other.name
            && agree(&self.epoch, &other.epoch)
            && agree(&self.version, &other.version)
            && agree(&self.release, &other.release)
            && agree(&self.arch, &other.arch)
    }

    /// Whether a specific version is requested
    pub fn has_evr(&self) -> bool {
        self.version.is_some()
    }

    /// Package manager form: `name-[epoch:]version-release.arch`
    ///
    /// Fields that are not set are omitted, so `kodi:x86_64` becomes
    /// `kodi.x86_64` and a bare name stays a bare name.
    pub fn nevra(&self) -> String {
        let mut s = self.name.clone();

        if let (Some(version), Some(release)) = (&self.version, &self.release) {
            s.push('-');
            if let Some(epoch) = self.epoch {
                s.push_str(&format!("{}:", epoch));
            }
            s.push_str(&format!("{}-{}", version, release));
        }

        if let Some(arch) = &self.arch {
            s.push('.');
            s.push_str(arch);
        }

        s
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(epoch) = self.epoch {
            write!(f, "#{}", epoch)?;
        }
        if let (Some(version), Some(release)) = (&self.version, &self.release) {
            write!(f, "@{}-{}", version, release)?;
        }
        if let Some(arch) = &self.arch {
            write!(f, ":{}", arch)?;
        }
        Ok(())
    }
}

/// A package spec together with its inclusion mode
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageEntry {
    #[serde(flatten)]
    pub spec: PackageSpec,
    #[serde(default)]
    pub mode: InclusionMode,
}

impl PackageEntry {
    pub fn included(spec: PackageSpec) -> Self {
        Self {
            spec,
            mode: InclusionMode::Included,
        }
    }

    pub fn excluded(spec: PackageSpec) -> Self {
        Self {
            spec,
            mode: InclusionMode::Excluded,
        }
    }

    /// Parse a package token
    pub fn parse(token: &str) -> Result<Self> {
        parse_token(token)
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn is_excluded(&self) -> bool {
        self.mode.is_excluded()
    }

    pub fn is_included(&self) -> bool {
        !self.is_excluded()
    }

    /// Canonical token for this entry
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Same package, same mode, and no conflicting version fields
    pub fn is_identical(&self, other: &PackageEntry) -> bool {
        self.mode == other.mode && self.spec.is_identical(&other.spec)
    }
}

impl fmt::Display for PackageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_excluded() {
            write!(f, "~")?;
        }
        write!(f, "{}", self.spec)
    }
}

impl FromStr for PackageEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_token(s)
    }
}
