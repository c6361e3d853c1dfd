// src/model/dump.rs

//! Template dump and load
//!
//! A dump carries everything needed to recreate a template: identity,
//! metadata, includes, the full package list (as tokens, so the `~` mode
//! marker survives) and the full repository list. TOML is the default;
//! JSON and YAML carry the same document. Kickstart is a view of the
//! packages and repositories only: it can be read back as a composition but
//! not as a template.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use super::{Composition, Identity, Template};
use crate::error::{Error, Result};
use crate::package::{PackageEntry, parse_nevra, parse_package_list, parse_token};
use crate::repository::{RepoDefinition, parse_kickstart_repo};

/// Serialization format for template dumps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DumpFormat {
    #[default]
    Toml,
    Json,
    Yaml,
    Kickstart,
}

impl DumpFormat {
    /// Guess the format from a file extension
    ///
    /// Returns `None` for anything that is not a dump (e.g. a packagelist).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(DumpFormat::Toml),
            "json" => Some(DumpFormat::Json),
            "yaml" | "yml" => Some(DumpFormat::Yaml),
            "ks" => Some(DumpFormat::Kickstart),
            _ => None,
        }
    }
}

impl FromStr for DumpFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(DumpFormat::Toml),
            "json" => Ok(DumpFormat::Json),
            "yaml" | "yml" => Ok(DumpFormat::Yaml),
            "kickstart" | "ks" => Ok(DumpFormat::Kickstart),
            other => Err(Error::ParseError(format!(
                "unknown dump format '{}' (expected toml, json, yaml or kickstart)",
                other
            ))),
        }
    }
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpFormat::Toml => write!(f, "toml"),
            DumpFormat::Json => write!(f, "json"),
            DumpFormat::Yaml => write!(f, "yaml"),
            DumpFormat::Kickstart => write!(f, "kickstart"),
        }
    }
}

/// `[template]` section of a dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpHeader {
    pub owner: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub public: bool,

    /// Included templates as `owner:name`
    #[serde(default)]
    pub includes: Vec<String>,

    /// Package tokens, `~` marking exclusions
    #[serde(default)]
    pub packages: Vec<String>,
}

/// On-disk shape of a template dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDump {
    pub template: DumpHeader,

    #[serde(default, rename = "repo")]
    pub repos: Vec<RepoDefinition>,
}

impl TemplateDump {
    pub fn from_template(template: &Template) -> Self {
        Self {
            template: DumpHeader {
                owner: template.id.owner.clone(),
                name: template.id.name.clone(),
                title: template.title.clone(),
                description: template.description.clone(),
                public: template.public,
                includes: template.includes.iter().map(|i| i.to_string()).collect(),
                packages: template.composition.packages().map(|e| e.render()).collect(),
            },
            repos: template.composition.repos().cloned().collect(),
        }
    }

    /// Validate and convert back into a template
    ///
    /// The revision is left at 0; the store assigns it.
    pub fn into_template(self) -> Result<Template> {
        let header = self.template;
        let id = Identity::parse(&format!("{}:{}", header.owner, header.name), &header.owner)?;

        let mut template = Template::new(id);
        template.title = header.title;
        template.description = header.description;
        template.public = header.public;

        for include in &header.includes {
            template.add_include(Identity::parse(include, &template.id.owner)?)?;
        }
        for token in &header.packages {
            template.composition.add_package(parse_token(token)?)?;
        }
        for repo in self.repos {
            template.composition.add_repo(repo)?;
        }

        Ok(template)
    }
}

/// Serialize a template
///
/// Kickstart renders the template's composition as given; pass a template
/// carrying the effective composition to export a complete system.
pub fn dump_template(template: &Template, format: DumpFormat) -> Result<String> {
    let dump = TemplateDump::from_template(template);
    let out = match format {
        DumpFormat::Toml => toml::to_string_pretty(&dump)?,
        DumpFormat::Json => serde_json::to_string_pretty(&dump)?,
        DumpFormat::Yaml => serde_yaml::to_string(&dump)?,
        DumpFormat::Kickstart => format!(
            "# canvas template {}\n{}",
            template.id,
            template.composition.to_kickstart()
        ),
    };
    Ok(out)
}

/// Parse a template dump
pub fn load_template(content: &str, format: DumpFormat) -> Result<Template> {
    let dump: TemplateDump = match format {
        DumpFormat::Toml => toml::from_str(content)?,
        DumpFormat::Json => serde_json::from_str(content)?,
        DumpFormat::Yaml => serde_yaml::from_str(content)?,
        DumpFormat::Kickstart => {
            return Err(Error::ParseError(
                "a kickstart carries no template identity and cannot be loaded as a template"
                    .to_string(),
            ));
        }
    };
    dump.into_template()
}

/// Read the `repo` lines and `%packages` section of a kickstart file
///
/// Package groups (`@group`) and other sections are ignored; a leading `-`
/// marks an exclusion.
pub fn parse_kickstart(content: &str) -> Result<Composition> {
    let mut composition = Composition::new();
    let mut in_packages = false;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if in_packages {
            if line == "%end" {
                in_packages = false;
            } else if line.starts_with('@') {
                debug!("Ignoring kickstart package group {}", line);
            } else {
                let entry = match line.strip_prefix('-') {
                    Some(nevra) => PackageEntry::excluded(parse_nevra(nevra)?),
                    None => PackageEntry::included(parse_nevra(line)?),
                };
                composition.add_package(entry)?;
            }
        } else if line.starts_with("%packages") {
            in_packages = true;
        } else if line.starts_with("repo ") {
            composition.add_repo(parse_kickstart_repo(line)?)?;
        }
    }

    if in_packages {
        warn!("Kickstart %packages section has no %end");
    }
    Ok(composition)
}

/// Read a composition from a dump, kickstart or packagelist file
///
/// `.toml`, `.json`, `.yaml` and `.yml` files are template dumps and `.ks`
/// files are kickstarts; anything else is read as a packagelist.
pub fn read_composition_file(path: &Path) -> Result<Composition> {
    let content = std::fs::read_to_string(path)?;

    match DumpFormat::from_path(path) {
        None => {
            debug!("Reading packagelist {}", path.display());
            Composition::from_packages(parse_package_list(&content)?)
        }
        Some(DumpFormat::Kickstart) => {
            debug!("Reading kickstart {}", path.display());
            parse_kickstart(&content)
        }
        Some(format) => {
            debug!("Reading {} dump {}", format, path.display());
            Ok(load_template(&content, format)?.composition)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageEntry;
    use std::io::Write;

    fn sample() -> Template {
        let mut template = Template::new(Identity::new("firnsy", "htpc"));
        template.title = Some("Home Theatre PC".to_string());
        template.public = true;
        template.add_include(Identity::new("firnsy", "base")).unwrap();
        for token in ["kodi@18.0-1:x86_64", "~totem", "vlc"] {
            template.composition.add_package(PackageEntry::parse(token).unwrap()).unwrap();
        }
        template
            .composition
            .add_repo(
                RepoDefinition::new("rpmfusion-free")
                    .with_metalink("https://mirrors.rpmfusion.org/metalink?repo=free-fedora-29")
                    .with_priority(50),
            )
            .unwrap();
        template
    }

    #[test]
    fn test_dump_and_load_each_format() {
        let template = sample();
        for format in [DumpFormat::Toml, DumpFormat::Json, DumpFormat::Yaml] {
            let text = dump_template(&template, format).unwrap();
            let loaded = load_template(&text, format).unwrap();
            assert_eq!(loaded.id, template.id, "{}", format);
            assert_eq!(loaded.title, template.title);
            assert_eq!(loaded.includes, template.includes);
            assert_eq!(loaded.composition, template.composition, "{}", format);
        }
    }

    #[test]
    fn test_toml_layout() {
        let text = dump_template(&sample(), DumpFormat::Toml).unwrap();
        assert!(text.contains("[template]"));
        assert!(text.contains("\"~totem\""));
        assert!(text.contains("[[repo]]"));
    }

    #[test]
    fn test_load_rejects_bad_token() {
        let text = r##"
[template]
owner = "firnsy"
name = "htpc"
packages = ["#1@2.1"]
"##;
        assert!(matches!(
            load_template(text, DumpFormat::Toml),
            Err(Error::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_kickstart_reads_back_as_composition() {
        let text = dump_template(&sample(), DumpFormat::Kickstart).unwrap();
        assert!(text.starts_with("# canvas template firnsy:htpc\n"));
        assert!(text.contains("%packages\n"));
        assert!(text.contains("-totem\n"));
        assert!(load_template(&text, DumpFormat::Kickstart).is_err());

        let composition = parse_kickstart(&text).unwrap();
        assert_eq!(composition.package("kodi").unwrap().render(), "kodi@18.0-1:x86_64");
        assert!(composition.package("totem").unwrap().is_excluded());
        assert!(composition.repo("rpmfusion-free").is_some());
    }

    #[test]
    fn test_parse_kickstart_skips_groups_and_other_sections() {
        let text = "lang en_AU.UTF-8\n%packages\n@core\nkodi\n%end\n%post\necho done\n%end\n";
        let composition = parse_kickstart(text).unwrap();
        assert_eq!(composition.package_count(), 1);
        assert!(composition.contains_package("kodi"));
    }

    #[test]
    fn test_format_from_str_and_path() {
        assert_eq!("YAML".parse::<DumpFormat>().unwrap(), DumpFormat::Yaml);
        assert!("xml".parse::<DumpFormat>().is_err());
        assert_eq!(DumpFormat::from_path(Path::new("a/b.yml")), Some(DumpFormat::Yaml));
        assert_eq!(DumpFormat::from_path(Path::new("packages.txt")), None);
    }

    #[test]
    fn test_read_composition_file() {
        let dir = tempfile::tempdir().unwrap();

        let list = dir.path().join("htpc.packages");
        let mut file = std::fs::File::create(&list).unwrap();
        writeln!(file, "# media\nkodi vlc\n~totem").unwrap();
        let composition = read_composition_file(&list).unwrap();
        assert_eq!(composition.package_count(), 3);
        assert!(composition.package("totem").unwrap().is_excluded());

        let dump = dir.path().join("htpc.json");
        std::fs::write(&dump, dump_template(&sample(), DumpFormat::Json).unwrap()).unwrap();
        let composition = read_composition_file(&dump).unwrap();
        assert_eq!(composition, sample().composition);
    }
}
