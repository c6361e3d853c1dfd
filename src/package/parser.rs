// src/package/parser.rs

//! Parser for package tokens and packagelist files

use regex::Regex;
use std::sync::LazyLock;

use super::{InclusionMode, PackageEntry, PackageSpec};
use crate::error::{Error, Result};

/// Splits a token into its raw parts; each part is validated separately so
/// errors can say which part is wrong.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<mode>[~+])?(?P<name>[^#@:]*)(?:#(?P<epoch>[^@:]*))?(?:@(?P<evr>[^:]*))?(?::(?P<arch>.*))?$",
    )
    .unwrap()
});

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._+~^]+$").unwrap());

static ARCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Check a package name or repository id against the allowed character class
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

fn invalid(token: &str, reason: &str) -> Error {
    Error::InvalidSyntax(format!("'{}': {}", token, reason))
}

/// Parse a single package token into an entry
///
/// Grammar: `[~|+]name[#epoch@version-release][:arch]`
pub fn parse_token(token: &str) -> Result<PackageEntry> {
    let token = token.trim();

    let caps = TOKEN_RE
        .captures(token)
        .ok_or_else(|| invalid(token, "unrecognised package token"))?;

    let mode = match caps.name("mode").map(|m| m.as_str()) {
        Some("~") => InclusionMode::Excluded,
        _ => InclusionMode::Included,
    };

    let name = caps.name("name").map_or("", |m| m.as_str());
    if name.is_empty() {
        return Err(invalid(token, "package name is empty"));
    }
    if !is_valid_name(name) {
        return Err(invalid(token, "package name contains disallowed characters"));
    }

    let mut spec = PackageSpec::new(name);

    if let Some(evr) = caps.name("evr") {
        let (version, release) = evr
            .as_str()
            .split_once('-')
            .ok_or_else(|| invalid(token, "version and release must be separated by '-'"))?;

        if !VERSION_RE.is_match(version) {
            return Err(invalid(token, "version is empty or malformed"));
        }
        if !VERSION_RE.is_match(release) {
            return Err(invalid(token, "release is empty or malformed"));
        }

        spec.version = Some(version.to_string());
        spec.release = Some(release.to_string());
    }

    if let Some(epoch) = caps.name("epoch") {
        if spec.version.is_none() {
            return Err(invalid(token, "epoch requires @version-release"));
        }
        let epoch = epoch
            .as_str()
            .parse::<u64>()
            .map_err(|_| invalid(token, "epoch must be a non-negative integer"))?;
        spec.epoch = Some(epoch);
    }

    if let Some(arch) = caps.name("arch") {
        if !ARCH_RE.is_match(arch.as_str()) {
            return Err(invalid(token, "architecture is empty or malformed"));
        }
        spec.arch = Some(arch.as_str().to_string());
    }

    Ok(PackageEntry { spec, mode })
}

/// Parse a packagelist: whitespace separated tokens, `#` starts a comment line
pub fn parse_package_list(content: &str) -> Result<Vec<PackageEntry>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(parse_token)
        .collect()
}

/// Architectures recognised as a `.arch` suffix in NEVRA strings
const KNOWN_ARCHES: &[&str] = &[
    "noarch", "x86_64", "i386", "i586", "i686", "aarch64", "armv7hl", "ppc64le", "s390x", "riscv64",
    "src",
];

/// Parse package manager notation: `name[-[epoch:]version-release][.arch]`
///
/// This is the inverse of [`PackageSpec::nevra`]. Only known architectures
/// are split off, so a release such as `1.fc29` is not mistaken for one.
pub fn parse_nevra(nevra: &str) -> Result<PackageSpec> {
    let nevra = nevra.trim();

    let (body, arch) = match nevra.rsplit_once('.') {
        Some((body, arch)) if KNOWN_ARCHES.contains(&arch) => (body, Some(arch)),
        _ => (nevra, None),
    };

    let mut spec = match split_evr(nevra, body)? {
        Some(spec) => spec,
        None if is_valid_name(body) => PackageSpec::new(body),
        None => return Err(invalid(nevra, "expected name-version-release")),
    };

    if let Some(arch) = arch {
        spec = spec.with_arch(arch);
    }
    spec.validate()
        .map_err(|_| invalid(nevra, "not a valid package"))?;
    Ok(spec)
}

/// Split `name-[epoch:]version-release`
///
/// Returns `None` when the body has no version and release, which leaves
/// hyphenated names such as `gnome-shell` intact. Versions must start with
/// a digit to be taken as one.
fn split_evr(nevra: &str, body: &str) -> Result<Option<PackageSpec>> {
    let mut parts = body.rsplitn(3, '-');
    let (release, version, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(release), Some(version), Some(name)) if is_valid_name(name) => {
            (release, version, name)
        }
        _ => return Ok(None),
    };

    let (epoch, version) = match version.split_once(':') {
        Some((epoch, version)) => {
            let epoch = epoch
                .parse::<u64>()
                .map_err(|_| invalid(nevra, "epoch must be a non-negative integer"))?;
            (Some(epoch), version)
        }
        None => (None, version),
    };

    let numeric = version.starts_with(|c: char| c.is_ascii_digit());
    if !numeric || !VERSION_RE.is_match(version) || !VERSION_RE.is_match(release) {
        return Ok(None);
    }
    Ok(Some(PackageSpec::new(name).with_evr(epoch, version, release)))
}

/// Render entries in packagelist form, one token per line
pub fn render_package_list<'a>(entries: impl IntoIterator<Item = &'a PackageEntry>) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.render());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_name() {
        let entry = parse_token("kodi").unwrap();
        assert_eq!(entry.spec, PackageSpec::new("kodi"));
        assert_eq!(entry.mode, InclusionMode::Included);
    }

    #[test]
    fn test_parse_version_release() {
        let entry = parse_token("foo@2.1-3").unwrap();
        assert_eq!(entry.spec.version.as_deref(), Some("2.1"));
        assert_eq!(entry.spec.release.as_deref(), Some("3"));
        assert_eq!(entry.spec.epoch, None);
    }

    #[test]
    fn test_parse_full_token() {
        let entry = parse_token("~glibc#1@2.38-16.fc39:i686").unwrap();
        assert!(entry.is_excluded());
        assert_eq!(entry.spec.name, "glibc");
        assert_eq!(entry.spec.epoch, Some(1));
        assert_eq!(entry.spec.version.as_deref(), Some("2.38"));
        assert_eq!(entry.spec.release.as_deref(), Some("16.fc39"));
        assert_eq!(entry.spec.arch.as_deref(), Some("i686"));
    }

    #[test]
    fn test_plus_prefix_is_included() {
        let entry = parse_token("+vlc").unwrap();
        assert!(entry.is_included());
        assert_eq!(entry.render(), "vlc");
    }

    #[test]
    fn test_reject_epoch_without_version() {
        assert!(matches!(parse_token("#1@2.1"), Err(Error::InvalidSyntax(_))));
        assert!(matches!(parse_token("foo#1"), Err(Error::InvalidSyntax(_))));
        assert!(matches!(parse_token("foo#1:x86_64"), Err(Error::InvalidSyntax(_))));
    }

    #[test]
    fn test_reject_version_without_release() {
        assert!(matches!(parse_token("foo@2.1"), Err(Error::InvalidSyntax(_))));
        assert!(matches!(parse_token("foo@2.1-"), Err(Error::InvalidSyntax(_))));
        assert!(matches!(parse_token("foo@-1"), Err(Error::InvalidSyntax(_))));
    }

    #[test]
    fn test_reject_bad_names() {
        assert!(parse_token("").is_err());
        assert!(parse_token("~").is_err());
        assert!(parse_token("foo.bar").is_err());
        assert!(parse_token("foo bar").is_err());
        assert!(parse_token("foo#x@1-1").is_err());
        assert!(parse_token("foo:").is_err());
    }

    #[test]
    fn test_render_round_trip() {
        for token in [
            "kodi",
            "~totem",
            "foo@2.1-3",
            "foo#0@2.1-3",
            "foo#12@2.1-3.fc39:x86_64",
            "~bar:noarch",
            "lib_x-devel@1.0~rc1-1",
        ] {
            assert_eq!(parse_token(token).unwrap().render(), token);
        }
    }

    #[test]
    fn test_parse_package_list() {
        let content = "# media packages\nkodi  ~totem\n\n~vlc\nfoo@1.0-1:x86_64\n";
        let entries = parse_package_list(content).unwrap();
        let tokens: Vec<String> = entries.iter().map(|e| e.render()).collect();
        assert_eq!(tokens, vec!["kodi", "~totem", "~vlc", "foo@1.0-1:x86_64"]);

        assert_eq!(
            render_package_list(&entries),
            "kodi\n~totem\n~vlc\nfoo@1.0-1:x86_64\n"
        );
    }

    #[test]
    fn test_parse_nevra_inverts_render() {
        for token in ["kodi", "kodi:x86_64", "kodi@18.0-1:x86_64", "glibc#1@2.38-16.fc39:i686"] {
            let spec = parse_token(token).unwrap().spec;
            assert_eq!(parse_nevra(&spec.nevra()).unwrap(), spec);
        }

        let spec = parse_nevra("foo-bar-1.0-1.fc29").unwrap();
        assert_eq!(spec.name, "foo-bar");
        assert_eq!(spec.release.as_deref(), Some("1.fc29"));
        assert_eq!(spec.arch, None);

        assert!(parse_nevra("foo-1.0").is_err());
    }

    #[test]
    fn test_parse_nevra_prefers_version_split() {
        let spec = parse_nevra("foo-1-2").unwrap();
        assert_eq!(spec.name, "foo");
        assert_eq!(spec.version.as_deref(), Some("1"));
        assert_eq!(spec.release.as_deref(), Some("2"));

        let spec = parse_nevra("foo-2:1-2.noarch").unwrap();
        assert_eq!(spec.epoch, Some(2));
        assert_eq!(spec.arch.as_deref(), Some("noarch"));

        // Hyphenated names without a numeric version stay whole
        let spec = parse_nevra("gnome-shell-extension").unwrap();
        assert_eq!(spec.name, "gnome-shell-extension");
        assert_eq!(spec.version, None);
    }

    #[test]
    fn test_parse_package_list_reports_bad_token() {
        let err = parse_package_list("kodi\nfoo@1.0\n").unwrap_err();
        assert!(err.to_string().contains("foo@1.0"));
    }
}
