// src/repository/format.rs

//! Kickstart `repo` lines and yum/dnf `.repo` files

use super::RepoDefinition;
use crate::error::{Error, Result};

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::ParseError(format!(
            "invalid boolean '{}' for {}",
            other, key
        ))),
    }
}

fn parse_int(key: &str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::ParseError(format!("invalid integer '{}' for {}", value, key)))
}

/// Parse a kickstart `repo` line
///
/// Recognised options: `--name`, `--baseurl`, `--metalink`, `--mirrorlist`,
/// `--cost`, `--excludepkgs`, `--includepkgs` and `--install`.
pub fn parse_kickstart_repo(line: &str) -> Result<RepoDefinition> {
    let mut words = line.split_whitespace();
    if words.next() != Some("repo") {
        return Err(Error::InvalidSyntax(format!(
            "not a kickstart repo line: {}",
            line
        )));
    }

    let mut id = None;
    let mut repo = RepoDefinition::new("");

    for word in words {
        let (key, value) = word.split_once('=').unwrap_or((word, ""));
        match key {
            "--name" => id = Some(value.trim_matches('"').to_string()),
            "--baseurl" => repo.baseurl.push(value.to_string()),
            "--metalink" => repo.metalink = Some(value.to_string()),
            "--mirrorlist" => repo.mirrorlist = Some(value.to_string()),
            "--cost" => repo.cost = parse_int("--cost", value)?,
            "--excludepkgs" => repo.exclude = split_list(value),
            "--includepkgs" => repo.include = split_list(value),
            "--install" => repo.install = true,
            _ => {}
        }
    }

    let id = id.ok_or_else(|| {
        Error::InvalidSyntax(format!("kickstart repo line without --name: {}", line))
    })?;

    repo.id = id;
    repo.name = None;
    let repo = repo.normalized();
    repo.validate()?;
    Ok(repo)
}

/// Parse the contents of a yum/dnf `.repo` file
pub fn parse_repo_file(content: &str) -> Result<Vec<RepoDefinition>> {
    let mut repos = Vec::new();
    let mut current: Option<RepoDefinition> = None;
    let mut last_key: Option<String> = None;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            if let Some(repo) = current.take() {
                repos.push(repo.normalized());
            }
            let mut repo = RepoDefinition::new(&line[1..line.len() - 1]);
            repo.name = None;
            repo.validate()?;
            current = Some(repo);
            last_key = None;
            continue;
        }

        let repo = current.as_mut().ok_or_else(|| {
            Error::ParseError(format!("option outside of a repository section: {}", line))
        })?;

        // Indented lines continue a multi-valued option such as baseurl
        if raw.starts_with(char::is_whitespace) && !line.contains('=') {
            match last_key.as_deref() {
                Some("baseurl") => repo.baseurl.extend(split_list(line)),
                Some("gpgkey") => repo.gpgkey.extend(split_list(line)),
                _ => {}
            }
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            Error::ParseError(format!("expected key=value in repo file: {}", line))
        })?;
        let key = key.trim();
        let value = value.trim();

        match key {
            "name" => repo.name = Some(value.to_string()),
            "baseurl" => repo.baseurl.extend(split_list(value)),
            "metalink" => repo.metalink = Some(value.to_string()),
            "mirrorlist" => repo.mirrorlist = Some(value.to_string()),
            "cost" => repo.cost = parse_int(key, value)?,
            "priority" => repo.priority = parse_int(key, value)?,
            "enabled" => repo.enabled = parse_bool(key, value)?,
            "gpgkey" => repo.gpgkey.extend(split_list(value)),
            "gpgcheck" => repo.gpgcheck = Some(parse_bool(key, value)?),
            "skip_if_unavailable" => repo.skip_if_unavailable = parse_bool(key, value)?,
            "exclude" | "excludepkgs" => repo.exclude.extend(split_list(value)),
            "includepkgs" => repo.include.extend(split_list(value)),
            "metadata_expire" => repo.metadata_expire = Some(value.to_string()),
            _ => {}
        }
        last_key = Some(key.to_string());
    }

    if let Some(repo) = current.take() {
        repos.push(repo.normalized());
    }

    Ok(repos)
}

/// Render repositories as a yum/dnf `.repo` file
pub fn render_repo_file<'a>(repos: impl IntoIterator<Item = &'a RepoDefinition>) -> String {
    let mut out = String::new();

    for repo in repos {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{}]\n", repo.id));
        out.push_str(&format!("name={}\n", repo.display_name()));
        if !repo.baseurl.is_empty() {
            out.push_str(&format!("baseurl={}\n", repo.baseurl.join(" ")));
        }
        if let Some(metalink) = &repo.metalink {
            out.push_str(&format!("metalink={}\n", metalink));
        }
        if let Some(mirrorlist) = &repo.mirrorlist {
            out.push_str(&format!("mirrorlist={}\n", mirrorlist));
        }
        out.push_str(&format!("enabled={}\n", repo.enabled as u8));
        out.push_str(&format!("cost={}\n", repo.cost));
        out.push_str(&format!("priority={}\n", repo.priority));
        out.push_str(&format!(
            "skip_if_unavailable={}\n",
            repo.skip_if_unavailable as u8
        ));
        if let Some(gpgcheck) = repo.gpgcheck {
            out.push_str(&format!("gpgcheck={}\n", gpgcheck as u8));
        }
        if !repo.gpgkey.is_empty() {
            out.push_str(&format!("gpgkey={}\n", repo.gpgkey.join(" ")));
        }
        if !repo.exclude.is_empty() {
            out.push_str(&format!("excludepkgs={}\n", repo.exclude.join(",")));
        }
        if !repo.include.is_empty() {
            out.push_str(&format!("includepkgs={}\n", repo.include.join(",")));
        }
        if let Some(expire) = &repo.metadata_expire {
            out.push_str(&format!("metadata_expire={}\n", expire));
        }
    }

    out
}
