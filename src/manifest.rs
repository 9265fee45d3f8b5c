//! Dependency manifest parsing.
//!
//! Deployments describe their third-party requirements in a plain-text
//! manifest: one `name` + version-constraint specifier per line, grouped into
//! sections by comment lines. A comment whose content is itself a valid
//! specifier is a deliberately disabled requirement, not a section header.
//! The scanner validates that every active line is well formed.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, ScanError};

/// Version comparison operator in a requirement specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintOp {
    Exact,
    AtLeast,
    AtMost,
    Compatible,
    Exclude,
    Greater,
    Less,
}

impl ConstraintOp {
    fn token(self) -> &'static str {
        match self {
            ConstraintOp::Exact => "==",
            ConstraintOp::AtLeast => ">=",
            ConstraintOp::AtMost => "<=",
            ConstraintOp::Compatible => "~=",
            ConstraintOp::Exclude => "!=",
            ConstraintOp::Greater => ">",
            ConstraintOp::Less => "<",
        }
    }
}

impl std::fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// A single package requirement, possibly disabled (commented out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub name: String,
    pub op: ConstraintOp,
    pub version: String,
    pub enabled: bool,
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.enabled {
            write!(f, "#")?;
        }
        write!(f, "{}{}{}", self.name, self.op, self.version)
    }
}

/// A comment-delimited group of requirements.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Section {
    /// Header comment text, if the section was introduced by one.
    pub title: Option<String>,
    pub requirements: Vec<Requirement>,
}

/// A fully parsed dependency manifest.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Manifest {
    pub sections: Vec<Section>,
}

impl Manifest {
    /// All requirements across sections, in file order.
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.sections
            .iter()
            .flat_map(|section| section.requirements.iter())
    }

    pub fn enabled_count(&self) -> usize {
        self.requirements().filter(|req| req.enabled).count()
    }

    pub fn disabled_count(&self) -> usize {
        self.requirements().filter(|req| !req.enabled).count()
    }
}

/// Reads and parses a manifest file.
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    let text = fs::read_to_string(path)?;
    parse_manifest(&text)
}

/// Parses manifest text. Malformed active lines fail with their line number;
/// malformed comment lines are treated as section headers.
pub fn parse_manifest(text: &str) -> Result<Manifest> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current = Section::default();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            let comment = comment.trim();
            if let Ok((name, op, version)) = split_specifier(comment) {
                current.requirements.push(Requirement {
                    name,
                    op,
                    version,
                    enabled: false,
                });
            } else {
                if current.title.is_some() || !current.requirements.is_empty() {
                    sections.push(std::mem::take(&mut current));
                }
                current.title = (!comment.is_empty()).then(|| comment.to_string());
            }
            continue;
        }

        let (name, op, version) =
            split_specifier(line).map_err(|reason| ScanError::Manifest {
                line: index + 1,
                reason,
            })?;
        current.requirements.push(Requirement {
            name,
            op,
            version,
            enabled: true,
        });
    }

    if current.title.is_some() || !current.requirements.is_empty() {
        sections.push(current);
    }

    Ok(Manifest { sections })
}

const OPERATORS: &[(&str, ConstraintOp)] = &[
    ("==", ConstraintOp::Exact),
    (">=", ConstraintOp::AtLeast),
    ("<=", ConstraintOp::AtMost),
    ("~=", ConstraintOp::Compatible),
    ("!=", ConstraintOp::Exclude),
    (">", ConstraintOp::Greater),
    ("<", ConstraintOp::Less),
];

fn split_specifier(line: &str) -> std::result::Result<(String, ConstraintOp, String), String> {
    let (token, op) = OPERATORS
        .iter()
        .filter(|(token, _)| line.contains(token))
        .min_by_key(|(token, _)| line.find(token).unwrap_or(usize::MAX))
        .copied()
        .ok_or_else(|| format!("no version constraint in '{line}'"))?;

    let split_at = line
        .find(token)
        .ok_or_else(|| format!("no version constraint in '{line}'"))?;
    let name = line[..split_at].trim();
    let version = line[split_at + token.len()..].trim();

    validate_name(name)?;
    validate_version(version)?;
    Ok((name.to_string(), op, version.to_string()))
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    let valid_start = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphanumeric());
    let valid_rest = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(format!("invalid package name '{name}'"))
    }
}

fn validate_version(version: &str) -> std::result::Result<(), String> {
    let shape_ok = !version.is_empty()
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '-'));
    if shape_ok && version.chars().any(|c| c.is_ascii_digit() || c == '*') {
        Ok(())
    } else {
        Err(format!("invalid version '{version}'"))
    }
}
