//! Parse one logical line of a requirements file
//!
//! Recognized forms:
//! - `name[extras] specifiers ; marker --hash=algo:digest`
//! - `name @ url ; marker`
//! - `-r FILE`, `-c FILE`, `-e TARGET`
//! - global options like `--index-url URL` or `--pre`
//! - bare URLs, paths and archive files

use super::lines::LogicalLine;
use crate::domain::{PackageName, Requirement, RuleCode, SourceLocation, SpecifierSet};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static URL_SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap());

/// Start of a per-requirement option such as `--hash`
static TRAILING_OPTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s--").unwrap());

const ARCHIVE_SUFFIXES: [&str; 6] = [".whl", ".tar.gz", ".tgz", ".tar.bz2", ".tar.xz", ".zip"];

/// Global options and whether each takes a value
const GLOBAL_OPTIONS: [(&str, Option<&str>, bool); 11] = [
    ("index-url", Some("i"), true),
    ("extra-index-url", None, true),
    ("no-index", None, false),
    ("find-links", Some("f"), true),
    ("pre", None, false),
    ("trusted-host", None, true),
    ("prefer-binary", None, false),
    ("require-hashes", None, false),
    ("only-binary", None, true),
    ("no-binary", None, true),
    ("use-feature", None, true),
];

/// A parsed logical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Requirement(Requirement),
    /// `-r FILE`
    Include { target: String, line: usize },
    /// `-c FILE`
    Constraint { target: String, line: usize },
    /// `-e TARGET`
    Editable { target: String, line: usize },
    /// Bare URL, path or archive
    Direct { target: String, line: usize },
    GlobalOption {
        name: String,
        value: Option<String>,
        line: usize,
    },
}

impl Entry {
    /// First physical line of the entry
    pub fn line(&self) -> usize {
        match self {
            Entry::Requirement(req) => req.source.line,
            Entry::Include { line, .. }
            | Entry::Constraint { line, .. }
            | Entry::Editable { line, .. }
            | Entry::Direct { line, .. }
            | Entry::GlobalOption { line, .. } => *line,
        }
    }

    pub fn as_requirement(&self) -> Option<&Requirement> {
        match self {
            Entry::Requirement(req) => Some(req),
            _ => None,
        }
    }
}

/// A line that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    pub rule: RuleCode,
    pub message: String,
    pub line: usize,
}

impl LineError {
    pub fn new(rule: RuleCode, message: impl Into<String>, line: usize) -> Self {
        Self {
            rule,
            message: message.into(),
            line,
        }
    }

    fn invalid_line(message: impl Into<String>, line: usize) -> Self {
        Self::new(RuleCode::InvalidLine, message, line)
    }
}

/// Parse a logical line read from `path`
pub fn parse_line(line: &LogicalLine, path: &Path) -> Result<Entry, LineError> {
    let text = line.text.as_str();

    if text.starts_with('-') {
        return parse_option(text, line.line);
    }

    if is_direct_target(text) {
        let target = text.split_whitespace().next().unwrap_or(text);
        return Ok(Entry::Direct {
            target: target.to_string(),
            line: line.line,
        });
    }

    parse_requirement(line, path).map(Entry::Requirement)
}

fn is_direct_target(text: &str) -> bool {
    let first = text.split_whitespace().next().unwrap_or("");
    let lowered = first.to_ascii_lowercase();
    first.starts_with(['.', '/', '~'])
        || URL_SCHEME_RE.is_match(first)
        || ARCHIVE_SUFFIXES.iter().any(|s| lowered.ends_with(s))
}

/// Split `--name=value`, `--name value`, `-xvalue` or `-x value`
fn split_option(text: &str) -> (String, Option<String>) {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    if let Some(long) = text.strip_prefix("--") {
        let end = long
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(long.len());
        let (name, rest) = long.split_at(end);
        let value = rest.strip_prefix('=').unwrap_or(rest);
        return (name.to_string(), non_empty(value));
    }

    let short = &text[1..];
    let mut chars = short.chars();
    let flag = chars.next().map(String::from).unwrap_or_default();
    (flag, non_empty(chars.as_str()))
}

fn parse_option(text: &str, line: usize) -> Result<Entry, LineError> {
    let is_long = text.starts_with("--");
    let (name, value) = split_option(text);
    let canonical = match (is_long, name.as_str()) {
        (false, "r") | (true, "requirement") => "requirement",
        (false, "c") | (true, "constraint") => "constraint",
        (false, "e") | (true, "editable") => "editable",
        (false, short) => GLOBAL_OPTIONS
            .iter()
            .find(|(_, s, _)| *s == Some(short))
            .map(|(long, _, _)| *long)
            .unwrap_or(""),
        (true, long) => GLOBAL_OPTIONS
            .iter()
            .find(|(l, _, _)| *l == long)
            .map(|(long, _, _)| *long)
            .unwrap_or(""),
    };

    if canonical.is_empty() {
        let shown = text.split_whitespace().next().unwrap_or(text);
        return Err(LineError::new(
            RuleCode::UnknownOption,
            format!("unknown option '{}'", shown),
            line,
        ));
    }

    let needs_value = match canonical {
        "requirement" | "constraint" | "editable" => true,
        other => GLOBAL_OPTIONS
            .iter()
            .any(|(long, _, takes)| *long == other && *takes),
    };

    match (needs_value, value) {
        (true, None) => Err(LineError::invalid_line(
            format!("option --{} requires a value", canonical),
            line,
        )),
        (false, Some(v)) => Err(LineError::invalid_line(
            format!("option --{} does not take a value (got '{}')", canonical, v),
            line,
        )),
        (true, Some(target)) => Ok(match canonical {
            "requirement" => Entry::Include { target, line },
            "constraint" => Entry::Constraint { target, line },
            "editable" => Entry::Editable { target, line },
            _ => Entry::GlobalOption {
                name: canonical.to_string(),
                value: Some(target),
                line,
            },
        }),
        (false, None) => Ok(Entry::GlobalOption {
            name: canonical.to_string(),
            value: None,
            line,
        }),
    }
}

/// Split trailing `--hash` options off a requirement line
fn split_hashes(text: &str, line: usize) -> Result<(&str, Vec<String>), LineError> {
    let Some(m) = TRAILING_OPTION_RE.find(text) else {
        return Ok((text, Vec::new()));
    };

    let (head, options) = text.split_at(m.start());
    let mut hashes = Vec::new();
    let mut tokens = options.split_whitespace();
    while let Some(token) = tokens.next() {
        let value = match token.strip_prefix("--hash") {
            Some("") => tokens.next().map(str::to_string),
            Some(rest) => rest.strip_prefix('=').map(str::to_string),
            None => {
                return Err(LineError::new(
                    RuleCode::UnknownOption,
                    format!("unknown option '{}'", token),
                    line,
                ))
            }
        };
        match value {
            Some(hash) if hash.contains(':') => hashes.push(hash),
            _ => {
                return Err(LineError::invalid_line(
                    "--hash expects a value of the form algorithm:digest",
                    line,
                ))
            }
        }
    }
    Ok((head.trim_end(), hashes))
}

fn parse_requirement(line: &LogicalLine, path: &Path) -> Result<Requirement, LineError> {
    let number = line.line;
    let (text, hashes) = split_hashes(&line.text, number)?;

    let name_end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        .unwrap_or(text.len());
    let raw_name = &text[..name_end];
    if raw_name.is_empty() {
        return Err(LineError::invalid_line(
            format!("expected a package name in '{}'", text),
            number,
        ));
    }
    let name = PackageName::parse(raw_name).ok_or_else(|| {
        LineError::new(
            RuleCode::InvalidName,
            format!("'{}' is not a valid package name", raw_name),
            number,
        )
    })?;

    let mut rest = text[name_end..].trim_start();

    let mut extras = Vec::new();
    if let Some(after) = rest.strip_prefix('[') {
        let close = after
            .find(']')
            .ok_or_else(|| LineError::invalid_line("unterminated extras list", number))?;
        let listed = after[..close].trim();
        for extra in listed.split(',').map(str::trim).filter(|_| !listed.is_empty()) {
            if PackageName::parse(extra).is_none() {
                return Err(LineError::invalid_line(
                    format!("invalid extra name '{}'", extra),
                    number,
                ));
            }
            extras.push(extra.to_string());
        }
        rest = after[close + 1..].trim_start();
    }

    // A URL may itself contain ';', so only " ;" ends a direct reference
    let is_url = rest.starts_with('@');
    let split_at = if is_url {
        rest.find(" ;").or_else(|| rest.find("\t;"))
    } else {
        rest.find(';')
    };
    let (body, marker) = match split_at {
        Some(i) => {
            let marker = rest[i..].trim_start().trim_start_matches(';').trim();
            if marker.is_empty() {
                return Err(LineError::invalid_line("empty environment marker", number));
            }
            (rest[..i].trim(), Some(marker.to_string()))
        }
        None => (rest.trim(), None),
    };

    let mut url = None;
    let specifiers = if is_url {
        let target = body[1..].trim();
        if target.is_empty() || target.contains(char::is_whitespace) {
            return Err(LineError::invalid_line(
                format!("invalid direct reference for '{}'", name),
                number,
            ));
        }
        url = Some(target.to_string());
        SpecifierSet::default()
    } else {
        let inner = match body.strip_prefix('(') {
            Some(open) => open.strip_suffix(')').ok_or_else(|| {
                LineError::invalid_line("unbalanced parenthesis in specifier", number)
            })?,
            None => body,
        };
        SpecifierSet::parse(inner).map_err(|e| {
            let rule = if e.is_version_problem() {
                RuleCode::InvalidVersion
            } else {
                RuleCode::InvalidLine
            };
            LineError::new(rule, format!("{} for '{}'", e, name), number)
        })?
    };

    Ok(Requirement {
        name,
        extras,
        specifiers,
        url,
        marker,
        hashes,
        source: SourceLocation::new(path, number, line.end_line),
    })
}
