//! Declarative field extraction from line-oriented admin output.
//!
//! The admin shell answers every request with plain text. Rather than
//! scanning lines ad hoc at each call site, queries describe the fields they
//! need as [`FieldRule`]s and hand the raw output to a [`ResponseParser`].

use std::collections::HashMap;
use std::str::FromStr;

use crate::{Error, Result};

/// Selects the lines a rule looks at.
#[derive(Clone, Debug)]
pub enum LineMatch {
    /// Line starts with the given text
    Prefix(String),
    /// Line contains the given text anywhere
    Contains(String),
    /// First whitespace-separated token equals the given text
    FirstToken(String),
    /// Every line
    Any,
}

impl LineMatch {
    fn matches(&self, line: &str) -> bool {
        match self {
            Self::Prefix(prefix) => line.starts_with(prefix.as_str()),
            Self::Contains(text) => line.contains(text.as_str()),
            Self::FirstToken(token) => line.split_whitespace().next() == Some(token.as_str()),
            Self::Any => true,
        }
    }
}

/// Pulls a value out of a matched line.
#[derive(Clone, Debug)]
pub enum Extract {
    /// Whitespace-separated token at the given zero-based index
    Token(usize),
    /// Last whitespace-separated token
    LastToken,
    /// Text right after the marker, up to the next `,`, `}`, `"` or whitespace
    After(String),
    /// Like `After`, but every [`WILDCARD`] in the marker matches any one character
    AfterPattern(String),
}

/// Single-character wildcard understood by [`Extract::AfterPattern`]
pub const WILDCARD: char = '?';

impl Extract {
    /// Extract the value following `marker`, e.g. `total=` in `total=3,move_pri=0`
    pub fn after(marker: impl Into<String>) -> Self {
        Self::After(marker.into())
    }

    /// Extract the value following a marker containing [`WILDCARD`]s, e.g.
    /// `replica_stub?replica(Count)` for `replica*eon.replica_stub*replica(Count)`
    pub fn after_pattern(pattern: impl Into<String>) -> Self {
        Self::AfterPattern(pattern.into())
    }

    fn apply<'a>(&self, line: &'a str) -> Option<&'a str> {
        match self {
            Self::Token(index) => line.split_whitespace().nth(*index),
            Self::LastToken => line.split_whitespace().last(),
            Self::After(marker) => line
                .find(marker.as_str())
                .map(|at| value_at(&line[at + marker.len()..])),
            Self::AfterPattern(pattern) => {
                pattern_end(line, pattern).map(|end| value_at(&line[end..]))
            }
        }
    }
}

fn value_at(rest: &str) -> &str {
    let end = rest
        .find(|c: char| matches!(c, ',' | '}' | '"') || c.is_whitespace())
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Byte offset just past the first match of `pattern` in `line`.
fn pattern_end(line: &str, pattern: &str) -> Option<usize> {
    line.char_indices().find_map(|(start, _)| {
        let mut candidate = line[start..].char_indices();
        let mut end = start;
        for expected in pattern.chars() {
            let (offset, c) = candidate.next()?;
            if expected != WILDCARD && expected != c {
                return None;
            }
            end = start + offset + c.len_utf8();
        }
        Some(end)
    })
}

/// One named field to extract.
#[derive(Clone, Debug)]
pub struct FieldRule {
    /// Field name used for lookup and in error messages
    pub name: &'static str,
    /// Which lines to consider
    pub line: LineMatch,
    /// How to pull the value from a matching line
    pub extract: Extract,
    /// Whether parsing fails when the field is never found
    pub required: bool,
}

impl FieldRule {
    /// A field that must be present
    pub fn required(name: &'static str, line: LineMatch, extract: Extract) -> Self {
        Self {
            name,
            line,
            extract,
            required: true,
        }
    }

    /// A field that may be absent
    pub fn optional(name: &'static str, line: LineMatch, extract: Extract) -> Self {
        Self {
            name,
            line,
            extract,
            required: false,
        }
    }

    fn apply<'a>(&self, line: &'a str) -> Option<&'a str> {
        if self.line.matches(line) {
            self.extract.apply(line).filter(|v| !v.is_empty())
        } else {
            None
        }
    }
}

/// A set of field rules applied together to one response.
#[derive(Clone, Debug)]
pub struct ResponseParser {
    what: String,
    rules: Vec<FieldRule>,
}

impl ResponseParser {
    /// Create a parser; `what` names the response in error messages
    pub fn new(what: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            rules: Vec::new(),
        }
    }

    /// Add a field rule
    pub fn field(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Scan `output` line by line and extract every field.
    ///
    /// Each field keeps the first value found. Scanning stops as soon as all
    /// fields are set. Fails with [`Error::Parse`] if a required field is
    /// still missing after the last line.
    pub fn parse<'a>(&self, output: &'a str) -> Result<ParsedFields<'a>> {
        let mut values: HashMap<&'static str, &'a str> = HashMap::new();

        for line in output.lines() {
            for rule in &self.rules {
                if values.contains_key(rule.name) {
                    continue;
                }
                if let Some(value) = rule.apply(line) {
                    values.insert(rule.name, value);
                }
            }
            if values.len() == self.rules.len() {
                break;
            }
        }

        let missing: Vec<&str> = self
            .rules
            .iter()
            .filter(|r| r.required && !values.contains_key(r.name))
            .map(|r| r.name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::parse(
                format!("{} (missing {})", self.what, missing.join(", ")),
                output,
            ));
        }

        Ok(ParsedFields {
            what: self.what.clone(),
            values,
            raw: output,
        })
    }
}

/// Values extracted by a [`ResponseParser`], borrowed from the raw output.
#[derive(Debug)]
pub struct ParsedFields<'a> {
    what: String,
    values: HashMap<&'static str, &'a str>,
    raw: &'a str,
}

impl<'a> ParsedFields<'a> {
    /// Raw text of a field, if it was found
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.values.get(name).copied()
    }

    /// Whether a field was found
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Raw text of a field that must be present
    pub fn text(&self, name: &str) -> Result<&'a str> {
        self.get(name)
            .ok_or_else(|| Error::parse(format!("{} (missing {})", self.what, name), self.raw))
    }

    /// Convert a required field, reporting conversion failures as parse errors
    pub fn value<T: FromStr>(&self, name: &str) -> Result<T> {
        let text = self.text(name)?;
        self.convert(name, text)
    }

    /// Convert a field that may be absent
    pub fn optional_value<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.get(name).map(|text| self.convert(name, text)).transpose()
    }

    fn convert<T: FromStr>(&self, name: &str, text: &str) -> Result<T> {
        text.parse().map_err(|_| {
            Error::parse(
                format!("{} (invalid {} '{}')", self.what, name, text),
                self.raw,
            )
        })
    }
}

/// Every value `rule` extracts, in line order.
///
/// Used for repeated lines such as the `propose` lines of a downgrade.
pub fn scan_all<'a>(output: &'a str, rule: &FieldRule) -> Vec<&'a str> {
    output.lines().filter_map(|line| rule.apply(line)).collect()
}

/// Data rows of a `[section]` table, split into tokens.
///
/// Rows run from the line after `[section]` up to the next `[...]` header.
/// Only rows whose first token is numeric (an id column) are returned, which
/// skips the column header and blank lines. Returns `None` when the section
/// header itself is absent.
pub fn section_rows<'a>(output: &'a str, section: &str) -> Option<Vec<Vec<&'a str>>> {
    let header = format!("[{}]", section);
    let mut lines = output.lines();
    lines.by_ref().find(|line| line.trim() == header)?;

    let rows = lines
        .take_while(|line| !line.trim_start().starts_with('['))
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .filter(|tokens| {
            tokens
                .first()
                .is_some_and(|first| first.parse::<u64>().is_ok())
        })
        .collect();
    Some(rows)
}
