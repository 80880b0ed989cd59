//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile a concrete path (`/things/{id}.json`) into an anchored regex
//! - Rank patterns by specificity
//! - Extract placeholder values from a matching request path
//!
//! # Design Decisions
//! - A placeholder matches one segment's worth of non-slash characters
//! - Literal text is regex-escaped, so dots and other metacharacters match themselves
//! - Matching is anchored on both ends; a substring match never counts
//! - Fewer placeholders first, then longer literal text first

use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;

/// Regex fragment a placeholder compiles to.
pub const WILDCARD: &str = "[^/]+";

/// Errors raised while compiling a path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("unbalanced braces")]
    Unbalanced,

    #[error("invalid placeholder name: {0:?}")]
    InvalidPlaceholder(String),

    #[error("placeholder {0:?} used twice")]
    DuplicatePlaceholder(String),

    #[error("regex compilation failed: {0}")]
    Regex(String),
}

/// A compiled concrete path.
#[derive(Debug, Clone)]
pub struct PathPattern {
    path: String,
    expression: String,
    regex: Regex,
    params: Vec<String>,
    literal_len: usize,
}

impl PathPattern {
    /// Compile a concrete path such as `/things/{id}.json`.
    pub fn compile(path: &str) -> Result<Self, PatternError> {
        let mut expression = String::new();
        let mut named = String::from("^");
        let mut params: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut literal_len = 0;

        let mut rest = path;
        while !rest.is_empty() {
            match rest.find(['{', '}']) {
                Some(idx) if rest[idx..].starts_with('}') => return Err(PatternError::Unbalanced),
                Some(idx) => {
                    literal.push_str(&rest[..idx]);
                    let after = &rest[idx + 1..];
                    let close = after.find('}').ok_or(PatternError::Unbalanced)?;
                    let name = &after[..close];
                    if !is_identifier(name) {
                        return Err(PatternError::InvalidPlaceholder(name.to_string()));
                    }
                    if params.iter().any(|p| p == name) {
                        return Err(PatternError::DuplicatePlaceholder(name.to_string()));
                    }

                    flush_literal(&mut literal, &mut expression, &mut named, &mut literal_len);
                    expression.push_str(WILDCARD);
                    named.push_str(&format!("(?P<{name}>{WILDCARD})"));
                    params.push(name.to_string());
                    rest = &after[close + 1..];
                }
                None => {
                    literal.push_str(rest);
                    rest = "";
                }
            }
        }
        flush_literal(&mut literal, &mut expression, &mut named, &mut literal_len);
        named.push('$');

        let regex = Regex::new(&named).map_err(|e| PatternError::Regex(e.to_string()))?;

        Ok(Self {
            path: path.to_string(),
            expression,
            regex,
            params,
            literal_len,
        })
    }

    /// The declared path this pattern was compiled from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Unanchored expression with anonymous wildcards, e.g. `/things/[^/]+\.json`.
    ///
    /// Paths that differ only in placeholder names share an expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Number of placeholder segments.
    pub fn wildcards(&self) -> usize {
        self.params.len()
    }

    /// Number of literal characters.
    pub fn literal_len(&self) -> usize {
        self.literal_len
    }

    /// True if the whole request path matches.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Placeholder values when the whole request path matches.
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;
        let values = self
            .params
            .iter()
            .filter_map(|name| caps.name(name).map(|m| (name.clone(), m.as_str().to_string())))
            .collect();
        Some(PathParams(values))
    }

    /// Order in which patterns must be tried: most specific first.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        self.wildcards()
            .cmp(&other.wildcards())
            .then_with(|| other.literal_len.cmp(&self.literal_len))
            .then_with(|| self.expression.cmp(&other.expression))
    }
}

fn flush_literal(
    literal: &mut String,
    expression: &mut String,
    named: &mut String,
    len: &mut usize,
) {
    if literal.is_empty() {
        return;
    }
    let escaped = regex::escape(literal);
    expression.push_str(&escaped);
    named.push_str(&escaped);
    *len += literal.chars().count();
    literal.clear();
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Placeholder values captured from the request path.
///
/// Inserted into request extensions by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
