use std::fmt;

use serde::{Deserialize, Serialize};

/// Glob-style URL pattern with `*` as the only wildcard.
///
/// Matching follows the CDP `Fetch.RequestPattern` convention: `*` spans any
/// run of characters (including none), everything else is literal. A pattern
/// without wildcards must equal the URL exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlPattern {
    raw: String,
}

impl UrlPattern {
    pub fn new(glob: impl Into<String>) -> Self {
        Self { raw: glob.into() }
    }

    /// The raw glob, suitable for handing to the CDP `Fetch` domain.
    pub fn as_glob(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, url: &str) -> bool {
        glob_match(&self.raw, url)
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn glob_match(pattern: &str, input: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == input;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let first = parts[0];
    let last = parts[parts.len() - 1];

    if !input.starts_with(first) {
        return false;
    }
    let mut cursor = first.len();

    // Interior literals must appear in order, each after the previous one.
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match input[cursor..].find(part) {
            Some(pos) => cursor += pos + part.len(),
            None => return false,
        }
    }

    last.is_empty() || input[cursor..].ends_with(last)
}
