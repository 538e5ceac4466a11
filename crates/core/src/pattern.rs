//! Base-name matching for incoming events
//!
//! Patterns are regular expressions searched (not anchored) against the final
//! path component only, so `\.conf$` matches `/etc/app/db.conf` but `^etc`
//! matches nothing there.

use crate::error::Result;
use crate::event::base_name;
use regex::Regex;
use std::fmt;
use std::path::Path;

/// Compiled name filter
#[derive(Clone)]
pub struct NamePattern {
    regex: Regex,
}

impl NamePattern {
    /// Compile a pattern from a regular expression
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Check a base name (no directory components)
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Check the base name of a path
    ///
    /// Paths without a final component never match.
    pub fn matches_path(&self, path: &Path) -> bool {
        base_name(path).is_some_and(|name| self.matches(&name))
    }

    /// Source text of the expression
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl From<Regex> for NamePattern {
    fn from(regex: Regex) -> Self {
        Self { regex }
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamePattern").field(&self.as_str()).finish()
    }
}
