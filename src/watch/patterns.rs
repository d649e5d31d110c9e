// src/watch/patterns.rs

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::errors::{Result, VroomifyError};
use crate::types::RelativePath;

/// Compiled include/exclude patterns evaluated against paths relative to the
/// watched root.
///
/// Pattern forms:
///
/// - `*.cpp` matches that extension at any depth.
/// - `CMakeLists.txt` (no separator, no wildcard) matches that file name at
///   any depth.
/// - `src/` matches everything below `src`.
/// - anything else is a glob anchored at the root, where `*` matches any run
///   of characters (including separators) and `?` matches one character.
///
/// Matching ignores case; both `/` and `\` are accepted as separators.
#[derive(Clone)]
pub struct PathFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFilter")
            .field("include", &self.include.len())
            .field("exclude", &self.exclude.len())
            .finish()
    }
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    /// A filter that matches paths against `patterns` with nothing excluded.
    pub fn any_of(patterns: &[String]) -> Result<Self> {
        Self::new(patterns, &[])
    }

    /// True if `rel_path` matches at least one include pattern and no
    /// exclude pattern.
    pub fn matches(&self, rel_path: &str) -> bool {
        let normalized = rel_path.replace('\\', "/");
        if self.exclude.iter().any(|r| r.is_match(&normalized)) {
            return false;
        }
        self.include.iter().any(|r| r.is_match(&normalized))
    }

    pub fn is_included(&self, path: &RelativePath) -> bool {
        self.matches(path.as_str())
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

/// Compile a single pattern into a case-insensitive regex over
/// `/`-separated relative paths.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    let pattern = pattern.trim().replace('\\', "/");
    if pattern.is_empty() {
        return Err(VroomifyError::InvalidPattern {
            pattern,
            reason: "pattern is empty".to_string(),
        });
    }

    let source = pattern_to_regex(&pattern);
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(|e| VroomifyError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })
}

fn pattern_to_regex(pattern: &str) -> String {
    const ROOT_OR_DIR: &str = "(^|/)";

    if let Some(ext) = pattern.strip_prefix("*.") {
        let plain_ext = !ext.is_empty()
            && ext
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if plain_ext {
            return format!("{ROOT_OR_DIR}.*\\.{}$", regex::escape(ext));
        }
    }

    if !pattern.contains(['/', '*', '?']) {
        return format!("{ROOT_OR_DIR}{}$", regex::escape(pattern));
    }

    let (body, whole_dir) = match pattern.strip_suffix('/') {
        Some(dir) => (dir, true),
        None => (pattern, false),
    };

    let mut source = String::from("^");
    for c in body.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    if whole_dir {
        source.push_str("(/.*)?$");
    } else {
        source.push('$');
    }
    source
}
