//! Path exclusion rules shared by every build recipe.

use std::ffi::OsStr;
use std::fmt::Display;
use std::path::{Component, Path};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Patterns excluded from every package unless the project config overrides them
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "__pycache__",
    ".git",
    ".gitignore",
    ".gitattributes",
    "node_modules",
    "releases",
    "docs",
    "scripts",
    ".vscode",
    ".idea",
    "*.zip",
    "*.pyc",
    ".DS_Store",
    "Thumbs.db",
];

/// A single exclusion rule: `name` matches exactly, `*suffix` matches by suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionPattern {
    Exact(String),
    Suffix(String),
}

impl ExclusionPattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_prefix('*') {
            Some(suffix) => ExclusionPattern::Suffix(suffix.to_string()),
            None => ExclusionPattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            ExclusionPattern::Exact(exact) => name == exact,
            ExclusionPattern::Suffix(suffix) => name.ends_with(suffix.as_str()),
        }
    }
}

impl Display for ExclusionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionPattern::Exact(exact) => write!(f, "{}", exact),
            ExclusionPattern::Suffix(suffix) => write!(f, "*{}", suffix),
        }
    }
}

impl Serialize for ExclusionPattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ExclusionPattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pattern = String::deserialize(deserializer)?;
        if pattern.is_empty() || pattern == "*" {
            return Err(serde::de::Error::custom(
                "Exclusion pattern must not be empty",
            ));
        }
        Ok(ExclusionPattern::parse(&pattern))
    }
}

/// Immutable set of exclusion patterns.
///
/// A root-relative path is excluded when any of its components matches any
/// pattern. Because ancestors are tested too, pruning an excluded directory
/// during a walk and filtering a flat file list select the same files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionFilter {
    patterns: Vec<ExclusionPattern>,
}

impl ExclusionFilter {
    pub fn new(patterns: Vec<ExclusionPattern>) -> Self {
        Self { patterns }
    }

    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            patterns
                .into_iter()
                .map(|p| ExclusionPattern::parse(p.as_ref()))
                .collect(),
        )
    }

    pub fn patterns(&self) -> &[ExclusionPattern] {
        &self.patterns
    }

    /// Whether a single file or directory name matches any pattern
    pub fn matches_name(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        self.patterns.iter().any(|pattern| pattern.matches(&name))
    }

    /// Whether `path`, given relative to the project root, must be left out of packages
    pub fn should_exclude(&self, path: &Path) -> bool {
        path.components().any(|component| match component {
            Component::Normal(name) => self.matches_name(name),
            _ => false,
        })
    }
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::from_patterns(DEFAULT_EXCLUDE_PATTERNS)
    }
}
