use crate::error::ConfigError;
use regex::bytes::Regex;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

const DEFAULT_PATTERN: &str = "^[a-zA-Z0-9_-]+$";

const LSB_SYSINIT_PATTERNS: [&str; 3] = [
    r"^_?([a-z0-9_.]+-)+[a-z0-9]+$",
    r"^[a-z0-9-].*\.dpkg-(old|dist|new|tmp)$",
    r"^[a-z0-9][a-z0-9-]*$",
];

/// Where the file name rules come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// Letters, digits, underscores and hyphens only.
    #[default]
    Default,
    /// LSB init script naming, including dpkg backup names.
    LsbSysinit,
    /// A user supplied pattern.
    Custom(String),
}

/// Decides whether a directory entry name is eligible to run.
///
/// Names are matched as raw bytes, so entries that are not valid UTF-8 are
/// judged by the same patterns instead of being silently dropped.
#[derive(Debug, Clone)]
pub struct NameValidator {
    patterns: Vec<Regex>,
}

impl NameValidator {
    /// Compile the patterns for `policy`.
    pub fn new(policy: &NamePolicy) -> Result<Self, ConfigError> {
        let patterns = match policy {
            NamePolicy::Custom(pattern) => vec![Regex::new(pattern)?],
            NamePolicy::LsbSysinit => LSB_SYSINIT_PATTERNS
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
            NamePolicy::Default => vec![Regex::new(DEFAULT_PATTERN)?],
        };
        Ok(Self { patterns })
    }

    /// A validator with no patterns; every name passes.
    #[cfg(test)]
    fn accept_all() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// A name is accepted when it matches any of the patterns.
    pub fn accepts(&self, name: &OsStr) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let bytes = name.as_bytes();
        self.patterns.iter().any(|re| re.is_match(bytes))
    }
}
