//! Validated tag and repository names

use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

/// A validated image tag.
///
/// Grammar: `[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,127}`. Tags can never contain a
/// `:`, so a digest string is never a valid tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Tag {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RegistryError::InvalidTag(s.to_string());
        let mut chars = s.chars();
        let first = chars.next().ok_or_else(invalid)?;
        if !(first.is_ascii_alphanumeric() || first == '_') {
            return Err(invalid());
        }
        if s.len() > 128 {
            return Err(invalid());
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for Tag {
    type Error = RegistryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl<'de> serde::Deserialize<'de> for Tag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A validated repository name.
///
/// One or more `/`-separated components, each a run of `[a-z0-9]` groups
/// joined by single `.`, `_`, or `-` separators. The whole name is shorter
/// than 256 bytes and never ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct RepoName(String);

impl RepoName {
    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn valid_component(component: &str) -> bool {
    if component.is_empty() {
        return false;
    }
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let mut prev_separator = true;
    for c in component.chars() {
        if alnum(c) {
            prev_separator = false;
        } else if matches!(c, '.' | '_' | '-') {
            // separators must be single and between alphanumeric runs
            if prev_separator {
                return false;
            }
            prev_separator = true;
        } else {
            return false;
        }
    }
    !prev_separator
}

impl FromStr for RepoName {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RegistryError::InvalidRepository(s.to_string());
        if s.is_empty() || s.len() >= 256 || s.ends_with('/') {
            return Err(invalid());
        }
        if !s.split('/').all(valid_component) {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for RepoName {
    type Error = RegistryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl<'de> serde::Deserialize<'de> for RepoName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
