//! Tag list and catalog JSON views

use crate::error::{RegistryError, RegistryResult};
use crate::name::{RepoName, Tag};

/// The tag listing of one repository, as served by `/v2/<name>/tags/list`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TagList {
    /// The repository the tags belong to.
    pub name: RepoName,
    /// Tags in lexicographic order.
    pub tags: Vec<Tag>,
}

impl TagList {
    /// Parse a remote registry's tag list response.
    pub fn from_json(data: &[u8]) -> RegistryResult<Self> {
        serde_json::from_slice(data).map_err(RegistryError::remote)
    }
}

/// The repository catalog, as served by `/v2/_catalog`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Catalog {
    /// Repository names in lexicographic order.
    pub repositories: Vec<RepoName>,
}

impl Catalog {
    /// Parse a remote registry's catalog response.
    pub fn from_json(data: &[u8]) -> RegistryResult<Self> {
        serde_json::from_slice(data).map_err(RegistryError::remote)
    }
}

/// Keyset pagination over a sorted list: strictly after `from`, at most
/// `limit` entries.
pub(crate) fn page<T: Ord>(items: Vec<T>, from: Option<&T>, limit: usize) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| from.is_none_or(|from| item > from))
        .take(limit)
        .collect()
}
