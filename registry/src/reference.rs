//! Manifest references

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;

use crate::digest::Digest;
use crate::error::RegistryError;
use crate::name::Tag;

/// A reference to a manifest, by digest or by tag.
///
/// A raw string containing exactly one `:` is always parsed as a digest
/// reference; anything else must be a valid tag. Tags cannot contain `:`,
/// so the classification is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ManifestReference {
    /// An immutable reference to exact manifest content.
    Digest(Digest),
    /// A movable pointer onto whatever digest the tag currently names.
    Tag(Tag),
}

impl ManifestReference {
    /// The link key for this reference, relative to a repository's manifest
    /// root.
    ///
    /// Digest references link under `revisions/`, tag references under
    /// `tags/`; the two namespaces never collide.
    pub fn link_key(&self) -> Utf8PathBuf {
        match self {
            ManifestReference::Digest(digest) => {
                format!("revisions/{}/{}/link", digest.alg(), digest.hex()).into()
            }
            ManifestReference::Tag(tag) => format!("tags/{tag}/current/link").into(),
        }
    }

    /// The tag, when this reference is tag-based.
    pub fn tag(&self) -> Option<&Tag> {
        match self {
            ManifestReference::Tag(tag) => Some(tag),
            ManifestReference::Digest(_) => None,
        }
    }
}

impl From<Digest> for ManifestReference {
    fn from(digest: Digest) -> Self {
        ManifestReference::Digest(digest)
    }
}

impl From<Tag> for ManifestReference {
    fn from(tag: Tag) -> Self {
        ManifestReference::Tag(tag)
    }
}

impl fmt::Display for ManifestReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestReference::Digest(digest) => digest.fmt(f),
            ManifestReference::Tag(tag) => tag.fmt(f),
        }
    }
}

impl FromStr for ManifestReference {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            Ok(ManifestReference::Digest(s.parse()?))
        } else {
            Ok(ManifestReference::Tag(s.parse()?))
        }
    }
}
