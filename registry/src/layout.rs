//! Storage key layout
//!
//! Blob data lives once, content-addressed, outside any repository.
//! Everything a repository owns (layer links, manifest links, upload
//! sessions) lives under `repositories/<name>/`.

use camino::Utf8PathBuf;

use crate::digest::Digest;
use crate::name::RepoName;
use crate::reference::ManifestReference;

/// Key of a blob's content, derived from its digest.
pub(crate) fn blob_data(digest: &Digest) -> Utf8PathBuf {
    let hex = digest.hex();
    let prefix = &hex[..hex.len().min(2)];
    format!("blobs/{}/{}/{}/data", digest.alg(), prefix, hex).into()
}

/// Key of a repository's layer link for a digest.
pub(crate) fn layer_link(name: &RepoName, digest: &Digest) -> Utf8PathBuf {
    format!(
        "repositories/{}/_layers/{}/{}/link",
        name,
        digest.alg(),
        digest.hex()
    )
    .into()
}

/// Root of a repository's manifest links.
pub(crate) fn manifests_root(name: &RepoName) -> Utf8PathBuf {
    format!("repositories/{name}/_manifests").into()
}

/// Key of a manifest link (`revisions/…` or `tags/…`) for a reference.
pub(crate) fn manifest_link(name: &RepoName, reference: &ManifestReference) -> Utf8PathBuf {
    manifests_root(name).join(reference.link_key())
}

/// Root of a repository's tag links.
pub(crate) fn tags_root(name: &RepoName) -> Utf8PathBuf {
    manifests_root(name).join("tags")
}

/// Root of one upload session.
pub(crate) fn upload_root(name: &RepoName, uuid: &str) -> Utf8PathBuf {
    format!("repositories/{name}/_uploads/{uuid}").into()
}

/// Key of an upload session's start marker.
pub(crate) fn upload_started(name: &RepoName, uuid: &str) -> Utf8PathBuf {
    upload_root(name, uuid).join("started")
}

/// Root of an upload session's chunk files.
pub(crate) fn upload_chunks(name: &RepoName, uuid: &str) -> Utf8PathBuf {
    upload_root(name, uuid).join("chunks")
}

/// Key of one upload chunk, named by its starting offset so that the
/// lexicographic key order is the wire order.
pub(crate) fn upload_chunk(name: &RepoName, uuid: &str, offset: u64) -> Utf8PathBuf {
    upload_chunks(name, uuid).join(format!("{offset:020}"))
}

/// Root of all repositories.
pub(crate) fn repositories_root() -> Utf8PathBuf {
    "repositories".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_the_registry_layout() {
        let name: RepoName = "library/ubuntu".parse().unwrap();
        let digest = Digest::new("sha256", "abcdef");

        assert_eq!(blob_data(&digest), "blobs/sha256/ab/abcdef/data");
        assert_eq!(
            layer_link(&name, &digest),
            "repositories/library/ubuntu/_layers/sha256/abcdef/link"
        );
        assert_eq!(
            manifest_link(&name, &ManifestReference::Digest(digest)),
            "repositories/library/ubuntu/_manifests/revisions/sha256/abcdef/link"
        );
        assert_eq!(
            upload_chunk(&name, "u-1", 42),
            "repositories/library/ubuntu/_uploads/u-1/chunks/00000000000000000042"
        );
    }
}
