//! Registry and repository contracts

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use storage::Storage;

use crate::error::RegistryResult;
use crate::layers::{Layers, StorageLayers};
use crate::layout;
use crate::manifests::{Manifests, StorageManifests};
use crate::name::RepoName;
use crate::tags::{Catalog, page};
use crate::uploads::{SessionLocks, Uploads};

/// A whole registry: repositories plus the catalog over them.
#[async_trait::async_trait]
pub trait Docker: fmt::Debug + Send + Sync {
    /// The repository with the given name.
    fn repo(&self, name: &RepoName) -> Box<dyn Repo>;

    /// List repository names in lexicographic order, strictly after `from`.
    async fn catalog(&self, from: Option<&RepoName>, limit: usize) -> RegistryResult<Catalog>;
}

/// One repository's stores.
pub trait Repo: fmt::Debug + Send + Sync {
    /// The repository's blob store.
    fn layers(&self) -> Arc<dyn Layers>;

    /// The repository's manifest store.
    fn manifests(&self) -> Arc<dyn Manifests>;

    /// The repository's upload sessions; unsupported on read-only repos.
    fn uploads(&self) -> RegistryResult<Uploads>;
}

/// [`Docker`] backed by a [`Storage`].
#[derive(Debug, Clone)]
pub struct StorageDocker {
    storage: Storage,
    locks: SessionLocks,
}

impl StorageDocker {
    /// A registry over the given storage.
    ///
    /// Upload session locks live here, so all [`Uploads`] handles must be
    /// obtained through [`repo`][Docker::repo] on one `StorageDocker` per
    /// backing storage.
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            locks: SessionLocks::default(),
        }
    }
}

#[async_trait::async_trait]
impl Docker for StorageDocker {
    fn repo(&self, name: &RepoName) -> Box<dyn Repo> {
        Box::new(StorageRepo {
            storage: self.storage.clone(),
            name: name.clone(),
            locks: self.locks.clone(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn catalog(&self, from: Option<&RepoName>, limit: usize) -> RegistryResult<Catalog> {
        let root = layout::repositories_root();
        let keys = self.storage.list(&root).await?;
        let mut names = BTreeSet::new();
        for key in &keys {
            let Ok(rest) = key.strip_prefix(&root) else {
                continue;
            };
            // A repository name may contain slashes; it ends at the first
            // bookkeeping component (`_layers`, `_manifests`, `_uploads`),
            // which no valid name component can collide with.
            let name = rest
                .components()
                .map(|component| component.as_str())
                .take_while(|part| !part.starts_with('_'))
                .collect::<Vec<_>>()
                .join("/");
            if let Ok(name) = name.parse::<RepoName>() {
                names.insert(name);
            }
        }
        Ok(Catalog {
            repositories: page(names.into_iter().collect(), from, limit),
        })
    }
}

/// [`Repo`] backed by a [`Storage`], built by [`Docker::repo`] on a
/// [`StorageDocker`].
#[derive(Debug, Clone)]
pub struct StorageRepo {
    storage: Storage,
    name: RepoName,
    locks: SessionLocks,
}

impl Repo for StorageRepo {
    fn layers(&self) -> Arc<dyn Layers> {
        Arc::new(StorageLayers::new(self.storage.clone(), self.name.clone()))
    }

    fn manifests(&self) -> Arc<dyn Manifests> {
        Arc::new(StorageManifests::new(
            self.storage.clone(),
            self.name.clone(),
        ))
    }

    fn uploads(&self) -> RegistryResult<Uploads> {
        Ok(Uploads::shared(
            self.storage.clone(),
            self.name.clone(),
            self.locks.clone(),
        ))
    }
}
