use std::sync::Arc;

use gdrive_core::DriveError;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use super::index::RemoteIndex;
use super::paths::DirectoryChain;
use super::remote::{RemoteObject, RemoteStore};
use super::resolver::{PathResolver, Resolution};

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("failed to create folder {name:?} under {parent_id}: {source}")]
    DirectoryCreate {
        name: String,
        parent_id: String,
        #[source]
        source: DriveError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub deepest_id: String,
    pub created: Vec<RemoteObject>,
}

pub struct DirectoryMaterializer {
    store: Arc<dyn RemoteStore>,
    index: Arc<RemoteIndex>,
    resolver: PathResolver,
    create_lock: Mutex<()>,
}

impl DirectoryMaterializer {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        index: Arc<RemoteIndex>,
        resolver: PathResolver,
    ) -> Self {
        Self {
            store,
            index,
            resolver,
            create_lock: Mutex::new(()),
        }
    }

    /// Creates the unmatched suffix of `chain`, one level at a time.
    pub async fn materialize(
        &self,
        chain: &DirectoryChain,
        resolution: &Resolution,
    ) -> Result<Materialized, MaterializeError> {
        if resolution.is_complete() {
            return Ok(Materialized {
                deepest_id: resolution.parent_id.clone(),
                created: Vec::new(),
            });
        }

        let _guard = self.create_lock.lock().await;
        // Another caller may have created part of the chain while we waited.
        let current = self.resolver.resolve(chain).await;
        let mut parent_id = current.parent_id;
        let mut created = Vec::new();

        for name in &chain.segments()[current.matched_depth..] {
            let mut folder = self
                .store
                .create_object(name, &parent_id, true)
                .await
                .map_err(|source| MaterializeError::DirectoryCreate {
                    name: name.clone(),
                    parent_id: parent_id.clone(),
                    source,
                })?;
            if folder.parent_ids.is_empty() {
                folder.parent_ids.push(parent_id.clone());
            }
            info!(
                name = %name,
                id = %folder.id,
                parent_id = %parent_id,
                "created remote folder"
            );
            self.index.insert(folder.clone()).await;
            parent_id = folder.id.clone();
            created.push(folder);
        }

        Ok(Materialized {
            deepest_id: parent_id,
            created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::remote::ROOT_ID;
    use crate::sync::test_support::{MEMORY_ROOT, MemoryStore, folder};

    struct Fixture {
        store: Arc<MemoryStore>,
        index: Arc<RemoteIndex>,
        resolver: PathResolver,
        materializer: DirectoryMaterializer,
    }

    async fn fixture(objects: Vec<RemoteObject>) -> Fixture {
        let store = Arc::new(MemoryStore::with_objects(objects));
        let index = Arc::new(RemoteIndex::new(store.clone(), ROOT_ID));
        index.refresh().await.unwrap();
        let resolver = PathResolver::new(index.clone());
        let materializer =
            DirectoryMaterializer::new(store.clone(), index.clone(), resolver.clone());
        Fixture {
            store,
            index,
            resolver,
            materializer,
        }
    }

    #[tokio::test]
    async fn creates_whole_chain_from_root() {
        let fx = fixture(Vec::new()).await;
        let chain = DirectoryChain::new(["a", "b"]);
        let res = fx.resolver.resolve(&chain).await;

        let out = fx.materializer.materialize(&chain, &res).await.unwrap();

        let creates = fx.store.folder_creates();
        assert_eq!(creates.len(), 2);
        assert_eq!(creates[0], ("a".to_string(), MEMORY_ROOT.to_string()));
        assert_eq!(creates[1].0, "b");
        assert_eq!(creates[1].1, out.created[0].id);
        assert_eq!(out.deepest_id, out.created[1].id);
        assert!(fx.resolver.resolve(&chain).await.is_complete());
    }

    #[tokio::test]
    async fn creates_only_missing_suffix() {
        let fx = fixture(vec![
            folder("a-id", "a", "root-id"),
            folder("b-id", "b", "a-id"),
        ])
        .await;
        let chain = DirectoryChain::new(["a", "b", "c", "d", "e"]);
        let res = fx.resolver.resolve(&chain).await;
        assert_eq!(res.matched_depth, 2);

        let out = fx.materializer.materialize(&chain, &res).await.unwrap();

        assert_eq!(out.created.len(), chain.len() - res.matched_depth);
        let mut expected_parent = "b-id".to_string();
        for (obj, name) in out.created.iter().zip(["c", "d", "e"]) {
            assert_eq!(obj.name, name);
            assert_eq!(obj.parent_id(), Some(expected_parent.as_str()));
            let indexed = fx.index.children_of(&expected_parent).await;
            assert!(indexed.iter().any(|child| child.id == obj.id));
            expected_parent = obj.id.clone();
        }
    }

    #[tokio::test]
    async fn complete_chain_creates_nothing() {
        let fx = fixture(vec![folder("a-id", "a", "root-id")]).await;
        let chain = DirectoryChain::new(["a"]);
        let res = fx.resolver.resolve(&chain).await;

        let out = fx.materializer.materialize(&chain, &res).await.unwrap();

        assert_eq!(out.deepest_id, "a-id");
        assert!(fx.store.folder_creates().is_empty());
    }

    #[tokio::test]
    async fn stale_resolution_is_rechecked() {
        let fx = fixture(Vec::new()).await;
        let chain = DirectoryChain::new(["a", "b"]);
        let stale = fx.resolver.resolve(&chain).await;
        fx.materializer.materialize(&chain, &stale).await.unwrap();

        fx.materializer.materialize(&chain, &stale).await.unwrap();

        assert_eq!(fx.store.folder_creates().len(), 2);
    }

    #[tokio::test]
    async fn failed_create_stops_the_chain() {
        let fx = fixture(Vec::new()).await;
        fx.store.fail_create("b");
        let chain = DirectoryChain::new(["a", "b", "c"]);
        let res = fx.resolver.resolve(&chain).await;

        let err = fx
            .materializer
            .materialize(&chain, &res)
            .await
            .expect_err("b cannot be created");

        match err {
            MaterializeError::DirectoryCreate { name, .. } => assert_eq!(name, "b"),
        }
        let names: Vec<_> = fx.store.folder_creates().into_iter().map(|c| c.0).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(fx.index.lookup_by_name("a").await.is_some());
    }
}
