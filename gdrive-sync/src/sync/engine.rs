use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::deleter::{BulkDeleter, DeleteError};
use super::index::{IndexError, RefreshStats, RemoteIndex};
use super::materialize::DirectoryMaterializer;
use super::remote::RemoteStore;
use super::report::{DeleteReport, FailurePolicy, UploadReport};
use super::resolver::PathResolver;
use super::transfer::UploadError;
use super::uploader::BatchUploader;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Delete(#[from] DeleteError),
    #[error("upload root {0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Wires one store into the index, uploader and deleter.
pub struct SyncEngine {
    index: Arc<RemoteIndex>,
    uploader: BatchUploader,
    deleter: BulkDeleter,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        root_id: impl Into<String>,
        policy: FailurePolicy,
    ) -> Self {
        let index = Arc::new(RemoteIndex::new(store.clone(), root_id));
        let resolver = PathResolver::new(index.clone());
        let materializer = Arc::new(DirectoryMaterializer::new(
            store.clone(),
            index.clone(),
            resolver.clone(),
        ));
        let uploader = BatchUploader::new(
            store.clone(),
            index.clone(),
            resolver,
            materializer,
            policy,
        );
        let deleter = BulkDeleter::new(store, policy);
        Self {
            index,
            uploader,
            deleter,
        }
    }

    pub fn index(&self) -> &Arc<RemoteIndex> {
        &self.index
    }

    pub async fn refresh_index(&self) -> Result<RefreshStats, SyncError> {
        Ok(self.index.refresh().await?)
    }

    pub async fn upload_tree(
        &self,
        root_dir: &Path,
        batch_size: usize,
    ) -> Result<UploadReport, SyncError> {
        self.uploader.run(root_dir, batch_size).await
    }

    pub async fn delete_by_prefix(
        &self,
        prefix: &str,
        batch_size: usize,
    ) -> Result<DeleteReport, SyncError> {
        self.deleter.delete_by_prefix(prefix, batch_size).await
    }
}
