use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::engine::SyncError;
use super::index::RemoteIndex;
use super::materialize::DirectoryMaterializer;
use super::paths::{chain_for, remote_file_name};
use super::remote::RemoteStore;
use super::report::{FailedFile, FailurePolicy, FileError, UploadReport, UploadedFile};
use super::resolver::PathResolver;
use super::transfer::{UploadTask, upload_file};

pub struct BatchUploader {
    store: Arc<dyn RemoteStore>,
    index: Arc<RemoteIndex>,
    resolver: PathResolver,
    materializer: Arc<DirectoryMaterializer>,
    policy: FailurePolicy,
}

impl BatchUploader {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        index: Arc<RemoteIndex>,
        resolver: PathResolver,
        materializer: Arc<DirectoryMaterializer>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            store,
            index,
            resolver,
            materializer,
            policy,
        }
    }

    /// Mirrors every regular file under `root_dir`, `batch_size` uploads at a
    /// time. A batch is fully drained before the next one is prepared.
    pub async fn run(
        &self,
        root_dir: &Path,
        batch_size: usize,
    ) -> Result<UploadReport, SyncError> {
        if !root_dir.is_dir() {
            return Err(SyncError::NotADirectory(root_dir.to_path_buf()));
        }
        self.index.refresh().await?;

        let files = discover_files(root_dir);
        let batch_size = batch_size.max(1);
        let mut report = UploadReport {
            discovered: files.len(),
            ..UploadReport::default()
        };
        let remote_root = self.index.root_id().await;
        info!(
            root = ?root_dir,
            remote_root = %remote_root,
            files = files.len(),
            batch_size,
            "starting batched upload"
        );

        for (number, batch) in files.chunks(batch_size).enumerate() {
            report.batches += 1;
            let mut tasks = Vec::with_capacity(batch.len());
            for path in batch {
                match self.prepare(root_dir, path, &mut report).await {
                    Ok(task) => tasks.push(task),
                    Err(error) => {
                        warn!(path = ?path, error = %error, "skipping file");
                        report.failed.push(FailedFile {
                            path: path.clone(),
                            error,
                        });
                    }
                }
            }
            debug!(batch = number + 1, tasks = tasks.len(), "dispatching batch");
            if let Err(err) = self.dispatch(tasks, &mut report).await {
                error!(
                    batch = number + 1,
                    uploaded = report.uploaded.len(),
                    failed = report.failed.len(),
                    folders_created = report.folders_created,
                    "batched upload aborted"
                );
                return Err(err);
            }
        }

        info!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            folders_created = report.folders_created,
            "batched upload finished"
        );
        Ok(report)
    }

    async fn prepare(
        &self,
        root_dir: &Path,
        path: &Path,
        report: &mut UploadReport,
    ) -> Result<UploadTask, FileError> {
        let chain = chain_for(root_dir, path)?;
        let name = remote_file_name(path)?;
        let resolution = self.resolver.resolve(&chain).await;

        let parent_id = if resolution.is_complete() {
            resolution.parent_id
        } else {
            debug!(
                path = ?path,
                missing = resolution.chain_len - resolution.matched_depth,
                "materializing directory chain"
            );
            let materialized = self.materializer.materialize(&chain, &resolution).await?;
            report.folders_created += materialized.created.len();
            materialized.deepest_id
        };

        Ok(UploadTask {
            local_path: path.to_path_buf(),
            name,
            parent_id,
        })
    }

    /// Runs one batch to completion. Every task is awaited even when one of
    /// them fails fatally.
    async fn dispatch(
        &self,
        tasks: Vec<UploadTask>,
        report: &mut UploadReport,
    ) -> Result<(), SyncError> {
        let mut set = JoinSet::new();
        for task in tasks {
            let store = Arc::clone(&self.store);
            set.spawn(async move {
                let result = upload_file(store.as_ref(), &task).await;
                (task, result)
            });
        }

        let mut fatal = None;
        let mut panicked = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((task, Ok(obj))) => {
                    info!(path = ?task.local_path, id = %obj.id, "uploaded file");
                    report.uploaded.push(UploadedFile {
                        path: task.local_path,
                        id: obj.id,
                        parent_id: task.parent_id,
                    });
                }
                Ok((task, Err(err)))
                    if self.policy == FailurePolicy::FailFast
                        && err.is_transport()
                        && fatal.is_none() =>
                {
                    error!(path = ?task.local_path, error = %err, "upload failed, aborting run");
                    fatal = Some(err);
                }
                Ok((task, Err(err))) => {
                    warn!(path = ?task.local_path, error = %err, "upload failed");
                    report.failed.push(FailedFile {
                        path: task.local_path,
                        error: err.into(),
                    });
                }
                Err(err) => {
                    error!(error = %err, "upload task did not complete");
                    panicked.get_or_insert(err);
                }
            }
        }

        if let Some(err) = fatal {
            return Err(err.into());
        }
        if let Some(err) = panicked {
            return Err(err.into());
        }
        Ok(())
    }
}

/// Regular files under `root`, in name-sorted walk order.
pub fn discover_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}
