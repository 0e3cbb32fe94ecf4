use std::sync::Arc;

use gdrive_core::DriveError;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::engine::SyncError;
use super::index::IndexError;
use super::remote::{RemoteObject, RemoteStore};
use super::report::{DeleteReport, DeletedObject, FailurePolicy};

#[derive(Debug, Error)]
#[error("failed to delete {name:?} ({id}): {source}")]
pub struct DeleteError {
    pub id: String,
    pub name: String,
    #[source]
    pub source: DriveError,
}

pub struct BulkDeleter {
    store: Arc<dyn RemoteStore>,
    policy: FailurePolicy,
}

impl BulkDeleter {
    pub fn new(store: Arc<dyn RemoteStore>, policy: FailurePolicy) -> Self {
        Self { store, policy }
    }

    /// Deletes every object whose name starts with `prefix`, scanning the
    /// listing page by page. Matches on a page go out `batch_size` at a time.
    pub async fn delete_by_prefix(
        &self,
        prefix: &str,
        batch_size: usize,
    ) -> Result<DeleteReport, SyncError> {
        let batch_size = batch_size.max(1);
        let mut report = DeleteReport::default();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .store
                .list_page(page_token.as_deref())
                .await
                .map_err(|source| IndexError::RemoteList {
                    page: report.pages,
                    source,
                })?;
            report.pages += 1;
            report.scanned += page.entries.len();
            if page.entries.is_empty() {
                info!(page = report.pages, "no files found");
            }

            let matches: Vec<RemoteObject> = page
                .entries
                .into_iter()
                .filter(|obj| {
                    debug!(name = %obj.name, id = %obj.id, "scanned");
                    obj.name.starts_with(prefix)
                })
                .collect();
            for batch in matches.chunks(batch_size) {
                if let Err(err) = self.delete_batch(batch, &mut report).await {
                    error!(
                        prefix,
                        scanned = report.scanned,
                        deleted = report.deleted.len(),
                        failed = report.failed.len(),
                        "prefix delete aborted"
                    );
                    return Err(err);
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(
            prefix,
            scanned = report.scanned,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "prefix delete finished"
        );
        Ok(report)
    }

    async fn delete_batch(
        &self,
        batch: &[RemoteObject],
        report: &mut DeleteReport,
    ) -> Result<(), SyncError> {
        let mut set = JoinSet::new();
        for obj in batch {
            let store = Arc::clone(&self.store);
            let obj = obj.clone();
            set.spawn(async move {
                info!(name = %obj.name, id = %obj.id, "deleting");
                let result = store.delete_object(&obj.id).await;
                (obj, result)
            });
        }

        let mut fatal = None;
        let mut panicked = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((obj, Ok(()))) => report.deleted.push(DeletedObject {
                    id: obj.id,
                    name: obj.name,
                }),
                // A folder deleted earlier in the run takes its matches along.
                Ok((obj, Err(source))) if source.is_not_found() => {
                    debug!(name = %obj.name, id = %obj.id, "already gone");
                    report.deleted.push(DeletedObject {
                        id: obj.id,
                        name: obj.name,
                    });
                }
                Ok((obj, Err(source))) => {
                    let err = DeleteError {
                        id: obj.id,
                        name: obj.name,
                        source,
                    };
                    if self.policy == FailurePolicy::FailFast && fatal.is_none() {
                        error!(error = %err, "delete failed, aborting run");
                        fatal = Some(err);
                    } else {
                        warn!(error = %err, "delete failed");
                        report.failed.push(err);
                    }
                }
                Err(err) => {
                    error!(error = %err, "delete task did not complete");
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
