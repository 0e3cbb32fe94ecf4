use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gdrive_core::{DriveError, ProgressFn};
use thiserror::Error;
use tracing::debug;

use super::remote::{RemoteObject, RemoteStore};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("upload of {path:?} failed: {source}")]
    Remote {
        path: PathBuf,
        #[source]
        source: DriveError,
    },
}

impl UploadError {
    /// Remote faults end the run under the fail-fast policy; local ones never do.
    pub fn is_transport(&self) -> bool {
        matches!(self, UploadError::Remote { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub local_path: PathBuf,
    pub name: String,
    pub parent_id: String,
}

pub async fn upload_file(
    store: &dyn RemoteStore,
    task: &UploadTask,
) -> Result<RemoteObject, UploadError> {
    let io_err = |source| UploadError::Io {
        path: task.local_path.clone(),
        source,
    };
    let file = tokio::fs::File::open(&task.local_path)
        .await
        .map_err(io_err)?;
    let size = file.metadata().await.map_err(io_err)?.len();
    debug!(path = ?task.local_path, size, parent_id = %task.parent_id, "uploading file");

    store
        .upload_stream(
            &task.parent_id,
            &task.name,
            Box::new(file),
            size,
            progress_logger(&task.local_path),
        )
        .await
        .map_err(|source| UploadError::Remote {
            path: task.local_path.clone(),
            source,
        })
}

fn progress_logger(path: &Path) -> ProgressFn {
    let path = path.to_path_buf();
    Arc::new(move |sent, total| {
        debug!(path = ?path, sent, total, percent = percent(sent, total), "upload progress");
    })
}

fn percent(sent: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    sent.saturating_mul(100) / total
}
