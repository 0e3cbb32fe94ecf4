use std::path::PathBuf;

use thiserror::Error;

use super::deleter::DeleteError;
use super::materialize::MaterializeError;
use super::paths::PathError;
use super::transfer::UploadError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run on the first remote fault.
    #[default]
    FailFast,
    /// Record every failure and keep going.
    Continue,
}

impl FailurePolicy {
    pub fn from_continue_flag(continue_on_error: bool) -> Self {
        if continue_on_error {
            FailurePolicy::Continue
        } else {
            FailurePolicy::FailFast
        }
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Materialize(#[from] MaterializeError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: PathBuf,
    pub id: String,
    pub parent_id: String,
}

#[derive(Debug)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: FileError,
}

#[derive(Debug, Default)]
pub struct UploadReport {
    pub discovered: usize,
    pub batches: usize,
    pub folders_created: usize,
    pub uploaded: Vec<UploadedFile>,
    pub failed: Vec<FailedFile>,
}

impl UploadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedObject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct DeleteReport {
    pub pages: usize,
    pub scanned: usize,
    pub deleted: Vec<DeletedObject>,
    pub failed: Vec<DeleteError>,
}

impl DeleteReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
