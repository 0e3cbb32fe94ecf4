use async_trait::async_trait;
use gdrive_core::{
    DriveClient, DriveError, DriveFile, FOLDER_MIME_TYPE, FileList, FileMetadata, ProgressFn,
};
use tokio::io::AsyncRead;

/// Drive alias for the signed-in user's top-level folder.
pub const ROOT_ID: &str = "root";

pub type UploadReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
    pub parent_ids: Vec<String>,
    pub kind: String,
    pub mime_type: String,
}

impl RemoteObject {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Only the first parent is meaningful for the index.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_ids.first().map(String::as_str)
    }
}

impl From<DriveFile> for RemoteObject {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            parent_ids: file.parents,
            kind: file.kind,
            mime_type: file.mime_type,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<RemoteObject>,
    pub next_page_token: Option<String>,
}

impl From<FileList> for ListPage {
    fn from(list: FileList) -> Self {
        Self {
            entries: list.files.into_iter().map(RemoteObject::from).collect(),
            next_page_token: list.next_page_token.filter(|token| !token.is_empty()),
        }
    }
}

/// The slice of the storage service the sync components depend on.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Maps a root alias such as `root` to the id listings report as parent.
    async fn resolve_root(&self, root_id: &str) -> Result<String, DriveError>;

    async fn list_page(&self, page_token: Option<&str>) -> Result<ListPage, DriveError>;

    async fn create_object(
        &self,
        name: &str,
        parent_id: &str,
        is_folder: bool,
    ) -> Result<RemoteObject, DriveError>;

    async fn delete_object(&self, id: &str) -> Result<(), DriveError>;

    async fn upload_stream(
        &self,
        parent_id: &str,
        name: &str,
        reader: UploadReader,
        size: u64,
        progress: ProgressFn,
    ) -> Result<RemoteObject, DriveError>;
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn resolve_root(&self, root_id: &str) -> Result<String, DriveError> {
        Ok(self.get_file(root_id).await?.id)
    }

    async fn list_page(&self, page_token: Option<&str>) -> Result<ListPage, DriveError> {
        Ok(self.list_files(page_token).await?.into())
    }

    async fn create_object(
        &self,
        name: &str,
        parent_id: &str,
        is_folder: bool,
    ) -> Result<RemoteObject, DriveError> {
        let metadata = if is_folder {
            FileMetadata::folder(name, parent_id)
        } else {
            FileMetadata::file(name, parent_id)
        };
        Ok(self.create_file(&metadata).await?.into())
    }

    async fn delete_object(&self, id: &str) -> Result<(), DriveError> {
        self.delete_file(id).await
    }

    async fn upload_stream(
        &self,
        parent_id: &str,
        name: &str,
        reader: UploadReader,
        size: u64,
        progress: ProgressFn,
    ) -> Result<RemoteObject, DriveError> {
        let metadata = FileMetadata::file(name, parent_id);
        let file = self
            .upload_resumable(&metadata, reader, size, Some(progress))
            .await?;
        Ok(file.into())
    }
}
