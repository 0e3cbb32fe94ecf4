use std::sync::Arc;

use futures_util::TryStreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Body, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const FILE_FIELDS: &str = "id,name,parents,kind,mimeType";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,parents,kind,mimeType)";

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Called with `(bytes_sent, total_bytes)` while an upload body is streamed.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("resumable upload response has no session location")]
    MissingUploadSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    RateLimit,
    Transient,
    Permanent,
}

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: Url,
    token: String,
    page_size: u32,
}

impl DriveClient {
    pub fn new(token: impl Into<String>) -> Result<Self, DriveError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, DriveError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: token.into(),
            page_size: 100,
        })
    }

    /// Drive accepts page sizes between 1 and 1000.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 1000);
        self
    }

    pub async fn list_files(&self, page_token: Option<&str>) -> Result<FileList, DriveError> {
        let mut url = self.endpoint("/drive/v3/files")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("fields", LIST_FIELDS);
            query.append_pair("pageSize", &self.page_size.to_string());
            if let Some(token) = page_token.filter(|t| !t.is_empty()) {
                query.append_pair("pageToken", token);
            }
        }
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Fetches one file by id. Drive also accepts the `root` alias here and
    /// answers with the real id of the user's top-level folder.
    pub async fn get_file(&self, file_id: &str) -> Result<DriveFile, DriveError> {
        let mut url = self.endpoint(&format!("/drive/v3/files/{file_id}"))?;
        url.query_pairs_mut().append_pair("fields", FILE_FIELDS);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn create_file(&self, metadata: &FileMetadata) -> Result<DriveFile, DriveError> {
        let mut url = self.endpoint("/drive/v3/files")?;
        url.query_pairs_mut().append_pair("fields", FILE_FIELDS);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(metadata)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<DriveFile, DriveError> {
        self.create_file(&FileMetadata::folder(name, parent_id)).await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), DriveError> {
        let url = self.endpoint(&format!("/drive/v3/files/{file_id}"))?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::api_error(response).await)
    }

    /// Opens a resumable upload session and streams `reader` into it.
    pub async fn upload_resumable<R>(
        &self,
        metadata: &FileMetadata,
        reader: R,
        size: u64,
        progress: Option<ProgressFn>,
    ) -> Result<DriveFile, DriveError>
    where
        R: AsyncRead + Send + 'static,
    {
        let session = self.start_upload_session(metadata, size).await?;

        let mut sent = 0u64;
        let stream = ReaderStream::new(reader).inspect_ok(move |chunk| {
            sent += chunk.len() as u64;
            if let Some(progress) = progress.as_ref() {
                progress(sent, size);
            }
        });
        let response = self
            .http
            .put(session)
            .header(CONTENT_LENGTH, size)
            .body(Body::wrap_stream(stream))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn start_upload_session(
        &self,
        metadata: &FileMetadata,
        size: u64,
    ) -> Result<Url, DriveError> {
        let mut url = self.endpoint("/upload/drive/v3/files")?;
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("fields", FILE_FIELDS);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header("X-Upload-Content-Length", size)
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .json(metadata)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(DriveError::MissingUploadSession)?;
        Ok(Url::parse(location)?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, DriveError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DriveError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> DriveError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        DriveError::Api { status, body }
    }
}

impl DriveError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            DriveError::Api { status, .. } => Some(classify_api_status(*status)),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DriveError::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub mime_type: String,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl FileMetadata {
    pub fn file(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            parents: vec![parent_id.into()],
        }
    }

    pub fn folder(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            ..Self::file(name, parent_id)
        }
    }
}
