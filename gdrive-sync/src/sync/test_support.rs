use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use gdrive_core::{DriveError, FOLDER_MIME_TYPE, ProgressFn};
use reqwest::StatusCode;
use tokio::io::AsyncReadExt;

use super::remote::{ListPage, ROOT_ID, RemoteObject, RemoteStore, UploadReader};

/// Real id behind the `root` alias in the in-memory store.
pub const MEMORY_ROOT: &str = "root-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(Option<String>),
    Create {
        name: String,
        parent_id: String,
        is_folder: bool,
    },
    Delete(String),
    Upload {
        name: String,
        parent_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Start(String),
    End(String),
}

#[derive(Default)]
struct MemoryState {
    objects: Vec<RemoteObject>,
    calls: Vec<Call>,
    events: Vec<UploadEvent>,
    next_id: usize,
    // Deleted ids stay in place so page boundaries do not shift mid-scan.
    deleted: HashSet<String>,
    fail_create: HashSet<String>,
    fail_delete: HashSet<String>,
    fail_upload: HashSet<String>,
    fail_list_page: Option<usize>,
    fail_root_lookup: bool,
}

/// In-memory stand-in for Drive with paging, call recording and failure injection.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    page_size: usize,
    upload_delay: Duration,
}

pub fn folder(id: &str, name: &str, parent: &str) -> RemoteObject {
    RemoteObject {
        id: id.into(),
        name: name.into(),
        parent_ids: vec![parent.into()],
        kind: "drive#file".into(),
        mime_type: FOLDER_MIME_TYPE.into(),
    }
}

pub fn file(id: &str, name: &str, parent: &str) -> RemoteObject {
    RemoteObject {
        mime_type: "text/plain".into(),
        ..folder(id, name, parent)
    }
}

fn rejected(message: &str) -> DriveError {
    DriveError::Api {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: message.to_string(),
    }
}

fn not_found(id: &str) -> DriveError {
    DriveError::Api {
        status: StatusCode::NOT_FOUND,
        body: format!("file not found: {id}"),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_objects(Vec::new())
    }

    pub fn with_objects(objects: Vec<RemoteObject>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                objects,
                ..MemoryState::default()
            }),
            page_size: 100,
            upload_delay: Duration::from_millis(5),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn fail_create(&self, name: &str) {
        self.state.lock().unwrap().fail_create.insert(name.into());
    }

    pub fn fail_delete(&self, id: &str) {
        self.state.lock().unwrap().fail_delete.insert(id.into());
    }

    pub fn fail_upload(&self, name: &str) {
        self.state.lock().unwrap().fail_upload.insert(name.into());
    }

    pub fn fail_list_page(&self, page: usize) {
        self.state.lock().unwrap().fail_list_page = Some(page);
    }

    pub fn fail_root_lookup(&self) {
        self.state.lock().unwrap().fail_root_lookup = true;
    }

    pub fn objects(&self) -> Vec<RemoteObject> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .iter()
            .filter(|obj| !state.deleted.contains(&obj.id))
            .cloned()
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn upload_events(&self) -> Vec<UploadEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn folder_creates(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create {
                    name,
                    parent_id,
                    is_folder: true,
                } => Some((name, parent_id)),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Upload { name, parent_id } => Some((name, parent_id)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn resolve_root(&self, root_id: &str) -> Result<String, DriveError> {
        if self.state.lock().unwrap().fail_root_lookup {
            return Err(rejected("root lookup failed"));
        }
        Ok(if root_id == ROOT_ID {
            MEMORY_ROOT.to_string()
        } else {
            root_id.to_string()
        })
    }

    async fn list_page(&self, page_token: Option<&str>) -> Result<ListPage, DriveError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List(page_token.map(str::to_string)));
        let page = page_token
            .and_then(|token| token.parse::<usize>().ok())
            .unwrap_or(0);
        if state.fail_list_page == Some(page) {
            return Err(rejected("listing failed"));
        }
        let start = page * self.page_size;
        let entries: Vec<_> = state
            .objects
            .iter()
            .skip(start)
            .take(self.page_size)
            .filter(|obj| !state.deleted.contains(&obj.id))
            .cloned()
            .collect();
        let next_page_token =
            (start + self.page_size < state.objects.len()).then(|| (page + 1).to_string());
        Ok(ListPage {
            entries,
            next_page_token,
        })
    }

    async fn create_object(
        &self,
        name: &str,
        parent_id: &str,
        is_folder: bool,
    ) -> Result<RemoteObject, DriveError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            name: name.into(),
            parent_id: parent_id.into(),
            is_folder,
        });
        if state.fail_create.contains(name) {
            return Err(rejected("create failed"));
        }
        state.next_id += 1;
        let id = format!("new-{}", state.next_id);
        let obj = if is_folder {
            folder(&id, name, parent_id)
        } else {
            file(&id, name, parent_id)
        };
        state.objects.push(obj.clone());
        Ok(obj)
    }

    async fn delete_object(&self, id: &str) -> Result<(), DriveError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(id.into()));
        if state.fail_delete.contains(id) {
            return Err(rejected("delete failed"));
        }
        let known = state.objects.iter().any(|obj| obj.id == id);
        if !known || state.deleted.contains(id) {
            return Err(not_found(id));
        }
        // Deleting a folder takes everything below it along.
        let mut gone = vec![id.to_string()];
        while let Some(parent) = gone.pop() {
            let children: Vec<String> = state
                .objects
                .iter()
                .filter(|obj| obj.parent_id() == Some(parent.as_str()))
                .map(|obj| obj.id.clone())
                .collect();
            state.deleted.insert(parent);
            gone.extend(children);
        }
        Ok(())
    }

    async fn upload_stream(
        &self,
        parent_id: &str,
        name: &str,
        mut reader: UploadReader,
        size: u64,
        progress: ProgressFn,
    ) -> Result<RemoteObject, DriveError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Upload {
                name: name.into(),
                parent_id: parent_id.into(),
            });
            state.events.push(UploadEvent::Start(name.into()));
        }

        let mut body = Vec::new();
        let read = reader.read_to_end(&mut body).await;
        tokio::time::sleep(self.upload_delay).await;

        let mut state = self.state.lock().unwrap();
        state.events.push(UploadEvent::End(name.into()));
        if read.is_err() || state.fail_upload.contains(name) {
            return Err(rejected("upload failed"));
        }
        progress(body.len() as u64, size);
        state.next_id += 1;
        let obj = file(&format!("new-{}", state.next_id), name, parent_id);
        state.objects.push(obj.clone());
        Ok(obj)
    }
}
