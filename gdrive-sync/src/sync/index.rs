use std::collections::HashMap;
use std::sync::Arc;

use gdrive_core::DriveError;
use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

use super::remote::{RemoteObject, RemoteStore};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("remote listing failed on page {page}: {source}")]
    RemoteList {
        page: usize,
        #[source]
        source: DriveError,
    },
    #[error("cannot resolve remote root {root:?}: {source}")]
    RootLookup {
        root: String,
        #[source]
        source: DriveError,
    },
}

/// One consistent view of the remote hierarchy.
#[derive(Debug, Clone)]
pub struct Snapshot {
    root_id: String,
    by_name: HashMap<String, RemoteObject>,
    children_of: HashMap<String, Vec<RemoteObject>>,
}

impl Snapshot {
    fn rooted(root_id: impl Into<String>) -> Self {
        Self {
            root_id: root_id.into(),
            by_name: HashMap::new(),
            children_of: HashMap::new(),
        }
    }

    /// Listing entries carry unique ids, so refresh only appends.
    fn append(&mut self, obj: RemoteObject) {
        if let Some(parent) = obj.parent_id() {
            self.children_of
                .entry(parent.to_string())
                .or_default()
                .push(obj.clone());
        }
        // Names are not unique remotely; the last one listed wins.
        self.by_name.insert(obj.name.clone(), obj);
    }

    fn upsert(&mut self, obj: RemoteObject) {
        let existing = match obj.parent_id() {
            Some(parent) => self
                .children_of
                .get_mut(parent)
                .and_then(|children| children.iter_mut().find(|child| child.id == obj.id)),
            None => None,
        };
        match existing {
            Some(slot) => {
                *slot = obj.clone();
                self.by_name.insert(obj.name.clone(), obj);
            }
            None => self.append(obj),
        }
    }

    /// Id that top-level objects list as their parent.
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&RemoteObject> {
        self.by_name.get(name)
    }

    pub fn children_of(&self, parent_id: &str) -> &[RemoteObject] {
        self.children_of
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Folder named `name` directly under `parent_id`, in listing order.
    pub fn child_folder(&self, parent_id: &str, name: &str) -> Option<&RemoteObject> {
        self.children_of(parent_id)
            .iter()
            .find(|child| child.is_folder() && child.name == name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub pages: usize,
    pub objects: usize,
    pub folders: usize,
}

pub struct RemoteIndex {
    store: Arc<dyn RemoteStore>,
    root_alias: String,
    snapshot: RwLock<Snapshot>,
}

impl RemoteIndex {
    pub fn new(store: Arc<dyn RemoteStore>, root_alias: impl Into<String>) -> Self {
        let root_alias = root_alias.into();
        Self {
            store,
            snapshot: RwLock::new(Snapshot::rooted(root_alias.clone())),
            root_alias,
        }
    }

    /// Re-lists the whole store and swaps the result in. On failure the
    /// previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<RefreshStats, IndexError> {
        let root_id = self
            .store
            .resolve_root(&self.root_alias)
            .await
            .map_err(|source| IndexError::RootLookup {
                root: self.root_alias.clone(),
                source,
            })?;
        debug!(alias = %self.root_alias, root_id = %root_id, "resolved remote root");
        let mut next = Snapshot::rooted(root_id);
        let mut stats = RefreshStats::default();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .store
                .list_page(page_token.as_deref())
                .await
                .map_err(|source| IndexError::RemoteList {
                    page: stats.pages,
                    source,
                })?;
            stats.pages += 1;
            debug!(
                page = stats.pages,
                entries = page.entries.len(),
                "listed remote page"
            );
            for obj in page.entries {
                stats.objects += 1;
                if obj.is_folder() {
                    stats.folders += 1;
                }
                next.append(obj);
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if stats.objects == 0 {
            info!("no files found on remote");
        }
        *self.snapshot.write().await = next;
        info!(
            pages = stats.pages,
            objects = stats.objects,
            folders = stats.folders,
            "remote index refreshed"
        );
        Ok(stats)
    }

    /// Holds the read lock so a caller can walk several lookups against one view.
    pub async fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().await
    }

    pub async fn lookup_by_name(&self, name: &str) -> Option<RemoteObject> {
        self.snapshot.read().await.lookup_by_name(name).cloned()
    }

    pub async fn children_of(&self, parent_id: &str) -> Vec<RemoteObject> {
        self.snapshot.read().await.children_of(parent_id).to_vec()
    }

    pub async fn insert(&self, obj: RemoteObject) {
        self.snapshot.write().await.upsert(obj);
    }

    pub async fn root_id(&self) -> String {
        self.snapshot.read().await.root_id().to_string()
    }

    pub async fn len(&self) -> usize {
        self.snapshot.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshot.read().await.is_empty()
    }
}
