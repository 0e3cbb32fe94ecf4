use std::sync::Arc;

use tracing::debug;

use super::index::RemoteIndex;
use super::paths::DirectoryChain;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Deepest matched folder, or the remote root when nothing matched.
    pub parent_id: String,
    pub matched_depth: usize,
    pub chain_len: usize,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.matched_depth == self.chain_len
    }
}

#[derive(Clone)]
pub struct PathResolver {
    index: Arc<RemoteIndex>,
}

impl PathResolver {
    pub fn new(index: Arc<RemoteIndex>) -> Self {
        Self { index }
    }

    /// Walks the chain against one snapshot, starting at the remote root.
    /// Every segment matches only through a parent->child edge from the
    /// previous match, so same-named folders elsewhere are never followed.
    pub async fn resolve(&self, chain: &DirectoryChain) -> Resolution {
        let snapshot = self.index.read().await;
        let mut parent_id = snapshot.root_id().to_string();
        let mut matched_depth = 0;

        for (depth, segment) in chain.segments().iter().enumerate() {
            match snapshot.child_folder(&parent_id, segment) {
                Some(obj) => {
                    parent_id = obj.id.clone();
                    matched_depth = depth + 1;
                }
                None => break,
            }
        }

        debug!(
            chain = ?chain.segments(),
            matched_depth,
            parent_id = %parent_id,
            "resolved directory chain"
        );
        Resolution {
            parent_id,
            matched_depth,
            chain_len: chain.len(),
        }
    }
}
