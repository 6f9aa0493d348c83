//! Content lookup trait and the in-memory implementation

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::content::ContentNode;
use crate::error::Result;

/// Read access to the host content tree
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Look up a node by key
    async fn get(&self, key: &Uuid) -> Result<Option<ContentNode>>;

    /// One path-ordered page of descendants of `key`.
    ///
    /// `after_path` resumes enumeration strictly after the given path; callers
    /// re-query until a partial page comes back so large subtrees never need
    /// unbounded memory.
    async fn descendants(
        &self,
        key: &Uuid,
        after_path: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<ContentNode>>;

    /// All root nodes, path-ordered (used by full rebuilds)
    async fn roots(&self) -> Result<Vec<ContentNode>>;
}

/// In-memory content tree for tests and small hosts
#[derive(Clone, Default)]
pub struct InMemoryContentStore {
    nodes: Arc<DashMap<Uuid, ContentNode>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, node: ContentNode) {
        self.nodes.insert(node.key, node);
    }

    pub fn remove(&self, key: &Uuid) {
        self.nodes.remove(key);
    }

    /// Mutate a stored node in place (test helper for publish-state changes)
    pub fn update<F: FnOnce(&mut ContentNode)>(&self, key: &Uuid, mutate: F) {
        if let Some(mut entry) = self.nodes.get_mut(key) {
            mutate(entry.value_mut());
        }
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get(&self, key: &Uuid) -> Result<Option<ContentNode>> {
        Ok(self.nodes.get(key).map(|entry| entry.value().clone()))
    }

    async fn descendants(
        &self,
        key: &Uuid,
        after_path: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<ContentNode>> {
        let prefix = match self.nodes.get(key) {
            Some(node) => format!("{}/", node.path),
            None => return Ok(Vec::new()),
        };

        let mut page: Vec<ContentNode> = self
            .nodes
            .iter()
            .filter(|entry| entry.path.starts_with(&prefix))
            .filter(|entry| match after_path {
                Some(after) => entry.path.as_str() > after,
                None => true,
            })
            .map(|entry| entry.value().clone())
            .collect();

        page.sort_by(|a, b| a.path.cmp(&b.path));
        page.truncate(page_size);
        Ok(page)
    }

    async fn roots(&self) -> Result<Vec<ContentNode>> {
        let mut roots: Vec<ContentNode> = self
            .nodes
            .iter()
            .filter(|entry| entry.parent.is_none())
            .map(|entry| entry.value().clone())
            .collect();
        roots.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::node::ContentNodeBuilder;

    fn tree() -> (InMemoryContentStore, ContentNode, Vec<ContentNode>) {
        let store = InMemoryContentStore::new();
        let root = ContentNodeBuilder::new(Uuid::new_v4(), "root").build();
        store.insert(root.clone());

        let mut children = Vec::new();
        for i in 0..5 {
            let child = ContentNodeBuilder::new(Uuid::new_v4(), format!("child-{}", i))
                .under(&root)
                .build();
            store.insert(child.clone());
            children.push(child);
        }
        (store, root, children)
    }

    #[tokio::test]
    async fn test_descendants_are_paged_in_path_order() {
        let (store, root, _) = tree();

        let first = store.descendants(&root.key, None, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(first[0].path < first[1].path);

        let second = store
            .descendants(&root.key, Some(&first[1].path), 2)
            .await
            .unwrap();
        assert_eq!(second.len(), 2);
        assert!(second[0].path > first[1].path);

        let last = store
            .descendants(&root.key, Some(&second[1].path), 2)
            .await
            .unwrap();
        // Partial page terminates the enumeration
        assert_eq!(last.len(), 1);
    }

    #[tokio::test]
    async fn test_descendants_of_unknown_key_is_empty() {
        let (store, _, _) = tree();
        let page = store.descendants(&Uuid::new_v4(), None, 10).await.unwrap();
        assert!(page.is_empty());
    }
}
