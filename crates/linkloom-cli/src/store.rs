//! File-backed page store for the CLI.
//!
//! The CLI has no network; [`JsonStore`] plays the remote store's role against
//! a JSON file holding one [`PageTree`]. Operations run against an in-memory
//! store loaded at open; nothing touches the file until [`JsonStore::persist`],
//! which the CLI calls after a clean publish.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use linkloom_editor::store::{
    CreateLink, MemoryStore, PageMetadata, PageStore, PageTree, StoreError, UpdateLink,
};
use linkloom_types::{BlockId, PageId};

/// A [`PageStore`] persisted as one pretty-printed JSON file.
pub struct JsonStore {
    path: PathBuf,
    page_id: PageId,
    inner: MemoryStore,
}

impl JsonStore {
    /// Create a fresh page file. Fails if the file already exists.
    pub fn create(path: &Path, page_id: PageId, display_name: &str) -> Result<Self> {
        anyhow::ensure!(
            !path.exists(),
            "page file already exists: {}",
            path.display()
        );
        let store = Self {
            path: path.to_path_buf(),
            page_id: page_id.clone(),
            inner: MemoryStore::seed(
                page_id,
                PageMetadata {
                    display_name: display_name.to_string(),
                    bio: String::new(),
                    theme: "classic".to_string(),
                },
                Vec::new(),
            ),
        };
        store.persist()?;
        Ok(store)
    }

    /// Open an existing page file.
    pub fn open(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading page file {}", path.display()))?;
        let tree: PageTree = serde_json::from_str(&raw)
            .with_context(|| format!("parsing page file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            page_id: tree.page_id.clone(),
            inner: MemoryStore::seed(tree.page_id, tree.metadata, tree.links),
        })
    }

    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    /// Write the current records back to the page file.
    pub fn persist(&self) -> Result<()> {
        let tree = PageTree {
            page_id: self.page_id.clone(),
            metadata: self.inner.metadata(),
            links: self.inner.links(),
        };
        let raw = serde_json::to_string_pretty(&tree).context("encoding page tree")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing page file {}", self.path.display()))
    }
}

#[async_trait]
impl PageStore for JsonStore {
    async fn load_page_tree(&self, page_id: &PageId) -> Result<PageTree, StoreError> {
        self.inner.load_page_tree(page_id).await
    }

    async fn create_link_record(&self, req: CreateLink) -> Result<BlockId, StoreError> {
        self.inner.create_link_record(req).await
    }

    async fn update_link_record(&self, req: UpdateLink) -> Result<(), StoreError> {
        self.inner.update_link_record(req).await
    }

    async fn delete_link_record(&self, id: &BlockId) -> Result<(), StoreError> {
        self.inner.delete_link_record(id).await
    }

    async fn set_link_order(&self, page_id: &PageId, ids: Vec<BlockId>) -> Result<(), StoreError> {
        self.inner.set_link_order(page_id, ids).await
    }

    async fn update_page_metadata(
        &self,
        page_id: &PageId,
        metadata: PageMetadata,
    ) -> Result<(), StoreError> {
        self.inner.update_page_metadata(page_id, metadata).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkloom_editor::store::LinkRecord;

    #[tokio::test]
    async fn create_persist_open_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.json");

        let store = JsonStore::create(&path, PageId::new("page_1"), "Ada").expect("create");
        store
            .create_link_record(CreateLink {
                page_id: PageId::new("page_1"),
                title: "Blog".into(),
                url: "https://blog.example".into(),
                kind: "link".into(),
            })
            .await
            .expect("create record");
        store.persist().expect("persist");

        let reopened = JsonStore::open(&path).expect("open");
        let tree = reopened
            .load_page_tree(&PageId::new("page_1"))
            .await
            .expect("load");
        assert_eq!(tree.metadata.display_name, "Ada");
        assert_eq!(
            tree.links,
            vec![LinkRecord {
                id: tree.links[0].id.clone(),
                title: "Blog".into(),
                url: "https://blog.example".into(),
                active: true,
            }]
        );
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.json");
        JsonStore::create(&path, PageId::new("page_1"), "Ada").expect("create");
        assert!(JsonStore::create(&path, PageId::new("page_2"), "Bob").is_err());
    }
}
