//! The remote persistence boundary.
//!
//! The remote store understands exactly two shapes: a page metadata record and
//! a flat, ordered list of link records. [`PageStore`] is the operation set the
//! reconciliation engine dispatches against — transport and encoding live
//! behind it and are out of scope here.
//!
//! [`MemoryStore`] is the in-process implementation used by the CLI's file
//! store and by tests. It records every call it receives so tests can assert
//! the exact remote traffic a save produced, and can be told to fail the next
//! occurrence of an operation to exercise partial-failure paths.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use linkloom_types::{BlockId, PageId};

/// Failure from the remote store. All variants are retryable from the
/// editor's point of view: local state is never rolled back on any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("remote rejected the request: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// One persisted link record, as the remote store sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: BlockId,
    pub title: String,
    pub url: String,
    /// Hidden blocks stay persisted; `active` mirrors local visibility.
    pub active: bool,
}

/// Page-level metadata record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub display_name: String,
    pub bio: String,
    pub theme: String,
}

/// Everything the store knows about one page: seed data for the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageTree {
    pub page_id: PageId,
    pub metadata: PageMetadata,
    /// Link records in persisted order.
    pub links: Vec<LinkRecord>,
}

/// Request to create a link record for a block the store has never seen.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateLink {
    pub page_id: PageId,
    pub title: String,
    pub url: String,
    /// Record kind discriminator on the remote side. Currently always `link`.
    pub kind: String,
}

/// Request to update an existing link record.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateLink {
    pub id: BlockId,
    pub title: String,
    pub url: String,
    pub active: bool,
}

/// The operation set the reconciliation engine is specified against.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Seed data for the editor: metadata plus ordered link records.
    async fn load_page_tree(&self, page_id: &PageId) -> Result<PageTree, StoreError>;

    /// Create a link record; returns the permanent id the store assigned.
    async fn create_link_record(&self, req: CreateLink) -> Result<BlockId, StoreError>;

    /// Persist attribute/visibility changes for a permanent-id record.
    async fn update_link_record(&self, req: UpdateLink) -> Result<(), StoreError>;

    /// Remove a link record.
    async fn delete_link_record(&self, id: &BlockId) -> Result<(), StoreError>;

    /// Persist the final ordering. Every id must be permanent.
    async fn set_link_order(&self, page_id: &PageId, ids: Vec<BlockId>) -> Result<(), StoreError>;

    /// Persist non-block page attributes.
    async fn update_page_metadata(
        &self,
        page_id: &PageId,
        metadata: PageMetadata,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// One observed store call, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Load(PageId),
    Create { title: String, url: String },
    Update(UpdateLink),
    Delete(BlockId),
    SetOrder(Vec<BlockId>),
    Metadata(PageMetadata),
}

/// Which operation the next injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Create,
    Update,
    Delete,
    SetOrder,
    Metadata,
}

#[derive(Debug, Default)]
struct MemoryStoreState {
    metadata: PageMetadata,
    links: Vec<LinkRecord>,
    next_seq: u64,
    calls: Vec<StoreCall>,
    fail_next: VecDeque<StoreOp>,
}

/// In-process [`PageStore`] with call recording and failure injection.
#[derive(Debug)]
pub struct MemoryStore {
    page_id: PageId,
    state: Mutex<MemoryStoreState>,
}

impl MemoryStore {
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            state: Mutex::new(MemoryStoreState::default()),
        }
    }

    /// Seed the store with existing records (ids become permanent as given).
    pub fn seed(page_id: PageId, metadata: PageMetadata, links: Vec<LinkRecord>) -> Self {
        let store = Self::new(page_id);
        {
            let mut state = store.state.lock();
            state.metadata = metadata;
            state.links = links;
        }
        store
    }

    /// Queue a one-shot failure for the next call of the given operation.
    pub fn fail_next(&self, op: StoreOp) {
        self.state.lock().fail_next.push_back(op);
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().calls.clone()
    }

    /// Drop the recorded call log (keeps records).
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Current link records in persisted order.
    pub fn links(&self) -> Vec<LinkRecord> {
        self.state.lock().links.clone()
    }

    /// Current page metadata.
    pub fn metadata(&self) -> PageMetadata {
        self.state.lock().metadata.clone()
    }

    fn take_failure(state: &mut MemoryStoreState, op: StoreOp) -> Result<(), StoreError> {
        if state.fail_next.front() == Some(&op) {
            state.fail_next.pop_front();
            return Err(StoreError::Transport(format!("injected failure for {op:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn load_page_tree(&self, page_id: &PageId) -> Result<PageTree, StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Load(page_id.clone()));
        if page_id != &self.page_id {
            return Err(StoreError::NotFound(page_id.to_string()));
        }
        Ok(PageTree {
            page_id: self.page_id.clone(),
            metadata: state.metadata.clone(),
            links: state.links.clone(),
        })
    }

    async fn create_link_record(&self, req: CreateLink) -> Result<BlockId, StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Create {
            title: req.title.clone(),
            url: req.url.clone(),
        });
        Self::take_failure(&mut state, StoreOp::Create)?;
        if req.page_id != self.page_id {
            return Err(StoreError::NotFound(req.page_id.to_string()));
        }

        state.next_seq += 1;
        let id = BlockId::permanent(format!("lnk_{:04}", state.next_seq));
        state.links.push(LinkRecord {
            id: id.clone(),
            title: req.title,
            url: req.url,
            active: true,
        });
        debug!(%id, "memory store created link record");
        Ok(id)
    }

    async fn update_link_record(&self, req: UpdateLink) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Update(req.clone()));
        Self::take_failure(&mut state, StoreOp::Update)?;

        let record = state
            .links
            .iter_mut()
            .find(|r| r.id == req.id)
            .ok_or_else(|| StoreError::NotFound(req.id.to_string()))?;
        record.title = req.title;
        record.url = req.url;
        record.active = req.active;
        Ok(())
    }

    async fn delete_link_record(&self, id: &BlockId) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Delete(id.clone()));
        Self::take_failure(&mut state, StoreOp::Delete)?;

        let before = state.links.len();
        state.links.retain(|r| &r.id != id);
        if state.links.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_link_order(&self, page_id: &PageId, ids: Vec<BlockId>) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::SetOrder(ids.clone()));
        Self::take_failure(&mut state, StoreOp::SetOrder)?;
        if page_id != &self.page_id {
            return Err(StoreError::NotFound(page_id.to_string()));
        }

        // Reorder known records to match; unknown ids are a remote-side error.
        let mut reordered = Vec::with_capacity(state.links.len());
        for id in &ids {
            let pos = state
                .links
                .iter()
                .position(|r| &r.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            reordered.push(state.links.remove(pos));
        }
        // Records omitted from the ordering keep their relative order at the tail.
        reordered.append(&mut state.links);
        state.links = reordered;
        Ok(())
    }

    async fn update_page_metadata(
        &self,
        page_id: &PageId,
        metadata: PageMetadata,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.calls.push(StoreCall::Metadata(metadata.clone()));
        Self::take_failure(&mut state, StoreOp::Metadata)?;
        if page_id != &self.page_id {
            return Err(StoreError::NotFound(page_id.to_string()));
        }
        state.metadata = metadata;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_id() -> PageId {
        PageId::new("page_1")
    }

    #[tokio::test]
    async fn create_assigns_permanent_ids_in_order() {
        let store = MemoryStore::new(page_id());
        let a = store
            .create_link_record(CreateLink {
                page_id: page_id(),
                title: "A".into(),
                url: "https://a.example".into(),
                kind: "link".into(),
            })
            .await
            .expect("create");
        assert!(a.is_permanent());
        assert_eq!(store.links().len(), 1);
    }

    #[tokio::test]
    async fn injected_failure_applies_once() {
        let store = MemoryStore::new(page_id());
        store.fail_next(StoreOp::Metadata);

        let err = store
            .update_page_metadata(&page_id(), PageMetadata::default())
            .await
            .expect_err("first call fails");
        assert!(matches!(err, StoreError::Transport(_)));

        store
            .update_page_metadata(&page_id(), PageMetadata::default())
            .await
            .expect("second call succeeds");
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn set_order_rearranges_records() {
        let store = MemoryStore::seed(
            page_id(),
            PageMetadata::default(),
            vec![
                LinkRecord {
                    id: BlockId::permanent("lnk_a"),
                    title: "A".into(),
                    url: String::new(),
                    active: true,
                },
                LinkRecord {
                    id: BlockId::permanent("lnk_b"),
                    title: "B".into(),
                    url: String::new(),
                    active: true,
                },
            ],
        );

        store
            .set_link_order(
                &page_id(),
                vec![BlockId::permanent("lnk_b"), BlockId::permanent("lnk_a")],
            )
            .await
            .expect("set order");

        let titles: Vec<_> = store.links().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }
}
