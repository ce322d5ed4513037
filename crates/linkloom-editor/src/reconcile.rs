//! Reconciliation between the local block sequence and the remote store.
//!
//! The remote store only understands a page metadata record plus a flat,
//! ordered list of link records, so a save is a diff-and-dispatch pass over
//! the current snapshot. One invocation runs five passes, strictly in order:
//!
//! ```text
//! deletions ─▶ metadata ─▶ per-block (create/update) ─▶ reorder ─▶ fold-back
//! ```
//!
//! - Deletions check for resurrection first: an id the user restored via undo
//!   is dropped from the pending set without any network call.
//! - Per-block operations are independent and issued concurrently; one failure
//!   never prevents the others from being attempted.
//! - The reorder pass runs only when every create resolved — ordering with
//!   still-ephemeral ids is meaningless to the store.
//! - Fold-back (writing resolved permanent ids into local state) is the
//!   session's job; this module returns the id map it needs.
//!
//! Failures are collected per step, never thrown across the invocation, and
//! never roll back local state: the user's document stays exactly as edited
//! and the next save retries.

use std::collections::{HashMap, HashSet};
use std::fmt;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use linkloom_types::{BlockData, BlockId, PageConfig, PageId};

use crate::store::{CreateLink, PageMetadata, PageStore, StoreError, UpdateLink};

/// Why a save ran. The algorithm is identical; only user-facing feedback
/// differs (autosave logs where publish notifies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Publish,
    Autosave,
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveMode::Publish => f.write_str("publish"),
            SaveMode::Autosave => f.write_str("autosave"),
        }
    }
}

/// Which pass a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStep {
    Delete,
    Metadata,
    Create,
    Update,
    Reorder,
}

/// One failed step within a save. The invocation as a whole still completes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step:?} step failed: {source}")]
pub struct SaveFailure {
    pub step: SaveStep,
    /// The block the failure applies to, when the step is per-block.
    pub block: Option<BlockId>,
    pub source: StoreError,
}

/// Outcome summary for one save invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub mode: SaveMode,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Whether the reorder call was issued and succeeded.
    pub reordered: bool,
    pub failures: Vec<SaveFailure>,
}

impl SaveReport {
    fn new(mode: SaveMode) -> Self {
        Self {
            mode,
            created: 0,
            updated: 0,
            deleted: 0,
            reordered: false,
            failures: Vec::new(),
        }
    }

    /// True when every issued operation succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn create_failed(&self) -> bool {
        self.failures.iter().any(|f| f.step == SaveStep::Create)
    }
}

/// Everything the session needs to fold a save's results back into state.
#[derive(Debug)]
pub struct SaveOutput {
    pub report: SaveReport,
    /// Ephemeral id → store-assigned permanent id, for every successful create.
    pub resolved: HashMap<BlockId, BlockId>,
    /// Pending-deletion ids whose remote delete succeeded.
    pub deleted: HashSet<BlockId>,
    /// Pending-deletion ids present in the snapshot again (undo restored
    /// them); dropped without a delete call.
    pub resurrected: HashSet<BlockId>,
}

enum BlockOutcome {
    Created { from: BlockId, to: BlockId },
    Updated,
    Failed(SaveFailure),
}

/// Stateless dispatcher for one save invocation: reads a consistent snapshot,
/// issues the remote operations, reports what happened.
pub struct Reconciler<'a> {
    store: &'a dyn PageStore,
    page_id: &'a PageId,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn PageStore, page_id: &'a PageId) -> Self {
        Self { store, page_id }
    }

    /// Run one full reconciliation pass against `snapshot`.
    ///
    /// `pending_deletions` is read-only here; the caller applies `deleted` and
    /// `resurrected` from the output under its own state lock.
    pub async fn save(
        &self,
        snapshot: &PageConfig,
        pending_deletions: &HashSet<BlockId>,
        mode: SaveMode,
    ) -> SaveOutput {
        let mut out = SaveOutput {
            report: SaveReport::new(mode),
            resolved: HashMap::new(),
            deleted: HashSet::new(),
            resurrected: HashSet::new(),
        };

        info!(
            %mode,
            blocks = snapshot.blocks.len(),
            links = snapshot.link_blocks().count(),
            pending = pending_deletions.len(),
            "reconciliation started"
        );

        self.deletion_pass(snapshot, pending_deletions, &mut out).await;
        self.metadata_pass(snapshot, &mut out).await;
        self.block_pass(snapshot, &mut out).await;
        self.reorder_pass(snapshot, &mut out).await;

        info!(
            %mode,
            created = out.report.created,
            updated = out.report.updated,
            deleted = out.report.deleted,
            reordered = out.report.reordered,
            failures = out.report.failures.len(),
            "reconciliation finished"
        );
        out
    }

    /// Pass 1: pending deletions, with the resurrection check before any call.
    async fn deletion_pass(
        &self,
        snapshot: &PageConfig,
        pending: &HashSet<BlockId>,
        out: &mut SaveOutput,
    ) {
        for id in pending {
            if snapshot.contains(id) {
                // The user undid the removal; cancel instead of deleting.
                debug!(%id, "pending deletion resurrected by undo, dropping");
                out.resurrected.insert(id.clone());
                continue;
            }
            match self.store.delete_link_record(id).await {
                Ok(()) => {
                    out.deleted.insert(id.clone());
                    out.report.deleted += 1;
                }
                Err(source) => {
                    warn!(%id, %source, "delete failed, will retry next save");
                    out.report.failures.push(SaveFailure {
                        step: SaveStep::Delete,
                        block: Some(id.clone()),
                        source,
                    });
                }
            }
        }
    }

    /// Pass 2: one metadata update derived from profile + palette.
    async fn metadata_pass(&self, snapshot: &PageConfig, out: &mut SaveOutput) {
        let metadata = PageMetadata {
            display_name: snapshot.profile.display_name.clone(),
            bio: snapshot.profile.bio.clone(),
            theme: snapshot.resolved_theme().to_string(),
        };
        if let Err(source) = self.store.update_page_metadata(self.page_id, metadata).await {
            warn!(%source, "metadata update failed");
            out.report.failures.push(SaveFailure {
                step: SaveStep::Metadata,
                block: None,
                source,
            });
        }
    }

    /// Pass 3: create ephemeral link blocks, update permanent ones.
    ///
    /// Operations are independent of each other and issued concurrently; the
    /// reorder pass is what must wait for all of them.
    async fn block_pass(&self, snapshot: &PageConfig, out: &mut SaveOutput) {
        let ops = snapshot.link_blocks().map(|block| {
            let BlockData::Link(data) = &block.data else {
                unreachable!("link_blocks yields only link blocks");
            };
            async move {
                if block.id.is_ephemeral() {
                    let req = CreateLink {
                        page_id: self.page_id.clone(),
                        title: data.label.clone(),
                        url: data.url.clone(),
                        kind: "link".to_string(),
                    };
                    match self.store.create_link_record(req).await {
                        Ok(permanent) => BlockOutcome::Created {
                            from: block.id.clone(),
                            to: permanent,
                        },
                        Err(source) => BlockOutcome::Failed(SaveFailure {
                            step: SaveStep::Create,
                            block: Some(block.id.clone()),
                            source,
                        }),
                    }
                } else {
                    let req = UpdateLink {
                        id: block.id.clone(),
                        title: data.label.clone(),
                        url: data.url.clone(),
                        active: block.visible,
                    };
                    match self.store.update_link_record(req).await {
                        Ok(()) => BlockOutcome::Updated,
                        Err(source) => BlockOutcome::Failed(SaveFailure {
                            step: SaveStep::Update,
                            block: Some(block.id.clone()),
                            source,
                        }),
                    }
                }
            }
        });

        for outcome in join_all(ops).await {
            match outcome {
                BlockOutcome::Created { from, to } => {
                    debug!(%from, %to, "link record created");
                    out.resolved.insert(from, to);
                    out.report.created += 1;
                }
                BlockOutcome::Updated => out.report.updated += 1,
                BlockOutcome::Failed(failure) => {
                    warn!(%failure, "per-block operation failed");
                    out.report.failures.push(failure);
                }
            }
        }
    }

    /// Pass 4: persist the final order — only once every create has resolved.
    async fn reorder_pass(&self, snapshot: &PageConfig, out: &mut SaveOutput) {
        if out.report.create_failed() {
            // An ephemeral id would end up in the ordering; skip rather than
            // send the store an id it has never seen.
            warn!("skipping reorder: at least one create failed this save");
            return;
        }

        let ids: Vec<BlockId> = snapshot
            .link_blocks()
            .map(|b| out.resolved.get(&b.id).unwrap_or(&b.id).clone())
            .collect();
        debug_assert!(ids.iter().all(BlockId::is_permanent));

        if ids.is_empty() {
            out.report.reordered = true;
            return;
        }

        match self.store.set_link_order(self.page_id, ids).await {
            Ok(()) => out.report.reordered = true,
            Err(source) => {
                warn!(%source, "set order failed");
                out.report.failures.push(SaveFailure {
                    step: SaveStep::Reorder,
                    block: None,
                    source,
                });
            }
        }
    }
}

/// Apply an id-resolution map to a snapshot: ids change, content never does.
/// Used by fold-back, where the map is applied to the *current* snapshot so
/// edits made while the save was in flight are preserved.
pub fn remap_ids(snapshot: &PageConfig, resolved: &HashMap<BlockId, BlockId>) -> PageConfig {
    let mut next = snapshot.clone();
    for block in &mut next.blocks {
        if let Some(permanent) = resolved.get(&block.id) {
            block.id = permanent.clone();
        }
    }
    next
}
