//! The editor session: the one place state lives.
//!
//! [`EditorSession`] owns the snapshot history, the pending-deletions set, the
//! selection, the drag gesture, and the autosave debounce, and wires them to a
//! [`PageStore`]. It is a cheap-clone handle over shared inner state, so the
//! UI loop, the autosave timer, and tests can all hold one.
//!
//! ```text
//!   user gesture ──▶ edit op ──▶ History::push ──▶ debounce re-arm
//!                                                      │ (inactivity)
//!   publish() ────────────────┐                        ▼
//!                             ├────▶ save_lock ──▶ Reconciler::save ──▶ fold-back push
//!   autosave timer ───────────┘        (FIFO)
//! ```
//!
//! Concurrency: all state mutation happens under one sync lock, never held
//! across an await. Saves serialize through an async mutex — a trigger that
//! arrives mid-save waits, then runs against the then-current snapshot, so
//! edits made during an in-flight save are covered by the queued invocation.
//! Nothing cancels an in-flight save.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use linkloom_types::{
    Block, BlockId, BlockKind, BlockPatch, LinkData, PageConfig, PageId, PalettePatch,
    ProfilePatch, TypefacePatch, palette_for_theme,
};

use crate::autosave::{Debounce, TimerCmd, spawn_timer};
use crate::drag::{DragOutcome, DragState, DropTarget, move_block};
use crate::history::History;
use crate::reconcile::{Reconciler, SaveMode, SaveReport, remap_ids};
use crate::settings::{EditError, apply_block_patch, revalidate_selection};
use crate::store::{PageStore, PageTree, StoreError};

/// User-facing feedback from save passes. Presentation (toasts) is the
/// embedder's concern; these carry everything it needs.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    Saved(SaveReport),
    SaveFailed(SaveReport),
}

struct EditorState {
    history: History,
    pending_deletions: HashSet<BlockId>,
    selected: Option<BlockId>,
    drag: DragState,
    debounce: Debounce,
}

struct SessionInner {
    page_id: PageId,
    store: Arc<dyn PageStore>,
    state: Mutex<EditorState>,
    /// Serializes reconciliation invocations: at most one in flight, FIFO.
    save_lock: tokio::sync::Mutex<()>,
    events: UnboundedSender<EditorEvent>,
    timer_tx: UnboundedSender<TimerCmd>,
}

/// Handle to one editing session for one page.
#[derive(Clone)]
pub struct EditorSession {
    inner: Arc<SessionInner>,
}

impl EditorSession {
    /// Load the page from the store and start a session over it.
    ///
    /// Returns the session plus the feedback event stream.
    pub async fn open(
        store: Arc<dyn PageStore>,
        page_id: PageId,
    ) -> Result<(Self, UnboundedReceiver<EditorEvent>), StoreError> {
        let tree = store.load_page_tree(&page_id).await?;
        let initial = seed_config(&tree);
        info!(%page_id, blocks = initial.blocks.len(), "editor session opened");

        let (events, events_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(SessionInner {
            page_id,
            store,
            state: Mutex::new(EditorState {
                history: History::new(initial),
                pending_deletions: HashSet::new(),
                selected: None,
                drag: DragState::Idle,
                debounce: Debounce::default(),
            }),
            save_lock: tokio::sync::Mutex::new(()),
            events,
            timer_tx,
        });

        // Detached: the driver exits on its own when the session (and with it
        // the command channel) is dropped.
        let _ = spawn_timer(timer_rx, autosave_fire(Arc::downgrade(&inner)));
        Ok((Self { inner }, events_rx))
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// The current snapshot (cloned; snapshots are immutable values).
    pub fn current(&self) -> PageConfig {
        self.inner.state.lock().history.current().clone()
    }

    pub fn selected(&self) -> Option<BlockId> {
        self.inner.state.lock().selected.clone()
    }

    pub fn can_undo(&self) -> bool {
        self.inner.state.lock().history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.state.lock().history.can_redo()
    }

    /// Permanent ids removed locally but not yet deleted remotely.
    pub fn pending_deletions(&self) -> HashSet<BlockId> {
        self.inner.state.lock().pending_deletions.clone()
    }

    // ── Block edits (exactly one history push each) ──────────────────────

    /// Append a new block of `kind` with its default payload.
    pub fn add_block(&self, kind: BlockKind) -> BlockId {
        let mut state = self.inner.state.lock();
        let block = Block::new(kind);
        let id = block.id.clone();
        let mut next = state.history.current().clone();
        next.blocks.push(block);
        self.push_edit(&mut state, next);
        id
    }

    /// Copy a block's payload and visibility under a fresh ephemeral id,
    /// inserted right after the original.
    pub fn duplicate_block(&self, id: &BlockId) -> Result<BlockId, EditError> {
        let mut state = self.inner.state.lock();
        let current = state.history.current();
        let Some(pos) = current.position(id) else {
            return Err(EditError::BlockNotFound(id.clone()));
        };

        let mut copy = current.blocks[pos].clone();
        copy.id = BlockId::ephemeral();
        let copy_id = copy.id.clone();

        let mut next = current.clone();
        next.blocks.insert(pos + 1, copy);
        self.push_edit(&mut state, next);
        Ok(copy_id)
    }

    /// Remove a block. A permanent link id enters the pending-deletions set;
    /// the remote delete happens on the next save.
    pub fn remove_block(&self, id: &BlockId) -> Result<(), EditError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let current = state.history.current();
        let Some(pos) = current.position(id) else {
            return Err(EditError::BlockNotFound(id.clone()));
        };

        let mut next = current.clone();
        let removed = next.blocks.remove(pos);
        if removed.kind() == BlockKind::Link && removed.id.is_permanent() {
            debug!(id = %removed.id, "link removal pending remote delete");
            state.pending_deletions.insert(removed.id);
        }
        self.push_edit(state, next);
        revalidate_selection(&mut state.selected, state.history.current());
        Ok(())
    }

    /// Show or hide a block. Hidden blocks stay in the sequence and stay
    /// persisted. Setting the current value is a no-op (no push).
    pub fn set_block_visible(&self, id: &BlockId, visible: bool) -> Result<(), EditError> {
        let mut state = self.inner.state.lock();
        let current = state.history.current();
        let Some(block) = current.block(id) else {
            return Err(EditError::BlockNotFound(id.clone()));
        };
        if block.visible == visible {
            return Ok(());
        }

        let mut next = current.clone();
        if let Some(b) = next.block_mut(id) {
            b.visible = visible;
        }
        self.push_edit(&mut state, next);
        Ok(())
    }

    /// Apply a variant-specific attribute patch to a block (the settings form).
    pub fn update_block(&self, id: &BlockId, patch: &BlockPatch) -> Result<(), EditError> {
        let mut state = self.inner.state.lock();
        let next = apply_block_patch(state.history.current(), id, patch)?;
        self.push_edit(&mut state, next);
        Ok(())
    }

    // ── Page-level edits ─────────────────────────────────────────────────

    pub fn update_profile(&self, patch: &ProfilePatch) {
        let mut state = self.inner.state.lock();
        let next = state.history.current().with_profile(patch);
        self.push_edit(&mut state, next);
    }

    pub fn update_palette(&self, patch: &PalettePatch) {
        let mut state = self.inner.state.lock();
        let next = state.history.current().with_palette(patch);
        self.push_edit(&mut state, next);
    }

    pub fn update_typeface(&self, patch: &TypefacePatch) {
        let mut state = self.inner.state.lock();
        let next = state.history.current().with_typeface(patch);
        self.push_edit(&mut state, next);
    }

    // ── Selection (UI state, not history) ────────────────────────────────

    /// Select a block for the settings panel. False if the id is not in the
    /// current snapshot.
    pub fn select(&self, id: &BlockId) -> bool {
        let mut state = self.inner.state.lock();
        if state.history.current().contains(id) {
            state.selected = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn deselect(&self) {
        self.inner.state.lock().selected = None;
    }

    // ── Undo / redo ──────────────────────────────────────────────────────

    pub fn undo(&self) -> bool {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let moved = state.history.undo();
        if moved {
            revalidate_selection(&mut state.selected, state.history.current());
        }
        moved
    }

    pub fn redo(&self) -> bool {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let moved = state.history.redo();
        if moved {
            revalidate_selection(&mut state.selected, state.history.current());
        }
        moved
    }

    // ── Drag channel ─────────────────────────────────────────────────────

    pub fn begin_block_drag(&self, source: BlockId) {
        self.inner.state.lock().drag.begin_block_drag(source);
    }

    pub fn begin_palette_drag(&self, kind: BlockKind) {
        self.inner.state.lock().drag.begin_palette_drag(kind);
    }

    pub fn cancel_drag(&self) {
        self.inner.state.lock().drag.cancel();
    }

    /// Complete the drag gesture. Returns the id of the moved or inserted
    /// block, or `None` when the drop was a no-op (nothing is pushed then).
    pub fn drop_on(&self, target: DropTarget) -> Option<BlockId> {
        let mut state = self.inner.state.lock();
        match state.drag.resolve(target) {
            DragOutcome::Move { source, target } => {
                let current = state.history.current();
                let moved = move_block(&current.blocks, &source, &target)?;
                if moved.iter().map(|b| &b.id).eq(current.blocks.iter().map(|b| &b.id)) {
                    // Moving past itself: same order, nothing to record.
                    return None;
                }
                let mut next = current.clone();
                next.blocks = moved;
                self.push_edit(&mut state, next);
                Some(source)
            }
            DragOutcome::Insert { kind } => {
                let block = Block::new(kind);
                let id = block.id.clone();
                let mut next = state.history.current().clone();
                next.blocks.push(block);
                self.push_edit(&mut state, next);
                Some(id)
            }
            DragOutcome::Nothing => None,
        }
    }

    // ── Autosave & saving ────────────────────────────────────────────────

    /// Toggle autosave. Disabling cancels a pending timer without saving.
    pub fn set_autosave_enabled(&self, enabled: bool) {
        self.inner.state.lock().debounce.set_enabled(enabled);
    }

    pub fn autosave_enabled(&self) -> bool {
        self.inner.state.lock().debounce.is_enabled()
    }

    /// Explicit user-triggered save.
    pub async fn publish(&self) -> SaveReport {
        run_save(&self.inner, SaveMode::Publish).await
    }

    // ── Internal ─────────────────────────────────────────────────────────

    /// One logical user edit: push the snapshot and re-arm the autosave timer.
    fn push_edit(&self, state: &mut EditorState, next: PageConfig) {
        state.history.push(next);
        if let Some(cmd) = state.debounce.note_edit(Instant::now()) {
            // Driver gone means the session is shutting down; nothing to arm.
            let _ = self.inner.timer_tx.send(cmd);
        }
    }
}

/// Seed the initial document from the store's page tree: every link record
/// becomes a visible-or-not link block with its permanent id, in order.
fn seed_config(tree: &PageTree) -> PageConfig {
    let mut config = PageConfig::default();
    if let Some(palette) = palette_for_theme(&tree.metadata.theme) {
        config.palette = palette;
    }
    config.profile.display_name = tree.metadata.display_name.clone();
    config.profile.bio = tree.metadata.bio.clone();
    config.blocks = tree
        .links
        .iter()
        .map(|record| Block {
            id: record.id.clone(),
            visible: record.active,
            data: linkloom_types::BlockData::Link(LinkData {
                label: record.title.clone(),
                url: record.url.clone(),
                ..LinkData::default()
            }),
        })
        .collect();
    config
}

/// Timer-expiry callback: validate the generation and run a silent save.
fn autosave_fire(weak: Weak<SessionInner>) -> impl FnMut(u64) + Send + 'static {
    move |generation| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if !inner.state.lock().debounce.should_fire(generation) {
            return;
        }
        tokio::spawn(async move {
            run_save(&inner, SaveMode::Autosave).await;
        });
    }
}

/// One reconciliation invocation: consistent snapshot in, atomic fold-back out.
async fn run_save(inner: &Arc<SessionInner>, mode: SaveMode) -> SaveReport {
    // FIFO mutual exclusion: a second trigger waits here until the in-flight
    // invocation completes, then saves the then-current snapshot.
    let _guard = inner.save_lock.lock().await;

    let (snapshot, pending) = {
        let state = inner.state.lock();
        (
            state.history.current().clone(),
            state.pending_deletions.clone(),
        )
    };

    let reconciler = Reconciler::new(inner.store.as_ref(), &inner.page_id);
    let out = reconciler.save(&snapshot, &pending, mode).await;

    {
        let mut guard = inner.state.lock();
        let state = &mut *guard;
        for id in &out.deleted {
            state.pending_deletions.remove(id);
        }
        for id in &out.resurrected {
            // The resurrection verdict is as old as the save-start snapshot; a
            // block deleted again while the save ran must stay pending so the
            // next deletion pass issues the remote delete.
            if state.history.current().contains(id) {
                state.pending_deletions.remove(id);
            }
        }
        if !out.resolved.is_empty() {
            // Fold-back: apply resolved ids to the *current* snapshot so edits
            // made during the save are preserved; this push changes ids only.
            // It is not a user edit, so the autosave timer is not re-armed,
            // otherwise every save with a create would schedule another save.
            let folded = remap_ids(state.history.current(), &out.resolved);
            if let Some(selected) = state.selected.clone() {
                if let Some(permanent) = out.resolved.get(&selected) {
                    state.selected = Some(permanent.clone());
                }
            }
            state.history.push(folded);
        }
    }

    let report = out.report;
    match (report.is_clean(), mode) {
        (true, SaveMode::Publish) => {
            let _ = inner.events.send(EditorEvent::Saved(report.clone()));
        }
        (true, SaveMode::Autosave) => {
            debug!("autosave completed cleanly");
        }
        (false, SaveMode::Publish) => {
            let _ = inner.events.send(EditorEvent::SaveFailed(report.clone()));
        }
        (false, SaveMode::Autosave) => {
            // Silent mode: log, don't toast. Local state is untouched; the
            // next save retries whatever failed.
            warn!(failures = report.failures.len(), "autosave completed with failures");
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CreateLink, LinkRecord, MemoryStore, PageMetadata, StoreCall, UpdateLink};
    use async_trait::async_trait;
    use linkloom_types::{BlockData, LinkPatch};
    use tokio::sync::Semaphore;
    use tokio::time::{Duration, advance};

    /// Store that parks the metadata call until the test opens the gate,
    /// holding a save mid-flight at a known point.
    struct GatedStore {
        inner: Arc<MemoryStore>,
        metadata_gate: Semaphore,
    }

    #[async_trait]
    impl PageStore for GatedStore {
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

        async fn set_link_order(
            &self,
            page_id: &PageId,
            ids: Vec<BlockId>,
        ) -> Result<(), StoreError> {
            self.inner.set_link_order(page_id, ids).await
        }

        async fn update_page_metadata(
            &self,
            page_id: &PageId,
            metadata: PageMetadata,
        ) -> Result<(), StoreError> {
            let _permit = self.metadata_gate.acquire().await.expect("gate never closed");
            self.inner.update_page_metadata(page_id, metadata).await
        }
    }

    fn page_id() -> PageId {
        PageId::new("page_1")
    }

    fn store_with_links(records: &[(&str, &str)]) -> Arc<MemoryStore> {
        Arc::new(MemoryStore::seed(
            page_id(),
            PageMetadata {
                display_name: "Ada".into(),
                bio: String::new(),
                theme: "classic".into(),
            },
            records
                .iter()
                .map(|(id, title)| LinkRecord {
                    id: BlockId::permanent(*id),
                    title: title.to_string(),
                    url: format!("https://{title}.example"),
                    active: true,
                })
                .collect(),
        ))
    }

    async fn open(store: Arc<MemoryStore>) -> EditorSession {
        let (session, _events) = EditorSession::open(store, page_id())
            .await
            .expect("page loads");
        session
    }

    fn creates(store: &MemoryStore) -> usize {
        store
            .calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Create { .. }))
            .count()
    }

    fn metadata_saves(store: &MemoryStore) -> usize {
        store
            .calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Metadata(_)))
            .count()
    }

    #[tokio::test]
    async fn open_seeds_blocks_from_link_records() {
        let store = store_with_links(&[("lnk_a", "a"), ("lnk_b", "b")]);
        let session = open(store).await;

        let page = session.current();
        assert_eq!(page.profile.display_name, "Ada");
        assert_eq!(page.blocks.len(), 2);
        assert!(page.blocks.iter().all(|b| b.id.is_permanent()));
        assert_eq!(page.blocks[0].id, BlockId::permanent("lnk_a"));
    }

    #[tokio::test]
    async fn each_edit_is_one_undo_step() {
        let store = store_with_links(&[]);
        let session = open(store).await;

        let id = session.add_block(BlockKind::Link);
        session
            .update_block(
                &id,
                &BlockPatch::Link(LinkPatch {
                    label: Some("Blog".into()),
                    ..Default::default()
                }),
            )
            .expect("patch applies");
        session.update_profile(&ProfilePatch {
            bio: Some("hello".into()),
            ..Default::default()
        });

        // Three edits, three undos back to the seeded state.
        assert!(session.undo());
        assert!(session.undo());
        assert!(session.undo());
        assert!(!session.can_undo());
        assert!(session.current().blocks.is_empty());

        assert!(session.redo());
        assert_eq!(session.current().blocks.len(), 1);
    }

    #[tokio::test]
    async fn remove_and_undo_keeps_selection_honest() {
        let store = store_with_links(&[("lnk_a", "a")]);
        let session = open(store).await;
        let id = BlockId::permanent("lnk_a");

        assert!(session.select(&id));
        session.remove_block(&id).expect("block exists");
        assert_eq!(session.selected(), None, "deselected on delete");
        assert_eq!(session.pending_deletions(), [id.clone()].into());

        assert!(session.undo());
        assert!(session.current().contains(&id));
        // Still pending; the save-time resurrection check clears it.
        assert_eq!(session.pending_deletions(), [id].into());
    }

    #[tokio::test]
    async fn publish_folds_back_permanent_ids() {
        let store = store_with_links(&[]);
        let session = open(store.clone()).await;

        let eph = session.add_block(BlockKind::Link);
        assert!(session.select(&eph));

        let report = session.publish().await;
        assert!(report.is_clean());
        assert_eq!(report.created, 1);

        let page = session.current();
        assert!(page.blocks[0].id.is_permanent());
        // Selection followed the id across fold-back.
        assert_eq!(session.selected(), Some(page.blocks[0].id.clone()));

        // Second publish: update only, no second create.
        let report2 = session.publish().await;
        assert!(report2.is_clean());
        assert_eq!(report2.created, 0);
        assert_eq!(creates(&store), 1);
    }

    #[tokio::test]
    async fn delete_undo_publish_issues_no_delete() {
        let store = store_with_links(&[("lnk_b", "b")]);
        let session = open(store.clone()).await;
        let b = BlockId::permanent("lnk_b");

        session.add_block(BlockKind::Link);
        session.remove_block(&b).expect("b exists");
        assert!(session.undo());

        let report = session.publish().await;
        assert!(report.is_clean());
        assert_eq!(report.deleted, 0);
        assert!(
            !store
                .calls()
                .iter()
                .any(|c| matches!(c, StoreCall::Delete(_))),
            "resurrected record must not be deleted"
        );
        // Pending set cleared by the resurrection rule.
        assert!(session.pending_deletions().is_empty());
    }

    #[tokio::test]
    async fn drag_reorder_round_trip_is_idempotent() {
        let store = store_with_links(&[("lnk_a", "a"), ("lnk_b", "b"), ("lnk_c", "c")]);
        let session = open(store).await;
        let original = session.current();

        let a = BlockId::permanent("lnk_a");
        let c = BlockId::permanent("lnk_c");

        session.begin_block_drag(a.clone());
        assert!(session.drop_on(DropTarget::Block(c.clone())).is_some());
        assert_ne!(session.current().blocks, original.blocks);

        session.begin_block_drag(a.clone());
        // a sits at index 2 now; its original index holds lnk_b... dropping
        // back onto the block now at index 0 restores the original order.
        let first = session.current().blocks[0].id.clone();
        assert!(session.drop_on(DropTarget::Block(first)).is_some());
        assert_eq!(session.current().blocks, original.blocks);
    }

    #[tokio::test]
    async fn unresolved_drop_pushes_nothing() {
        let store = store_with_links(&[("lnk_a", "a")]);
        let session = open(store).await;

        session.begin_block_drag(BlockId::permanent("lnk_a"));
        assert_eq!(session.drop_on(DropTarget::Unresolved), None);
        assert!(!session.can_undo(), "no history entry for a no-op drop");
    }

    #[tokio::test]
    async fn palette_drop_appends_at_end() {
        let store = store_with_links(&[("lnk_a", "a")]);
        let session = open(store).await;

        session.begin_palette_drag(BlockKind::Text);
        let id = session
            .drop_on(DropTarget::Block(BlockId::permanent("lnk_a")))
            .expect("palette drop inserts");

        let page = session.current();
        assert_eq!(page.blocks.last().map(|b| b.id.clone()), Some(id));
        assert!(matches!(page.blocks[1].data, BlockData::Text(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn three_edits_one_autosave() {
        let store = store_with_links(&[]);
        let session = open(store.clone()).await;
        store.clear_calls();

        session.update_profile(&ProfilePatch {
            bio: Some("one".into()),
            ..Default::default()
        });
        advance(Duration::from_millis(500)).await;
        session.update_profile(&ProfilePatch {
            bio: Some("two".into()),
            ..Default::default()
        });
        advance(Duration::from_millis(500)).await;
        session.update_profile(&ProfilePatch {
            bio: Some("three".into()),
            ..Default::default()
        });

        // Let the inactivity window elapse and the spawned save run.
        advance(Duration::from_secs(4)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        assert_eq!(metadata_saves(&store), 1, "one silent save, not three");
        assert_eq!(store.metadata().bio, "three");
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_autosave_cancels_pending_save() {
        let store = store_with_links(&[]);
        let session = open(store.clone()).await;
        store.clear_calls();

        session.update_profile(&ProfilePatch {
            bio: Some("draft".into()),
            ..Default::default()
        });
        session.set_autosave_enabled(false);

        advance(Duration::from_secs(10)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(metadata_saves(&store), 0, "disable cancels, never saves");
    }

    #[tokio::test]
    async fn overlapping_saves_never_double_create() {
        let store = store_with_links(&[]);
        let session = open(store.clone()).await;
        session.add_block(BlockKind::Link);

        // Two concurrent triggers: the second queues behind the first and sees
        // the folded-back permanent id, so exactly one create goes out.
        let session2 = session.clone();
        let (r1, r2) = tokio::join!(session.publish(), session2.publish());
        assert!(r1.is_clean());
        assert!(r2.is_clean());
        assert_eq!(creates(&store), 1);
        assert_eq!(r1.created + r2.created, 1);
    }

    #[tokio::test]
    async fn delete_during_save_stays_pending() {
        let memory = store_with_links(&[("lnk_b", "b")]);
        let store = Arc::new(GatedStore {
            inner: memory.clone(),
            metadata_gate: Semaphore::new(0),
        });
        let (session, _events) = EditorSession::open(store.clone(), page_id())
            .await
            .expect("page loads");
        let b = BlockId::permanent("lnk_b");

        // Remove, undo: b is back in the document but still pending.
        session.remove_block(&b).expect("b exists");
        assert!(session.undo());

        let save = tokio::spawn({
            let session = session.clone();
            async move { session.publish().await }
        });
        // Let the save finish its deletion pass (b counts as resurrected, no
        // call) and park on the gated metadata call.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        // Mid-save: delete b again.
        session.remove_block(&b).expect("b exists");

        store.metadata_gate.add_permits(1);
        let report = save.await.expect("save task");
        assert!(report.is_clean());

        // The save-start verdict said resurrected, but the live document no
        // longer holds b: the deletion must stay pending.
        assert!(session.pending_deletions().contains(&b));

        // The next publish issues the remote delete.
        let report2 = session.publish().await;
        assert!(report2.is_clean());
        assert_eq!(report2.deleted, 1);
        assert!(memory.links().is_empty());
        assert!(session.pending_deletions().is_empty());
    }

    #[tokio::test]
    async fn duplicate_copies_payload_under_fresh_id() {
        let store = store_with_links(&[("lnk_a", "a"), ("lnk_b", "b")]);
        let session = open(store).await;
        let a = BlockId::permanent("lnk_a");

        let copy_id = session.duplicate_block(&a).expect("a exists");
        assert!(copy_id.is_ephemeral());

        let page = session.current();
        let ids: Vec<_> = page.blocks.iter().map(|b| b.id.clone()).collect();
        assert_eq!(
            ids,
            vec![a.clone(), copy_id.clone(), BlockId::permanent("lnk_b")],
            "copy sits right after the original"
        );
        assert_eq!(page.blocks[1].data, page.blocks[0].data);
        assert!(page.blocks[1].visible);

        // One edit, one undo.
        assert!(session.undo());
        assert!(!session.current().contains(&copy_id));

        // Ghost ids are rejected.
        assert!(matches!(
            session.duplicate_block(&BlockId::ephemeral()),
            Err(EditError::BlockNotFound(_))
        ));
    }

    #[tokio::test]
    async fn typeface_update_is_one_undoable_edit() {
        let store = store_with_links(&[]);
        let session = open(store).await;

        session.update_typeface(&TypefacePatch {
            family: Some("Space Grotesk".into()),
            ..Default::default()
        });
        let page = session.current();
        assert_eq!(page.typeface.family, "Space Grotesk");
        assert_eq!(page.typeface.weight, 400, "unpatched field keeps its value");

        assert!(session.undo());
        assert_eq!(session.current().typeface.family, "Inter");
    }
}
