//! Block settings: routing a variant-specific patch to the selected block.
//!
//! The settings form the UI shows is keyed by the active block's variant; what
//! arrives here is the block id plus a [`BlockPatch`] of the same variant.
//! Applying locates the block in the current snapshot, merges the patch into
//! its payload, and hands the new snapshot back for exactly one history push.
//! Selection itself is pure UI state and never enters history.

use thiserror::Error;

use linkloom_types::{BlockId, BlockPatch, PageConfig, PatchError};

/// Error applying an edit to the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no block with id {0} in the current snapshot")]
    BlockNotFound(BlockId),
    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Merge `patch` into the block's payload, producing the next snapshot.
pub fn apply_block_patch(
    snapshot: &PageConfig,
    id: &BlockId,
    patch: &BlockPatch,
) -> Result<PageConfig, EditError> {
    let mut next = snapshot.clone();
    let Some(block) = next.block_mut(id) else {
        return Err(EditError::BlockNotFound(id.clone()));
    };
    let patched = block.apply(patch)?;
    *block = patched;
    Ok(next)
}

/// Drop the selection when the selected block no longer exists in the current
/// snapshot (deleted, or undone out of existence).
pub fn revalidate_selection(selected: &mut Option<BlockId>, snapshot: &PageConfig) {
    if let Some(id) = selected {
        if !snapshot.contains(id) {
            *selected = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkloom_types::{Block, BlockData, BlockKind, LinkPatch, TextPatch};

    fn snapshot() -> (PageConfig, BlockId) {
        let mut page = PageConfig::default();
        let block = Block::new(BlockKind::Link);
        let id = block.id.clone();
        page.blocks.push(block);
        (page, id)
    }

    #[test]
    fn patch_lands_on_the_addressed_block() {
        let (page, id) = snapshot();
        let next = apply_block_patch(
            &page,
            &id,
            &BlockPatch::Link(LinkPatch {
                label: Some("Portfolio".into()),
                ..Default::default()
            }),
        )
        .expect("patch applies");

        let BlockData::Link(data) = &next.block(&id).expect("still present").data else {
            panic!("expected link payload");
        };
        assert_eq!(data.label, "Portfolio");
        // Original snapshot untouched.
        let BlockData::Link(original) = &page.blocks[0].data else {
            panic!("expected link payload");
        };
        assert_eq!(original.label, "New link");
    }

    #[test]
    fn missing_block_is_an_error() {
        let (page, _) = snapshot();
        let ghost = BlockId::ephemeral();
        let err = apply_block_patch(&page, &ghost, &BlockPatch::Text(TextPatch::default()))
            .expect_err("ghost id");
        assert_eq!(err, EditError::BlockNotFound(ghost));
    }

    #[test]
    fn mismatched_variant_propagates() {
        let (page, id) = snapshot();
        let err = apply_block_patch(&page, &id, &BlockPatch::Text(TextPatch::default()))
            .expect_err("wrong variant");
        assert!(matches!(err, EditError::Patch(_)));
    }

    #[test]
    fn selection_survives_only_while_block_exists() {
        let (page, id) = snapshot();
        let mut selected = Some(id.clone());

        revalidate_selection(&mut selected, &page);
        assert_eq!(selected, Some(id));

        revalidate_selection(&mut selected, &PageConfig::default());
        assert_eq!(selected, None);
    }
}
