//! Shared data types for linkloom.
//!
//! This crate is the pure data foundation: typed ids, the block model, and the
//! page document. It has **no internal linkloom dependencies** and no behavior
//! beyond value construction and patch merging — a leaf crate the editor and
//! CLI build on.
//!
//! # Key Types
//!
//! |-----------------|-----------------------------------------------|
//! | Type            | Purpose                                       |
//! |-----------------|-----------------------------------------------|
//! | [`PageId`]      | Which hosted page                             |
//! | [`BlockId`]     | Block address (ephemeral `local-` vs remote)  |
//! | [`BlockKind`]   | Closed set of block variants                  |
//! | [`BlockData`]   | Per-variant payload (tagged by `type`)        |
//! | [`Block`]       | id + visibility + payload                     |
//! | [`BlockPatch`]  | Variant-specific partial attribute update     |
//! | [`PageConfig`]  | One full document snapshot                    |
//! |-----------------|-----------------------------------------------|

pub mod block;
pub mod ids;
pub mod page;

// Re-export primary types at crate root for convenience.
pub use block::{
    Block, BlockData, BlockKind, BlockPatch, ImageData, ImagePatch, LinkData, LinkPatch, MapData,
    MapPatch, NewsletterData, NewsletterPatch, PatchError, SocialIcon, SocialIconsData,
    SocialIconsPatch, TextAlign, TextData, TextPatch,
};
pub use ids::{BlockId, EPHEMERAL_PREFIX, PageId};
pub use page::{
    PageConfig, Palette, PalettePatch, Profile, ProfilePatch, Typeface, TypefacePatch,
    palette_for_theme,
};
