//! The editable page document.
//!
//! [`PageConfig`] is one full immutable value of the document at a point in
//! history: theme colors, typeface, profile header, and the ordered block
//! sequence. Order is meaningful — it is both the render order and the sort
//! order persisted remotely. The history manager owns a vector of these;
//! everything else operates on clones and asks history to push new ones.

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockKind};
use crate::ids::BlockId;

/// Page theme colors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: String,
    pub text: String,
    pub accent: String,
    pub card_background: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
            text: "#111111".to_string(),
            accent: "#5b5bd6".to_string(),
            card_background: "#f4f4f5".to_string(),
        }
    }
}

/// Page typography.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typeface {
    pub family: String,
    pub weight: u16,
}

impl Default for Typeface {
    fn default() -> Self {
        Self {
            family: "Inter".to_string(),
            weight: 400,
        }
    }
}

/// The profile header shown above the blocks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Reference to an uploaded avatar (opaque to the editor).
    pub avatar: String,
    pub display_name: String,
    pub bio: String,
}

/// Partial update for [`Profile`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePatch {
    pub avatar: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

/// Partial update for [`Palette`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PalettePatch {
    pub background: Option<String>,
    pub text: Option<String>,
    pub accent: Option<String>,
    pub card_background: Option<String>,
}

/// Partial update for [`Typeface`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypefacePatch {
    pub family: Option<String>,
    pub weight: Option<u16>,
}

/// Built-in palettes with a named remote theme identifier. Anything else is
/// persisted as `custom`.
const NAMED_THEMES: &[(&str, &str)] = &[
    ("#ffffff", "classic"),
    ("#0b0b0f", "midnight"),
    ("#fdf6e3", "paper"),
    ("#022c22", "forest"),
];

/// Full palette for a named theme identifier, used when seeding a document
/// from a stored page record. `custom` and unknown names yield `None`; the
/// default palette stands in for those.
pub fn palette_for_theme(theme: &str) -> Option<Palette> {
    match theme {
        "classic" => Some(Palette::default()),
        "midnight" => Some(Palette {
            background: "#0b0b0f".to_string(),
            text: "#f4f4f5".to_string(),
            accent: "#8b8bf0".to_string(),
            card_background: "#17171d".to_string(),
        }),
        "paper" => Some(Palette {
            background: "#fdf6e3".to_string(),
            text: "#3b3a32".to_string(),
            accent: "#b58900".to_string(),
            card_background: "#f5eed6".to_string(),
        }),
        "forest" => Some(Palette {
            background: "#022c22".to_string(),
            text: "#ecfdf5".to_string(),
            accent: "#34d399".to_string(),
            card_background: "#064e3b".to_string(),
        }),
        _ => None,
    }
}

/// The editable document: one snapshot value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub palette: Palette,
    pub typeface: Typeface,
    pub profile: Profile,
    pub blocks: Vec<Block>,
}

impl PageConfig {
    /// Look up a block by id.
    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn block_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| &b.id == id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.block(id).is_some()
    }

    /// Index of a block in the sequence.
    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    /// The blocks with a remote-persisted counterpart, in sequence order.
    pub fn link_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.kind() == BlockKind::Link)
    }

    /// Apply a profile patch, producing a new snapshot.
    pub fn with_profile(&self, patch: &ProfilePatch) -> PageConfig {
        let mut next = self.clone();
        if let Some(v) = &patch.avatar {
            next.profile.avatar = v.clone();
        }
        if let Some(v) = &patch.display_name {
            next.profile.display_name = v.clone();
        }
        if let Some(v) = &patch.bio {
            next.profile.bio = v.clone();
        }
        next
    }

    /// Apply a palette patch, producing a new snapshot.
    pub fn with_palette(&self, patch: &PalettePatch) -> PageConfig {
        let mut next = self.clone();
        if let Some(v) = &patch.background {
            next.palette.background = v.clone();
        }
        if let Some(v) = &patch.text {
            next.palette.text = v.clone();
        }
        if let Some(v) = &patch.accent {
            next.palette.accent = v.clone();
        }
        if let Some(v) = &patch.card_background {
            next.palette.card_background = v.clone();
        }
        next
    }

    /// Apply a typeface patch, producing a new snapshot.
    pub fn with_typeface(&self, patch: &TypefacePatch) -> PageConfig {
        let mut next = self.clone();
        if let Some(v) = &patch.family {
            next.typeface.family = v.clone();
        }
        if let Some(v) = patch.weight {
            next.typeface.weight = v;
        }
        next
    }

    /// The theme identifier persisted on the remote page record, derived from
    /// the palette: a named built-in when the background matches, `custom`
    /// otherwise.
    pub fn resolved_theme(&self) -> &'static str {
        NAMED_THEMES
            .iter()
            .find(|(bg, _)| *bg == self.palette.background)
            .map(|(_, name)| *name)
            .unwrap_or("custom")
    }
}
