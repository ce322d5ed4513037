//! The block model: the closed set of content variants a page is composed of.
//!
//! A page is an ordered sequence of [`Block`]s. Each block carries one variant
//! of [`BlockData`] — a tagged union keyed by the wire name in `type`, so a
//! `text` block can never be read as a `link` block at runtime.
//!
//! Only the `Link` variant has a remote-persisted counterpart (a link record).
//! Every other variant is presentation-only and lives purely in the page
//! document. The reconciliation engine depends on this asymmetry and filters
//! to link blocks before computing any remote operation.
//!
//! Attribute edits arrive as typed patches ([`BlockPatch`]) with `Option`
//! fields; applying a patch shallow-merges the `Some` fields into a copy of the
//! payload and never touches `id` or `visible`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::ids::BlockId;

/// What a block *is*. Fieldless — the per-variant payload lives in [`BlockData`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlockKind {
    Link,
    Text,
    SocialIcons,
    Map,
    Newsletter,
    Image,
}

/// Horizontal alignment for text blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// A link button: the one variant with a remote counterpart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkData {
    pub label: String,
    pub url: String,
    pub background: String,
    pub text_color: String,
    pub corner_radius: u8,
}

impl Default for LinkData {
    fn default() -> Self {
        Self {
            label: "New link".to_string(),
            url: String::new(),
            background: "#1a1a1a".to_string(),
            text_color: "#ffffff".to_string(),
            corner_radius: 8,
        }
    }
}

/// Free-standing text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextData {
    pub content: String,
    pub align: TextAlign,
    pub size: u8,
    pub weight: u16,
    pub color: String,
}

impl Default for TextData {
    fn default() -> Self {
        Self {
            content: String::new(),
            align: TextAlign::default(),
            size: 16,
            weight: 400,
            color: "#111111".to_string(),
        }
    }
}

/// One icon in a social-icons row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialIcon {
    pub network: String,
    pub url: String,
}

/// A row of social-network icons.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialIconsData {
    pub icons: Vec<SocialIcon>,
}

/// An embedded map centered on an address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapData {
    pub address: String,
    pub zoom: u8,
}

impl Default for MapData {
    fn default() -> Self {
        Self {
            address: String::new(),
            zoom: 13,
        }
    }
}

/// A newsletter signup form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsletterData {
    pub heading: String,
    pub placeholder: String,
    pub button_label: String,
}

impl Default for NewsletterData {
    fn default() -> Self {
        Self {
            heading: "Subscribe".to_string(),
            placeholder: "you@example.com".to_string(),
            button_label: "Sign up".to_string(),
        }
    }
}

/// A standalone image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageData {
    pub src: String,
    pub alt: String,
    pub corner_radius: u8,
}

impl Default for ImageData {
    fn default() -> Self {
        Self {
            src: String::new(),
            alt: String::new(),
            corner_radius: 0,
        }
    }
}

/// Per-variant payload, tagged by the block kind's wire name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockData {
    Link(LinkData),
    Text(TextData),
    SocialIcons(SocialIconsData),
    Map(MapData),
    Newsletter(NewsletterData),
    Image(ImageData),
}

impl BlockData {
    /// Seed the default payload for a variant.
    pub fn default_for(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Link => Self::Link(LinkData::default()),
            BlockKind::Text => Self::Text(TextData::default()),
            BlockKind::SocialIcons => Self::SocialIcons(SocialIconsData::default()),
            BlockKind::Map => Self::Map(MapData::default()),
            BlockKind::Newsletter => Self::Newsletter(NewsletterData::default()),
            BlockKind::Image => Self::Image(ImageData::default()),
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Link(_) => BlockKind::Link,
            Self::Text(_) => BlockKind::Text,
            Self::SocialIcons(_) => BlockKind::SocialIcons,
            Self::Map(_) => BlockKind::Map,
            Self::Newsletter(_) => BlockKind::Newsletter,
            Self::Image(_) => BlockKind::Image,
        }
    }
}

/// Error applying a patch to a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The patch targets a different variant than the block carries.
    #[error("patch for {patch} cannot apply to {block} block")]
    KindMismatch { block: BlockKind, patch: BlockKind },
}

macro_rules! merge {
    ($dst:expr, $patch:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $patch.$field {
                $dst.$field = v;
            }
        )+
    };
}

/// Partial update for a link block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkPatch {
    pub label: Option<String>,
    pub url: Option<String>,
    pub background: Option<String>,
    pub text_color: Option<String>,
    pub corner_radius: Option<u8>,
}

/// Partial update for a text block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPatch {
    pub content: Option<String>,
    pub align: Option<TextAlign>,
    pub size: Option<u8>,
    pub weight: Option<u16>,
    pub color: Option<String>,
}

/// Partial update for a social-icons block. Icon rows are replaced wholesale;
/// there is no per-icon addressing in the settings form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialIconsPatch {
    pub icons: Option<Vec<SocialIcon>>,
}

/// Partial update for a map block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapPatch {
    pub address: Option<String>,
    pub zoom: Option<u8>,
}

/// Partial update for a newsletter block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsletterPatch {
    pub heading: Option<String>,
    pub placeholder: Option<String>,
    pub button_label: Option<String>,
}

/// Partial update for an image block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePatch {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub corner_radius: Option<u8>,
}

/// A variant-specific partial attribute update, tagged like [`BlockData`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockPatch {
    Link(LinkPatch),
    Text(TextPatch),
    SocialIcons(SocialIconsPatch),
    Map(MapPatch),
    Newsletter(NewsletterPatch),
    Image(ImagePatch),
}

impl BlockPatch {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Link(_) => BlockKind::Link,
            Self::Text(_) => BlockKind::Text,
            Self::SocialIcons(_) => BlockKind::SocialIcons,
            Self::Map(_) => BlockKind::Map,
            Self::Newsletter(_) => BlockKind::Newsletter,
            Self::Image(_) => BlockKind::Image,
        }
    }
}

/// One addressable content unit in a composed page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(flatten)]
    pub data: BlockData,
}

fn default_visible() -> bool {
    true
}

impl Block {
    /// Construct a brand-new block: fresh ephemeral id, default payload, visible.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::ephemeral(),
            visible: true,
            data: BlockData::default_for(kind),
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.data.kind()
    }

    /// Replace this block's id, keeping everything else. Used by fold-back when
    /// an ephemeral id resolves to a permanent one.
    pub fn with_id(mut self, id: BlockId) -> Self {
        self.id = id;
        self
    }

    /// Apply a partial attribute update, producing a new block value.
    ///
    /// `id` and `visible` are untouched; a patch for the wrong variant is
    /// rejected rather than silently dropped.
    pub fn apply(&self, patch: &BlockPatch) -> Result<Block, PatchError> {
        let mut next = self.clone();
        match (&mut next.data, patch.clone()) {
            (BlockData::Link(d), BlockPatch::Link(p)) => {
                merge!(d, p; label, url, background, text_color, corner_radius);
            }
            (BlockData::Text(d), BlockPatch::Text(p)) => {
                merge!(d, p; content, align, size, weight, color);
            }
            (BlockData::SocialIcons(d), BlockPatch::SocialIcons(p)) => {
                merge!(d, p; icons);
            }
            (BlockData::Map(d), BlockPatch::Map(p)) => {
                merge!(d, p; address, zoom);
            }
            (BlockData::Newsletter(d), BlockPatch::Newsletter(p)) => {
                merge!(d, p; heading, placeholder, button_label);
            }
            (BlockData::Image(d), BlockPatch::Image(p)) => {
                merge!(d, p; src, alt, corner_radius);
            }
            _ => {
                return Err(PatchError::KindMismatch {
                    block: self.kind(),
                    patch: patch.kind(),
                });
            }
        }
        Ok(next)
    }
}
