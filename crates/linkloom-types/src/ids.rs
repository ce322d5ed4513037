//! Typed identifiers for pages and blocks.
//!
//! `BlockId` is string-backed rather than a raw UUID because block identity has
//! two sources: ids minted locally when a block is created in the editor, and
//! ids assigned by the remote store once a link record exists. The two are
//! distinguished by a reserved prefix — `local-` — which the reconciliation
//! engine uses to decide between `create` and `update`. Nothing else in the
//! system is allowed to interpret the id contents.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved prefix marking a client-minted id that the remote store has never
/// seen. Server-assigned ids must never start with this.
pub const EPHEMERAL_PREFIX: &str = "local-";

/// Identifier for a single block in a page document.
///
/// Ephemeral ids (`local-` prefix, UUIDv7 payload) are unique within an editing
/// session without coordination; permanent ids are opaque strings owned by the
/// remote store.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Mint a fresh ephemeral id (time-ordered, session-unique).
    pub fn ephemeral() -> Self {
        Self(format!(
            "{EPHEMERAL_PREFIX}{}",
            uuid::Uuid::now_v7().as_simple()
        ))
    }

    /// Wrap a server-assigned id.
    ///
    /// Callers are expected to hand in ids that came from the store; a value
    /// carrying the reserved prefix would confuse reconciliation, so this is
    /// debug-asserted rather than silently accepted.
    pub fn permanent(id: impl Into<String>) -> Self {
        let id = id.into();
        debug_assert!(
            !id.starts_with(EPHEMERAL_PREFIX),
            "server-assigned id must not carry the reserved local prefix"
        );
        Self(id)
    }

    /// True if this id was minted locally and is unknown to the remote store.
    pub fn is_ephemeral(&self) -> bool {
        self.0.starts_with(EPHEMERAL_PREFIX)
    }

    /// True if this id was assigned by the remote store.
    pub fn is_permanent(&self) -> bool {
        !self.is_ephemeral()
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters past any prefix — for human display only, not lookup.
    pub fn short(&self) -> &str {
        let tail = self.0.strip_prefix(EPHEMERAL_PREFIX).unwrap_or(&self.0);
        match tail.char_indices().nth(8) {
            Some((end, _)) => &tail[..end],
            None => tail,
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

/// Identifier for a hosted page (always server-assigned).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}
