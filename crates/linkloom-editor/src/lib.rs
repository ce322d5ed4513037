//! The linkloom editing engine.
//!
//! Everything between the block model ([`linkloom_types`]) and a UI: snapshot
//! history, drag gestures, the settings patch path, reconciliation against the
//! remote link-record store, and debounced autosave. [`EditorSession`] is the
//! facade that owns all of it for one page.
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!   UI events ──────▶│        EditorSession         │
//!                    │  history  selection  drag    │
//!                    │  pending-deletions  debounce │
//!                    └───────┬──────────────┬───────┘
//!                            │ save         │ timer
//!                            ▼              ▼
//!                       Reconciler      autosave driver
//!                            │
//!                            ▼
//!                     dyn PageStore  (remote link records)
//! ```
//!
//! The session is the only stateful piece; every other module is a value-level
//! state machine or a stateless pass, testable without a runtime.

pub mod autosave;
pub mod drag;
pub mod history;
pub mod reconcile;
pub mod session;
pub mod settings;
pub mod store;

pub use autosave::{DEFAULT_AUTOSAVE_WINDOW, Debounce};
pub use drag::{DragOutcome, DragState, DropTarget};
pub use history::{History, MAX_HISTORY};
pub use reconcile::{SaveFailure, SaveMode, SaveReport, SaveStep};
pub use session::{EditorEvent, EditorSession};
pub use settings::EditError;
pub use store::{
    CreateLink, LinkRecord, MemoryStore, PageMetadata, PageStore, PageTree, StoreError, UpdateLink,
};
