//! Session archive.
//!
//! The current session lives in the engine. This crate keeps the immutable
//! snapshots taken from it:
//!
//! ```text
//! SessionStore
//! ├── snapshots: key -> ArchivedSession (append-only)
//! └── dir: Option<PathBuf>   (None = in-memory only)
//!     └── <key>.json         one file per snapshot, written once
//! ```

mod store;

pub use store::{PersistenceError, SessionStore, SessionSummary};
pub use sylvia_types::{ChatMessage, MessageStore, Session, SnapshotKey};
