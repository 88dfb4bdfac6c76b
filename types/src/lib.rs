//! Core domain types for Sylvia.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.
//!
//! Constructors that need a timestamp take it explicitly; callers own the clock.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod attachment;
mod message;
mod nudge;
mod proofs;
mod request;
mod session;

pub use attachment::{AttachmentId, AttachmentRef};
pub use message::{ChatMessage, MessageStore, Role};
pub use nudge::{Nudge, NudgeKey};
pub use proofs::{EmptyStringError, NonEmptyStaticStr, NonEmptyString};
pub use request::{
    Configuration, ContentRole, INTERNAL_COACHING_MARKER, RequestPayload, Segment, SegmentSource,
    ThinkingBudget, ToolKind, ToolToggles,
};
pub use session::{
    FocusLogEntry, InvalidSnapshotKey, ProgressOutOfRange, ProgressPct, Session, SessionId,
    SnapshotKey,
};
