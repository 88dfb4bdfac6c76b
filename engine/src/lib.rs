//! Turn orchestration for Sylvia.
//!
//! [`SessionContext`] holds everything that belongs to one learner session:
//! the conversation, the focus timer, registered attachments, URL context, and
//! tool toggles. [`Coach`] owns what is shared across sessions (model access,
//! nudge catalog, system instruction, archive, clock) and applies user actions
//! to a context passed in by `&mut`.
//!
//! ```text
//! user action ─▶ Coach::send_turn(&mut SessionContext)
//!                  ├─ compose (history + nudge + urls + attachments + text)
//!                  ├─ ModelGateway::send
//!                  └─ append user / assistant messages
//! ```

mod coach;
mod session_context;

pub use coach::{
    CONFIGURATION_MISSING_REPLY, Coach, ConfigurationMissing, EMPTY_RESPONSE_REPLY,
    GATEWAY_FAILURE_REPLY, ModelAccess, TurnOutcome, TurnRequest, TurnStatus,
};
pub use session_context::SessionContext;

pub use sylvia_context::{PersistenceError, SessionStore, SessionSummary};
pub use sylvia_core::{
    Clock, FocusTimer, InvalidTurn, LearningStep, ManualClock, NudgeCatalog, SystemClock,
    TimerError, TimerPhase, TimerPreset, TimerState, format_mmss,
};
pub use sylvia_providers::{GatewayError, GatewayErrorKind, ModelGateway};
pub use sylvia_types::{
    AttachmentId, AttachmentRef, ChatMessage, FocusLogEntry, NudgeKey, Role, Session,
    SnapshotKey, ToolToggles,
};
