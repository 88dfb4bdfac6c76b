//! Core domain logic for Sylvia.
//!
//! Everything here is synchronous and side-effect free apart from reading a
//! [`Clock`]:
//!
//! - [`nudges`] - static catalog of one-shot coaching instructions
//! - [`composer`] - builds the ordered segment list for one turn
//! - [`tools`] - maps UI toggles to a request [`Configuration`](sylvia_types::Configuration)
//! - [`timer`] - poll-driven focus timer state machine

pub mod clock;
pub mod composer;
pub mod nudges;
pub mod timer;
pub mod tools;

pub use clock::{Clock, ManualClock, SystemClock};
pub use composer::{InvalidTurn, TurnInput, compose, compose_payload, extract_urls};
pub use nudges::{LearningStep, NudgeCatalog};
pub use timer::{
    FOCUSED_BLOCK_LABEL, FocusTimer, TimerError, TimerPhase, TimerPreset, TimerState, format_mmss,
};
pub use tools::build_configuration;
