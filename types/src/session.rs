//! Learner session model and its persisted JSON shape.
//!
//! ```json
//! {
//!   "id": "6f0c...",
//!   "createdAt": "2025-01-01T09:00:00Z",
//!   "messages": [{ "role": "user", "content": "hi", "timestamp": "..." }],
//!   "goalsCount": 1,
//!   "focusLog": [{ "minutes": 25, "label": "Focused block", "completedAt": "..." }],
//!   "progressPct": 20
//! }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{ChatMessage, MessageStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Percentage in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ProgressPct(u8);

#[derive(Debug, Error)]
#[error("progress must be between 0 and 100, got {0}")]
pub struct ProgressOutOfRange(u8);

impl ProgressPct {
    pub const COMPLETE: Self = Self(100);

    /// Values above 100 saturate.
    #[must_use]
    pub fn saturating(value: u32) -> Self {
        Self(u8::try_from(value.min(100)).unwrap_or(100))
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ProgressPct {
    type Error = ProgressOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 100 {
            Err(ProgressOutOfRange(value))
        } else {
            Ok(Self(value))
        }
    }
}

impl From<ProgressPct> for u8 {
    fn from(value: ProgressPct) -> Self {
        value.0
    }
}

impl fmt::Display for ProgressPct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// A completed focus block. Only timer completion creates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusLogEntry {
    minutes: u64,
    label: String,
    completed_at: DateTime<Utc>,
}

impl FocusLogEntry {
    #[must_use]
    pub fn new(minutes: u64, label: impl Into<String>, completed_at: DateTime<Utc>) -> Self {
        Self {
            minutes,
            label: label.into(),
            completed_at,
        }
    }

    #[must_use]
    pub const fn minutes(&self) -> u64 {
        self.minutes
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    messages: MessageStore,
    goals_count: u32,
    focus_log: Vec<FocusLogEntry>,
    progress_pct: ProgressPct,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            messages: MessageStore::new(),
            goals_count: 0,
            focus_log: Vec::new(),
            progress_pct: ProgressPct::default(),
        }
    }

    /// Empty session with a freshly generated id.
    #[must_use]
    pub fn fresh(created_at: DateTime<Utc>) -> Self {
        Self::new(SessionId::generate(), created_at)
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    #[must_use]
    pub const fn goals_count(&self) -> u32 {
        self.goals_count
    }

    #[must_use]
    pub fn focus_log(&self) -> &[FocusLogEntry] {
        &self.focus_log
    }

    #[must_use]
    pub const fn progress_pct(&self) -> ProgressPct {
        self.progress_pct
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn record_goal(&mut self) {
        self.goals_count = self.goals_count.saturating_add(1);
    }

    pub fn record_focus_block(&mut self, entry: FocusLogEntry) {
        self.focus_log.push(entry);
    }

    /// Progress only moves forward.
    pub fn raise_progress(&mut self, pct: ProgressPct) {
        self.progress_pct = self.progress_pct.max(pct);
    }
}

/// Archive key of a saved snapshot: `YYYYMMDD-HHMMSS` with an optional
/// `-N` counter suffix for saves that land in the same second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotKey(String);

#[derive(Debug, Error)]
#[error("invalid snapshot key {0:?}")]
pub struct InvalidSnapshotKey(String);

impl SnapshotKey {
    #[must_use]
    pub fn from_timestamp(saved_at: DateTime<Utc>) -> Self {
        Self(saved_at.format("%Y%m%d-%H%M%S").to_string())
    }

    #[must_use]
    pub fn with_suffix(&self, counter: u64) -> Self {
        Self(format!("{}-{counter}", self.0))
    }

    /// Parse a user-supplied key. Only digits and `-` are accepted, so a key
    /// can always be used as a file stem.
    pub fn parse(raw: &str) -> Result<Self, InvalidSnapshotKey> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.starts_with(|c: char| c.is_ascii_digit())
            && raw.chars().all(|c| c.is_ascii_digit() || c == '-');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidSnapshotKey(raw.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SnapshotKey {
    type Error = InvalidSnapshotKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SnapshotKey> for String {
    fn from(value: SnapshotKey) -> Self {
        value.0
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
