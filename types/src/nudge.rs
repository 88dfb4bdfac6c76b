use std::fmt;

use crate::NonEmptyStaticStr;

/// Identifier of a coaching action, e.g. `"goal"` or `"time management"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NudgeKey(String);

impl NudgeKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NudgeKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for NudgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static, read-only catalog entry: a one-shot instruction for the model that
/// is never shown to the learner as their own words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nudge {
    key: &'static str,
    instruction: NonEmptyStaticStr,
}

impl Nudge {
    #[must_use]
    pub const fn new(key: &'static str, instruction: NonEmptyStaticStr) -> Self {
        Self { key, instruction }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.key
    }

    #[must_use]
    pub const fn instruction(&self) -> &'static str {
        self.instruction.as_str()
    }
}
