//! Text that is known to carry content.

use std::fmt;

use thiserror::Error;

/// Learner text with at least one non-whitespace character.
///
/// The composer only emits a `UserText` segment when it can build one of
/// these, so a blank turn never reaches the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyString(String);

#[derive(Debug, Error)]
#[error("text must not be empty")]
pub struct EmptyStringError;

impl NonEmptyString {
    /// Keeps `value` as given; rejects blank input.
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(EmptyStringError);
        }
        Ok(Self(value))
    }

    /// Trimmed copy of `value`, or `None` if nothing is left.
    #[must_use]
    pub fn trimmed(value: &str) -> Option<Self> {
        Self::new(value.trim()).ok()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog text fixed at compile time. Construction is `const`, so an empty
/// instruction fails the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NonEmptyStaticStr(&'static str);

impl NonEmptyStaticStr {
    #[must_use]
    pub const fn new(value: &'static str) -> Self {
        assert!(!value.is_empty(), "catalog text must not be empty");
        Self(value)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}
