use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;

pub const DEFAULT_IDENTITY: &str = "You are Sylvia, a helpful learning facilitator. Be friendly, supportive, and provide clear, concise, SRL-framed responses.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    File,
    Default,
}

/// System instruction sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPrompt {
    text: String,
    source: IdentitySource,
}

impl IdentityPrompt {
    /// Read the identity file, falling back to [`DEFAULT_IDENTITY`] with a
    /// warning when it is missing, unreadable, or blank.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => Self {
                text: text.trim().to_string(),
                source: IdentitySource::File,
            },
            Ok(_) => {
                warn!(path = %path.display(), "Identity file is empty; using default identity");
                Self::default()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Identity file not found; using default identity");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), "Failed to read identity file: {e}; using default identity");
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn source(&self) -> &IdentitySource {
        &self.source
    }
}

impl Default for IdentityPrompt {
    fn default() -> Self {
        Self {
            text: DEFAULT_IDENTITY.to_string(),
            source: IdentitySource::Default,
        }
    }
}
