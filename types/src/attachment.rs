use std::fmt;

use uuid::Uuid;

/// Locally assigned attachment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentId(String);

impl AttachmentId {
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("local-{}", Uuid::new_v4()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttachmentId {
    fn from(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file handed to the model by reference.
///
/// Only metadata is held here; the bytes never pass through the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    id: AttachmentId,
    display_name: String,
    mime_type: String,
    size_bytes: u64,
    external_id: Option<String>,
}

impl AttachmentRef {
    #[must_use]
    pub fn register(
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            id: AttachmentId::generate(),
            display_name: display_name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            external_id: None,
        }
    }

    /// Attach the identifier an upload service returned for this file.
    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        let external_id = external_id.into();
        self.external_id = if external_id.trim().is_empty() {
            None
        } else {
            Some(external_id)
        };
        self
    }

    #[must_use]
    pub fn id(&self) -> &AttachmentId {
        &self.id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// Identifier shown to the model: the upload id when known, else the local id.
    #[must_use]
    pub fn model_identifier(&self) -> &str {
        self.external_id().unwrap_or_else(|| self.id.as_str())
    }
}
