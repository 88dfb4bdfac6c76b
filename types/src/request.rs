//! Outbound request model.
//!
//! A [`RequestPayload`] is built fresh for every turn and dropped when the
//! gateway call returns. It is never persisted.

use std::borrow::Cow;

use crate::{NonEmptyString, Role};

/// Marker prepended to nudge segments so the model treats them as coaching
/// metadata instead of learner speech.
pub const INTERNAL_COACHING_MARKER: &str = "[INTERNAL_COACHING]";

/// Role tag understood by the model service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentRole {
    User,
    Model,
}

impl ContentRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ContentRole::User => "user",
            ContentRole::Model => "model",
        }
    }
}

impl From<Role> for ContentRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ContentRole::User,
            Role::Assistant => ContentRole::Model,
        }
    }
}

/// Where a segment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentSource {
    History,
    Nudge,
    UrlContext,
    Attachment,
    UserText,
}

/// One ordered piece of an outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A prior chat turn replayed as context.
    History { role: ContentRole, text: String },
    /// One-shot coaching instruction; never shown to the learner.
    Nudge { instruction: String },
    UrlContext { url: String },
    /// File reference; `file_uri` is set once an upload service returned an id.
    Attachment {
        display_name: String,
        identifier: String,
        mime_type: String,
        file_uri: Option<String>,
    },
    UserText(NonEmptyString),
}

impl Segment {
    #[must_use]
    pub const fn source(&self) -> SegmentSource {
        match self {
            Segment::History { .. } => SegmentSource::History,
            Segment::Nudge { .. } => SegmentSource::Nudge,
            Segment::UrlContext { .. } => SegmentSource::UrlContext,
            Segment::Attachment { .. } => SegmentSource::Attachment,
            Segment::UserText(_) => SegmentSource::UserText,
        }
    }

    #[must_use]
    pub const fn is_history(&self) -> bool {
        matches!(self, Segment::History { .. })
    }

    /// Role the segment is sent under. Everything in the new turn is user-authored
    /// from the model's point of view.
    #[must_use]
    pub const fn role(&self) -> ContentRole {
        match self {
            Segment::History { role, .. } => *role,
            _ => ContentRole::User,
        }
    }

    /// Text rendering of the segment as the model sees it.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Segment::History { text, .. } => Cow::Borrowed(text),
            Segment::Nudge { instruction } => {
                Cow::Owned(format!("{INTERNAL_COACHING_MARKER}\n{instruction}"))
            }
            Segment::UrlContext { url } => Cow::Owned(format!("URL_CONTEXT: {url}")),
            Segment::Attachment {
                display_name,
                identifier,
                ..
            } => Cow::Owned(format!("[FILE_REF name={display_name} id={identifier}]")),
            Segment::UserText(text) => Cow::Borrowed(text.as_str()),
        }
    }
}

/// Server-side tools the model may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GoogleSearch,
    CodeExecution,
}

impl ToolKind {
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            ToolKind::GoogleSearch => "google_search",
            ToolKind::CodeExecution => "code_execution",
        }
    }
}

/// Reasoning budget forwarded to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThinkingBudget {
    /// The model decides how much to think.
    #[default]
    Dynamic,
    Off,
    Tokens(u32),
}

impl ThinkingBudget {
    #[must_use]
    pub fn from_wire(value: i64) -> Self {
        match value {
            v if v < 0 => ThinkingBudget::Dynamic,
            0 => ThinkingBudget::Off,
            v => ThinkingBudget::Tokens(u32::try_from(v).unwrap_or(u32::MAX)),
        }
    }

    #[must_use]
    pub const fn wire_value(self) -> i64 {
        match self {
            ThinkingBudget::Dynamic => -1,
            ThinkingBudget::Off => 0,
            ThinkingBudget::Tokens(tokens) => tokens as i64,
        }
    }
}

/// UI switches that shape the request configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolToggles {
    pub search_enabled: bool,
    pub code_exec_enabled: bool,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ToolToggles {
    pub const DEFAULT_TEMPERATURE: f64 = 0.9;
    pub const DEFAULT_MAX_TOKENS: u32 = 2048;
}

impl Default for ToolToggles {
    fn default() -> Self {
        Self {
            search_enabled: false,
            code_exec_enabled: false,
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }
}

/// Generation settings for one request.
///
/// `tools` is always a list; "no tools" is the empty list.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    temperature: f64,
    max_output_tokens: u32,
    tools: Vec<ToolKind>,
    system_instruction: String,
    thinking_budget: ThinkingBudget,
}

impl Configuration {
    #[must_use]
    pub fn new(temperature: f64, max_output_tokens: u32, tools: Vec<ToolKind>) -> Self {
        Self {
            temperature,
            max_output_tokens,
            tools,
            system_instruction: String::new(),
            thinking_budget: ThinkingBudget::default(),
        }
    }

    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    #[must_use]
    pub fn with_thinking_budget(mut self, budget: ThinkingBudget) -> Self {
        self.thinking_budget = budget;
        self
    }

    #[must_use]
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    #[must_use]
    pub const fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolKind] {
        &self.tools
    }

    #[must_use]
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    #[must_use]
    pub const fn thinking_budget(&self) -> ThinkingBudget {
        self.thinking_budget
    }
}

/// Everything one gateway call needs: ordered segments plus configuration.
///
/// History segments always precede the new turn's segments.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPayload {
    segments: Vec<Segment>,
    configuration: Configuration,
}

impl RequestPayload {
    #[must_use]
    pub fn new(segments: Vec<Segment>, configuration: Configuration) -> Self {
        debug_assert!(
            segments.is_sorted_by_key(|segment| !segment.is_history()),
            "history segments must precede turn segments"
        );
        Self {
            segments,
            configuration,
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Prior conversation context.
    #[must_use]
    pub fn history(&self) -> &[Segment] {
        &self.segments[..self.turn_start()]
    }

    /// Segments of the new turn (nudge, URLs, attachments, user text).
    #[must_use]
    pub fn turn(&self) -> &[Segment] {
        &self.segments[self.turn_start()..]
    }

    fn turn_start(&self) -> usize {
        self.segments.partition_point(Segment::is_history)
    }
}
