//! Turn composition.
//!
//! A request is always `[history] + [nudge] + [urls] + [attachments] + [text]`.
//! The order is significant to the model and is fixed here.

use sylvia_types::{
    AttachmentRef, Configuration, ContentRole, MessageStore, NonEmptyString, NudgeKey,
    RequestPayload, Segment,
};
use thiserror::Error;
use tracing::debug;

use crate::NudgeCatalog;

/// Raised when a turn carries nothing to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("turn has no nudge, attachment, URL, or text to send")]
pub struct InvalidTurn;

/// Inputs that make up the new turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnInput<'a> {
    pub nudge: Option<&'a NudgeKey>,
    pub attachments: &'a [AttachmentRef],
    pub url_text: &'a str,
    pub user_text: &'a str,
}

impl<'a> TurnInput<'a> {
    #[must_use]
    pub fn text(user_text: &'a str) -> Self {
        Self {
            user_text,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_nudge(mut self, nudge: &'a NudgeKey) -> Self {
        self.nudge = Some(nudge);
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: &'a [AttachmentRef]) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub fn with_url_text(mut self, url_text: &'a str) -> Self {
        self.url_text = url_text;
        self
    }

    /// Whether composing this input would yield at least one turn segment.
    ///
    /// Callers check this before touching any state so an empty submit is a
    /// no-op.
    #[must_use]
    pub fn has_content(&self, catalog: &NudgeCatalog) -> bool {
        self.nudge.is_some_and(|key| catalog.contains(key))
            || !self.attachments.is_empty()
            || !extract_urls(self.url_text).is_empty()
            || !self.user_text.trim().is_empty()
    }
}

/// URL lines from free-form text, trimmed, in input order.
///
/// A line counts when it contains `http://` or `https://` anywhere.
#[must_use]
pub fn extract_urls(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.contains("http://") || line.contains("https://"))
        .map(str::to_string)
        .collect()
}

/// Build the ordered segment list for one turn.
pub fn compose(
    history: &MessageStore,
    input: &TurnInput<'_>,
    catalog: &NudgeCatalog,
) -> Result<Vec<Segment>, InvalidTurn> {
    let mut turn = Vec::new();

    if let Some(key) = input.nudge {
        match catalog.get(key) {
            Some(nudge) => turn.push(Segment::Nudge {
                instruction: nudge.instruction().to_string(),
            }),
            None => debug!(key = %key, "Unknown nudge key ignored"),
        }
    }

    turn.extend(
        extract_urls(input.url_text)
            .into_iter()
            .map(|url| Segment::UrlContext { url }),
    );

    turn.extend(input.attachments.iter().map(|attachment| Segment::Attachment {
        display_name: attachment.display_name().to_string(),
        identifier: attachment.model_identifier().to_string(),
        mime_type: attachment.mime_type().to_string(),
        file_uri: attachment.external_id().map(str::to_string),
    }));

    if let Some(text) = NonEmptyString::trimmed(input.user_text) {
        turn.push(Segment::UserText(text));
    }

    if turn.is_empty() {
        return Err(InvalidTurn);
    }

    let mut segments: Vec<Segment> = history
        .entries()
        .iter()
        .filter(|message| !message.is_blank())
        .map(|message| Segment::History {
            role: ContentRole::from(message.role()),
            text: message.content().to_string(),
        })
        .collect();
    let history_len = segments.len();
    segments.append(&mut turn);

    debug!(
        history = history_len,
        turn = segments.len() - history_len,
        "Composed turn"
    );
    Ok(segments)
}

/// [`compose`] plus the request configuration.
pub fn compose_payload(
    history: &MessageStore,
    input: &TurnInput<'_>,
    catalog: &NudgeCatalog,
    configuration: Configuration,
) -> Result<RequestPayload, InvalidTurn> {
    let segments = compose(history, input, catalog)?;
    Ok(RequestPayload::new(segments, configuration))
}
