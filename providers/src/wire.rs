//! Typed `generateContent` response.

use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Response {
    /// Convenience field some gateways and proxies add; preferred when set.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

impl Candidate {
    fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter(|part| !part.thought)
            .filter_map(|part| part.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Part {
    pub text: Option<String>,
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorInfo {
    pub message: Option<String>,
    pub code: Option<i32>,
    pub status: Option<String>,
}

impl ErrorInfo {
    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or("Unknown error")
    }
}

impl Response {
    /// Primary text: the top-level field, else every non-thought text part
    /// of the first candidate joined in order, else the first non-empty
    /// fragment from the remaining candidates.
    pub fn primary_text(&self) -> Option<String> {
        if let Some(text) = self.text.as_deref()
            && !text.trim().is_empty()
        {
            return Some(text.to_string());
        }

        let mut candidates = self.candidates.iter();
        if let Some(first) = candidates.next() {
            let joined: String = first.text_parts().collect();
            if !joined.trim().is_empty() {
                return Some(joined);
            }
        }

        candidates
            .flat_map(Candidate::text_parts)
            .find(|text| !text.trim().is_empty())
            .map(str::to_string)
    }

    /// Reason the answer was withheld, if the service says so.
    pub fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Some(format!("prompt blocked: {reason}"));
        }
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.finish_reason.as_deref())
            .map(FinishReason::parse)
            .find_map(FinishReason::block_message)
            .map(str::to_string)
    }
}

/// Known Gemini finish reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Blocklist,
    ProhibitedContent,
    Spii,
    Other,
    Unknown,
}

impl FinishReason {
    pub fn parse(s: &str) -> Self {
        match s {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "LANGUAGE" => Self::Language,
            "BLOCKLIST" => Self::Blocklist,
            "PROHIBITED_CONTENT" => Self::ProhibitedContent,
            "SPII" => Self::Spii,
            "OTHER" => Self::Other,
            _ => Self::Unknown,
        }
    }

    /// Message for reasons that mean the answer was withheld.
    pub fn block_message(self) -> Option<&'static str> {
        match self {
            Self::Stop | Self::MaxTokens | Self::Other | Self::Unknown => None,
            Self::Safety => Some("Content filtered by safety settings"),
            Self::Recitation => Some("Response blocked: recitation"),
            Self::Language => Some("Unsupported language"),
            Self::Blocklist => Some("Content contains blocked terms"),
            Self::ProhibitedContent => Some("Prohibited content detected"),
            Self::Spii => Some("Sensitive PII detected"),
        }
    }
}
