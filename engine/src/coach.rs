use std::path::Path;
use std::sync::Arc;

use sylvia_context::{PersistenceError, SessionStore, SessionSummary};
use sylvia_core::{
    Clock, InvalidTurn, LearningStep, NudgeCatalog, TurnInput, build_configuration,
    compose_payload,
};
use sylvia_providers::{GatewayError, GatewayErrorKind, ModelGateway};
use sylvia_types::{ChatMessage, NudgeKey, Session, SnapshotKey, ThinkingBudget, ToolToggles};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::SessionContext;

/// Assistant reply when no credential is available.
pub const CONFIGURATION_MISSING_REPLY: &str = "I can't reach the model yet: no API key is configured. Set GEMINI_API_KEY or add [api_keys].google to ~/.sylvia/config.toml.";

/// First line of the assistant reply when the model call fails.
pub const GATEWAY_FAILURE_REPLY: &str = "I hit a problem reaching the model. Please try again.";

/// Assistant reply when the model answered without any text.
pub const EMPTY_RESPONSE_REPLY: &str = "(No text response)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no API key configured for the model service")]
pub struct ConfigurationMissing;

/// Whether the model can be called at all.
#[derive(Debug)]
pub enum ModelAccess<G> {
    Available(G),
    Unconfigured(ConfigurationMissing),
}

impl<G> ModelAccess<G> {
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::Unconfigured(ConfigurationMissing)
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// What the learner submitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnRequest<'a> {
    pub nudge: Option<&'a NudgeKey>,
    pub user_text: &'a str,
}

impl<'a> TurnRequest<'a> {
    #[must_use]
    pub fn text(user_text: &'a str) -> Self {
        Self {
            nudge: None,
            user_text,
        }
    }

    #[must_use]
    pub fn nudge(key: &'a NudgeKey) -> Self {
        Self {
            nudge: Some(key),
            user_text: "",
        }
    }

    #[must_use]
    pub fn with_text(mut self, user_text: &'a str) -> Self {
        self.user_text = user_text;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStatus {
    Answered,
    /// The model answered with no usable text.
    Empty,
    Unconfigured(ConfigurationMissing),
    GatewayFailed(GatewayError),
}

/// Result of a turn that reached the composer. The reply has already been
/// appended to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub status: TurnStatus,
}

/// Shared machinery applied to a [`SessionContext`].
pub struct Coach<G> {
    model: ModelAccess<G>,
    catalog: NudgeCatalog,
    system_instruction: String,
    thinking_budget: ThinkingBudget,
    store: SessionStore,
    clock: Arc<dyn Clock>,
}

impl<G: ModelGateway> Coach<G> {
    #[must_use]
    pub fn new(model: ModelAccess<G>, store: SessionStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            model,
            catalog: NudgeCatalog::builtin(),
            system_instruction: String::new(),
            thinking_budget: ThinkingBudget::default(),
            store,
            clock,
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
    pub fn catalog(&self) -> &NudgeCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn model_access(&self) -> &ModelAccess<G> {
        &self.model
    }

    /// Fresh context for a new learner session.
    #[must_use]
    pub fn new_context(&self, toggles: ToolToggles) -> SessionContext {
        SessionContext::new(self.clock.wall(), toggles)
    }

    /// Run one turn.
    ///
    /// Returns [`InvalidTurn`] before anything is touched when there is
    /// nothing to send. Otherwise the user message (if any) and exactly one
    /// assistant message are appended, whatever the model call does.
    pub async fn send_turn(
        &self,
        ctx: &mut SessionContext,
        request: TurnRequest<'_>,
    ) -> Result<TurnOutcome, InvalidTurn> {
        let input = TurnInput {
            nudge: request.nudge,
            attachments: ctx.attachments(),
            url_text: ctx.url_context(),
            user_text: request.user_text,
        };
        if !input.has_content(&self.catalog) {
            return Err(InvalidTurn);
        }

        let configuration = build_configuration(ctx.toggles())
            .with_system_instruction(self.system_instruction.as_str())
            .with_thinking_budget(self.thinking_budget);
        let payload = compose_payload(
            ctx.session().messages(),
            &input,
            &self.catalog,
            configuration,
        )?;

        ctx.poll_timer(self.clock());

        let user_text = request.user_text.trim();
        if !user_text.is_empty() {
            ctx.session_mut()
                .push_message(ChatMessage::user(user_text, self.clock.wall()));
        }

        if let Some(key) = request.nudge
            && self.catalog.contains(key)
            && let Some(step) = LearningStep::for_key(key)
        {
            debug!(step = step.label(), "Learning path step recorded");
            ctx.record_step(step);
        }

        let (reply, status) = match &self.model {
            ModelAccess::Unconfigured(missing) => {
                warn!("Turn answered without a model call: {missing}");
                (
                    CONFIGURATION_MISSING_REPLY.to_string(),
                    TurnStatus::Unconfigured(*missing),
                )
            }
            ModelAccess::Available(gateway) => match gateway.send(&payload).await {
                Ok(text) => (text, TurnStatus::Answered),
                Err(err) if err.kind() == GatewayErrorKind::EmptyResponse => {
                    (EMPTY_RESPONSE_REPLY.to_string(), TurnStatus::Empty)
                }
                Err(err) => {
                    warn!(kind = err.kind().as_str(), "Model call failed: {}", err.message());
                    (
                        format!("{GATEWAY_FAILURE_REPLY}\n{}", err.summary()),
                        TurnStatus::GatewayFailed(err),
                    )
                }
            },
        };

        ctx.session_mut()
            .push_message(ChatMessage::assistant(reply.as_str(), self.clock.wall()));
        Ok(TurnOutcome { reply, status })
    }

    // Archive

    /// Snapshot the current session. The context is left as it was.
    pub fn save(&mut self, ctx: &SessionContext) -> Result<SnapshotKey, PersistenceError> {
        self.store.save(ctx.session(), self.clock.wall())
    }

    #[must_use]
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.store.list()
    }

    /// Replace the current session with an archived one. Unsaved current state
    /// is discarded; on error nothing changes.
    pub fn load(
        &self,
        ctx: &mut SessionContext,
        key: &SnapshotKey,
    ) -> Result<(), PersistenceError> {
        let session = self.store.load(key)?;
        info!(key = %key, session = %session.id(), "Session loaded");
        ctx.replace_session(session);
        Ok(())
    }

    pub fn export(&self, key: &SnapshotKey) -> Result<Vec<u8>, PersistenceError> {
        self.store.export(key)
    }

    pub fn export_to(&self, key: &SnapshotKey, path: &Path) -> Result<(), PersistenceError> {
        self.store.export_to(key, path)
    }

    /// Replace the current session with one parsed from exported JSON.
    pub fn import(&self, ctx: &mut SessionContext, bytes: &[u8]) -> Result<(), PersistenceError> {
        let session = SessionStore::import(bytes)?;
        info!(session = %session.id(), "Session imported");
        ctx.replace_session(session);
        Ok(())
    }

    /// Archive the current session, then start over with an empty one.
    ///
    /// If archiving fails the current session is kept.
    pub fn new_session(
        &mut self,
        ctx: &mut SessionContext,
    ) -> Result<SnapshotKey, PersistenceError> {
        let key = self.save(ctx)?;
        ctx.replace_session(Session::fresh(self.clock.wall()));
        info!(archived = %key, session = %ctx.session().id(), "New session started");
        Ok(key)
    }

    /// Destroy every archived snapshot. The current session is untouched.
    pub fn clear_archive(&mut self) -> Result<usize, PersistenceError> {
        self.store.clear()
    }
}
