use chrono::{DateTime, Utc};
use sylvia_core::{Clock, FocusTimer, LearningStep, TimerError, TimerState};
use sylvia_types::{AttachmentId, AttachmentRef, FocusLogEntry, Session, ToolToggles};
use tracing::debug;

/// State of one learner session.
///
/// All mutation goes through `&mut self`, so a turn in flight excludes every
/// other action on the same session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session: Session,
    timer: FocusTimer,
    attachments: Vec<AttachmentRef>,
    url_context: String,
    toggles: ToolToggles,
    learning_step: Option<LearningStep>,
}

impl SessionContext {
    #[must_use]
    pub fn new(created_at: DateTime<Utc>, toggles: ToolToggles) -> Self {
        Self::with_session(Session::fresh(created_at), toggles)
    }

    #[must_use]
    pub fn with_session(session: Session, toggles: ToolToggles) -> Self {
        Self {
            session,
            timer: FocusTimer::default(),
            attachments: Vec::new(),
            url_context: String::new(),
            toggles,
            learning_step: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Swap in another session, dropping unsaved state of the current one.
    ///
    /// The timer returns to idle (keeping its target), and attachments, URL
    /// context, and the learning-path marker are cleared. Tool toggles stay.
    pub fn replace_session(&mut self, session: Session) {
        debug!(
            from = %self.session.id(),
            to = %session.id(),
            "Replacing current session"
        );
        self.session = session;
        self.timer.reset();
        self.attachments.clear();
        self.url_context.clear();
        self.learning_step = None;
    }

    // Learning path

    #[must_use]
    pub const fn learning_step(&self) -> Option<LearningStep> {
        self.learning_step
    }

    pub(crate) fn record_step(&mut self, step: LearningStep) {
        self.learning_step = Some(step);
        self.session.raise_progress(step.progress());
        if step == LearningStep::Goal {
            self.session.record_goal();
        }
    }

    // Tool toggles

    #[must_use]
    pub const fn toggles(&self) -> &ToolToggles {
        &self.toggles
    }

    pub fn set_search_enabled(&mut self, enabled: bool) {
        self.toggles.search_enabled = enabled;
    }

    pub fn set_code_exec_enabled(&mut self, enabled: bool) {
        self.toggles.code_exec_enabled = enabled;
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.toggles.temperature = temperature;
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.toggles.max_tokens = max_tokens;
    }

    // Attachments

    #[must_use]
    pub fn attachments(&self) -> &[AttachmentRef] {
        &self.attachments
    }

    /// Add a file reference; it is sent with every turn until removed.
    pub fn register_attachment(&mut self, attachment: AttachmentRef) -> AttachmentId {
        let id = attachment.id().clone();
        debug!(id = %id, name = attachment.display_name(), "Attachment registered");
        self.attachments.push(attachment);
        id
    }

    pub fn remove_attachment(&mut self, id: &AttachmentId) -> Option<AttachmentRef> {
        let index = self.attachments.iter().position(|a| a.id() == id)?;
        Some(self.attachments.remove(index))
    }

    // URL context

    #[must_use]
    pub fn url_context(&self) -> &str {
        &self.url_context
    }

    /// Raw URL text; URL lines are extracted from it on every turn.
    pub fn set_url_context(&mut self, text: impl Into<String>) {
        self.url_context = text.into();
    }

    pub fn clear_url_context(&mut self) {
        self.url_context.clear();
    }

    // Focus timer. Each operation refreshes first; a block that completed in
    // the meantime is appended to the session's focus log.

    pub fn start_timer(&mut self, clock: &dyn Clock) -> Option<FocusLogEntry> {
        let completed = self.timer.start(clock);
        self.log_focus(completed)
    }

    pub fn pause_timer(&mut self, clock: &dyn Clock) -> Option<FocusLogEntry> {
        let completed = self.timer.pause(clock);
        self.log_focus(completed)
    }

    pub fn reset_timer(&mut self) {
        self.timer.reset();
    }

    pub fn set_timer_duration(
        &mut self,
        clock: &dyn Clock,
        target_secs: u64,
    ) -> Result<Option<FocusLogEntry>, TimerError> {
        let completed = self.timer.set_duration(clock, target_secs)?;
        Ok(self.log_focus(completed))
    }

    pub fn poll_timer(&mut self, clock: &dyn Clock) -> Option<FocusLogEntry> {
        let completed = self.timer.poll(clock);
        self.log_focus(completed)
    }

    /// Poll, then report the timer state.
    pub fn timer_state(&mut self, clock: &dyn Clock) -> TimerState {
        self.poll_timer(clock);
        self.timer.snapshot(clock)
    }

    fn log_focus(&mut self, completed: Option<FocusLogEntry>) -> Option<FocusLogEntry> {
        let entry = completed?;
        self.session.record_focus_block(entry.clone());
        Some(entry)
    }
}
