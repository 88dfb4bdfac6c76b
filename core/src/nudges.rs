//! Coaching action catalog.
//!
//! Each entry is a one-shot instruction sent ahead of the learner's text on
//! the turn the action is pressed. Entries are static and never mutated.

use sylvia_types::{NonEmptyStaticStr, Nudge, NudgeKey, ProgressPct};

const fn entry(key: &'static str, instruction: &'static str) -> Nudge {
    Nudge::new(key, NonEmptyStaticStr::new(instruction))
}

const BUILTIN: &[Nudge] = &[
    entry(
        "goal",
        "SILENT_ACTION: The user pressed 'Goals'. Use SRL to help define 1-2 mastery goals. Ask exactly one short follow-up question. Keep it under 4 sentences.",
    ),
    entry(
        "taskanalysis",
        "SILENT_ACTION: The user pressed 'Task Analysis'. Identify prior knowledge, task constraints, and success criteria. Ask one clarifying question.",
    ),
    entry(
        "learning strategies",
        "SILENT_ACTION: The user pressed 'Learning Strategies'. Provide 3 concrete strategies tied to the stated goal and task. Ask one short check question.",
    ),
    entry(
        "time management",
        "SILENT_ACTION: The user pressed 'Time Management'. Suggest a Pomodoro-based micro-plan (e.g., 25-5 cycles) and a tiny next step (≤2 minutes).",
    ),
    entry(
        "resources",
        "SILENT_ACTION: The user pressed 'Resources'. Suggest 3 types of targeted resources. If Search is enabled, ground suggestions.",
    ),
    entry(
        "reflection",
        "SILENT_ACTION: The user pressed 'Reflect'. Prompt reflection on goals met, obstacles, strategies tried, emotion, effort. Keep it to 4 compact bullets.",
    ),
    entry(
        "feedback",
        "SILENT_ACTION: The user pressed 'Feedback'. Provide 2 strengths and 2 growth points based on the last messages. Offer one concrete refinement.",
    ),
    entry(
        "save",
        "SILENT_ACTION: Summarize and bookmark key points from this chat turn for next time. Keep it in bullet notes.",
    ),
];

/// Read-only lookup from action key to [`Nudge`].
#[derive(Debug, Clone, Copy)]
pub struct NudgeCatalog {
    entries: &'static [Nudge],
}

impl NudgeCatalog {
    #[must_use]
    pub const fn builtin() -> Self {
        Self { entries: BUILTIN }
    }

    /// Unknown keys resolve to `None`; callers treat that as "no nudge".
    #[must_use]
    pub fn get(&self, key: &NudgeKey) -> Option<&Nudge> {
        self.entries.iter().find(|nudge| nudge.key() == key.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &NudgeKey) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(Nudge::key)
    }
}

impl Default for NudgeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Position of an action on the five-step learning path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LearningStep {
    Goal = 1,
    TaskAnalysis = 2,
    Strategies = 3,
    TimeManagement = 4,
    Resources = 5,
}

impl LearningStep {
    pub const ALL: [LearningStep; 5] = [
        LearningStep::Goal,
        LearningStep::TaskAnalysis,
        LearningStep::Strategies,
        LearningStep::TimeManagement,
        LearningStep::Resources,
    ];

    /// Path step for a nudge key, if the action is on the path.
    #[must_use]
    pub fn for_key(key: &NudgeKey) -> Option<Self> {
        match key.as_str() {
            "goal" => Some(LearningStep::Goal),
            "taskanalysis" => Some(LearningStep::TaskAnalysis),
            "learning strategies" => Some(LearningStep::Strategies),
            "time management" => Some(LearningStep::TimeManagement),
            "resources" => Some(LearningStep::Resources),
            _ => None,
        }
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            LearningStep::Goal => "Goal",
            LearningStep::TaskAnalysis => "Task Analysis",
            LearningStep::Strategies => "Learning Strategies",
            LearningStep::TimeManagement => "Time Management",
            LearningStep::Resources => "Resources",
        }
    }

    /// Progress reached once this step is done.
    #[must_use]
    pub fn progress(self) -> ProgressPct {
        ProgressPct::saturating(u32::from(self.number()) * 20)
    }
}
