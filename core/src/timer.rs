//! Focus timer.
//!
//! There is no background tick. Elapsed time is recomputed from the clock
//! whenever the timer is touched, and completion is detected at that moment.
//!
//! ```text
//!          start            pause
//!   Idle ---------> Running -------> Paused
//!    ^                 |  ^            |
//!    |   elapsed>=goal |  +------------+ start
//!    +-----------------+
//!   reset: any state -> Idle, elapsed 0
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use sylvia_types::FocusLogEntry;
use thiserror::Error;
use tracing::info;

use crate::Clock;

pub const FOCUSED_BLOCK_LABEL: &str = "Focused block";

const DEFAULT_TARGET_SECS: u64 = 25 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("cannot change the focus duration while the timer is running")]
    DurationLocked,
    #[error("focus duration must be at least one second")]
    ZeroDuration,
    #[error("focus duration must be longer than the {elapsed_secs}s already elapsed")]
    BelowElapsed { elapsed_secs: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPreset {
    Pomodoro,
    Short,
    Break,
}

impl TimerPreset {
    pub const ALL: [TimerPreset; 3] = [TimerPreset::Pomodoro, TimerPreset::Short, TimerPreset::Break];

    #[must_use]
    pub const fn minutes(self) -> u64 {
        match self {
            TimerPreset::Pomodoro => 25,
            TimerPreset::Short => 15,
            TimerPreset::Break => 5,
        }
    }

    #[must_use]
    pub const fn seconds(self) -> u64 {
        self.minutes() * 60
    }

    /// Preset matching a minute count such as `"25"` or `"25m"`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let minutes: u64 = raw.trim().trim_end_matches('m').parse().ok()?;
        Self::ALL.into_iter().find(|preset| preset.minutes() == minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Paused,
    Running {
        /// Monotonic reading at which elapsed would have been zero.
        start_ref: Duration,
        started_wall: DateTime<Utc>,
    },
}

/// Read-only view of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    pub duration_target: u64,
    pub elapsed_seconds: u64,
    pub running: bool,
    pub started_at_wall_clock: Option<DateTime<Utc>>,
    pub phase: TimerPhase,
}

impl TimerState {
    #[must_use]
    pub const fn remaining_seconds(&self) -> u64 {
        self.duration_target.saturating_sub(self.elapsed_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct FocusTimer {
    target_secs: u64,
    elapsed_secs: u64,
    phase: Phase,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_SECS)
    }
}

impl FocusTimer {
    /// Idle timer with the given target; a zero target is raised to one second.
    #[must_use]
    pub fn new(target_secs: u64) -> Self {
        Self {
            target_secs: target_secs.max(1),
            elapsed_secs: 0,
            phase: Phase::Idle,
        }
    }

    #[must_use]
    pub fn from_preset(preset: TimerPreset) -> Self {
        Self::new(preset.seconds())
    }

    #[must_use]
    pub const fn target_secs(&self) -> u64 {
        self.target_secs
    }

    /// Begin or resume. Returns a log entry if the refresh that precedes the
    /// transition completed a block. No-op while already running.
    pub fn start(&mut self, clock: &dyn Clock) -> Option<FocusLogEntry> {
        let completed = self.refresh(clock);
        if !matches!(self.phase, Phase::Running { .. }) {
            let now = clock.monotonic();
            self.phase = Phase::Running {
                start_ref: now.saturating_sub(Duration::from_secs(self.elapsed_secs)),
                started_wall: clock.wall(),
            };
        }
        completed
    }

    /// Freeze elapsed time. No-op unless running.
    pub fn pause(&mut self, clock: &dyn Clock) -> Option<FocusLogEntry> {
        let completed = self.refresh(clock);
        if matches!(self.phase, Phase::Running { .. }) {
            self.phase = Phase::Paused;
        }
        completed
    }

    /// Back to idle with nothing elapsed. Never logs.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.elapsed_secs = 0;
    }

    /// Change the target. Rejected while running, and while paused unless the
    /// new target is above the elapsed time; elapsed time is kept otherwise.
    ///
    /// A block that finished before the change is logged against the old
    /// target and returned.
    pub fn set_duration(
        &mut self,
        clock: &dyn Clock,
        target_secs: u64,
    ) -> Result<Option<FocusLogEntry>, TimerError> {
        let completed = self.refresh(clock);
        if matches!(self.phase, Phase::Running { .. }) {
            return Err(TimerError::DurationLocked);
        }
        if target_secs == 0 {
            return Err(TimerError::ZeroDuration);
        }
        if self.elapsed_secs > 0 && target_secs <= self.elapsed_secs {
            return Err(TimerError::BelowElapsed {
                elapsed_secs: self.elapsed_secs,
            });
        }
        self.target_secs = target_secs;
        Ok(completed)
    }

    /// Refresh and report completion, if any.
    pub fn poll(&mut self, clock: &dyn Clock) -> Option<FocusLogEntry> {
        self.refresh(clock)
    }

    /// Current state. Callers must [`poll`](Self::poll) first to observe
    /// completion; this only reads.
    #[must_use]
    pub fn snapshot(&self, clock: &dyn Clock) -> TimerState {
        let (elapsed, started) = match self.phase {
            Phase::Running {
                start_ref,
                started_wall,
            } => (
                clock.monotonic().saturating_sub(start_ref).as_secs(),
                Some(started_wall),
            ),
            Phase::Idle | Phase::Paused => (self.elapsed_secs, None),
        };
        TimerState {
            duration_target: self.target_secs,
            elapsed_seconds: elapsed.min(self.target_secs),
            running: started.is_some(),
            started_at_wall_clock: started,
            phase: self.phase(),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> TimerPhase {
        match self.phase {
            Phase::Idle => TimerPhase::Idle,
            Phase::Running { .. } => TimerPhase::Running,
            Phase::Paused => TimerPhase::Paused,
        }
    }

    fn refresh(&mut self, clock: &dyn Clock) -> Option<FocusLogEntry> {
        let Phase::Running { start_ref, .. } = self.phase else {
            return None;
        };
        self.elapsed_secs = clock.monotonic().saturating_sub(start_ref).as_secs();
        if self.elapsed_secs < self.target_secs {
            return None;
        }

        let minutes = self.target_secs / 60;
        info!(minutes, "Focus block completed");
        self.phase = Phase::Idle;
        self.elapsed_secs = 0;
        Some(FocusLogEntry::new(minutes, FOCUSED_BLOCK_LABEL, clock.wall()))
    }
}

/// `mm:ss`; minutes are not wrapped at an hour.
#[must_use]
pub fn format_mmss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
