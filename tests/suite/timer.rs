//! Focus timer driven through the session context with a manual clock

use chrono::Duration;
use sylvia_engine::{
    ManualClock, Session, SessionContext, TimerError, TimerPhase, TimerPreset, ToolToggles,
    format_mmss,
};

use crate::common::t0;

fn context() -> (SessionContext, ManualClock) {
    (
        SessionContext::new(t0(), ToolToggles::default()),
        ManualClock::starting_at(t0()),
    )
}

#[test]
fn pause_accumulates_elapsed_time() {
    let (mut ctx, clock) = context();

    ctx.start_timer(&clock);
    clock.advance_secs(300);
    ctx.pause_timer(&clock);
    assert_eq!(ctx.timer_state(&clock).elapsed_seconds, 300);

    clock.advance_secs(1_000);
    assert_eq!(ctx.timer_state(&clock).elapsed_seconds, 300);

    ctx.start_timer(&clock);
    clock.advance_secs(120);
    ctx.pause_timer(&clock);

    let state = ctx.timer_state(&clock);
    assert_eq!(state.elapsed_seconds, 420);
    assert_eq!(state.phase, TimerPhase::Paused);
    assert_eq!(state.remaining_seconds(), 25 * 60 - 420);
    assert!(ctx.session().focus_log().is_empty());
}

#[test]
fn completion_logs_one_block_and_returns_to_idle() {
    let (mut ctx, clock) = context();
    ctx.set_timer_duration(&clock, 5).unwrap();

    ctx.start_timer(&clock);
    clock.advance_secs(6);
    let state = ctx.timer_state(&clock);

    assert_eq!(state.phase, TimerPhase::Idle);
    assert!(!state.running);
    assert_eq!(state.elapsed_seconds, 0);
    let log = ctx.session().focus_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].minutes(), 0);
    assert_eq!(log[0].label(), "Focused block");
    assert_eq!(log[0].completed_at(), t0() + Duration::seconds(6));

    // Polling again does not log a second block.
    clock.advance_secs(60);
    ctx.timer_state(&clock);
    assert_eq!(ctx.session().focus_log().len(), 1);
}

#[test]
fn pomodoro_block_logs_twenty_five_minutes() {
    let (mut ctx, clock) = context();
    ctx.set_timer_duration(&clock, TimerPreset::Pomodoro.seconds())
        .unwrap();

    ctx.start_timer(&clock);
    clock.advance_secs(10 * 60);
    ctx.pause_timer(&clock);
    clock.advance_secs(5 * 60);
    ctx.start_timer(&clock);
    clock.advance_secs(15 * 60);

    let completed = ctx.poll_timer(&clock).expect("block completes");
    assert_eq!(completed.minutes(), 25);
    assert_eq!(ctx.session().focus_log(), &[completed]);
}

#[test]
fn reset_is_idempotent() {
    let (mut ctx, clock) = context();
    ctx.start_timer(&clock);
    clock.advance_secs(90);

    ctx.reset_timer();
    let once = ctx.timer_state(&clock);
    ctx.reset_timer();
    let twice = ctx.timer_state(&clock);

    assert_eq!(once, twice);
    assert_eq!(once.phase, TimerPhase::Idle);
    assert_eq!(once.elapsed_seconds, 0);
    assert_eq!(once.duration_target, 25 * 60);
}

#[test]
fn duration_is_locked_while_running() {
    let (mut ctx, clock) = context();
    ctx.start_timer(&clock);

    assert_eq!(
        ctx.set_timer_duration(&clock, 15 * 60),
        Err(TimerError::DurationLocked)
    );
    assert_eq!(ctx.timer_state(&clock).duration_target, 25 * 60);
}

#[test]
fn paused_duration_cannot_drop_below_elapsed() {
    let (mut ctx, clock) = context();
    ctx.start_timer(&clock);
    clock.advance_secs(10 * 60);
    ctx.pause_timer(&clock);

    assert_eq!(
        ctx.set_timer_duration(&clock, 5 * 60),
        Err(TimerError::BelowElapsed { elapsed_secs: 600 })
    );

    ctx.start_timer(&clock);
    clock.advance_secs(1);
    let state = ctx.timer_state(&clock);
    assert_eq!(state.phase, TimerPhase::Running);
    assert!(ctx.session().focus_log().is_empty());
}

#[test]
fn starting_twice_keeps_the_original_start() {
    let (mut ctx, clock) = context();
    ctx.start_timer(&clock);
    let started = ctx.timer_state(&clock).started_at_wall_clock;
    clock.advance_secs(30);
    ctx.start_timer(&clock);

    let state = ctx.timer_state(&clock);
    assert_eq!(state.started_at_wall_clock, started);
    assert_eq!(state.elapsed_seconds, 30);
}

#[test]
fn loading_another_session_resets_the_timer() {
    let (mut ctx, clock) = context();
    ctx.start_timer(&clock);
    clock.advance_secs(45);

    ctx.replace_session(Session::fresh(t0()));

    let state = ctx.timer_state(&clock);
    assert_eq!(state.phase, TimerPhase::Idle);
    assert_eq!(state.elapsed_seconds, 0);
}

#[test]
fn remaining_time_formats_as_minutes_and_seconds() {
    assert_eq!(format_mmss(25 * 60), "25:00");
    assert_eq!(format_mmss(65), "01:05");
    assert_eq!(format_mmss(0), "00:00");
}
