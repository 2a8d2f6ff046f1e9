//! Round lifecycle
//!
//! ```text
//! Idle --donation/start--> Running <--start/pause--> Paused
//! Running --lane finishes--> Finished --delay/next--> Idle (next round)
//! Running --time expires--> TimeUp --next/reset--> Idle
//! ```
//!
//! Delayed resets are explicit tasks that capture the round generation they
//! were scheduled for. When a task comes due it only resets the round if that
//! generation is still current, so a stale timer firing after a manual "next
//! round" does nothing.

use super::state::{RaceState, RoundPhase};

/// Discrete control actions from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Idle/Paused -> Running, Running -> Paused
    StartPause,
    /// Restart the current round (same round number)
    RestartRound,
    /// Advance to the next round
    NextRound,
}

/// Toggle between running and paused. Returns true if the phase changed.
pub fn toggle_start(state: &mut RaceState) -> bool {
    let next = match state.phase {
        RoundPhase::Idle | RoundPhase::Paused => RoundPhase::Running,
        RoundPhase::Running => RoundPhase::Paused,
        RoundPhase::Finished | RoundPhase::TimeUp => return false,
    };
    log::info!("Round {}: {} -> {}", state.round_number, state.phase.as_str(), next.as_str());
    state.phase = next;
    true
}

/// Start the next round. Wins and donor totals survive.
pub fn next_round(state: &mut RaceState) {
    state.round_number += 1;
    state.clear_round();
    log::info!("Round {} ready", state.round_number);
}

/// Restart the current round without advancing the round counter
pub fn restart_round(state: &mut RaceState) {
    state.clear_round();
    log::info!("Round {} restarted", state.round_number);
}

/// Apply a control action
pub fn apply_control(state: &mut RaceState, control: Control) -> bool {
    match control {
        Control::StartPause => toggle_start(state),
        Control::RestartRound => {
            restart_round(state);
            true
        }
        Control::NextRound => {
            next_round(state);
            true
        }
    }
}

/// Compare-and-reset: advance to the next round only if the round captured by
/// `generation` is still current and has ended.
pub fn reset_if_unchanged(state: &mut RaceState, generation: u64) -> bool {
    let ended = match state.phase {
        RoundPhase::Finished => state.winner_lane.is_some(),
        RoundPhase::TimeUp => true,
        _ => false,
    };
    if state.generation != generation || !ended {
        log::debug!(
            "Discarding stale reset (scheduled for generation {generation}, now {})",
            state.generation
        );
        return false;
    }
    next_round(state);
    true
}

/// A delayed round reset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResetTask {
    /// Round generation the task belongs to
    pub generation: u64,
    /// Seconds until the task fires
    pub remaining: f32,
}

/// Pending delayed resets, counted down by frame time
#[derive(Debug, Clone, Default)]
pub struct ResetTimers {
    tasks: Vec<ResetTask>,
}

impl ResetTimers {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Schedule a reset of the current round after `delay` seconds
    pub fn schedule(&mut self, state: &RaceState, delay: f32) {
        self.tasks.push(ResetTask {
            generation: state.generation,
            remaining: delay.max(0.0),
        });
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Count down and fire due tasks against `state`. Returns true if a reset happened.
    pub fn tick(&mut self, state: &mut RaceState, dt: f32) -> bool {
        let dt = crate::sanitize_dt(dt);
        for task in &mut self.tasks {
            task.remaining -= dt;
        }

        let mut reset = false;
        let mut i = 0;
        while i < self.tasks.len() {
            if self.tasks[i].remaining <= 0.0 {
                let task = self.tasks.remove(i);
                reset |= reset_if_unchanged(state, task.generation);
            } else {
                i += 1;
            }
        }
        reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{StepOutcome, advance, handle_donation};

    fn finished_state() -> RaceState {
        let mut state = RaceState::new(21);
        state.phase = RoundPhase::Running;
        state.lanes[5].progress = 0.9999;
        state.lanes[5].boost = 0.5;
        assert_eq!(advance(&mut state, 0.1), StepOutcome::Finished { lane: 5 });
        state
    }

    #[test]
    fn test_toggle_start() {
        let mut state = RaceState::new(1);
        assert!(toggle_start(&mut state));
        assert_eq!(state.phase, RoundPhase::Running);
        assert!(toggle_start(&mut state));
        assert_eq!(state.phase, RoundPhase::Paused);
        assert!(toggle_start(&mut state));
        assert_eq!(state.phase, RoundPhase::Running);

        state.phase = RoundPhase::Finished;
        assert!(!toggle_start(&mut state));
        assert_eq!(state.phase, RoundPhase::Finished);
    }

    #[test]
    fn test_next_round_preserves_durables() {
        let mut state = RaceState::new(21);
        handle_donation(&mut state, 0, 5, "@pluto");
        state.lanes[5].progress = 0.9999;
        state.lanes[5].boost = 0.5;
        advance(&mut state, 0.1);
        assert_eq!(state.winner_lane, Some(5));

        next_round(&mut state);
        assert_eq!(state.round_number, 2);
        assert_eq!(state.phase, RoundPhase::Idle);
        assert!(state.winner_lane.is_none());
        assert_eq!(state.bank, 0);
        assert_eq!(state.time_remaining, 60.0);
        assert_eq!(state.lanes[5].wins, 1);

        let wins = state.wins();
        let donors = state.donor_totals.clone();
        next_round(&mut state);
        assert_eq!(state.wins(), wins);
        assert_eq!(state.donor_totals, donors);
        assert_eq!(state.round_number, 3);
    }

    #[test]
    fn test_restart_keeps_round_number() {
        let mut state = finished_state();
        restart_round(&mut state);
        assert_eq!(state.round_number, 1);
        assert_eq!(state.phase, RoundPhase::Idle);
        assert!(state.lanes.iter().all(|l| l.progress == 0.0));
    }

    #[test]
    fn test_delayed_reset_fires_once() {
        let mut state = finished_state();
        let mut timers = ResetTimers::new();
        timers.schedule(&state, 2.4);

        assert!(!timers.tick(&mut state, 2.0));
        assert_eq!(state.phase, RoundPhase::Finished);
        assert!(timers.tick(&mut state, 0.5));
        assert_eq!(state.round_number, 2);
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_stale_timer_after_manual_next_round() {
        let mut state = finished_state();
        let mut timers = ResetTimers::new();
        timers.schedule(&state, 2.4);

        // Host clicks "next round" before the timer fires
        next_round(&mut state);
        assert_eq!(state.round_number, 2);

        // New round gets decided quickly
        state.phase = RoundPhase::Running;
        state.lanes[0].progress = 0.9999;
        state.lanes[0].boost = 0.5;
        advance(&mut state, 0.1);
        assert_eq!(state.winner_lane, Some(0));

        // The stale task must not reset round 2
        assert!(!timers.tick(&mut state, 3.0));
        assert_eq!(state.round_number, 2);
        assert_eq!(state.winner_lane, Some(0));
        assert_eq!(state.lanes[0].wins, 1);
    }

    #[test]
    fn test_duplicate_tasks_reset_once() {
        let mut state = finished_state();
        let mut timers = ResetTimers::new();
        timers.schedule(&state, 1.0);
        timers.schedule(&state, 1.0);
        assert!(timers.tick(&mut state, 1.5));
        assert_eq!(state.round_number, 2);
    }

    #[test]
    fn test_reset_requires_ended_round() {
        let mut state = RaceState::new(1);
        let generation = state.generation;
        state.phase = RoundPhase::Running;
        assert!(!reset_if_unchanged(&mut state, generation));
        state.phase = RoundPhase::TimeUp;
        assert!(reset_if_unchanged(&mut state, generation));
        assert_eq!(state.round_number, 2);
    }

    #[test]
    fn test_apply_control() {
        let mut state = RaceState::new(1);
        assert!(apply_control(&mut state, Control::StartPause));
        assert_eq!(state.phase, RoundPhase::Running);
        assert!(apply_control(&mut state, Control::NextRound));
        assert_eq!(state.round_number, 2);
        assert!(apply_control(&mut state, Control::RestartRound));
        assert_eq!(state.round_number, 2);
    }
}
