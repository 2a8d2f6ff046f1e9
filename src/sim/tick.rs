//! Frame-time simulation step
//!
//! Advances the race by the real time elapsed since the previous frame.
//! There is no fixed tick: a long frame simply moves every lane further.

use super::state::{RaceState, RoundPhase};
use crate::consts::{FINISH_PROGRESS, MAX_PROGRESS};
use crate::{lerp, sanitize_dt};

/// What happened during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to report (including "not running")
    Continue,
    /// A lane crossed the finish line this step
    Finished { lane: usize },
    /// The round timer ran out with no winner
    TimeUp,
}

/// Advance the race state by `dt` seconds
pub fn advance(state: &mut RaceState, dt: f32) -> StepOutcome {
    // Frozen unless running; a declared winner freezes the finish frame
    if !state.phase.is_running() || state.winner_lane.is_some() {
        return StepOutcome::Continue;
    }

    let dt = sanitize_dt(dt);
    let tuning = &state.tuning;

    state.time_remaining = (state.time_remaining - dt).max(0.0);
    let timed_out = state.time_remaining <= 0.0;

    // Lanes still integrate on the final frame of a timed-out round
    for lane in &mut state.lanes {
        let velocity = lane.velocity();
        let drag = lerp(1.0, tuning.drag_floor, lane.progress);
        let next = lane.progress + velocity * dt * tuning.speed_constant * drag;
        lane.progress = next.clamp(0.0, MAX_PROGRESS);

        let decay = dt * (tuning.boost_decay_base + lane.boost * tuning.boost_decay_proportional);
        lane.boost = (lane.boost - decay).max(0.0);
    }

    // Lowest lane index wins ties
    if let Some(lane) = state
        .lanes
        .iter()
        .position(|lane| lane.progress >= FINISH_PROGRESS)
    {
        state.winner_lane = Some(lane);
        state.lanes[lane].wins += 1;
        state.phase = RoundPhase::Finished;
        log::info!(
            "Round {} won by lane {} ({} wins)",
            state.round_number,
            lane + 1,
            state.lanes[lane].wins
        );
        return StepOutcome::Finished { lane };
    }

    if timed_out {
        state.phase = RoundPhase::TimeUp;
        log::info!("Round {} timed out with no winner", state.round_number);
        return StepOutcome::TimeUp;
    }

    StepOutcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{LANE_COUNT, MAX_BOOST};
    use proptest::prelude::*;

    fn running_state(seed: u64) -> RaceState {
        let mut state = RaceState::new(seed);
        state.phase = RoundPhase::Running;
        state
    }

    #[test]
    fn test_idle_is_noop() {
        let mut state = RaceState::new(1);
        let before = state.lanes;
        assert_eq!(advance(&mut state, 1.0), StepOutcome::Continue);
        assert_eq!(state.lanes, before);
        assert_eq!(state.time_remaining, 60.0);
    }

    #[test]
    fn test_lanes_move_forward() {
        let mut state = running_state(1);
        advance(&mut state, 0.5);
        for lane in &state.lanes {
            assert!(lane.progress > 0.0);
        }
        assert!((state.time_remaining - 59.5).abs() < 1e-5);
    }

    #[test]
    fn test_exact_integration_step() {
        let mut state = running_state(1);
        state.lanes[0].base_speed = 0.12;
        state.lanes[0].boost = 0.3;
        state.lanes[0].progress = 0.5;
        advance(&mut state, 0.1);
        // drag = lerp(1, 0.6, 0.5) = 0.8
        let expected = 0.5 + 0.42 * 0.1 * 0.36 * 0.8;
        assert!((state.lanes[0].progress - expected).abs() < 1e-6);
        // decay = 0.1 * (0.13 + 0.3 * 0.28)
        let expected_boost = 0.3 - 0.1 * (0.13 + 0.3 * 0.28);
        assert!((state.lanes[0].boost - expected_boost).abs() < 1e-6);
    }

    #[test]
    fn test_finish_declares_single_winner() {
        let mut state = running_state(3);
        state.lanes[0].progress = 0.999;
        state.lanes[0].base_speed = 0.15;
        state.lanes[0].boost = 0.0;

        let outcome = advance(&mut state, 0.1);

        assert_eq!(outcome, StepOutcome::Finished { lane: 0 });
        assert_eq!(state.winner_lane, Some(0));
        assert_eq!(state.phase, RoundPhase::Finished);
        assert_eq!(state.lanes[0].wins, 1);
        for lane in &state.lanes[1..] {
            assert_eq!(lane.wins, 0);
        }
    }

    #[test]
    fn test_tie_goes_to_lowest_lane() {
        let mut state = running_state(3);
        for i in [1, 4] {
            state.lanes[i].progress = 0.9999;
            state.lanes[i].boost = MAX_BOOST;
        }
        assert_eq!(advance(&mut state, 0.1), StepOutcome::Finished { lane: 1 });
        assert_eq!(state.lanes[4].wins, 0);
    }

    #[test]
    fn test_frozen_after_winner() {
        let mut state = running_state(3);
        state.lanes[2].progress = 0.999;
        state.lanes[2].boost = 0.5;
        advance(&mut state, 0.1);
        assert_eq!(state.winner_lane, Some(2));

        // Even if something forces the phase back, a set winner freezes physics
        state.phase = RoundPhase::Running;
        let lanes = state.lanes;
        let (bank, time) = (state.bank, state.time_remaining);
        assert_eq!(advance(&mut state, 0.5), StepOutcome::Continue);
        assert_eq!(advance(&mut state, 0.5), StepOutcome::Continue);
        assert_eq!(state.lanes, lanes);
        assert_eq!(state.bank, bank);
        assert_eq!(state.time_remaining, time);
        assert_eq!(state.lanes[2].wins, 1);
    }

    #[test]
    fn test_time_up_without_winner() {
        let mut state = running_state(5);
        state.time_remaining = 0.05;
        assert_eq!(advance(&mut state, 0.1), StepOutcome::TimeUp);
        assert_eq!(state.time_remaining, 0.0);
        assert_eq!(state.phase, RoundPhase::TimeUp);
        assert!(state.winner_lane.is_none());

        let lanes = state.lanes;
        advance(&mut state, 0.1);
        assert_eq!(state.lanes, lanes);
    }

    #[test]
    fn test_large_boost_keeps_lead_until_decayed() {
        let mut state = running_state(9);
        // Worst case for lane 2: slowest base speed against the fastest rivals
        for (i, lane) in state.lanes.iter_mut().enumerate() {
            lane.base_speed = if i == 2 { 0.112 } else { 0.1419 };
        }
        state.lanes[2].boost = state.tuning.large_boost;

        while state.lanes[2].boost > 0.0 {
            advance(&mut state, 1.0);
            for i in (0..LANE_COUNT).filter(|&i| i != 2) {
                assert!(state.lanes[2].progress > state.lanes[i].progress);
            }
        }
    }

    #[test]
    fn test_negative_and_nan_dt_are_ignored() {
        let mut state = running_state(1);
        let lanes = state.lanes;
        advance(&mut state, -1.0);
        advance(&mut state, f32::NAN);
        assert_eq!(state.lanes, lanes);
        assert_eq!(state.time_remaining, 60.0);
    }

    proptest! {
        #[test]
        fn prop_progress_monotonic_and_bounded(
            seed in any::<u64>(),
            boosts in proptest::collection::vec(0.0f32..=MAX_BOOST, LANE_COUNT),
            dts in proptest::collection::vec(0.0f32..2.0, 1..40),
        ) {
            let mut state = running_state(seed);
            for (lane, boost) in state.lanes.iter_mut().zip(&boosts) {
                lane.boost = *boost;
            }
            for dt in dts {
                let before = state.lanes;
                advance(&mut state, dt);
                for (old, new) in before.iter().zip(&state.lanes) {
                    prop_assert!(new.progress >= old.progress);
                    prop_assert!((0.0..=MAX_PROGRESS).contains(&new.progress));
                    prop_assert!(new.boost >= 0.0 && new.boost <= old.boost);
                }
            }
            prop_assert!(state.lanes.iter().map(|l| l.wins).sum::<u32>() <= 1);
        }
    }
}
