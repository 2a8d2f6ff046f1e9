//! Race state and core simulation types
//!
//! Everything the simulation step, donation handler and round lifecycle read or
//! write lives here. Visual effects are kept elsewhere so they can keep
//! animating while this state is frozen.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::LANE_COUNT;
use crate::tuning::RaceTuning;

/// Current phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Timer full, waiting for the first donation (or start control)
    #[default]
    Idle,
    /// Simulation advancing, donations accepted
    Running,
    /// Manually paused mid-round
    Paused,
    /// A lane crossed the finish line; frozen until the next round
    Finished,
    /// Time ran out without a winner; frozen until a manual reset
    TimeUp,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::Idle => "Idle",
            RoundPhase::Running => "Running",
            RoundPhase::Paused => "Paused",
            RoundPhase::Finished => "Finished",
            RoundPhase::TimeUp => "TimeUp",
        }
    }

    /// Whether the simulation step integrates physics in this phase
    pub fn is_running(&self) -> bool {
        matches!(self, RoundPhase::Running)
    }
}

/// One racing lane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    /// 0 = start line, 1 = finish line, up to 1.2 overshoot
    pub progress: f32,
    /// Rolled at the start of every round
    pub base_speed: f32,
    /// Donation boost, decays over time, never negative
    pub boost: f32,
    /// Rounds won (survives resets)
    pub wins: u32,
}

impl Lane {
    fn new(base_speed: f32) -> Self {
        Self {
            progress: 0.0,
            base_speed,
            boost: 0.0,
            wins: 0,
        }
    }

    /// Current lane velocity before drag
    #[inline]
    pub fn velocity(&self) -> f32 {
        self.base_speed + self.boost
    }
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    /// A fresh generator for the given stream; each round rolls from its own stream
    pub fn to_rng(&self, stream: u64) -> Pcg32 {
        Pcg32::new(self.seed, stream.wrapping_mul(2).wrapping_add(1))
    }
}

/// Complete race state for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceState {
    /// Session seed for base speed rolls
    pub rng_state: RngState,
    /// Balance knobs (copied so the state is self-contained)
    pub tuning: RaceTuning,
    /// Current phase
    pub phase: RoundPhase,
    pub lanes: [Lane; LANE_COUNT],
    /// Seconds left in the round (clamped at 0)
    pub time_remaining: f32,
    /// Donations collected this round
    pub bank: u64,
    /// Cumulative donations per donor (survives resets)
    pub donor_totals: BTreeMap<String, u64>,
    /// 1-based round counter
    pub round_number: u32,
    /// Set exactly once per round
    pub winner_lane: Option<usize>,
    /// Bumped on every reset (including restarts of the same round number);
    /// delayed tasks capture it to detect that the round they belong to is gone
    pub generation: u64,
}

impl RaceState {
    /// Create a new race with the given seed and default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, RaceTuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: RaceTuning) -> Self {
        let tuning = tuning.sanitize();
        let mut state = Self {
            rng_state: RngState::new(seed),
            phase: RoundPhase::Idle,
            lanes: [Lane::new(tuning.base_speed_min); LANE_COUNT],
            time_remaining: tuning.round_seconds,
            bank: 0,
            donor_totals: BTreeMap::new(),
            round_number: 1,
            winner_lane: None,
            generation: 0,
            tuning,
        };
        state.roll_base_speeds();
        state
    }

    /// Re-roll every lane's base speed from this generation's RNG stream
    pub fn roll_base_speeds(&mut self) {
        let mut rng = self.rng_state.to_rng(self.generation);
        let (min, max) = (self.tuning.base_speed_min, self.tuning.base_speed_max);
        for lane in &mut self.lanes {
            lane.base_speed = if max > min {
                rng.random_range(min..max)
            } else {
                min
            };
        }
    }

    /// Clear per-round fields; `wins` and `donor_totals` are untouched
    pub(crate) fn clear_round(&mut self) {
        for lane in &mut self.lanes {
            lane.progress = 0.0;
            lane.boost = 0.0;
        }
        self.time_remaining = self.tuning.round_seconds;
        self.bank = 0;
        self.winner_lane = None;
        self.phase = RoundPhase::Idle;
        self.generation += 1;
        self.roll_base_speeds();
    }

    /// Per-lane win counters
    pub fn wins(&self) -> [u32; LANE_COUNT] {
        self.lanes.map(|lane| lane.wins)
    }

    /// Total wins across lanes
    pub fn total_wins(&self) -> u32 {
        self.lanes.iter().map(|lane| lane.wins).sum()
    }

    /// Top donors by cumulative amount (highest first, then by name)
    pub fn top_donors(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut donors: Vec<(&str, u64)> = self
            .donor_totals
            .iter()
            .map(|(name, total)| (name.as_str(), *total))
            .collect();
        donors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        donors.truncate(limit);
        donors
    }

    /// Whole seconds left, rounded up for display
    pub fn seconds_left(&self) -> u32 {
        self.time_remaining.max(0.0).ceil() as u32
    }
}
