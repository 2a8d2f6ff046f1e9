//! Data-driven race balance
//!
//! Every number that shapes how a race feels lives here so a host can ship a
//! JSON override without touching the simulation.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_BOOST;
use crate::persistence::KeyValueStore;
use crate::sim::Tier;

/// Upper bound for a lane's base speed (progress per second before scaling)
const MAX_BASE_SPEED: f32 = 5.0;

/// Race balance knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceTuning {
    /// Round length in seconds
    pub round_seconds: f32,
    /// Base speed band; each lane rolls `[min, max)` every round
    pub base_speed_min: f32,
    pub base_speed_max: f32,
    /// Converts lane velocity into progress per second
    pub speed_constant: f32,
    /// Drag multiplier at the finish line (1.0 at the start)
    pub drag_floor: f32,
    /// Boost decay: `dt * (decay_base + boost * decay_proportional)`
    pub boost_decay_base: f32,
    pub boost_decay_proportional: f32,
    /// Upper bound for a lane's boost
    pub max_boost: f32,
    /// Donation amount thresholds for the medium and large tiers
    pub medium_threshold: u64,
    pub large_threshold: u64,
    /// Boost added per tier
    pub small_boost: f32,
    pub medium_boost: f32,
    pub large_boost: f32,
    /// Delay before a finished round resets itself
    pub reset_delay: f32,
    /// Delay before a timed-out round resets itself (None = wait for a manual reset)
    pub timeout_reset_delay: Option<f32>,
    /// Effect decay rate while the race is not running
    pub paused_effect_rate: f32,
    /// Effect lifetimes (seconds at full rate)
    pub pop_life: f32,
    pub particle_life: f32,
    pub trail_life: f32,
    pub flame_life: f32,
}

impl Default for RaceTuning {
    fn default() -> Self {
        Self {
            round_seconds: 60.0,
            base_speed_min: 0.112,
            base_speed_max: 0.142,
            speed_constant: 0.36,
            drag_floor: 0.60,
            boost_decay_base: 0.13,
            boost_decay_proportional: 0.28,
            max_boost: MAX_BOOST,
            medium_threshold: 5,
            large_threshold: 20,
            small_boost: 0.10,
            medium_boost: 0.18,
            large_boost: 0.30,
            reset_delay: 2.4,
            timeout_reset_delay: None,
            paused_effect_rate: 0.8,
            pop_life: 1.05,
            particle_life: 0.9,
            trail_life: 0.45,
            flame_life: 1.2,
        }
    }
}

impl RaceTuning {
    /// Storage key for operator overrides
    pub const STORAGE_KEY: &'static str = "drag_race_tuning";

    /// Overrides saved under [`Self::STORAGE_KEY`], or the defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => {
                log::info!("Using tuning overrides");
                Self::from_json(&json)
            }
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("{e}; using default tuning");
                Self::default()
            }
        }
    }

    /// Parse tuning overrides; missing fields keep their defaults, malformed
    /// JSON falls back to the defaults entirely.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<RaceTuning>(json) {
            Ok(tuning) => tuning.sanitize(),
            Err(e) => {
                log::warn!("Ignoring malformed tuning ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Clamp values that would break simulation invariants
    pub fn sanitize(mut self) -> Self {
        let defaults = Self::default();

        if !(self.round_seconds.is_finite() && self.round_seconds > 0.0) {
            self.round_seconds = defaults.round_seconds;
        }
        if !(0.0..MAX_BASE_SPEED).contains(&self.base_speed_min) {
            self.base_speed_min = defaults.base_speed_min;
        }
        if !(self.base_speed_max.is_finite() && self.base_speed_max > self.base_speed_min) {
            self.base_speed_max = self.base_speed_min + 0.03;
        }
        self.base_speed_max = self.base_speed_max.min(MAX_BASE_SPEED);
        // The band must stay a non-empty sampling range
        if !(self.base_speed_max > self.base_speed_min) {
            self.base_speed_min = defaults.base_speed_min;
            self.base_speed_max = defaults.base_speed_max;
        }
        if !(self.speed_constant.is_finite() && self.speed_constant > 0.0) {
            self.speed_constant = defaults.speed_constant;
        }
        self.drag_floor = finite_or(self.drag_floor, defaults.drag_floor).clamp(0.05, 1.0);
        self.boost_decay_base = finite_or(self.boost_decay_base, defaults.boost_decay_base).max(0.0);
        self.boost_decay_proportional =
            finite_or(self.boost_decay_proportional, defaults.boost_decay_proportional).max(0.0);
        if !(self.max_boost.is_finite() && self.max_boost > 0.0) {
            self.max_boost = defaults.max_boost;
        }
        if self.medium_threshold == 0 || self.large_threshold <= self.medium_threshold {
            self.medium_threshold = defaults.medium_threshold;
            self.large_threshold = defaults.large_threshold;
        }
        self.small_boost = finite_or(self.small_boost, defaults.small_boost).max(0.0);
        self.medium_boost = finite_or(self.medium_boost, defaults.medium_boost).max(0.0);
        self.large_boost = finite_or(self.large_boost, defaults.large_boost).max(0.0);
        self.reset_delay = finite_or(self.reset_delay, defaults.reset_delay).max(0.0);
        self.timeout_reset_delay = self
            .timeout_reset_delay
            .filter(|d| d.is_finite())
            .map(|d| d.max(0.0));
        self.paused_effect_rate =
            finite_or(self.paused_effect_rate, defaults.paused_effect_rate).clamp(0.0, 1.0);
        self.pop_life = finite_or(self.pop_life, defaults.pop_life).max(0.05);
        self.particle_life = finite_or(self.particle_life, defaults.particle_life).max(0.05);
        self.trail_life = finite_or(self.trail_life, defaults.trail_life).max(0.05);
        self.flame_life = finite_or(self.flame_life, defaults.flame_life).max(0.05);
        self
    }

    /// Classify a donation amount
    pub fn tier_for(&self, amount: u64) -> Tier {
        if amount >= self.large_threshold {
            Tier::Large
        } else if amount >= self.medium_threshold {
            Tier::Medium
        } else {
            Tier::Small
        }
    }

    /// Boost injected by a tier
    pub fn boost_for(&self, tier: Tier) -> f32 {
        match tier {
            Tier::Small => self.small_boost,
            Tier::Medium => self.medium_boost,
            Tier::Large => self.large_boost,
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_load_overrides_from_store() {
        let mut store = MemoryStore::new();
        assert_eq!(RaceTuning::load(&store), RaceTuning::default());

        store
            .set(RaceTuning::STORAGE_KEY, r#"{"round_seconds":30,"reset_delay":1.0}"#)
            .unwrap();
        let tuning = RaceTuning::load(&store);
        assert_eq!(tuning.round_seconds, 30.0);
        assert_eq!(tuning.reset_delay, 1.0);
        assert_eq!(tuning.large_threshold, 20);
    }

    #[test]
    fn test_tiers() {
        let tuning = RaceTuning::default();
        assert_eq!(tuning.tier_for(1), Tier::Small);
        assert_eq!(tuning.tier_for(4), Tier::Small);
        assert_eq!(tuning.tier_for(5), Tier::Medium);
        assert_eq!(tuning.tier_for(19), Tier::Medium);
        assert_eq!(tuning.tier_for(20), Tier::Large);
        assert_eq!(tuning.tier_for(500), Tier::Large);
        assert!(tuning.boost_for(Tier::Large) > tuning.boost_for(Tier::Medium));
        assert!(tuning.boost_for(Tier::Medium) > tuning.boost_for(Tier::Small));
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tuning = RaceTuning::from_json(r#"{ "round_seconds": 30.0, "reset_delay": 2.6 }"#);
        assert_eq!(tuning.round_seconds, 30.0);
        assert_eq!(tuning.reset_delay, 2.6);
        assert_eq!(tuning.max_boost, MAX_BOOST);
    }

    #[test]
    fn test_malformed_json_falls_back() {
        assert_eq!(RaceTuning::from_json("{ not json"), RaceTuning::default());
    }

    #[test]
    fn test_sanitize_rejects_broken_values() {
        let tuning = RaceTuning {
            round_seconds: -5.0,
            base_speed_max: 0.0,
            drag_floor: f32::NAN,
            large_threshold: 2,
            timeout_reset_delay: Some(f32::INFINITY),
            ..Default::default()
        }
        .sanitize();
        assert_eq!(tuning.round_seconds, 60.0);
        assert!(tuning.base_speed_max > tuning.base_speed_min);
        assert_eq!(tuning.drag_floor, 0.60);
        assert_eq!(tuning.medium_threshold, 5);
        assert_eq!(tuning.large_threshold, 20);
        assert_eq!(tuning.timeout_reset_delay, None);
    }

    #[test]
    fn test_huge_base_speed_keeps_a_sampling_band() {
        let tuning = RaceTuning::from_json(r#"{"base_speed_min":100000000.0}"#);
        assert!(tuning.base_speed_max > tuning.base_speed_min);
        assert_eq!(tuning.base_speed_min, 0.112);

        // min + 0.03 rounds back to min at this magnitude
        let tuning = RaceTuning {
            base_speed_min: 4.99,
            base_speed_max: 1.0e9,
            ..Default::default()
        }
        .sanitize();
        assert!(tuning.base_speed_max > tuning.base_speed_min);
        assert!(tuning.base_speed_max <= MAX_BASE_SPEED);

        let mut state = crate::sim::RaceState::with_tuning(1, tuning);
        state.roll_base_speeds();
        assert!(state.lanes.iter().all(|l| l.base_speed >= 4.99));
    }
}
