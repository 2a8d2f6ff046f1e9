//! Race session: the context object the host drives
//!
//! Owns the race state, the effect arena, pending delayed resets, the feed and
//! the outgoing effect requests. The host calls [`RaceSession::frame`] once per
//! display refresh and forwards taps and control clicks between frames; all of
//! it runs on one thread.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::donation::{DonationReceipt, TEST_AMOUNTS, Tier, handle_donation, roll_demo_donation};
use super::effects::EffectsScheduler;
use super::lifecycle::{Control, ResetTimers, apply_control};
use super::road::{ROAD, Viewport};
use super::snapshot::{FeedEntry, FrameSnapshot};
use super::state::{RaceState, RoundPhase};
use super::tick::{StepOutcome, advance};
use crate::consts::MAX_FRAME_DT;
use crate::settings::Settings;
use crate::standings::Standings;
use crate::tuning::RaceTuning;

/// Feed lines kept on screen
pub const FEED_LENGTH: usize = 6;
/// Particle burst speed (stage px/s) for the smallest tier
const BURST_SPEED: f32 = 220.0;
/// Most simulation steps one frame is split into; beyond this steps grow
const MAX_SUBSTEPS: usize = 1200;

/// Abstract effect requests for the audio/visual host
#[derive(Debug, Clone, PartialEq)]
pub enum EffectRequest {
    Donation { lane: usize, amount: u64, tier: Tier },
    RoundStarted { round: u32 },
    Finish { lane: usize },
    TimeUp,
    RoundReset { round: u32 },
}

/// One race session
#[derive(Debug, Clone)]
pub struct RaceSession {
    pub state: RaceState,
    pub effects: EffectsScheduler,
    timers: ResetTimers,
    feed: Vec<FeedEntry>,
    requests: Vec<EffectRequest>,
    demo_rng: Pcg32,
    trail_steps: Option<u32>,
    trails_enabled: bool,
    standings_dirty: bool,
}

impl RaceSession {
    pub fn new(seed: u64, tuning: RaceTuning, settings: &Settings) -> Self {
        let state = RaceState::with_tuning(seed, tuning);
        let mut effects = EffectsScheduler::new(settings.effect_pool_size(), seed);
        effects.paused_rate = state.tuning.paused_effect_rate;
        let mut session = Self {
            state,
            effects,
            timers: ResetTimers::new(),
            feed: Vec::with_capacity(FEED_LENGTH + 1),
            requests: Vec::new(),
            demo_rng: Pcg32::seed_from_u64(seed.rotate_left(17)),
            trail_steps: None,
            trails_enabled: true,
            standings_dirty: false,
        };
        session.apply_settings(settings);
        log::info!("Race session created (seed {seed})");
        session
    }

    /// Restore durable counters saved by a previous session
    pub fn with_standings(mut self, standings: &Standings) -> Self {
        standings.apply_to(&mut self.state);
        self
    }

    /// Apply preferences that can change mid-session
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.trail_steps = settings.trail_steps();
        self.trails_enabled = settings.trails;
        self.effects.reduced_motion = !settings.effective_screen_shake();
        if self.effects.reduced_motion {
            self.effects.shake = 0.0;
            self.effects.flash = 0.0;
        }
        self.effects.particles = settings.particles;
        self.effects.resize_pool(settings.effect_pool_size());
    }

    // === Input ===

    /// Apply a donation and schedule its effects
    pub fn donate(&mut self, lane: usize, amount: u64, donor: &str) -> Option<DonationReceipt> {
        let receipt = handle_donation(&mut self.state, lane, amount, donor)?;
        let tuning = &self.state.tuning;
        let icon = receipt.tier.icon(lane);

        self.effects
            .spawn_pop(lane, format!("{icon} +{amount}"), tuning.pop_life);
        self.effects.spawn_burst(
            lane,
            receipt.tier.burst_size(),
            tuning.particle_life,
            BURST_SPEED * (1.0 + receipt.tier as usize as f32 * 0.5),
        );
        let glow = self.state.lanes[lane].boost / tuning.max_boost;
        self.effects.spawn_flame(lane, glow, tuning.flame_life);
        self.effects.add_shake(receipt.tier.shake());

        self.push_feed(FeedEntry {
            donor: receipt.donor.clone(),
            lane,
            amount,
            message: receipt.tier.as_str().to_string(),
            icon,
        });
        if receipt.started_round {
            self.requests.push(EffectRequest::RoundStarted {
                round: self.state.round_number,
            });
        }
        self.requests.push(EffectRequest::Donation {
            lane,
            amount,
            tier: receipt.tier,
        });
        self.standings_dirty = true;
        Some(receipt)
    }

    /// A tap at a stage-space point: simulated donation to the lane under it
    pub fn tap(&mut self, point: Vec2) -> Option<DonationReceipt> {
        let lane = ROAD.lane_at(point)?;
        let (donor, amount) = roll_demo_donation(&mut self.demo_rng);
        self.donate(lane, amount, donor)
    }

    /// A tap in client coordinates of the drawing surface
    pub fn tap_client(&mut self, viewport: &Viewport, x: f32, y: f32) -> Option<DonationReceipt> {
        let point = viewport.to_stage(x, y)?;
        self.tap(point)
    }

    /// A test-donation button: `preset` indexes [`TEST_AMOUNTS`]
    pub fn test_donation(&mut self, lane: usize, preset: usize) -> Option<DonationReceipt> {
        let amount = *TEST_AMOUNTS.get(preset)?;
        self.donate(lane, amount, "@tester")
    }

    /// Start/pause, restart, next round
    pub fn control(&mut self, control: Control) -> bool {
        let changed = apply_control(&mut self.state, control);
        if changed && matches!(control, Control::RestartRound | Control::NextRound) {
            self.on_round_reset();
        }
        changed
    }

    // === Frame loop ===

    /// Advance one display frame by `dt` seconds of wall time
    ///
    /// Long deltas are split into steps of at most [`MAX_FRAME_DT`] so the
    /// round clock and reset delays keep wall-clock pace on slow devices.
    /// Returns the first non-`Continue` outcome of the frame.
    pub fn frame(&mut self, dt: f32) -> StepOutcome {
        let dt = crate::sanitize_dt(dt);
        let steps = ((dt / MAX_FRAME_DT).ceil() as usize).clamp(1, MAX_SUBSTEPS);
        let step = dt / steps as f32;

        let mut result = StepOutcome::Continue;
        for _ in 0..steps {
            let outcome = self.step(step);
            if result == StepOutcome::Continue {
                result = outcome;
            }
        }
        result
    }

    fn step(&mut self, dt: f32) -> StepOutcome {
        let outcome = advance(&mut self.state, dt);
        match outcome {
            StepOutcome::Finished { lane } => self.on_finish(lane),
            StepOutcome::TimeUp => self.on_time_up(),
            StepOutcome::Continue => {}
        }

        let running = self.state.phase.is_running();
        if running && self.trails_enabled {
            self.effects
                .emit_trails(&self.state, dt, self.state.tuning.trail_life);
        }
        self.effects.tick(dt, running);

        if self.timers.tick(&mut self.state, dt) {
            self.on_round_reset();
        }
        outcome
    }

    fn on_finish(&mut self, lane: usize) {
        let tuning = &self.state.tuning;
        self.timers.schedule(&self.state, tuning.reset_delay);
        self.effects.trigger_flash(1.0);
        self.effects.add_shake(0.6);
        self.effects
            .spawn_burst(lane, Tier::Large.burst_size() * 2, tuning.particle_life * 1.5, BURST_SPEED * 2.0);
        self.push_feed(FeedEntry {
            donor: "SYSTEM".to_string(),
            lane,
            amount: 0,
            message: "Finish!".to_string(),
            icon: "🏁",
        });
        self.requests.push(EffectRequest::Finish { lane });
        self.standings_dirty = true;
    }

    fn on_time_up(&mut self) {
        if let Some(delay) = self.state.tuning.timeout_reset_delay {
            self.timers.schedule(&self.state, delay);
        }
        self.requests.push(EffectRequest::TimeUp);
    }

    fn on_round_reset(&mut self) {
        self.feed.clear();
        self.effects.clear_trails();
        self.requests.push(EffectRequest::RoundReset {
            round: self.state.round_number,
        });
    }

    fn push_feed(&mut self, entry: FeedEntry) {
        self.feed.insert(0, entry);
        self.feed.truncate(FEED_LENGTH);
    }

    // === Outputs ===

    /// Read-only view for drawing this frame
    pub fn snapshot(&self) -> FrameSnapshot<'_> {
        FrameSnapshot::capture(&self.state, &self.effects, &self.feed, self.trail_steps)
    }

    /// Take the effect requests queued since the last call
    pub fn drain_requests(&mut self) -> Vec<EffectRequest> {
        std::mem::take(&mut self.requests)
    }

    /// True once after wins or donor totals changed
    pub fn take_standings_dirty(&mut self) -> bool {
        std::mem::take(&mut self.standings_dirty)
    }

    pub fn standings(&self) -> Standings {
        Standings::from_state(&self.state)
    }

    pub fn feed(&self) -> &[FeedEntry] {
        &self.feed
    }

    pub fn pending_resets(&self) -> usize {
        self.timers.pending()
    }

    pub fn phase(&self) -> RoundPhase {
        self.state.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::LANE_COUNT;
    use crate::sim::EffectKind;

    fn session() -> RaceSession {
        RaceSession::new(5, RaceTuning::default(), &Settings::default())
    }

    #[test]
    fn test_donation_spawns_effects_and_requests() {
        let mut s = session();
        let receipt = s.donate(1, 20, "@max").unwrap();
        assert_eq!(receipt.tier, Tier::Large);
        assert_eq!(s.phase(), RoundPhase::Running);

        let requests = s.drain_requests();
        assert_eq!(
            requests,
            vec![
                EffectRequest::RoundStarted { round: 1 },
                EffectRequest::Donation { lane: 1, amount: 20, tier: Tier::Large },
            ]
        );
        assert!(s.drain_requests().is_empty());
        assert_eq!(s.feed().len(), 1);
        assert!(!s.effects.is_empty());
        assert!(s.take_standings_dirty());
        assert!(!s.take_standings_dirty());
    }

    #[test]
    fn test_tap_outside_road_is_ignored() {
        let mut s = session();
        assert!(s.tap(Vec2::new(1070.0, 1600.0)).is_none());
        assert_eq!(s.state.bank, 0);
        assert_eq!(s.phase(), RoundPhase::Idle);
        assert!(s.drain_requests().is_empty());
    }

    #[test]
    fn test_tap_on_lane_donates_to_that_lane() {
        let mut s = session();
        let x = ROAD.left(0.1) + ROAD.lane_width(0.1) * 4.5;
        let receipt = s.tap(Vec2::new(x, ROAD.project_y(0.1))).unwrap();
        assert_eq!(receipt.lane, 4);
        assert_eq!(s.state.bank, receipt.amount);
    }

    #[test]
    fn test_tap_client_maps_viewport() {
        let mut s = session();
        // Half-size surface offset by (100, 50)
        let vp = Viewport::new(100.0, 50.0, 540.0, 960.0);
        let stage = Vec2::new(ROAD.left(0.0) + ROAD.lane_width(0.0) * 0.5, 1600.0);
        let receipt = s
            .tap_client(&vp, 100.0 + stage.x / 2.0, 50.0 + stage.y / 2.0)
            .unwrap();
        assert_eq!(receipt.lane, 0);
    }

    #[test]
    fn test_feed_is_bounded() {
        let mut s = session();
        for i in 0..10 {
            s.test_donation(i % LANE_COUNT, 0);
        }
        assert_eq!(s.feed().len(), FEED_LENGTH);
        assert!(s.test_donation(0, TEST_AMOUNTS.len()).is_none());
    }

    #[test]
    fn test_finish_schedules_reset_and_effects() {
        let mut s = session();
        s.donate(0, 1, "@neo");
        s.state.lanes[3].progress = 0.9999;
        s.state.lanes[3].boost = 0.5;
        s.drain_requests();

        assert_eq!(s.frame(0.05), StepOutcome::Finished { lane: 3 });
        assert_eq!(s.pending_resets(), 1);
        assert!(s.effects.flash > 0.0);
        assert_eq!(s.drain_requests(), vec![EffectRequest::Finish { lane: 3 }]);
        assert_eq!(s.feed()[0].donor, "SYSTEM");

        // Frozen while the reset delay runs
        let lanes = s.state.lanes;
        for _ in 0..10 {
            s.frame(0.1);
        }
        assert_eq!(s.state.lanes, lanes);
        assert_eq!(s.state.round_number, 1);

        // 2.4 s after the finish the next round begins
        for _ in 0..20 {
            s.frame(0.1);
        }
        assert_eq!(s.state.round_number, 2);
        assert_eq!(s.phase(), RoundPhase::Idle);
        assert_eq!(s.state.lanes[3].wins, 1);
        assert!(s.feed().is_empty());
        assert_eq!(s.drain_requests(), vec![EffectRequest::RoundReset { round: 2 }]);
    }

    #[test]
    fn test_effects_decay_while_frozen() {
        let mut s = session();
        s.donate(2, 5, "@luna");
        s.control(Control::StartPause);
        assert_eq!(s.phase(), RoundPhase::Paused);
        let lanes = s.state.lanes;
        for _ in 0..200 {
            s.frame(1.0 / 60.0);
        }
        assert_eq!(s.state.lanes, lanes);
        assert!(s.effects.is_empty());
    }

    #[test]
    fn test_time_up_stays_until_manual_reset() {
        let mut s = session();
        s.control(Control::StartPause);
        s.state.time_remaining = 0.05;
        assert_eq!(s.frame(0.1), StepOutcome::TimeUp);
        for _ in 0..100 {
            s.frame(0.1);
        }
        assert_eq!(s.phase(), RoundPhase::TimeUp);
        assert_eq!(s.pending_resets(), 0);

        assert!(s.control(Control::NextRound));
        assert_eq!(s.phase(), RoundPhase::Idle);
        assert_eq!(s.state.round_number, 2);
    }

    #[test]
    fn test_time_up_auto_reset_when_configured() {
        let tuning = RaceTuning {
            timeout_reset_delay: Some(1.0),
            ..Default::default()
        };
        let mut s = RaceSession::new(5, tuning, &Settings::default());
        s.control(Control::StartPause);
        s.state.time_remaining = 0.05;
        s.frame(0.1);
        for _ in 0..11 {
            s.frame(0.1);
        }
        assert_eq!(s.state.round_number, 2);
    }

    #[test]
    fn test_long_frames_keep_wall_clock_pace() {
        let mut coarse = session();
        let mut fine = session();
        coarse.control(Control::StartPause);
        fine.control(Control::StartPause);

        coarse.frame(1.0);
        for _ in 0..10 {
            fine.frame(0.1);
        }
        assert!((coarse.state.time_remaining - 59.0).abs() < 1e-3);
        assert!((coarse.state.time_remaining - fine.state.time_remaining).abs() < 1e-4);
        for (a, b) in coarse.state.lanes.iter().zip(&fine.state.lanes) {
            assert!((a.progress - b.progress).abs() < 1e-3);
        }
    }

    #[test]
    fn test_slow_device_still_ends_the_round() {
        let mut s = session();
        s.control(Control::StartPause);
        for _ in 0..120 {
            s.frame(0.5);
        }
        assert_ne!(s.phase(), RoundPhase::Running);
        assert!(s.state.time_remaining <= 0.0 || s.state.round_number == 2 || s.state.winner_lane.is_some());
    }

    #[test]
    fn test_one_long_frame_fires_the_reset() {
        let mut s = session();
        s.control(Control::StartPause);
        s.state.lanes[2].progress = 0.9999;
        assert_eq!(s.frame(0.05), StepOutcome::Finished { lane: 2 });

        // A single 2.5 s frame covers the whole reset delay
        s.frame(2.5);
        assert_eq!(s.state.round_number, 2);
        assert_eq!(s.phase(), RoundPhase::Idle);
    }

    #[test]
    fn test_trails_survive_particles_off() {
        let settings = Settings {
            particles: false,
            ..Default::default()
        };
        let mut s = RaceSession::new(5, RaceTuning::default(), &settings);
        s.donate(2, 20, "@max");
        for _ in 0..10 {
            s.frame(0.05);
        }
        assert_eq!(s.effects.count_kind(EffectKind::Particle), 0);
        assert!(s.effects.count_kind(EffectKind::TrailPoint) > 0);
    }

    #[test]
    fn test_settings_change_mid_session() {
        let mut s = session();
        let mut settings = Settings::default();
        s.donate(0, 20, "@max");
        assert!(s.effects.count_kind(EffectKind::Particle) > 0);

        settings.toggle(crate::SettingsToggle::CycleQuality);
        settings.toggle(crate::SettingsToggle::Particles);
        settings.toggle(crate::SettingsToggle::ReducedMotion);
        s.apply_settings(&settings);
        assert_eq!(s.effects.pool_capacity(), 512);
        assert_eq!(s.effects.count_kind(EffectKind::Particle), 0);
        assert_eq!(s.effects.count_kind(EffectKind::PopText), 1);

        s.donate(0, 20, "@max");
        assert_eq!(s.effects.count_kind(EffectKind::Particle), 0);
        assert_eq!(s.effects.shake, 0.0);
    }

    #[test]
    fn test_standings_restore() {
        let mut standings = Standings::default();
        standings.wins[4] = 9;
        standings.donors.insert("@queen".into(), 40);
        let s = session().with_standings(&standings);
        assert_eq!(s.state.lanes[4].wins, 9);
        assert_eq!(s.standings(), standings);
    }

    #[test]
    fn test_trails_follow_settings() {
        let settings = Settings {
            trails: false,
            ..Default::default()
        };
        let mut s = RaceSession::new(5, RaceTuning::default(), &settings);
        s.donate(0, 20, "@max");
        s.frame(0.05);
        s.frame(0.05);
        assert_eq!(s.effects.count_kind(EffectKind::TrailPoint), 0);
        assert!(s.snapshot().lanes[0].trail.is_empty());
    }
}
