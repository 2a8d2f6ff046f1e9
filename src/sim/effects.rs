//! Visual effect scheduling
//!
//! Effects are time-limited records keyed by lane. They live in a fixed-size
//! arena: pop-text and flame glow own one dedicated slot per lane (a new
//! request replaces the old one), particles and trail points share a pool of
//! slots managed by a free-list. Effects keep animating while the race is
//! frozen, just a little slower.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::road::ROAD;
use super::state::RaceState;
use crate::consts::LANE_COUNT;

/// Pop-text rises this far (stage px) over its life
const POP_RISE: f32 = 100.0;
/// Pop-text life the rise and fade curves are shaped for
const POP_REFERENCE_LIFE: f32 = 1.05;
/// Pop-text baseline above the car
const POP_LIFT: f32 = 160.0;
/// Smallest pop-text scale (keeps far text readable)
const POP_MIN_SCALE: f32 = 0.55;
/// Flame glow sits this far behind (below) the car, before depth scaling
const FLAME_OFFSET: f32 = 40.0;
/// Particle velocity damping per second
const PARTICLE_DRAG: f32 = 2.5;
/// Particle downward pull (stage px/s²)
const PARTICLE_GRAVITY: f32 = 260.0;
/// Seconds between trail points for a boosted lane
const TRAIL_INTERVAL: f32 = 0.05;
/// Minimum boost that leaves a trail
const TRAIL_MIN_BOOST: f32 = 0.05;
/// Exponential decay rates (per second) for screen shake and flash
const SHAKE_DECAY: f32 = 6.0;
const FLASH_DECAY: f32 = 3.0;
/// Shake amplitude in stage px at intensity 1.0
const SHAKE_PIXELS: f32 = 18.0;

/// Kind of visual effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    TrailPoint,
    PopText,
    Particle,
    FlameGlow,
}

/// Kind-specific effect data
#[derive(Debug, Clone, PartialEq)]
pub enum EffectPayload {
    Text(String),
    Velocity(Vec2),
    Intensity(f32),
}

/// A live effect
#[derive(Debug, Clone, PartialEq)]
pub struct EffectRecord {
    pub kind: EffectKind,
    pub lane: usize,
    /// Counts down to zero, then the record is released
    pub remaining_life: f32,
    pub max_life: f32,
    pub payload: EffectPayload,
    /// Displacement from the anchor (particles)
    pub offset: Vec2,
    /// Progress the effect is pinned to; `None` follows the lane's car
    pub anchor: Option<f32>,
}

impl EffectRecord {
    /// Remaining life as a fraction of the starting life
    pub fn life_fraction(&self) -> f32 {
        if self.max_life > 0.0 {
            (self.remaining_life / self.max_life).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Screen-space placement for drawing, given the lane's current progress
    pub fn view(&self, lane_progress: f32) -> EffectView<'_> {
        let t = self.anchor.unwrap_or(lane_progress);
        let car = ROAD.car_position(self.lane, t);
        let fade = self.life_fraction();

        let (pos, opacity, scale, intensity) = match self.kind {
            EffectKind::PopText => {
                // Timeline of a default-length pop, stretched to this record's life
                let clock = fade * POP_REFERENCE_LIFE;
                let rise = (1.0 - clock) * POP_RISE;
                (
                    car.pos - Vec2::new(0.0, POP_LIFT + rise),
                    clock.clamp(0.0, 1.0),
                    car.scale.max(POP_MIN_SCALE),
                    1.0,
                )
            }
            EffectKind::Particle => (
                car.pos + self.offset * car.scale,
                fade,
                car.scale * (0.5 + 0.5 * fade),
                1.0,
            ),
            EffectKind::TrailPoint => {
                let p = ROAD.project(self.lane, t);
                (p.pos, fade * 0.6, p.scale, 1.0)
            }
            EffectKind::FlameGlow => {
                let strength = match self.payload {
                    EffectPayload::Intensity(i) => i,
                    _ => 1.0,
                };
                (
                    car.pos + Vec2::new(0.0, FLAME_OFFSET * car.scale),
                    fade,
                    car.scale,
                    strength * fade,
                )
            }
        };

        EffectView {
            kind: self.kind,
            lane: self.lane,
            pos,
            opacity,
            scale,
            intensity,
            text: match &self.payload {
                EffectPayload::Text(text) => Some(text.as_str()),
                _ => None,
            },
        }
    }
}

/// Read-only placement of an effect for the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct EffectView<'a> {
    pub kind: EffectKind,
    pub lane: usize,
    pub pos: Vec2,
    pub opacity: f32,
    pub scale: f32,
    pub intensity: f32,
    pub text: Option<&'a str>,
}

/// Dedicated slots: pop-text per lane, then flame glow per lane
const DEDICATED_SLOTS: usize = LANE_COUNT * 2;

/// Fixed-capacity effect arena
#[derive(Debug, Clone)]
pub struct EffectsScheduler {
    slots: Vec<Option<EffectRecord>>,
    /// Free pooled slot indices (particles and trail points)
    free: Vec<usize>,
    rng: Pcg32,
    trail_timers: [f32; LANE_COUNT],
    /// Screen shake intensity (0-1)
    pub shake: f32,
    /// Full-screen flash intensity (0-1)
    pub flash: f32,
    /// Seconds of effect time, drives the shake wobble
    clock: f32,
    /// Suppresses shake and flash
    pub reduced_motion: bool,
    /// Particle bursts on/off; trail points still use the pool
    pub particles: bool,
    /// Rate applied while the race is not running
    pub paused_rate: f32,
}

impl EffectsScheduler {
    /// Create a scheduler with `pool_capacity` shared slots
    pub fn new(pool_capacity: usize, seed: u64) -> Self {
        let total = DEDICATED_SLOTS + pool_capacity;
        Self {
            slots: vec![None; total],
            // Pop from the back so low indices are handed out first
            free: (DEDICATED_SLOTS..total).rev().collect(),
            rng: Pcg32::seed_from_u64(seed ^ 0x5eed_effe),
            trail_timers: [0.0; LANE_COUNT],
            shake: 0.0,
            flash: 0.0,
            clock: 0.0,
            reduced_motion: false,
            particles: true,
            paused_rate: 0.8,
        }
    }

    /// Shared slot count
    pub fn pool_capacity(&self) -> usize {
        self.slots.len() - DEDICATED_SLOTS
    }

    /// Change the shared slot count; pooled effects in flight are dropped
    pub fn resize_pool(&mut self, capacity: usize) {
        if capacity == self.pool_capacity() {
            return;
        }
        let total = DEDICATED_SLOTS + capacity;
        self.slots.truncate(DEDICATED_SLOTS);
        self.slots.resize(total, None);
        self.free = (DEDICATED_SLOTS..total).rev().collect();
        log::debug!("Effect pool resized to {capacity} slots");
    }

    /// Number of live effects
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live effects in slot order
    pub fn iter(&self) -> impl Iterator<Item = &EffectRecord> {
        self.slots.iter().flatten()
    }

    /// Live effects of one kind
    pub fn count_kind(&self, kind: EffectKind) -> usize {
        self.iter().filter(|r| r.kind == kind).count()
    }

    fn dedicated_slot(kind: EffectKind, lane: usize) -> Option<usize> {
        match kind {
            EffectKind::PopText => Some(lane),
            EffectKind::FlameGlow => Some(LANE_COUNT + lane),
            EffectKind::Particle | EffectKind::TrailPoint => None,
        }
    }

    /// Place a record; returns false if the pool is exhausted
    fn insert(&mut self, record: EffectRecord) -> bool {
        if record.lane >= LANE_COUNT {
            return false;
        }
        let slot = match Self::dedicated_slot(record.kind, record.lane) {
            Some(slot) => slot,
            None => match self.free.pop() {
                Some(slot) => slot,
                None => {
                    log::debug!("Effect pool full, dropping {:?}", record.kind);
                    return false;
                }
            },
        };
        self.slots[slot] = Some(record);
        true
    }

    /// Floating "+amount" text above a lane's car
    pub fn spawn_pop(&mut self, lane: usize, text: impl Into<String>, life: f32) -> bool {
        self.insert(EffectRecord {
            kind: EffectKind::PopText,
            lane,
            remaining_life: life,
            max_life: life,
            payload: EffectPayload::Text(text.into()),
            offset: Vec2::ZERO,
            anchor: None,
        })
    }

    /// Engine glow behind a lane's car
    pub fn spawn_flame(&mut self, lane: usize, intensity: f32, life: f32) -> bool {
        self.insert(EffectRecord {
            kind: EffectKind::FlameGlow,
            lane,
            remaining_life: life,
            max_life: life,
            payload: EffectPayload::Intensity(intensity.clamp(0.0, 1.0)),
            offset: Vec2::ZERO,
            anchor: None,
        })
    }

    /// Radial particle burst around a lane's car; returns how many were placed
    pub fn spawn_burst(&mut self, lane: usize, count: usize, life: f32, speed: f32) -> usize {
        if !self.particles {
            return 0;
        }
        let mut placed = 0;
        for _ in 0..count {
            let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
            let magnitude = speed * self.rng.random_range(0.4..1.0);
            let jitter = self.rng.random_range(0.7..1.0);
            let vel = Vec2::new(angle.cos(), angle.sin()) * magnitude;
            if !self.insert(EffectRecord {
                kind: EffectKind::Particle,
                lane,
                remaining_life: life * jitter,
                max_life: life * jitter,
                payload: EffectPayload::Velocity(vel),
                offset: Vec2::ZERO,
                anchor: None,
            }) {
                break;
            }
            placed += 1;
        }
        placed
    }

    /// Trail point pinned at a progress value
    pub fn spawn_trail_point(&mut self, lane: usize, progress: f32, life: f32) -> bool {
        self.insert(EffectRecord {
            kind: EffectKind::TrailPoint,
            lane,
            remaining_life: life,
            max_life: life,
            payload: EffectPayload::Intensity(1.0),
            offset: Vec2::ZERO,
            anchor: Some(progress),
        })
    }

    /// Drop trail points behind boosted lanes
    pub fn emit_trails(&mut self, state: &RaceState, dt: f32, life: f32) {
        for (i, lane) in state.lanes.iter().enumerate() {
            if lane.boost < TRAIL_MIN_BOOST {
                self.trail_timers[i] = 0.0;
                continue;
            }
            self.trail_timers[i] += dt;
            if self.trail_timers[i] >= TRAIL_INTERVAL {
                self.trail_timers[i] = 0.0;
                self.spawn_trail_point(i, lane.progress, life);
            }
        }
    }

    /// Add screen shake (capped at 1.0)
    pub fn add_shake(&mut self, amount: f32) {
        if !self.reduced_motion {
            self.shake = (self.shake + amount).min(1.0);
        }
    }

    /// Trigger a full-screen flash
    pub fn trigger_flash(&mut self, amount: f32) {
        if !self.reduced_motion {
            self.flash = self.flash.max(amount.min(1.0));
        }
    }

    /// Current shake offset for the camera
    pub fn shake_offset(&self) -> Vec2 {
        if self.shake <= 0.0 {
            return Vec2::ZERO;
        }
        Vec2::new((self.clock * 47.0).sin(), (self.clock * 61.0).cos()) * self.shake * SHAKE_PIXELS
    }

    /// Remove every trail point (they are pinned to the old round's progress)
    pub fn clear_trails(&mut self) {
        for slot in DEDICATED_SLOTS..self.slots.len() {
            if matches!(&self.slots[slot], Some(r) if r.kind == EffectKind::TrailPoint) {
                self.slots[slot] = None;
                self.free.push(slot);
            }
        }
        self.trail_timers = [0.0; LANE_COUNT];
    }

    /// Advance every effect; runs whether or not the race is running
    pub fn tick(&mut self, dt: f32, running: bool) {
        let dt = crate::sanitize_dt(dt);
        let rate = if running { 1.0 } else { self.paused_rate };
        let step = dt * rate;
        self.clock += dt;

        for slot in 0..self.slots.len() {
            let Some(record) = self.slots[slot].as_mut() else {
                continue;
            };
            record.remaining_life -= step;
            if let EffectPayload::Velocity(vel) = &mut record.payload {
                record.offset += *vel * step;
                *vel *= (-PARTICLE_DRAG * step).exp();
                vel.y += PARTICLE_GRAVITY * step;
            }
            if record.remaining_life <= 0.0 {
                self.slots[slot] = None;
                if slot >= DEDICATED_SLOTS {
                    self.free.push(slot);
                }
            }
        }

        self.shake *= (-SHAKE_DECAY * dt).exp();
        if self.shake < 0.01 {
            self.shake = 0.0;
        }
        self.flash *= (-FLASH_DECAY * dt).exp();
        if self.flash < 0.01 {
            self.flash = 0.0;
        }
    }
}
