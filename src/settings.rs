//! Display and audio preferences
//!
//! Persisted separately from standings.

use serde::{Deserialize, Serialize};

use crate::persistence::{KeyValueStore, load_or_default, save_json};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    /// Next preset in Low → Medium → High → Low order
    pub fn next(self) -> Self {
        match self {
            QualityPreset::Low => QualityPreset::Medium,
            QualityPreset::Medium => QualityPreset::High,
            QualityPreset::High => QualityPreset::Low,
        }
    }

    /// Shared effect slots (particles + trail points) for this preset
    pub fn pool_size(&self) -> usize {
        match self {
            QualityPreset::Low => 64,
            QualityPreset::Medium => 192,
            QualityPreset::High => 512,
        }
    }

    /// Trail polyline resolution multiplier (1.0 = full)
    pub fn trail_quality(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.25,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 1.0,
        }
    }
}

/// Full-resolution trail polyline steps
const TRAIL_STEPS: f32 = 24.0;

/// A single change made from the host's settings keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsToggle {
    CycleQuality,
    Trails,
    Particles,
    Mute,
    ReducedMotion,
}

/// Player preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Camera shake on big donations and finishes
    pub screen_shake: bool,
    /// Lane trails
    pub trails: bool,
    /// Particle bursts
    pub particles: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,

    // === Accessibility ===
    /// Reduced motion (no shake, no flashes)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            screen_shake: true,
            trails: true,
            particles: true,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "drag_race_settings";

    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Shared effect pool size; trail points need it even with particles off
    pub fn effect_pool_size(&self) -> usize {
        self.quality.pool_size()
    }

    /// Trail polyline steps, or None when trails are off
    pub fn trail_steps(&self) -> Option<u32> {
        self.trails
            .then(|| ((TRAIL_STEPS * self.quality.trail_quality()).round() as u32).max(4))
    }

    /// Effective sound volume
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            (self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
        }
    }

    /// Apply one toggle and describe the result for the log
    pub fn toggle(&mut self, toggle: SettingsToggle) -> String {
        let flag = |on: bool| if on { "on" } else { "off" };
        match toggle {
            SettingsToggle::CycleQuality => {
                self.quality = self.quality.next();
                format!("quality {}", self.quality.as_str())
            }
            SettingsToggle::Trails => {
                self.trails = !self.trails;
                format!("trails {}", flag(self.trails))
            }
            SettingsToggle::Particles => {
                self.particles = !self.particles;
                format!("particles {}", flag(self.particles))
            }
            SettingsToggle::Mute => {
                self.muted = !self.muted;
                format!("sound {}", flag(!self.muted))
            }
            SettingsToggle::ReducedMotion => {
                self.reduced_motion = !self.reduced_motion;
                format!("reduced motion {}", flag(self.reduced_motion))
            }
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        load_or_default(store, Self::STORAGE_KEY)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        match save_json(store, Self::STORAGE_KEY, self) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Could not save settings: {e}"),
        }
    }
}
