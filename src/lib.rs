//! Drag Race - a six-lane donation drag race
//!
//! Core modules:
//! - `sim`: Race simulation (road projection, physics, lifecycle, effects)
//! - `renderer`: WebGPU rendering pipeline
//! - `persistence`: Key-value storage for standings and settings
//! - `tuning`: Data-driven race balance
//! - `audio`: Procedural sound cues for race events

pub mod audio;
pub mod persistence;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod standings;
pub mod tuning;

pub use settings::{QualityPreset, Settings, SettingsToggle};
pub use standings::Standings;
pub use tuning::RaceTuning;

/// Race configuration constants
pub mod consts {
    /// Number of parallel lanes
    pub const LANE_COUNT: usize = 6;

    /// Stage (virtual canvas) size; all screen math happens in this space
    pub const STAGE_WIDTH: f32 = 1080.0;
    pub const STAGE_HEIGHT: f32 = 1920.0;

    /// Progress at which a lane crosses the finish line
    pub const FINISH_PROGRESS: f32 = 1.0;
    /// Allowed overshoot past the finish line
    pub const MAX_PROGRESS: f32 = 1.2;

    /// Upper bound for a lane's boost
    pub const MAX_BOOST: f32 = 0.86;

    /// Largest single simulation step; longer frame deltas are split into several
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Lane colors (RGBA)
    pub const LANE_COLORS: [[f32; 4]; LANE_COUNT] = [
        [1.0, 0.231, 0.231, 1.0],
        [0.184, 0.482, 1.0, 1.0],
        [1.0, 0.8, 0.2, 1.0],
        [0.212, 1.0, 0.478, 1.0],
        [0.545, 0.357, 1.0, 1.0],
        [1.0, 0.294, 0.82, 1.0],
    ];
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Zero-pad a counter to two digits ("07")
pub fn fmt2(n: u32) -> String {
    format!("{n:02}")
}

/// Sanitize a frame delta: non-finite or negative deltas become zero
#[inline]
pub fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 { dt } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
        assert!((lerp(1680.0, 260.0, 0.5) - 970.0).abs() < 1e-3);
    }

    #[test]
    fn test_fmt2() {
        assert_eq!(fmt2(1), "01");
        assert_eq!(fmt2(12), "12");
        assert_eq!(fmt2(123), "123");
    }

    #[test]
    fn test_sanitize_dt() {
        assert_eq!(sanitize_dt(0.016), 0.016);
        assert_eq!(sanitize_dt(-1.0), 0.0);
        assert_eq!(sanitize_dt(f32::NAN), 0.0);
        assert_eq!(sanitize_dt(f32::INFINITY), 0.0);
    }
}
