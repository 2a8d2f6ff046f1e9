//! Road geometry and perspective projection
//!
//! The road is a trapezoid in stage space: wide at the bottom (near), narrow at
//! the top (far). A lane position is a 1-D progress value `t` (0 = start line,
//! 1 = finish line, up to 1.2 overshoot) which maps to:
//! - screen y: linear between the bottom and top edges
//! - screen x: the lane's slot between the interpolated road edges, plus a
//!   small sinusoidal drift that fades out at the finish line
//! - sprite scale: shrinks with distance
//!
//! Everything here is a pure function of `(lane, t)` and the road constants.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::consts::{LANE_COUNT, STAGE_HEIGHT, STAGE_WIDTH};
use crate::lerp;

/// Lateral drift amplitude in stage pixels
const DRIFT_AMPLITUDE: f32 = 10.0;
/// Drift frequency along the road (half-waves per unit progress)
const DRIFT_FREQUENCY: f32 = 3.0;
/// Drift phase offset between adjacent lanes (in half-waves)
const DRIFT_LANE_PHASE: f32 = 0.85;
/// Maximum inward pull of car sprites toward the road center at the finish
const CAR_CONVERGENCE: f32 = 12.0;
/// Sprite scale at the start and finish lines
const NEAR_SCALE: f32 = 1.05;
const FAR_SCALE: f32 = 0.26;

/// Lane divider dashes along the road
const DIVIDER_SLOTS: u32 = 30;
const DIVIDER_DASH_FILL: f32 = 0.64;
/// Checkered finish band
const FINISH_SQUARES: u32 = 24;
const FINISH_BAND_HEIGHT: f32 = 28.0;
const FINISH_BAND_OFFSET: f32 = 14.0;

/// Fixed road trapezoid in stage coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadGeometry {
    pub top_y: f32,
    pub bottom_y: f32,
    pub top_left: f32,
    pub top_right: f32,
    pub bottom_left: f32,
    pub bottom_right: f32,
}

/// The road every race is run on
pub const ROAD: RoadGeometry = RoadGeometry {
    top_y: 260.0,
    bottom_y: 1680.0,
    top_left: 400.0,
    top_right: 680.0,
    bottom_left: 80.0,
    bottom_right: 1000.0,
};

impl Default for RoadGeometry {
    fn default() -> Self {
        ROAD
    }
}

/// A projected lane position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanePoint {
    pub pos: Vec2,
    pub scale: f32,
}

/// One dash of a lane divider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashSegment {
    pub from: Vec2,
    pub to: Vec2,
    pub width: f32,
}

/// One square of the checkered finish band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinishSquare {
    pub min: Vec2,
    pub size: Vec2,
    pub light: bool,
}

impl RoadGeometry {
    /// Screen y for progress `t`
    #[inline]
    pub fn project_y(&self, t: f32) -> f32 {
        lerp(self.bottom_y, self.top_y, t)
    }

    /// Left road edge at progress `t`
    #[inline]
    pub fn left(&self, t: f32) -> f32 {
        lerp(self.bottom_left, self.top_left, t)
    }

    /// Right road edge at progress `t`
    #[inline]
    pub fn right(&self, t: f32) -> f32 {
        lerp(self.bottom_right, self.top_right, t)
    }

    /// Half of the usable road width at progress `t`
    #[inline]
    pub fn lane_half_width(&self, t: f32) -> f32 {
        (self.right(t) - self.left(t)) / 2.0
    }

    /// Width of a single lane slot at progress `t`
    #[inline]
    pub fn lane_width(&self, t: f32) -> f32 {
        (self.right(t) - self.left(t)) / LANE_COUNT as f32
    }

    /// Center of lane `lane` at progress `t`, including the cosmetic drift
    pub fn lane_center_x(&self, lane: usize, t: f32) -> f32 {
        let slot_center = self.left(t) + self.lane_width(t) * (lane as f32 + 0.5);
        slot_center + lane_drift(lane, t)
    }

    /// Sprite scale for progress `t` (depth illusion)
    #[inline]
    pub fn project_scale(&self, t: f32) -> f32 {
        lerp(NEAR_SCALE, FAR_SCALE, t)
    }

    /// Project a lane position to stage space
    pub fn project(&self, lane: usize, t: f32) -> LanePoint {
        LanePoint {
            pos: Vec2::new(self.lane_center_x(lane, t), self.project_y(t)),
            scale: self.project_scale(t),
        }
    }

    /// Car sprite anchor: lane center pulled toward the road center with depth
    pub fn car_position(&self, lane: usize, t: f32) -> LanePoint {
        let mut point = self.project(lane, t);
        let offset_from_center = lane as f32 - (LANE_COUNT as f32 - 1.0) / 2.0;
        point.pos.x += offset_from_center * lerp(0.0, CAR_CONVERGENCE, t);
        point
    }

    /// Progress value whose projected y is `y`, if `y` lies on the road
    pub fn progress_at_y(&self, y: f32) -> Option<f32> {
        if !(self.top_y..=self.bottom_y).contains(&y) {
            return None;
        }
        let t = (self.bottom_y - y) / (self.bottom_y - self.top_y);
        Some(t.clamp(0.0, 1.0))
    }

    /// Inverse projection: which lane a stage-space point falls in.
    /// Points outside the road polygon map to `None`.
    pub fn lane_at(&self, point: Vec2) -> Option<usize> {
        if !point.is_finite() {
            return None;
        }
        let t = self.progress_at_y(point.y)?;
        let (left, right) = (self.left(t), self.right(t));
        if point.x < left || point.x > right {
            return None;
        }
        let lane = ((point.x - left) / self.lane_width(t)).floor() as usize;
        Some(lane.min(LANE_COUNT - 1))
    }

    /// Road outline corners (bottom-left, bottom-right, top-right, top-left)
    pub fn outline(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.bottom_left, self.bottom_y),
            Vec2::new(self.bottom_right, self.bottom_y),
            Vec2::new(self.top_right, self.top_y),
            Vec2::new(self.top_left, self.top_y),
        ]
    }

    /// Dashed divider segments between adjacent lanes
    pub fn lane_dividers(&self) -> Vec<DashSegment> {
        let mut dashes = Vec::with_capacity((LANE_COUNT - 1) * (DIVIDER_SLOTS as usize / 2));
        for divider in 1..LANE_COUNT {
            let frac = divider as f32 / LANE_COUNT as f32;
            for slot in (0..DIVIDER_SLOTS).step_by(2) {
                let t0 = slot as f32 / DIVIDER_SLOTS as f32;
                let t1 = (slot as f32 + DIVIDER_DASH_FILL) / DIVIDER_SLOTS as f32;
                dashes.push(DashSegment {
                    from: Vec2::new(lerp(self.left(t0), self.right(t0), frac), self.project_y(t0)),
                    to: Vec2::new(lerp(self.left(t1), self.right(t1), frac), self.project_y(t1)),
                    width: lerp(10.0, 3.0, t0),
                });
            }
        }
        dashes
    }

    /// Checkered band just below the finish line
    pub fn finish_band(&self) -> Vec<FinishSquare> {
        let (left, right) = (self.left(1.0), self.right(1.0));
        let y = self.project_y(1.0) + FINISH_BAND_OFFSET;
        let w = (right - left) / FINISH_SQUARES as f32;
        (0..FINISH_SQUARES)
            .map(|i| FinishSquare {
                min: Vec2::new(left + i as f32 * w, y),
                size: Vec2::new(w, FINISH_BAND_HEIGHT),
                light: i % 2 == 0,
            })
            .collect()
    }

    /// Polyline following lane `lane` from the start line to progress `t`
    pub fn trail_path(&self, lane: usize, t: f32, steps: u32) -> Vec<Vec2> {
        let steps = steps.max(1);
        (0..=steps)
            .map(|s| {
                let tt = s as f32 / steps as f32 * t;
                Vec2::new(self.lane_center_x(lane, tt), self.project_y(tt))
            })
            .collect()
    }

    /// Trail stroke width at progress `t`
    #[inline]
    pub fn trail_width(&self, t: f32) -> f32 {
        lerp(24.0, 5.0, t)
    }
}

/// Cosmetic lateral drift; zero at the finish line so lanes converge cleanly
#[inline]
pub fn lane_drift(lane: usize, t: f32) -> f32 {
    ((t * DRIFT_FREQUENCY + lane as f32 * DRIFT_LANE_PHASE) * PI).sin() * DRIFT_AMPLITUDE * (1.0 - t)
}

/// Maps client (CSS pixel) coordinates of the drawing surface to stage space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Convert a client coordinate to stage space (None for a degenerate viewport)
    pub fn to_stage(&self, client_x: f32, client_y: f32) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some(Vec2::new(
            (client_x - self.left) / self.width * STAGE_WIDTH,
            (client_y - self.top) / self.height * STAGE_HEIGHT,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_y_endpoints() {
        assert_eq!(ROAD.project_y(0.0), 1680.0);
        assert_eq!(ROAD.project_y(1.0), 260.0);
        // Overshoot keeps going up the screen
        assert!(ROAD.project_y(1.2) < 260.0);
    }

    #[test]
    fn test_road_narrows_with_distance() {
        assert_eq!(ROAD.lane_half_width(0.0), 460.0);
        assert_eq!(ROAD.lane_half_width(1.0), 140.0);
        let mut prev = f32::MAX;
        for step in 0..=10 {
            let w = ROAD.lane_half_width(step as f32 / 10.0);
            assert!(w < prev);
            prev = w;
        }
    }

    #[test]
    fn test_drift_vanishes_at_finish() {
        for lane in 0..LANE_COUNT {
            assert!(lane_drift(lane, 1.0).abs() < 1e-4);
            let slot = ROAD.left(1.0) + ROAD.lane_width(1.0) * (lane as f32 + 0.5);
            assert!((ROAD.lane_center_x(lane, 1.0) - slot).abs() < 1e-3);
        }
    }

    #[test]
    fn test_lane_centers_are_ordered() {
        for &t in &[0.0, 0.25, 0.5, 0.75, 1.0] {
            for lane in 1..LANE_COUNT {
                assert!(ROAD.lane_center_x(lane, t) > ROAD.lane_center_x(lane - 1, t));
            }
        }
    }

    #[test]
    fn test_projection_is_deterministic() {
        let a = ROAD.project(3, 0.42);
        let b = ROAD.project(3, 0.42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_scale_shrinks() {
        assert!((ROAD.project_scale(0.0) - 1.05).abs() < 1e-6);
        assert!((ROAD.project_scale(1.0) - 0.26).abs() < 1e-6);
        assert!(ROAD.project_scale(0.5) < ROAD.project_scale(0.1));
    }

    #[test]
    fn test_lane_at_round_trips_lane_centers() {
        for lane in 0..LANE_COUNT {
            for &t in &[0.05, 0.3, 0.6, 0.95] {
                let slot_center = ROAD.left(t) + ROAD.lane_width(t) * (lane as f32 + 0.5);
                let p = Vec2::new(slot_center, ROAD.project_y(t));
                assert_eq!(ROAD.lane_at(p), Some(lane), "lane {lane} at t={t}");
            }
        }
    }

    #[test]
    fn test_lane_at_rejects_off_road() {
        // Beyond the right edge near the start
        assert_eq!(ROAD.lane_at(Vec2::new(1050.0, 1600.0)), None);
        // Left of the narrow far end
        assert_eq!(ROAD.lane_at(Vec2::new(390.0, 270.0)), None);
        // Above and below the road
        assert_eq!(ROAD.lane_at(Vec2::new(540.0, 100.0)), None);
        assert_eq!(ROAD.lane_at(Vec2::new(540.0, 1800.0)), None);
        assert_eq!(ROAD.lane_at(Vec2::new(f32::NAN, 1000.0)), None);
    }

    #[test]
    fn test_lane_at_right_edge_maps_to_last_lane() {
        let t = 0.0;
        let p = Vec2::new(ROAD.right(t), ROAD.project_y(t));
        assert_eq!(ROAD.lane_at(p), Some(LANE_COUNT - 1));
    }

    #[test]
    fn test_car_position_converges_toward_center() {
        let t = 1.0;
        let outer = ROAD.car_position(0, t).pos.x;
        let plain = ROAD.project(0, t).pos.x;
        assert!(outer > plain, "left lane pulled right");
        let outer = ROAD.car_position(LANE_COUNT - 1, t).pos.x;
        let plain = ROAD.project(LANE_COUNT - 1, t).pos.x;
        assert!(outer < plain, "right lane pulled left");
        // No pull at the start line
        assert_eq!(ROAD.car_position(0, 0.0), ROAD.project(0, 0.0));
    }

    #[test]
    fn test_dividers_and_finish_band() {
        let dashes = ROAD.lane_dividers();
        assert_eq!(dashes.len(), (LANE_COUNT - 1) * 15);
        assert!(dashes.iter().all(|d| d.from.y > d.to.y));

        let band = ROAD.finish_band();
        assert_eq!(band.len(), 24);
        assert!(band[0].light && !band[1].light);
        assert!((band[0].min.x - ROAD.left(1.0)).abs() < 1e-3);
        let last = band[23];
        assert!((last.min.x + last.size.x - ROAD.right(1.0)).abs() < 1e-2);
    }

    #[test]
    fn test_trail_path_spans_start_to_progress() {
        let path = ROAD.trail_path(2, 0.5, 24);
        assert_eq!(path.len(), 25);
        assert_eq!(path[0].y, ROAD.project_y(0.0));
        assert!((path[24].y - ROAD.project_y(0.5)).abs() < 1e-3);
    }

    #[test]
    fn test_viewport_to_stage() {
        let vp = Viewport::new(10.0, 20.0, 540.0, 960.0);
        assert_eq!(vp.to_stage(10.0, 20.0), Some(Vec2::ZERO));
        assert_eq!(vp.to_stage(550.0, 980.0), Some(Vec2::new(1080.0, 1920.0)));
        assert_eq!(Viewport::new(0.0, 0.0, 0.0, 10.0).to_stage(1.0, 1.0), None);
    }
}
