//! Read-only per-frame view of the race for the renderer and HUD

use glam::Vec2;

use super::effects::{EffectView, EffectsScheduler};
use super::road::ROAD;
use super::state::{RaceState, RoundPhase};
use crate::consts::{LANE_COLORS, LANE_COUNT};
use crate::fmt2;

/// Donor leaderboard length shown in the top strip
pub const TOP_DONORS: usize = 6;

/// A line in the donation feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub donor: String,
    pub lane: usize,
    /// 0 for system messages (finish, time up)
    pub amount: u64,
    pub message: String,
    pub icon: &'static str,
}

impl FeedEntry {
    /// "❤️ @neo → Lane 3"
    pub fn headline(&self) -> String {
        format!("{} {} → Lane {}", self.icon, self.donor, self.lane + 1)
    }

    /// "+5" for donations, "WIN" for system lines
    pub fn amount_label(&self) -> String {
        if self.amount > 0 {
            format!("+{}", self.amount)
        } else {
            "WIN".to_string()
        }
    }
}

/// One lane, projected
#[derive(Debug, Clone, PartialEq)]
pub struct LaneView {
    pub lane: usize,
    pub progress: f32,
    /// Car sprite anchor and scale
    pub pos: Vec2,
    pub scale: f32,
    /// Boost-derived glow (0-1)
    pub glow: f32,
    pub color: [f32; 4],
    pub wins: u32,
    /// Trail polyline from the start line to the car
    pub trail: Vec<Vec2>,
    pub trail_width: f32,
    pub trail_opacity: f32,
}

/// Counters formatted for display
#[derive(Debug, Clone, PartialEq)]
pub struct Hud {
    pub round: String,
    pub time: String,
    pub bank: String,
    pub phase: RoundPhase,
    pub winner: Option<usize>,
    pub wins_total: u32,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone)]
pub struct FrameSnapshot<'a> {
    pub lanes: Vec<LaneView>,
    pub effects: Vec<EffectView<'a>>,
    pub shake: Vec2,
    pub flash: f32,
    pub hud: Hud,
    pub top_donors: Vec<(&'a str, u64)>,
    pub feed: &'a [FeedEntry],
}

impl<'a> FrameSnapshot<'a> {
    pub fn capture(
        state: &'a RaceState,
        scheduler: &'a EffectsScheduler,
        feed: &'a [FeedEntry],
        trail_steps: Option<u32>,
    ) -> Self {
        let max_boost = state.tuning.max_boost;
        let lanes = (0..LANE_COUNT)
            .map(|i| {
                let lane = &state.lanes[i];
                let t = lane.progress;
                let car = ROAD.car_position(i, t);
                let glow = (lane.boost / max_boost).clamp(0.0, 1.0);
                LaneView {
                    lane: i,
                    progress: t,
                    pos: car.pos,
                    scale: car.scale,
                    glow,
                    color: LANE_COLORS[i],
                    wins: lane.wins,
                    trail: trail_steps
                        .map(|steps| ROAD.trail_path(i, t, steps))
                        .unwrap_or_default(),
                    trail_width: ROAD.trail_width(t),
                    trail_opacity: 0.45 + 0.55 * glow,
                }
            })
            .collect();

        let effects = scheduler
            .iter()
            .map(|record| record.view(state.lanes[record.lane].progress))
            .collect();

        Self {
            lanes,
            effects,
            shake: scheduler.shake_offset(),
            flash: scheduler.flash,
            hud: Hud {
                round: fmt2(state.round_number),
                time: state.seconds_left().to_string(),
                bank: state.bank.to_string(),
                phase: state.phase,
                winner: state.winner_lane,
                wins_total: state.total_wins(),
            },
            top_donors: state.top_donors(TOP_DONORS),
            feed,
        }
    }
}
