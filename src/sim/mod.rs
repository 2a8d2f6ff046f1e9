//! Race simulation module
//!
//! Everything that decides who wins lives here. Rules:
//! - Time only advances through `advance` / `RaceSession::frame`
//! - Seeded RNG only (base speeds, demo donations, particle jitter)
//! - Lanes are always visited in index order
//! - No rendering or platform dependencies

pub mod donation;
pub mod effects;
pub mod lifecycle;
pub mod road;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod tick;

pub use donation::{
    DEMO_DONORS, DonationReceipt, TEST_AMOUNTS, Tier, handle_donation, roll_demo_donation,
};
pub use effects::{EffectKind, EffectPayload, EffectRecord, EffectView, EffectsScheduler};
pub use lifecycle::{
    Control, ResetTask, ResetTimers, apply_control, next_round, reset_if_unchanged,
    restart_round, toggle_start,
};
pub use road::{DashSegment, FinishSquare, LanePoint, ROAD, RoadGeometry, Viewport, lane_drift};
pub use session::{EffectRequest, RaceSession};
pub use snapshot::{FeedEntry, FrameSnapshot, Hud, LaneView, TOP_DONORS};
pub use state::{Lane, RaceState, RngState, RoundPhase};
pub use tick::{StepOutcome, advance};
