//! Donation handling
//!
//! A donation (a tap on a lane, or a test button) injects boost into a lane and
//! updates the round bank and donor totals. Donations arriving after a winner
//! has been declared are ignored.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{RaceState, RoundPhase};
use crate::consts::LANE_COUNT;

/// Donation amount bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Small,
    Medium,
    Large,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Small => "Like",
            Tier::Medium => "Super-like",
            Tier::Large => "NITRO",
        }
    }

    /// Particles in the burst spawned for this tier
    pub fn burst_size(&self) -> usize {
        match self {
            Tier::Small => 6,
            Tier::Medium => 12,
            Tier::Large => 24,
        }
    }

    /// Camera shake added for this tier
    pub fn shake(&self) -> f32 {
        match self {
            Tier::Small => 0.0,
            Tier::Medium => 0.15,
            Tier::Large => 0.45,
        }
    }

    /// Icon shown next to the amount, per lane
    pub fn icon(&self, lane: usize) -> &'static str {
        const ICONS: [[&str; 3]; LANE_COUNT] = [
            ["❤️", "🔥", "⚡"],
            ["💙", "🌊", "🌀"],
            ["💛", "✨", "⭐"],
            ["💚", "🍀", "🌿"],
            ["💜", "🔮", "🦄"],
            ["🩷", "🌸", "💫"],
        ];
        ICONS[lane % LANE_COUNT][*self as usize]
    }
}

/// A donation that was applied to the race
#[derive(Debug, Clone, PartialEq)]
pub struct DonationReceipt {
    pub lane: usize,
    pub amount: u64,
    pub tier: Tier,
    pub donor: String,
    /// Boost actually added after clamping
    pub boost_added: f32,
    /// This donation started the round
    pub started_round: bool,
}

/// Apply a donation to `lane`.
///
/// Returns `None` (and leaves the state untouched) when a winner is already
/// set, the lane does not exist, or the amount is zero.
pub fn handle_donation(
    state: &mut RaceState,
    lane: usize,
    amount: u64,
    donor: &str,
) -> Option<DonationReceipt> {
    if state.winner_lane.is_some() || lane >= LANE_COUNT || amount == 0 {
        log::debug!("Rejected donation of {amount} to lane {lane}");
        return None;
    }

    let tier = state.tuning.tier_for(amount);
    let max_boost = state.tuning.max_boost;
    let increment = state.tuning.boost_for(tier);

    let lane_state = &mut state.lanes[lane];
    let before = lane_state.boost;
    lane_state.boost = (before + increment).clamp(0.0, max_boost);
    let boost_added = lane_state.boost - before;

    state.bank = state.bank.saturating_add(amount);
    let total = state.donor_totals.entry(donor.to_string()).or_insert(0);
    *total = total.saturating_add(amount);

    let started_round = state.phase == RoundPhase::Idle;
    if started_round {
        state.phase = RoundPhase::Running;
        log::info!("Round {} started by {donor}", state.round_number);
    }

    log::debug!(
        "{donor} donated {amount} ({}) to lane {}, boost {:.2}",
        tier.as_str(),
        lane + 1,
        state.lanes[lane].boost
    );

    Some(DonationReceipt {
        lane,
        amount,
        tier,
        donor: donor.to_string(),
        boost_added,
        started_round,
    })
}

/// Handles used for simulated taps
pub const DEMO_DONORS: [&str; 6] = ["@pluto", "@neo", "@luna", "@ghost", "@queen", "@max"];

/// Amounts bound to the test-donation buttons (one per tier)
pub const TEST_AMOUNTS: [u64; 3] = [1, 5, 20];

/// Roll a simulated donor and amount for a tap: 60% likes, 28% super-likes, 12% nitro
pub fn roll_demo_donation<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, u64) {
    let donor = DEMO_DONORS[rng.random_range(0..DEMO_DONORS.len())];
    let roll: f32 = rng.random();
    let amount = if roll < 0.60 {
        TEST_AMOUNTS[0]
    } else if roll < 0.88 {
        TEST_AMOUNTS[1]
    } else {
        TEST_AMOUNTS[2]
    };
    (donor, amount)
}
