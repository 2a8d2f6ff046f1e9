//! Session standings: lane wins and donor totals
//!
//! Persisted through a [`KeyValueStore`] after every change and restored at
//! boot. A blob with the wrong lane count or a future version is treated as
//! corrupted and replaced with empty standings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::LANE_COUNT;
use crate::persistence::{KeyValueStore, load_or_default, save_json};
use crate::sim::RaceState;

/// Current on-disk format
const STANDINGS_VERSION: u32 = 1;

/// Durable counters that survive round resets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    #[serde(default)]
    pub version: u32,
    pub wins: Vec<u32>,
    #[serde(default)]
    pub donors: BTreeMap<String, u64>,
}

impl Default for Standings {
    fn default() -> Self {
        Self {
            version: STANDINGS_VERSION,
            wins: vec![0; LANE_COUNT],
            donors: BTreeMap::new(),
        }
    }
}

impl Standings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "drag_race_standings";

    /// Capture the durable fields of a race
    pub fn from_state(state: &RaceState) -> Self {
        Self {
            version: STANDINGS_VERSION,
            wins: state.wins().to_vec(),
            donors: state.donor_totals.clone(),
        }
    }

    /// Copy wins and donor totals into a race
    pub fn apply_to(&self, state: &mut RaceState) {
        for (lane, wins) in state.lanes.iter_mut().zip(&self.wins) {
            lane.wins = *wins;
        }
        state.donor_totals = self.donors.clone();
    }

    /// Whether the blob matches this build's layout
    pub fn is_valid(&self) -> bool {
        self.version <= STANDINGS_VERSION && self.wins.len() == LANE_COUNT
    }

    /// Load standings, falling back to empty ones on absence or corruption
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let standings: Standings = load_or_default(store, Self::STORAGE_KEY);
        if standings.is_valid() {
            log::info!(
                "Loaded standings: {} wins, {} donors",
                standings.wins.iter().sum::<u32>(),
                standings.donors.len()
            );
            standings
        } else {
            log::warn!("Discarding incompatible standings");
            Self::default()
        }
    }

    /// Save standings; failures are logged and otherwise ignored
    pub fn save(&self, store: &mut dyn KeyValueStore) {
        if let Err(e) = save_json(store, Self::STORAGE_KEY, self) {
            log::warn!("Could not save standings: {e}");
        }
    }
}
