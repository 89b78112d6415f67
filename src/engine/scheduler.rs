//! Tiered sensor scheduling
//!
//! Each sensor has a nominal cadence. Danger mode collapses every tier to cadence 1 until
//! a tick passes without any sensor reporting danger.

use serde::Serialize;

/// Execution tier; the discriminant is the cadence in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(u8)]
pub enum Tier {
    EveryTick = 1,
    Half = 2,
    Quarter = 4,
    Eighth = 8,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::EveryTick, Tier::Half, Tier::Quarter, Tier::Eighth];

    /// Nominal cadence in ticks
    pub const fn cadence(self) -> u64 {
        self as u64
    }

    fn index(self) -> usize {
        match self {
            Tier::EveryTick => 0,
            Tier::Half => 1,
            Tier::Quarter => 2,
            Tier::Eighth => 3,
        }
    }
}

/// Decides which tiers run on a given tick
#[derive(Debug, Default)]
pub struct TieredScheduler {
    danger_mode: bool,
    /// Runs per tier
    runs: [u64; 4],
    /// Skips per tier
    skips: [u64; 4],
}

impl TieredScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn danger_mode(&self) -> bool {
        self.danger_mode
    }

    /// Carry this tick's danger flag into the next tick. Returns true on a transition.
    pub fn set_danger_mode(&mut self, danger: bool) -> bool {
        let changed = self.danger_mode != danger;
        self.danger_mode = danger;
        changed
    }

    /// Pure cadence check
    #[inline]
    pub fn is_due(tier: Tier, tick: u64, danger_mode: bool) -> bool {
        danger_mode || tick % tier.cadence() == 0
    }

    /// Cadence check that also counts runs and skips
    pub fn should_run(&mut self, tier: Tier, tick: u64) -> bool {
        let due = Self::is_due(tier, tick, self.danger_mode);
        if due {
            self.runs[tier.index()] += 1;
        } else {
            self.skips[tier.index()] += 1;
        }
        due
    }

    pub fn runs(&self, tier: Tier) -> u64 {
        self.runs[tier.index()]
    }

    pub fn skips(&self, tier: Tier) -> u64 {
        self.skips[tier.index()]
    }
}
