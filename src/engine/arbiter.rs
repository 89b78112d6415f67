//! Decision arbiter
//!
//! Gathers every proposal produced this tick, removes the kinds that lockout excludes, sorts
//! by the fixed priority table and applies the winner through the movement profile.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use smallvec::SmallVec;
use tracing::debug;

use crate::engine::constants::arbiter::*;
use crate::engine::performance::MovementProfile;
use crate::engine::proposal::ActionProposal;
use crate::engine::world::{ControlledEntity, SteeringCommand};
use crate::util::geometry::{angle_delta, normalize_angle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ArbiterState {
    #[default]
    Normal,
    /// Evasion pre-empts target seeking and counter-attack for this tick
    Lockout,
}

impl ArbiterState {
    pub fn from_danger(danger: bool) -> Self {
        if danger {
            ArbiterState::Lockout
        } else {
            ArbiterState::Normal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArbiterState::Normal => "normal",
            ArbiterState::Lockout => "lockout",
        }
    }
}

/// Outcome of one arbitration
#[derive(Debug, Clone)]
pub struct Decision {
    /// Winning proposal after jitter, `None` when holding heading
    pub proposal: Option<ActionProposal>,
    pub command: SteeringCommand,
    pub state: ArbiterState,
    /// Candidates considered, highest priority first
    pub candidates: usize,
    /// Heading was applied without smoothing
    pub instant: bool,
}

#[derive(Debug)]
pub struct Arbiter {
    state: ArbiterState,
    rng: StdRng,
    instant_turn_priority: u16,
}

impl Arbiter {
    pub fn new(jitter_seed: u64, instant_turn_priority: u16) -> Self {
        Self {
            state: ArbiterState::Normal,
            rng: StdRng::seed_from_u64(jitter_seed),
            instant_turn_priority,
        }
    }

    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// Lockout filter plus stable descending priority sort. Ties keep sensor order.
    pub fn candidates(
        proposals: &[ActionProposal],
        state: ArbiterState,
    ) -> SmallVec<[&ActionProposal; 16]> {
        let mut candidates: SmallVec<[&ActionProposal; 16]> = proposals
            .iter()
            .filter(|p| state == ArbiterState::Normal || !p.kind.suppressed_in_lockout())
            .collect();
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        candidates
    }

    /// Pick the winning proposal and turn it into a steering command
    pub fn decide(
        &mut self,
        proposals: &[ActionProposal],
        danger: bool,
        entity: &ControlledEntity,
        profile: &MovementProfile,
    ) -> Decision {
        let state = ArbiterState::from_danger(danger);
        if state != self.state {
            debug!(from = self.state.as_str(), to = state.as_str(), "Arbiter state changed");
            self.state = state;
        }

        let candidates = Self::candidates(proposals, state);
        let count = candidates.len();
        let Some(&winner) = candidates.first() else {
            return Decision {
                proposal: None,
                command: SteeringCommand::hold(entity.heading),
                state,
                candidates: 0,
                instant: false,
            };
        };

        let mut chosen = winner.clone();
        if chosen.erratic {
            let jitter = self.rng.gen_range(-ERRATIC_JITTER..=ERRATIC_JITTER);
            chosen.heading = normalize_angle(chosen.heading + jitter);
        }

        let safety = chosen.kind.is_safety_critical();
        let instant = safety
            || (chosen.priority >= self.instant_turn_priority && profile.allow_instant_turn);
        let heading = if instant {
            chosen.heading
        } else {
            Self::smooth(entity.heading, chosen.heading, profile)
        };
        let boost = chosen.boost && (profile.allow_boost || safety);

        Decision {
            command: SteeringCommand::new(heading, boost),
            proposal: Some(chosen),
            state,
            candidates: count,
            instant,
        }
    }

    /// Exponential approach toward `target`, capped at the profile's turn limit
    pub fn smooth(current: f32, target: f32, profile: &MovementProfile) -> f32 {
        let delta = angle_delta(current, target);
        let step = (delta * profile.smoothing).clamp(-profile.turn_limit, profile.turn_limit);
        normalize_angle(current + step)
    }
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new(0, INSTANT_TURN_PRIORITY)
    }
}
