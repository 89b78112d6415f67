//! Arena boundary sensor
//!
//! Two tiers by depth fraction (distance from center / radius): warning at 80%, emergency
//! at 92%. Both steer back toward the center; only the emergency raises the danger flag.

use crate::engine::constants::sensors::*;
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::scheduler::Tier;
use crate::engine::sensors::{finite_heading, Sensor, SensorContext, SensorError, SensorReading};
use crate::engine::world::ArenaBoundary;
use crate::util::vec2::Vec2;

const NAME: &str = "boundary";

#[derive(Debug)]
pub struct BoundarySensor {
    warning_fraction: f32,
    emergency_fraction: f32,
}

impl Default for BoundarySensor {
    fn default() -> Self {
        Self {
            warning_fraction: BOUNDARY_WARNING_FRACTION,
            emergency_fraction: BOUNDARY_EMERGENCY_FRACTION,
        }
    }
}

impl BoundarySensor {
    /// Tiered danger for `position`: 0 inside the warning band, then warning, then emergency
    pub fn danger_level(&self, boundary: &ArenaBoundary, position: Vec2) -> f32 {
        let depth = boundary.depth_fraction(position);
        if depth >= self.emergency_fraction {
            BOUNDARY_EMERGENCY_DANGER
        } else if depth >= self.warning_fraction {
            BOUNDARY_WARNING_DANGER
        } else {
            0.0
        }
    }
}

impl Sensor for BoundarySensor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn tier(&self) -> Tier {
        Tier::EveryTick
    }

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError> {
        let boundary = &ctx.world.boundary;
        if boundary.radius <= 0.0 {
            return Ok(SensorReading::quiet());
        }

        let position = ctx.entity.position;
        let level = self.danger_level(boundary, position);
        if level <= 0.0 {
            return Ok(SensorReading::quiet());
        }

        let inward = finite_heading(NAME, position.bearing_to(boundary.center))?;
        let depth = boundary.depth_fraction(position);
        let reason = format!("boundary depth {:.0}%", depth * 100.0);

        if level >= BOUNDARY_EMERGENCY_DANGER {
            let proposal = ActionProposal::new(ProposalKind::BoundaryEmergency, inward, reason);
            Ok(SensorReading::propose(proposal).with_danger(level))
        } else {
            let proposal = ActionProposal::new(ProposalKind::BoundaryWarning, inward, reason);
            Ok(SensorReading::propose(proposal).with_level(level))
        }
    }
}
