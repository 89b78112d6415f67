//! Idle wander: lowest-priority fallback that drifts back toward the arena center once the
//! entity strays past the drift fraction. Quiet otherwise, letting the arbiter hold heading.

use crate::engine::constants::sensors::*;
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::scheduler::Tier;
use crate::engine::sensors::{finite_heading, Sensor, SensorContext, SensorError, SensorReading};
use crate::util::geometry::angle_delta;

const NAME: &str = "idle_wander";

#[derive(Debug)]
pub struct IdleWanderSensor {
    drift_fraction: f32,
    max_turn: f32,
}

impl Default for IdleWanderSensor {
    fn default() -> Self {
        Self {
            drift_fraction: WANDER_DRIFT_FRACTION,
            max_turn: WANDER_TURN,
        }
    }
}

impl Sensor for IdleWanderSensor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn tier(&self) -> Tier {
        Tier::Eighth
    }

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError> {
        let boundary = &ctx.world.boundary;
        let depth = boundary.depth_fraction(ctx.entity.position);
        if depth <= self.drift_fraction {
            return Ok(SensorReading::quiet());
        }

        let inward = ctx.entity.position.bearing_to(boundary.center);
        let turn = angle_delta(ctx.entity.heading, inward).clamp(-self.max_turn, self.max_turn);
        let heading = finite_heading(NAME, ctx.entity.heading + turn)?;
        let proposal = ActionProposal::new(
            ProposalKind::IdleWander,
            heading,
            format!("drift inward from {:.0}%", depth * 100.0),
        );
        Ok(SensorReading::propose(proposal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sensors::test_support::Fixture;
    use crate::engine::world::{ArenaBoundary, ControlledEntity, WorldSnapshot};
    use crate::util::geometry::angle_between;
    use crate::util::vec2::Vec2;

    fn at(x: f32, heading: f32) -> SensorReading {
        let mut f = Fixture::new(WorldSnapshot {
            entity: Some(ControlledEntity::new(Vec2::new(x, 0.0), heading, 5.0)),
            boundary: ArenaBoundary::new(Vec2::ZERO, 1000.0),
            ..Default::default()
        });
        f.run(&mut IdleWanderSensor::default())
    }

    #[test]
    fn test_quiet_near_center() {
        assert!(at(200.0, 0.0).proposal.is_none());
    }

    #[test]
    fn test_turn_is_bounded() {
        // Heading straight out, center is behind: only a bounded turn
        let proposal = at(600.0, 0.0).proposal.expect("proposal");
        assert_eq!(proposal.kind, ProposalKind::IdleWander);
        assert!((proposal.heading.abs() - WANDER_TURN).abs() < 1e-4);
    }

    #[test]
    fn test_small_correction_lands_on_center() {
        let proposal = at(600.0, std::f32::consts::PI - 0.1).proposal.expect("proposal");
        assert!(angle_between(proposal.heading, std::f32::consts::PI) < 1e-4);
    }
}
