//! Body-proximity sensor: steer away from any competitor head or body segment that comes
//! within the danger clearance.

use crate::engine::constants::sensors::*;
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::scheduler::Tier;
use crate::engine::sensors::{finite_heading, Sensor, SensorContext, SensorError, SensorReading};
use crate::util::vec2::Vec2;

const NAME: &str = "body_proximity";

#[derive(Debug)]
pub struct BodyProximitySensor {
    danger_clearance: f32,
    boost_clearance: f32,
}

impl Default for BodyProximitySensor {
    fn default() -> Self {
        Self {
            danger_clearance: BODY_DANGER_CLEARANCE,
            boost_clearance: BODY_BOOST_CLEARANCE,
        }
    }
}

impl Sensor for BodyProximitySensor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn tier(&self) -> Tier {
        Tier::EveryTick
    }

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError> {
        let origin = ctx.entity.position;
        let mut away = Vec2::ZERO;
        let mut min_clearance = f32::INFINITY;

        for competitor in ctx.nearby.reaching(self.danger_clearance + ctx.entity.radius) {
            for (point, radius) in competitor.snapshot.points() {
                let offset = origin - point;
                let distance = offset.length();
                let clearance = distance - radius - ctx.entity.radius;
                if clearance >= self.danger_clearance {
                    continue;
                }
                min_clearance = min_clearance.min(clearance);
                let weight = (self.danger_clearance - clearance) / self.danger_clearance;
                if distance > f32::EPSILON {
                    away += offset * (weight / distance);
                }
            }
        }

        if !min_clearance.is_finite() {
            return Ok(SensorReading::quiet());
        }

        // Symmetric pinch: slide sideways instead of stalling
        let heading = if away.length_sq() > 1e-6 {
            away.angle()
        } else {
            ctx.entity.heading + std::f32::consts::FRAC_PI_2
        };
        let heading = finite_heading(NAME, heading)?;
        let level = 1.0 - min_clearance.max(0.0) / self.danger_clearance;
        let proposal = ActionProposal::new(
            ProposalKind::BodyProximity,
            heading,
            format!("body clearance {:.0}", min_clearance),
        )
        .with_boost(min_clearance < self.boost_clearance);

        Ok(SensorReading::propose(proposal).with_danger(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sensors::test_support::Fixture;
    use crate::engine::world::{BodySegment, CompetitorSnapshot, WorldSnapshot};
    use crate::util::geometry::angle_between;
    use std::f32::consts::PI;

    fn wall(x: f32) -> CompetitorSnapshot {
        let body = (-5..=5)
            .map(|i| BodySegment { position: Vec2::new(x, i as f32 * 15.0), radius: 10.0 })
            .collect();
        CompetitorSnapshot::new(1, Vec2::new(x, 90.0), PI / 2.0, 4.0).with_body(body)
    }

    #[test]
    fn test_clear_when_far() {
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![wall(300.0)],
            ..Default::default()
        });
        let reading = fixture.run(&mut BodyProximitySensor::default());
        assert!(reading.proposal.is_none());
        assert!(!reading.danger);
    }

    #[test]
    fn test_steers_away_from_body() {
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![wall(60.0)],
            ..Default::default()
        });
        let reading = fixture.run(&mut BodyProximitySensor::default());
        let proposal = reading.proposal.expect("proposal");
        assert!(reading.danger);
        assert_eq!(proposal.kind, ProposalKind::BodyProximity);
        assert!(angle_between(proposal.heading, PI) < 0.3);
        assert!(!proposal.boost);
    }

    #[test]
    fn test_boost_when_very_close() {
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![wall(45.0)],
            ..Default::default()
        });
        let reading = fixture.run(&mut BodyProximitySensor::default());
        assert!(reading.proposal.expect("proposal").boost);
        assert!(reading.danger_level > 0.5);
    }

    #[test]
    fn test_body_near_while_head_far() {
        // Head 500 units out, body trailing back past the entity at y = 25
        let body = (0..40)
            .map(|i| BodySegment { position: Vec2::new(488.0 - i as f32 * 12.0, 25.0), radius: 10.0 })
            .collect();
        let long = CompetitorSnapshot::new(2, Vec2::new(500.0, 25.0), 0.0, 4.0).with_body(body);
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![long],
            ..Default::default()
        });
        let reading = fixture.run(&mut BodyProximitySensor::default());
        let proposal = reading.proposal.expect("proposal");
        assert!(reading.danger);
        assert!(proposal.heading.sin() < 0.0, "heading {} should point away from the body", proposal.heading);
    }
}
