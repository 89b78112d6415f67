//! Defensive counter-attack
//!
//! When a remembered-hostile competitor is close and its forecast path crosses a point the
//! entity can reach first with margin, steer to cut in front of it. Never raises danger and is
//! dropped by the arbiter in lockout.

use crate::engine::constants::evasion::MIN_ENTITY_SPEED;
use crate::engine::constants::sensors::*;
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::scheduler::Tier;
use crate::engine::sensors::{finite_heading, Sensor, SensorContext, SensorError, SensorReading};
use crate::engine::world::CompetitorId;
use crate::util::vec2::Vec2;

const NAME: &str = "counter_attack";

#[derive(Debug, Clone, Copy)]
struct CutOff {
    id: CompetitorId,
    point: Vec2,
    our_frames: f32,
    their_frames: f32,
    aggression: f32,
}

#[derive(Debug)]
pub struct CounterAttackSensor {
    radius: f32,
    lookahead: u32,
}

impl Default for CounterAttackSensor {
    fn default() -> Self {
        Self {
            radius: COUNTER_RADIUS,
            lookahead: COUNTER_LOOKAHEAD_FRAMES,
        }
    }
}

impl Sensor for CounterAttackSensor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn tier(&self) -> Tier {
        Tier::Quarter
    }

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError> {
        let origin = ctx.entity.position;
        let our_speed = ctx.entity.speed.max(MIN_ENTITY_SPEED);
        let mut best: Option<CutOff> = None;

        for competitor in ctx.nearby.within(self.radius) {
            let snapshot = competitor.snapshot;
            let aggression = ctx.predictor.aggression_level(snapshot.id);
            if aggression < COUNTER_MIN_AGGRESSION || snapshot.speed <= 0.0 {
                continue;
            }

            let forecast = ctx.predictor.predict_snapshot(snapshot, self.lookahead);
            let point = forecast.position + Vec2::from_angle(forecast.heading) * COUNTER_LEAD;
            let our_frames = origin.distance_to(point) / our_speed;
            let their_frames = snapshot.position.distance_to(point) / snapshot.speed;
            if our_frames > their_frames * COUNTER_TIME_MARGIN {
                continue;
            }

            if best.map_or(true, |b| aggression > b.aggression) {
                best = Some(CutOff {
                    id: snapshot.id,
                    point,
                    our_frames,
                    their_frames,
                    aggression,
                });
            }
        }

        let Some(cut) = best else {
            return Ok(SensorReading::quiet());
        };

        let heading = finite_heading(NAME, origin.bearing_to(cut.point))?;
        let boost = cut.our_frames * 2.0 <= cut.their_frames;
        let proposal = ActionProposal::new(
            ProposalKind::CounterAttack,
            heading,
            format!(
                "cut off hostile {} ({:.0} vs {:.0} frames)",
                cut.id, cut.our_frames, cut.their_frames
            ),
        )
        .with_boost(boost);
        Ok(SensorReading::propose(proposal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::predictor::AggressionReason;
    use crate::engine::sensors::test_support::Fixture;
    use crate::engine::world::{CompetitorSnapshot, ControlledEntity, WorldSnapshot};
    use crate::util::geometry::angle_between;
    use std::f32::consts::FRAC_PI_2;

    /// Competitor crossing in front of the entity, moving downward
    fn fixture(entity_speed: f32) -> Fixture {
        Fixture::new(WorldSnapshot {
            entity: Some(ControlledEntity::new(Vec2::ZERO, 0.0, entity_speed)),
            competitors: vec![CompetitorSnapshot::new(3, Vec2::new(150.0, 100.0), -FRAC_PI_2, 4.0)],
            ..Default::default()
        })
    }

    #[test]
    fn test_ignores_non_hostile() {
        let mut f = fixture(8.0);
        assert!(f.run(&mut CounterAttackSensor::default()).proposal.is_none());
    }

    #[test]
    fn test_cuts_off_hostile() {
        let mut f = fixture(8.0);
        f.predictor.mark_aggressive(3, AggressionReason::Attacking, 0.6);
        let reading = f.run(&mut CounterAttackSensor::default());
        let proposal = reading.proposal.expect("proposal");
        assert_eq!(proposal.kind, ProposalKind::CounterAttack);
        assert!(!reading.danger);
        // Cut point is (150, -10)
        assert!(angle_between(proposal.heading, Vec2::ZERO.bearing_to(Vec2::new(150.0, -10.0))) < 1e-3);
        assert!(!proposal.boost);
    }

    #[test]
    fn test_too_slow_to_cut() {
        let mut f = fixture(3.0);
        f.predictor.mark_aggressive(3, AggressionReason::Attacking, 0.6);
        assert!(f.run(&mut CounterAttackSensor::default()).proposal.is_none());
    }
}
