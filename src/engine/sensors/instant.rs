//! Instant evasion: vector sum of every nearby danger point, weighted by proximity.
//! The summed weight decides urgency; the direction is refined against the evasion rings.

use crate::engine::constants::sensors::*;
use crate::engine::evasion::best_escape;
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::scheduler::Tier;
use crate::engine::sensors::{finite_heading, Sensor, SensorContext, SensorError, SensorReading};
use crate::util::vec2::Vec2;

const NAME: &str = "instant_evasion";

#[derive(Debug)]
pub struct InstantEvasionSensor {
    radius: f32,
}

impl Default for InstantEvasionSensor {
    fn default() -> Self {
        Self {
            radius: INSTANT_RADIUS,
        }
    }
}

impl Sensor for InstantEvasionSensor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn tier(&self) -> Tier {
        Tier::EveryTick
    }

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError> {
        let origin = ctx.entity.position;
        let mut away = Vec2::ZERO;
        let mut urgency = 0.0;

        for competitor in ctx.nearby.reaching(self.radius) {
            let boost_weight = if competitor.snapshot.boosting { INSTANT_BOOST_WEIGHT } else { 1.0 };
            for (point, _) in competitor.snapshot.points() {
                let offset = origin - point;
                let distance = offset.length();
                if distance >= self.radius || distance <= f32::EPSILON {
                    continue;
                }
                let weight = (1.0 - distance / self.radius) * boost_weight;
                away += offset * (weight / distance);
                urgency += weight;
            }
        }

        if urgency < INSTANT_MEDIUM {
            return Ok(SensorReading::quiet().with_level(urgency));
        }

        let preferred = if away.length_sq() > 1e-6 {
            away.angle()
        } else {
            ctx.evasion.away_from_threats().unwrap_or(ctx.entity.heading)
        };
        let escape = best_escape(preferred, ctx.evasion);
        let heading = finite_heading(NAME, escape.heading)?;
        let reason = format!("instant evasion urgency {:.2}", urgency);

        if urgency >= INSTANT_HIGH {
            let proposal = ActionProposal::new(ProposalKind::InstantEvasionHigh, heading, reason)
                .with_boost(true);
            Ok(SensorReading::propose(proposal).with_danger(urgency))
        } else {
            let proposal = ActionProposal::new(ProposalKind::InstantEvasionMedium, heading, reason);
            Ok(SensorReading::propose(proposal).with_level(urgency))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sensors::test_support::Fixture;
    use crate::engine::world::{CompetitorSnapshot, WorldSnapshot};
    use crate::util::geometry::angle_between;
    use std::f32::consts::PI;

    fn run_with(competitors: Vec<CompetitorSnapshot>) -> SensorReading {
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors,
            ..Default::default()
        });
        fixture.run(&mut InstantEvasionSensor::default())
    }

    #[test]
    fn test_far_competitor_quiet() {
        let reading = run_with(vec![CompetitorSnapshot::new(1, Vec2::new(190.0, 0.0), PI, 4.0)]);
        assert!(reading.proposal.is_none());
        assert!(reading.danger_level < INSTANT_MEDIUM);
    }

    #[test]
    fn test_medium_urgency() {
        let reading = run_with(vec![CompetitorSnapshot::new(1, Vec2::new(100.0, 0.0), PI / 2.0, 4.0)]);
        let proposal = reading.proposal.expect("proposal");
        assert_eq!(proposal.kind, ProposalKind::InstantEvasionMedium);
        assert!(!reading.danger);
        assert!(angle_between(proposal.heading, 0.0) > PI / 2.0);
    }

    #[test]
    fn test_boosting_close_is_high() {
        let reading = run_with(vec![
            CompetitorSnapshot::new(1, Vec2::new(40.0, 0.0), PI, 8.0).boosting(true)
        ]);
        let proposal = reading.proposal.expect("proposal");
        assert_eq!(proposal.kind, ProposalKind::InstantEvasionHigh);
        assert!(reading.danger);
        assert!(proposal.boost);
        assert!(angle_between(proposal.heading, 0.0) > PI / 2.0);
    }
}
