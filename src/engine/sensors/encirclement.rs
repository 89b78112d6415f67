//! Encirclement radar
//!
//! Sixteen angular sectors around the entity. A sector is occupied when any competitor head
//! or body point inside the radar radius overlaps it. High coverage means the entity is being
//! surrounded; the escape heads for the middle of the widest free run, with erratic jitter
//! once almost fully trapped.

use std::f32::consts::TAU;

use bitvec::prelude::*;

use crate::engine::constants::sensors::*;
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::scheduler::Tier;
use crate::engine::sensors::{finite_heading, Sensor, SensorContext, SensorError, SensorReading};
use crate::util::geometry::{angle_between, normalize_angle};

const NAME: &str = "encirclement";

#[derive(Debug)]
pub struct EncirclementSensor {
    sectors: BitVec,
    radius: f32,
}

impl Default for EncirclementSensor {
    fn default() -> Self {
        Self {
            sectors: bitvec![0; RADAR_SECTORS],
            radius: RADAR_RADIUS,
        }
    }
}

impl EncirclementSensor {
    #[inline]
    fn sector_width() -> f32 {
        TAU / RADAR_SECTORS as f32
    }

    /// Fraction of occupied sectors from the last run
    pub fn coverage(&self) -> f32 {
        self.sectors.count_ones() as f32 / RADAR_SECTORS as f32
    }

    /// Longest run of free sectors (wrap-aware) as (first sector, length)
    fn widest_free_run(&self) -> Option<(usize, usize)> {
        let n = RADAR_SECTORS;
        let mut best: Option<(usize, usize)> = None;
        let mut run_start = 0;
        let mut run_len = 0;
        for i in 0..2 * n {
            if self.sectors[i % n] {
                run_len = 0;
                continue;
            }
            if run_len == 0 {
                run_start = i;
            }
            run_len = (run_len + 1).min(n);
            if best.map_or(true, |(_, len)| run_len > len) {
                best = Some((run_start % n, run_len));
            }
        }
        best
    }

    fn mark(&mut self, bearing: f32, half_width: f32) {
        let width = Self::sector_width();
        for i in 0..RADAR_SECTORS {
            let center = (i as f32 + 0.5) * width;
            if angle_between(center, bearing) <= half_width + width * 0.5 {
                self.sectors.set(i, true);
            }
        }
    }
}

impl Sensor for EncirclementSensor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn tier(&self) -> Tier {
        Tier::Half
    }

    fn sense(&mut self, ctx: &SensorContext<'_>) -> Result<SensorReading, SensorError> {
        self.sectors.fill(false);
        let origin = ctx.entity.position;

        for competitor in ctx.nearby.reaching(self.radius) {
            for (point, radius) in competitor.snapshot.points() {
                let distance = origin.distance_to(point);
                if distance > self.radius || distance <= f32::EPSILON {
                    continue;
                }
                let half_width = ((radius + ctx.entity.radius) / distance).min(1.0).asin();
                self.mark(origin.bearing_to(point), half_width);
            }
        }

        let coverage = self.coverage();
        if coverage < ENCIRCLEMENT_CRITICAL_COVERAGE {
            return Ok(SensorReading::quiet().with_level(coverage));
        }

        let trapped = coverage >= ENCIRCLEMENT_TRAPPED_COVERAGE;
        let heading = match self.widest_free_run() {
            Some((start, len)) => (start as f32 + len as f32 * 0.5) * Self::sector_width(),
            None => ctx
                .evasion
                .away_from_threats()
                .unwrap_or(ctx.entity.heading),
        };
        let heading = finite_heading(NAME, normalize_angle(heading))?;

        let proposal = ActionProposal::new(
            ProposalKind::EncirclementCritical,
            heading,
            format!("encircled {:.0}%", coverage * 100.0),
        )
        .with_boost(true)
        .with_erratic(trapped);

        Ok(SensorReading::propose(proposal).with_danger(coverage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sensors::test_support::Fixture;
    use crate::engine::world::{BodySegment, CompetitorSnapshot, WorldSnapshot};
    use crate::util::vec2::Vec2;

    /// Body arc around the origin covering `[from, to]` radians at `radius`
    fn arc_body(id: u64, from: f32, to: f32, radius: f32) -> CompetitorSnapshot {
        let steps = 40;
        let body: Vec<BodySegment> = (1..=steps)
            .map(|i| {
                let angle = from + (to - from) * i as f32 / steps as f32;
                BodySegment { position: Vec2::polar(angle, radius), radius: 12.0 }
            })
            .collect();
        CompetitorSnapshot::new(id, Vec2::polar(from, radius), from + 1.5, 5.0).with_body(body)
    }

    #[test]
    fn test_open_field_quiet() {
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![arc_body(1, 0.0, 1.0, 200.0)],
            ..Default::default()
        });
        let mut sensor = EncirclementSensor::default();
        let reading = fixture.run(&mut sensor);
        assert!(reading.proposal.is_none());
        assert!(sensor.coverage() > 0.0);
    }

    #[test]
    fn test_escape_through_gap() {
        // Wrap from 60 degrees all the way round to -60 degrees, leaving the +x side open
        let from = 60f32.to_radians();
        let to = 300f32.to_radians();
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![arc_body(1, from, to, 150.0)],
            ..Default::default()
        });
        let mut sensor = EncirclementSensor::default();
        let reading = fixture.run(&mut sensor);
        let proposal = reading.proposal.expect("proposal");
        assert!(reading.danger);
        assert_eq!(proposal.kind, ProposalKind::EncirclementCritical);
        assert!(angle_between(proposal.heading, 0.0) < 0.3, "heading {}", proposal.heading);
    }

    #[test]
    fn test_fully_trapped_goes_erratic() {
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![arc_body(1, 0.0, TAU, 150.0)],
            ..Default::default()
        });
        let reading = fixture.run(&mut EncirclementSensor::default());
        let proposal = reading.proposal.expect("proposal");
        assert!(proposal.erratic);
        assert!(reading.danger_level >= ENCIRCLEMENT_TRAPPED_COVERAGE);
    }

    #[test]
    fn test_wrapping_body_counts_with_distant_head() {
        let mut wrapper = arc_body(1, 60f32.to_radians(), 300f32.to_radians(), 150.0);
        wrapper.position = Vec2::new(-900.0, 0.0);
        let mut fixture = Fixture::new(WorldSnapshot {
            competitors: vec![wrapper],
            ..Default::default()
        });
        let reading = fixture.run(&mut EncirclementSensor::default());
        assert!(reading.danger);
        assert!(reading.proposal.is_some());
    }
}
