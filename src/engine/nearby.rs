//! Per-tick memo of competitors sorted by distance.
//!
//! Built once at tick start and shared by every sensor, so no sensor repeats the O(n)
//! scan. Rebuilding for a new tick invalidates the previous contents.

use smallvec::SmallVec;

use crate::engine::world::{CompetitorSnapshot, WorldSnapshot};
use crate::util::vec2::Vec2;

/// One competitor relative to the controlled entity
#[derive(Debug, Clone, Copy)]
pub struct NearbyCompetitor<'w> {
    pub snapshot: &'w CompetitorSnapshot,
    /// Head distance from the controlled entity
    pub distance: f32,
    /// Heading from the controlled entity toward the competitor head
    pub bearing: f32,
    /// Edge distance to the closest point of the competitor, head or body, floored at 0
    pub reach: f32,
}

/// Closest edge distance from `origin` to any of the competitor's points
fn reach_of(origin: Vec2, competitor: &CompetitorSnapshot) -> f32 {
    competitor
        .points()
        .map(|(point, radius)| (origin.distance_to(point) - radius).max(0.0))
        .fold(f32::INFINITY, f32::min)
}

/// Competitors within the tracking radius, nearest first
#[derive(Debug, Default)]
pub struct NearbyCompetitors<'w> {
    tick: u64,
    origin: Vec2,
    entries: Vec<NearbyCompetitor<'w>>,
}

impl<'w> NearbyCompetitors<'w> {
    /// Scan the snapshot once for this tick. A competitor is kept when its head or any body
    /// segment comes within `tracking_radius`.
    pub fn build(world: &'w WorldSnapshot, origin: Vec2, tracking_radius: f32, tick: u64) -> Self {
        let mut entries: Vec<NearbyCompetitor<'w>> = world
            .competitors
            .iter()
            .filter(|c| c.position.is_finite())
            .filter_map(|c| {
                let distance = origin.distance_to(c.position);
                let reach = reach_of(origin, c);
                (distance <= tracking_radius || reach <= tracking_radius).then(|| NearbyCompetitor {
                    snapshot: c,
                    distance,
                    bearing: origin.bearing_to(c.position),
                    reach,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        Self { tick, origin, entries }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all(&self) -> &[NearbyCompetitor<'w>] {
        &self.entries
    }

    /// Competitors whose head lies within `radius`, nearest first
    pub fn within(&self, radius: f32) -> impl Iterator<Item = &NearbyCompetitor<'w>> + '_ {
        self.entries.iter().take_while(move |c| c.distance <= radius)
    }

    /// Competitors with any point (head or body edge) within `radius`, in head-distance order
    pub fn reaching(&self, radius: f32) -> impl Iterator<Item = &NearbyCompetitor<'w>> + '_ {
        self.entries.iter().filter(move |c| c.reach <= radius)
    }

    pub fn nearest(&self) -> Option<&NearbyCompetitor<'w>> {
        self.entries.first()
    }

    /// Snapshots within `radius`, for APIs that take plain competitor lists
    pub fn snapshots_within(&self, radius: f32) -> SmallVec<[&'w CompetitorSnapshot; 32]> {
        self.within(radius).map(|c| c.snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::world::BodySegment;

    fn world_with(positions: &[(f32, f32)]) -> WorldSnapshot {
        WorldSnapshot {
            competitors: positions
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| CompetitorSnapshot::new(i as u64, Vec2::new(x, y), 0.0, 4.0))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sorted_by_distance_and_filtered() {
        let world = world_with(&[(300.0, 0.0), (100.0, 0.0), (2000.0, 0.0), (0.0, 200.0)]);
        let nearby = NearbyCompetitors::build(&world, Vec2::ZERO, 1000.0, 7);

        assert_eq!(nearby.tick(), 7);
        assert_eq!(nearby.len(), 3);
        let ids: Vec<_> = nearby.all().iter().map(|c| c.snapshot.id).collect();
        assert_eq!(ids, vec![1, 3, 0]);
    }

    #[test]
    fn test_within_stops_at_radius() {
        let world = world_with(&[(50.0, 0.0), (150.0, 0.0), (250.0, 0.0)]);
        let nearby = NearbyCompetitors::build(&world, Vec2::ZERO, 1000.0, 0);
        assert_eq!(nearby.within(160.0).count(), 2);
        assert_eq!(nearby.snapshots_within(10.0).len(), 0);
    }

    /// Head far away, body trailing back to within 15 units of the origin
    fn long_body() -> CompetitorSnapshot {
        let body = (0..40)
            .map(|i| BodySegment { position: Vec2::new(487.5 - i as f32 * 12.0, 15.0), radius: 10.0 })
            .collect();
        CompetitorSnapshot::new(9, Vec2::new(500.0, 15.0), 0.0, 4.0).with_body(body)
    }

    #[test]
    fn test_reach_tracks_closest_body_point() {
        let world = WorldSnapshot {
            competitors: vec![long_body()],
            ..Default::default()
        };
        let nearby = NearbyCompetitors::build(&world, Vec2::ZERO, 1000.0, 0);
        let c = nearby.nearest().expect("tracked");
        assert!(c.distance > 500.0);
        assert!(c.reach < 20.0, "reach {}", c.reach);
        assert_eq!(nearby.within(100.0).count(), 0);
        assert_eq!(nearby.reaching(100.0).count(), 1);
    }

    #[test]
    fn test_body_inside_tracking_radius_keeps_far_head() {
        let world = WorldSnapshot {
            competitors: vec![long_body()],
            ..Default::default()
        };
        let nearby = NearbyCompetitors::build(&world, Vec2::ZERO, 300.0, 0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby.within(300.0).count(), 0);
        assert_eq!(nearby.reaching(300.0).count(), 1);
    }

    #[test]
    fn test_empty_world() {
        let world = WorldSnapshot::default();
        let nearby = NearbyCompetitors::build(&world, Vec2::ZERO, 1000.0, 0);
        assert!(nearby.is_empty());
        assert!(nearby.nearest().is_none());
    }
}
