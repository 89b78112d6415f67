//! Radius-linked grouping and cluster discovery

use bitvec::prelude::*;
use serde::Serialize;

use crate::engine::risk::RiskAssessment;
use crate::engine::spatial::TargetGrid;
use crate::engine::targeting::ScanContext;
use crate::engine::world::TargetPoint;
use crate::util::vec2::Vec2;

/// Connected components of `candidates`, where two points connect when they lie within
/// `link_radius` of each other. Points outside `candidates` never join a group.
pub fn link_groups(
    targets: &[TargetPoint],
    grid: &TargetGrid,
    candidates: &[usize],
    link_radius: f32,
) -> Vec<Vec<usize>> {
    let mut in_set = bitvec![0; targets.len()];
    for &i in candidates {
        if i < targets.len() {
            in_set.set(i, true);
        }
    }

    let mut visited = bitvec![0; targets.len()];
    let mut groups = Vec::new();
    let mut stack = Vec::new();
    for &seed in candidates {
        if seed >= targets.len() || visited[seed] {
            continue;
        }
        visited.set(seed, true);
        stack.push(seed);

        let mut group = Vec::new();
        while let Some(i) = stack.pop() {
            group.push(i);
            for j in grid.query_radius(targets, targets[i].position, link_radius) {
                if in_set[j] && !visited[j] {
                    visited.set(j, true);
                    stack.push(j);
                }
            }
        }
        groups.push(group);
    }
    groups
}

/// Radius-linked group of target points
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub members: Vec<usize>,
    /// Value-weighted center
    pub centroid: Vec2,
    pub total_value: f32,
    /// Distance from the entity to the centroid
    pub distance: f32,
    /// total * sqrt(count) / distance
    pub score: f32,
    pub assessment: RiskAssessment,
}

impl Cluster {
    pub fn from_members(ctx: &ScanContext<'_>, members: Vec<usize>) -> Self {
        let targets = ctx.targets;
        let total_value: f32 = members.iter().map(|&i| targets[i].value).sum();
        let centroid = if total_value > f32::EPSILON {
            members
                .iter()
                .map(|&i| targets[i].position * targets[i].value)
                .sum::<Vec2>()
                * (1.0 / total_value)
        } else {
            members.iter().map(|&i| targets[i].position).sum::<Vec2>()
                * (1.0 / members.len().max(1) as f32)
        };
        let distance = ctx.entity.position.distance_to(centroid);
        let score = total_value * (members.len() as f32).sqrt() / distance.max(1.0);
        let assessment = ctx.risk.score_point(centroid, Some(total_value), ctx.competitors);

        Self {
            members,
            centroid,
            total_value,
            distance,
            score,
            assessment,
        }
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Member closest to `origin`
    pub fn nearest_member(&self, targets: &[TargetPoint], origin: Vec2) -> Option<usize> {
        self.members.iter().copied().min_by(|&a, &b| {
            targets[a]
                .position
                .distance_sq_to(origin)
                .total_cmp(&targets[b].position.distance_sq_to(origin))
        })
    }
}

/// Clusters of at least `min_points` among `candidates`, best score first
pub fn find_clusters(
    ctx: &ScanContext<'_>,
    candidates: &[usize],
    link_radius: f32,
    min_points: usize,
) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = link_groups(ctx.targets, ctx.grid, candidates, link_radius)
        .into_iter()
        .filter(|group| group.len() >= min_points)
        .map(|group| Cluster::from_members(ctx, group))
        .collect();
    clusters.sort_by(|a, b| b.score.total_cmp(&a.score));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::risk::RiskEvaluator;
    use crate::engine::world::ControlledEntity;

    fn setup(coords: &[(f32, f32, f32)]) -> (Vec<TargetPoint>, TargetGrid, Vec<usize>) {
        let targets: Vec<TargetPoint> = coords
            .iter()
            .map(|&(x, y, v)| TargetPoint::new(Vec2::new(x, y), v))
            .collect();
        let mut grid = TargetGrid::default();
        grid.rebuild(&targets);
        let candidates = (0..targets.len()).collect();
        (targets, grid, candidates)
    }

    #[test]
    fn test_link_groups_transitive() {
        let (targets, grid, candidates) = setup(&[
            (0.0, 0.0, 1.0),
            (40.0, 0.0, 1.0),
            (80.0, 0.0, 1.0),
            (400.0, 0.0, 1.0),
        ]);
        let mut groups = link_groups(&targets, &grid, &candidates, 50.0);
        groups.iter_mut().for_each(|g| g.sort_unstable());
        groups.sort_by_key(|g| g.len());
        assert_eq!(groups, vec![vec![3], vec![0, 1, 2]]);
    }

    #[test]
    fn test_link_groups_respects_candidate_set() {
        let (targets, grid, _) = setup(&[(0.0, 0.0, 1.0), (40.0, 0.0, 1.0), (80.0, 0.0, 1.0)]);
        let groups = link_groups(&targets, &grid, &[0, 2], 50.0);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_clusters_ranked_by_score() {
        let (targets, grid, candidates) = setup(&[
            (100.0, 0.0, 2.0),
            (120.0, 0.0, 2.0),
            (500.0, 0.0, 2.0),
            (520.0, 0.0, 2.0),
            (900.0, 900.0, 5.0),
        ]);
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let risk = RiskEvaluator::default();
        let ctx = ScanContext {
            targets: &targets,
            grid: &grid,
            entity: &entity,
            risk: &risk,
            competitors: &[],
        };
        let clusters = find_clusters(&ctx, &candidates, 50.0, 2);
        assert_eq!(clusters.len(), 2);
        assert!((clusters[0].centroid.x - 110.0).abs() < 1e-3);
        assert!(clusters[0].score > clusters[1].score);
        let nearest = clusters[0].nearest_member(&targets, Vec2::ZERO);
        assert_eq!(nearest.map(|i| targets[i].position.x), Some(100.0));
    }
}
