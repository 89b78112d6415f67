//! Target selection engine
//!
//! Selection order: debris field, best chain (with network bonus), best cluster, single
//! largest nearby point, then any point ahead of the heading. Any candidate the risk
//! evaluator rates `Avoid` is skipped and selection falls through to the next kind.

pub mod chain;
pub mod cluster;
pub mod debris;
pub mod network;

use serde::Serialize;
use tracing::trace;

use crate::engine::constants::targeting::*;
use crate::engine::proposal::{ActionProposal, ProposalKind};
use crate::engine::risk::{DebrisAssessment, RiskAssessment, RiskDecision, RiskEvaluator};
use crate::engine::spatial::TargetGrid;
use crate::engine::world::{CompetitorSnapshot, ControlledEntity, TargetPoint};
use crate::util::vec2::Vec2;

use self::chain::find_chains;
use self::cluster::find_clusters;
use self::debris::find_debris_fields;
use self::network::{build_networks, Network, NodeRef};

/// Shared inputs for one target scan
#[derive(Clone, Copy)]
pub struct ScanContext<'a> {
    pub targets: &'a [TargetPoint],
    pub grid: &'a TargetGrid,
    pub entity: &'a ControlledEntity,
    pub risk: &'a RiskEvaluator,
    pub competitors: &'a [&'a CompetitorSnapshot],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetKind {
    Debris,
    Chain,
    Cluster,
    /// Largest single point nearby
    Single,
    /// Fallback: any point ahead of the heading
    Ahead,
}

impl TargetKind {
    pub fn proposal_kind(self) -> ProposalKind {
        match self {
            TargetKind::Debris => ProposalKind::TargetDebris,
            TargetKind::Chain => ProposalKind::TargetChain,
            TargetKind::Cluster => ProposalKind::TargetCluster,
            TargetKind::Single | TargetKind::Ahead => ProposalKind::TargetSingle,
        }
    }
}

/// The active target with its risk/reward breakdown
#[derive(Debug, Clone, Serialize)]
pub struct TargetChoice {
    pub kind: TargetKind,
    /// Point being steered toward
    pub aim: Vec2,
    pub heading: f32,
    pub distance: f32,
    pub value: f32,
    /// Point count (chains, clusters, debris fields); 1 for single points
    pub length: usize,
    /// Nodes in the network this target belongs to (1 when standalone)
    pub network_size: usize,
    pub assessment: RiskAssessment,
    pub debris: Option<DebrisAssessment>,
    pub boost: bool,
    /// Waypoints followed after `aim`: a chain's exit and the rest of its network, or a
    /// cluster's centroid
    pub route: Vec<Vec2>,
}

impl TargetChoice {
    fn new(kind: TargetKind, origin: Vec2, aim: Vec2, value: f32, assessment: RiskAssessment) -> Self {
        Self {
            kind,
            aim,
            heading: origin.bearing_to(aim),
            distance: origin.distance_to(aim),
            value,
            length: 1,
            network_size: 1,
            assessment,
            debris: None,
            boost: false,
            route: Vec::new(),
        }
    }

    /// Re-aim from a new entity position between scans, stepping to the next route waypoint
    /// once the current aim is reached
    pub fn retarget(&mut self, origin: Vec2) {
        while !self.route.is_empty() && origin.distance_to(self.aim) < ROUTE_WAYPOINT_RADIUS {
            self.aim = self.route.remove(0);
        }
        self.heading = origin.bearing_to(self.aim);
        self.distance = origin.distance_to(self.aim);
    }

    pub fn to_proposal(&self) -> ActionProposal {
        let reason = match self.kind {
            TargetKind::Debris => format!("debris field value {:.0}", self.value),
            TargetKind::Chain => format!("chain of {} (network {})", self.length, self.network_size),
            TargetKind::Cluster => format!("cluster of {}", self.length),
            TargetKind::Single => format!("largest point value {:.1}", self.value),
            TargetKind::Ahead => "point ahead".to_string(),
        };
        ActionProposal::new(self.kind.proposal_kind(), self.heading, reason).with_boost(self.boost)
    }
}

/// Structure counts from the last scan
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanStats {
    pub candidates: usize,
    pub debris_fields: usize,
    pub chains: usize,
    pub clusters: usize,
    pub networks: usize,
}

/// Runs the target scan and remembers the last choice
#[derive(Debug)]
pub struct TargetSelector {
    grid: TargetGrid,
    scan_radius: f32,
    last: Option<TargetChoice>,
    stats: ScanStats,
    scans: u64,
}

impl TargetSelector {
    pub fn new(scan_radius: f32) -> Self {
        Self {
            grid: TargetGrid::default(),
            scan_radius,
            last: None,
            stats: ScanStats::default(),
            scans: 0,
        }
    }

    pub fn last_choice(&self) -> Option<&TargetChoice> {
        self.last.as_ref()
    }

    /// Last choice re-aimed from `origin`, for ticks where the scan does not run
    pub fn carry_forward(&mut self, origin: Vec2) -> Option<&TargetChoice> {
        if let Some(choice) = self.last.as_mut() {
            choice.retarget(origin);
        }
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    pub fn scans(&self) -> u64 {
        self.scans
    }

    /// Full scan over `targets`
    pub fn select(
        &mut self,
        entity: &ControlledEntity,
        targets: &[TargetPoint],
        competitors: &[&CompetitorSnapshot],
        risk: &RiskEvaluator,
    ) -> Option<&TargetChoice> {
        self.scans += 1;
        self.grid.rebuild(targets);

        let ctx = ScanContext {
            targets,
            grid: &self.grid,
            entity,
            risk,
            competitors,
        };
        let (choice, stats) = Self::choose(&ctx, self.scan_radius);
        if let Some(c) = &choice {
            trace!(kind = ?c.kind, value = c.value, distance = c.distance, "Target selected");
        }
        self.stats = stats;
        self.last = choice;
        self.last.as_ref()
    }

    fn choose(ctx: &ScanContext<'_>, scan_radius: f32) -> (Option<TargetChoice>, ScanStats) {
        let origin = ctx.entity.position;
        let targets = ctx.targets;
        let mut stats = ScanStats::default();

        // 1. Debris fields
        let fields = find_debris_fields(ctx);
        stats.debris_fields = fields.len();
        for field in &fields {
            let debris = ctx.risk.assess_debris_field(
                field.cluster.centroid,
                field.cluster.total_value,
                ctx.competitors,
            );
            if !debris.accepted {
                continue;
            }
            let mut choice = TargetChoice::new(
                TargetKind::Debris,
                origin,
                field.cluster.centroid,
                field.cluster.total_value,
                debris.base,
            );
            choice.length = field.cluster.count();
            choice.boost = debris.base.decision == RiskDecision::Safe
                && choice.distance > DEBRIS_BOOST_DISTANCE;
            choice.debris = Some(debris);
            return (Some(choice), stats);
        }

        let mut candidates: Vec<usize> =
            ctx.grid.query_radius(targets, origin, scan_radius).collect();
        candidates.sort_by(|&a, &b| {
            targets[a]
                .position
                .distance_sq_to(origin)
                .total_cmp(&targets[b].position.distance_sq_to(origin))
        });
        candidates.truncate(MAX_SCAN_POINTS);
        stats.candidates = candidates.len();
        if candidates.is_empty() {
            return (None, stats);
        }

        let chains = find_chains(ctx, &candidates);
        let clusters = find_clusters(ctx, &candidates, CLUSTER_LINK_RADIUS, CLUSTER_MIN_POINTS);
        let networks = build_networks(ctx, &chains, &clusters);
        stats.chains = chains.len();
        stats.clusters = clusters.len();
        stats.networks = networks.len();

        // 2. Chains, boosted by the network they belong to
        let mut ranked: Vec<(usize, f32, Option<&Network>)> = chains
            .iter()
            .enumerate()
            .map(|(i, chain)| {
                let network = networks.iter().find(|n| n.contains(NodeRef::Chain(i)));
                let bonus = network.map_or(0.0, |n| n.bonus());
                (i, chain.score * (1.0 + bonus), network)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (i, _, network) in ranked {
            let chain = &chains[i];
            if chain.assessment.decision == RiskDecision::Avoid {
                continue;
            }
            let entry = targets[chain.entry()].position;
            let mut choice =
                TargetChoice::new(TargetKind::Chain, origin, entry, chain.total_value, chain.assessment);
            choice.length = chain.len();
            if let Some(&exit) = chain.members.last() {
                choice.route.push(targets[exit].position);
            }
            if let Some(network) = network.filter(|n| n.nodes.len() > 1) {
                choice.network_size = network.nodes.len();
                choice.route.extend(network.waypoints_after(NodeRef::Chain(i)));
            }
            return (Some(choice), stats);
        }

        // 3. Clusters
        // Aim at the closest member, then sweep through the centroid
        if let Some(cluster) = clusters.iter().find(|c| c.assessment.decision != RiskDecision::Avoid) {
            let aim = cluster
                .nearest_member(targets, origin)
                .map_or(cluster.centroid, |i| targets[i].position);
            let mut choice =
                TargetChoice::new(TargetKind::Cluster, origin, aim, cluster.total_value, cluster.assessment);
            choice.length = cluster.count();
            if aim != cluster.centroid {
                choice.route.push(cluster.centroid);
            }
            return (Some(choice), stats);
        }

        // 4. Single largest nearby point
        let largest = candidates.iter().copied().max_by(|&a, &b| {
            targets[a]
                .value
                .total_cmp(&targets[b].value)
                .then_with(|| {
                    targets[b]
                        .position
                        .distance_sq_to(origin)
                        .total_cmp(&targets[a].position.distance_sq_to(origin))
                })
        });
        if let Some(i) = largest {
            let point = targets[i];
            let assessment = ctx.risk.score_point(point.position, Some(point.value), ctx.competitors);
            if assessment.decision != RiskDecision::Avoid {
                let choice =
                    TargetChoice::new(TargetKind::Single, origin, point.position, point.value, assessment);
                return (Some(choice), stats);
            }
        }

        // 5. Anything ahead, nearest first
        let forward = Vec2::from_angle(ctx.entity.heading);
        for &i in &candidates {
            let point = targets[i];
            let to_point = (point.position - origin).normalize();
            if forward.dot(to_point) <= AHEAD_COS {
                continue;
            }
            let assessment = ctx.risk.score_point(point.position, Some(point.value), ctx.competitors);
            if assessment.decision != RiskDecision::Avoid {
                let choice =
                    TargetChoice::new(TargetKind::Ahead, origin, point.position, point.value, assessment);
                return (Some(choice), stats);
            }
        }

        (None, stats)
    }
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new(SCAN_RADIUS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn select(
        entity: &ControlledEntity,
        targets: &[TargetPoint],
        competitors: &[&CompetitorSnapshot],
    ) -> Option<TargetChoice> {
        let mut selector = TargetSelector::default();
        selector
            .select(entity, targets, competitors, &RiskEvaluator::default())
            .cloned()
    }

    #[test]
    fn test_single_point_ahead() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets = [TargetPoint::new(Vec2::new(150.0, 0.0), 1.0)];
        let choice = select(&entity, &targets, &[]).expect("target");
        assert_eq!(choice.kind, TargetKind::Single);
        assert!(!choice.boost);
        assert!(choice.heading.abs() < 1e-5);
        assert_eq!(choice.to_proposal().kind, ProposalKind::TargetSingle);
    }

    #[test]
    fn test_collinear_points_select_chain() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets: Vec<TargetPoint> = (0..5)
            .map(|i| TargetPoint::new(Vec2::new(100.0 + i as f32 * 40.0, 0.0), 1.0))
            .collect();
        let choice = select(&entity, &targets, &[]).expect("target");
        assert_eq!(choice.kind, TargetKind::Chain);
        assert_eq!(choice.length, 5);
        assert_eq!(choice.aim, Vec2::new(100.0, 0.0));
        assert_eq!(choice.network_size, 1);
        assert_eq!(choice.route, vec![Vec2::new(260.0, 0.0)]);
    }

    /// Four-point chain along +x with a two-point blob 75 units past its exit
    fn chain_with_blob() -> Vec<TargetPoint> {
        let mut targets: Vec<TargetPoint> = (0..4)
            .map(|i| TargetPoint::new(Vec2::new(100.0 + i as f32 * 40.0, 0.0), 1.0))
            .collect();
        for (x, y) in [(295.0, 0.0), (300.0, 10.0)] {
            targets.push(TargetPoint::new(Vec2::new(x, y), 3.0));
        }
        targets
    }

    #[test]
    fn test_chain_route_follows_network() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let choice = select(&entity, &chain_with_blob(), &[]).expect("target");
        assert_eq!(choice.kind, TargetKind::Chain);
        assert_eq!(choice.network_size, 2);
        assert_eq!(choice.route.len(), 2);
        assert_eq!(choice.route[0], Vec2::new(220.0, 0.0));
        assert!(choice.route[1].distance_to(Vec2::new(297.5, 5.0)) < 1e-3, "{:?}", choice.route);
    }

    #[test]
    fn test_carry_forward_steps_along_route() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets = chain_with_blob();
        let mut selector = TargetSelector::default();
        selector.select(&entity, &targets, &[], &RiskEvaluator::default());

        let choice = selector.carry_forward(Vec2::new(95.0, 0.0)).expect("carried");
        assert_eq!(choice.aim, Vec2::new(220.0, 0.0));
        assert_eq!(choice.route.len(), 1);

        let choice = selector.carry_forward(Vec2::new(215.0, 0.0)).expect("carried");
        assert!(choice.aim.distance_to(Vec2::new(297.5, 5.0)) < 1e-3);
        assert!(choice.route.is_empty());
        assert!(choice.heading.abs() < 0.1);
    }

    #[test]
    fn test_cluster_aims_at_nearest_member() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets = [
            TargetPoint::new(Vec2::new(295.0, 0.0), 3.0),
            TargetPoint::new(Vec2::new(305.0, 8.0), 3.0),
        ];
        let choice = select(&entity, &targets, &[]).expect("target");
        assert_eq!(choice.kind, TargetKind::Cluster);
        assert_eq!(choice.aim, Vec2::new(295.0, 0.0));
        assert_eq!(choice.route.len(), 1);
        assert!(choice.route[0].distance_to(Vec2::new(300.0, 4.0)) < 1e-3);
    }

    #[test]
    fn test_debris_field_boosts_when_safe_and_far() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets: Vec<TargetPoint> = (0..6)
            .map(|i| TargetPoint::new(Vec2::new(500.0 + i as f32 * 20.0, 0.0), 10.0))
            .collect();
        let choice = select(&entity, &targets, &[]).expect("target");
        assert_eq!(choice.kind, TargetKind::Debris);
        assert!(choice.boost);
        assert!(choice.debris.is_some_and(|d| d.accepted));
    }

    #[test]
    fn test_avoided_single_falls_through_to_ahead() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets = [
            TargetPoint::new(Vec2::new(0.0, -400.0), 4.0),
            TargetPoint::new(Vec2::new(300.0, 0.0), 1.0),
        ];
        let attacker = CompetitorSnapshot::new(9, Vec2::new(0.0, -440.0), PI / 2.0, 8.0).boosting(true);
        let choice = select(&entity, &targets, &[&attacker]).expect("target");
        assert_eq!(choice.kind, TargetKind::Ahead);
        assert_eq!(choice.aim, Vec2::new(300.0, 0.0));
    }

    #[test]
    fn test_no_targets() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        assert!(select(&entity, &[], &[]).is_none());
    }

    #[test]
    fn test_carry_forward_reaims() {
        let entity = ControlledEntity::new(Vec2::ZERO, 0.0, 5.0);
        let targets = [TargetPoint::new(Vec2::new(150.0, 0.0), 1.0)];
        let mut selector = TargetSelector::default();
        selector.select(&entity, &targets, &[], &RiskEvaluator::default());
        let choice = selector.carry_forward(Vec2::new(150.0, -100.0)).expect("carried");
        assert!((choice.heading - PI / 2.0).abs() < 1e-5);
        assert!((choice.distance - 100.0).abs() < 1e-3);
    }
}
