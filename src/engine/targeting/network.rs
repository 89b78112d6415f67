//! Network assembly
//!
//! Chains and clusters become nodes. Nodes whose points lie within the link radius are
//! connected, and connected components form networks ranked by risk-adjusted value.

use bitvec::prelude::*;
use serde::Serialize;
use smallvec::SmallVec;

use crate::engine::constants::targeting::*;
use crate::engine::targeting::chain::Chain;
use crate::engine::targeting::cluster::Cluster;
use crate::engine::targeting::ScanContext;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeRef {
    Chain(usize),
    Cluster(usize),
}

#[derive(Debug, Clone, Serialize)]
pub struct Network {
    /// Nodes in visiting order; `path[k]` is the entry of `nodes[k]`
    pub nodes: Vec<NodeRef>,
    /// Value of the distinct points across all nodes
    pub total_value: f32,
    /// Worst node risk
    pub risk: f32,
    pub score: f32,
    /// Node entry points in nearest-neighbor visiting order from the entity
    pub path: Vec<Vec2>,
}

impl Network {
    pub fn contains(&self, node: NodeRef) -> bool {
        self.nodes.contains(&node)
    }

    /// Entries of every node except `node`, in visiting order
    pub fn waypoints_after(&self, node: NodeRef) -> impl Iterator<Item = Vec2> + '_ {
        self.nodes
            .iter()
            .zip(&self.path)
            .filter(move |(n, _)| **n != node)
            .map(|(_, p)| *p)
    }

    /// Score multiplier bonus for a chain that belongs to this network
    pub fn bonus(&self) -> f32 {
        (NETWORK_BONUS_PER_NODE * self.nodes.len().saturating_sub(1) as f32).min(NETWORK_MAX_BONUS)
    }
}

struct Node<'c> {
    node: NodeRef,
    members: &'c [usize],
    entry: Vec2,
    risk: f32,
}

/// Build networks from chains and the clusters not already covered by chains, best first
pub fn build_networks(ctx: &ScanContext<'_>, chains: &[Chain], clusters: &[Cluster]) -> Vec<Network> {
    let targets = ctx.targets;

    let mut in_chain = bitvec![0; targets.len()];
    for chain in chains {
        for &i in &chain.members {
            in_chain.set(i, true);
        }
    }

    let mut nodes: Vec<Node<'_>> = chains
        .iter()
        .enumerate()
        .map(|(i, chain)| Node {
            node: NodeRef::Chain(i),
            members: &chain.members,
            entry: targets[chain.entry()].position,
            risk: chain.path_risk,
        })
        .collect();
    for (i, cluster) in clusters.iter().enumerate() {
        let covered = cluster.members.iter().filter(|&&m| in_chain[m]).count();
        if covered * 2 > cluster.count() {
            continue;
        }
        nodes.push(Node {
            node: NodeRef::Cluster(i),
            members: &cluster.members,
            entry: cluster.centroid,
            risk: cluster.assessment.adjusted_risk,
        });
    }
    if nodes.is_empty() {
        return Vec::new();
    }

    // Point -> owning node, first owner wins
    let mut owner: Vec<Option<u32>> = vec![None; targets.len()];
    for (n, node) in nodes.iter().enumerate() {
        for &m in node.members {
            owner[m].get_or_insert(n as u32);
        }
    }

    let mut adjacency: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); nodes.len()];
    for (n, node) in nodes.iter().enumerate() {
        for &m in node.members {
            for j in ctx.grid.query_radius(targets, targets[m].position, NETWORK_LINK_RADIUS) {
                let Some(other) = owner[j].map(|o| o as usize) else { continue };
                if other != n && !adjacency[n].contains(&other) {
                    adjacency[n].push(other);
                    adjacency[other].push(n);
                }
            }
        }
    }

    let mut visited = bitvec![0; nodes.len()];
    let mut networks = Vec::new();
    for start in 0..nodes.len() {
        if visited[start] {
            continue;
        }
        visited.set(start, true);
        let mut component = vec![start];
        let mut cursor = 0;
        while cursor < component.len() {
            let n = component[cursor];
            cursor += 1;
            for &next in &adjacency[n] {
                if !visited[next] {
                    visited.set(next, true);
                    component.push(next);
                }
            }
        }
        networks.push(assemble(ctx, &nodes, &component));
    }

    networks.sort_by(|a, b| b.score.total_cmp(&a.score));
    networks
}

fn assemble(ctx: &ScanContext<'_>, nodes: &[Node<'_>], component: &[usize]) -> Network {
    let targets = ctx.targets;
    let mut counted = bitvec![0; targets.len()];
    let mut total_value = 0.0;
    let mut risk: f32 = 0.0;
    for &n in component {
        for &m in nodes[n].members {
            if !counted[m] {
                counted.set(m, true);
                total_value += targets[m].value;
            }
        }
        risk = risk.max(nodes[n].risk);
    }

    // Nearest-neighbor tour over node entries
    let mut remaining: Vec<usize> = component.to_vec();
    let mut at = ctx.entity.position;
    let mut order = Vec::with_capacity(remaining.len());
    let mut path = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let (idx, _) = remaining
            .iter()
            .enumerate()
            .map(|(k, &n)| (k, nodes[n].entry.distance_sq_to(at)))
            .fold((0, f32::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
        let n = remaining.swap_remove(idx);
        at = nodes[n].entry;
        order.push(nodes[n].node);
        path.push(at);
    }

    Network {
        nodes: order,
        total_value,
        risk,
        score: total_value * (1.0 - risk),
        path,
    }
}
