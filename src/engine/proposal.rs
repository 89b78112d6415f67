//! Action proposals and the fixed priority table the arbiter sorts by.

use std::borrow::Cow;

use serde::Serialize;

use crate::util::geometry::normalize_angle;

/// What produced a proposal. Declaration order mirrors the priority table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum ProposalKind {
    BodyProximity = 0,
    BoundaryEmergency = 1,
    EncirclementCritical = 2,
    Squeeze = 3,
    InstantEvasionHigh = 4,
    CounterAttack = 5,
    CrowdCritical = 6,
    InstantEvasionMedium = 7,
    CrowdAvoidance = 8,
    Vigilance = 9,
    BoundaryWarning = 10,
    TargetDebris = 11,
    TargetChain = 12,
    TargetCluster = 13,
    TargetSingle = 14,
    IdleWander = 15,
}

impl ProposalKind {
    pub const ALL: [ProposalKind; 16] = [
        ProposalKind::BodyProximity,
        ProposalKind::BoundaryEmergency,
        ProposalKind::EncirclementCritical,
        ProposalKind::Squeeze,
        ProposalKind::InstantEvasionHigh,
        ProposalKind::CounterAttack,
        ProposalKind::CrowdCritical,
        ProposalKind::InstantEvasionMedium,
        ProposalKind::CrowdAvoidance,
        ProposalKind::Vigilance,
        ProposalKind::BoundaryWarning,
        ProposalKind::TargetDebris,
        ProposalKind::TargetChain,
        ProposalKind::TargetCluster,
        ProposalKind::TargetSingle,
        ProposalKind::IdleWander,
    ];

    /// Numeric priority; higher wins
    pub const fn priority(self) -> u16 {
        match self {
            ProposalKind::BodyProximity => 1000,
            ProposalKind::BoundaryEmergency => 950,
            ProposalKind::EncirclementCritical => 900,
            ProposalKind::Squeeze => 850,
            ProposalKind::InstantEvasionHigh => 800,
            ProposalKind::CounterAttack => 750,
            ProposalKind::CrowdCritical => 700,
            ProposalKind::InstantEvasionMedium => 650,
            ProposalKind::CrowdAvoidance => 600,
            ProposalKind::Vigilance => 550,
            ProposalKind::BoundaryWarning => 500,
            ProposalKind::TargetDebris => 400,
            ProposalKind::TargetChain => 380,
            ProposalKind::TargetCluster => 360,
            ProposalKind::TargetSingle => 340,
            ProposalKind::IdleWander => 100,
        }
    }

    pub fn is_target(self) -> bool {
        matches!(
            self,
            ProposalKind::TargetDebris
                | ProposalKind::TargetChain
                | ProposalKind::TargetCluster
                | ProposalKind::TargetSingle
        )
    }

    /// Excluded from the candidate list while the arbiter is in lockout
    pub fn suppressed_in_lockout(self) -> bool {
        self.is_target() || self == ProposalKind::CounterAttack
    }

    /// Always applied instantly and never throttled by degraded conditions
    pub fn is_safety_critical(self) -> bool {
        matches!(self, ProposalKind::BodyProximity | ProposalKind::BoundaryEmergency)
    }
}

/// A candidate action emitted by a sensor or the target selector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionProposal {
    pub kind: ProposalKind,
    /// Radians, normalized to (-PI, PI]
    pub heading: f32,
    pub priority: u16,
    pub boost: bool,
    /// Request bounded random jitter (trap escape)
    pub erratic: bool,
    pub reason: Cow<'static, str>,
}

impl ActionProposal {
    pub fn new(kind: ProposalKind, heading: f32, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            heading: normalize_angle(heading),
            priority: kind.priority(),
            boost: false,
            erratic: false,
            reason: reason.into(),
        }
    }

    pub fn with_boost(mut self, boost: bool) -> Self {
        self.boost = boost;
        self
    }

    pub fn with_erratic(mut self, erratic: bool) -> Self {
        self.erratic = erratic;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_table_strictly_descending() {
        for pair in ProposalKind::ALL.windows(2) {
            assert!(
                pair[0].priority() > pair[1].priority(),
                "{:?} should outrank {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_lockout_suppression_set() {
        let suppressed: Vec<_> = ProposalKind::ALL
            .iter()
            .copied()
            .filter(|k| k.suppressed_in_lockout())
            .collect();
        assert_eq!(
            suppressed,
            vec![
                ProposalKind::CounterAttack,
                ProposalKind::TargetDebris,
                ProposalKind::TargetChain,
                ProposalKind::TargetCluster,
                ProposalKind::TargetSingle,
            ]
        );
    }

    #[test]
    fn test_new_proposal_normalizes_heading() {
        let p = ActionProposal::new(ProposalKind::IdleWander, 2.5 * std::f32::consts::PI, "wander");
        assert!((p.heading - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
        assert_eq!(p.priority, 100);
        assert!(!p.boost);
        assert!(!p.erratic);
    }
}
