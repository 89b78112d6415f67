/// Tick timing - the host drives one decision cycle per rendered frame
pub mod timing {
    /// Nominal host frame duration in milliseconds (60 Hz)
    pub const NOMINAL_TICK_MS: f32 = 1000.0 / 60.0;
    /// Default simulated tick rate in Hz
    pub const DEFAULT_TICK_RATE: u32 = 60;
}

/// Trajectory predictor constants
pub mod predictor {
    /// Samples kept per competitor
    pub const HISTORY_CAPACITY: usize = 24;
    /// Samples older than this are dropped from a history (ms)
    pub const HISTORY_HORIZON_MS: u64 = 2_000;
    /// Whole record dropped after this much silence (ms)
    pub const HISTORY_SILENCE_TIMEOUT_MS: u64 = 6_000;
    /// Minimum samples for a turn-rate estimate
    pub const MIN_TURN_SAMPLES: usize = 3;
    /// Most recent samples used for the turn-rate estimate
    pub const TURN_RATE_WINDOW: usize = 6;
    /// Confidence lost per predicted frame
    pub const CONFIDENCE_DECAY_PER_FRAME: f32 = 0.03;
    /// Confidence never drops below this
    pub const CONFIDENCE_FLOOR: f32 = 0.25;
    /// Lookahead used to judge whether a competitor is closing in
    pub const CLOSING_LOOKAHEAD_FRAMES: u32 = 10;
    /// Distance shrink (units) over the lookahead that counts as closing
    pub const CLOSING_EPSILON: f32 = 2.0;
    /// Alignment (radians) counted as pointed at the entity (30 degrees)
    pub const TIGHT_ALIGNMENT: f32 = std::f32::consts::PI / 6.0;
    /// Alignment counted as loosely converging (90 degrees)
    pub const LOOSE_ALIGNMENT: f32 = std::f32::consts::FRAC_PI_2;
    /// Alignment counted as departing (120 degrees)
    pub const DEPARTING_ALIGNMENT: f32 = 2.0 * std::f32::consts::PI / 3.0;
    /// Alignment to the entity's predicted position counted as intercepting (20 degrees)
    pub const INTERCEPT_ALIGNMENT: f32 = std::f32::consts::PI / 9.0;
    /// Turn rate (rad/tick) counted as circling
    pub const CIRCLING_TURN_RATE: f32 = 0.05;
    /// Distance inside which circling is considered threatening
    pub const CIRCLING_RANGE: f32 = 300.0;
    /// Distance inside which an aligned, closing competitor is attacking
    pub const ATTACK_RANGE: f32 = 200.0;
    /// Distance inside which boosting while closing marks a competitor hostile
    pub const HOSTILE_BOOST_RANGE: f32 = 250.0;
    /// Distance over which proximity contributes threat
    pub const PROXIMITY_THREAT_RANGE: f32 = 400.0;

    pub const THREAT_CLOSING: f32 = 0.3;
    pub const THREAT_BOOSTING: f32 = 0.25;
    pub const THREAT_ALIGNED: f32 = 0.3;
    pub const THREAT_PROXIMITY: f32 = 0.2;
    pub const THREAT_CIRCLING: f32 = 0.2;
    /// Multiplier applied when the competitor is moving away
    pub const DEPARTING_FACTOR: f32 = 0.5;

    /// Aggression decays linearly to zero over this window after last-seen (ms)
    pub const AGGRESSION_TIMEOUT_MS: u64 = 8_000;
    /// Aggression floor: threat >= level * this
    pub const AGGRESSION_FLOOR_FACTOR: f32 = 0.7;
    /// Aggression add-on applied after the floor
    pub const AGGRESSION_BONUS: f32 = 0.2;
}

/// Risk/reward evaluator constants
pub mod risk {
    pub const CRITICAL_ZONE: f32 = 100.0;
    pub const DANGER_ZONE: f32 = 200.0;
    pub const CAUTION_ZONE: f32 = 350.0;
    pub const CRITICAL_DANGER: f32 = 1.0;
    pub const DANGER_DANGER: f32 = 0.6;
    pub const CAUTION_DANGER: f32 = 0.2;

    /// Competitor speed (units/tick) above which danger grows
    pub const BASELINE_SPEED: f32 = 6.0;
    pub const SPEED_FACTOR_SLOPE: f32 = 0.5;
    pub const BOOST_MULTIPLIER: f32 = 2.2;
    /// Alignment factor = 1 + ALIGNMENT_WEIGHT * cos(angle)
    pub const ALIGNMENT_WEIGHT: f32 = 0.5;

    /// Danger above this counts toward the crowd
    pub const CROWD_FLOOR: f32 = 0.15;
    pub const CROWD_MULTIPLIER_TWO: f32 = 1.8;
    pub const CROWD_MULTIPLIER_THREE: f32 = 3.0;

    /// Default weighting toward safety in the adjusted risk
    pub const DEFAULT_RISK_BIAS: f32 = 0.7;

    pub const CAUTION_THRESHOLD: f32 = 0.2;
    pub const RISKY_THRESHOLD: f32 = 0.4;
    pub const AVOID_THRESHOLD: f32 = 0.6;

    /// Reward tiers: (minimum value, reward)
    pub const REWARD_TIERS: [(f32, f32); 4] = [(20.0, 0.40), (10.0, 0.30), (5.0, 0.20), (1.0, 0.10)];
    pub const REWARD_LINEAR_SLOPE: f32 = 0.1;

    /// Contest penalty per competitor racing for the same debris field
    pub const CONTEST_PENALTY: f32 = 0.15;
    pub const CONTEST_RANGE: f32 = 600.0;
    /// cos(angle) above which a competitor is heading toward the field
    pub const CONTEST_ALIGNMENT_COS: f32 = 0.8;
    pub const DEBRIS_MIN_VALUE_PER_RISK: f32 = 40.0;
    pub const DEBRIS_RISK_CEILING: f32 = 0.5;
    /// Risk floor used in the value-per-risk ratio
    pub const DEBRIS_RISK_EPSILON: f32 = 0.05;
}

/// Evasion geometry constants
pub mod evasion {
    pub const RING_BASE_RADIUS: f32 = 60.0;
    /// (distance below, multiplier) - checked in order
    pub const RING_DISTANCE_BANDS: [(f32, f32); 3] = [(100.0, 2.0), (200.0, 1.6), (350.0, 1.3)];
    pub const RING_BOOST_FACTOR: f32 = 1.5;
    pub const RING_HOSTILE_FACTOR: f32 = 1.6;
    pub const RING_BASE_SPEED: f32 = 6.0;
    pub const RING_MAX_SPEED_FACTOR: f32 = 2.0;
    pub const RING_MAX_RADIUS: f32 = 260.0;
    /// Competitors beyond this get no ring
    pub const RING_SCAN_RADIUS: f32 = 600.0;
    /// Aggression level above which a ring counts as hostile
    pub const HOSTILE_LEVEL: f32 = 0.3;

    /// Traversable gaps must be at least this wide (45 degrees)
    pub const MIN_GAP_WIDTH: f32 = std::f32::consts::FRAC_PI_4;

    /// Distances sampled along a candidate heading
    pub const RAY_SAMPLES: [f32; 7] = [40.0, 80.0, 120.0, 170.0, 230.0, 300.0, 380.0];
    /// Weight lost per sample index (nearer samples matter more)
    pub const SAMPLE_WEIGHT_STEP: f32 = 0.08;
    pub const PENALTY_INSIDE: f32 = 0.8;
    pub const PENALTY_HEAVY: f32 = 0.4;
    pub const PENALTY_MEDIUM: f32 = 0.15;
    pub const PENALTY_LIGHT: f32 = 0.05;
    pub const BAND_HEAVY: f32 = 1.5;
    pub const BAND_MEDIUM: f32 = 2.5;
    pub const BAND_LIGHT: f32 = 4.0;
    pub const HOSTILE_PENALTY_FACTOR: f32 = 1.5;
    pub const PREDICTED_PENALTY: f32 = 0.3;
    pub const AWAY_BONUS: f32 = 0.1;

    pub const ESCAPE_CANDIDATES: usize = 16;
    /// Keep the preferred heading when it scores within this fraction of the best
    pub const PREFERRED_KEEP_RATIO: f32 = 0.8;
    pub const ESCAPE_SCORE_FLOOR: f32 = 0.1;
    /// Frames ahead used when the entity is stationary
    pub const MIN_ENTITY_SPEED: f32 = 1.0;
}

/// Sensor thresholds
pub mod sensors {
    /// Clearance below which a body segment is a danger (units beyond both radii)
    pub const BODY_DANGER_CLEARANCE: f32 = 80.0;
    /// Clearance below which the body sensor requests boost
    pub const BODY_BOOST_CLEARANCE: f32 = 40.0;

    /// Fraction of arena radius at which the boundary becomes a warning
    pub const BOUNDARY_WARNING_FRACTION: f32 = 0.80;
    /// Fraction of arena radius at which the boundary becomes an emergency
    pub const BOUNDARY_EMERGENCY_FRACTION: f32 = 0.92;
    pub const BOUNDARY_WARNING_DANGER: f32 = 0.5;
    pub const BOUNDARY_EMERGENCY_DANGER: f32 = 1.0;

    pub const RADAR_SECTORS: usize = 16;
    pub const RADAR_RADIUS: f32 = 300.0;
    /// Sector coverage that counts as encircled
    pub const ENCIRCLEMENT_CRITICAL_COVERAGE: f32 = 0.75;
    /// Sector coverage that triggers erratic trap escape
    pub const ENCIRCLEMENT_TRAPPED_COVERAGE: f32 = 0.875;

    pub const SQUEEZE_RANGE: f32 = 250.0;
    pub const SQUEEZE_MIN_QUADRANTS: usize = 3;

    pub const INSTANT_RADIUS: f32 = 200.0;
    pub const INSTANT_HIGH: f32 = 1.0;
    pub const INSTANT_MEDIUM: f32 = 0.4;
    pub const INSTANT_BOOST_WEIGHT: f32 = 1.5;

    pub const CROWD_RADIUS: f32 = 350.0;
    pub const CROWD_CRITICAL_COUNT: usize = 5;
    pub const CROWD_AVOID_COUNT: usize = 3;

    pub const COUNTER_RADIUS: f32 = 250.0;
    pub const COUNTER_MIN_AGGRESSION: f32 = 0.3;
    pub const COUNTER_LOOKAHEAD_FRAMES: u32 = 20;
    /// Must reach the cut-off point in this fraction of the competitor's time
    pub const COUNTER_TIME_MARGIN: f32 = 0.8;
    /// Lead distance placed in front of the competitor's predicted head
    pub const COUNTER_LEAD: f32 = 30.0;

    /// Competitors checked against the path to the active target
    pub const VIGILANCE_RANGE: f32 = 400.0;
    pub const VIGILANCE_LOOKAHEAD_FRAMES: u32 = 15;
    pub const VIGILANCE_THREAT: f32 = 0.4;
    pub const VIGILANCE_DANGER_THREAT: f32 = 0.7;
    pub const VIGILANCE_DANGER_RANGE: f32 = 200.0;

    /// Fraction of arena radius beyond which idle wander drifts back inward
    pub const WANDER_DRIFT_FRACTION: f32 = 0.5;
    pub const WANDER_TURN: f32 = 0.3;
}

/// Target selection constants
pub mod targeting {
    pub const SCAN_RADIUS: f32 = 600.0;
    pub const MAX_SCAN_POINTS: usize = 200;
    pub const CLUSTER_LINK_RADIUS: f32 = 50.0;
    pub const CLUSTER_MIN_POINTS: usize = 2;

    pub const DEBRIS_SCAN_RADIUS: f32 = 900.0;
    pub const DEBRIS_POINT_VALUE: f32 = 8.0;
    pub const DEBRIS_LINK_RADIUS: f32 = 60.0;
    pub const DEBRIS_MIN_POINTS: usize = 4;
    pub const DEBRIS_AHEAD_COS: f32 = 0.5;
    pub const DEBRIS_AHEAD_BONUS: f32 = 0.5;
    pub const DEBRIS_BOOST_DISTANCE: f32 = 200.0;

    pub const CHAIN_DIRECTIONS: usize = 16;
    pub const CHAIN_GAP_TOLERANCE: f32 = 70.0;
    /// Maximum deviation from the current chain direction (60 degrees)
    pub const CHAIN_ANGLE_TOLERANCE: f32 = std::f32::consts::PI / 3.0;
    pub const CHAIN_MIN_LENGTH: usize = 3;
    pub const CHAIN_MAX_LENGTH: usize = 40;
    /// Path units charged per radian of turning
    pub const TURN_COST_PER_RADIAN: f32 = 60.0;
    pub const CHAIN_FPS_WEIGHT: f32 = 1.0;
    pub const CHAIN_FPD_WEIGHT: f32 = 10.0;
    pub const CHAIN_ALIGNMENT_BONUS: f32 = 0.3;

    pub const NETWORK_LINK_RADIUS: f32 = 80.0;
    pub const NETWORK_BONUS_PER_NODE: f32 = 0.25;
    pub const NETWORK_MAX_BONUS: f32 = 2.0;
    /// Aim moves to the next route waypoint once the entity is this close
    pub const ROUTE_WAYPOINT_RADIUS: f32 = 40.0;

    /// cos(angle) above which a point counts as ahead of the heading
    pub const AHEAD_COS: f32 = 0.5;
}

/// Arbiter and movement constants
pub mod arbiter {
    /// Priority at or above which the heading is applied without smoothing
    pub const INSTANT_TURN_PRIORITY: u16 = 800;
    /// Maximum erratic jitter (radians, either side)
    pub const ERRATIC_JITTER: f32 = 0.35;
    /// Consecutive ticks with sensor errors before telemetry reports degraded
    pub const DEGRADED_ERROR_TICKS: u32 = 3;
}
