//! Arena Sentinel
//!
//! Threat & decision engine for an autonomous agent in a continuous 2-D arena.
//!
//! Each tick the engine reads an immutable [`engine::world::WorldSnapshot`], predicts
//! competitor motion, builds evasion geometry, runs the tiered threat sensors and the
//! target selector, and hands exactly one steering command to the actuator.
//!
//! # Features
//!
//! - `telemetry` - Publish overlay snapshots (rings, gaps, active target) for external renderers (enabled by default)
//! - `minimal` - Build without optional features for testing/debugging

pub mod config;
pub mod util;
pub mod engine;
pub mod metrics;
pub mod sim;
