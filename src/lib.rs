//! Glucose Monitoring Fleet Simulator
//!
//! Simulates a fleet of glucose monitors and the patients wearing them,
//! producing two time-ordered telemetry streams over a simulated horizon:
//! device health records and glucose metric records.
//!
//! ⚠️ DISCLAIMER:
//! Generated readings are synthetic and carry no clinical meaning.

pub mod behavior;
pub mod config;
pub mod device;
pub mod error;
pub mod feed;
pub mod fleet;
pub mod location;
pub mod metric;
pub mod models;
pub mod reference;
pub mod sampling;
pub mod simulation;
pub mod stream;
pub mod tracker;
pub mod validation;
