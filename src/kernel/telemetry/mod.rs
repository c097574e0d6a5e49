//! Session telemetry.
//!
//! Telemetry is a write-only side channel: the reactor records into it, but
//! nothing in the detection path ever reads it back.

pub mod event;
pub mod metrics;
pub mod recorder;
