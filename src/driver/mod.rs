//! Frame sources that feed the reactor outside a live media pipeline.

pub mod simulate;
pub mod trace;
