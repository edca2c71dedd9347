// src/memory/audit/mod.rs
// Audit pipeline (§4.2.1): cadence tracking, per-window scoring, and the
// full run that mines memories and refreshes a thread summary.

pub mod cadence;
pub mod pipeline;
pub mod scorer;

pub use cadence::CadenceTracker;
pub use pipeline::{AuditOutcome, AuditPipeline};
