// src/gateway/mod.rs
// Gateway: per-turn orchestration (§4.1), query analysis, strategy
// planning, context preprocessing, prompt assembly, and the research
// capsule and ingestion collaborators.

pub mod events;
pub mod ingestion;
pub mod orchestrator;
pub mod preprocessor;
pub mod prompt_builder;
pub mod research;
pub mod strategy;

pub use events::ChatEvent;
pub use orchestrator::{ChatTurnRequest, Orchestrator, TurnMessage};
