// src/state.rs
// Shared application state (§9 design notes: "inject at process startup,
// never accessed through a global"). One `AppState`, cloned per request.

use std::sync::Arc;

use crate::cache::AppCaches;
use crate::config::AppConfig;
use crate::gateway::Orchestrator;
use crate::memory::MemoryService;
use crate::unlimited_recall::{CaptureService, UnlimitedRecallStore};
use crate::utils::concurrency::StreamConcurrencyGuard;
use crate::utils::rate_limiter::UserRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub memory: Arc<MemoryService>,
    pub capture: Arc<CaptureService>,
    pub unlimited_recall_store: UnlimitedRecallStore,
    pub orchestrator: Arc<Orchestrator>,
    pub caches: Arc<AppCaches>,
    pub rate_limiter: Arc<UserRateLimiter>,
    pub concurrency: Arc<StreamConcurrencyGuard>,
}
