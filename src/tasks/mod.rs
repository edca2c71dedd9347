// src/tasks/mod.rs
// Background loops spawned once at startup (§5 "Shared resources"): the
// unlimited-recall worker's job queue and the memory service's retention
// sweeper. Everything else in the gather/audit path fires inline as a
// per-request `tokio::spawn` — these two are the only genuinely periodic
// tasks.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::memory::sweeper::RetentionSweeper;
use crate::unlimited_recall::RecallWorker;

pub fn spawn_recall_worker(worker: Arc<RecallWorker>) {
    tokio::spawn(async move {
        info!("unlimited-recall worker loop started");
        worker.run().await;
    });
}

pub fn spawn_retention_sweeper(sweeper: Arc<RetentionSweeper>, interval: Duration) {
    tokio::spawn(async move {
        info!(?interval, "retention sweeper loop started");
        loop {
            sweeper.sweep().await;
            tokio::time::sleep(interval).await;
        }
    });
}
