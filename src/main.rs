// src/main.rs
// Process entrypoint: load configuration, wire every collaborator, spawn
// the two periodic background loops, and serve the HTTP/SSE surface.

use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use threadline::cache::AppCaches;
use threadline::config::CONFIG;
use threadline::gateway::Orchestrator;
use threadline::gateway::research::WebResearchClient;
use threadline::llm::{EmbeddingProvider, HttpEmbeddingProvider, LlmProvider, OpenAiCompatProvider};
use threadline::memory::audit::{AuditPipeline, CadenceTracker};
use threadline::memory::recall::RecallEngine;
use threadline::memory::summarizer::SummaryGenerator;
use threadline::memory::sweeper::RetentionSweeper;
use threadline::memory::store::MemoryStore;
use threadline::memory::vector::VectorStore;
use threadline::memory::MemoryService;
use threadline::state::AppState;
use threadline::unlimited_recall::{CaptureService, RecallWorker, UnlimitedRecallStore};
use threadline::utils::concurrency::StreamConcurrencyGuard;
use threadline::utils::rate_limiter::UserRateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let level = match CONFIG.logging.level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_ansi(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    threadline::metrics::init_metrics();

    info!("connecting to durable store at {}", CONFIG.database.url);
    let pool = SqlitePoolOptions::new()
        .max_connections(CONFIG.database.max_connections)
        .connect(&CONFIG.database.url)
        .await?;

    let memory_store = MemoryStore::new(pool.clone());
    memory_store.migrate().await?;

    // The unlimited-recall tables are owned by the gateway but are
    // schema-isolated by name; one SQLite file serves both stores.
    let unlimited_recall_store = UnlimitedRecallStore::new(pool);
    unlimited_recall_store.migrate().await?;

    let vector_store = match VectorStore::new(&CONFIG.qdrant).await {
        Ok(store) => {
            info!("connected to Qdrant vector store");
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!(error = %e, "Qdrant unavailable, recall will run fts+keyword only");
            None
        }
    };

    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatProvider::new(
        "default",
        CONFIG.providers.chat_base_url.clone(),
        CONFIG.providers.chat_api_key.clone(),
        CONFIG.providers.chat_timeout_secs,
    )?);

    let embeddings: Option<Arc<dyn EmbeddingProvider>> = match HttpEmbeddingProvider::new(
        CONFIG.providers.embedding_base_url.clone(),
        CONFIG.providers.embedding_model.clone(),
        CONFIG.providers.embedding_api_key.clone(),
        CONFIG.providers.embedding_dim,
    ) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            warn!(error = %e, "embedding provider unavailable, vector recall and embedding jobs disabled");
            None
        }
    };

    let caches = Arc::new(AppCaches::new());

    let summarizer = SummaryGenerator::new(Some(llm.clone()), CONFIG.summary.clone(), CONFIG.router.default_model.clone());
    let audit = AuditPipeline::new(
        memory_store.clone(),
        caches.clone(),
        CONFIG.tiers.clone(),
        CONFIG.cadence.clone(),
        CONFIG.dedup.clone(),
        Some(llm.clone()),
        summarizer,
    );
    let cadence = CadenceTracker::new(CONFIG.cadence.clone());
    let recall_engine = RecallEngine::new(memory_store.clone(), vector_store, embeddings.clone(), CONFIG.recall.clone());

    let memory = Arc::new(MemoryService::new(memory_store.clone(), recall_engine, cadence, audit, CONFIG.dedup.clone()));
    let capture = Arc::new(CaptureService::new(unlimited_recall_store.clone(), CONFIG.unlimited_recall.clone()));

    let router = threadline::llm::router::ModelRouter::new(CONFIG.router.clone());

    let web_research = match WebResearchClient::new(&CONFIG.providers) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "web research client unavailable, search layer disabled");
            None
        }
    };

    let orchestrator = Arc::new(Orchestrator {
        memory: memory.clone(),
        capture: capture.clone(),
        router,
        llm: llm.clone(),
        embeddings: embeddings.clone(),
        caches: caches.clone(),
        web_research,
        ingestion: None,
        deadlines: CONFIG.deadlines.clone(),
        unlimited_recall_config: CONFIG.unlimited_recall.clone(),
        flags: CONFIG.flags.clone(),
    });

    let rate_limiter = Arc::new(UserRateLimiter::new(&CONFIG.rate_limit));
    let concurrency = Arc::new(StreamConcurrencyGuard::new(CONFIG.rate_limit.max_concurrent_streams_per_user));

    let recall_worker = Arc::new(RecallWorker::new(
        unlimited_recall_store.clone(),
        Some(llm.clone()),
        embeddings,
        CONFIG.unlimited_recall.clone(),
        CONFIG.router.default_model.clone(),
    ));
    threadline::tasks::spawn_recall_worker(recall_worker);

    let sweeper = Arc::new(RetentionSweeper::new(memory_store, CONFIG.tiers.clone()));
    threadline::tasks::spawn_retention_sweeper(sweeper, Duration::from_secs(CONFIG.tiers.sweep_interval_secs));

    let state = AppState {
        config: Arc::new(CONFIG.clone()),
        memory,
        capture,
        unlimited_recall_store,
        orchestrator,
        caches,
        rate_limiter,
        concurrency,
    };

    let app = threadline::api::router(state);

    let bind_address = CONFIG.server.bind_address();
    info!(%bind_address, "threadline listening");
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
