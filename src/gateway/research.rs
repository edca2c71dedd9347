// src/gateway/research.rs
// Web research collaborator + research capsule injector (§4.10, §4.5
// "current events" row). The search backend itself is a fixed external
// black box (§1); this is the thin HTTP client that calls it and the
// poll loop that surfaces its result as an SSE event mid-stream.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::{AppCaches, ResearchCapsule};
use crate::config::ProviderConfig;

pub struct WebResearchClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WebResearchResponse {
    claims: Vec<crate::cache::ResearchClaim>,
    sources: Vec<crate::cache::ResearchSource>,
    entities: Vec<String>,
    ttl_class: String,
}

impl WebResearchClient {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.web_research_timeout_secs))
            .build()?;
        Ok(Self { http, base_url: config.web_research_base_url.clone() })
    }

    pub async fn search(&self, query: &str) -> anyhow::Result<ResearchCapsule> {
        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await?
            .error_for_status()?
            .json::<WebResearchResponse>()
            .await?;

        let ttl = match response.ttl_class.as_str() {
            "long" => chrono::Duration::hours(24),
            "medium" => chrono::Duration::hours(1),
            _ => chrono::Duration::minutes(10),
        };
        let fetched_at = chrono::Utc::now();

        Ok(ResearchCapsule {
            claims: response.claims,
            sources: response.sources,
            entities: response.entities,
            ttl_class: response.ttl_class,
            fetched_at,
            expires_at: fetched_at + ttl,
        })
    }
}

/// Kicks off a web search and stashes the result under `factPack:{threadId}`
/// for the injector to pick up. Runs detached from the streaming response —
/// failures are logged, never surfaced as a turn-ending error (§4.1 failure
/// semantics: gather failures degrade gracefully).
pub async fn spawn_search(client: &WebResearchClient, caches: &AppCaches, thread_id: &str, query: &str) {
    match client.search(query).await {
        Ok(capsule) => {
            caches.put_capsule(AppCaches::capsule_key(thread_id, "latest"), capsule).await;
        }
        Err(e) => warn!(thread_id, error = %e, "web research failed"),
    }
}

/// Polls for a research capsule for up to `poll_window` (§4.10: "first ~5s
/// of the response"), returning as soon as one appears, a `delta` has
/// started, or the window elapses. `first_delta` resolves once the first
/// upstream token has been relayed; whichever future is ready first wins.
pub async fn poll_for_capsule(
    caches: &AppCaches,
    thread_id: &str,
    poll_window: Duration,
    first_delta: impl std::future::Future<Output = ()>,
) -> Option<ResearchCapsule> {
    let key = AppCaches::capsule_key(thread_id, "latest");
    let deadline = tokio::time::sleep(poll_window);
    tokio::pin!(deadline);
    tokio::pin!(first_delta);

    loop {
        tokio::select! {
            biased;
            _ = &mut first_delta => {
                debug!(thread_id, "research poll stopped: first delta arrived");
                return None;
            }
            _ = &mut deadline => {
                debug!(thread_id, "research poll window elapsed");
                return None;
            }
            _ = tokio::time::sleep(Duration::from_millis(150)) => {
                if let Some(capsule) = caches.take_capsule(&key).await {
                    return Some((*capsule).clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn poll_stops_immediately_when_first_delta_already_ready() {
        let caches = AppCaches::new();
        let result = poll_for_capsule(&caches, "t1", Duration::from_secs(5), async {}).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn poll_picks_up_capsule_once_cached() {
        let caches = AppCaches::new();
        caches
            .put_capsule(
                AppCaches::capsule_key("t1", "latest"),
                ResearchCapsule {
                    claims: vec![],
                    sources: vec![],
                    entities: vec![],
                    ttl_class: "short".into(),
                    fetched_at: chrono::Utc::now(),
                    expires_at: chrono::Utc::now() + chrono::Duration::minutes(5),
                },
            )
            .await;

        let never = std::future::pending::<()>();
        let result = poll_for_capsule(&caches, "t1", Duration::from_millis(400), never).await;
        assert!(result.is_some());
    }
}
