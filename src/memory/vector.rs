// src/memory/vector.rs
// Qdrant-backed vector store for memory embeddings (§4.3 vector search arm).

use std::collections::HashMap;

use anyhow::{Context, Result};
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};

use crate::config::QdrantConfig;

pub struct VectorStore {
    client: Qdrant,
    collection: String,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub memory_id: String,
    pub score: f32,
}

impl VectorStore {
    pub async fn new(config: &QdrantConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .skip_compatibility_check()
            .build()
            .context("failed to connect to Qdrant")?;

        let store = Self {
            client,
            collection: config.collection.clone(),
        };
        store.ensure_collection(config.embedding_dim).await?;
        Ok(store)
    }

    async fn ensure_collection(&self, dim: u64) -> Result<()> {
        let exists = self.client.collection_exists(&self.collection).await?;
        if !exists {
            info!(collection = %self.collection, "creating Qdrant collection");
            match self
                .client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(dim, Distance::Cosine)),
                )
                .await
            {
                Ok(_) => {}
                Err(e) if e.to_string().contains("already exists") => {
                    debug!("collection created concurrently, continuing");
                }
                Err(e) => return Err(e).context("failed to create collection"),
            }
        }
        Ok(())
    }

    pub async fn upsert(&self, memory_id: &str, user_id: &str, embedding: &[f32]) -> Result<()> {
        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert("memory_id".to_string(), memory_id.to_string().into());
        payload.insert("user_id".to_string(), user_id.to_string().into());

        let point = PointStruct::new(memory_id_to_point_id(memory_id), embedding.to_vec(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .context("failed to upsert point")?;

        Ok(())
    }

    pub async fn search(&self, user_id: &str, embedding: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
        let filter = Filter::must([Condition::matches("user_id", user_id.to_string())]);

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, embedding.to_vec(), limit as u64)
                    .filter(filter)
                    .with_payload(true),
            )
            .await
            .context("failed to search Qdrant")?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                let memory_id = point
                    .payload
                    .get("memory_id")
                    .and_then(|v| v.as_str().map(|s| s.to_string()))?;
                Some(VectorHit {
                    memory_id,
                    score: point.score,
                })
            })
            .collect())
    }

    pub async fn delete(&self, memory_id: &str) -> Result<()> {
        use qdrant_client::qdrant::DeletePointsBuilder;

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(vec![memory_id_to_point_id(memory_id)]),
            )
            .await
            .context("failed to delete point")?;
        Ok(())
    }
}

fn memory_id_to_point_id(memory_id: &str) -> PointId {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    memory_id.hash(&mut hasher);
    hasher.finish().into()
}
