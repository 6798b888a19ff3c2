use crate::traits::CorpusIndex;
use crate::{IndexError, IndexHit, IndexedItem, SegmentMetadata};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use url::Url;

pub struct QdrantIndex {
    endpoint: Url,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantIndex {
    pub fn new(
        endpoint: &str,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        })
    }

    fn collection_url(&self, suffix: &str) -> Result<Url, IndexError> {
        Ok(self
            .endpoint
            .join(&format!("collections/{}{}", self.collection, suffix))?)
    }

    pub async fn ensure_collection(&self) -> Result<(), IndexError> {
        let response = self.client.get(self.collection_url("")?).send().await?;

        if response.status() == StatusCode::OK {
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let response = self
            .client
            .put(self.collection_url("")?)
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Euclid",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::Request(format!(
                "qdrant collection setup failed with {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn check_dimension(&self, actual: usize) -> Result<(), IndexError> {
        if actual != self.vector_size {
            return Err(IndexError::Dimension {
                expected: self.vector_size,
                actual,
            });
        }
        Ok(())
    }
}

/// Qdrant only accepts integer or UUID point ids, so string ids are hashed.
fn point_id(id: &str) -> u64 {
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

#[async_trait]
impl CorpusIndex for QdrantIndex {
    async fn insert(&self, item: IndexedItem) -> Result<(), IndexError> {
        self.check_dimension(item.vector.len())?;

        let point = json!({
            "id": point_id(&item.id),
            "vector": item.vector,
            "payload": {
                "item_id": item.id,
                "text": item.text,
                "metadata": serde_json::to_value(&item.metadata)?,
            },
        });

        let response = self
            .client
            .put(self.collection_url("/points?wait=true")?)
            .json(&json!({ "points": [point] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, IndexError> {
        self.check_dimension(vector.len())?;

        let response = self
            .client
            .post(self.collection_url("/points/search")?)
            .json(&json!({
                "vector": vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parse_search_hits(&parsed)
    }
}

fn parse_search_hits(parsed: &Value) -> Result<Vec<IndexHit>, IndexError> {
    let hits = parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut result = Vec::new();
    for hit in hits {
        let id = hit
            .pointer("/payload/item_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let text = hit
            .pointer("/payload/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let metadata: SegmentMetadata = serde_json::from_value(
            hit.pointer("/payload/metadata")
                .cloned()
                .unwrap_or(Value::Null),
        )?;
        let distance = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

        result.push(IndexHit {
            id,
            text,
            metadata,
            distance,
        });
    }

    Ok(result)
}
