use crate::error::EmbedError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

#[async_trait]
pub trait Embedder {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    fn embed_sync(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_sync(text)
    }
}

pub struct HttpEmbedder {
    endpoint: Url,
    api_key: Option<String>,
    dimensions: usize,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        dimensions: usize,
    ) -> Result<Self, EmbedError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            api_key,
            dimensions,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "input": text }));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(EmbedError::BadResponse(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let vector = parse_embedding(&body)?;

        if vector.len() != self.dimensions {
            return Err(EmbedError::BadResponse(format!(
                "embedding dimension {} != {}",
                vector.len(),
                self.dimensions
            )));
        }

        Ok(vector)
    }
}

fn parse_embedding(body: &Value) -> Result<Vec<f32>, EmbedError> {
    let values = body
        .pointer("/embedding")
        .or_else(|| body.pointer("/data/0/embedding"))
        .and_then(Value::as_array)
        .ok_or_else(|| EmbedError::BadResponse("response has no embedding array".to_string()))?;

    values
        .iter()
        .map(|value| {
            value
                .as_f64()
                .map(|number| number as f32)
                .ok_or_else(|| EmbedError::BadResponse(format!("non-numeric component {value}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("Hydraulic pressure and flow").await.unwrap();
        let second = embedder.embed("Hydraulic pressure and flow").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let vector = embedder.embed("abc").await.unwrap();
        assert_eq!(vector.len(), 32);
    }

    #[tokio::test]
    async fn blank_text_is_an_embedding_failure() {
        let embedder = CharacterNgramEmbedder::default();
        assert!(matches!(
            embedder.embed("  \n ").await,
            Err(EmbedError::EmptyInput)
        ));
    }

    #[test]
    fn embedding_response_shapes_are_parsed() {
        let flat = json!({ "embedding": [0.5, 1.0] });
        assert_eq!(parse_embedding(&flat).unwrap(), vec![0.5, 1.0]);

        let nested = json!({ "data": [{ "embedding": [0.25] }] });
        assert_eq!(parse_embedding(&nested).unwrap(), vec![0.25]);

        assert!(parse_embedding(&json!({ "vector": [1.0] })).is_err());
        assert!(parse_embedding(&json!({ "embedding": ["x"] })).is_err());
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(HttpEmbedder::new("not a url", None, 8).is_err());
    }
}
