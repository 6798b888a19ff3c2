use crate::error::GenerateError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

#[async_trait]
pub trait Generator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

pub struct HttpGenerator {
    endpoint: Url,
    api_key: Option<String>,
    client: Client,
}

impl HttpGenerator {
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, GenerateError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            api_key,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "prompt": prompt }));

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(GenerateError::BadResponse(format!(
                "{} returned {}",
                self.endpoint,
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        completion_text(&body)
    }
}

fn completion_text(body: &Value) -> Result<String, GenerateError> {
    ["/text", "/answer", "/response"]
        .iter()
        .find_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| GenerateError::BadResponse("response has no completion text".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_text_reads_known_fields() {
        assert_eq!(completion_text(&json!({ "text": "a" })).unwrap(), "a");
        assert_eq!(completion_text(&json!({ "answer": "b" })).unwrap(), "b");
        assert_eq!(completion_text(&json!({ "response": "c" })).unwrap(), "c");
        assert!(completion_text(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(HttpGenerator::new("::nope", None).is_err());
    }
}
