use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{Error, Result};

/// Turns a text into one fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The model name used for embeddings (e.g., "text-embedding-3-small").
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;
}

/// OpenAI `/embeddings` client
pub struct OpenAiEmbedder {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, base_url: &str, model: &str, dimension: usize) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::config("OpenAI API key is required"));
        }

        Ok(Self {
            api_key: api_key.to_string(),
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.api_key()?,
            &settings.openai_base_url,
            &settings.embedding_model,
            settings.embedding_dimension as usize,
        )
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Embedding {} chars with {}", text.chars().count(), self.model);

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error ({}): {}", status, error_text);

            return match status {
                StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
                _ => Err(Error::Embedding(format!("OpenAI API error: {}", status))),
            };
        }

        let body: EmbeddingResponse = response.json().await?;
        single_vector(body, self.dimension)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn single_vector(body: EmbeddingResponse, dimension: usize) -> Result<Vec<f32>> {
    let mut data = body.data;
    if data.len() != 1 {
        return Err(Error::Embedding(format!(
            "expected one embedding, got {}",
            data.len()
        )));
    }

    let vector = data.remove(0).embedding;
    if vector.len() != dimension {
        return Err(Error::Embedding(format!(
            "expected {} dimensions, got {}",
            dimension,
            vector.len()
        )));
    }

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> EmbeddingResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let result = OpenAiEmbedder::new("", "https://api.openai.com/v1", "m", 1536);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let embedder =
            OpenAiEmbedder::new("sk-test", "http://localhost:8080/v1/", "m", 3).unwrap();
        assert_eq!(embedder.base_url, "http://localhost:8080/v1");
        assert_eq!(embedder.model_name(), "m");
        assert_eq!(embedder.dimension(), 3);
    }

    #[test]
    fn test_single_vector() {
        let body = response(
            r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,0.2,0.3]}],
                "model":"text-embedding-3-small","usage":{"prompt_tokens":3,"total_tokens":3}}"#,
        );
        assert_eq!(single_vector(body, 3).unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_wrong_dimension() {
        let body = response(r#"{"data":[{"embedding":[0.1,0.2]}]}"#);
        assert!(matches!(single_vector(body, 3), Err(Error::Embedding(_))));
    }

    #[test]
    fn test_no_data() {
        let body = response(r#"{"data":[]}"#);
        assert!(matches!(single_vector(body, 3), Err(Error::Embedding(_))));
    }
}
