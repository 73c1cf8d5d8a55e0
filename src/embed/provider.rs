//! Embedding provider trait and HTTP-backed implementations (spec §4.4, §6).

use async_trait::async_trait;

use crate::error::{CieError, Result};

/// One text chunk submitted for embedding, paired with the entity id it
/// belongs to (a function or type id).
#[derive(Debug, Clone)]
pub struct EmbedRequest {
    pub entity_id: String,
    pub text: String,
}

/// A provider's raw answer for one request: either a vector or an error
/// message (kept per-item so a partial batch failure doesn't sink the
/// whole call, spec P7).
#[derive(Debug, Clone)]
pub struct EmbedReply {
    pub entity_id: String,
    pub vector: Vec<f32>,
    pub error: Option<String>,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts in one round trip. Implementations should
    /// return one reply per request, in the same order, even on partial
    /// failure; only return `Err` for a transport-level failure that
    /// affects the whole batch (the engine retries those).
    async fn embed_batch(&self, requests: &[EmbedRequest]) -> Result<Vec<EmbedReply>>;

    /// Dimensionality of vectors this provider returns, when known ahead
    /// of time (used for validation; `None` if the provider can't say).
    fn dimensions(&self) -> Option<usize> {
        None
    }
}

/// `POST {base_url}/v1/embeddings` with `{"model": ..., "input": [...],
/// "encoding_format": "float"}`, OpenAI-compatible response shape
/// `{"data": [{"embedding": [...]}]}`.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        OpenAiProvider {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_batch(&self, requests: &[EmbedRequest]) -> Result<Vec<EmbedReply>> {
        let inputs: Vec<&str> = requests.iter().map(|r| r.text.as_str()).collect();
        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": self.model, "input": inputs, "encoding_format": "float" }))
            .send()
            .await
            .map_err(|e| CieError::BackendWrite { message: format!("embedding request failed: {e}") })?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CieError::BackendWrite { message: format!("embedding response decode failed: {e}") })?;

        if !status.is_success() {
            return Err(CieError::BackendWrite { message: format!("embedding http {status}: {body}") });
        }

        let data = body["data"].as_array().cloned().unwrap_or_default();
        Ok(requests
            .iter()
            .enumerate()
            .map(|(i, req)| {
                let vector = data
                    .get(i)
                    .and_then(|item| item["embedding"].as_array())
                    .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                    .unwrap_or_default();
                EmbedReply { entity_id: req.entity_id.clone(), vector, error: None }
            })
            .collect())
    }
}

/// `POST {base_url}/api/embeddings` with `{"model": ..., "prompt": ...}`,
/// one request per text (Ollama has no batch endpoint).
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        OllamaProvider { client: reqwest::Client::new(), base_url: base_url.into(), model: model.into() }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed_batch(&self, requests: &[EmbedRequest]) -> Result<Vec<EmbedReply>> {
        let mut replies = Vec::with_capacity(requests.len());
        for req in requests {
            let response = self
                .client
                .post(format!("{}/api/embeddings", self.base_url))
                .json(&serde_json::json!({ "model": self.model, "prompt": req.text }))
                .send()
                .await
                .map_err(|e| CieError::BackendWrite { message: format!("embedding request failed: {e}") })?;

            let status = response.status();
            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| CieError::BackendWrite { message: format!("embedding response decode failed: {e}") })?;

            if !status.is_success() {
                return Err(CieError::BackendWrite { message: format!("embedding http {status}: {body}") });
            }

            let vector = body["embedding"]
                .as_array()
                .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                .unwrap_or_default();
            replies.push(EmbedReply { entity_id: req.entity_id.clone(), vector, error: None });
        }
        Ok(replies)
    }
}

/// llama.cpp server's `/embedding` endpoint: `{"content": ...}` in,
/// `{"embedding": [...]}` out, one request per text.
pub struct LlamaCppProvider {
    client: reqwest::Client,
    base_url: String,
}

impl LlamaCppProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        LlamaCppProvider { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl EmbeddingProvider for LlamaCppProvider {
    async fn embed_batch(&self, requests: &[EmbedRequest]) -> Result<Vec<EmbedReply>> {
        let mut replies = Vec::with_capacity(requests.len());
        for req in requests {
            let response = self
                .client
                .post(format!("{}/embedding", self.base_url))
                .json(&serde_json::json!({ "content": req.text }))
                .send()
                .await
                .map_err(|e| CieError::BackendWrite { message: format!("embedding request failed: {e}") })?;

            let status = response.status();
            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| CieError::BackendWrite { message: format!("embedding response decode failed: {e}") })?;

            if !status.is_success() {
                return Err(CieError::BackendWrite { message: format!("embedding http {status}: {body}") });
            }

            let vector = body["embedding"]
                .as_array()
                .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                .unwrap_or_default();
            replies.push(EmbedReply { entity_id: req.entity_id.clone(), vector, error: None });
        }
        Ok(replies)
    }
}

/// Nomic Atlas' embeddings endpoint: `POST {base_url}/embedding/text`
/// with `{"model": ..., "texts": [...], "task_type": "search_document"}`,
/// response `{"embeddings": [...]}`.
pub struct NomicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl NomicProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        NomicProvider {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for NomicProvider {
    async fn embed_batch(&self, requests: &[EmbedRequest]) -> Result<Vec<EmbedReply>> {
        let texts: Vec<&str> = requests.iter().map(|r| r.text.as_str()).collect();
        let response = self
            .client
            .post(format!("{}/embedding/text", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "model": self.model, "texts": texts, "task_type": "search_document" }))
            .send()
            .await
            .map_err(|e| CieError::BackendWrite { message: format!("embedding request failed: {e}") })?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CieError::BackendWrite { message: format!("embedding response decode failed: {e}") })?;

        if !status.is_success() {
            return Err(CieError::BackendWrite { message: format!("embedding http {status}: {body}") });
        }

        let embeddings = body["embeddings"].as_array().cloned().unwrap_or_default();
        Ok(requests
            .iter()
            .enumerate()
            .map(|(i, req)| {
                let vector = embeddings
                    .get(i)
                    .and_then(|v| v.as_array())
                    .map(|arr| arr.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect())
                    .unwrap_or_default();
                EmbedReply { entity_id: req.entity_id.clone(), vector, error: None }
            })
            .collect())
    }
}
