//! Deterministic hash-based embedding provider, for tests and for runs
//! configured without a live embedding backend.

use async_trait::async_trait;

use super::provider::{EmbedReply, EmbedRequest, EmbeddingProvider};
use crate::error::Result;
use crate::id::sha256_hex;

pub struct MockProvider {
    pub dimensions: usize,
    /// Entity ids in this set produce an error instead of a vector, so
    /// callers can exercise partial-failure handling deterministically.
    pub fail_entity_ids: Vec<String>,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        MockProvider { dimensions, fail_entity_ids: Vec::new() }
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    async fn embed_batch(&self, requests: &[EmbedRequest]) -> Result<Vec<EmbedReply>> {
        Ok(requests
            .iter()
            .map(|req| {
                if self.fail_entity_ids.contains(&req.entity_id) {
                    return EmbedReply { entity_id: req.entity_id.clone(), vector: Vec::new(), error: Some("mock embedding failure".to_string()) };
                }
                let vector = hash_vector(&req.text, self.dimensions);
                EmbedReply { entity_id: req.entity_id.clone(), vector, error: None }
            })
            .collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }
}

/// Deterministic unit-norm vector derived from repeated SHA-256 digests
/// of `text`, so the same input always yields the same embedding.
fn hash_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut values = Vec::with_capacity(dimensions);
    let mut seed = sha256_hex(text);
    while values.len() < dimensions {
        seed = sha256_hex(&seed);
        for chunk in seed.as_bytes().chunks(2) {
            if values.len() >= dimensions {
                break;
            }
            let byte_str = std::str::from_utf8(chunk).unwrap_or("00");
            let n = u8::from_str_radix(byte_str, 16).unwrap_or(0);
            values.push((n as f32 / 255.0) * 2.0 - 1.0);
        }
    }
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut values {
            *v /= norm;
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_is_deterministic_and_unit_norm() {
        let provider = MockProvider::new(8);
        let requests = vec![EmbedRequest { entity_id: "a".to_string(), text: "fn foo() {}".to_string() }];
        let first = provider.embed_batch(&requests).await.unwrap();
        let second = provider.embed_batch(&requests).await.unwrap();
        assert_eq!(first[0].vector, second[0].vector);
        let norm: f32 = first[0].vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_mock_provider_reports_configured_failures() {
        let mut provider = MockProvider::new(4);
        provider.fail_entity_ids.push("bad".to_string());
        let requests = vec![
            EmbedRequest { entity_id: "bad".to_string(), text: "x".to_string() },
            EmbedRequest { entity_id: "good".to_string(), text: "y".to_string() },
        ];
        let replies = provider.embed_batch(&requests).await.unwrap();
        assert!(replies[0].error.is_some());
        assert!(replies[0].vector.is_empty());
        assert!(replies[1].error.is_none());
    }
}
