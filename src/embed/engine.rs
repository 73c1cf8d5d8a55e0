//! Embedding Engine (C4, spec §4.4).
//!
//! Runs a bounded worker pool of size `W` over a batch of embed requests,
//! preserving input order in the output, retrying transient provider
//! errors with full-jitter backoff, and degrading gracefully: a request
//! that exhausts its retries gets an empty vector rather than aborting
//! the run (spec P7).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use super::provider::{EmbedReply, EmbedRequest, EmbeddingProvider};
use super::retry::{is_retryable, BackoffPolicy};
use crate::schema::Embedding;

pub struct EngineConfig {
    pub workers: usize,
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub backoff_mult: f64,
    pub max_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            workers: 8,
            max_retries: 4,
            base_backoff: Duration::from_millis(200),
            backoff_mult: 2.0,
            max_backoff: Duration::from_secs(10),
        }
    }
}

/// Outcome of embedding one run's worth of requests.
pub struct EmbedOutcome {
    pub embeddings: Vec<Embedding>,
    pub error_count: usize,
}

/// Embed `requests` against `provider`, `config.workers` at a time (or
/// sequentially when `workers <= 1` or there's nothing to parallelize),
/// returning one [`Embedding`] per input in the same order. `is_canceled`
/// is polled between items so a run can stop early without losing
/// already-computed embeddings.
pub async fn run(
    provider: Arc<dyn EmbeddingProvider>,
    requests: Vec<EmbedRequest>,
    config: &EngineConfig,
    is_canceled: &(dyn Fn() -> bool + Send + Sync),
) -> EmbedOutcome {
    let total = requests.len();
    if total == 0 {
        return EmbedOutcome { embeddings: Vec::new(), error_count: 0 };
    }

    let backoff = Arc::new(BackoffPolicy::new(config.base_backoff, config.backoff_mult, config.max_backoff, config.max_retries));

    if config.workers <= 1 || total == 1 {
        let mut embeddings = Vec::with_capacity(total);
        let mut error_count = 0usize;
        for req in requests {
            if is_canceled() {
                break;
            }
            let reply = embed_one_with_retry(provider.as_ref(), &req, config.max_retries, &backoff).await;
            if reply.error.is_some() {
                error_count += 1;
            }
            embeddings.push(Embedding { entity_id: reply.entity_id, vector: reply.vector });
        }
        return EmbedOutcome { embeddings, error_count };
    }

    let workers = config.workers.min(total);
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut join_set = tokio::task::JoinSet::new();

    for (index, req) in requests.into_iter().enumerate() {
        if is_canceled() {
            break;
        }
        let provider = Arc::clone(&provider);
        let backoff = Arc::clone(&backoff);
        let semaphore = Arc::clone(&semaphore);
        let max_retries = config.max_retries;
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("embedding semaphore never closed");
            let reply = embed_one_with_retry(provider.as_ref(), &req, max_retries, &backoff).await;
            (index, reply)
        });
    }

    let mut results: Vec<Option<Embedding>> = vec![None; total];
    let mut error_count = 0usize;
    while let Some(joined) = join_set.join_next().await {
        let Ok((index, reply)) = joined else { continue };
        if reply.error.is_some() {
            error_count += 1;
        }
        results[index] = Some(Embedding { entity_id: reply.entity_id, vector: reply.vector });
    }

    EmbedOutcome { embeddings: results.into_iter().flatten().collect(), error_count }
}

async fn embed_one_with_retry(
    provider: &(dyn EmbeddingProvider + Send + Sync),
    request: &EmbedRequest,
    max_retries: u32,
    backoff: &BackoffPolicy,
) -> EmbedReply {
    let batch = std::slice::from_ref(request);
    let mut attempt = 0u32;
    loop {
        match provider.embed_batch(batch).await {
            Ok(mut replies) if !replies.is_empty() => {
                let reply = replies.remove(0);
                if reply.error.is_some() && attempt < max_retries && is_retryable(reply.error.as_deref().unwrap_or("")) {
                    tokio::time::sleep(backoff.delay_for(attempt)).await;
                    attempt += 1;
                    continue;
                }
                return reply;
            }
            Ok(_) => {
                return EmbedReply {
                    entity_id: request.entity_id.clone(),
                    vector: Vec::new(),
                    error: Some("empty provider response".to_string()),
                };
            }
            Err(e) => {
                let message = e.to_string();
                if attempt < max_retries && is_retryable(&message) {
                    tokio::time::sleep(backoff.delay_for(attempt)).await;
                    attempt += 1;
                    continue;
                }
                return EmbedReply { entity_id: request.entity_id.clone(), vector: Vec::new(), error: Some(message) };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::mock::MockProvider;

    #[tokio::test]
    async fn test_p6_unit_norm_vectors() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(MockProvider::new(16));
        let requests = vec![
            EmbedRequest { entity_id: "a".to_string(), text: "fn a() {}".to_string() },
            EmbedRequest { entity_id: "b".to_string(), text: "fn b() {}".to_string() },
        ];
        let outcome = run(provider, requests, &EngineConfig::default(), &|| false).await;
        assert_eq!(outcome.error_count, 0);
        for embedding in &outcome.embeddings {
            assert!((embedding.norm() - 1.0).abs() < 1e-4);
        }
    }

    #[tokio::test]
    async fn test_p7_graceful_failure_returns_full_list_with_empty_vectors() {
        let mut provider = MockProvider::new(8);
        provider.fail_entity_ids = vec!["a".to_string(), "b".to_string()];
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(provider);
        let requests = vec![
            EmbedRequest { entity_id: "a".to_string(), text: "x".to_string() },
            EmbedRequest { entity_id: "b".to_string(), text: "y".to_string() },
        ];
        let mut config = EngineConfig::default();
        config.max_retries = 0;
        let outcome = run(provider, requests, &config, &|| false).await;
        assert_eq!(outcome.embeddings.len(), 2);
        assert_eq!(outcome.error_count, 2);
        assert!(outcome.embeddings.iter().all(|e| e.vector.is_empty()));
    }

    #[tokio::test]
    async fn test_order_preserved_under_parallel_workers() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(MockProvider::new(4));
        let requests: Vec<EmbedRequest> = (0..20)
            .map(|i| EmbedRequest { entity_id: format!("id{i}"), text: format!("text{i}") })
            .collect();
        let mut config = EngineConfig::default();
        config.workers = 4;
        let outcome = run(provider, requests, &config, &|| false).await;
        let ids: Vec<&str> = outcome.embeddings.iter().map(|e| e.entity_id.as_str()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("id{i}")).collect();
        assert_eq!(ids, expected.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    }
}
