//! Pipeline configuration (spec §6, §9 "Config objects")
//!
//! `Config` is built once at startup from CLI flags and environment
//! variables, then passed by value into every component constructor. It is
//! never mutated after `from_env_and_args` returns.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::error::{CieError, Result};

/// Embedding provider selection (spec §4.4, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Mock,
    Ollama,
    OpenAi,
    LlamaCpp,
    Nomic,
}

impl ProviderKind {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "mock" => Ok(Self::Mock),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "llamacpp" => Ok(Self::LlamaCpp),
            "nomic" => Ok(Self::Nomic),
            other => Err(CieError::Config {
                message: format!("unknown embedding provider: {other}"),
            }),
        }
    }
}

/// Checkpoint resume policy (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePolicy {
    FailFast,
    ForceReprocess,
    TrustCheckpoint,
}

impl ResumePolicy {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "fail_fast" => Ok(Self::FailFast),
            "force_reprocess" => Ok(Self::ForceReprocess),
            "trust_checkpoint" => Ok(Self::TrustCheckpoint),
            other => Err(CieError::Config {
                message: format!("unknown resume policy: {other}"),
            }),
        }
    }
}

/// Environment-sourced embedding provider settings (spec §6).
#[derive(Clone, Default)]
pub struct ProviderEnv {
    pub ollama_base_url: Option<String>,
    pub ollama_embed_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub openai_embed_model: Option<String>,
    pub nomic_api_key: Option<String>,
    pub nomic_api_base: Option<String>,
    pub nomic_model: Option<String>,
    pub llamacpp_embed_url: Option<String>,
}

/// Masks whether a secret is present without ever printing it (spec §B —
/// API keys must never reach `tracing` output, including via `{:?}`).
fn redacted(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "Some(<redacted>)"
    } else {
        "None"
    }
}

impl std::fmt::Debug for ProviderEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEnv")
            .field("ollama_base_url", &self.ollama_base_url)
            .field("ollama_embed_model", &self.ollama_embed_model)
            .field("openai_api_key", &format_args!("{}", redacted(&self.openai_api_key)))
            .field("openai_api_base", &self.openai_api_base)
            .field("openai_embed_model", &self.openai_embed_model)
            .field("nomic_api_key", &format_args!("{}", redacted(&self.nomic_api_key)))
            .field("nomic_api_base", &self.nomic_api_base)
            .field("nomic_model", &self.nomic_model)
            .field("llamacpp_embed_url", &self.llamacpp_embed_url)
            .finish()
    }
}

impl ProviderEnv {
    fn from_process_env() -> Self {
        let get = |name: &str| std::env::var(name).ok();
        Self {
            ollama_base_url: get("OLLAMA_BASE_URL"),
            ollama_embed_model: get("OLLAMA_EMBED_MODEL"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_api_base: get("OPENAI_API_BASE"),
            openai_embed_model: get("OPENAI_EMBED_MODEL"),
            nomic_api_key: get("NOMIC_API_KEY"),
            nomic_api_base: get("NOMIC_API_BASE"),
            nomic_model: get("NOMIC_MODEL"),
            llamacpp_embed_url: get("LLAMACPP_EMBED_URL"),
        }
    }
}

/// Immutable pipeline configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_id: String,
    pub source: SourceSpec,
    pub exclude_globs: Vec<String>,
    pub max_file_size: u64,
    pub code_text_cap: usize,

    pub parse_workers: usize,
    pub embed_workers: usize,

    pub target_mutations: usize,
    pub max_batch_bytes: usize,

    pub provider: ProviderKind,
    pub provider_env: ProviderEnv,
    pub embed_timeout: Duration,
    pub max_retries: u32,
    pub retry_base: Duration,
    pub retry_mult: f64,
    pub retry_max_backoff: Duration,

    pub resume_policy: ResumePolicy,
    pub checkpoint_path: PathBuf,

    pub dry_run: bool,
    pub verbose: bool,
}

/// Tagged source per spec §4.1: `Load(source, ...)`.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    GitUrl(String),
    LocalPath(PathBuf),
}

impl Config {
    /// Defaults mirror spec §4.7 (P=4, W=8) and §4.5/§4.6 (1000 mutations,
    /// 4 MiB batches).
    pub const DEFAULT_PARSE_WORKERS: usize = 4;
    pub const DEFAULT_EMBED_WORKERS: usize = 8;
    pub const DEFAULT_TARGET_MUTATIONS: usize = 1000;
    pub const DEFAULT_MAX_BATCH_BYTES: usize = 4 * 1024 * 1024;
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;
    pub const DEFAULT_CODE_TEXT_CAP: usize = 8000;
    /// Fallback vector width when a provider can't report `dimensions()`
    /// ahead of time (matches `MockProvider`'s default, spec §6).
    pub const DEFAULT_EMBEDDING_DIM: usize = 768;

    pub fn from_env_and_args(cli: &RunArgs) -> Result<Self> {
        let source = if let Some(ref url) = cli.git_url {
            SourceSpec::GitUrl(url.clone())
        } else {
            let path = cli.path.clone().unwrap_or_else(|| PathBuf::from("."));
            SourceSpec::LocalPath(path)
        };

        let provider = ProviderKind::parse(cli.provider.as_deref().unwrap_or("mock"))?;
        let resume_policy =
            ResumePolicy::parse(cli.resume_policy.as_deref().unwrap_or("trust_checkpoint"))?;

        let checkpoint_path = cli.checkpoint.clone().unwrap_or_else(|| {
            PathBuf::from(format!("checkpoint-{}.json", cli.project_id))
        });

        Ok(Self {
            project_id: cli.project_id.clone(),
            source,
            exclude_globs: cli.exclude.clone(),
            max_file_size: cli.max_file_size.unwrap_or(Self::DEFAULT_MAX_FILE_SIZE),
            code_text_cap: cli.code_text_cap.unwrap_or(Self::DEFAULT_CODE_TEXT_CAP),
            parse_workers: cli.parse_workers.unwrap_or(Self::DEFAULT_PARSE_WORKERS),
            embed_workers: cli.embed_workers.unwrap_or(Self::DEFAULT_EMBED_WORKERS),
            target_mutations: cli
                .target_mutations
                .unwrap_or(Self::DEFAULT_TARGET_MUTATIONS),
            max_batch_bytes: cli.max_batch_bytes.unwrap_or(Self::DEFAULT_MAX_BATCH_BYTES),
            provider,
            provider_env: ProviderEnv::from_process_env(),
            embed_timeout: Duration::from_secs(cli.embed_timeout_secs.unwrap_or(60)),
            max_retries: cli.max_retries.unwrap_or(4),
            retry_base: Duration::from_millis(cli.retry_base_ms.unwrap_or(200)),
            retry_mult: cli.retry_mult.unwrap_or(2.0),
            retry_max_backoff: Duration::from_secs(cli.retry_max_backoff_secs.unwrap_or(30)),
            resume_policy,
            checkpoint_path,
            dry_run: cli.dry_run,
            verbose: cli.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("mock").unwrap(), ProviderKind::Mock);
        assert!(ProviderKind::parse("bogus").is_err());
    }

    #[test]
    fn test_resume_policy_parse() {
        assert_eq!(
            ResumePolicy::parse("fail_fast").unwrap(),
            ResumePolicy::FailFast
        );
        assert!(ResumePolicy::parse("bogus").is_err());
    }
}
