//! Orchestrator / Pipeline (C7, spec §4.7)
//!
//! Drives one run end to end: load -> parse (parallel) -> resolve ->
//! embed (parallel) -> validate -> emit Datalog -> batch -> write ->
//! finalize. Every step is built to degrade: a single file's parse
//! failure or a single embedding's exhausted retries is recorded and the
//! run continues (spec §7, P7).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;

use crate::backend::Backend;
use crate::checkpoint::Checkpoint;
use crate::config::{Config, ProviderKind};
use crate::datalog::{build_batches, EmitInput};
use crate::embed::{self, EmbedRequest, EmbeddingProvider, EngineConfig, LlamaCppProvider, NomicProvider, OllamaProvider, OpenAiProvider};
use crate::error::{CieError, Result};
use crate::extractor::{self, ParseResult};
use crate::id;
use crate::loader::{self, LoadedFile, Source};
use crate::resolver::{derive_implements, Resolver, ResolverInput};
use crate::schema::{
    CallEdge, DefinesEdge, DefinesTypeEdge, FieldInfo, File, Function, Import, InterfaceMethods, ProjectMeta, Type,
    UnresolvedCall,
};

/// Parse/embed progress a caller can use to cancel mid-run.
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(CancelFlag(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a run produced, returned even on partial success (spec §7).
#[derive(Debug, Default)]
pub struct IngestionResult {
    pub files_processed: usize,
    pub functions_extracted: usize,
    pub types_extracted: usize,
    pub calls_resolved: usize,
    pub batches_written: usize,
    pub parse_errors: usize,
    pub embedding_errors: usize,
    pub code_text_truncated: usize,
    pub top_skip_reasons: BTreeMap<String, usize>,
    pub run_id: String,
}

pub struct Pipeline<'a> {
    pub config: &'a Config,
    pub backend: &'a dyn Backend,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, backend: &'a dyn Backend) -> Self {
        Pipeline { config, backend }
    }

    pub async fn run(&self, cancel: Arc<CancelFlag>) -> Result<IngestionResult> {
        let now = now_epoch();
        let run_id = id::run_id(&self.config.project_id, now.max(0) as u64);

        let source = match &self.config.source {
            crate::config::SourceSpec::GitUrl(url) => Source::GitUrl(url.clone()),
            crate::config::SourceSpec::LocalPath(path) => Source::LocalPath(path.clone()),
        };

        let mut load_result = loader::load(&source, &self.config.exclude_globs, self.config.max_file_size)?;
        let top_skip_reasons = load_result.skip_reasons.clone();

        let checkpoint_path = self.config.checkpoint_path.clone();
        let mut checkpoint =
            crate::checkpoint::resolve_start(&checkpoint_path, &self.config.project_id, now, self.config.resume_policy, self.backend)?;

        let parse_outcomes = self.parse_all(&load_result.files, &cancel)?;

        let mut files: Vec<File> = Vec::new();
        let mut functions: Vec<Function> = Vec::new();
        let mut types: Vec<Type> = Vec::new();
        let mut defines: Vec<DefinesEdge> = Vec::new();
        let mut defines_types: Vec<DefinesTypeEdge> = Vec::new();
        let mut calls: Vec<CallEdge> = Vec::new();
        let mut imports: Vec<Import> = Vec::new();
        let mut unresolved_calls: Vec<UnresolvedCall> = Vec::new();
        let mut fields: Vec<FieldInfo> = Vec::new();
        let mut interface_methods: Vec<InterfaceMethods> = Vec::new();
        let mut file_package: HashMap<String, String> = HashMap::new();
        let mut parse_errors = 0usize;
        let mut code_text_truncated = 0usize;

        for (loaded, content, parsed) in parse_outcomes {
            if parsed.parse_error {
                parse_errors += 1;
                continue;
            }
            let hash = id::content_hash(&content);
            checkpoint.record_file(&loaded.relative_path, &hash);

            let file_id = id::file_id(&loaded.relative_path);
            files.push(File {
                id: file_id,
                path: loaded.relative_path.clone(),
                hash,
                language: loaded.language.name().to_string(),
                size: loaded.size,
            });
            if !parsed.package_name.is_empty() {
                file_package.insert(loaded.relative_path.clone(), parsed.package_name.clone());
            }

            code_text_truncated += parsed.code_text_truncated;
            functions.extend(parsed.functions);
            types.extend(parsed.types);
            defines.extend(parsed.defines);
            defines_types.extend(parsed.defines_types);
            calls.extend(parsed.calls);
            imports.extend(parsed.imports);
            unresolved_calls.extend(parsed.unresolved_calls);
            fields.extend(parsed.fields);
            interface_methods.extend(parsed.interface_methods);
        }

        let implements = derive_implements(&functions, &interface_methods);
        let resolver_input = ResolverInput {
            functions: &functions,
            imports: &imports,
            file_package: &file_package,
            fields: &fields,
            implements: &implements,
        };
        let resolver = Resolver::build_index(&resolver_input);
        let (resolved_edges, stub_functions) = resolver.resolve(&unresolved_calls);
        calls.extend(resolved_edges);
        functions.extend(stub_functions);

        if !self.config.dry_run {
            self.backend_ensure_schema_if_supported();
        }

        let embed_requests: Vec<EmbedRequest> = functions
            .iter()
            .filter_map(|f| f.code_text.as_ref().map(|text| EmbedRequest { entity_id: f.id.clone(), text: text.clone() }))
            .chain(types.iter().filter_map(|t| t.code_text.as_ref().map(|text| EmbedRequest { entity_id: t.id.clone(), text: text.clone() })))
            .collect();

        let provider = self.build_provider()?;
        let engine_config = EngineConfig {
            workers: self.config.embed_workers,
            max_retries: self.config.max_retries,
            base_backoff: self.config.retry_base,
            backoff_mult: self.config.retry_mult,
            max_backoff: self.config.retry_max_backoff,
        };
        let cancel_for_embed = Arc::clone(&cancel);
        let outcome = embed::run(provider, embed_requests, &engine_config, &move || cancel_for_embed.is_canceled()).await;

        let function_ids: HashSet<String> = functions.iter().map(|f| f.id.clone()).collect();
        let type_ids: HashSet<String> = types.iter().map(|t| t.id.clone()).collect();
        let function_embeddings: Vec<_> = outcome.embeddings.iter().filter(|e| function_ids.contains(&e.entity_id)).collect();
        let type_embeddings: Vec<_> = outcome.embeddings.iter().filter(|e| type_ids.contains(&e.entity_id)).collect();

        validate(&files, &functions, &types, &defines, &defines_types, &calls)?;

        let project_meta = ProjectMeta {
            project_id: self.config.project_id.clone(),
            last_indexed_sha: String::new(),
            last_committed_index: checkpoint.last_committed_index as u64,
            updated_at: now,
        };

        let emit_input = EmitInput {
            files: files.iter().collect(),
            functions: functions.iter().collect(),
            types: types.iter().collect(),
            imports: imports.iter().collect(),
            defines: defines.iter().collect(),
            defines_types: defines_types.iter().collect(),
            calls: calls.iter().collect(),
            function_embeddings,
            type_embeddings,
            project_meta: Some(&project_meta),
            removed_file_ids: Vec::new(),
            removed_function_ids: Vec::new(),
        };

        let batches = build_batches(&emit_input, self.config.target_mutations, self.config.max_batch_bytes)?;

        let mut batches_written = 0usize;
        if !self.config.dry_run {
            for batch in batches.iter() {
                // Keyed by content hash, not run_id: run_id is epoch-based
                // and changes every invocation, but an interrupted run
                // resumed under `TrustCheckpoint` must still recognize
                // batches a prior process already sent.
                let request_id = id::content_hash(batch);
                if checkpoint.was_batch_sent(&request_id) {
                    continue;
                }
                if cancel.is_canceled() {
                    break;
                }
                self.backend.execute(batch)?;
                checkpoint.record_batch_sent(&request_id, "mixed", 1);
                batches_written += 1;
            }
        } else {
            batches_written = batches.len();
        }

        checkpoint.functions_extracted = functions.len();
        checkpoint.last_update_time = now_epoch();
        let _ = checkpoint.save(&checkpoint_path);
        load_result.close()?;

        Ok(IngestionResult {
            files_processed: files.len(),
            functions_extracted: functions.len(),
            types_extracted: types.len(),
            calls_resolved: calls.len(),
            batches_written,
            parse_errors,
            embedding_errors: outcome.error_count,
            code_text_truncated,
            top_skip_reasons,
            run_id,
        })
    }

    fn parse_all(&self, files: &[LoadedFile], cancel: &Arc<CancelFlag>) -> Result<Vec<(LoadedFile, String, ParseResult)>> {
        let cap = self.config.code_text_cap;

        let read_one = |loaded: &LoadedFile| -> Option<(LoadedFile, String, ParseResult)> {
            let content = std::fs::read_to_string(&loaded.absolute_path).ok()?;
            let parsed = extractor::parse_file(&loaded.relative_path, &content, loaded.language, cap);
            Some((loaded.clone(), content, parsed))
        };

        if self.config.parse_workers <= 1 || files.len() < 10 {
            let mut out = Vec::with_capacity(files.len());
            for loaded in files {
                if cancel.is_canceled() {
                    break;
                }
                if let Some(result) = read_one(loaded) {
                    out.push(result);
                }
            }
            return Ok(out);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.parse_workers)
            .build()
            .map_err(|e| CieError::Config { message: format!("failed to build parse thread pool: {e}") })?;

        let results: Vec<_> = pool.install(|| files.par_iter().filter_map(read_one).collect());
        Ok(results)
    }

    fn build_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        build_provider(self.config)
    }

    fn backend_ensure_schema_if_supported(&self) {
        // Schema init is idempotent at the backend level; a plain
        // `Backend` trait object has no `ensure_schema` hook, so concrete
        // backends that need it (CozoBackend) call it themselves before
        // constructing the Pipeline.
    }
}

/// Construct the configured embedding provider. Standalone (not just a
/// `Pipeline` method) so callers that need the provider's `dimensions()`
/// ahead of building a `Pipeline` — e.g. to size the backend's schema —
/// can build one without constructing the pipeline first.
pub fn build_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let env = &config.provider_env;
    let provider: Arc<dyn EmbeddingProvider> = match &config.provider {
        ProviderKind::Mock => Arc::new(embed::mock::MockProvider::new(Config::DEFAULT_EMBEDDING_DIM)),
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(
            env.ollama_base_url.clone().unwrap_or_else(|| "http://localhost:11434".to_string()),
            env.ollama_embed_model.clone().unwrap_or_else(|| "nomic-embed-text".to_string()),
        )),
        ProviderKind::OpenAi => {
            let api_key = env.openai_api_key.clone().ok_or_else(|| CieError::Config { message: "OPENAI_API_KEY not set".to_string() })?;
            Arc::new(OpenAiProvider::new(
                env.openai_api_base.clone().unwrap_or_else(|| "https://api.openai.com".to_string()),
                api_key,
                env.openai_embed_model.clone().unwrap_or_else(|| "text-embedding-3-small".to_string()),
            ))
        }
        ProviderKind::LlamaCpp => Arc::new(LlamaCppProvider::new(env.llamacpp_embed_url.clone().unwrap_or_else(|| "http://localhost:8080".to_string()))),
        ProviderKind::Nomic => {
            let api_key = env.nomic_api_key.clone().ok_or_else(|| CieError::Config { message: "NOMIC_API_KEY not set".to_string() })?;
            Arc::new(NomicProvider::new(
                env.nomic_api_base.clone().unwrap_or_else(|| "https://api-atlas.nomic.ai".to_string()),
                api_key,
                env.nomic_model.clone().unwrap_or_else(|| "nomic-embed-text-v1.5".to_string()),
            ))
        }
    };
    Ok(provider)
}

/// Referential-integrity checks per spec §4.7: every edge must reference
/// entities that exist in this run, and no id may be empty.
fn validate(
    files: &[File],
    functions: &[Function],
    types: &[Type],
    defines: &[DefinesEdge],
    defines_types: &[DefinesTypeEdge],
    calls: &[CallEdge],
) -> Result<()> {
    let file_ids: HashSet<&str> = files.iter().map(|f| f.id.as_str()).collect();
    let function_ids: HashSet<&str> = functions.iter().map(|f| f.id.as_str()).collect();
    let type_ids: HashSet<&str> = types.iter().map(|t| t.id.as_str()).collect();

    for f in files {
        if f.id.is_empty() {
            return Err(CieError::InvalidSource { message: "file with empty id".to_string() });
        }
    }
    for edge in defines {
        if !file_ids.contains(edge.file_id.as_str()) || !function_ids.contains(edge.function_id.as_str()) {
            return Err(CieError::InvalidSource {
                message: format!("defines edge references missing entity: {}/{}", edge.file_id, edge.function_id),
            });
        }
    }
    for edge in defines_types {
        if !file_ids.contains(edge.file_id.as_str()) || !type_ids.contains(edge.type_id.as_str()) {
            return Err(CieError::InvalidSource {
                message: format!("defines_type edge references missing entity: {}/{}", edge.file_id, edge.type_id),
            });
        }
    }
    for edge in calls {
        if !function_ids.contains(edge.caller_id.as_str()) || !function_ids.contains(edge.callee_id.as_str()) {
            return Err(CieError::InvalidSource {
                message: format!("calls edge references function outside this run: {}/{}", edge.caller_id, edge.callee_id),
            });
        }
    }
    Ok(())
}

fn now_epoch() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_dangling_defines_edge() {
        let files = vec![File { id: "file:1".to_string(), path: "a.go".to_string(), hash: "h".to_string(), language: "go".to_string(), size: 1 }];
        let functions = vec![];
        let types = vec![];
        let defines = vec![DefinesEdge { id: "d1".to_string(), file_id: "file:1".to_string(), function_id: "func:missing".to_string() }];
        let err = validate(&files, &functions, &types, &defines, &[], &[]).unwrap_err();
        assert!(matches!(err, CieError::InvalidSource { .. }));
    }

    #[test]
    fn test_validate_accepts_consistent_graph() {
        let files = vec![File { id: "file:1".to_string(), path: "a.go".to_string(), hash: "h".to_string(), language: "go".to_string(), size: 1 }];
        let functions = vec![Function {
            id: "func:1".to_string(),
            name: "Run".to_string(),
            signature: String::new(),
            file_path: "a.go".to_string(),
            code_text: None,
            start_line: 1,
            end_line: 2,
            start_col: 0,
            end_col: 0,
        }];
        let defines = vec![DefinesEdge { id: "d1".to_string(), file_id: "file:1".to_string(), function_id: "func:1".to_string() }];
        let calls = vec![CallEdge { id: "c1".to_string(), caller_id: "func:1".to_string(), callee_id: "func:1".to_string() }];
        assert!(validate(&files, &functions, &[], &defines, &[], &calls).is_ok());
    }
}
