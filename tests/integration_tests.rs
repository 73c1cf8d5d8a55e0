//! End-to-end pipeline tests: load -> parse -> resolve -> embed -> emit ->
//! batch -> write, against a real in-memory Cozo backend and the
//! deterministic Mock embedding provider.

use std::path::PathBuf;
use std::time::Duration;

use cie_core::backend::{Backend, CozoBackend};
use cie_core::config::{Config, ProviderEnv, ProviderKind, ResumePolicy, SourceSpec};
use cie_core::orchestrator::{CancelFlag, Pipeline};
use tempfile::tempdir;

fn base_config(project_id: &str, repo_root: PathBuf, checkpoint_path: PathBuf) -> Config {
    Config {
        project_id: project_id.to_string(),
        source: SourceSpec::LocalPath(repo_root),
        exclude_globs: Vec::new(),
        max_file_size: Config::DEFAULT_MAX_FILE_SIZE,
        code_text_cap: Config::DEFAULT_CODE_TEXT_CAP,
        parse_workers: 1,
        embed_workers: 2,
        target_mutations: Config::DEFAULT_TARGET_MUTATIONS,
        max_batch_bytes: Config::DEFAULT_MAX_BATCH_BYTES,
        provider: ProviderKind::Mock,
        provider_env: ProviderEnv::default(),
        embed_timeout: Duration::from_secs(5),
        max_retries: 1,
        retry_base: Duration::from_millis(5),
        retry_mult: 2.0,
        retry_max_backoff: Duration::from_millis(50),
        resume_policy: ResumePolicy::ForceReprocess,
        checkpoint_path,
        dry_run: false,
        verbose: false,
    }
}

#[tokio::test]
async fn test_pipeline_ingests_go_repo_end_to_end() {
    let repo = tempdir().unwrap();
    std::fs::write(
        repo.path().join("main.go"),
        "package main\n\nfunc Helper() {}\n\nfunc Run() {\n\tHelper()\n}\n",
    )
    .unwrap();

    let checkpoint_dir = tempdir().unwrap();
    let config = base_config("repo-one", repo.path().to_path_buf(), checkpoint_dir.path().join("checkpoint.json"));

    let backend = CozoBackend::open("mem", "").unwrap();
    backend.ensure_schema(Config::DEFAULT_EMBEDDING_DIM).unwrap();

    let pipeline = Pipeline::new(&config, &backend as &dyn Backend);
    let result = pipeline.run(CancelFlag::new()).await.unwrap();

    assert_eq!(result.files_processed, 1);
    assert_eq!(result.functions_extracted, 2);
    assert_eq!(result.calls_resolved, 1);
    assert_eq!(result.parse_errors, 0);
    assert!(result.batches_written >= 1);

    let rows = backend.query("?[id] := *cie_function{id}").unwrap();
    assert_eq!(rows.len(), 2);

    let embedding_rows = backend.query("?[id] := *cie_function_embedding{id}").unwrap();
    assert_eq!(embedding_rows.len(), 2);
}

#[tokio::test]
async fn test_pipeline_dry_run_skips_backend_writes() {
    let repo = tempdir().unwrap();
    std::fs::write(repo.path().join("a.go"), "package main\n\nfunc A() {}\n").unwrap();

    let checkpoint_dir = tempdir().unwrap();
    let mut config = base_config("repo-dry", repo.path().to_path_buf(), checkpoint_dir.path().join("checkpoint.json"));
    config.dry_run = true;

    let backend = CozoBackend::open("mem", "").unwrap();
    let pipeline = Pipeline::new(&config, &backend as &dyn Backend);
    let result = pipeline.run(CancelFlag::new()).await.unwrap();

    assert!(result.batches_written >= 1);
    let rows = backend.query("?[id] := *cie_function{id}").unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_pipeline_rerun_is_idempotent_not_duplicating_entities() {
    // Running the pipeline twice against an unchanged repo must re-upsert
    // the same deterministic ids rather than accumulate duplicates (spec
    // §3, P1) -- even though each run mints a fresh, time-based run_id.
    let repo = tempdir().unwrap();
    std::fs::write(repo.path().join("b.go"), "package main\n\nfunc B() {}\n").unwrap();

    let checkpoint_dir = tempdir().unwrap();
    let checkpoint_path = checkpoint_dir.path().join("checkpoint.json");
    let config = base_config("repo-resume", repo.path().to_path_buf(), checkpoint_path);

    let backend = CozoBackend::open("mem", "").unwrap();
    backend.ensure_schema(Config::DEFAULT_EMBEDDING_DIM).unwrap();

    let first = Pipeline::new(&config, &backend as &dyn Backend).run(CancelFlag::new()).await.unwrap();
    assert_eq!(first.functions_extracted, 1);

    let second = Pipeline::new(&config, &backend as &dyn Backend).run(CancelFlag::new()).await.unwrap();
    assert_eq!(second.functions_extracted, 1);

    let rows = backend.query("?[id] := *cie_function{id}").unwrap();
    assert_eq!(rows.len(), 1, "re-running must upsert, not duplicate, the same function id");
}
