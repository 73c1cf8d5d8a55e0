//! cie CLI entry point

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cie_core::backend::{Backend, CozoBackend};
use cie_core::cli::{Cli, Command, DeltaArgs, RunArgs};
use cie_core::config::Config;
use cie_core::delta::{diff_revisions, filter_delta, EligibilityCheck};
use cie_core::embed::EmbeddingProvider;
use cie_core::error::{CieError, Result};
use cie_core::loader::glob::GlobSet;
use cie_core::orchestrator::{self, CancelFlag, Pipeline};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(matches!(&cli.command, Command::Run(args) if args.verbose));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "cie_core=debug,cie=debug" } else { "cie_core=info,cie=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run(cli: Cli) -> Result<String> {
    match cli.command {
        Command::Run(args) => run_ingestion(&args).await,
        Command::Delta(args) => run_delta(&args),
    }
}

async fn run_ingestion(args: &RunArgs) -> Result<String> {
    let config = Config::from_env_and_args(args)?;

    let backend = CozoBackend::open("sqlite", &format!("{}.db", config.project_id))
        .map_err(|e| CieError::BackendWrite { message: format!("failed to open backend: {e}") })?;
    if !config.dry_run {
        let provider = orchestrator::build_provider(&config)?;
        let dim = provider.dimensions().unwrap_or(Config::DEFAULT_EMBEDDING_DIM);
        backend.ensure_schema(dim)?;
    }

    let pipeline = Pipeline::new(&config, &backend as &dyn Backend);
    let cancel = CancelFlag::new();

    let ctrl_c_cancel = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let result = pipeline.run(cancel).await?;
    backend.close()?;

    Ok(format!(
        "run {}: {} files, {} functions, {} types, {} calls, {} batches ({} parse errors, {} embedding errors, {} code-text truncations)",
        result.run_id,
        result.files_processed,
        result.functions_extracted,
        result.types_extracted,
        result.calls_resolved,
        result.batches_written,
        result.parse_errors,
        result.embedding_errors,
        result.code_text_truncated,
    ))
}

fn run_delta(args: &DeltaArgs) -> Result<String> {
    let changes = diff_revisions(&args.base_sha, &args.head_sha, Some(&args.path))?;
    let excludes = GlobSet::new(args.exclude.clone());
    let eligible = MaxSizeEligibility { root: args.path.clone(), max_file_size: args.max_file_size.unwrap_or(Config::DEFAULT_MAX_FILE_SIZE) };
    let delta = filter_delta(&changes, &excludes, &eligible);

    Ok(format!(
        "delta {}..{}: +{} ~{} -{} renamed {} (total touched: {})",
        args.base_sha,
        args.head_sha,
        delta.added.len(),
        delta.modified.len(),
        delta.deleted.len(),
        delta.renamed.len(),
        delta.all.len(),
    ))
}

struct MaxSizeEligibility {
    root: std::path::PathBuf,
    max_file_size: u64,
}

impl EligibilityCheck for MaxSizeEligibility {
    fn is_eligible(&self, path: &str) -> bool {
        std::fs::metadata(self.root.join(path)).map(|m| m.len() <= self.max_file_size).unwrap_or(true)
    }
}
