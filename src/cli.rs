//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Code intelligence ingestion pipeline
#[derive(Parser, Debug)]
#[command(name = "cie")]
#[command(about = "Turns a repository into a normalized graph of code entities plus embeddings")]
#[command(version)]
#[command(author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a full ingestion pipeline over a repository
    Run(RunArgs),
    /// Compute and filter a delta between two revisions
    Delta(DeltaArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Unique identifier for this project (used in run_id, checkpoint filename)
    #[arg(long)]
    pub project_id: String,

    /// Local path to ingest (mutually exclusive with --git-url)
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Git URL to clone and ingest (mutually exclusive with --path)
    #[arg(long, value_name = "URL")]
    pub git_url: Option<String>,

    /// Glob exclusion pattern (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Maximum file size in bytes before a file is skipped
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Character cap applied to stored code text
    #[arg(long)]
    pub code_text_cap: Option<usize>,

    /// Parse worker pool size (P)
    #[arg(long)]
    pub parse_workers: Option<usize>,

    /// Embedding worker pool size (W)
    #[arg(long)]
    pub embed_workers: Option<usize>,

    /// Target mutation count per Datalog batch
    #[arg(long)]
    pub target_mutations: Option<usize>,

    /// Maximum byte size per Datalog batch
    #[arg(long)]
    pub max_batch_bytes: Option<usize>,

    /// Embedding provider: mock|ollama|openai|llamacpp|nomic
    #[arg(long)]
    pub provider: Option<String>,

    /// Embedding HTTP request timeout in seconds
    #[arg(long)]
    pub embed_timeout_secs: Option<u64>,

    /// Maximum embedding retry attempts
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base backoff delay in milliseconds
    #[arg(long)]
    pub retry_base_ms: Option<u64>,

    /// Backoff multiplier
    #[arg(long)]
    pub retry_mult: Option<f64>,

    /// Maximum backoff delay in seconds
    #[arg(long)]
    pub retry_max_backoff_secs: Option<u64>,

    /// Checkpoint resume policy: fail_fast|force_reprocess|trust_checkpoint
    #[arg(long)]
    pub resume_policy: Option<String>,

    /// Explicit checkpoint file path (default: checkpoint-<project_id>.json)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Batch and validate without calling Backend::Execute
    #[arg(long)]
    pub dry_run: bool,

    /// Raise the tracing filter to debug for the cie target
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct DeltaArgs {
    /// Repository path
    #[arg(long, value_name = "PATH")]
    pub path: PathBuf,

    /// Base revision SHA (empty string compares against the empty tree)
    #[arg(long)]
    pub base_sha: String,

    /// Head revision SHA
    #[arg(long)]
    pub head_sha: String,

    /// Glob exclusion pattern (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Maximum file size in bytes before a file is ineligible
    #[arg(long)]
    pub max_file_size: Option<u64>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
