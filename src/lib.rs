//! cie-core: code intelligence ingestion pipeline
//!
//! Turns a repository on disk into a normalized, idempotent graph of code
//! entities (files, functions, types, imports, call edges) plus vector
//! embeddings, emitted as Datalog mutation batches to an opaque [`Backend`].
//!
//! # Example
//!
//! ```ignore
//! use cie_core::config::{Config, SourceSpec};
//! use cie_core::orchestrator::Pipeline;
//!
//! let config = Config::from_env_and_args(&run_args)?;
//! let pipeline = Pipeline::new(config);
//! let result = pipeline.run().await?;
//! println!("{} files, {} functions", result.files_processed, result.functions_extracted);
//! ```

pub mod backend;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod datalog;
pub mod delta;
pub mod embed;
pub mod error;
pub mod extractor;
pub mod fs_utils;
pub mod git;
pub mod id;
pub mod lang;
pub mod loader;
pub mod orchestrator;
pub mod paths;
pub mod resolver;
pub mod schema;

pub use backend::Backend;
pub use config::{Config, ProviderKind, ResumePolicy, SourceSpec};
pub use error::{CieError, Result};
pub use id::{
    calls_edge_id, content_hash, defines_edge_id, defines_type_edge_id, external_stub_id,
    file_id, function_id, import_id, run_id, type_id,
};
pub use lang::{Lang, LangFamily};
pub use orchestrator::{IngestionResult, Pipeline};
pub use schema::{
    CallEdge, DefinesEdge, DefinesTypeEdge, Embedding, File, Function, Import, ProjectMeta, Type,
    TypeKind,
};

// Re-export filesystem utilities
pub use fs_utils::{atomic_rename, normalize_path};

// Re-export path resolution utilities
pub use paths::{canonicalize_path, ensure_directory, resolve_path, resolve_path_or_cwd};

// Re-export git delta primitives
pub use git::{get_changed_files, get_commit_changed_files, ChangeType, ChangedFile};
