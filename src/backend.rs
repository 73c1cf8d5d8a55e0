//! Backend (spec §6): the Datalog store the pipeline writes batches into.
//!
//! `Backend` is deliberately thin — `Query`/`Execute`/`Close` — so the
//! orchestrator never depends on CozoDB specifics directly.

use cozo::{DataValue, DbInstance, NamedRows, ScriptMutability};

use crate::datalog::splitter::split_statements;
use crate::error::{CieError, Result};

/// One query/mutation result row, as a loosely-typed JSON-ish value per
/// column.
pub type Row = Vec<serde_json::Value>;

pub trait Backend: Send + Sync {
    /// Run a read-only Datalog query and return its rows.
    fn query(&self, script: &str) -> Result<Vec<Row>>;

    /// Run a Datalog script with mutations (`:put`/`:rm`/`:create`).
    fn execute(&self, script: &str) -> Result<()>;

    /// Release any resources (file handles, connections) held by this
    /// backend.
    fn close(&self) -> Result<()>;
}

/// Relations whose `vector` column carries embeddings, and therefore need
/// an HNSW index sized to the run's actual embedding dimension (spec §6).
const EMBEDDING_RELATIONS: [&str; 2] = ["cie_function_embedding", "cie_type_embedding"];

/// The `:create` statements for every relation this pipeline writes,
/// matching the Datalog emitter's fixed relation names and column order.
/// `dim` is the active embedding provider's vector width; `cie_*_embedding`
/// are fixed-width `<F32; dim>` so Cozo rejects a write with the wrong
/// dimension instead of silently truncating it.
fn schema_script(dim: usize) -> String {
    format!(
        r#"
:create cie_file {{ id: String => path: String, hash: String, language: String, size: Int }}
:create cie_function {{ id: String => name: String, signature: String, file_path: String, start_line: Int, end_line: Int, start_col: Int, end_col: Int }}
:create cie_function_code {{ id: String => code_text: String }}
:create cie_function_embedding {{ id: String => vector: <F32; {dim}> }}
:create cie_type {{ id: String => name: String, kind: String, file_path: String, start_line: Int, end_line: Int }}
:create cie_type_code {{ id: String => code_text: String }}
:create cie_type_embedding {{ id: String => vector: <F32; {dim}> }}
:create cie_defines {{ id: String => file_id: String, function_id: String }}
:create cie_defines_type {{ id: String => file_id: String, type_id: String }}
:create cie_calls {{ id: String => caller_id: String, callee_id: String }}
:create cie_import {{ id: String => file_path: String, import_path: String, alias: String, start_line: Int }}
:create cie_project_meta {{ project_id: String => last_indexed_sha: String, last_committed_index: Int, updated_at: Int }}
"#
    )
}

/// CozoDB-backed implementation, embedded in-process via the storage
/// engine named by `engine` (`"mem"`, `"sqlite"`, `"rocksdb"`).
pub struct CozoBackend {
    db: DbInstance,
}

impl CozoBackend {
    pub fn open(engine: &str, path: &str) -> Result<Self> {
        let db = DbInstance::new(engine, path, Default::default())
            .map_err(|e| CieError::BackendWrite { message: format!("failed to open cozo db: {e}") })?;
        Ok(CozoBackend { db })
    }

    /// Initialize the schema for `dim`-wide embedding vectors, swallowing
    /// "already exists" errors so this is safe to call at the start of
    /// every run (spec §6 idempotent schema init). Also creates an HNSW
    /// index over each `*_embedding` relation, sized to the same `dim`.
    pub fn ensure_schema(&self, dim: usize) -> Result<()> {
        for statement in split_statements(&schema_script(dim)) {
            if let Err(e) = self.run_mutable(&statement) {
                let message = e.to_string();
                if message.to_lowercase().contains("already exists") {
                    continue;
                }
                return Err(e);
            }
        }

        for relation in EMBEDDING_RELATIONS {
            let stmt = format!(
                "::hnsw create {relation}:hnsw_idx {{ dim: {dim}, m: 32, ef_construction: 100, fields: [vector], distance: Cosine }}"
            );
            if let Err(e) = self.run_mutable(&stmt) {
                let message = e.to_string();
                if message.to_lowercase().contains("already exists") {
                    continue;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn run_mutable(&self, script: &str) -> Result<NamedRows> {
        self.db
            .run_script(script, Default::default(), ScriptMutability::Mutable)
            .map_err(|e| CieError::BackendWrite { message: e.to_string() })
    }
}

impl Backend for CozoBackend {
    fn query(&self, script: &str) -> Result<Vec<Row>> {
        let result = self
            .db
            .run_script(script, Default::default(), ScriptMutability::Immutable)
            .map_err(|e| CieError::BackendWrite { message: e.to_string() })?;
        Ok(result.rows.into_iter().map(|row| row.into_iter().map(data_value_to_json).collect()).collect())
    }

    fn execute(&self, script: &str) -> Result<()> {
        self.run_mutable(script)?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn data_value_to_json(value: DataValue) -> serde_json::Value {
    match value {
        DataValue::Null => serde_json::Value::Null,
        DataValue::Bool(b) => serde_json::Value::Bool(b),
        DataValue::Num(n) => serde_json::json!(n.get_float()),
        DataValue::Str(s) => serde_json::Value::String(s.to_string()),
        other => serde_json::Value::String(format!("{other:?}")),
    }
}

/// An in-process fake used by orchestrator/integration tests, tracking
/// statements passed to `execute` without validating Datalog syntax.
/// `query` doesn't interpret `script` at all — it just returns whatever
/// rows were last handed to `set_query_rows`, so callers that need a
/// specific query result (e.g. a checkpoint cross-check) can stage it.
#[cfg(test)]
pub struct InMemoryBackend {
    pub executed: std::sync::Mutex<Vec<String>>,
    query_rows: std::sync::Mutex<Vec<Row>>,
}

#[cfg(test)]
impl InMemoryBackend {
    pub fn new() -> Self {
        InMemoryBackend { executed: std::sync::Mutex::new(Vec::new()), query_rows: std::sync::Mutex::new(Vec::new()) }
    }

    pub fn set_query_rows(&self, rows: Vec<Row>) {
        *self.query_rows.lock().unwrap() = rows;
    }
}

#[cfg(test)]
impl Backend for InMemoryBackend {
    fn query(&self, _script: &str) -> Result<Vec<Row>> {
        Ok(self.query_rows.lock().unwrap().clone())
    }

    fn execute(&self, script: &str) -> Result<()> {
        self.executed.lock().unwrap().push(script.to_string());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_backend_records_executed_scripts() {
        let backend = InMemoryBackend::new();
        backend.execute("{ ?[id] <- [['x']] :put cie_file { id } }").unwrap();
        assert_eq!(backend.executed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cozo_backend_schema_is_idempotent() {
        let backend = CozoBackend::open("mem", "").unwrap();
        backend.ensure_schema(8).unwrap();
        backend.ensure_schema(8).unwrap();
    }

    #[test]
    fn test_cozo_backend_put_and_query_roundtrip() {
        let backend = CozoBackend::open("mem", "").unwrap();
        backend.ensure_schema(8).unwrap();
        backend
            .execute("{ ?[id, path, hash, language, size] <- [['file:1', 'a.go', 'h', 'go', 10]] :put cie_file { id => path, hash, language, size } }")
            .unwrap();
        let rows = backend.query("?[id] := *cie_file{id}").unwrap();
        assert_eq!(rows.len(), 1);
    }
}
