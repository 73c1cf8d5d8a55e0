//! Checkpointer (C6, spec §4.6): a JSON document recording run progress so
//! an interrupted ingestion can resume instead of starting over.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::config::ResumePolicy;
use crate::error::{CieError, Result};
use crate::fs_utils::atomic_rename;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub project_id: String,
    #[serde(default)]
    pub last_processed_file: Option<String>,
    #[serde(default)]
    pub last_committed_index: usize,
    #[serde(default)]
    pub files_processed: usize,
    #[serde(default)]
    pub functions_extracted: usize,
    #[serde(default)]
    pub batches_sent: usize,
    #[serde(default)]
    pub entities_sent: HashMap<String, usize>,
    #[serde(default)]
    pub sent_batch_request_ids: HashMap<String, bool>,
    #[serde(default)]
    pub file_hashes: HashMap<String, String>,
    #[serde(default)]
    pub datalog_script: Option<String>,
    #[serde(default)]
    pub batches: Option<Vec<String>>,
    pub start_time: i64,
    pub last_update_time: i64,
}

impl Checkpoint {
    pub fn new(project_id: impl Into<String>, now: i64) -> Self {
        Checkpoint {
            project_id: project_id.into(),
            last_processed_file: None,
            last_committed_index: 0,
            files_processed: 0,
            functions_extracted: 0,
            batches_sent: 0,
            entities_sent: HashMap::new(),
            sent_batch_request_ids: HashMap::new(),
            file_hashes: HashMap::new(),
            datalog_script: None,
            batches: None,
            start_time: now,
            last_update_time: now,
        }
    }

    /// Load a checkpoint from `path`, returning `None` if it doesn't
    /// exist. Missing map fields default to empty on load so older
    /// checkpoint documents remain loadable.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&content)?;
        Ok(Some(checkpoint))
    }

    /// Write atomically: serialize to a sibling `.tmp` file, set mode
    /// 0600 on Unix, then rename over `path`. The tmp file is removed on
    /// a best-effort basis if the rename itself fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp_path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(&tmp_path) {
                let mut perms = metadata.permissions();
                perms.set_mode(0o600);
                let _ = std::fs::set_permissions(&tmp_path, perms);
            }
        }

        if let Err(e) = atomic_rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(CieError::Io(e));
        }
        Ok(())
    }

    pub fn record_file(&mut self, file_path: &str, hash: &str) {
        self.file_hashes.insert(file_path.to_string(), hash.to_string());
        self.last_processed_file = Some(file_path.to_string());
        self.files_processed += 1;
    }

    pub fn record_batch_sent(&mut self, request_id: &str, entity_kind: &str, count: usize) {
        self.sent_batch_request_ids.insert(request_id.to_string(), true);
        *self.entities_sent.entry(entity_kind.to_string()).or_insert(0) += count;
        self.batches_sent += 1;
    }

    pub fn was_batch_sent(&self, request_id: &str) -> bool {
        self.sent_batch_request_ids.get(request_id).copied().unwrap_or(false)
    }

    pub fn file_unchanged(&self, file_path: &str, hash: &str) -> bool {
        self.file_hashes.get(file_path).map(|h| h == hash).unwrap_or(false)
    }
}

/// Resolve the effective starting checkpoint for a run given `policy`
/// (spec §4.6 resume policies). `backend` is only consulted by
/// `FailFast`, which cross-checks the checkpoint's claimed progress
/// against the backend's own record of it before trusting the file.
pub fn resolve_start(
    path: &Path,
    project_id: &str,
    now: i64,
    policy: ResumePolicy,
    backend: &dyn Backend,
) -> Result<Checkpoint> {
    match policy {
        ResumePolicy::ForceReprocess => Ok(Checkpoint::new(project_id, now)),
        ResumePolicy::TrustCheckpoint => match Checkpoint::load(path) {
            Ok(Some(checkpoint)) => Ok(checkpoint),
            Ok(None) => Ok(Checkpoint::new(project_id, now)),
            Err(_) => Ok(Checkpoint::new(project_id, now)),
        },
        ResumePolicy::FailFast => {
            let checkpoint = match Checkpoint::load(path)? {
                Some(checkpoint) => checkpoint,
                None => return Ok(Checkpoint::new(project_id, now)),
            };
            verify_against_replication_log(&checkpoint, project_id, backend)?;
            Ok(checkpoint)
        }
    }
}

/// Cross-check `sent_batch_request_ids`/`last_committed_index` against
/// `cie_project_meta`, the backend's own record of what it has actually
/// committed for this project (spec §4.6: "cross-check ... against
/// server replication log; abort if mismatch"). A project the backend
/// has never seen has nothing to mismatch against.
fn verify_against_replication_log(checkpoint: &Checkpoint, project_id: &str, backend: &dyn Backend) -> Result<()> {
    let script =
        format!("?[idx] := *cie_project_meta{{project_id: '{project_id}', last_committed_index: idx}}");
    let rows = backend.query(&script)?;
    let Some(row) = rows.first() else {
        return Ok(());
    };
    let server_index = row.first().and_then(|v| v.as_i64()).unwrap_or(0) as usize;
    if server_index != checkpoint.last_committed_index {
        return Err(CieError::Checkpoint {
            message: format!(
                "checkpoint claims last_committed_index={} but backend replication log shows {}; refusing to resume under fail_fast",
                checkpoint.last_committed_index, server_index
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    #[test]
    fn test_save_and_load_roundtrips() {
        let dir = std::env::temp_dir().join(format!("cie_checkpoint_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checkpoint.json");

        let mut checkpoint = Checkpoint::new("proj1", 1000);
        checkpoint.record_file("a.go", "hash1");
        checkpoint.record_batch_sent("req1", "functions", 3);
        checkpoint.save(&path).unwrap();

        let loaded = Checkpoint::load(&path).unwrap().unwrap();
        assert_eq!(loaded.project_id, "proj1");
        assert_eq!(loaded.files_processed, 1);
        assert!(loaded.was_batch_sent("req1"));
        assert_eq!(loaded.entities_sent.get("functions"), Some(&3));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_missing_returns_none() {
        let path = Path::new("/nonexistent/does/not/exist/checkpoint.json");
        assert!(Checkpoint::load(path).unwrap().is_none());
    }

    #[test]
    fn test_force_reprocess_ignores_existing_checkpoint() {
        let dir = std::env::temp_dir().join(format!("cie_checkpoint_force_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checkpoint.json");

        let mut checkpoint = Checkpoint::new("proj1", 1000);
        checkpoint.record_file("a.go", "hash1");
        checkpoint.save(&path).unwrap();

        let backend = InMemoryBackend::new();
        let resumed = resolve_start(&path, "proj1", 2000, ResumePolicy::ForceReprocess, &backend).unwrap();
        assert_eq!(resumed.files_processed, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_unchanged_detects_matching_hash() {
        let mut checkpoint = Checkpoint::new("proj1", 1000);
        checkpoint.record_file("a.go", "hash1");
        assert!(checkpoint.file_unchanged("a.go", "hash1"));
        assert!(!checkpoint.file_unchanged("a.go", "hash2"));
        assert!(!checkpoint.file_unchanged("b.go", "hash1"));
    }

    #[test]
    fn test_fail_fast_passes_when_backend_has_no_record() {
        let dir = std::env::temp_dir().join(format!("cie_checkpoint_failfast_new_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checkpoint.json");

        let mut checkpoint = Checkpoint::new("proj1", 1000);
        checkpoint.record_batch_sent("req1", "functions", 3);
        checkpoint.last_committed_index = 1;
        checkpoint.save(&path).unwrap();

        let backend = InMemoryBackend::new();
        let resumed = resolve_start(&path, "proj1", 2000, ResumePolicy::FailFast, &backend).unwrap();
        assert_eq!(resumed.last_committed_index, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_fail_fast_aborts_on_mismatch_with_replication_log() {
        let dir = std::env::temp_dir().join(format!("cie_checkpoint_failfast_mismatch_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checkpoint.json");

        let mut checkpoint = Checkpoint::new("proj1", 1000);
        checkpoint.last_committed_index = 5;
        checkpoint.save(&path).unwrap();

        let backend = InMemoryBackend::new();
        backend.set_query_rows(vec![vec![serde_json::json!(1)]]);

        let result = resolve_start(&path, "proj1", 2000, ResumePolicy::FailFast, &backend);
        assert!(result.is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
