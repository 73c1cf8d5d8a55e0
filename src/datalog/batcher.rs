//! Batcher (spec §4.5, P4, S2)
//!
//! Groups already-split statements into batches bounded by a mutation
//! count and a byte budget, joining each batch with `\n\n` (and a
//! trailing newline) the same way the script was originally assembled.

use crate::error::{CieError, Result};

const JOINER: &str = "\n\n";
const PREVIEW_LEN: usize = 120;

/// `Batch(statements, targetMutations, maxBatchBytes) -> batches[]`.
///
/// Each batch holds at most `target_mutations` statements and is at most
/// `max_batch_bytes` bytes, counting the `"\n\n"` joiner between
/// statements and a trailing newline. A single statement that alone
/// exceeds `max_batch_bytes` is a hard error, not a degenerate
/// single-statement batch.
pub fn batch(statements: &[String], target_mutations: usize, max_batch_bytes: usize) -> Result<Vec<String>> {
    let mut batches = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_bytes: usize = 0;

    for stmt in statements {
        let stmt_bytes = stmt.len();

        if stmt_bytes + 1 > max_batch_bytes {
            return Err(CieError::BatchOversize {
                len: stmt_bytes,
                max: max_batch_bytes,
                preview: preview(stmt),
            });
        }

        let projected_bytes = if current.is_empty() {
            stmt_bytes + 1
        } else {
            current_bytes + JOINER.len() + stmt_bytes + 1
        };

        let would_exceed_count = current.len() + 1 > target_mutations;
        let would_exceed_bytes = projected_bytes > max_batch_bytes;

        if !current.is_empty() && (would_exceed_count || would_exceed_bytes) {
            batches.push(finish_batch(&current));
            current.clear();
            current_bytes = 0;
        }

        if current.is_empty() {
            current_bytes = stmt_bytes + 1;
        } else {
            current_bytes += JOINER.len() + stmt_bytes;
        }
        current.push(stmt.as_str());
    }

    if !current.is_empty() {
        batches.push(finish_batch(&current));
    }

    Ok(batches)
}

fn finish_batch(statements: &[&str]) -> String {
    let mut out = statements.join(JOINER);
    out.push('\n');
    out
}

fn preview(stmt: &str) -> String {
    if stmt.chars().count() <= PREVIEW_LEN {
        stmt.to_string()
    } else {
        let truncated: String = stmt.chars().take(PREVIEW_LEN).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_respects_target_mutations() {
        let statements: Vec<String> = (0..5).map(|i| format!("{{ s{i} }}")).collect();
        let batches = batch(&statements, 2, 1_000_000).unwrap();
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_batch_respects_max_bytes() {
        let statements: Vec<String> = vec!["a".repeat(40), "b".repeat(40), "c".repeat(40)];
        let batches = batch(&statements, 1000, 45).unwrap();
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_s2_oversize_statement_errors_with_preview() {
        let statements = vec!["x".repeat(250)];
        let err = batch(&statements, 1000, 100).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exceeds max size"));
    }

    #[test]
    fn test_p4_batches_stay_within_bounds() {
        let statements: Vec<String> = (0..50).map(|i| format!("{{ stmt number {i} }}")).collect();
        let target_mutations = 7;
        let max_bytes = 200;
        let batches = batch(&statements, target_mutations, max_bytes).unwrap();
        for b in &batches {
            assert!(b.len() <= max_bytes);
            let count = b.trim_end().split("\n\n").count();
            assert!(count <= target_mutations);
        }
        let total: usize = batches
            .iter()
            .map(|b| b.trim_end().split("\n\n").count())
            .sum();
        assert_eq!(total, statements.len());
    }

    #[test]
    fn test_empty_input_yields_no_batches() {
        let batches = batch(&[], 10, 1000).unwrap();
        assert!(batches.is_empty());
    }
}
