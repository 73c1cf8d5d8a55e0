//! Datalog emission and batching (C5, spec §4.5)

pub mod batcher;
pub mod emitter;
pub mod splitter;

pub use batcher::batch;
pub use emitter::{emit_script, EmitInput};
pub use splitter::split_statements;

use crate::error::Result;

/// Render `input` to a full script, split it into statements, then batch
/// them per `target_mutations`/`max_batch_bytes`. This is the single
/// entry point the orchestrator calls after C2/C3/C4 have populated an
/// [`EmitInput`].
pub fn build_batches(
    input: &EmitInput<'_>,
    target_mutations: usize,
    max_batch_bytes: usize,
) -> Result<Vec<String>> {
    let script = emit_script(input);
    let statements = split_statements(&script);
    batch(&statements, target_mutations, max_batch_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::File;

    #[test]
    fn test_build_batches_end_to_end() {
        let files: Vec<File> = (0..3)
            .map(|i| File {
                id: format!("file:{i}"),
                path: format!("src/f{i}.rs"),
                hash: "h".to_string(),
                language: "rust".to_string(),
                size: 10,
            })
            .collect();
        let refs: Vec<&File> = files.iter().collect();
        let input = EmitInput {
            files: refs,
            ..Default::default()
        };
        let batches = build_batches(&input, 2, 1_000_000).unwrap();
        assert_eq!(batches.len(), 2);
    }
}
