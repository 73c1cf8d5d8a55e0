//! Deterministic entity id helpers (spec §3)
//!
//! Every entity id is `"<prefix>:" + hex(sha256(fields joined by '|'))`. The
//! joined-field convention keeps id derivation visible at call sites instead
//! of hiding it behind per-entity constructors that could drift out of sync
//! with the invariants in spec §3 (signature NOT in the function id, range
//! IS in it).

use sha2::{Digest, Sha256};

/// Hex-encode the SHA-256 digest of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize a repo-relative path for hashing: forward slashes, no leading
/// `./`, no trailing slash. Re-parsing the same file under the same path
/// must always hash identically (P1).
pub fn normalize_relative_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let trimmed = replaced
        .trim_start_matches("./")
        .trim_end_matches('/')
        .to_string();
    trimmed
}

/// `file:` id — content hash, language, and size are NOT part of identity;
/// only the normalized path determines it (spec §3: "One per distinct repo
/// path").
pub fn file_id(relative_path: &str) -> String {
    format!("file:{}", sha256_hex(&normalize_relative_path(relative_path)))
}

/// `func:` id. Signature is deliberately excluded; the four range
/// coordinates are included so that distinct overloads at distinct
/// positions remain distinct (P2, P3 per spec §3).
#[allow(clippy::too_many_arguments)]
pub fn function_id(
    relative_path: &str,
    name: &str,
    start_line: usize,
    end_line: usize,
    start_col: usize,
    end_col: usize,
) -> String {
    let key = format!(
        "{}|{}|{}|{}|{}|{}",
        normalize_relative_path(relative_path),
        name,
        start_line,
        end_line,
        start_col,
        end_col
    );
    format!("func:{}", sha256_hex(&key))
}

/// `func:ext:` id for a synthetic external stub function (spec §4.3 item 3).
pub fn external_stub_id(type_dot_method: &str) -> String {
    format!("func:ext:{}", sha256_hex(type_dot_method))
}

/// `type:` id.
pub fn type_id(relative_path: &str, name: &str, start_line: usize, end_line: usize) -> String {
    let key = format!(
        "{}|{}|{}|{}",
        normalize_relative_path(relative_path),
        name,
        start_line,
        end_line
    );
    format!("type:{}", sha256_hex(&key))
}

/// `def:` edge id (File -> Function), and analogously DefinesType.
pub fn defines_edge_id(file_id: &str, function_id: &str) -> String {
    format!("def:{}|{}", file_id, function_id)
}

pub fn defines_type_edge_id(file_id: &str, type_id: &str) -> String {
    format!("deftype:{}|{}", file_id, type_id)
}

/// `call:` edge id (Function -> Function).
pub fn calls_edge_id(caller_id: &str, callee_id: &str) -> String {
    format!("call:{}|{}", caller_id, callee_id)
}

/// `import:` id: one per (file, line) since a file may import the same path
/// twice under different aliases.
pub fn import_id(relative_path: &str, import_path: &str, start_line: usize) -> String {
    let key = format!(
        "{}|{}|{}",
        normalize_relative_path(relative_path),
        import_path,
        start_line
    );
    format!("import:{}", sha256_hex(&key))
}

/// Deterministic content digest used as `File.hash`.
pub fn content_hash(content: &str) -> String {
    sha256_hex(content)
}

/// `run_id = hex(sha256("run-" + project_id + "-" + epoch_seconds))[:32]` (spec §4.7).
pub fn run_id(project_id: &str, epoch_seconds: u64) -> String {
    let full = sha256_hex(&format!("run-{}-{}", project_id, epoch_seconds));
    full[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_stable() {
        let a = file_id("src/main.rs");
        let b = file_id("./src/main.rs");
        assert_eq!(a, b, "leading ./ must not change the id");
        assert!(a.starts_with("file:"));
    }

    #[test]
    fn test_function_id_ignores_signature() {
        // P2: signature text never feeds the id, only path/name/range.
        let id1 = function_id("pkg/foo.go", "Foo", 10, 15, 1, 20);
        let id2 = function_id("pkg/foo.go", "Foo", 10, 15, 1, 20);
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_function_id_distinguishes_overloads_by_range() {
        let a = function_id("pkg/foo.go", "Foo", 10, 15, 1, 20);
        let b = function_id("pkg/foo.go", "Foo", 20, 25, 1, 20);
        assert_ne!(a, b);
    }

    #[test]
    fn test_calls_edge_id_directional() {
        let ab = calls_edge_id("func:a", "func:b");
        let ba = calls_edge_id("func:b", "func:a");
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_run_id_length() {
        let id = run_id("proj", 1_700_000_000);
        assert_eq!(id.len(), 32);
    }
}
