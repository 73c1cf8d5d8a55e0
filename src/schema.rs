//! Entity data model for the code intelligence graph (spec §3)
//!
//! All identifiers are deterministic strings produced by [`crate::id`].
//! Equality of an id implies re-upsert, never duplication.

use serde::{Deserialize, Serialize};

/// A source file within the ingested repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub path: String,
    pub hash: String,
    pub language: String,
    pub size: u64,
}

/// A function, method, or synthesized anonymous-function entity.
///
/// `name` for methods is `ReceiverType.MethodName` (no generic parameters).
/// `signature` is deliberately excluded from `id` (see [`crate::id::function_id`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub id: String,
    pub name: String,
    pub signature: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_text: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

/// Declared kind of a [`Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Struct,
    Interface,
    Class,
    TypeAlias,
    Enum,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Class => "class",
            Self::TypeAlias => "type_alias",
            Self::Enum => "enum",
        }
    }
}

/// A struct/class/interface/type-alias/enum declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Type {
    pub id: String,
    pub name: String,
    pub kind: TypeKind,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_text: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
}

/// How an import name enters a file's resolution scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportAlias {
    /// Ordinary named or aliased import.
    Named(String),
    /// Dot import: names are injected into the current scope unqualified.
    Dot,
    /// Blank import: side-effect only, ignored for resolution.
    Blank,
}

impl ImportAlias {
    /// Parse the raw alias text per spec §3 (`"" | "." | "_" | <name>`).
    pub fn parse(raw: &str, import_path: &str) -> Self {
        match raw {
            "." => Self::Dot,
            "_" => Self::Blank,
            "" => Self::Named(default_alias(import_path)),
            other => Self::Named(other.to_string()),
        }
    }
}

fn default_alias(import_path: &str) -> String {
    import_path
        .rsplit('/')
        .next()
        .unwrap_or(import_path)
        .to_string()
}

/// A single import statement in a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub id: String,
    pub file_path: String,
    pub import_path: String,
    pub alias: ImportAlias,
    pub start_line: usize,
}

/// File → Function edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinesEdge {
    pub id: String,
    pub file_id: String,
    pub function_id: String,
}

/// File → Type edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinesTypeEdge {
    pub id: String,
    pub file_id: String,
    pub type_id: String,
}

/// Function → Function call edge. Self-edges are suppressed and duplicates
/// within a run are deduplicated (spec §3 invariants, P8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdge {
    pub id: String,
    pub caller_id: String,
    pub callee_id: String,
}

/// A unit-norm embedding vector attached to a Function or Type id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub entity_id: String,
    pub vector: Vec<f32>,
}

impl Embedding {
    /// L2 norm of `vector`. An empty vector (embedding failed) has norm 0
    /// and is exempt from the unit-norm invariant (spec §3 invariant 4).
    pub fn norm(&self) -> f32 {
        self.vector.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }
}

/// Upsertable per-project marker enabling incremental runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub project_id: String,
    pub last_indexed_sha: String,
    pub last_committed_index: u64,
    /// Integer seconds; see SPEC_FULL.md Open Questions on sub-second precision.
    pub updated_at: i64,
}

/// A syntactic call whose callee could not be identified inside the file it
/// was found in; queued for resolution by C3.
#[derive(Debug, Clone)]
pub struct UnresolvedCall {
    pub caller_id: String,
    pub callee_name: String,
    pub file_path: String,
    pub line: usize,
}

/// A struct/class field, as C2 observes it. Tracked by name only (not by
/// owning type); feeds [`crate::resolver::Resolver`]'s field-dispatch
/// priority.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub field_name: String,
    pub field_type: String,
}

/// Concrete type -> interface it structurally implements (spec §4.3
/// inputs, §9 structural-subtyping derivation).
#[derive(Debug, Clone)]
pub struct ImplementsEdge {
    pub concrete_type: String,
    pub interface_type: String,
}

/// An interface type's required method names as declared in source — the
/// raw material C3 matches against concrete types' method sets to derive
/// [`ImplementsEdge`]s in languages with no explicit `implements` keyword.
#[derive(Debug, Clone)]
pub struct InterfaceMethods {
    pub interface_name: String,
    pub methods: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_alias_parse() {
        assert_eq!(ImportAlias::parse(".", "fmt"), ImportAlias::Dot);
        assert_eq!(ImportAlias::parse("_", "fmt"), ImportAlias::Blank);
        assert_eq!(
            ImportAlias::parse("", "pkg/fmt"),
            ImportAlias::Named("fmt".to_string())
        );
        assert_eq!(
            ImportAlias::parse("f", "pkg/fmt"),
            ImportAlias::Named("f".to_string())
        );
    }

    #[test]
    fn test_embedding_norm_empty() {
        let e = Embedding {
            entity_id: "func:x".to_string(),
            vector: vec![],
        };
        assert_eq!(e.norm(), 0.0);
        assert!(e.is_empty());
    }

    #[test]
    fn test_embedding_norm_unit() {
        let e = Embedding {
            entity_id: "func:x".to_string(),
            vector: vec![0.6, 0.8],
        };
        assert!((e.norm() - 1.0).abs() < 1e-6);
    }
}
