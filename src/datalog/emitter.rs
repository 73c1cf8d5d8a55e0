//! Datalog emitter (spec §4.5)
//!
//! Renders entities into CozoDB-style mutation statements: each statement
//! is `?[cols] <- [[...]] :put rel { ... }` (or `:replace`/`:rm`), wrapped
//! in `{ … }`. Mutations rely on `:put`/`:replace` semantics for
//! idempotency; the core never parses Datalog back, only emits it.

use crate::schema::{
    CallEdge, DefinesEdge, DefinesTypeEdge, Embedding, File, Function, Import, ProjectMeta, Type,
};

/// Escape a string for embedding in a single-quoted Datalog literal.
fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn put_file(f: &File) -> String {
    format!(
        "{{ ?[id, path, hash, language, size] <- [['{}', '{}', '{}', '{}', {}]] :put cie_file {{ id, path, hash, language, size }} }}",
        escape_str(&f.id), escape_str(&f.path), escape_str(&f.hash), escape_str(&f.language), f.size
    )
}

fn put_function(f: &Function) -> String {
    format!(
        "{{ ?[id, name, signature, file_path, start_line, end_line, start_col, end_col] <- [['{}', '{}', '{}', '{}', {}, {}, {}, {}]] :put cie_function {{ id, name, signature, file_path, start_line, end_line, start_col, end_col }} }}",
        escape_str(&f.id), escape_str(&f.name), escape_str(&f.signature), escape_str(&f.file_path),
        f.start_line, f.end_line, f.start_col, f.end_col
    )
}

fn put_function_code(id: &str, code_text: &str) -> String {
    format!(
        "{{ ?[id, code_text] <- [['{}', '{}']] :put cie_function_code {{ id, code_text }} }}",
        escape_str(id),
        escape_str(code_text)
    )
}

fn put_type(t: &Type) -> String {
    format!(
        "{{ ?[id, name, kind, file_path, start_line, end_line] <- [['{}', '{}', '{}', '{}', {}, {}]] :put cie_type {{ id, name, kind, file_path, start_line, end_line }} }}",
        escape_str(&t.id), escape_str(&t.name), t.kind.as_str(), escape_str(&t.file_path), t.start_line, t.end_line
    )
}

fn put_type_code(id: &str, code_text: &str) -> String {
    format!(
        "{{ ?[id, code_text] <- [['{}', '{}']] :put cie_type_code {{ id, code_text }} }}",
        escape_str(id),
        escape_str(code_text)
    )
}

fn put_import(i: &Import) -> String {
    let alias = match &i.alias {
        crate::schema::ImportAlias::Named(n) => n.clone(),
        crate::schema::ImportAlias::Dot => ".".to_string(),
        crate::schema::ImportAlias::Blank => "_".to_string(),
    };
    format!(
        "{{ ?[id, file_path, import_path, alias, start_line] <- [['{}', '{}', '{}', '{}', {}]] :put cie_import {{ id, file_path, import_path, alias, start_line }} }}",
        escape_str(&i.id), escape_str(&i.file_path), escape_str(&i.import_path), escape_str(&alias), i.start_line
    )
}

fn put_defines(d: &DefinesEdge) -> String {
    format!(
        "{{ ?[id, file_id, function_id] <- [['{}', '{}', '{}']] :put cie_defines {{ id, file_id, function_id }} }}",
        escape_str(&d.id), escape_str(&d.file_id), escape_str(&d.function_id)
    )
}

fn put_defines_type(d: &DefinesTypeEdge) -> String {
    format!(
        "{{ ?[id, file_id, type_id] <- [['{}', '{}', '{}']] :put cie_defines_type {{ id, file_id, type_id }} }}",
        escape_str(&d.id), escape_str(&d.file_id), escape_str(&d.type_id)
    )
}

fn put_calls(c: &CallEdge) -> String {
    format!(
        "{{ ?[id, caller_id, callee_id] <- [['{}', '{}', '{}']] :put cie_calls {{ id, caller_id, callee_id }} }}",
        escape_str(&c.id), escape_str(&c.caller_id), escape_str(&c.callee_id)
    )
}

fn put_function_embedding(e: &Embedding) -> String {
    let vec_literal = vector_literal(&e.vector);
    format!(
        "{{ ?[id, vector] <- [['{}', {}]] :put cie_function_embedding {{ id, vector }} }}",
        escape_str(&e.entity_id),
        vec_literal
    )
}

fn put_type_embedding(e: &Embedding) -> String {
    let vec_literal = vector_literal(&e.vector);
    format!(
        "{{ ?[id, vector] <- [['{}', {}]] :put cie_type_embedding {{ id, vector }} }}",
        escape_str(&e.entity_id),
        vec_literal
    )
}

fn vector_literal(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

fn put_project_meta(m: &ProjectMeta) -> String {
    format!(
        "{{ ?[project_id, last_indexed_sha, last_committed_index, updated_at] <- [['{}', '{}', {}, {}]] :put cie_project_meta {{ project_id, last_indexed_sha, last_committed_index, updated_at }} }}",
        escape_str(&m.project_id), escape_str(&m.last_indexed_sha), m.last_committed_index, m.updated_at
    )
}

fn rm_by_id(relation: &str, id: &str) -> String {
    format!("{{ ?[id] <- [['{}']] :rm {} {{ id }} }}", escape_str(id), relation)
}

/// Everything a single ingestion run needs to render, gathered from C2/C3/
/// C4 before going to C5.
#[derive(Debug, Default)]
pub struct EmitInput<'a> {
    pub files: Vec<&'a File>,
    pub functions: Vec<&'a Function>,
    pub types: Vec<&'a Type>,
    pub imports: Vec<&'a Import>,
    pub defines: Vec<&'a DefinesEdge>,
    pub defines_types: Vec<&'a DefinesTypeEdge>,
    pub calls: Vec<&'a CallEdge>,
    pub function_embeddings: Vec<&'a Embedding>,
    pub type_embeddings: Vec<&'a Embedding>,
    pub project_meta: Option<&'a ProjectMeta>,
    /// Ids to `:rm` (from a delta sweep, spec §3 lifecycle).
    pub removed_file_ids: Vec<String>,
    pub removed_function_ids: Vec<String>,
}

/// Render a full script as one `\n\n`-joined (but not yet batched) string.
pub fn emit_script(input: &EmitInput<'_>) -> String {
    let mut statements = Vec::new();

    for f in &input.files {
        statements.push(put_file(f));
    }
    for f in &input.functions {
        statements.push(put_function(f));
        if let Some(code) = &f.code_text {
            statements.push(put_function_code(&f.id, code));
        }
    }
    for t in &input.types {
        statements.push(put_type(t));
        if let Some(code) = &t.code_text {
            statements.push(put_type_code(&t.id, code));
        }
    }
    for i in &input.imports {
        statements.push(put_import(i));
    }
    for d in &input.defines {
        statements.push(put_defines(d));
    }
    for d in &input.defines_types {
        statements.push(put_defines_type(d));
    }
    for c in &input.calls {
        statements.push(put_calls(c));
    }
    for e in &input.function_embeddings {
        if !e.is_empty() {
            statements.push(put_function_embedding(e));
        }
    }
    for e in &input.type_embeddings {
        if !e.is_empty() {
            statements.push(put_type_embedding(e));
        }
    }
    if let Some(meta) = input.project_meta {
        statements.push(put_project_meta(meta));
    }
    for id in &input.removed_file_ids {
        statements.push(rm_by_id("cie_file", id));
    }
    for id in &input.removed_function_ids {
        statements.push(rm_by_id("cie_function", id));
    }

    statements.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeKind;

    #[test]
    fn test_escape_str_handles_quotes_and_backslashes() {
        assert_eq!(escape_str("a'b\\c"), "a\\'b\\\\c");
    }

    #[test]
    fn test_put_file_roundtrips_through_splitter() {
        let f = File {
            id: "file:abc".to_string(),
            path: "src/main.rs".to_string(),
            hash: "deadbeef".to_string(),
            language: "rust".to_string(),
            size: 42,
        };
        let stmt = put_file(&f);
        let split = crate::datalog::splitter::split_statements(&stmt);
        assert_eq!(split.len(), 1);
    }

    #[test]
    fn test_emit_script_skips_empty_embeddings() {
        let embedding = Embedding {
            entity_id: "func:x".to_string(),
            vector: vec![],
        };
        let input = EmitInput {
            function_embeddings: vec![&embedding],
            ..Default::default()
        };
        let script = emit_script(&input);
        assert!(script.is_empty());
    }

    #[test]
    fn test_put_type_uses_kind_as_str() {
        let t = Type {
            id: "type:x".to_string(),
            name: "Foo".to_string(),
            kind: TypeKind::Interface,
            file_path: "a.go".to_string(),
            code_text: None,
            start_line: 1,
            end_line: 2,
        };
        assert!(put_type(&t).contains("interface"));
    }
}
