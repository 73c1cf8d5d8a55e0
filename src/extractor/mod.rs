//! AST Extractor (C2, spec §4.2)
//!
//! Parses one file with a language-specific grammar, emits File-scoped
//! entities (functions, types, imports, intra-file call edges) and queues
//! cross-file candidates as [`crate::schema::UnresolvedCall`] for C3.

pub mod grammar;
pub mod proto;
pub mod simplified;
pub mod treesitter;

use crate::lang::{Lang, ParserMode};
use crate::schema::{
    CallEdge, DefinesEdge, DefinesTypeEdge, FieldInfo, Function, Import, InterfaceMethods, Type, UnresolvedCall,
};

/// Everything one file contributes to the graph, before cross-file
/// resolution.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub functions: Vec<Function>,
    pub types: Vec<Type>,
    pub defines: Vec<DefinesEdge>,
    pub defines_types: Vec<DefinesTypeEdge>,
    pub calls: Vec<CallEdge>,
    pub imports: Vec<Import>,
    pub unresolved_calls: Vec<UnresolvedCall>,
    /// Struct/class fields observed in this file (spec §9 implements[]
    /// derivation input).
    pub fields: Vec<FieldInfo>,
    /// Interface types declared in this file, with their required method
    /// names (spec §9 implements[] derivation input).
    pub interface_methods: Vec<InterfaceMethods>,
    pub package_name: String,
    pub code_text_truncated: usize,
    /// Parsing could not proceed at all (missing grammar, parser init
    /// failure); the caller should count this file as a parse error and
    /// continue, not abort the run (spec §4.2 failure semantics).
    pub parse_error: bool,
}

/// Dispatch by `lang`'s [`ParserMode`] to the tree-sitter, simplified, or
/// protobuf walker.
pub fn parse_file(relative_path: &str, content: &str, lang: Lang, code_text_cap: usize) -> ParseResult {
    match lang.parser_mode() {
        ParserMode::TreeSitter => treesitter::parse(relative_path, content, lang, code_text_cap),
        ParserMode::Simplified => simplified::parse(relative_path, content, lang, code_text_cap),
        ParserMode::Proto => proto::parse(relative_path, content, code_text_cap),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_dispatches_by_parser_mode() {
        let result = parse_file("main.go", "package main\n\nfunc Run() {}\n", Lang::Go, 10_000);
        assert!(!result.parse_error);
        assert_eq!(result.functions.len(), 1);
    }

    #[test]
    fn test_parse_file_simplified_dispatch() {
        let result = parse_file("main.rb", "def run\nend\n", Lang::Ruby, 10_000);
        assert!(!result.parse_error);
    }

    #[test]
    fn test_parse_file_proto_dispatch() {
        let result = parse_file("svc.proto", "service Foo {\n  rpc Bar (In) returns (Out);\n}\n", Lang::Proto, 10_000);
        assert!(!result.parse_error);
        assert_eq!(result.functions.len(), 1);
    }
}
