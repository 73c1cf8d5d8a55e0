//! Generic tree-sitter walker (spec §4.2)
//!
//! One two-pass traversal drives every tree-sitter-backed language via the
//! node-kind tables in [`super::grammar`]. Pass one collects functions,
//! types, and imports and builds a same-file `name -> id` map; pass two
//! walks call expressions and classifies each against that map.

use std::collections::{HashMap, HashSet};

use tree_sitter::{Node, Parser};

use super::grammar::{self, Grammar};
use super::ParseResult;
use crate::id;
use crate::lang::{Lang, LangFamily};
use crate::resolver::strip_type_decorations;
use crate::schema::{
    DefinesEdge, DefinesTypeEdge, FieldInfo, Function, Import, ImportAlias, InterfaceMethods, Type, TypeKind,
    UnresolvedCall,
};

pub fn parse(relative_path: &str, content: &str, lang: Lang, code_text_cap: usize) -> ParseResult {
    let mut result = ParseResult::default();

    let Some(ts_lang) = lang.tree_sitter_language() else {
        result.parse_error = true;
        return result;
    };
    let Some(grammar) = grammar::for_lang(lang) else {
        result.parse_error = true;
        return result;
    };

    let mut parser = Parser::new();
    if parser.set_language(&ts_lang).is_err() {
        result.parse_error = true;
        return result;
    }
    let Some(tree) = parser.parse(content, None) else {
        result.parse_error = true;
        return result;
    };

    let root = tree.root_node();
    let file_id = id::file_id(relative_path);

    result.package_name = extract_package_name(&root, content, lang);

    let mut walker = Walker {
        grammar,
        lang,
        content,
        relative_path,
        file_id: &file_id,
        cap: code_text_cap,
        name_to_id: HashMap::new(),
        function_spans: Vec::new(),
        anon_counter: 0,
        arrow_counter: 0,
        lambda_counter: 0,
        result: &mut result,
    };
    walker.collect_pass(&root);
    walker.call_pass(&root);

    result
}

struct Walker<'a> {
    grammar: &'static Grammar,
    lang: Lang,
    content: &'a str,
    relative_path: &'a str,
    file_id: &'a str,
    cap: usize,
    name_to_id: HashMap<String, String>,
    function_spans: Vec<(String, usize, usize)>,
    anon_counter: usize,
    arrow_counter: usize,
    lambda_counter: usize,
    result: &'a mut ParseResult,
}

impl<'a> Walker<'a> {
    fn collect_pass(&mut self, root: &Node) {
        for_each_node(root, |node| {
            self.visit_function_like(&node);
            self.visit_type_like(&node);
            self.visit_import_like(&node);
        });
    }

    fn call_pass(&mut self, root: &Node) {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for_each_node(root, |node| {
            if self.grammar.call_nodes.contains(&node.kind()) {
                self.visit_call(&node, &mut seen);
            }
        });
    }

    fn visit_function_like(&mut self, node: &Node) {
        let kind = node.kind();
        let is_method = self.grammar.method_nodes.contains(&kind);
        let is_plain = self.grammar.function_nodes.contains(&kind);
        let is_bound = self.grammar.bound_closure_nodes.contains(&kind);
        let is_anon = self.grammar.anon_function_nodes.contains(&kind);

        if !is_method && !is_plain && !is_bound && !is_anon {
            return;
        }

        let name = if is_method {
            go_method_name(node, self.content)
        } else if is_plain {
            function_name(node, self.grammar, self.lang, self.content)
        } else if is_bound {
            bound_closure_name(node, self.content).or_else(|| Some(self.next_anon_name(kind)))
        } else {
            Some(self.next_anon_name(kind))
        };

        let Some(name) = name else { return };

        let start = node.start_position();
        let end = node.end_position();
        let fn_id = id::function_id(
            self.relative_path,
            &name,
            start.row + 1,
            end.row + 1,
            start.column,
            end.column,
        );

        self.name_to_id.entry(name.clone()).or_insert_with(|| fn_id.clone());
        self.function_spans.push((fn_id.clone(), node.start_byte(), node.end_byte()));

        let code_text = truncate(text(node, self.content).unwrap_or_default(), self.cap, &mut self.result.code_text_truncated);

        self.result.functions.push(Function {
            id: fn_id.clone(),
            name,
            signature: signature_text(node, self.content),
            file_path: self.relative_path.to_string(),
            code_text: Some(code_text),
            start_line: start.row + 1,
            end_line: end.row + 1,
            start_col: start.column,
            end_col: end.column,
        });
        self.result.defines.push(DefinesEdge {
            id: id::defines_edge_id(self.file_id, &fn_id),
            file_id: self.file_id.to_string(),
            function_id: fn_id,
        });
    }

    fn next_anon_name(&mut self, kind: &str) -> String {
        if kind.contains("arrow") {
            self.arrow_counter += 1;
            format!("$arrow_{}", self.arrow_counter)
        } else if kind.contains("lambda") {
            self.lambda_counter += 1;
            format!("$lambda_{}", self.lambda_counter)
        } else {
            self.anon_counter += 1;
            format!("$anon_{}", self.anon_counter)
        }
    }

    fn visit_type_like(&mut self, node: &Node) {
        let kind = node.kind();

        // Go structs/interfaces live inside `type_declaration > type_spec`,
        // not as their own top-level node kind.
        if self.lang == Lang::Go && kind == "type_declaration" {
            let mut cursor = node.walk();
            for spec in node.children(&mut cursor) {
                if spec.kind() != "type_spec" {
                    continue;
                }
                let Some(name_node) = spec.child_by_field_name("name") else { continue };
                let Some(name) = text(name_node, self.content) else { continue };
                let type_node = spec.child_by_field_name("type");
                let type_kind = type_node
                    .map(|t| match t.kind() {
                        "struct_type" => TypeKind::Struct,
                        "interface_type" => TypeKind::Interface,
                        _ => TypeKind::TypeAlias,
                    })
                    .unwrap_or(TypeKind::TypeAlias);

                match (type_kind, type_node) {
                    (TypeKind::Struct, Some(struct_node)) => self.collect_struct_fields(&struct_node),
                    (TypeKind::Interface, Some(iface_node)) => self.collect_interface_methods(&name, &iface_node),
                    _ => {}
                }

                self.emit_type(&spec, name, type_kind);
            }
            return;
        }

        if let Some(type_kind) = grammar::type_kind_for(self.grammar, kind) {
            let Some(name_node) = node.child_by_field_name(self.grammar.name_field) else { return };
            let Some(name) = text(name_node, self.content) else { return };
            self.emit_type(node, name, type_kind);
        }
    }

    fn emit_type(&mut self, node: &Node, name: String, kind: TypeKind) {
        let start = node.start_position();
        let end = node.end_position();
        let type_id = id::type_id(self.relative_path, &name, start.row + 1, end.row + 1);
        let code_text = truncate(text(node, self.content).unwrap_or_default(), self.cap, &mut self.result.code_text_truncated);

        self.result.types.push(Type {
            id: type_id.clone(),
            name,
            kind,
            file_path: self.relative_path.to_string(),
            code_text: Some(code_text),
            start_line: start.row + 1,
            end_line: end.row + 1,
        });
        self.result.defines_types.push(DefinesTypeEdge {
            id: id::defines_type_edge_id(self.file_id, &type_id),
            file_id: self.file_id.to_string(),
            type_id,
        });
    }

    /// Go `struct_type` field list -> [`FieldInfo`]s, feeding C3's
    /// field-dispatch priority (spec §4.3 inputs).
    fn collect_struct_fields(&mut self, struct_type: &Node) {
        let mut cursor = struct_type.walk();
        for field in struct_type.children(&mut cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let Some(type_node) = field.child_by_field_name("type") else { continue };
            let Some(raw_type) = text(type_node, self.content) else { continue };
            let field_type = strip_type_decorations(&raw_type);

            let mut field_cursor = field.walk();
            for child in field.children(&mut field_cursor) {
                if child.kind() == "field_identifier" {
                    if let Some(field_name) = text(child, self.content) {
                        self.result.fields.push(FieldInfo { field_name, field_type: field_type.clone() });
                    }
                }
            }
        }
    }

    /// Go `interface_type` method elements -> required method names for
    /// `derive_implements` (spec §9 structural-subtyping MUST).
    fn collect_interface_methods(&mut self, name: &str, interface_type: &Node) {
        let mut methods = Vec::new();
        let mut cursor = interface_type.walk();
        for elem in interface_type.children(&mut cursor) {
            if elem.kind() != "method_elem" {
                continue;
            }
            if let Some(method_name) = elem.child_by_field_name("name").and_then(|n| text(n, self.content)) {
                methods.push(method_name);
            }
        }
        if !methods.is_empty() {
            self.result.interface_methods.push(InterfaceMethods { interface_name: name.to_string(), methods });
        }
    }

    fn visit_import_like(&mut self, node: &Node) {
        if !self.grammar.import_nodes.contains(&node.kind()) {
            return;
        }
        if self.lang == Lang::Shell {
            // `command` doubles as call_nodes; only `source`/`.` commands
            // are imports, and distinguishing them needs a value lookup
            // this generic table doesn't carry. Skip rather than guess.
            return;
        }

        let Some((import_path, raw_alias)) = import_path_and_alias(node, self.lang, self.content) else {
            return;
        };
        if import_path.is_empty() {
            return;
        }

        let start = node.start_position();
        self.result.imports.push(Import {
            id: id::import_id(self.relative_path, &import_path, start.row + 1),
            file_path: self.relative_path.to_string(),
            import_path: import_path.clone(),
            alias: ImportAlias::parse(&raw_alias, &import_path),
            start_line: start.row + 1,
        });
    }

    fn visit_call(&mut self, node: &Node, seen: &mut HashSet<(String, String)>) {
        let Some(caller_id) = self.enclosing_function(node) else { return };
        let Some((callee, qualified)) = callee_text(node, self.lang, self.content) else { return };
        if callee.is_empty() {
            return;
        }
        let line = node.start_position().row + 1;

        if qualified {
            self.result.unresolved_calls.push(UnresolvedCall {
                caller_id,
                callee_name: callee,
                file_path: self.relative_path.to_string(),
                line,
            });
            return;
        }

        if let Some(callee_id) = self.name_to_id.get(&callee).cloned() {
            if callee_id == caller_id {
                return;
            }
            if seen.insert((caller_id.clone(), callee_id.clone())) {
                self.result.calls.push(crate::schema::CallEdge {
                    id: id::calls_edge_id(&caller_id, &callee_id),
                    caller_id,
                    callee_id,
                });
            }
        } else {
            self.result.unresolved_calls.push(UnresolvedCall {
                caller_id,
                callee_name: callee,
                file_path: self.relative_path.to_string(),
                line,
            });
        }
    }

    /// Innermost function whose byte range contains `node`.
    fn enclosing_function(&self, node: &Node) -> Option<String> {
        let (start, end) = (node.start_byte(), node.end_byte());
        self.function_spans
            .iter()
            .filter(|(_, s, e)| *s <= start && end <= *e)
            .min_by_key(|(_, s, e)| e - s)
            .map(|(id, _, _)| id.clone())
    }
}

fn go_method_name(node: &Node, content: &str) -> Option<String> {
    let name = text(node.child_by_field_name("name")?, content)?;
    let receiver_type = node.child_by_field_name("receiver").and_then(|params| {
        let mut cursor = params.walk();
        params
            .children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")
            .and_then(|p| p.child_by_field_name("type"))
            .and_then(|t| text(t, content))
    });
    match receiver_type {
        Some(rt) => Some(format!("{}.{}", rt.trim_start_matches('*'), name)),
        None => Some(name),
    }
}

fn function_name(node: &Node, grammar: &Grammar, lang: Lang, content: &str) -> Option<String> {
    if lang.family() == LangFamily::CFamily {
        let declarator = node.child_by_field_name("declarator")?;
        return find_identifier_descendant(&declarator, content);
    }
    text(node.child_by_field_name(grammar.name_field)?, content)
}

fn find_identifier_descendant(node: &Node, content: &str) -> Option<String> {
    if matches!(
        node.kind(),
        "identifier" | "field_identifier" | "destructor_name" | "qualified_identifier" | "operator_name"
    ) {
        return text(*node, content);
    }
    let child = node.child_by_field_name("declarator")?;
    find_identifier_descendant(&child, content)
}

fn bound_closure_name(node: &Node, content: &str) -> Option<String> {
    let parent = node.parent()?;
    match parent.kind() {
        "variable_declarator" => text(parent.child_by_field_name("name")?, content),
        "assignment_expression" => text(parent.child_by_field_name("left")?, content),
        "pair" => text(parent.child_by_field_name("key")?, content),
        "public_field_definition" | "field_definition" | "property_signature" => {
            text(parent.child_by_field_name("name")?, content)
                .or_else(|| text(parent.child_by_field_name("property")?, content))
        }
        _ => None,
    }
}

fn signature_text(node: &Node, content: &str) -> String {
    // Everything up to (not including) the body is the signature; when the
    // grammar has no distinguishable body field, fall back to the whole
    // node text on one line.
    if let Some(body) = node.child_by_field_name("body") {
        let sig_end = body.start_byte().saturating_sub(node.start_byte());
        let full = text(*node, content).unwrap_or_default();
        return normalize_ws(full.get(..sig_end).unwrap_or(&full));
    }
    normalize_ws(&text(*node, content).unwrap_or_default())
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `foo[T]()` and `pkg.Foo[T]()` collapse their generic-instantiation
/// brackets: `foo[T]` -> `foo`, `pkg.Foo[T]` -> `pkg.Foo` (spec §4.2).
fn strip_generic_brackets(s: &str) -> String {
    let mut out = String::new();
    let mut depth = 0;
    for c in s.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                if depth > 0 {
                    depth -= 1;
                }
            }
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn callee_text(node: &Node, lang: Lang, content: &str) -> Option<(String, bool)> {
    if lang.family() == LangFamily::Java {
        let name = text(node.child_by_field_name("name")?, content)?;
        return match node.child_by_field_name("object") {
            Some(obj) => Some((format!("{}.{}", text(obj, content)?, name), true)),
            None => Some((name, false)),
        };
    }
    if lang == Lang::Shell {
        let first = node.child(0)?;
        return Some((text(first, content)?, false));
    }
    let func_node = node.child_by_field_name("function")?;
    let raw = text(func_node, content)?;
    let stripped = strip_generic_brackets(&raw);
    let qualified = stripped.contains('.') || stripped.contains("::");
    Some((stripped, qualified))
}

fn import_path_and_alias(node: &Node, lang: Lang, content: &str) -> Option<(String, String)> {
    match lang {
        Lang::Go => {
            let path_node = node.child_by_field_name("path")?;
            let path = strip_quotes(&text(path_node, content)?);
            let alias = node
                .child_by_field_name("name")
                .and_then(|n| text(n, content))
                .unwrap_or_default();
            Some((path, alias))
        }
        Lang::JavaScript | Lang::TypeScript | Lang::Tsx => {
            let source = node.child_by_field_name("source")?;
            let path = strip_quotes(&text(source, content)?);
            let alias = node
                .child_by_field_name("import_clause")
                .and_then(|c| find_child_kind(&c, "identifier"))
                .and_then(|n| text(n, content))
                .unwrap_or_default();
            Some((path, alias))
        }
        Lang::Java => {
            let scoped = find_child_kind(node, "scoped_identifier")
                .or_else(|| find_child_kind(node, "identifier"))?;
            Some((text(scoped, content)?, String::new()))
        }
        Lang::Rust => {
            let raw = text(*node, content)?;
            let path = raw
                .trim_start_matches("pub")
                .trim()
                .trim_start_matches("use")
                .trim()
                .trim_end_matches(';')
                .to_string();
            if let Some(idx) = path.find(" as ") {
                let (before, after) = path.split_at(idx);
                Some((before.trim().to_string(), after.trim_start_matches(" as ").trim().to_string()))
            } else {
                Some((path, String::new()))
            }
        }
        Lang::C | Lang::Cpp => {
            let path_node = node.child_by_field_name("path")?;
            Some((strip_quotes(&text(path_node, content)?), String::new()))
        }
        Lang::CSharp => {
            let name = node.child_by_field_name("name")?;
            Some((text(name, content)?, String::new()))
        }
        Lang::Kotlin => {
            let name = find_child_kind(node, "identifier")?;
            Some((text(name, content)?, String::new()))
        }
        Lang::Python => {
            let raw = text(*node, content)?;
            Some((normalize_ws(&raw), String::new()))
        }
        _ => None,
    }
}

fn strip_quotes(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '<' || c == '>').to_string()
}

fn find_child_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn extract_package_name(root: &Node, content: &str, lang: Lang) -> String {
    match lang {
        Lang::Go => find_child_kind(root, "package_clause")
            .and_then(|pc| {
                find_child_kind(&pc, "package_identifier").and_then(|n| text(n, content))
            })
            .unwrap_or_default(),
        Lang::Java => find_child_kind(root, "package_declaration")
            .and_then(|pd| {
                find_child_kind(&pd, "scoped_identifier")
                    .or_else(|| find_child_kind(&pd, "identifier"))
                    .and_then(|n| text(n, content))
            })
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn text(node: Node, content: &str) -> Option<String> {
    node.utf8_text(content.as_bytes()).ok().map(|s| s.to_string())
}

fn truncate(text: String, cap: usize, truncated_counter: &mut usize) -> String {
    if text.chars().count() <= cap {
        return text;
    }
    *truncated_counter += 1;
    text.chars().take(cap).collect()
}

/// Iterative preorder traversal (grounded on the common cursor-walk pattern
/// used for semantic extraction elsewhere in this codebase).
fn for_each_node<'t, F: FnMut(Node<'t>)>(root: &Node<'t>, mut visitor: F) {
    let mut cursor = root.walk();
    let mut did_visit_children = false;
    loop {
        if !did_visit_children {
            visitor(cursor.node());
            if cursor.goto_first_child() {
                did_visit_children = false;
                continue;
            }
        }
        if cursor.goto_next_sibling() {
            did_visit_children = false;
            continue;
        }
        if !cursor.goto_parent() {
            break;
        }
        did_visit_children = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_go_function_and_call() {
        let src = "package main\n\nfunc Helper() {}\n\nfunc Run() {\n\tHelper()\n}\n";
        let result = parse("pkg/main.go", src, Lang::Go, 10_000);
        assert!(!result.parse_error);
        assert_eq!(result.package_name, "main");
        assert_eq!(result.functions.len(), 2);
        assert_eq!(result.calls.len(), 1);
        assert!(result.unresolved_calls.is_empty());
    }

    #[test]
    fn test_parse_go_method_receiver_naming() {
        let src = "package main\n\ntype Builder struct{}\n\nfunc (b *Builder) Build() {}\n";
        let result = parse("pkg/b.go", src, Lang::Go, 10_000);
        assert!(result.functions.iter().any(|f| f.name == "Builder.Build"));
        assert_eq!(result.types.len(), 1);
        assert_eq!(result.types[0].kind, TypeKind::Struct);
    }

    #[test]
    fn test_parse_go_unresolved_selector_call() {
        let src = "package main\n\nfunc Run() {\n\tfmt.Println(\"hi\")\n}\n";
        let result = parse("pkg/c.go", src, Lang::Go, 10_000);
        assert_eq!(result.unresolved_calls.len(), 1);
        assert_eq!(result.unresolved_calls[0].callee_name, "fmt.Println");
    }

    #[test]
    fn test_parse_go_generic_instantiation_collapses() {
        let src = "package main\n\nfunc Map[T any]() {}\n\nfunc Run() {\n\tMap[int]()\n}\n";
        let result = parse("pkg/g.go", src, Lang::Go, 10_000);
        assert_eq!(result.calls.len(), 1);
    }

    #[test]
    fn test_parse_rust_function_and_struct() {
        let src = "pub struct Foo;\n\nfn helper() {}\n\nfn run() {\n    helper();\n}\n";
        let result = parse("src/lib.rs", src, Lang::Rust, 10_000);
        assert_eq!(result.types.len(), 1);
        assert_eq!(result.calls.len(), 1);
    }

    #[test]
    fn test_parse_self_edge_suppressed() {
        let src = "package main\n\nfunc Run() {\n\tRun()\n}\n";
        let result = parse("pkg/r.go", src, Lang::Go, 10_000);
        assert!(result.calls.is_empty());
    }

    #[test]
    fn test_parse_go_collects_struct_fields_and_interface_methods() {
        let src = "package main\n\ntype Writer interface {\n\tWrite(p []byte) (int, error)\n}\n\ntype Logger struct {\n\tw Writer\n}\n";
        let result = parse("pkg/types.go", src, Lang::Go, 10_000);
        assert!(result.fields.iter().any(|f| f.field_name == "w" && f.field_type == "Writer"));
        assert!(result.interface_methods.iter().any(|i| i.interface_name == "Writer" && i.methods == vec!["Write".to_string()]));
    }

    #[test]
    fn test_code_text_truncation_counted() {
        let src = format!("fn run() {{\n    {}\n}}\n", "x".repeat(200));
        let result = parse("src/lib.rs", &src, Lang::Rust, 20);
        assert!(result.code_text_truncated >= 1);
    }
}
