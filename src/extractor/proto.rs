//! Protobuf walker (spec §4.2): regex/brace-balanced, not tree-sitter.
//!
//! Services and their rpc methods become Functions named `Service.Rpc`
//! (for name-scope compatibility with the rest of the graph); messages and
//! enums become Types since a typed channel (our schema) is available.

use regex::Regex;

use super::ParseResult;
use crate::id;
use crate::schema::{DefinesEdge, DefinesTypeEdge, Function, Type, TypeKind};

pub fn parse(relative_path: &str, content: &str, code_text_cap: usize) -> ParseResult {
    let mut result = ParseResult::default();
    let file_id = id::file_id(relative_path);
    let lines: Vec<&str> = content.lines().collect();

    let service_re = Regex::new(r"^\s*service\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    let rpc_re = Regex::new(r"^\s*rpc\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap();
    let message_re = Regex::new(r"^\s*message\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    let enum_re = Regex::new(r"^\s*enum\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();

    let mut current_service: Option<String> = None;
    let mut service_depth = 0i32;

    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i];

        if let Some(caps) = service_re.captures(line) {
            current_service = Some(caps[1].to_string());
            service_depth = brace_delta(line);
            i += 1;
            continue;
        }

        if current_service.is_some() {
            service_depth += brace_delta(line);
            if service_depth <= 0 && line.contains('}') {
                current_service = None;
            }
        }

        if let (Some(service), Some(caps)) = (&current_service, rpc_re.captures(line)) {
            let name = format!("{service}.{}", &caps[1]);
            let start_line = i + 1;
            let end_line = find_statement_end(&lines, i);
            let fn_id = id::function_id(relative_path, &name, start_line, end_line, 0, 0);
            let code_text = capped_slice(&lines, start_line, end_line, code_text_cap, &mut result.code_text_truncated);

            result.functions.push(Function {
                id: fn_id.clone(),
                name,
                signature: line.trim().to_string(),
                file_path: relative_path.to_string(),
                code_text: Some(code_text),
                start_line,
                end_line,
                start_col: 0,
                end_col: 0,
            });
            result.defines.push(DefinesEdge {
                id: id::defines_edge_id(&file_id, &fn_id),
                file_id: file_id.clone(),
                function_id: fn_id,
            });
        }

        if let Some(caps) = message_re.captures(line) {
            emit_type(&lines, i, &caps[1], TypeKind::Struct, relative_path, &file_id, code_text_cap, &mut result);
        } else if let Some(caps) = enum_re.captures(line) {
            emit_type(&lines, i, &caps[1], TypeKind::Enum, relative_path, &file_id, code_text_cap, &mut result);
        }

        i += 1;
    }

    result
}

#[allow(clippy::too_many_arguments)]
fn emit_type(
    lines: &[&str],
    index: usize,
    name: &str,
    kind: TypeKind,
    relative_path: &str,
    file_id: &str,
    code_text_cap: usize,
    result: &mut ParseResult,
) {
    let start_line = index + 1;
    let end_line = find_brace_end(lines, index);
    let type_id = id::type_id(relative_path, name, start_line, end_line);
    let code_text = capped_slice(lines, start_line, end_line, code_text_cap, &mut result.code_text_truncated);

    result.types.push(Type {
        id: type_id.clone(),
        name: name.to_string(),
        kind,
        file_path: relative_path.to_string(),
        code_text: Some(code_text),
        start_line,
        end_line,
    });
    result.defines_types.push(DefinesTypeEdge {
        id: id::defines_type_edge_id(file_id, &type_id),
        file_id: file_id.to_string(),
        type_id,
    });
}

fn brace_delta(line: &str) -> i32 {
    line.matches('{').count() as i32 - line.matches('}').count() as i32
}

/// A `rpc ... (...) returns (...);` may end on the same line (`;`) or open
/// a streaming-options block (`{ ... }`).
fn find_statement_end(lines: &[&str], start_index: usize) -> usize {
    if lines[start_index].contains(';') {
        return start_index + 1;
    }
    find_brace_end(lines, start_index)
}

fn find_brace_end(lines: &[&str], start_index: usize) -> usize {
    let mut depth = 0i32;
    let mut seen_open = false;
    for (offset, line) in lines.iter().enumerate().skip(start_index) {
        depth += brace_delta(line);
        if line.contains('{') {
            seen_open = true;
        }
        if seen_open && depth <= 0 {
            return offset + 1;
        }
    }
    lines.len().max(start_index + 1)
}

fn capped_slice(lines: &[&str], start_line: usize, end_line: usize, cap: usize, truncated: &mut usize) -> String {
    let text = lines
        .get(start_line.saturating_sub(1)..end_line.min(lines.len()))
        .map(|s| s.join("\n"))
        .unwrap_or_default();
    if text.chars().count() <= cap {
        text
    } else {
        *truncated += 1;
        text.chars().take(cap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_rpc_becomes_dotted_function() {
        let src = "service Greeter {\n  rpc SayHello (HelloRequest) returns (HelloReply);\n}\n";
        let result = parse("greeter.proto", src, 10_000);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "Greeter.SayHello");
    }

    #[test]
    fn test_message_becomes_struct_type() {
        let src = "message HelloRequest {\n  string name = 1;\n}\n";
        let result = parse("greeter.proto", src, 10_000);
        assert_eq!(result.types.len(), 1);
        assert_eq!(result.types[0].kind, TypeKind::Struct);
    }

    #[test]
    fn test_enum_becomes_enum_type() {
        let src = "enum Status {\n  OK = 0;\n  FAILED = 1;\n}\n";
        let result = parse("status.proto", src, 10_000);
        assert_eq!(result.types[0].kind, TypeKind::Enum);
    }

    #[test]
    fn test_multiple_rpcs_in_one_service() {
        let src = "service Foo {\n  rpc A (X) returns (Y);\n  rpc B (X) returns (Y);\n}\n";
        let result = parse("foo.proto", src, 10_000);
        assert_eq!(result.functions.len(), 2);
    }
}
