//! Simplified brace-balanced extractor (spec §4.2) for languages without a
//! compiled-in tree-sitter grammar: Ruby, PHP, Swift, Scala, Clojure.
//!
//! Line-oriented and permitted to miss edge cases (spec: "the simplified
//! parser uses brace-balanced line scanning and is permitted to miss edge
//! cases"). No import extraction; types are best-effort for the
//! brace-delimited languages only.

use std::collections::HashMap;

use regex::Regex;

use super::ParseResult;
use crate::id;
use crate::lang::Lang;
use crate::schema::{CallEdge, DefinesEdge, DefinesTypeEdge, Function, Type, TypeKind, UnresolvedCall};

pub fn parse(relative_path: &str, content: &str, lang: Lang, code_text_cap: usize) -> ParseResult {
    let mut result = ParseResult::default();
    let file_id = id::file_id(relative_path);

    let declarations = match lang {
        Lang::Ruby => find_declarations(content, r"^\s*def\s+([A-Za-z_][A-Za-z0-9_!?=.]*)"),
        Lang::Php => find_declarations(content, r"^\s*(?:public |private |protected |static )*function\s+&?([A-Za-z_][A-Za-z0-9_]*)"),
        Lang::Swift => find_declarations(content, r"^\s*(?:public |private |internal |fileprivate |open |static |final )*func\s+([A-Za-z_][A-Za-z0-9_]*)"),
        Lang::Scala => find_declarations(content, r"^\s*(?:private |protected |final |override )*def\s+([A-Za-z_][A-Za-z0-9_]*)"),
        Lang::Clojure => find_declarations(content, r"^\s*\(defn-?\s+([A-Za-z_][A-Za-z0-9_*+!?./-]*)"),
        _ => Vec::new(),
    };

    let lines: Vec<&str> = content.lines().collect();
    let mut name_to_id: HashMap<String, String> = HashMap::new();
    let mut spans: Vec<(String, usize, usize)> = Vec::new();

    for (name, start_line) in &declarations {
        let end_line = match lang {
            Lang::Ruby => find_end_by_keyword(&lines, *start_line),
            Lang::Clojure => find_end_by_parens(&lines, *start_line),
            _ => find_end_by_brace(&lines, *start_line),
        };

        let fn_id = id::function_id(relative_path, name, *start_line, end_line, 0, 0);
        name_to_id.insert(name.clone(), fn_id.clone());
        spans.push((fn_id.clone(), *start_line, end_line));

        let code_text = slice_lines(&lines, *start_line, end_line);
        let capped = if code_text.chars().count() <= code_text_cap {
            code_text
        } else {
            result.code_text_truncated += 1;
            code_text.chars().take(code_text_cap).collect()
        };

        result.functions.push(Function {
            id: fn_id.clone(),
            name: name.clone(),
            signature: lines.get(start_line - 1).map(|l| l.trim().to_string()).unwrap_or_default(),
            file_path: relative_path.to_string(),
            code_text: Some(capped),
            start_line: *start_line,
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

    if let Some(type_re) = type_regex(lang) {
        for (kind, name, start_line) in find_type_declarations(content, &type_re) {
            let end_line = find_end_by_brace(&lines, start_line);
            let type_id = id::type_id(relative_path, &name, start_line, end_line);
            result.types.push(Type {
                id: type_id.clone(),
                name,
                kind,
                file_path: relative_path.to_string(),
                code_text: Some(slice_lines(&lines, start_line, end_line)),
                start_line,
                end_line,
            });
            result.defines_types.push(DefinesTypeEdge {
                id: id::defines_type_edge_id(&file_id, &type_id),
                file_id: file_id.clone(),
                type_id,
            });
        }
    }

    extract_calls(&lines, &spans, &name_to_id, relative_path, &mut result);

    result
}

fn find_declarations(content: &str, pattern: &str) -> Vec<(String, usize)> {
    let re = Regex::new(pattern).expect("static simplified-extractor regex must compile");
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| re.captures(line).map(|c| (c[1].to_string(), i + 1)))
        .collect()
}

fn type_regex(lang: Lang) -> Option<Regex> {
    match lang {
        Lang::Ruby => Regex::new(r"^\s*(?:class|module)\s+([A-Za-z_][A-Za-z0-9_:]*)").ok(),
        Lang::Php => Regex::new(r"^\s*(?:abstract |final )?(class|interface)\s+([A-Za-z_][A-Za-z0-9_]*)").ok(),
        Lang::Swift => Regex::new(r"^\s*(?:public |private |internal |final )?(class|struct|enum|protocol)\s+([A-Za-z_][A-Za-z0-9_]*)").ok(),
        Lang::Scala => Regex::new(r"^\s*(?:abstract |final |sealed )?(class|trait|object)\s+([A-Za-z_][A-Za-z0-9_]*)").ok(),
        _ => None,
    }
}

fn find_type_declarations(content: &str, re: &Regex) -> Vec<(TypeKind, String, usize)> {
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let caps = re.captures(line)?;
            // Ruby's pattern has one capture group; the others have two.
            let (kw, name) = if caps.len() >= 3 {
                (caps[1].to_string(), caps[2].to_string())
            } else {
                ("class".to_string(), caps[1].to_string())
            };
            let kind = match kw.as_str() {
                "interface" | "protocol" | "trait" => TypeKind::Interface,
                "struct" => TypeKind::Struct,
                "enum" => TypeKind::Enum,
                _ => TypeKind::Class,
            };
            Some((kind, name, i + 1))
        })
        .collect()
}

/// Brace-balanced end: scan forward from `start_line` until the first `{`
/// is seen and its matching `}` closes, ignoring braces inside string
/// literals (a minimal lexical sniff, not a full scanner).
fn find_end_by_brace(lines: &[&str], start_line: usize) -> usize {
    let mut depth: i32 = 0;
    let mut seen_open = false;
    for (offset, line) in lines.iter().enumerate().skip(start_line.saturating_sub(1)) {
        let mut in_string = false;
        let mut delim = '"';
        let mut escape = false;
        for c in line.chars() {
            if escape {
                escape = false;
                continue;
            }
            if in_string {
                if c == '\\' {
                    escape = true;
                } else if c == delim {
                    in_string = false;
                }
                continue;
            }
            match c {
                '"' | '\'' => {
                    in_string = true;
                    delim = c;
                }
                '{' => {
                    depth += 1;
                    seen_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if seen_open && depth <= 0 {
            return offset + 1;
        }
    }
    lines.len().max(start_line)
}

/// Ruby-style keyword nesting: block-opening keywords increment depth,
/// `end` decrements it.
fn find_end_by_keyword(lines: &[&str], start_line: usize) -> usize {
    let opener = Regex::new(r"^\s*(def|do|if|unless|class|module|while|until|case|begin)\b").unwrap();
    let closer = Regex::new(r"^\s*end\b").unwrap();
    let mut depth = 0i32;
    for (offset, line) in lines.iter().enumerate().skip(start_line.saturating_sub(1)) {
        if opener.is_match(line) {
            depth += 1;
        } else if closer.is_match(line) {
            depth -= 1;
            if depth <= 0 {
                return offset + 1;
            }
        }
    }
    lines.len().max(start_line)
}

fn find_end_by_parens(lines: &[&str], start_line: usize) -> usize {
    let mut depth = 0i32;
    let mut seen_open = false;
    for (offset, line) in lines.iter().enumerate().skip(start_line.saturating_sub(1)) {
        for c in line.chars() {
            match c {
                '(' => {
                    depth += 1;
                    seen_open = true;
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        if seen_open && depth <= 0 {
            return offset + 1;
        }
    }
    lines.len().max(start_line)
}

fn slice_lines(lines: &[&str], start_line: usize, end_line: usize) -> String {
    lines
        .get(start_line.saturating_sub(1)..end_line.min(lines.len()))
        .map(|s| s.join("\n"))
        .unwrap_or_default()
}

fn extract_calls(
    lines: &[&str],
    spans: &[(String, usize, usize)],
    name_to_id: &HashMap<String, String>,
    relative_path: &str,
    result: &mut ParseResult,
) {
    let call_re = Regex::new(r"([A-Za-z_][A-Za-z0-9_.]*)\s*\(").unwrap();
    let mut seen = std::collections::HashSet::new();

    for (caller_id, start_line, end_line) in spans {
        for (i, line) in lines
            .iter()
            .enumerate()
            .skip(start_line.saturating_sub(1))
            .take(end_line.saturating_sub(*start_line).max(1))
        {
            let trimmed = line.trim();
            if trimmed.starts_with('#') || trimmed.starts_with("//") {
                continue;
            }
            for cap in call_re.captures_iter(line) {
                let callee = cap[1].to_string();
                if let Some(callee_id) = name_to_id.get(&callee) {
                    if callee_id == caller_id {
                        continue;
                    }
                    if seen.insert((caller_id.clone(), callee_id.clone())) {
                        result.calls.push(CallEdge {
                            id: id::calls_edge_id(caller_id, callee_id),
                            caller_id: caller_id.clone(),
                            callee_id: callee_id.clone(),
                        });
                    }
                } else if callee.contains('.') {
                    result.unresolved_calls.push(UnresolvedCall {
                        caller_id: caller_id.clone(),
                        callee_name: callee,
                        file_path: relative_path.to_string(),
                        line: i + 1,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ruby_def_end_function_and_call() {
        let src = "def helper\n  1\nend\n\ndef run\n  helper\nend\n";
        let result = parse("app.rb", src, Lang::Ruby, 10_000);
        assert_eq!(result.functions.len(), 2);
    }

    #[test]
    fn test_swift_brace_function() {
        let src = "func helper() {\n    return\n}\n\nfunc run() {\n    helper()\n}\n";
        let result = parse("App.swift", src, Lang::Swift, 10_000);
        assert_eq!(result.functions.len(), 2);
        assert_eq!(result.calls.len(), 1);
    }

    #[test]
    fn test_clojure_defn_parens_balanced() {
        let src = "(defn helper [x]\n  (+ x 1))\n\n(defn run []\n  (helper 1))\n";
        let result = parse("core.clj", src, Lang::Clojure, 10_000);
        assert_eq!(result.functions.len(), 2);
    }

    #[test]
    fn test_php_class_detection() {
        let src = "class Widget {\n    function render() {\n        return 1;\n    }\n}\n";
        let result = parse("Widget.php", src, Lang::Php, 10_000);
        assert_eq!(result.types.len(), 1);
        assert_eq!(result.types[0].kind, TypeKind::Class);
        assert_eq!(result.functions.len(), 1);
    }
}
