//! Call Resolver (C3, spec §4.3)
//!
//! A global second pass over everything C2 produced: builds four
//! read-only indices, then turns each [`UnresolvedCall`] into a concrete
//! [`CallEdge`] (or a synthetic external stub) via a four-priority
//! resolution algorithm.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::id;
use crate::schema::{CallEdge, Function, Import, ImportAlias, InterfaceMethods, UnresolvedCall};
pub use crate::schema::{FieldInfo, ImplementsEdge};

/// Parallelize resolution once the candidate count reaches this size
/// (spec §4.3, §5: "parallel over calls when count ≥ 1000").
const PARALLEL_THRESHOLD: usize = 1000;

/// Derive structural `implements[]` edges from this run's functions and
/// the interface method-requirement sets C2 collected: a concrete type
/// implements an interface when its declared method set is a superset of
/// the interface's required method names (spec §9 — languages with no
/// explicit `implements` keyword still get these edges at parse time).
pub fn derive_implements(functions: &[Function], interfaces: &[InterfaceMethods]) -> Vec<ImplementsEdge> {
    let mut methods_by_type: HashMap<&str, HashSet<&str>> = HashMap::new();
    for f in functions {
        if let Some((owner, method)) = f.name.split_once('.') {
            methods_by_type.entry(owner).or_default().insert(method);
        }
    }

    let mut edges = Vec::new();
    for iface in interfaces {
        if iface.methods.is_empty() {
            continue;
        }
        for (&concrete_type, methods) in &methods_by_type {
            if concrete_type == iface.interface_name {
                continue;
            }
            if iface.methods.iter().all(|m| methods.contains(m.as_str())) {
                edges.push(ImplementsEdge {
                    concrete_type: concrete_type.to_string(),
                    interface_type: iface.interface_name.clone(),
                });
            }
        }
    }
    edges.sort_by(|a, b| (a.concrete_type.clone(), a.interface_type.clone()).cmp(&(b.concrete_type.clone(), b.interface_type.clone())));
    edges.dedup_by(|a, b| a.concrete_type == b.concrete_type && a.interface_type == b.interface_type);
    edges
}

/// Everything the resolver needs: the output of C2 across the whole run.
pub struct ResolverInput<'a> {
    pub functions: &'a [Function],
    pub imports: &'a [Import],
    /// file_path -> packageName, as reported by the extractor per file.
    pub file_package: &'a HashMap<String, String>,
    pub fields: &'a [FieldInfo],
    pub implements: &'a [ImplementsEdge],
}

/// Read-only indices built once per run; safe to share across resolver
/// worker threads (spec §4.3, §5).
pub struct Resolver {
    /// package_path (a file's directory) -> (packageName, simple_name -> function_id)
    package_functions: HashMap<String, (String, HashMap<String, String>)>,
    /// file_path -> (alias -> import_path), aliases already resolved to
    /// their default (last import-path segment) when not explicit.
    file_aliases: HashMap<String, HashMap<String, String>>,
    /// file_path -> import_paths that are dot-imports.
    file_dot_imports: HashMap<String, Vec<String>>,
    /// import_path -> package_path, resolved once and cached.
    import_to_package: HashMap<String, String>,
    /// "Type.Method" (or bare function name) -> function_id, across the
    /// whole run; used for field/interface dispatch target lookup.
    full_name_index: HashMap<String, String>,
    /// field_name -> candidate field types (owner type not tracked; see
    /// DESIGN.md open-question resolution).
    field_types: HashMap<String, Vec<String>>,
    /// interface_type -> concrete types implementing it.
    implementors: HashMap<String, Vec<String>>,
    /// interface_type set, for the "is this type an interface" check.
    interfaces: HashSet<String>,
    /// function_id -> (param name -> base type), parsed from Go-style
    /// signatures, for priority-4 parameter dispatch.
    signature_params: HashMap<String, HashMap<String, String>>,
}

impl Resolver {
    pub fn build_index(input: &ResolverInput<'_>) -> Self {
        let mut package_functions: HashMap<String, (String, HashMap<String, String>)> = HashMap::new();
        let mut full_name_index: HashMap<String, String> = HashMap::new();

        let mut signature_params: HashMap<String, HashMap<String, String>> = HashMap::new();

        for function in input.functions {
            let package_path = directory_of(&function.file_path);
            let package_name = input
                .file_package
                .get(&function.file_path)
                .cloned()
                .unwrap_or_default();
            let entry = package_functions
                .entry(package_path)
                .or_insert_with(|| (package_name.clone(), HashMap::new()));
            entry.1.insert(function.name.clone(), function.id.clone());
            full_name_index.insert(function.name.clone(), function.id.clone());
            if !function.signature.is_empty() {
                signature_params.insert(function.id.clone(), parse_go_like_params(&function.signature));
            }
        }

        let mut file_aliases: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut file_dot_imports: HashMap<String, Vec<String>> = HashMap::new();
        let mut distinct_import_paths: HashSet<String> = HashSet::new();

        for import in input.imports {
            distinct_import_paths.insert(import.import_path.clone());
            match &import.alias {
                ImportAlias::Named(alias) => {
                    file_aliases
                        .entry(import.file_path.clone())
                        .or_default()
                        .insert(alias.clone(), import.import_path.clone());
                }
                ImportAlias::Dot => {
                    file_dot_imports
                        .entry(import.file_path.clone())
                        .or_default()
                        .push(import.import_path.clone());
                }
                ImportAlias::Blank => {}
            }
        }

        let package_names: HashMap<String, String> = package_functions
            .iter()
            .map(|(path, (name, _))| (path.clone(), name.clone()))
            .collect();
        let package_paths_sorted: Vec<&String> = {
            let mut v: Vec<&String> = package_functions.keys().collect();
            v.sort();
            v
        };

        let import_to_package: HashMap<String, String> = distinct_import_paths
            .into_iter()
            .filter_map(|import_path| {
                resolve_import_to_package(&import_path, &package_paths_sorted, &package_names)
                    .map(|pkg| (import_path, pkg))
            })
            .collect();

        let mut field_types: HashMap<String, Vec<String>> = HashMap::new();
        for field in input.fields {
            field_types.entry(field.field_name.clone()).or_default().push(field.field_type.clone());
        }

        let mut implementors: HashMap<String, Vec<String>> = HashMap::new();
        let mut interfaces: HashSet<String> = HashSet::new();
        for edge in input.implements {
            interfaces.insert(edge.interface_type.clone());
            implementors.entry(edge.interface_type.clone()).or_default().push(edge.concrete_type.clone());
        }
        for implementors_list in implementors.values_mut() {
            implementors_list.sort();
            implementors_list.dedup();
        }

        Resolver {
            package_functions,
            signature_params,
            file_aliases,
            file_dot_imports,
            import_to_package,
            full_name_index,
            field_types,
            implementors,
            interfaces,
        }
    }

    /// Resolve every unresolved call, returning new Calls edges plus any
    /// synthetic external-stub functions that had to be minted. Dedup is
    /// global over `(callerID, calleeID)`; output is sorted by that pair
    /// for deterministic emission (spec §5, invariant 3).
    pub fn resolve(&self, unresolved: &[UnresolvedCall]) -> (Vec<CallEdge>, Vec<Function>) {
        let resolutions: Vec<Resolution> = if unresolved.len() >= PARALLEL_THRESHOLD {
            unresolved.par_iter().flat_map_iter(|call| self.resolve_one(call)).collect()
        } else {
            unresolved.iter().flat_map(|call| self.resolve_one(call)).collect()
        };

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut stub_ids: HashSet<String> = HashSet::new();
        let mut edges = Vec::new();
        let mut stubs = Vec::new();

        for r in resolutions {
            if r.caller_id == r.callee_id {
                continue;
            }
            if !seen.insert((r.caller_id.clone(), r.callee_id.clone())) {
                continue;
            }
            if let Some(stub) = r.stub {
                if stub_ids.insert(stub.id.clone()) {
                    stubs.push(stub);
                }
            }
            edges.push(CallEdge {
                id: id::calls_edge_id(&r.caller_id, &r.callee_id),
                caller_id: r.caller_id,
                callee_id: r.callee_id,
            });
        }

        edges.sort_by(|a, b| (a.caller_id.clone(), a.callee_id.clone()).cmp(&(b.caller_id.clone(), b.callee_id.clone())));
        (edges, stubs)
    }

    fn resolve_one(&self, call: &UnresolvedCall) -> Vec<Resolution> {
        if let Some(r) = self.resolve_qualified(call) {
            return vec![r];
        }
        if let Some(r) = self.resolve_dot_import(call) {
            return vec![r];
        }
        if let Some(rs) = self.resolve_field_dispatch(call) {
            return rs;
        }
        if let Some(rs) = self.resolve_parameter_dispatch(call) {
            return rs;
        }
        Vec::new()
    }

    /// Priority 1: `alias.Func` (possibly with intermediate receiver
    /// components, which are ignored beyond locating the alias and the
    /// final exported function name).
    fn resolve_qualified(&self, call: &UnresolvedCall) -> Option<Resolution> {
        let parts: Vec<&str> = call.callee_name.split('.').collect();
        if parts.len() < 2 {
            return None;
        }
        let alias = parts[0];
        let func_name = parts[parts.len() - 1];
        if !func_name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false) {
            return None;
        }
        let import_path = self.file_aliases.get(&call.file_path)?.get(alias)?;
        let package_path = self.import_to_package.get(import_path)?;
        let (_, functions) = self.package_functions.get(package_path)?;
        let callee_id = functions.get(func_name)?.clone();
        Some(Resolution { caller_id: call.caller_id.clone(), callee_id, stub: None })
    }

    /// Priority 2: unqualified bare name resolved through a dot import.
    fn resolve_dot_import(&self, call: &UnresolvedCall) -> Option<Resolution> {
        if call.callee_name.contains('.') {
            return None;
        }
        let dot_imports = self.file_dot_imports.get(&call.file_path)?;
        for import_path in dot_imports {
            let Some(package_path) = self.import_to_package.get(import_path) else { continue };
            let Some((_, functions)) = self.package_functions.get(package_path) else { continue };
            if let Some(id) = functions.get(&call.callee_name) {
                return Some(Resolution { caller_id: call.caller_id.clone(), callee_id: id.clone(), stub: None });
            }
        }
        None
    }

    /// Priority 3: chained call `a.b.c.Method`, scanning right-to-left for
    /// a struct field typed as an interface (fan-out), a known concrete
    /// type (single edge), or neither (external stub).
    fn resolve_field_dispatch(&self, call: &UnresolvedCall) -> Option<Vec<Resolution>> {
        let parts: Vec<&str> = call.callee_name.split('.').collect();
        if parts.len() < 2 {
            return None;
        }
        let method = parts[parts.len() - 1];

        for component in parts[..parts.len() - 1].iter().rev() {
            let Some(candidate_types) = self.field_types.get(*component) else { continue };
            for field_type in candidate_types {
                if self.interfaces.contains(field_type) {
                    let implementors = self.implementors.get(field_type).cloned().unwrap_or_default();
                    if implementors.is_empty() {
                        continue;
                    }
                    let resolutions = implementors
                        .iter()
                        .filter_map(|concrete| {
                            let full_name = format!("{concrete}.{method}");
                            self.full_name_index.get(&full_name).map(|id| Resolution {
                                caller_id: call.caller_id.clone(),
                                callee_id: id.clone(),
                                stub: None,
                            })
                        })
                        .collect::<Vec<_>>();
                    if !resolutions.is_empty() {
                        return Some(resolutions);
                    }
                    continue;
                }

                let full_name = format!("{field_type}.{method}");
                if let Some(id) = self.full_name_index.get(&full_name) {
                    return Some(vec![Resolution { caller_id: call.caller_id.clone(), callee_id: id.clone(), stub: None }]);
                }

                let stub_name = full_name;
                let stub_id = id::external_stub_id(&stub_name);
                let stub = Function {
                    id: stub_id.clone(),
                    name: stub_name,
                    signature: String::new(),
                    file_path: "<external>".to_string(),
                    code_text: None,
                    start_line: 0,
                    end_line: 0,
                    start_col: 0,
                    end_col: 0,
                };
                return Some(vec![Resolution { caller_id: call.caller_id.clone(), callee_id: stub_id, stub: Some(stub) }]);
            }
        }
        None
    }

    /// Priority 4: parameter-based dispatch fallback, for Go-style
    /// signatures `(name Type, name2 *pkg.Type2, ...)`.
    fn resolve_parameter_dispatch(&self, call: &UnresolvedCall) -> Option<Vec<Resolution>> {
        let parts: Vec<&str> = call.callee_name.split('.').collect();
        if parts.len() < 2 {
            return None;
        }
        let receiver_component = parts[parts.len() - 2];
        let method = parts[parts.len() - 1];

        let params = self.signature_params.get(&call.caller_id)?;
        let param_type = params.get(receiver_component)?;
        if !self.interfaces.contains(param_type) {
            return None;
        }
        let implementors = self.implementors.get(param_type)?;
        let resolutions: Vec<Resolution> = implementors
            .iter()
            .filter_map(|concrete| {
                let full_name = format!("{concrete}.{method}");
                self.full_name_index.get(&full_name).map(|id| Resolution {
                    caller_id: call.caller_id.clone(),
                    callee_id: id.clone(),
                    stub: None,
                })
            })
            .collect();
        if resolutions.is_empty() {
            None
        } else {
            Some(resolutions)
        }
    }
}

struct Resolution {
    caller_id: String,
    callee_id: String,
    stub: Option<Function>,
}

fn directory_of(file_path: &str) -> String {
    match file_path.rfind('/') {
        Some(idx) => file_path[..idx].to_string(),
        None => String::new(),
    }
}

fn resolve_import_to_package(
    import_path: &str,
    package_paths_sorted: &[&String],
    package_names: &HashMap<String, String>,
) -> Option<String> {
    if package_names.contains_key(import_path) {
        return Some(import_path.to_string());
    }
    let suffix = format!("/{}", last_segment(import_path));
    if let Some(found) = package_paths_sorted.iter().find(|p| p.ends_with(&suffix) || p.as_str() == last_segment(import_path)) {
        return Some((*found).clone());
    }
    let wanted_name = last_segment(import_path);
    package_names
        .iter()
        .find(|(_, name)| name.as_str() == wanted_name)
        .map(|(path, _)| path.clone())
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parse a Go-style parameter list `(name Type, name2 *pkg.Type2, ...)`
/// into `name -> base type` (pointer/slice/variadic/package-qualifier and
/// generic-bracket stripped), for priority-4 dispatch.
pub fn parse_go_like_params(signature: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();
    let Some(open) = signature.find('(') else { return result };
    let Some(close) = matching_paren(signature, open) else { return result };
    let inner = &signature[open + 1..close];

    for param in split_top_level_commas(inner) {
        let trimmed = param.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let Some(name) = tokens.next() else { continue };
        let rest: String = tokens.collect::<Vec<_>>().join(" ");
        if rest.is_empty() {
            continue;
        }
        let base_type = strip_type_decorations(&rest);
        result.insert(name.to_string(), base_type);
    }
    result
}

fn matching_paren(s: &str, open_index: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices().skip(open_index) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

pub(crate) fn strip_type_decorations(raw: &str) -> String {
    let mut s = raw.trim().trim_start_matches("...").trim_start_matches('*').to_string();
    while s.starts_with("[]") {
        s = s[2..].to_string();
    }
    if let Some(idx) = s.find('[') {
        s.truncate(idx);
    }
    if let Some(idx) = s.rfind('.') {
        s = s[idx + 1..].to_string();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(name: &str, file_path: &str) -> Function {
        Function {
            id: format!("func:{name}:{file_path}"),
            name: name.to_string(),
            signature: String::new(),
            file_path: file_path.to_string(),
            code_text: None,
            start_line: 1,
            end_line: 1,
            start_col: 0,
            end_col: 0,
        }
    }

    #[test]
    fn test_s4_interface_dispatch_fan_out() {
        let functions = vec![
            func("Build", "builder/builder.go"),
            func("CozoDB.Write", "storage/cozo.go"),
            func("FileStore.Write", "storage/file.go"),
        ];
        let mut file_package = HashMap::new();
        file_package.insert("builder/builder.go".to_string(), "builder".to_string());
        file_package.insert("storage/cozo.go".to_string(), "storage".to_string());
        file_package.insert("storage/file.go".to_string(), "storage".to_string());

        let fields = vec![FieldInfo { field_name: "writer".to_string(), field_type: "Writer".to_string() }];
        let implements = vec![
            ImplementsEdge { concrete_type: "CozoDB".to_string(), interface_type: "Writer".to_string() },
            ImplementsEdge { concrete_type: "FileStore".to_string(), interface_type: "Writer".to_string() },
        ];

        let input = ResolverInput {
            functions: &functions,
            imports: &[],
            file_package: &file_package,
            fields: &fields,
            implements: &implements,
        };
        let resolver = Resolver::build_index(&input);

        let unresolved = vec![UnresolvedCall {
            caller_id: functions[0].id.clone(),
            callee_name: "writer.Write".to_string(),
            file_path: "builder/builder.go".to_string(),
            line: 10,
        }];
        let (edges, stubs) = resolver.resolve(&unresolved);
        assert_eq!(edges.len(), 2);
        assert!(stubs.is_empty());
    }

    #[test]
    fn test_s5_external_stub() {
        let functions = vec![func("Query", "app/app.go")];
        let file_package = HashMap::new();
        let fields = vec![FieldInfo { field_name: "db".to_string(), field_type: "DB".to_string() }];

        let input = ResolverInput {
            functions: &functions,
            imports: &[],
            file_package: &file_package,
            fields: &fields,
            implements: &[],
        };
        let resolver = Resolver::build_index(&input);

        let unresolved = vec![UnresolvedCall {
            caller_id: functions[0].id.clone(),
            callee_name: "r.db.Query".to_string(),
            file_path: "app/app.go".to_string(),
            line: 5,
        }];
        let (edges, stubs) = resolver.resolve(&unresolved);
        assert_eq!(edges.len(), 1);
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].name, "DB.Query");
        assert_eq!(stubs[0].file_path, "<external>");
        assert!(stubs[0].id.starts_with("func:ext:"));
    }

    #[test]
    fn test_p8_call_dedup_across_duplicate_unresolved() {
        let functions = vec![func("Helper", "pkg/a.go"), func("Run", "pkg/b.go")];
        let mut file_package = HashMap::new();
        file_package.insert("pkg/a.go".to_string(), "pkg".to_string());
        file_package.insert("pkg/b.go".to_string(), "pkg".to_string());

        let imports = vec![Import {
            id: "import:1".to_string(),
            file_path: "pkg/b.go".to_string(),
            import_path: "pkg".to_string(),
            alias: ImportAlias::Named("pkg".to_string()),
            start_line: 1,
        }];

        let input = ResolverInput {
            functions: &functions,
            imports: &imports,
            file_package: &file_package,
            fields: &[],
            implements: &[],
        };
        let resolver = Resolver::build_index(&input);

        let call = UnresolvedCall {
            caller_id: functions[1].id.clone(),
            callee_name: "pkg.Helper".to_string(),
            file_path: "pkg/b.go".to_string(),
            line: 1,
        };
        let doubled = vec![call.clone(), call];
        let (edges, _) = resolver.resolve(&doubled);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_parse_go_like_params() {
        let params = parse_go_like_params("func Run(w Writer, opts ...Option) error");
        assert_eq!(params.get("w").unwrap(), "Writer");
    }

    #[test]
    fn test_strip_type_decorations_handles_pointer_and_package() {
        assert_eq!(strip_type_decorations("*pkg.Writer"), "Writer");
        assert_eq!(strip_type_decorations("[]Option"), "Option");
    }

    #[test]
    fn test_derive_implements_matches_superset_method_sets() {
        let functions = vec![
            func("CozoDB.Write", "storage/cozo.go"),
            func("CozoDB.Close", "storage/cozo.go"),
            func("FileStore.Write", "storage/file.go"),
            func("Logger.Log", "log/log.go"),
        ];
        let interfaces = vec![InterfaceMethods {
            interface_name: "Writer".to_string(),
            methods: vec!["Write".to_string()],
        }];
        let edges = derive_implements(&functions, &interfaces);
        let concrete_types: Vec<&str> = edges.iter().map(|e| e.concrete_type.as_str()).collect();
        assert!(concrete_types.contains(&"CozoDB"));
        assert!(concrete_types.contains(&"FileStore"));
        assert!(!concrete_types.contains(&"Logger"));
    }

    #[test]
    fn test_derive_implements_requires_full_method_set() {
        let functions = vec![func("Partial.Write", "pkg/p.go")];
        let interfaces = vec![InterfaceMethods {
            interface_name: "ReadWriter".to_string(),
            methods: vec!["Write".to_string(), "Read".to_string()],
        }];
        assert!(derive_implements(&functions, &interfaces).is_empty());
    }
}
