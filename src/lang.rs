//! Language detection and grammar dispatch (spec §4.1 fixed extension
//! mapping, §4.2 parser selection)

use std::path::Path;
use tree_sitter::Language;

use crate::error::{CieError, Result};

/// Supported programming languages, per the spec's fixed extension mapping:
/// go, python, js/ts, java, rust, c/cpp/h/hpp, cs, rb, php, swift, kt,
/// scala, clj, sh, proto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Go,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Java,
    Rust,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Scala,
    Clojure,
    Shell,
    Proto,
}

/// How a file's AST is obtained (spec §4.2: `treesitter|simplified|auto`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserMode {
    /// Tree-sitter grammar is compiled in and authoritative.
    TreeSitter,
    /// No tree-sitter grammar available here; brace-balanced line scanning.
    Simplified,
    /// Regex/brace-balanced protobuf walker.
    Proto,
}

impl Lang {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| CieError::UnsupportedLanguage {
                extension: "none".to_string(),
            })?;
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_lowercase().as_str() {
            "go" => Ok(Self::Go),
            "py" | "pyi" => Ok(Self::Python),
            "js" | "mjs" | "cjs" | "jsx" => Ok(Self::JavaScript),
            "ts" | "mts" | "cts" => Ok(Self::TypeScript),
            "tsx" => Ok(Self::Tsx),
            "java" => Ok(Self::Java),
            "rs" => Ok(Self::Rust),
            "c" | "h" => Ok(Self::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Ok(Self::Cpp),
            "cs" => Ok(Self::CSharp),
            "rb" => Ok(Self::Ruby),
            "php" => Ok(Self::Php),
            "swift" => Ok(Self::Swift),
            "kt" | "kts" => Ok(Self::Kotlin),
            "scala" => Ok(Self::Scala),
            "clj" | "cljs" | "cljc" => Ok(Self::Clojure),
            "sh" | "bash" | "zsh" => Ok(Self::Shell),
            "proto" => Ok(Self::Proto),
            _ => Err(CieError::UnsupportedLanguage {
                extension: ext.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Java => "java",
            Self::Rust => "rust",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Scala => "scala",
            Self::Clojure => "clojure",
            Self::Shell => "shell",
            Self::Proto => "proto",
        }
    }

    /// Which extraction path this language takes. Languages without a
    /// compiled-in tree-sitter grammar fall back to the brace-balanced
    /// simplified walker; `.proto` always uses the dedicated regex walker.
    pub fn parser_mode(&self) -> ParserMode {
        match self {
            Self::Ruby | Self::Php | Self::Swift | Self::Scala | Self::Clojure => {
                ParserMode::Simplified
            }
            Self::Proto => ParserMode::Proto,
            _ => ParserMode::TreeSitter,
        }
    }

    /// Tree-sitter grammar for languages where `parser_mode() ==
    /// ParserMode::TreeSitter`. Returns `None` otherwise.
    pub fn tree_sitter_language(&self) -> Option<Language> {
        match self {
            Self::Go => Some(tree_sitter_go::LANGUAGE.into()),
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Self::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Self::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Self::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
            Self::Java => Some(tree_sitter_java::LANGUAGE.into()),
            Self::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Self::C => Some(tree_sitter_c::LANGUAGE.into()),
            Self::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
            Self::CSharp => Some(tree_sitter_c_sharp::LANGUAGE.into()),
            Self::Kotlin => Some(tree_sitter_kotlin_ng::LANGUAGE.into()),
            Self::Shell => Some(tree_sitter_bash::LANGUAGE.into()),
            Self::Ruby | Self::Php | Self::Swift | Self::Scala | Self::Clojure | Self::Proto => {
                None
            }
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Go => &["go"],
            Self::Python => &["py", "pyi"],
            Self::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Self::TypeScript => &["ts", "mts", "cts"],
            Self::Tsx => &["tsx"],
            Self::Java => &["java"],
            Self::Rust => &["rs"],
            Self::C => &["c", "h"],
            Self::Cpp => &["cpp", "cc", "cxx", "hpp", "hxx", "hh"],
            Self::CSharp => &["cs"],
            Self::Ruby => &["rb"],
            Self::Php => &["php"],
            Self::Swift => &["swift"],
            Self::Kotlin => &["kt", "kts"],
            Self::Scala => &["scala"],
            Self::Clojure => &["clj", "cljs", "cljc"],
            Self::Shell => &["sh", "bash", "zsh"],
            Self::Proto => &["proto"],
        }
    }

    /// Get the language family for shared extraction logic.
    pub fn family(&self) -> LangFamily {
        match self {
            Self::JavaScript | Self::TypeScript | Self::Tsx => LangFamily::JavaScript,
            Self::Go => LangFamily::Go,
            Self::Python => LangFamily::Python,
            Self::Java => LangFamily::Java,
            Self::Rust => LangFamily::Rust,
            Self::C | Self::Cpp => LangFamily::CFamily,
            Self::CSharp => LangFamily::CSharp,
            Self::Kotlin | Self::Scala => LangFamily::Jvm,
            Self::Ruby | Self::Php | Self::Swift | Self::Clojure => LangFamily::Dynamic,
            Self::Shell => LangFamily::Shell,
            Self::Proto => LangFamily::Proto,
        }
    }
}

/// Language families for shared grammar/extraction logic (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LangFamily {
    JavaScript,
    Go,
    Python,
    Java,
    Rust,
    CFamily,
    CSharp,
    Jvm,
    Dynamic,
    Shell,
    Proto,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_language_detection() {
        assert_eq!(Lang::from_extension("go").unwrap(), Lang::Go);
        assert_eq!(Lang::from_extension("py").unwrap(), Lang::Python);
        assert_eq!(Lang::from_extension("ts").unwrap(), Lang::TypeScript);
        assert_eq!(Lang::from_extension("tsx").unwrap(), Lang::Tsx);
        assert_eq!(Lang::from_extension("rs").unwrap(), Lang::Rust);
        assert_eq!(Lang::from_extension("cs").unwrap(), Lang::CSharp);
        assert_eq!(Lang::from_extension("rb").unwrap(), Lang::Ruby);
        assert_eq!(Lang::from_extension("proto").unwrap(), Lang::Proto);
    }

    #[test]
    fn test_language_from_path() {
        let path = PathBuf::from("src/main.go");
        assert_eq!(Lang::from_path(&path).unwrap(), Lang::Go);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(Lang::from_extension("xyz").is_err());
    }

    #[test]
    fn test_parser_mode_simplified_for_missing_grammars() {
        assert_eq!(Lang::Ruby.parser_mode(), ParserMode::Simplified);
        assert_eq!(Lang::Swift.parser_mode(), ParserMode::Simplified);
        assert_eq!(Lang::Proto.parser_mode(), ParserMode::Proto);
        assert_eq!(Lang::Go.parser_mode(), ParserMode::TreeSitter);
    }

    #[test]
    fn test_tree_sitter_language_none_for_simplified() {
        assert!(Lang::Ruby.tree_sitter_language().is_none());
        assert!(Lang::Go.tree_sitter_language().is_some());
    }
}
