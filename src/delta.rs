//! Delta detection between two revisions (spec §4.8, C8)
//!
//! Built directly on top of [`crate::git`]'s `git diff --name-status -M`
//! wrapper, extended with Git path unquoting and the rename-to-excluded
//! filtering rule the raw git module doesn't know about.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;
use crate::git::{git_command, ChangeType, ChangedFile};
use crate::loader::glob::GlobSet;

/// Git's sentinel hash for the empty tree, used when `base_sha` is empty
/// (spec §4.8: "empty base SHA ⇒ compare against Git's empty-tree sentinel").
const EMPTY_TREE_SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// A filtered, deterministic delta between two revisions.
#[derive(Debug, Clone, Default)]
pub struct Delta {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    /// old path -> new path
    pub renamed: BTreeMap<String, String>,
    /// Sorted, deduplicated union of every path touched, including both
    /// endpoints of a rename.
    pub all: Vec<String>,
}

/// Compute the raw name-status diff between `base_sha` and `head_sha`.
pub fn diff_revisions(
    base_sha: &str,
    head_sha: &str,
    cwd: Option<&Path>,
) -> Result<Vec<ChangedFile>> {
    let base = if base_sha.is_empty() {
        EMPTY_TREE_SHA
    } else {
        base_sha
    };
    let output = git_command(&["diff", "--name-status", "-M", base, head_sha], cwd)?;
    parse_name_status_unquoted(&output)
}

/// Like `git::diff::parse_name_status_output` but additionally unquotes
/// Git's C-style path quoting (`\n`, `\t`, `\\`, `\"`) used when a path
/// contains those characters.
fn parse_name_status_unquoted(output: &str) -> Result<Vec<ChangedFile>> {
    let mut files = Vec::new();
    for line in output.lines() {
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.is_empty() {
            continue;
        }
        let status = parts[0];
        let change_type = status
            .chars()
            .next()
            .and_then(parse_status_char)
            .ok_or_else(|| crate::error::CieError::Git {
                message: format!("unknown git status: {status}"),
            })?;

        let (path, old_path) = match change_type {
            ChangeType::Renamed | ChangeType::Copied if parts.len() >= 3 => {
                (unquote_git_path(parts[2]), Some(unquote_git_path(parts[1])))
            }
            _ if parts.len() >= 2 => (unquote_git_path(parts[1]), None),
            _ => {
                return Err(crate::error::CieError::Git {
                    message: format!("invalid diff output line: {line}"),
                })
            }
        };

        files.push(ChangedFile {
            path,
            old_path,
            change_type,
        });
    }
    Ok(files)
}

fn parse_status_char(c: char) -> Option<ChangeType> {
    match c {
        'A' => Some(ChangeType::Added),
        'M' => Some(ChangeType::Modified),
        'D' => Some(ChangeType::Deleted),
        'R' => Some(ChangeType::Renamed),
        'C' => Some(ChangeType::Copied),
        'T' => Some(ChangeType::TypeChanged),
        _ => None,
    }
}

/// Unquote a Git-quoted path. Git wraps a path in double quotes and
/// C-escapes `\n`, `\t`, `\\`, `\"` when it contains those bytes.
fn unquote_git_path(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return raw.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Eligibility check shared with C1's walk: size cap, binary sniff, symlink
/// rejection. `read_and_check` is injected so tests can avoid touching disk.
pub trait EligibilityCheck {
    fn is_eligible(&self, path: &str) -> bool;
}

/// Apply C1's exclusion globs and eligibility rules to a raw changed-file
/// list, producing a deterministic, sorted [`Delta`].
///
/// A rename whose new path is excluded or ineligible is rewritten as a
/// deletion of the *old* path (spec §4.8, P9), so the index never retains
/// stale entities at moved locations.
pub fn filter_delta(
    changes: &[ChangedFile],
    excludes: &GlobSet,
    eligible: &dyn EligibilityCheck,
) -> Delta {
    let mut delta = Delta::default();
    let mut all: Vec<String> = Vec::new();

    let keep = |path: &str| !excludes.is_match(path) && eligible.is_eligible(path);

    for change in changes {
        match change.change_type {
            ChangeType::Added => {
                if keep(&change.path) {
                    delta.added.push(change.path.clone());
                    all.push(change.path.clone());
                }
            }
            ChangeType::Modified | ChangeType::TypeChanged => {
                if keep(&change.path) {
                    delta.modified.push(change.path.clone());
                    all.push(change.path.clone());
                }
            }
            ChangeType::Deleted => {
                delta.deleted.push(change.path.clone());
                all.push(change.path.clone());
            }
            ChangeType::Copied => {
                if keep(&change.path) {
                    delta.added.push(change.path.clone());
                    all.push(change.path.clone());
                }
            }
            ChangeType::Renamed => {
                let old_path = change.old_path.clone().unwrap_or_else(|| change.path.clone());
                if keep(&change.path) {
                    delta.renamed.insert(old_path.clone(), change.path.clone());
                    all.push(old_path);
                    all.push(change.path.clone());
                } else {
                    delta.deleted.push(old_path.clone());
                    all.push(old_path);
                }
            }
        }
    }

    delta.added.sort();
    delta.modified.sort();
    delta.deleted.sort();
    delta.deleted.dedup();
    all.sort();
    all.dedup();
    delta.all = all;
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysEligible;
    impl EligibilityCheck for AlwaysEligible {
        fn is_eligible(&self, _path: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_unquote_git_path() {
        assert_eq!(unquote_git_path("\"a\\nb\""), "a\nb");
        assert_eq!(unquote_git_path("\"a\\tb\""), "a\tb");
        assert_eq!(unquote_git_path("plain/path.rs"), "plain/path.rs");
    }

    #[test]
    fn test_filter_delta_rename_to_excluded_becomes_deletion() {
        let changes = vec![ChangedFile {
            path: "generated/x.go".to_string(),
            old_path: Some("old/x.go".to_string()),
            change_type: ChangeType::Renamed,
        }];
        let excludes = GlobSet::new(vec!["generated/**".to_string()]);
        let delta = filter_delta(&changes, &excludes, &AlwaysEligible);
        assert_eq!(delta.deleted, vec!["old/x.go".to_string()]);
        assert!(delta.renamed.is_empty());
    }

    #[test]
    fn test_filter_delta_plain_rename_kept() {
        let changes = vec![ChangedFile {
            path: "new/x.go".to_string(),
            old_path: Some("old/x.go".to_string()),
            change_type: ChangeType::Renamed,
        }];
        let excludes = GlobSet::new(vec![]);
        let delta = filter_delta(&changes, &excludes, &AlwaysEligible);
        assert_eq!(
            delta.renamed.get("old/x.go"),
            Some(&"new/x.go".to_string())
        );
        assert!(delta.all.contains(&"old/x.go".to_string()));
        assert!(delta.all.contains(&"new/x.go".to_string()));
    }

    #[test]
    fn test_filter_delta_sorted_deterministic() {
        let changes = vec![
            ChangedFile {
                path: "b.go".to_string(),
                old_path: None,
                change_type: ChangeType::Added,
            },
            ChangedFile {
                path: "a.go".to_string(),
                old_path: None,
                change_type: ChangeType::Added,
            },
        ];
        let excludes = GlobSet::new(vec![]);
        let delta = filter_delta(&changes, &excludes, &AlwaysEligible);
        assert_eq!(delta.added, vec!["a.go".to_string(), "b.go".to_string()]);
    }
}
