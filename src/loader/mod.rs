//! Repo Loader (spec §4.1, C1)
//!
//! Materializes a working tree (clone or local), walks it, applies glob
//! exclusions, binary/size filtering, and language detection.

pub mod git_source;
pub mod glob;

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CieError, Result};
use crate::lang::Lang;
use glob::GlobSet;

/// First-8-KiB NUL sniff threshold for binary detection (spec §4.1).
const BINARY_SNIFF_BYTES: usize = 8 * 1024;

/// Sensitive local roots that may never be ingested (spec §4.1).
const SENSITIVE_ROOTS: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot", "/root"];

/// Tagged load source, mirroring [`crate::config::SourceSpec`] at the
/// loader's contract boundary.
#[derive(Debug, Clone)]
pub enum Source {
    GitUrl(String),
    LocalPath(PathBuf),
}

/// A single discovered, eligible source file.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub language: Lang,
    pub size: u64,
}

/// Result of `Load`: the resolved root, eligible files, and a tally of
/// why files were skipped.
pub struct LoadResult {
    pub root_path: PathBuf,
    pub files: Vec<LoadedFile>,
    pub skip_reasons: BTreeMap<String, usize>,
    /// Present only when `source` was a git URL; the caller must remove
    /// this directory on `Close`.
    pub temp_dir: Option<PathBuf>,
}

impl LoadResult {
    /// Release resources acquired during `Load` (temp clone directories).
    pub fn close(&mut self) -> Result<()> {
        if let Some(dir) = self.temp_dir.take() {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}

impl Drop for LoadResult {
    fn drop(&mut self) {
        if let Some(dir) = self.temp_dir.take() {
            let _ = fs::remove_dir_all(&dir);
        }
    }
}

/// `Load(source, excludes, maxFileSize) → {rootPath, files[], skipReasons{}}`.
pub fn load(source: &Source, excludes: &[String], max_file_size: u64) -> Result<LoadResult> {
    let (root_path, temp_dir) = match source {
        Source::GitUrl(url) => {
            let dir = git_source::shallow_clone(url)?;
            (dir.clone(), Some(dir))
        }
        Source::LocalPath(path) => (resolve_local_path(path)?, None),
    };

    let exclude_set = GlobSet::new(excludes.to_vec());
    let mut files = Vec::new();
    let mut skip_reasons: BTreeMap<String, usize> = BTreeMap::new();

    walk(&root_path, &root_path, &exclude_set, max_file_size, &mut files, &mut skip_reasons);

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    Ok(LoadResult {
        root_path,
        files,
        skip_reasons,
        temp_dir,
    })
}

fn resolve_local_path(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let cleaned = clean_path(&absolute);

    if cleaned.components().any(|c| c.as_os_str() == "..") {
        return Err(CieError::PathRejected {
            path: cleaned.display().to_string(),
            reason: "contains .. after cleaning".to_string(),
        });
    }

    let cleaned_str = cleaned.to_string_lossy();
    for root in SENSITIVE_ROOTS {
        if cleaned_str == *root || cleaned_str.starts_with(&format!("{root}/")) {
            return Err(CieError::PathRejected {
                path: cleaned.display().to_string(),
                reason: format!("sensitive root {root}"),
            });
        }
    }

    Ok(cleaned)
}

/// Lexically clean a path: resolve `.` and `..` components without
/// touching the filesystem (the path may not exist yet in tests).
fn clean_path(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for component in path.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                if matches!(out.last(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push(component);
                }
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.into_iter().collect()
}

fn walk(
    root: &Path,
    dir: &Path,
    excludes: &GlobSet,
    max_file_size: u64,
    files: &mut Vec<LoadedFile>,
    skip_reasons: &mut BTreeMap<String, usize>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "unreadable directory entry, skipping");
            *skip_reasons.entry("unreadable_dir".to_string()).or_insert(0) += 1;
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let path = entry.path();
        let relative = match path.strip_prefix(root) {
            Ok(r) => r.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };

        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };

        if file_type.is_symlink() {
            *skip_reasons.entry("symlink".to_string()).or_insert(0) += 1;
            continue;
        }

        if excludes.is_match(&relative) {
            *skip_reasons.entry("excluded".to_string()).or_insert(0) += 1;
            continue;
        }

        if file_type.is_dir() {
            walk(root, &path, excludes, max_file_size, files, skip_reasons);
            continue;
        }

        if !file_type.is_file() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };
        let size = metadata.len();

        if size > max_file_size {
            *skip_reasons.entry("too_large".to_string()).or_insert(0) += 1;
            continue;
        }

        if is_binary(&path) {
            *skip_reasons.entry("binary".to_string()).or_insert(0) += 1;
            continue;
        }

        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e,
            None => {
                *skip_reasons.entry("no_extension".to_string()).or_insert(0) += 1;
                continue;
            }
        };

        let language = match Lang::from_extension(ext) {
            Ok(l) => l,
            Err(_) => {
                *skip_reasons
                    .entry("unsupported_language".to_string())
                    .or_insert(0) += 1;
                continue;
            }
        };

        debug!(path = %relative, language = language.name(), "discovered file");
        files.push(LoadedFile {
            relative_path: relative,
            absolute_path: path,
            language,
            size,
        });
    }
}

/// Binary sniff: NUL byte in the first 8 KiB ⇒ treated as binary.
fn is_binary(path: &Path) -> bool {
    let Ok(mut file) = fs::File::open(path) else {
        return false;
    };
    let mut buf = vec![0u8; BINARY_SNIFF_BYTES];
    let Ok(n) = file.read(&mut buf) else {
        return false;
    };
    buf[..n].contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_clean_path_collapses_parent_dirs() {
        let cleaned = clean_path(Path::new("/a/b/../c"));
        assert_eq!(cleaned, PathBuf::from("/a/c"));
    }

    #[test]
    fn test_resolve_local_path_rejects_sensitive_root() {
        let err = resolve_local_path(Path::new("/etc/passwd")).unwrap_err();
        matches!(err, CieError::PathRejected { .. });
    }

    #[test]
    fn test_is_binary_detects_nul_byte() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin.dat");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"abc\0def").unwrap();
        assert!(is_binary(&path));
    }

    #[test]
    fn test_is_binary_false_for_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("text.go");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"package main\n").unwrap();
        assert!(!is_binary(&path));
    }

    #[test]
    fn test_load_walks_and_filters() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.go"), "package main\n").unwrap();
        fs::create_dir(dir.path().join("generated")).unwrap();
        fs::write(dir.path().join("generated/skip.go"), "package main\n").unwrap();

        let result = load(
            &Source::LocalPath(dir.path().to_path_buf()),
            &["generated/**".to_string()],
            1024 * 1024,
        )
        .unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].relative_path, "main.go");
    }
}
