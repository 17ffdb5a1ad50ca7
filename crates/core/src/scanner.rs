//! Walks addon roots: module discovery and per-module file listing.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Directories produced by tooling rather than authored by the module.
const BUILD_ARTIFACT_DIRS: &[&str] = &["__pycache__"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Python,
    Markup,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "py" => Some(SourceKind::Python),
                "xml" => Some(SourceKind::Markup),
                _ => None,
            })
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// Immediate, non-hidden subdirectories of `root` as (module name, path), sorted by name.
pub fn module_dirs(root: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut modules = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() || is_hidden(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            modules.push((name.to_string(), path.clone()));
        }
    }
    modules.sort();
    Ok(modules)
}

/// Depth-first listing of the routable files below a module directory.
pub fn module_files(dir: &Path, excludes: &GlobSet) -> Vec<SourceFile> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || should_descend(e.path(), excludes))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable entry under {:?}: {}", dir, e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if let Some(kind) = SourceKind::from_path(path) {
            files.push(SourceFile {
                path: path.to_path_buf(),
                kind,
            });
        }
    }
    files
}

pub fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn should_descend(path: &Path, excludes: &GlobSet) -> bool {
    if is_hidden(path) || is_build_artifact(path) {
        return false;
    }
    !excludes.is_match(path)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn is_build_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| BUILD_ARTIFACT_DIRS.contains(&s))
        .unwrap_or(false)
}
