use crate::error::Result;
use crate::utils::filename::has_extension_ignore_case;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Move every named file from `source_dir` into `dest_dir` as one unit.
///
/// Files are renamed one at a time; if any rename fails, the files already moved
/// are renamed back before the error is returned.
pub fn relocate_files(source_dir: &Path, dest_dir: &Path, file_names: &[&str]) -> Result<Vec<PathBuf>> {
    let mut moved: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(file_names.len());

    for file_name in file_names {
        let from = source_dir.join(file_name);
        let to = dest_dir.join(file_name);
        if let Err(e) = fs::rename(&from, &to) {
            for (original, relocated) in moved.iter().rev() {
                if let Err(rollback) = fs::rename(relocated, original) {
                    tracing::error!(
                        "Rollback failed for {}: {}",
                        relocated.display(),
                        rollback
                    );
                }
            }
            return Err(e.into());
        }
        moved.push((from, to));
    }

    Ok(moved.into_iter().map(|(_, to)| to).collect())
}

/// Files directly inside `dir` whose name ends with `extension` (case-insensitive),
/// sorted by filename.
pub fn list_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| has_extension_ignore_case(n, extension));
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Names of the regular files directly inside `dir`.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Every entry under `root` in sorted top-down order. Directories named `skip_dir`
/// (case-insensitive) are neither returned nor descended into. An unreadable root is
/// an error; unreadable entries below it are logged and skipped.
pub fn walk_sorted(root: &Path, skip_dir: Option<&str>) -> Result<Vec<DirEntry>> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() > 0
                && e.file_type().is_dir()
                && skip_dir.is_some_and(|name| e.file_name().to_string_lossy().eq_ignore_ascii_case(name)))
        });

    let mut entries = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => tracing::warn!("Skipping unreadable entry: {}", e),
        }
    }
    Ok(entries)
}

/// Path with the same stem and a different extension (`extension` includes the dot).
pub fn sibling_with_extension(path: &Path, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, extension))
}

/// Existing sibling with the given extension in lower or upper case.
pub fn find_sibling(path: &Path, extension: &str) -> Option<PathBuf> {
    [extension.to_lowercase(), extension.to_uppercase()]
        .into_iter()
        .map(|ext| sibling_with_extension(path, &ext))
        .find(|candidate| candidate.is_file())
}
