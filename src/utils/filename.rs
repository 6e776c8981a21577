use crate::utils::constants::{
    ABSTRACT_POINT_MARKER, GEOMETRY_EXTENSION, LABEL_POINT_MARKER, MERGE_OUTPUT_SUFFIX,
};
use std::path::{Component, Path};

/// Prefix token: the first `len` characters of the base name, alphabetic only, lowercased.
pub fn prefix_token(base_name: &str, len: usize) -> String {
    base_name
        .chars()
        .take(len)
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Suffix token: a label/abstract point marker if present, else the last character lowercased.
pub fn suffix_token(base_name: &str) -> Option<String> {
    if base_name.contains(LABEL_POINT_MARKER) {
        return Some(LABEL_POINT_MARKER.to_string());
    }
    if base_name.contains(ABSTRACT_POINT_MARKER) {
        return Some(ABSTRACT_POINT_MARKER.to_string());
    }
    base_name
        .chars()
        .last()
        .map(|c| c.to_lowercase().collect())
}

pub fn has_extension_ignore_case(file_name: &str, extension: &str) -> bool {
    file_name.len() > extension.len()
        && file_name
            .get(file_name.len() - extension.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(extension))
}

/// Geometry file whose name starts with the given domain token (both case-insensitive).
pub fn is_domain_geometry(file_name: &str, token: &str) -> bool {
    has_extension_ignore_case(file_name, GEOMETRY_EXTENSION)
        && file_name
            .get(..token.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(token))
}

/// Attribute table key for a layer filename: token plus the first `digits` digits.
pub fn attribute_table_key(file_name: &str, token: &str, digits: usize) -> String {
    let extracted: String = file_name
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(digits)
        .collect();
    format!("{}{}", token.to_lowercase(), extracted)
}

/// Key with the digit run's leading zeros dropped, so `api001` and `api0001` agree.
pub fn canonical_table_key(key: &str) -> String {
    let split = key
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(key.len());
    let (token, digits) = key.split_at(split);
    let trimmed = digits.trim_start_matches('0');
    if digits.is_empty() {
        token.to_lowercase()
    } else if trimmed.is_empty() {
        format!("{}0", token.to_lowercase())
    } else {
        format!("{}{}", token.to_lowercase(), trimmed)
    }
}

/// Output filename for a folder merge: `<parent-of-parent>-<parent>_Merge.shp`.
pub fn merge_output_file_name(dir: &Path) -> String {
    let last = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = dir
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "{}-{}{}{}",
        parent, last, MERGE_OUTPUT_SUFFIX, GEOMETRY_EXTENSION
    )
}

/// Layer name for a merge-output folder: the path segments between the root and the
/// folder (excluding the folder itself) joined by `_`, hyphens replaced by `_`.
/// A folder directly under the root is named after the root.
pub fn layer_name(root: &Path, merged_dir: &Path) -> String {
    let segments: Vec<String> = merged_dir
        .strip_prefix(root)
        .ok()
        .map(|relative| {
            relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let parts = match segments.split_last() {
        Some((_, parents)) if !parents.is_empty() => parents.to_vec(),
        _ => vec![root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string())],
    };

    parts.join("_").replace('-', "_")
}
