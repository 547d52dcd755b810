use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use pixy_agent_core::AgentToolResult;
use pixy_ai::{PiAiError, PiAiErrorCode};
use serde_json::{json, Value};

pub(super) const DEFAULT_MAX_LINES: usize = 2000;
pub(super) const DEFAULT_MAX_BYTES: usize = 128 * 1024;

pub(super) struct TruncateResult {
    pub content: String,
    pub output_lines: usize,
    pub total_lines: usize,
    pub truncated: bool,
}

pub(super) fn truncate_head(content: &str, max_lines: usize, max_bytes: usize) -> TruncateResult {
    let total_lines = content.lines().count().max(1);
    let mut lines: Vec<&str> = content.split('\n').collect();
    let mut truncated = false;

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        truncated = true;
    }

    let mut output = lines.join("\n");
    if output.len() > max_bytes {
        output = truncate_prefix_bytes(&output, max_bytes);
        truncated = true;
    }

    let output_lines = if output.is_empty() {
        0
    } else {
        output.lines().count()
    };

    TruncateResult {
        content: output,
        output_lines,
        total_lines,
        truncated,
    }
}

fn truncate_prefix_bytes(content: &str, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content.to_string();
    }

    let mut end = max_bytes;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    content[..end].to_string()
}

/// Resolve `file_path` against `root` and refuse anything that lands
/// outside it, including escapes through `..` or symlinked ancestors.
pub(super) fn resolve_in_root(root: &Path, file_path: &str) -> Result<PathBuf, PiAiError> {
    let normalized = file_path.strip_prefix('@').unwrap_or(file_path);
    let requested = Path::new(normalized);
    let root = absolute(root);
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };
    let lexical = normalize_lexically(&joined);

    let inside = match (
        canonicalize_existing_prefix(&root),
        canonicalize_existing_prefix(&lexical),
    ) {
        (Some(root_real), Some(target_real)) => target_real.starts_with(&root_real),
        _ => false,
    };
    if !inside {
        return Err(PiAiError::new(
            PiAiErrorCode::PathOutsideRoot,
            format!(
                "Path {file_path} is outside the allowed directory {}",
                root.display()
            ),
        )
        .with_details(json!({
            "path": file_path,
            "root": root.display().to_string(),
        })));
    }
    Ok(lexical)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_lexically(path);
    }
    let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    normalize_lexically(&base.join(path))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

const MAX_SYMLINK_HOPS: usize = 40;

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// components that do not exist yet. Dangling symlinks are followed through
/// `read_link`. `None` when links do not settle within `MAX_SYMLINK_HOPS`.
fn canonicalize_existing_prefix(path: &Path) -> Option<PathBuf> {
    resolve_real_path(path, 0)
}

fn resolve_real_path(path: &Path, hops: usize) -> Option<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut missing = Vec::new();
    loop {
        if let Ok(real) = existing.canonicalize() {
            return Some(append_components(real, &missing));
        }
        let is_symlink = fs::symlink_metadata(&existing)
            .map(|metadata| metadata.file_type().is_symlink())
            .unwrap_or(false);
        if is_symlink {
            if hops >= MAX_SYMLINK_HOPS {
                return None;
            }
            let target = fs::read_link(&existing).ok()?;
            let base = existing.parent().unwrap_or_else(|| Path::new("/"));
            let followed = append_components(normalize_lexically(&base.join(target)), &missing);
            return resolve_real_path(&followed, hops + 1);
        }
        match (existing.file_name().map(ToOwned::to_owned), existing.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name);
                existing = parent.to_path_buf();
            }
            _ => return Some(path.to_path_buf()),
        }
    }
}

fn append_components(mut base: PathBuf, missing: &[OsString]) -> PathBuf {
    for component in missing.iter().rev() {
        base.push(component);
    }
    base
}

pub(super) fn get_required_string(args: &Value, key: &str) -> Result<String, PiAiError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(|value| value.to_string())
        .ok_or_else(|| invalid_tool_args(format!("Missing or invalid `{key}`")))
}

pub(super) fn get_optional_usize(args: &Value, key: &str) -> Result<Option<usize>, PiAiError> {
    match args.get(key) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(value) => {
            if let Some(raw) = value.as_u64() {
                return usize::try_from(raw)
                    .map(Some)
                    .map_err(|_| invalid_tool_args(format!("`{key}` is too large")));
            }
            if value.as_i64().is_some_and(|raw| raw < 0) {
                return Err(invalid_tool_args(format!("`{key}` must be >= 0")));
            }
            Err(invalid_tool_args(format!("Missing or invalid `{key}`")))
        }
    }
}

pub(super) fn invalid_tool_args(message: impl Into<String>) -> PiAiError {
    PiAiError::new(PiAiErrorCode::ToolArgumentsInvalid, message.into())
}

pub(super) fn tool_execution_failed(message: impl Into<String>) -> PiAiError {
    PiAiError::new(PiAiErrorCode::ToolExecutionFailed, message.into())
}

pub(super) fn text_result(text: String, details: Value) -> AgentToolResult {
    AgentToolResult::text(text, details)
}

pub(super) fn first_changed_line(before: &str, after: &str) -> Option<usize> {
    let before_lines: Vec<&str> = before.split('\n').collect();
    let after_lines: Vec<&str> = after.split('\n').collect();
    let common = before_lines.len().min(after_lines.len());

    for index in 0..common {
        if before_lines[index] != after_lines[index] {
            return Some(index + 1);
        }
    }
    if before_lines.len() != after_lines.len() {
        return Some(common + 1);
    }
    None
}

pub(super) fn line_change_counts(before: &str, after: &str) -> (usize, usize) {
    let mut before_map = line_multiset(before);
    let after_map = line_multiset(after);
    let mut added = 0usize;
    let mut removed = 0usize;

    for (line, after_count) in after_map {
        match before_map.remove(&line) {
            Some(before_count) if after_count >= before_count => {
                added = added.saturating_add(after_count - before_count);
            }
            Some(before_count) => {
                removed = removed.saturating_add(before_count - after_count);
            }
            None => {
                added = added.saturating_add(after_count);
            }
        }
    }

    for (_, before_count) in before_map {
        removed = removed.saturating_add(before_count);
    }

    (added, removed)
}

/// One-line change summary, e.g. `memory/MEMORY.md | +3 -1`.
pub(super) fn format_change_summary(path: &str, before: &str, after: &str) -> String {
    let (added, removed) = line_change_counts(before, after);
    format!("{path} | +{added} -{removed}")
}

fn line_multiset(content: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for line in content.lines() {
        *counts.entry(line).or_insert(0) += 1;
    }
    counts
}
