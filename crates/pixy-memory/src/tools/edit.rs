use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use pixy_agent_core::{AgentTool, AgentToolExecutor, AgentToolResult};
use pixy_ai::PiAiError;
use serde_json::{json, Value};

use super::common::{
    first_changed_line, format_change_summary, get_required_string, invalid_tool_args,
    line_change_counts, resolve_in_root, text_result, tool_execution_failed,
};

pub fn create_edit_file_tool(root: impl AsRef<Path>) -> AgentTool {
    let root = root.as_ref().to_path_buf();
    AgentTool {
        name: "edit_file".to_string(),
        label: "edit_file".to_string(),
        description: "Replace exactly one unique text fragment in a memory file.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path to edit, absolute or relative to the workspace." },
                "old_text": { "type": "string", "description": "Exact original text to replace. Must be unique in the file." },
                "new_text": { "type": "string", "description": "Replacement text." }
            },
            "required": ["path", "old_text", "new_text"],
            "additionalProperties": false
        }),
        execute: Arc::new(EditFileExecutor { root }),
    }
}

struct EditFileExecutor {
    root: PathBuf,
}

#[async_trait]
impl AgentToolExecutor for EditFileExecutor {
    async fn execute(&self, _tool_call_id: String, args: Value) -> Result<AgentToolResult, PiAiError> {
        edit_file(&self.root, args)
    }
}

fn edit_file(root: &Path, args: Value) -> Result<AgentToolResult, PiAiError> {
    let path = get_required_string(&args, "path")?;
    let old_text = get_required_string(&args, "old_text")?;
    let new_text = get_required_string(&args, "new_text")?;
    if old_text.is_empty() {
        return Err(invalid_tool_args("`old_text` must not be empty"));
    }

    let absolute_path = resolve_in_root(root, &path)?;
    let content = fs::read_to_string(&absolute_path)
        .map_err(|error| tool_execution_failed(format!("Failed to read {path}: {error}")))?;
    match content.matches(&old_text).count() {
        0 => {
            return Err(tool_execution_failed(format!(
                "Could not find the exact text in {path}. The old text must match exactly."
            )))
        }
        1 => {}
        occurrences => {
            return Err(tool_execution_failed(format!(
                "Found {occurrences} occurrences of the text in {path}. The text must be unique."
            )))
        }
    }

    let updated = content.replacen(&old_text, &new_text, 1);
    if updated == content {
        return Err(tool_execution_failed(format!(
            "No changes made to {path}. The replacement produced identical content."
        )));
    }

    fs::write(&absolute_path, updated.as_bytes())
        .map_err(|error| tool_execution_failed(format!("Failed to write {path}: {error}")))?;
    let (insertions, deletions) = line_change_counts(&content, &updated);
    Ok(text_result(
        format_change_summary(&path, &content, &updated),
        json!({
            "path": path,
            "firstChangedLine": first_changed_line(&content, &updated),
            "insertions": insertions,
            "deletions": deletions,
        }),
    ))
}
