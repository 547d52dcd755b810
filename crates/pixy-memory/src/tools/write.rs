use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use pixy_agent_core::{AgentTool, AgentToolExecutor, AgentToolResult};
use pixy_ai::PiAiError;
use serde_json::{json, Value};

use super::common::{
    format_change_summary, get_required_string, line_change_counts, resolve_in_root,
    text_result, tool_execution_failed,
};

pub fn create_write_file_tool(root: impl AsRef<Path>) -> AgentTool {
    let root = root.as_ref().to_path_buf();
    AgentTool {
        name: "write_file".to_string(),
        label: "write_file".to_string(),
        description: "Write the full content of a memory file, creating parent directories if needed."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path to write, absolute or relative to the workspace." },
                "content": { "type": "string", "description": "Full file content to write." }
            },
            "required": ["path", "content"],
            "additionalProperties": false
        }),
        execute: Arc::new(WriteFileExecutor { root }),
    }
}

struct WriteFileExecutor {
    root: PathBuf,
}

#[async_trait]
impl AgentToolExecutor for WriteFileExecutor {
    async fn execute(&self, _tool_call_id: String, args: Value) -> Result<AgentToolResult, PiAiError> {
        write_file(&self.root, args)
    }
}

fn write_file(root: &Path, args: Value) -> Result<AgentToolResult, PiAiError> {
    let path = get_required_string(&args, "path")?;
    let content = get_required_string(&args, "content")?;
    let absolute_path = resolve_in_root(root, &path)?;
    let previous_content = fs::read(&absolute_path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            tool_execution_failed(format!("Failed to create parent directories: {error}"))
        })?;
    }

    fs::write(&absolute_path, &content)
        .map_err(|error| tool_execution_failed(format!("Failed to write {path}: {error}")))?;
    let (insertions, deletions) = line_change_counts(&previous_content, &content);
    Ok(text_result(
        format_change_summary(&path, &previous_content, &content),
        json!({
            "path": path,
            "bytes": content.len(),
            "insertions": insertions,
            "deletions": deletions,
        }),
    ))
}
