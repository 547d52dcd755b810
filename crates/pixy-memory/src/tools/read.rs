use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use pixy_agent_core::{AgentTool, AgentToolExecutor, AgentToolResult};
use pixy_ai::PiAiError;
use serde_json::{json, Value};

use super::common::{
    get_optional_usize, get_required_string, invalid_tool_args, resolve_in_root, text_result,
    tool_execution_failed, truncate_head, DEFAULT_MAX_BYTES, DEFAULT_MAX_LINES,
};

pub fn create_read_file_tool(root: impl AsRef<Path>) -> AgentTool {
    let root = root.as_ref().to_path_buf();
    AgentTool {
        name: "read_file".to_string(),
        label: "read_file".to_string(),
        description: "Read a UTF-8 memory file. Supports offset/limit pagination.".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path to the file, absolute or relative to the workspace." },
                "offset": { "type": "integer", "minimum": 1, "description": "1-based start line offset." },
                "limit": { "type": "integer", "minimum": 1, "description": "Maximum number of lines to return." }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
        execute: Arc::new(ReadFileExecutor { root }),
    }
}

struct ReadFileExecutor {
    root: PathBuf,
}

#[async_trait]
impl AgentToolExecutor for ReadFileExecutor {
    async fn execute(&self, _tool_call_id: String, args: Value) -> Result<AgentToolResult, PiAiError> {
        let path = get_required_string(&args, "path")?;
        let offset = get_optional_usize(&args, "offset")?.unwrap_or(1);
        if offset == 0 {
            return Err(invalid_tool_args("`offset` must be >= 1"));
        }
        let limit = get_optional_usize(&args, "limit")?;
        if limit == Some(0) {
            return Err(invalid_tool_args("`limit` must be >= 1"));
        }

        let absolute_path = resolve_in_root(&self.root, &path)?;
        let bytes = fs::read(&absolute_path)
            .map_err(|error| tool_execution_failed(format!("Failed to read {path}: {error}")))?;
        let full_content = String::from_utf8_lossy(&bytes).into_owned();
        let all_lines: Vec<&str> = full_content.split('\n').collect();

        if offset > all_lines.len() {
            return Err(invalid_tool_args(format!(
                "Offset {offset} is beyond end of file ({} lines total)",
                all_lines.len()
            )));
        }

        let start_index = offset - 1;
        let end_index = match limit {
            Some(limit) => start_index.saturating_add(limit).min(all_lines.len()),
            None => all_lines.len(),
        };
        let selected = all_lines[start_index..end_index].join("\n");
        let truncation = truncate_head(&selected, DEFAULT_MAX_LINES, DEFAULT_MAX_BYTES);

        let mut output = truncation.content.clone();
        if output.is_empty() && full_content.is_empty() {
            output = "(empty file)".to_string();
        }

        if truncation.truncated {
            let shown_end = offset + truncation.output_lines.saturating_sub(1);
            output.push_str(&format!(
                "\n\n[Showing lines {offset}-{shown_end} of {}. Use offset={} to continue.]",
                all_lines.len(),
                shown_end + 1
            ));
        } else if end_index < all_lines.len() {
            output.push_str(&format!(
                "\n\n[{} more lines in file. Use offset={} to continue.]",
                all_lines.len() - end_index,
                end_index + 1
            ));
        }

        Ok(text_result(
            output,
            json!({
                "path": path,
                "offset": offset,
                "limit": limit,
                "totalLines": truncation.total_lines,
                "outputLines": truncation.output_lines,
                "truncated": truncation.truncated,
            }),
        ))
    }
}
