use std::sync::Arc;

use async_trait::async_trait;
use pixy_agent_core::{AgentTool, AgentToolExecutor, AgentToolResult};
use pixy_ai::PiAiError;
use serde_json::{json, Value};
use tracing::info;

use crate::memory::{MemoryArchive, MemoryConfig, SearchQuery, SearchResult};

pub const MEMORY_SEARCH_TOOL_NAME: &str = "memory_search";

/// Agent-facing search over the daily notes of one archive.
#[derive(Debug, Clone)]
pub struct MemorySearchTool {
    archive: Arc<MemoryArchive>,
    config: MemoryConfig,
}

impl MemorySearchTool {
    pub fn new(archive: Arc<MemoryArchive>, config: MemoryConfig) -> Self {
        Self { archive, config }
    }

    pub fn archive(&self) -> &MemoryArchive {
        &self.archive
    }

    pub fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keywords": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Keywords for exact, whole-word matching (case-insensitive). Use for simple, literal searches."
                },
                "regex_patterns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional regex patterns for flexible matching, e.g. '(volleyball|basketball)' or '(ticket|price).*\\$\\d+'. Patterns are validated for safety."
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return.",
                    "default": self.config.search_default_max_results,
                    "minimum": 1,
                    "maximum": self.config.search_max_results_cap
                }
            }
        })
    }

    /// Run a search and render the agent-facing text.
    pub fn search(
        &self,
        keywords: Vec<String>,
        regex_patterns: Vec<String>,
        max_results: Option<i64>,
    ) -> String {
        self.search_with_result(keywords, regex_patterns, max_results).0
    }

    fn search_with_result(
        &self,
        keywords: Vec<String>,
        regex_patterns: Vec<String>,
        max_results: Option<i64>,
    ) -> (String, SearchResult) {
        let query = SearchQuery::new(
            keywords,
            regex_patterns,
            self.config.clamp_max_results(max_results),
        );
        if query.is_empty() {
            return (
                "Error: No keywords or regex patterns provided".to_string(),
                SearchResult::default(),
            );
        }

        let result = self.archive.search_daily(&query);
        if let Some(error) = &result.listing_error {
            return (format!("Error: Failed to list memory files: {error}"), result);
        }
        if result.files_available == 0 {
            return ("No historical memory files found.".to_string(), result);
        }

        if result.is_empty() {
            let message = format!("No matches found for: {}", query.describe_terms());
            info!(result = message.as_str(), "memory search finished");
            return (message, result);
        }

        let mut output = format!("Found {} relevant memories:\n\n", result.len());
        for (index, hit) in result.hits.iter().enumerate() {
            output.push_str(&format!("{}. [{}] {}\n", index + 1, hit.file_name, hit.line));
        }
        info!(
            matches = result.len(),
            files = result.files_available,
            "memory search finished"
        );
        (output, result)
    }

    fn execute_args(&self, args: &Value) -> AgentToolResult {
        let parsed = string_list(args, "keywords").and_then(|keywords| {
            let patterns = string_list(args, "regex_patterns")?;
            let max_results = optional_integer(args, "max_results")?;
            Ok((keywords, patterns, max_results))
        });
        let (keywords, patterns, max_results) = match parsed {
            Ok(parsed) => parsed,
            Err(message) => {
                return AgentToolResult::text(format!("Error: {message}"), json!({ "count": 0 }));
            }
        };

        let (text, result) = self.search_with_result(keywords, patterns, max_results);
        let matches = result
            .hits
            .iter()
            .map(|hit| json!({ "file": hit.file_name, "line": hit.line }))
            .collect::<Vec<_>>();
        AgentToolResult::text(
            text,
            json!({
                "count": matches.len(),
                "filesSearched": result.files_available,
                "matches": matches,
            }),
        )
    }
}

/// Build the `memory_search` agent tool.
pub fn create_memory_search_tool(tool: MemorySearchTool) -> AgentTool {
    let parameters = tool.parameters();
    AgentTool {
        name: MEMORY_SEARCH_TOOL_NAME.to_string(),
        label: MEMORY_SEARCH_TOOL_NAME.to_string(),
        description: "Search historical conversation memories using keywords or regex patterns. \
Keywords match exactly; use regex_patterns for plurals, variants or alternatives. \
Use this to recall specific past conversations or information."
            .to_string(),
        parameters,
        execute: Arc::new(MemorySearchExecutor { tool }),
    }
}

struct MemorySearchExecutor {
    tool: MemorySearchTool,
}

#[async_trait]
impl AgentToolExecutor for MemorySearchExecutor {
    async fn execute(&self, _tool_call_id: String, args: Value) -> Result<AgentToolResult, PiAiError> {
        Ok(self.tool.execute_args(&args))
    }
}

fn string_list(args: &Value, key: &str) -> Result<Vec<String>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("`{key}` must contain only strings"))
            })
            .collect(),
        Some(_) => Err(format!("`{key}` must be an array of strings")),
    }
}

fn optional_integer(args: &Value, key: &str) -> Result<Option<i64>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            if let Some(number) = value.as_i64() {
                return Ok(Some(number));
            }
            if value.as_u64().is_some() {
                return Ok(Some(i64::MAX));
            }
            Err(format!("`{key}` must be an integer"))
        }
    }
}
