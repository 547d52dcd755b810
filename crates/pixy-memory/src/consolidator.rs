//! Consolidation of a batch of conversation turns into the memory notes.
//!
//! A consolidation run hands the batch to a chat provider together with the
//! sandboxed `read_file`, `write_file` and `edit_file` tools and lets it edit
//! `MEMORY.md` and today's daily note. The run is bounded by
//! [`ConsolidatorConfig::max_iterations`] completion requests and never
//! returns an error: every ending is reported as a [`ConsolidationOutcome`].

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pixy_agent_core::{run_tool_loop, AgentMessage, ToolLoopConfig, ToolLoopOutcome};
use pixy_ai::{ChatProviderRef, TimeoutProvider};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::memory::{MemoryArchive, MemoryConfig, MEMORY_DIR_NAME};
use crate::tools::create_memory_file_tools;

const SYSTEM_PROMPT: &str = "You are a memory consolidation agent. Process the conversation \
history you are given and keep the memory files up to date. Use the read_file, write_file \
and edit_file tools to inspect and change them.";

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// One turn of the conversation being consolidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(default = "unknown_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// ISO 8601 / RFC 3339 time the turn happened, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

fn unknown_role() -> String {
    "unknown".to_string()
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// How a consolidation run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsolidationOutcome {
    /// The batch was empty; the provider was not contacted.
    NothingToDo,
    /// The provider finished without requesting more tools.
    Completed { provider_requests: usize },
    /// Every allowed request still asked for tools.
    Exhausted { provider_requests: usize },
    /// A provider request failed.
    Failed {
        reason: String,
        provider_requests: usize,
    },
}

impl ConsolidationOutcome {
    pub fn provider_requests(&self) -> usize {
        match self {
            Self::NothingToDo => 0,
            Self::Completed { provider_requests }
            | Self::Exhausted { provider_requests }
            | Self::Failed {
                provider_requests, ..
            } => *provider_requests,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl Display for ConsolidationOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NothingToDo => f.write_str("No messages to consolidate"),
            Self::Completed { .. } => f.write_str("Memory consolidation completed"),
            Self::Exhausted { .. } => {
                f.write_str("Memory consolidation completed (max iterations reached)")
            }
            Self::Failed { reason, .. } => write!(f, "Memory consolidation failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidatorConfig {
    pub max_iterations: usize,
    /// Deadline for each completion request. There is no deadline for the
    /// run as a whole.
    pub request_timeout: Option<Duration>,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: ToolLoopConfig::default().max_iterations,
            request_timeout: None,
        }
    }
}

impl From<&MemoryConfig> for ConsolidatorConfig {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            max_iterations: config.consolidation_max_iterations,
            request_timeout: config.request_timeout(),
        }
    }
}

/// Drives a provider through a bounded tool loop to fold conversation turns
/// into the workspace's memory notes.
pub struct MemoryConsolidator {
    provider: ChatProviderRef,
    workspace: PathBuf,
    archive: MemoryArchive,
    config: ConsolidatorConfig,
}

impl MemoryConsolidator {
    pub fn new(provider: ChatProviderRef, workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        Self {
            provider,
            archive: MemoryArchive::new(workspace.join(MEMORY_DIR_NAME)),
            workspace,
            config: ConsolidatorConfig::default(),
        }
    }

    pub fn from_memory_config(provider: ChatProviderRef, config: &MemoryConfig) -> Self {
        Self::new(provider, config.workspace.clone()).with_config(ConsolidatorConfig::from(config))
    }

    pub fn with_config(mut self, config: ConsolidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn config(&self) -> &ConsolidatorConfig {
        &self.config
    }

    /// Consolidate `batch` and describe the result as text.
    pub async fn consolidate(&self, batch: &[ConversationTurn]) -> String {
        self.consolidate_outcome(batch).await.to_string()
    }

    pub async fn consolidate_outcome(&self, batch: &[ConversationTurn]) -> ConsolidationOutcome {
        self.consolidate_at(batch, MemoryArchive::today()).await
    }

    /// Consolidate `batch` as if the current local date were `today`.
    pub async fn consolidate_at(
        &self,
        batch: &[ConversationTurn],
        today: NaiveDate,
    ) -> ConsolidationOutcome {
        if batch.is_empty() {
            return ConsolidationOutcome::NothingToDo;
        }

        info!(
            turns = batch.len(),
            max_iterations = self.config.max_iterations,
            "starting memory consolidation"
        );
        let task = self.build_task_description(batch, today);
        let tools = create_memory_file_tools(&self.workspace);
        let provider = self.provider();
        let loop_config = ToolLoopConfig {
            max_iterations: self.config.max_iterations,
        };

        let run = run_tool_loop(
            provider.as_ref(),
            SYSTEM_PROMPT,
            vec![AgentMessage::user(task)],
            &tools,
            &loop_config,
        )
        .await;

        match run {
            Ok(run) => {
                let provider_requests = run.metrics.provider_request_count;
                match run.outcome {
                    ToolLoopOutcome::Completed { .. } => {
                        info!(
                            provider_requests,
                            tool_executions = run.metrics.tool_execution_count,
                            tool_errors = run.metrics.tool_error_count,
                            "memory consolidation completed"
                        );
                        ConsolidationOutcome::Completed { provider_requests }
                    }
                    ToolLoopOutcome::Exhausted => {
                        ConsolidationOutcome::Exhausted { provider_requests }
                    }
                }
            }
            Err(failure) => {
                error!(
                    error_code = ?failure.error.code,
                    error = failure.error.message.as_str(),
                    provider_requests = failure.metrics.provider_request_count,
                    "memory consolidation failed"
                );
                ConsolidationOutcome::Failed {
                    reason: failure.error.message,
                    provider_requests: failure.metrics.provider_request_count,
                }
            }
        }
    }

    fn provider(&self) -> ChatProviderRef {
        match self.config.request_timeout {
            Some(timeout) => Arc::new(TimeoutProvider::wrap(self.provider.clone(), timeout)),
            None => self.provider.clone(),
        }
    }

    /// The user task sent as the first turn of a consolidation run.
    pub fn build_task_description(&self, batch: &[ConversationTurn], today: NaiveDate) -> String {
        let today = today.format("%Y-%m-%d").to_string();
        let memory_file = self.archive.long_term_path();
        let memory_file = memory_file.display();
        let daily_file = self.archive.memory_dir().join(format!("{today}.md"));
        let daily_file = daily_file.display();
        let time_range = time_range(batch);
        let conversation = format_turns(batch);

        format!(
            "Process the batch of conversation turns below and update the memory files.

## Task Overview

1. Extract long-term information (user preferences, facts, project context, relationships) and record it in MEMORY.md under the appropriate sections
2. Summarize the conversation into event entries appended to today's daily note ({today}.md)

## Files to Update

- Long-term memory: {memory_file}
- Daily memory: {daily_file}

## Conversation Batch

Time Range: {time_range}

{conversation}

## Instructions

1. Read the current memory files:
   - Use read_file on {memory_file}
   - Try read_file on {daily_file} (it may not exist yet)

2. Extract long-term information:
   - Look for new user preferences, facts, project context or relationships
   - Use edit_file to add them to {memory_file} under the matching section headers
   - Only change MEMORY.md when there is genuinely new long-term information

3. Summarize conversation events:
   - Split the conversation into distinct events or topics
   - Keep each summary short but complete enough for later retrieval
   - Format each event as: `- [HH:MM-HH:MM] Event description`
   - If {daily_file} does not exist, create it with write_file, starting with the header `# {today}` followed by the entries
   - If it exists, use edit_file to append the new entries at the end

4. Keep daily notes in chronological order.

Execute these steps now."
        )
    }
}

/// Turns rendered one per line: `[HH:MM] ROLE: content` when the turn has
/// a parseable timestamp, `N. ROLE: content` otherwise.
pub fn format_turns(batch: &[ConversationTurn]) -> String {
    batch
        .iter()
        .enumerate()
        .map(|(index, turn)| {
            let role = turn.role.to_uppercase();
            match turn.parsed_timestamp() {
                Some(at) => format!("[{}] {role}: {}", at.format("%H:%M"), turn.content),
                None => format!("{}. {role}: {}", index + 1, turn.content),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `HH:MM-HH:MM` spanning the earliest and latest parseable timestamps, or
/// `Unknown time`.
pub fn time_range(batch: &[ConversationTurn]) -> String {
    let timestamps = batch
        .iter()
        .filter_map(ConversationTurn::parsed_timestamp)
        .collect::<Vec<_>>();
    match (timestamps.iter().min(), timestamps.iter().max()) {
        (Some(start), Some(end)) => {
            format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
        }
        _ => "Unknown time".to_string(),
    }
}

/// Wall-clock time of an RFC 3339 or naive ISO 8601 timestamp. Offsets are
/// kept as written rather than converted.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
