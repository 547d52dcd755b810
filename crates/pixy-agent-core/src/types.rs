use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use pixy_ai::{Message, PiAiError, Tool, ToolResultContentBlock};
use serde_json::Value;

pub type AgentMessage = Message;

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<AgentToolResult, PiAiError>> + Send>>;

#[async_trait]
pub trait AgentToolExecutor: Send + Sync {
    async fn execute(&self, tool_call_id: String, args: Value)
        -> Result<AgentToolResult, PiAiError>;
}

#[async_trait]
impl<F> AgentToolExecutor for F
where
    F: Fn(String, Value) -> ToolFuture + Send + Sync + 'static,
{
    async fn execute(
        &self,
        tool_call_id: String,
        args: Value,
    ) -> Result<AgentToolResult, PiAiError> {
        (self)(tool_call_id, args).await
    }
}

pub type AgentToolExecuteFn = Arc<dyn AgentToolExecutor>;

#[derive(Clone)]
pub struct AgentTool {
    pub name: String,
    pub label: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub execute: AgentToolExecuteFn,
}

impl AgentTool {
    pub fn to_llm_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentToolResult {
    pub content: Vec<ToolResultContentBlock>,
    pub details: Value,
}

impl AgentToolResult {
    pub fn text(text: impl Into<String>, details: Value) -> Self {
        Self {
            content: vec![ToolResultContentBlock::Text { text: text.into() }],
            details,
        }
    }

    /// Concatenated text of all content blocks.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ToolResultContentBlock::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolLoopMetrics {
    pub provider_request_count: usize,
    pub tool_execution_count: usize,
    pub tool_error_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolLoopConfig {
    pub max_iterations: usize,
}

impl Default for ToolLoopConfig {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}
