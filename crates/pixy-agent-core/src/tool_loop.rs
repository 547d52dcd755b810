use std::fmt::{Display, Formatter};
use std::time::Instant;

use pixy_ai::{
    now_millis, validate_tool_call, AssistantMessage, ChatProvider, Context, Message, PiAiError,
    PiAiErrorCode, ToolCall, ToolResultContentBlock,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::types::{AgentMessage, AgentTool, AgentToolResult, ToolLoopConfig, ToolLoopMetrics};

/// How a bounded tool loop ended when the provider never failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolLoopOutcome {
    /// The provider answered without tool calls.
    Completed { final_message: AssistantMessage },
    /// Every allowed iteration still requested tools.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct ToolLoopRun {
    pub outcome: ToolLoopOutcome,
    pub messages: Vec<AgentMessage>,
    pub metrics: ToolLoopMetrics,
}

/// A provider request failed; the loop stopped at that point.
#[derive(Debug, Clone)]
pub struct ToolLoopFailure {
    pub error: PiAiError,
    pub metrics: ToolLoopMetrics,
}

impl Display for ToolLoopFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error.message)
    }
}

impl std::error::Error for ToolLoopFailure {}

enum LoopState {
    Running { iteration: usize },
    Completed(AssistantMessage),
    Exhausted,
}

/// Drive `provider` until it stops requesting tools or `max_iterations`
/// completions have been requested.
///
/// Tool calls of one assistant turn run strictly in emitted order; each
/// produces one tool-result message tagged with the originating call id.
/// Tool failures are reported back to the provider as error text and never
/// end the loop. Only a provider error does.
pub async fn run_tool_loop(
    provider: &dyn ChatProvider,
    system_prompt: impl Into<String>,
    prompts: Vec<AgentMessage>,
    tools: &[AgentTool],
    config: &ToolLoopConfig,
) -> Result<ToolLoopRun, ToolLoopFailure> {
    ToolLoopRunner::new(system_prompt.into(), prompts, tools, config)
        .run(provider)
        .await
}

struct ToolLoopRunner<'a> {
    context: Context,
    tools: &'a [AgentTool],
    max_iterations: usize,
    metrics: ToolLoopMetrics,
}

impl<'a> ToolLoopRunner<'a> {
    fn new(
        system_prompt: String,
        prompts: Vec<AgentMessage>,
        tools: &'a [AgentTool],
        config: &ToolLoopConfig,
    ) -> Self {
        Self {
            context: Context {
                system_prompt: Some(system_prompt),
                messages: prompts,
                tools: Some(tools.iter().map(AgentTool::to_llm_tool).collect()),
            },
            tools,
            max_iterations: config.max_iterations,
            metrics: ToolLoopMetrics::default(),
        }
    }

    async fn run(mut self, provider: &dyn ChatProvider) -> Result<ToolLoopRun, ToolLoopFailure> {
        let mut state = LoopState::Running { iteration: 0 };
        loop {
            state = match state {
                LoopState::Running { iteration } if iteration >= self.max_iterations => {
                    LoopState::Exhausted
                }
                LoopState::Running { iteration } => self.step(provider, iteration).await?,
                LoopState::Completed(final_message) => {
                    return Ok(self.finish(ToolLoopOutcome::Completed { final_message }));
                }
                LoopState::Exhausted => {
                    warn!(
                        max_iterations = self.max_iterations,
                        provider_requests = self.metrics.provider_request_count,
                        "tool loop reached max iterations"
                    );
                    return Ok(self.finish(ToolLoopOutcome::Exhausted));
                }
            };
        }
    }

    async fn step(
        &mut self,
        provider: &dyn ChatProvider,
        iteration: usize,
    ) -> Result<LoopState, ToolLoopFailure> {
        let started = Instant::now();
        self.metrics.provider_request_count += 1;
        let response = match provider.complete(&self.context).await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    iteration = iteration + 1,
                    error_code = ?error.code,
                    error = error.message.as_str(),
                    "provider request failed"
                );
                return Err(ToolLoopFailure {
                    error,
                    metrics: self.metrics.clone(),
                });
            }
        };
        debug!(
            iteration = iteration + 1,
            duration_ms = started.elapsed().as_millis() as u64,
            has_tool_calls = response.has_tool_calls(),
            "provider response received"
        );

        let tool_calls = response.extract_tool_calls();
        if tool_calls.is_empty() {
            self.context.messages.push(response.clone().into_message());
            return Ok(LoopState::Completed(response));
        }

        self.context.messages.push(response.into_message());
        for tool_call in tool_calls {
            let message = self.execute_tool_call(tool_call).await;
            self.context.messages.push(message);
        }
        Ok(LoopState::Running {
            iteration: iteration + 1,
        })
    }

    async fn execute_tool_call(&mut self, tool_call: ToolCall) -> AgentMessage {
        let started = Instant::now();
        let execution = self.dispatch(&tool_call).await;
        let (result, is_error) = match execution {
            Ok(result) => (result, false),
            Err(error) => (tool_error_result(error), true),
        };
        self.metrics.tool_execution_count += 1;
        if is_error {
            self.metrics.tool_error_count += 1;
        }
        debug!(
            tool_call_id = tool_call.id.as_str(),
            tool_name = tool_call.name.as_str(),
            duration_ms = started.elapsed().as_millis() as u64,
            is_error,
            "tool execution finished"
        );

        Message::ToolResult {
            tool_call_id: tool_call.id,
            tool_name: tool_call.name,
            content: result.content,
            details: Some(result.details),
            is_error,
            timestamp: now_millis(),
        }
    }

    async fn dispatch(&self, tool_call: &ToolCall) -> Result<AgentToolResult, PiAiError> {
        let definitions = self.context.tools.as_deref().unwrap_or_default();
        let args = validate_tool_call(definitions, tool_call)?;
        let Some(tool) = self.tools.iter().find(|tool| tool.name == tool_call.name) else {
            return Err(PiAiError::new(
                PiAiErrorCode::ToolNotFound,
                format!("Tool '{}' not found", tool_call.name),
            ));
        };
        tool.execute.execute(tool_call.id.clone(), args).await
    }

    fn finish(self, outcome: ToolLoopOutcome) -> ToolLoopRun {
        ToolLoopRun {
            outcome,
            messages: self.context.messages,
            metrics: self.metrics,
        }
    }
}

fn tool_error_result(error: PiAiError) -> AgentToolResult {
    AgentToolResult {
        content: vec![ToolResultContentBlock::Text {
            text: format!("Error: {}", error.message),
        }],
        details: json!({
            "code": error.code,
            "details": error.details,
        }),
    }
}
