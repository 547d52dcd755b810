//! Tool capability and bounded tool-calling loop built on top of `pixy-ai`.

mod tool_loop;
mod types;

pub use tool_loop::{run_tool_loop, ToolLoopFailure, ToolLoopOutcome, ToolLoopRun};
pub use types::{
    AgentMessage, AgentTool, AgentToolExecuteFn, AgentToolExecutor, AgentToolResult,
    ToolFuture, ToolLoopConfig, ToolLoopMetrics,
};
