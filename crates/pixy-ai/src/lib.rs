//! Provider-agnostic chat-completion types and the tool-call contract.

mod error;
mod provider;
mod types;
mod validation;

pub use error::{PiAiError, PiAiErrorCode};
pub use provider::{ChatProvider, ChatProviderRef, TimeoutProvider};
pub use types::{
    now_millis, AssistantContentBlock, AssistantMessage, Context, Message, StopReason, Tool,
    ToolResultContentBlock,
};
pub use validation::{validate_tool_arguments, validate_tool_call, ToolCall};
