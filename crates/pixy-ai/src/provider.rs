use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::error::{PiAiError, PiAiErrorCode};
use crate::types::{AssistantMessage, Context};

/// Chat-completion capability: given a transcript and tool definitions,
/// return either plain content or a set of tool calls.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, context: &Context) -> Result<AssistantMessage, PiAiError>;
}

pub type ChatProviderRef = Arc<dyn ChatProvider>;

/// Bounds every completion request of the wrapped provider by a deadline.
pub struct TimeoutProvider {
    inner: ChatProviderRef,
    timeout: Duration,
}

impl TimeoutProvider {
    pub fn wrap(inner: ChatProviderRef, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ChatProvider for TimeoutProvider {
    async fn complete(&self, context: &Context) -> Result<AssistantMessage, PiAiError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(context)).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(timeout_ms, "completion request timed out");
                Err(PiAiError::new(
                    PiAiErrorCode::ProviderTimeout,
                    format!("completion request timed out after {timeout_ms}ms"),
                )
                .with_details(json!({ "timeoutMs": timeout_ms })))
            }
        }
    }
}
