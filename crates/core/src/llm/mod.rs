pub mod anthropic;
pub mod error;
pub mod json;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
}

/// One prompt sent to the text-completion collaborator, with the JSON schema the reply must follow.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    /// Identifies the flow; also used as the tool name on providers that support tool calls.
    pub name: &'static str,
    pub description: &'static str,
    pub instructions: String,
    pub prompt: String,
    pub output_schema: Value,
}

#[derive(Debug, Clone)]
pub struct StructuredResponse {
    /// The structured payload, or `None` when the reply carried nothing parseable.
    pub output: Option<Value>,
    pub raw_response_json: Value,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete_structured(&self, request: StructuredRequest)
        -> anyhow::Result<StructuredResponse>;
}
