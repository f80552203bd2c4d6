use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json;
use crate::llm::{LlmClient, Provider, StructuredRequest, StructuredResponse};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    async fn create_message(
        &self,
        flow: &'static str,
        req: CreateMessageRequest,
    ) -> anyhow::Result<(Value, CreateMessageResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                flow,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("failed to parse Anthropic response JSON: {text}"))?;
        let parsed = serde_json::from_value::<CreateMessageResponse>(raw_json.clone())
            .context("failed to decode Anthropic response into CreateMessageResponse")?;
        Ok((raw_json, parsed))
    }

    fn build_request(&self, request: &StructuredRequest) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(format!(
                "{}\n\nRespond by calling the `{}` tool exactly once.",
                request.instructions, request.name
            )),
            messages: vec![Message {
                role: "user",
                content: request.prompt.clone(),
            }],
            tools: Some(vec![Tool {
                name: request.name,
                description: request.description,
                input_schema: request.output_schema.clone(),
            }]),
            tool_choice: Some(ToolChoice::Tool { name: request.name }),
        }
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_input(res: &CreateMessageResponse, tool_name: &str) -> Option<Value> {
        res.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } if name == tool_name && input.is_object() => {
                Some(input.clone())
            }
            _ => None,
        })
    }

    /// Tool input first; the first JSON object in the text blocks otherwise.
    fn structured_output(res: &CreateMessageResponse, tool_name: &str) -> Option<Value> {
        Self::response_tool_input(res, tool_name)
            .or_else(|| json::parse_object(&Self::response_text(res)))
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn complete_structured(
        &self,
        request: StructuredRequest,
    ) -> anyhow::Result<StructuredResponse> {
        let (raw_response_json, res) = self
            .create_message(request.name, self.build_request(&request))
            .await?;

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                flow = request.name,
                max_tokens = self.max_tokens,
                "Anthropic stop_reason=max_tokens; structured output may be truncated"
            );
        }

        let output = Self::structured_output(&res, request.name);
        if output.is_none() {
            tracing::warn!(flow = request.name, "Anthropic reply carried no structured output");
        }

        Ok(StructuredResponse {
            output,
            raw_response_json,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        #[allow(dead_code)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(v: Value) -> CreateMessageResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn prefers_tool_use_input() {
        let res = response(json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "{\"summary\": \"from text\"}"},
                {"type": "tool_use", "id": "toolu_1", "name": "emit_summary",
                 "input": {"summary": "from tool"}}
            ],
            "stop_reason": "tool_use"
        }));

        assert_eq!(
            AnthropicClient::structured_output(&res, "emit_summary"),
            Some(json!({"summary": "from tool"}))
        );
    }

    #[test]
    fn ignores_other_tools_and_falls_back_to_text() {
        let res = response(json!({
            "content": [
                {"type": "tool_use", "id": "toolu_1", "name": "something_else", "input": {"x": 1}},
                {"type": "text", "text": "```json\n{\"summary\": \"fenced\"}\n```"}
            ]
        }));

        assert_eq!(
            AnthropicClient::structured_output(&res, "emit_summary"),
            Some(json!({"summary": "fenced"}))
        );
    }

    #[test]
    fn no_structured_output_is_none() {
        let res = response(json!({
            "content": [{"type": "text", "text": "Sorry, no picks today."}]
        }));
        assert_eq!(AnthropicClient::structured_output(&res, "emit_summary"), None);
    }

    #[test]
    fn request_forces_the_flow_tool() {
        let client = AnthropicClient {
            http: reqwest::Client::new(),
            api_key: "test".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        };
        let req = client.build_request(&StructuredRequest {
            name: "emit_summary",
            description: "Emit the summary",
            instructions: "You are an expert financial analyst.".to_string(),
            prompt: "Backtesting Report: ...".to_string(),
            output_schema: json!({"type": "object"}),
        });

        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["tool_choice"], json!({"type": "tool", "name": "emit_summary"}));
        assert_eq!(v["tools"][0]["name"], json!("emit_summary"));
        assert_eq!(v["messages"][0]["role"], json!("user"));
    }
}
