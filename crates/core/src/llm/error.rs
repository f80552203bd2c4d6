use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

/// Raw-output cap for log lines; provider error pages can be large.
pub const RAW_EXCERPT_CHARS: usize = 512;

/// A provider call that failed after the request went out, with whatever the provider said back.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub flow: &'static str,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    /// `error.type` from an Anthropic error body, e.g. `overloaded_error`.
    pub fn provider_error_type(&self) -> Option<&str> {
        self.raw_response_json
            .as_ref()?
            .pointer("/error/type")?
            .as_str()
    }

    pub fn raw_output_excerpt(&self) -> Option<String> {
        let raw = self.raw_output.as_deref()?;
        if raw.chars().count() <= RAW_EXCERPT_CHARS {
            return Some(raw.to_string());
        }
        let mut out: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
        out.push('…');
        Some(out)
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM call failed (provider={:?}, flow={}, stage={}): {}",
            self.provider, self.flow, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overloaded(raw_output: String) -> LlmDiagnosticsError {
        LlmDiagnosticsError {
            provider: Provider::Anthropic,
            flow: "emit_report_summary",
            stage: "http",
            detail: "status=529 Overloaded".to_string(),
            raw_output: Some(raw_output),
            raw_response_json: Some(json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })),
        }
    }

    #[test]
    fn reads_provider_error_type() {
        let err = overloaded("{}".to_string());
        assert_eq!(err.provider_error_type(), Some("overloaded_error"));
        assert_eq!(
            err.to_string(),
            "LLM call failed (provider=Anthropic, flow=emit_report_summary, stage=http): status=529 Overloaded"
        );
    }

    #[test]
    fn excerpt_caps_long_bodies_on_char_boundaries() {
        let short = overloaded("upstream busy".to_string());
        assert_eq!(short.raw_output_excerpt().as_deref(), Some("upstream busy"));

        let long = overloaded("₹".repeat(RAW_EXCERPT_CHARS + 10));
        let excerpt = long.raw_output_excerpt().unwrap();
        assert_eq!(excerpt.chars().count(), RAW_EXCERPT_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }
}
