use crate::advisor::{self, AdvisorError};
use crate::domain::contract::LlmReportSummary;
use crate::domain::request::SummarizeRequest;
use crate::domain::suggestion::ReportSummary;
use crate::llm::{LlmClient, StructuredRequest};
use std::sync::Arc;

const FLOW: &str = "emit_report_summary";
const FAILURE_MESSAGE: &str =
    "Failed to summarize backtesting report due to an internal server error.";
const INVALID_OUTPUT_MESSAGE: &str = "AI failed to provide a valid summary.";

#[derive(Clone)]
pub struct ReportSummarizer {
    llm: Arc<dyn LlmClient>,
}

impl ReportSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn summarize(&self, request: SummarizeRequest) -> anyhow::Result<ReportSummary> {
        let request = request.validate()?;
        let provider = self.llm.provider();

        let response = match self.llm.complete_structured(structured_request(&request)).await {
            Ok(response) => response,
            Err(err) => {
                advisor::log_call_failure(FLOW, provider, &err);
                return Err(AdvisorError::Upstream {
                    flow: FLOW,
                    message: FAILURE_MESSAGE,
                }
                .into());
            }
        };

        let parsed = response
            .output
            .ok_or_else(|| anyhow::anyhow!("no structured output"))
            .and_then(|v| Ok(serde_json::from_value::<LlmReportSummary>(v)?))
            .and_then(LlmReportSummary::validate_and_into_summary);

        match parsed {
            Ok(summary) => {
                tracing::info!(?provider, summary_len = summary.summary.len(), "report summary received");
                Ok(summary)
            }
            Err(err) => {
                tracing::warn!(
                    ?provider,
                    error = %err,
                    raw = %response.raw_response_json,
                    "AI summary returned an unexpected structure"
                );
                Err(AdvisorError::InvalidOutput {
                    flow: FLOW,
                    message: INVALID_OUTPUT_MESSAGE,
                }
                .into())
            }
        }
    }
}

fn structured_request(request: &SummarizeRequest) -> StructuredRequest {
    StructuredRequest {
        name: FLOW,
        description: "Emit the prose summary of the backtesting report",
        instructions: [
            "You are an expert financial analyst.",
            "You will be given the backtesting report of a scalping strategy.",
            "Summarize it in one short paragraph, highlighting win rate, average profit and drawdown,",
            "and how the strategy compares with buy-and-hold when the report says so.",
        ]
        .join("\n"),
        prompt: format!("Backtesting Report:\n{}", request.report.trim()),
        output_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["summary"],
            "properties": {
                "summary": {"type": "string"}
            }
        }),
    }
}
