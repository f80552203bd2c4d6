use crate::advisor::{self, AdvisorError};
use crate::domain::contract::{LlmScalpingOutput, MAX_TOP_STOCKS};
use crate::domain::request::SuggestRequest;
use crate::domain::suggestion::{ScalpingSuggestions, SuggestionRecord};
use crate::llm::{LlmClient, StructuredRequest};
use crate::market::{self, MarketSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

const FLOW: &str = "emit_scalping_suggestions";
const FAILURE_MESSAGE: &str = "Failed to get AI scalping suggestions due to an internal server error.";

/// Suggestions ready for display, tied to the snapshot they were ranked against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionBatch {
    pub as_of: DateTime<Utc>,
    pub overall_confidence: f64,
    pub suggestions: Vec<SuggestionRecord>,
}

#[derive(Clone)]
pub struct SuggestionFetcher {
    llm: Arc<dyn LlmClient>,
}

impl SuggestionFetcher {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Transport failures surface as [`AdvisorError::Upstream`]. A reply that does not match the
    /// output schema is not an error: it yields an empty list with zero confidence.
    pub async fn fetch(&self, request: SuggestRequest) -> anyhow::Result<ScalpingSuggestions> {
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

        let Some(output) = response.output else {
            tracing::warn!(?provider, "AI returned no structured scalping suggestions");
            return Ok(ScalpingSuggestions::empty());
        };

        let parsed = serde_json::from_value::<LlmScalpingOutput>(output)
            .map_err(anyhow::Error::from)
            .and_then(LlmScalpingOutput::validate_and_into_suggestions);

        match parsed {
            Ok(suggestions) if suggestions.is_empty() => {
                tracing::info!(
                    ?provider,
                    overall_confidence = suggestions.overall_confidence,
                    "AI found no scalping candidates"
                );
                Ok(suggestions)
            }
            Ok(suggestions) => {
                tracing::info!(
                    ?provider,
                    picks = suggestions.top_stocks.len(),
                    overall_confidence = suggestions.overall_confidence,
                    "scalping suggestions received"
                );
                Ok(suggestions)
            }
            Err(err) => {
                tracing::warn!(?provider, error = %err, "AI scalping suggestions failed validation");
                Ok(ScalpingSuggestions::empty())
            }
        }
    }

    /// Ranks the quotes in `snapshot` and joins the picks back onto them.
    pub async fn fetch_for_snapshot(
        &self,
        snapshot: &MarketSnapshot,
    ) -> anyhow::Result<SuggestionBatch> {
        let request = SuggestRequest {
            stock_data: snapshot.stock_data_json()?,
            market_sentiment: snapshot.sentiment.clone(),
        };
        let picks = self.fetch(request).await?;

        Ok(SuggestionBatch {
            as_of: snapshot.as_of,
            overall_confidence: picks.overall_confidence,
            suggestions: market::enrich_suggestions(&picks, snapshot),
        })
    }
}

fn structured_request(request: &SuggestRequest) -> StructuredRequest {
    StructuredRequest {
        name: FLOW,
        description: "Emit the ranked scalping picks and the overall confidence",
        instructions: [
            "You rank stocks for intraday scalping.",
            "Judge suitability from price volatility, volume surges, RSI levels and moving-average crossovers.",
            "Only pick tickers that appear in the provided stock data.",
            "Rank the picks by scalpingScore, highest first, and explain each pick in one or two sentences.",
            "overallConfidence is a number between 0 and 1 for the set of picks as a whole.",
        ]
        .join("\n"),
        prompt: format!(
            "Select the top {MAX_TOP_STOCKS} stocks most suitable for scalping.\n\n\
Stock Data: {}\n\
Market Sentiment: {}",
            request.stock_data, request.market_sentiment
        ),
        output_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["topStocks", "overallConfidence"],
            "properties": {
                "topStocks": {
                    "type": "array",
                    "maxItems": MAX_TOP_STOCKS,
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["ticker", "scalpingScore", "reasoning"],
                        "properties": {
                            "ticker": {"type": "string"},
                            "scalpingScore": {"type": "number"},
                            "reasoning": {"type": "string"}
                        }
                    }
                },
                "overallConfidence": {"type": "number", "minimum": 0, "maximum": 1}
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::testing::ScriptedLlm;
    use crate::llm::error::LlmDiagnosticsError;
    use crate::llm::Provider;
    use crate::market::MockMarketData;
    use chrono::TimeZone;
    use serde_json::json;

    fn request() -> SuggestRequest {
        SuggestRequest {
            stock_data: "[{\"ticker\":\"TCS\",\"price\":3800}]".to_string(),
            market_sentiment: "Slightly bullish".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_validated_picks() {
        let llm = Arc::new(ScriptedLlm::replying(Some(json!({
            "topStocks": [
                {"ticker": "TCS", "scalpingScore": 7.5, "reasoning": "tight range near MA5"}
            ],
            "overallConfidence": 0.8
        }))));
        let fetcher = SuggestionFetcher::new(llm.clone());

        let out = fetcher.fetch(request()).await.unwrap();
        assert_eq!(out.top_stocks.len(), 1);
        assert_eq!(out.top_stocks[0].ticker, "TCS");
        assert_eq!(out.overall_confidence, 0.8);

        let sent = llm.requests.lock().unwrap();
        assert_eq!(sent[0].name, FLOW);
        assert!(sent[0].prompt.contains("Market Sentiment: Slightly bullish"));
        assert!(sent[0].prompt.contains("\"ticker\":\"TCS\""));
    }

    #[tokio::test]
    async fn malformed_output_downgrades_to_empty() {
        for output in [
            None,
            Some(json!({"topStocks": "TCS"})),
            Some(json!({"topStocks": [], "overallConfidence": 4.0})),
        ] {
            let fetcher = SuggestionFetcher::new(Arc::new(ScriptedLlm::replying(output)));
            let out = fetcher.fetch(request()).await.unwrap();
            assert_eq!(out, ScalpingSuggestions::empty());
        }
    }

    #[tokio::test]
    async fn no_candidates_keeps_reported_confidence() {
        let fetcher = SuggestionFetcher::new(Arc::new(ScriptedLlm::replying(Some(json!({
            "topStocks": [],
            "overallConfidence": 0.3
        })))));
        let out = fetcher.fetch(request()).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(out.overall_confidence, 0.3);
    }

    #[tokio::test]
    async fn transport_failure_is_generic_upstream_error() {
        let fetcher = SuggestionFetcher::new(Arc::new(ScriptedLlm::failing(anyhow::anyhow!(
            "connection reset by peer"
        ))));
        let err = fetcher.fetch(request()).await.unwrap_err();
        let advisor = err.downcast_ref::<AdvisorError>().unwrap();
        assert!(matches!(advisor, AdvisorError::Upstream { .. }));
        assert_eq!(advisor.to_string(), FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn provider_error_body_stays_out_of_the_caller_message() {
        let diag = LlmDiagnosticsError {
            provider: Provider::Anthropic,
            flow: FLOW,
            stage: "http",
            detail: "status=529 Overloaded".to_string(),
            raw_output: Some("{\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\"}}".to_string()),
            raw_response_json: Some(json!({"type": "error", "error": {"type": "overloaded_error"}})),
        };
        let fetcher = SuggestionFetcher::new(Arc::new(ScriptedLlm::failing(diag.into())));

        let err = fetcher.fetch(request()).await.unwrap_err();
        assert_eq!(err.to_string(), FAILURE_MESSAGE);
        assert_eq!(err.downcast_ref::<AdvisorError>().map(AdvisorError::flow), Some(FLOW));
        assert!(err.downcast_ref::<LlmDiagnosticsError>().is_none());
    }

    #[tokio::test]
    async fn snapshot_flow_enriches_picks() {
        let snapshot = MockMarketData::snapshot_at(Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).unwrap());
        let llm = Arc::new(ScriptedLlm::replying(Some(json!({
            "topStocks": [
                {"ticker": "RELIANCE", "scalpingScore": 6.0, "reasoning": "steady uptrend"},
                {"ticker": "HDFCBANK", "scalpingScore": 9.0, "reasoning": "overbought with volume"}
            ],
            "overallConfidence": 0.65
        }))));
        let fetcher = SuggestionFetcher::new(llm.clone());

        let batch = fetcher.fetch_for_snapshot(&snapshot).await.unwrap();
        assert_eq!(batch.as_of, snapshot.as_of);
        assert_eq!(batch.overall_confidence, 0.65);
        let tickers: Vec<_> = batch.suggestions.iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(tickers, ["HDFCBANK", "RELIANCE"]);
        assert_eq!(batch.suggestions[1].price, 2850.0);

        let sent = llm.requests.lock().unwrap();
        assert!(sent[0].prompt.contains(&snapshot.sentiment));
    }
}
