//! Inbound request schemas.
//!
//! Every request body is parsed from raw JSON into one of these types at the
//! boundary; a failure here happens before any state is touched.

use crate::domain::suggestion::SuggestionRecord;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const MIN_REPORT_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub request: &'static str,
    pub detail: String,
}

impl ValidationError {
    pub fn new(request: &'static str, detail: impl Into<String>) -> Self {
        Self {
            request,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input for {}: {}", self.request, self.detail)
    }
}

impl std::error::Error for ValidationError {}

pub(crate) fn parse_json<T: DeserializeOwned>(
    request: &'static str,
    value: Value,
) -> Result<T, ValidationError> {
    serde_json::from_value::<T>(value).map_err(|e| ValidationError::new(request, e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTradeRequest {
    pub suggestion: SuggestionRecord,
}

impl OpenTradeRequest {
    const NAME: &'static str = "placing order";

    pub fn parse(value: Value) -> Result<Self, ValidationError> {
        parse_json::<Self>(Self::NAME, value)?.validate()
    }

    pub fn validate(mut self) -> Result<Self, ValidationError> {
        let ticker = self.suggestion.ticker.trim();
        if ticker.is_empty() {
            return Err(ValidationError::new(Self::NAME, "suggestion.ticker must be non-empty"));
        }
        self.suggestion.ticker = ticker.to_string();

        let s = &self.suggestion;
        for (field, v) in [
            ("price", s.price),
            ("change", s.change),
            ("changePercent", s.change_percent),
            ("scalpingScore", s.scalping_score),
        ] {
            if !v.is_finite() {
                return Err(ValidationError::new(
                    Self::NAME,
                    format!("suggestion.{field} must be a finite number"),
                ));
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTradeRequest {
    pub trade_id: String,
    pub exit_price: f64,
}

impl CloseTradeRequest {
    const NAME: &'static str = "closing order";

    pub fn parse(value: Value) -> Result<Self, ValidationError> {
        parse_json::<Self>(Self::NAME, value)?.validate()
    }

    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.trade_id = self.trade_id.trim().to_string();
        if self.trade_id.is_empty() {
            return Err(ValidationError::new(Self::NAME, "tradeId must be non-empty"));
        }
        if !self.exit_price.is_finite() {
            return Err(ValidationError::new(Self::NAME, "exitPrice must be a finite number"));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRequest {
    pub stock_data: String,
    pub market_sentiment: String,
}

impl SuggestRequest {
    pub fn parse(value: Value) -> Result<Self, ValidationError> {
        parse_json::<Self>("scalping suggestions", value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub report: String,
}

impl SummarizeRequest {
    const NAME: &'static str = "backtest summary";

    pub fn parse(value: Value) -> Result<Self, ValidationError> {
        parse_json::<Self>(Self::NAME, value)?.validate()
    }

    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.report.trim().chars().count() < MIN_REPORT_LEN {
            return Err(ValidationError::new(Self::NAME, "Report content is too short."));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn suggestion_json() -> Value {
        json!({
            "id": "TCS0",
            "ticker": "TCS",
            "name": "TCS (AI Suggestion)",
            "price": 100.0,
            "change": 2.0,
            "changePercent": 0.5,
            "volume": "1.8M",
            "scalpingScore": 0.9,
            "reasoning": "volume surge"
        })
    }

    #[test]
    fn open_trade_accepts_valid_suggestion() {
        let req = OpenTradeRequest::parse(json!({ "suggestion": suggestion_json() })).unwrap();
        assert_eq!(req.suggestion.ticker, "TCS");
        assert_eq!(req.suggestion.market_cap, None);
    }

    #[test]
    fn open_trade_accepts_wall_clock_last_refreshed() {
        let mut s = suggestion_json();
        s["lastRefreshed"] = json!("10:32:05 AM");
        let req = OpenTradeRequest::parse(json!({ "suggestion": s })).unwrap();
        assert_eq!(req.suggestion.last_refreshed.as_deref(), Some("10:32:05 AM"));
    }

    #[test]
    fn open_trade_rejects_missing_ticker() {
        let mut s = suggestion_json();
        s.as_object_mut().unwrap().remove("ticker");
        let err = OpenTradeRequest::parse(json!({ "suggestion": s })).unwrap_err();
        assert_eq!(err.request, "placing order");
        assert!(err.detail.contains("ticker"), "{err}");
    }

    #[test]
    fn open_trade_rejects_blank_ticker_and_wrong_types() {
        let mut s = suggestion_json();
        s["ticker"] = json!("  ");
        assert!(OpenTradeRequest::parse(json!({ "suggestion": s })).is_err());

        let mut s = suggestion_json();
        s["price"] = json!("100");
        assert!(OpenTradeRequest::parse(json!({ "suggestion": s })).is_err());
    }

    #[test]
    fn close_trade_requires_id_and_price() {
        let req = CloseTradeRequest::parse(json!({ "tradeId": " t-1 ", "exitPrice": 110 })).unwrap();
        assert_eq!(req.trade_id, "t-1");
        assert_eq!(req.exit_price, 110.0);

        assert!(CloseTradeRequest::parse(json!({ "tradeId": "t-1" })).is_err());
        assert!(CloseTradeRequest::parse(json!({ "tradeId": "", "exitPrice": 1.0 })).is_err());
    }

    #[test]
    fn summarize_enforces_minimum_length() {
        let err = SummarizeRequest::parse(json!({ "report": "Win Rate: 65%" })).unwrap_err();
        assert_eq!(err.detail, "Report content is too short.");

        let report = "Strategy: AI_SCALPING_V1\nTotal Trades: 150\nWin Rate: 65%\nMax Drawdown: -12%";
        assert!(SummarizeRequest::parse(json!({ "report": report })).is_ok());
    }

    #[test]
    fn suggest_requires_both_strings() {
        assert!(SuggestRequest::parse(json!({ "stockData": "[]" })).is_err());
        let req =
            SuggestRequest::parse(json!({ "stockData": "[]", "marketSentiment": "flat" })).unwrap();
        assert_eq!(req.market_sentiment, "flat");
    }
}
