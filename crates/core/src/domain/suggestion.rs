use serde::{Deserialize, Serialize};

/// A candidate stock as shown on the desk: quote fields plus the AI score and rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRecord {
    pub id: String,
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<String>,
    /// Free-form display stamp; the desk writes RFC 3339, clients may send a wall-clock time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refreshed: Option<String>,
    pub scalping_score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStock {
    pub ticker: String,
    pub scalping_score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalpingSuggestions {
    pub top_stocks: Vec<RankedStock>,
    pub overall_confidence: f64,
}

impl ScalpingSuggestions {
    pub fn empty() -> Self {
        Self {
            top_stocks: Vec::new(),
            overall_confidence: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top_stocks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub summary: String,
}
