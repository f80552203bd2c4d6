use crate::domain::suggestion::{RankedStock, ReportSummary, ScalpingSuggestions};
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MAX_TOP_STOCKS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmScalpingOutput {
    pub top_stocks: Vec<LlmRankedStock>,
    pub overall_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRankedStock {
    pub ticker: String,
    pub scalping_score: f64,
    pub reasoning: String,
}

impl LlmScalpingOutput {
    pub fn validate_and_into_suggestions(self) -> anyhow::Result<ScalpingSuggestions> {
        ensure!(
            self.overall_confidence.is_finite() && (0.0..=1.0).contains(&self.overall_confidence),
            "overallConfidence must be between 0 and 1 (got {})",
            self.overall_confidence
        );

        let mut seen = BTreeSet::<String>::new();
        let mut top_stocks = Vec::with_capacity(self.top_stocks.len());
        for stock in self.top_stocks {
            top_stocks.push(stock.validate_and_into_ranked(&mut seen)?);
        }

        // Rank by score; the model is asked to do this but it is not trusted to.
        top_stocks.sort_by(|a, b| b.scalping_score.total_cmp(&a.scalping_score));
        if top_stocks.len() > MAX_TOP_STOCKS {
            tracing::warn!(
                returned = top_stocks.len(),
                kept = MAX_TOP_STOCKS,
                "LLM returned more top stocks than requested; truncating"
            );
            top_stocks.truncate(MAX_TOP_STOCKS);
        }

        Ok(ScalpingSuggestions {
            top_stocks,
            overall_confidence: self.overall_confidence,
        })
    }
}

impl LlmRankedStock {
    fn validate_and_into_ranked(self, seen: &mut BTreeSet<String>) -> anyhow::Result<RankedStock> {
        let ticker = self.ticker.trim().to_uppercase();
        ensure!(!ticker.is_empty(), "ticker must be non-empty");
        ensure!(seen.insert(ticker.clone()), "duplicate ticker: {ticker}");

        ensure!(
            self.scalping_score.is_finite(),
            "scalpingScore must be finite (ticker={ticker})"
        );

        let reasoning = self.reasoning.trim().to_string();
        ensure!(!reasoning.is_empty(), "reasoning must be non-empty (ticker={ticker})");

        Ok(RankedStock {
            ticker,
            scalping_score: self.scalping_score,
            reasoning,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmReportSummary {
    pub summary: String,
}

impl LlmReportSummary {
    pub fn validate_and_into_summary(self) -> anyhow::Result<ReportSummary> {
        let summary = self.summary.trim().to_string();
        ensure!(!summary.is_empty(), "summary must be non-empty");
        Ok(ReportSummary { summary })
    }
}
