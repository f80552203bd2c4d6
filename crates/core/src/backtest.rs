//! Canned backtests: fixed metrics per strategy family, rendered as the report text the
//! summarizer reads.

use crate::advisor::summary::ReportSummarizer;
use crate::domain::request::{parse_json, SummarizeRequest, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const KNOWN_TICKERS: [&str; 5] = ["NIFTY50", "RELIANCE", "TCS", "HDFCBANK", "INFY"];

const TREND_FOLLOWING_EXTRA_LINES: &[&str] = &[
    "Average Holding Period: 15 days",
    "Number of Long Trades: 40",
    "Number of Short Trades: 35",
    "Performance during Bull Market: +25%",
    "Performance during Bear Market: -5%",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    AiScalpingV1,
    MaCrossover,
    RsiExtreme,
    GeneralTrendFollowing,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::AiScalpingV1,
        Strategy::MaCrossover,
        Strategy::RsiExtreme,
        Strategy::GeneralTrendFollowing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::AiScalpingV1 => "AI_SCALPING_V1",
            Strategy::MaCrossover => "MA_CROSSOVER",
            Strategy::RsiExtreme => "RSI_EXTREME",
            Strategy::GeneralTrendFollowing => "GENERAL_TREND_FOLLOWING",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRequest {
    pub stock_ticker: String,
    pub strategy: Strategy,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BacktestRequest {
    const NAME: &'static str = "backtest";

    pub fn parse(value: Value) -> Result<Self, ValidationError> {
        parse_json::<Self>(Self::NAME, value)?.validate()
    }

    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.stock_ticker = self.stock_ticker.trim().to_uppercase();
        if self.stock_ticker.is_empty() {
            return Err(ValidationError::new(Self::NAME, "stockTicker must be non-empty"));
        }
        if self.start_date > self.end_date {
            return Err(ValidationError::new(
                Self::NAME,
                format!(
                    "startDate {} is after endDate {}",
                    self.start_date, self.end_date
                ),
            ));
        }
        if !KNOWN_TICKERS.contains(&self.stock_ticker.as_str()) {
            tracing::debug!(ticker = %self.stock_ticker, "backtest requested for a ticker outside the demo list");
        }
        Ok(self)
    }

    pub fn period(&self) -> String {
        format!(
            "{} to {} on {}",
            self.start_date, self.end_date, self.stock_ticker
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestMetrics {
    pub win_rate: f64,
    pub average_profit: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub total_trades: u32,
    pub profit_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_holding_period_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonMetrics {
    pub buy_and_hold_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    pub strategy_name: Strategy,
    pub period: String,
    pub metrics: BacktestMetrics,
    pub comparison_metrics: ComparisonMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CannedBacktest {
    pub report_text: String,
    pub report: BacktestReport,
}

pub fn run_canned(request: &BacktestRequest) -> CannedBacktest {
    let (metrics, buy_and_hold_return, extra_lines, verdict): (_, f64, &[&str], &str) =
        match request.strategy {
            Strategy::GeneralTrendFollowing => (
                BacktestMetrics {
                    win_rate: 55.0,
                    average_profit: 2.5,
                    max_drawdown: 18.0,
                    sharpe_ratio: 0.9,
                    total_trades: 75,
                    profit_factor: 1.5,
                    average_holding_period_days: Some(15),
                },
                10.0,
                TREND_FOLLOWING_EXTRA_LINES,
                "Strategy underperformed by 5% annually.",
            ),
            Strategy::AiScalpingV1 | Strategy::MaCrossover | Strategy::RsiExtreme => (
                BacktestMetrics {
                    win_rate: 65.0,
                    average_profit: 0.8,
                    max_drawdown: 12.0,
                    sharpe_ratio: 1.2,
                    total_trades: 150,
                    profit_factor: 1.8,
                    average_holding_period_days: None,
                },
                20.0,
                &[],
                "Strategy outperformed by 15% annually.",
            ),
        };

    let mut lines = vec![
        format!("Strategy: {}", request.strategy),
        format!("Stock: {}", request.stock_ticker),
        format!("Period: {} to {}", request.start_date, request.end_date),
        format!("Total Trades: {}", metrics.total_trades),
        format!("Win Rate: {}%", metrics.win_rate),
        format!("Average Profit per Trade: {}%", metrics.average_profit),
        format!("Max Drawdown: -{}%", metrics.max_drawdown),
        format!("Sharpe Ratio: {}", metrics.sharpe_ratio),
        format!("Profit Factor: {}", metrics.profit_factor),
    ];
    lines.extend(extra_lines.iter().map(|l| l.to_string()));
    lines.push(format!("Compared to Buy & Hold: {verdict}"));

    CannedBacktest {
        report_text: lines.join("\n"),
        report: BacktestReport {
            strategy_name: request.strategy,
            period: request.period(),
            metrics,
            comparison_metrics: ComparisonMetrics {
                buy_and_hold_return,
            },
            ai_summary: None,
        },
    }
}

/// Runs the canned backtest and attaches the AI summary of its report text.
pub async fn run_and_summarize(
    summarizer: &ReportSummarizer,
    request: BacktestRequest,
) -> anyhow::Result<BacktestReport> {
    let request = request.validate()?;
    let CannedBacktest {
        report_text,
        mut report,
    } = run_canned(&request);

    tracing::info!(
        strategy = %request.strategy,
        ticker = %request.stock_ticker,
        period = %report.period,
        "canned backtest complete; summarizing"
    );

    let summary = summarizer
        .summarize(SummarizeRequest {
            report: report_text,
        })
        .await?;
    report.ai_summary = Some(summary.summary);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::testing::ScriptedLlm;
    use crate::advisor::AdvisorError;
    use crate::domain::request::MIN_REPORT_LEN;
    use std::sync::Arc;
    use serde_json::json;

    fn request(strategy: Strategy) -> BacktestRequest {
        BacktestRequest {
            stock_ticker: "TCS".to_string(),
            strategy,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        }
    }

    #[test]
    fn trend_following_uses_its_own_metrics() {
        let out = run_canned(&request(Strategy::GeneralTrendFollowing));
        assert_eq!(out.report.metrics.total_trades, 75);
        assert_eq!(out.report.metrics.average_holding_period_days, Some(15));
        assert_eq!(out.report.comparison_metrics.buy_and_hold_return, 10.0);
        assert!(out.report_text.contains("Number of Short Trades: 35"));
        assert!(out.report_text.contains("Max Drawdown: -18%"));
    }

    #[test]
    fn other_strategies_share_scalping_metrics() {
        for strategy in [Strategy::AiScalpingV1, Strategy::MaCrossover, Strategy::RsiExtreme] {
            let out = run_canned(&request(strategy));
            assert_eq!(out.report.metrics.total_trades, 150);
            assert_eq!(out.report.metrics.win_rate, 65.0);
            assert_eq!(out.report.comparison_metrics.buy_and_hold_return, 20.0);
            assert!(out.report_text.starts_with(&format!("Strategy: {strategy}\n")));
            assert!(!out.report_text.contains("Average Holding Period"));
            assert_eq!(out.report_text.lines().count(), 10);
        }
    }

    #[test]
    fn report_text_is_long_enough_to_summarize() {
        for strategy in Strategy::ALL {
            assert!(run_canned(&request(strategy)).report_text.len() >= MIN_REPORT_LEN);
        }
    }

    #[test]
    fn parse_validates_dates_and_ticker() {
        let ok = BacktestRequest::parse(json!({
            "stockTicker": "infy",
            "strategy": "RSI_EXTREME",
            "startDate": "2023-01-01",
            "endDate": "2023-06-30"
        }))
        .unwrap();
        assert_eq!(ok.stock_ticker, "INFY");
        assert_eq!(ok.period(), "2023-01-01 to 2023-06-30 on INFY");

        assert!(BacktestRequest::parse(json!({
            "stockTicker": "INFY",
            "strategy": "RSI_EXTREME",
            "startDate": "2023-07-01",
            "endDate": "2023-06-30"
        }))
        .is_err());

        assert!(BacktestRequest::parse(json!({
            "stockTicker": "INFY",
            "strategy": "MOON_SHOT",
            "startDate": "2023-01-01",
            "endDate": "2023-06-30"
        }))
        .is_err());
    }

    #[test]
    fn report_serializes_like_the_dashboard_expects() {
        let v = serde_json::to_value(run_canned(&request(Strategy::AiScalpingV1)).report).unwrap();
        assert_eq!(v["strategyName"], json!("AI_SCALPING_V1"));
        assert_eq!(v["comparisonMetrics"]["buyAndHoldReturn"], json!(20.0));
        assert!(v["metrics"].get("averageHoldingPeriodDays").is_none());
    }

    #[tokio::test]
    async fn run_and_summarize_attaches_summary() {
        let llm = Arc::new(ScriptedLlm::replying(Some(json!({
            "summary": "Trend following lagged buy-and-hold."
        }))));
        let summarizer = ReportSummarizer::new(llm.clone());

        let report = run_and_summarize(&summarizer, request(Strategy::GeneralTrendFollowing))
            .await
            .unwrap();
        assert_eq!(report.ai_summary.as_deref(), Some("Trend following lagged buy-and-hold."));
        assert!(llm.requests.lock().unwrap()[0]
            .prompt
            .contains("Strategy: GENERAL_TREND_FOLLOWING"));
    }

    #[tokio::test]
    async fn run_and_summarize_propagates_summary_failure() {
        let summarizer = ReportSummarizer::new(Arc::new(ScriptedLlm::replying(None)));
        let err = run_and_summarize(&summarizer, request(Strategy::MaCrossover))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdvisorError>(),
            Some(AdvisorError::InvalidOutput { .. })
        ));
    }
}
