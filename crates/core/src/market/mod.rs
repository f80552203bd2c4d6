//! Mock market data and the join that turns ranked AI picks into displayable suggestions.

pub mod jitter;
pub mod scan;

use crate::domain::suggestion::{ScalpingSuggestions, SuggestionRecord};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ma5: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ma20: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub as_of: DateTime<Utc>,
    pub quotes: Vec<MarketQuote>,
    pub sentiment: String,
}

/// The per-quote fields the model sees; names and changes are display-only.
#[derive(Debug, Serialize)]
struct StockDataRow<'a> {
    ticker: &'a str,
    price: f64,
    volume: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    rsi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ma5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ma20: Option<f64>,
}

impl MarketSnapshot {
    pub fn quote(&self, ticker: &str) -> Option<&MarketQuote> {
        self.quotes
            .iter()
            .find(|q| q.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Serialized `stockData` payload for the suggestion prompt.
    pub fn stock_data_json(&self) -> anyhow::Result<String> {
        let rows: Vec<StockDataRow<'_>> = self
            .quotes
            .iter()
            .map(|q| StockDataRow {
                ticker: &q.ticker,
                price: q.price,
                volume: q.volume,
                rsi: q.rsi,
                ma5: q.ma5,
                ma20: q.ma20,
            })
            .collect();
        serde_json::to_string(&rows).context("serialize stock data failed")
    }
}

#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Short label for logs and the snapshot endpoint.
    fn source_name(&self) -> &'static str;

    async fn snapshot(&self) -> anyhow::Result<MarketSnapshot>;
}

pub(crate) const DEFAULT_SENTIMENT: &str = "Slightly bullish with moderate volatility expected.";

/// Fixed NSE large-cap quotes and a canned sentiment line.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockMarketData;

impl MockMarketData {
    pub fn snapshot_at(as_of: DateTime<Utc>) -> MarketSnapshot {
        let quote = |ticker: &str, name: &str, price: f64, change: f64, volume: u64, rsi: f64, ma5: f64, ma20: f64| {
            MarketQuote {
                ticker: ticker.to_string(),
                name: name.to_string(),
                price,
                change,
                change_percent: round2(change / (price - change) * 100.0),
                volume,
                rsi: Some(rsi),
                ma5: Some(ma5),
                ma20: Some(ma20),
            }
        };

        MarketSnapshot {
            as_of,
            quotes: vec![
                quote("RELIANCE", "Reliance Industries", 2850.0, 12.5, 5_000_000, 60.0, 2840.0, 2800.0),
                quote("TCS", "Tata Consultancy Services", 3800.0, -8.0, 1_800_000, 45.0, 3810.0, 3820.0),
                quote("HDFCBANK", "HDFC Bank", 1670.0, 9.2, 12_000_000, 72.0, 1660.0, 1630.0),
            ],
            sentiment: DEFAULT_SENTIMENT.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl MarketDataSource for MockMarketData {
    fn source_name(&self) -> &'static str {
        "mock"
    }

    async fn snapshot(&self) -> anyhow::Result<MarketSnapshot> {
        Ok(Self::snapshot_at(Utc::now()))
    }
}

/// Joins ranked picks with their quotes. Picks for tickers missing from the snapshot are dropped.
pub fn enrich_suggestions(
    picks: &ScalpingSuggestions,
    snapshot: &MarketSnapshot,
) -> Vec<SuggestionRecord> {
    let stamp = snapshot.as_of.timestamp_millis();
    picks
        .top_stocks
        .iter()
        .enumerate()
        .filter_map(|(index, pick)| {
            let Some(quote) = snapshot.quote(&pick.ticker) else {
                tracing::warn!(ticker = %pick.ticker, "AI pick not in market snapshot; dropping");
                return None;
            };
            Some(SuggestionRecord {
                id: format!("{}{index}{stamp}", quote.ticker),
                ticker: quote.ticker.clone(),
                name: format!("{} (AI Suggestion)", quote.ticker),
                price: quote.price,
                change: quote.change,
                change_percent: quote.change_percent,
                volume: format_volume(quote.volume),
                market_cap: None,
                last_refreshed: Some(snapshot.as_of.to_rfc3339()),
                scalping_score: pick.scalping_score,
                reasoning: pick.reasoning.clone(),
            })
        })
        .collect()
}

/// `5_000_000` -> `"5.0M"`.
pub fn format_volume(volume: u64) -> String {
    let v = volume as f64;
    if v >= 1.0e9 {
        format!("{:.1}B", v / 1.0e9)
    } else if v >= 1.0e6 {
        format!("{:.1}M", v / 1.0e6)
    } else if v >= 1.0e3 {
        format!("{:.1}K", v / 1.0e3)
    } else {
        volume.to_string()
    }
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::suggestion::RankedStock;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn snapshot() -> MarketSnapshot {
        MockMarketData::snapshot_at(Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).unwrap())
    }

    #[test]
    fn stock_data_carries_indicators_only() {
        let data: Value = serde_json::from_str(&snapshot().stock_data_json().unwrap()).unwrap();
        assert_eq!(
            data[0],
            json!({"ticker": "RELIANCE", "price": 2850.0, "volume": 5000000, "rsi": 60.0, "ma5": 2840.0, "ma20": 2800.0})
        );
        assert_eq!(data.as_array().unwrap().len(), 3);
    }

    #[test]
    fn enrich_joins_quotes_and_drops_unknown_tickers() {
        let picks = ScalpingSuggestions {
            top_stocks: vec![
                RankedStock {
                    ticker: "HDFCBANK".to_string(),
                    scalping_score: 8.7,
                    reasoning: "RSI 72 with volume surge".to_string(),
                },
                RankedStock {
                    ticker: "ADANIENT".to_string(),
                    scalping_score: 7.0,
                    reasoning: "not in the snapshot".to_string(),
                },
                RankedStock {
                    ticker: "tcs".to_string(),
                    scalping_score: 5.1,
                    reasoning: "below both averages".to_string(),
                },
            ],
            overall_confidence: 0.6,
        };

        let records = enrich_suggestions(&picks, &snapshot());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ticker, "HDFCBANK");
        assert_eq!(records[0].name, "HDFCBANK (AI Suggestion)");
        assert_eq!(records[0].price, 1670.0);
        assert_eq!(records[0].volume, "12.0M");
        assert_eq!(records[1].ticker, "TCS");
        assert_eq!(
            records[0].last_refreshed.as_deref(),
            Some("2026-03-02T04:00:00+00:00")
        );
        assert_ne!(records[0].id, records[1].id);
    }

    #[test]
    fn formats_volume() {
        assert_eq!(format_volume(1_800_000), "1.8M");
        assert_eq!(format_volume(950), "950");
        assert_eq!(format_volume(45_300), "45.3K");
    }
}
