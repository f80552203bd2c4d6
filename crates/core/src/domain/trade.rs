use crate::domain::suggestion::SuggestionRecord;
use crate::ledger::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    PendingEntry,
    Open,
    PendingExit,
    Closed,
    Cancelled,
    Error,
}

impl TradeStatus {
    /// Statuses listed by the open-trades view.
    pub const OPEN_VIEW: [TradeStatus; 2] = [TradeStatus::Open, TradeStatus::PendingEntry];

    /// Statuses listed by the trade-history view.
    pub const CLOSED_VIEW: [TradeStatus; 3] = [
        TradeStatus::Closed,
        TradeStatus::Cancelled,
        TradeStatus::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TradeStatus::PendingEntry => "PENDING_ENTRY",
            TradeStatus::Open => "OPEN",
            TradeStatus::PendingExit => "PENDING_EXIT",
            TradeStatus::Closed => "CLOSED",
            TradeStatus::Cancelled => "CANCELLED",
            TradeStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s {
            "PENDING_ENTRY" => TradeStatus::PendingEntry,
            "OPEN" => TradeStatus::Open,
            "PENDING_EXIT" => TradeStatus::PendingExit,
            "CLOSED" => TradeStatus::Closed,
            "CANCELLED" => TradeStatus::Cancelled,
            "ERROR" => TradeStatus::Error,
            other => anyhow::bail!("unknown trade status: {other}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    #[serde(flatten)]
    pub suggestion: SuggestionRecord,
    pub trade_id: String,
    pub entry_price: f64,
    pub quantity: u32,
    pub status: TradeStatus,
    pub opened_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit_or_loss: Option<f64>,
}

impl TradeRecord {
    /// Opens a mock position at the suggestion's current price.
    pub fn open(
        suggestion: SuggestionRecord,
        trade_id: String,
        quantity: u32,
        opened_at: DateTime<Utc>,
    ) -> Self {
        let entry_price = suggestion.price;
        Self {
            suggestion,
            trade_id,
            entry_price,
            quantity,
            status: TradeStatus::Open,
            opened_at,
            closed_at: None,
            exit_price: None,
            profit_or_loss: None,
        }
    }

    /// OPEN -> CLOSED. Any other starting status is rejected and the record is left untouched.
    pub fn close(&mut self, exit_price: f64, closed_at: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != TradeStatus::Open {
            return Err(LedgerError::InvalidTransition {
                trade_id: self.trade_id.clone(),
                from: self.status,
                to: TradeStatus::Closed,
            });
        }

        self.status = TradeStatus::Closed;
        self.exit_price = Some(exit_price);
        self.closed_at = Some(closed_at);
        self.profit_or_loss = Some((exit_price - self.entry_price) * f64::from(self.quantity));
        Ok(())
    }

    pub fn ticker(&self) -> &str {
        &self.suggestion.ticker
    }
}
