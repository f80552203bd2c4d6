//! Simulated live prices for open positions and the unrealized P&L they imply.

use crate::domain::trade::{TradeRecord, TradeStatus};
use crate::market::jitter::Jitter;
use crate::market::round2;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Largest mark move per refresh, as a fraction of the last mark (either direction).
pub const MAX_MARK_STEP: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedTrade {
    #[serde(flatten)]
    pub trade: TradeRecord,
    pub current_price: f64,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percent: f64,
}

impl MarkedTrade {
    pub fn at(trade: TradeRecord, current_price: f64) -> Self {
        let move_ = current_price - trade.entry_price;
        let unrealized_pnl = move_ * f64::from(trade.quantity);
        let unrealized_pnl_percent = if trade.entry_price != 0.0 {
            move_ / trade.entry_price * 100.0
        } else {
            0.0
        };
        Self {
            trade,
            current_price,
            unrealized_pnl,
            unrealized_pnl_percent,
        }
    }
}

/// Last mark per open trade. Marks start at the entry price and walk on every refresh;
/// trades that left the open view are forgotten.
pub struct TradeMarks {
    last: Mutex<HashMap<String, f64>>,
    jitter: Arc<dyn Jitter>,
}

impl TradeMarks {
    pub fn new(jitter: Arc<dyn Jitter>) -> Self {
        Self {
            last: Mutex::new(HashMap::new()),
            jitter,
        }
    }

    pub async fn refresh(&self, open: Vec<TradeRecord>) -> Vec<MarkedTrade> {
        let mut last = self.last.lock().await;
        last.retain(|trade_id, _| open.iter().any(|t| &t.trade_id == trade_id));

        open.into_iter()
            .map(|trade| {
                let prev = last.get(&trade.trade_id).copied().unwrap_or(trade.entry_price);
                let mark = if trade.status == TradeStatus::Open {
                    round2(prev + self.jitter.sample() * 2.0 * MAX_MARK_STEP * prev)
                } else {
                    prev
                };
                last.insert(trade.trade_id.clone(), mark);
                MarkedTrade::at(trade, mark)
            })
            .collect()
    }

    pub async fn tracked(&self) -> usize {
        self.last.lock().await.len()
    }
}
