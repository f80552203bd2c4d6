use crate::domain::trade::{TradeRecord, TradeStatus};
use crate::ledger::LedgerError;
use crate::storage::TradeStore;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Process-lifetime store. Front of the deque is the most recently opened trade.
#[derive(Debug, Default)]
pub struct InMemoryTradeStore {
    trades: Mutex<VecDeque<TradeRecord>>,
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TradeStore for InMemoryTradeStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, trade: &TradeRecord) -> anyhow::Result<()> {
        let mut trades = self.trades.lock().await;
        anyhow::ensure!(
            !trades.iter().any(|t| t.trade_id == trade.trade_id),
            "duplicate trade_id: {}",
            trade.trade_id
        );
        trades.push_front(trade.clone());
        Ok(())
    }

    async fn close(
        &self,
        trade_id: &str,
        exit_price: f64,
        closed_at: DateTime<Utc>,
    ) -> anyhow::Result<TradeRecord> {
        let mut trades = self.trades.lock().await;
        let trade = trades
            .iter_mut()
            .find(|t| t.trade_id == trade_id)
            .ok_or_else(|| LedgerError::NotFound {
                trade_id: trade_id.to_string(),
            })?;
        trade.close(exit_price, closed_at)?;
        Ok(trade.clone())
    }

    async fn list(&self, statuses: &[TradeStatus]) -> anyhow::Result<Vec<TradeRecord>> {
        let trades = self.trades.lock().await;
        Ok(trades
            .iter()
            .filter(|t| statuses.contains(&t.status))
            .cloned()
            .collect())
    }

    async fn len(&self) -> anyhow::Result<usize> {
        Ok(self.trades.lock().await.len())
    }
}
