//! Trade ledger: opens mock positions from suggestions, closes them, and exposes the
//! open and history views.

pub mod ids;
pub mod marks;

use crate::config::Settings;
use crate::domain::request::{CloseTradeRequest, OpenTradeRequest};
use crate::domain::trade::{TradeRecord, TradeStatus};
use crate::ledger::ids::TradeIdGenerator;
use crate::ledger::marks::{MarkedTrade, TradeMarks};
use crate::storage::TradeStore;
use crate::time::clock::{Clock, SystemClock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_QUANTITY: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    NotFound {
        trade_id: String,
    },
    InvalidTransition {
        trade_id: String,
        from: TradeStatus,
        to: TradeStatus,
    },
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NotFound { trade_id } => write!(f, "Trade with ID {trade_id} not found."),
            LedgerError::InvalidTransition { trade_id, from, to } => {
                write!(f, "Trade {trade_id} cannot move from {from} to {to}.")
            }
        }
    }
}

impl std::error::Error for LedgerError {}

pub struct Ledger {
    store: Arc<dyn TradeStore>,
    ids: Arc<dyn TradeIdGenerator>,
    clock: Arc<dyn Clock>,
    quantity: u32,
    latency: Duration,
}

impl Ledger {
    pub fn new(store: Arc<dyn TradeStore>, ids: Arc<dyn TradeIdGenerator>) -> Self {
        Self {
            store,
            ids,
            clock: Arc::new(SystemClock),
            quantity: DEFAULT_QUANTITY,
            latency: Duration::ZERO,
        }
    }

    pub fn from_settings(settings: &Settings, store: Arc<dyn TradeStore>) -> Self {
        Self::new(store, ids::generator_for(settings.trade_id_scheme))
            .with_quantity(settings.trade_quantity)
            .with_latency(settings.simulated_latency)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// Fixed delay after every operation, mimicking a broker round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn open(&self, request: OpenTradeRequest) -> anyhow::Result<TradeRecord> {
        let OpenTradeRequest { suggestion } = request.validate()?;

        let trade = TradeRecord::open(
            suggestion,
            self.ids.next_id(),
            self.quantity,
            self.clock.now(),
        );
        self.store.insert(&trade).await?;

        tracing::info!(
            trade_id = %trade.trade_id,
            ticker = trade.ticker(),
            entry_price = trade.entry_price,
            quantity = trade.quantity,
            backend = self.store.backend(),
            "opened mock trade"
        );

        self.simulate_latency().await;
        Ok(trade)
    }

    pub async fn close(&self, request: CloseTradeRequest) -> anyhow::Result<TradeRecord> {
        let CloseTradeRequest {
            trade_id,
            exit_price,
        } = request.validate()?;

        let trade = self
            .store
            .close(&trade_id, exit_price, self.clock.now())
            .await?;

        tracing::info!(
            trade_id = %trade.trade_id,
            ticker = trade.ticker(),
            exit_price,
            profit_or_loss = trade.profit_or_loss,
            "closed mock trade"
        );

        self.simulate_latency().await;
        Ok(trade)
    }

    /// OPEN and PENDING_ENTRY trades, most recently opened first.
    pub async fn list_open(&self) -> anyhow::Result<Vec<TradeRecord>> {
        let trades = self.store.list(&TradeStatus::OPEN_VIEW).await?;
        self.simulate_latency().await;
        Ok(trades)
    }

    /// The open view with a fresh simulated mark and unrealized P&L on each trade.
    pub async fn mark_open(&self, marks: &TradeMarks) -> anyhow::Result<Vec<MarkedTrade>> {
        let open = self.list_open().await?;
        Ok(marks.refresh(open).await)
    }

    /// CLOSED, CANCELLED and ERROR trades, most recently closed first.
    pub async fn list_closed(&self) -> anyhow::Result<Vec<TradeRecord>> {
        let mut trades = self.store.list(&TradeStatus::CLOSED_VIEW).await?;
        // Stable sort: equal timestamps keep the store's newest-first order.
        trades.sort_by(|a, b| b.closed_at.cmp(&a.closed_at));
        self.simulate_latency().await;
        Ok(trades)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}
