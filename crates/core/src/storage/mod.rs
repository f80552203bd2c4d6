pub mod memory;
pub mod trades;

use crate::domain::trade::{TradeRecord, TradeStatus};
use anyhow::Context;
use chrono::{DateTime, Utc};

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Owner of the trade records. Implementations apply the status transition through
/// [`TradeRecord::close`] so both backends reject the same transitions.
#[async_trait::async_trait]
pub trait TradeStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Fails if a record with the same `trade_id` already exists.
    async fn insert(&self, trade: &TradeRecord) -> anyhow::Result<()>;

    /// Fails with [`crate::ledger::LedgerError`] when the id is unknown or the record is not open.
    async fn close(
        &self,
        trade_id: &str,
        exit_price: f64,
        closed_at: DateTime<Utc>,
    ) -> anyhow::Result<TradeRecord>;

    /// Records whose status is in `statuses`, most recently inserted first.
    async fn list(&self, statuses: &[TradeStatus]) -> anyhow::Result<Vec<TradeRecord>>;

    async fn len(&self) -> anyhow::Result<usize>;
}
