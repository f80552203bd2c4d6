use crate::domain::suggestion::SuggestionRecord;
use crate::domain::trade::{TradeRecord, TradeStatus};
use crate::ledger::LedgerError;
use crate::storage::TradeStore;
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;

const SELECT_COLUMNS: &str = "trade_id, suggestion, entry_price, quantity, status, opened_at, \
                              closed_at, exit_price, profit_or_loss";

#[derive(Debug, Clone)]
pub struct PgTradeStore {
    pool: sqlx::PgPool,
}

impl PgTradeStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TradeStore for PgTradeStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, trade: &TradeRecord) -> anyhow::Result<()> {
        let suggestion =
            serde_json::to_value(&trade.suggestion).context("serialize suggestion failed")?;

        sqlx::query(
            "INSERT INTO trades (trade_id, suggestion, entry_price, quantity, status, opened_at, \
                                 closed_at, exit_price, profit_or_loss) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&trade.trade_id)
        .bind(suggestion)
        .bind(trade.entry_price)
        .bind(i64::from(trade.quantity))
        .bind(trade.status.as_str())
        .bind(trade.opened_at)
        .bind(trade.closed_at)
        .bind(trade.exit_price)
        .bind(trade.profit_or_loss)
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert trades failed (trade_id={})", trade.trade_id))?;

        Ok(())
    }

    async fn close(
        &self,
        trade_id: &str,
        exit_price: f64,
        closed_at: DateTime<Utc>,
    ) -> anyhow::Result<TradeRecord> {
        let mut tx = self.pool.begin().await.context("begin transaction failed")?;

        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM trades WHERE trade_id = $1 FOR UPDATE"
        ))
        .bind(trade_id)
        .fetch_optional(&mut *tx)
        .await
        .context("select trade for update failed")?;

        let Some(row) = row else {
            return Err(LedgerError::NotFound {
                trade_id: trade_id.to_string(),
            }
            .into());
        };

        let mut trade = trade_from_row(&row)?;
        trade.close(exit_price, closed_at)?;

        sqlx::query(
            "UPDATE trades SET status = $2, closed_at = $3, exit_price = $4, profit_or_loss = $5 \
             WHERE trade_id = $1",
        )
        .bind(&trade.trade_id)
        .bind(trade.status.as_str())
        .bind(trade.closed_at)
        .bind(trade.exit_price)
        .bind(trade.profit_or_loss)
        .execute(&mut *tx)
        .await
        .context("update trades failed")?;

        tx.commit().await.context("commit transaction failed")?;
        Ok(trade)
    }

    async fn list(&self, statuses: &[TradeStatus]) -> anyhow::Result<Vec<TradeRecord>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();

        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM trades WHERE status = ANY($1) ORDER BY seq DESC"
        ))
        .bind(statuses)
        .fetch_all(&self.pool)
        .await
        .context("select trades failed")?;

        rows.iter().map(trade_from_row).collect()
    }

    async fn len(&self) -> anyhow::Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trades")
            .fetch_one(&self.pool)
            .await
            .context("count trades failed")?;
        Ok(usize::try_from(count)?)
    }
}

fn trade_from_row(row: &PgRow) -> anyhow::Result<TradeRecord> {
    let trade_id: String = row.try_get("trade_id")?;
    let suggestion: serde_json::Value = row.try_get("suggestion")?;
    let suggestion = serde_json::from_value::<SuggestionRecord>(suggestion)
        .with_context(|| format!("invalid suggestion JSON in DB for trade_id={trade_id}"))?;
    let quantity: i64 = row.try_get("quantity")?;
    let status: String = row.try_get("status")?;

    Ok(TradeRecord {
        suggestion,
        entry_price: row.try_get("entry_price")?,
        quantity: u32::try_from(quantity)
            .with_context(|| format!("invalid quantity in DB for trade_id={trade_id}"))?,
        status: status.parse()?,
        opened_at: row.try_get("opened_at")?,
        closed_at: row.try_get("closed_at")?,
        exit_price: row.try_get("exit_price")?,
        profit_or_loss: row.try_get("profit_or_loss")?,
        trade_id,
    })
}
