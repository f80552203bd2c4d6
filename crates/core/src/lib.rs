pub mod advisor;
pub mod backtest;
pub mod domain;
pub mod ledger;
pub mod llm;
pub mod market;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::{bail, Context};
    use std::time::Duration;

    const DEFAULT_TRADE_QUANTITY: u32 = 10;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TradeStoreKind {
        Memory,
        Postgres,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TradeIdScheme {
        Uuid,
        Sequential,
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub trade_store: TradeStoreKind,
        pub trade_id_scheme: TradeIdScheme,
        pub trade_quantity: u32,
        pub simulated_latency: Duration,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let trade_store = match var("TRADE_STORE").as_deref() {
                None | Some("") | Some("memory") => TradeStoreKind::Memory,
                Some("postgres") => TradeStoreKind::Postgres,
                Some(other) => bail!("TRADE_STORE must be memory or postgres (got {other})"),
            };

            let trade_id_scheme = match var("TRADE_ID_SCHEME").as_deref() {
                None | Some("") | Some("uuid") => TradeIdScheme::Uuid,
                Some("sequential") => TradeIdScheme::Sequential,
                Some(other) => bail!("TRADE_ID_SCHEME must be uuid or sequential (got {other})"),
            };

            let trade_quantity = match var("TRADE_QUANTITY") {
                Some(s) => s
                    .trim()
                    .parse::<u32>()
                    .with_context(|| format!("TRADE_QUANTITY is not a positive integer: {s}"))?,
                None => DEFAULT_TRADE_QUANTITY,
            };
            anyhow::ensure!(trade_quantity >= 1, "TRADE_QUANTITY must be >= 1");

            let simulated_latency_ms = match var("SIMULATED_LATENCY_MS") {
                Some(s) if s.trim().is_empty() => 0,
                Some(s) => s.trim().parse::<u64>().with_context(|| {
                    format!("SIMULATED_LATENCY_MS is not a non-negative integer: {s}")
                })?,
                None => 0,
            };

            Ok(Self {
                database_url: var("DATABASE_URL"),
                anthropic_api_key: var("ANTHROPIC_API_KEY"),
                sentry_dsn: var("SENTRY_DSN"),
                trade_store,
                trade_id_scheme,
                trade_quantity,
                simulated_latency: Duration::from_millis(simulated_latency_ms),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

}
