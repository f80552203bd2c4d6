//! Live market scan: four large caps whose quotes take a random-walk step on every refresh.

use crate::market::jitter::Jitter;
use crate::market::{round2, MarketDataSource, MarketQuote, MarketSnapshot, DEFAULT_SENTIMENT};
use crate::time::clock::{Clock, SystemClock};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Largest price move per tick, as a fraction of the current price (either direction).
pub const MAX_PRICE_STEP: f64 = 0.005;
/// Largest reported `change`, as a fraction of the pre-tick price.
pub const MAX_CHANGE: f64 = 0.01;
/// Largest reported `changePercent` magnitude.
pub const MAX_CHANGE_PERCENT: f64 = 1.0;
/// Largest volume move per tick, before rounding to a tenth of a million.
pub const MAX_VOLUME_STEP: f64 = 250_000.0;

const VOLUME_LOT: f64 = 100_000.0;

pub fn scan_quotes() -> Vec<MarketQuote> {
    let quote = |ticker: &str, name: &str, price: f64, change: f64, change_percent: f64, volume: u64| {
        MarketQuote {
            ticker: ticker.to_string(),
            name: name.to_string(),
            price,
            change,
            change_percent,
            volume,
            rsi: None,
            ma5: None,
            ma20: None,
        }
    };

    vec![
        quote("RELIANCE", "Reliance Industries Ltd", 2850.75, 15.20, 0.53, 5_200_000),
        quote("TCS", "Tata Consultancy Services Ltd", 3805.10, -8.55, -0.22, 1_800_000),
        quote("HDFCBANK", "HDFC Bank Ltd", 1670.40, 22.90, 1.39, 12_100_000),
        quote("INFY", "Infosys Ltd", 1502.00, 5.60, 0.37, 3_500_000),
    ]
}

/// One random-walk step. `change` and `changePercent` are redrawn, not accumulated.
pub fn tick_quote(quote: &MarketQuote, jitter: &dyn Jitter) -> MarketQuote {
    let price = quote.price;
    let next_price = round2(price + jitter_step(jitter, 2.0 * MAX_PRICE_STEP * price));
    let change = round2(jitter_step(jitter, 2.0 * MAX_CHANGE * price));
    let change_percent = round2(jitter_step(jitter, 2.0 * MAX_CHANGE_PERCENT));
    let volume = (quote.volume as f64 + jitter_step(jitter, 2.0 * MAX_VOLUME_STEP)).max(0.0);

    MarketQuote {
        price: next_price,
        change,
        change_percent,
        volume: ((volume / VOLUME_LOT).round() * VOLUME_LOT) as u64,
        ..quote.clone()
    }
}

fn jitter_step(jitter: &dyn Jitter, span: f64) -> f64 {
    jitter.sample() * span
}

pub struct LiveMarketScan {
    quotes: Mutex<Vec<MarketQuote>>,
    jitter: Arc<dyn Jitter>,
    clock: Arc<dyn Clock>,
}

impl LiveMarketScan {
    pub fn new(jitter: Arc<dyn Jitter>) -> Self {
        Self {
            quotes: Mutex::new(scan_quotes()),
            jitter,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait::async_trait]
impl MarketDataSource for LiveMarketScan {
    fn source_name(&self) -> &'static str {
        "live-scan"
    }

    /// Every call advances the walk by one step for each quote.
    async fn snapshot(&self) -> anyhow::Result<MarketSnapshot> {
        let mut quotes = self.quotes.lock().await;
        for quote in quotes.iter_mut() {
            *quote = tick_quote(quote, self.jitter.as_ref());
        }

        Ok(MarketSnapshot {
            as_of: self.clock.now(),
            quotes: quotes.clone(),
            sentiment: DEFAULT_SENTIMENT.to_string(),
        })
    }
}
