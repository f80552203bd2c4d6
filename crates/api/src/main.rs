use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scalpdesk_core::advisor::suggestions::{SuggestionBatch, SuggestionFetcher};
use scalpdesk_core::advisor::summary::ReportSummarizer;
use scalpdesk_core::backtest::{self, BacktestReport, BacktestRequest};
use scalpdesk_core::config::{Settings, TradeStoreKind};
use scalpdesk_core::domain::request::{
    CloseTradeRequest, OpenTradeRequest, SuggestRequest, SummarizeRequest,
};
use scalpdesk_core::domain::suggestion::{ReportSummary, ScalpingSuggestions};
use scalpdesk_core::domain::trade::TradeRecord;
use scalpdesk_core::ledger::marks::{MarkedTrade, TradeMarks};
use scalpdesk_core::ledger::Ledger;
use scalpdesk_core::llm::anthropic::AnthropicClient;
use scalpdesk_core::llm::LlmClient;
use scalpdesk_core::market::jitter::RandomJitter;
use scalpdesk_core::market::scan::LiveMarketScan;
use scalpdesk_core::market::{MarketDataSource, MarketSnapshot, MockMarketData};
use scalpdesk_core::storage::memory::InMemoryTradeStore;
use scalpdesk_core::storage::trades::PgTradeStore;
use scalpdesk_core::storage::TradeStore;

mod error;

use error::ApiError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = build_store(&settings).await;
    let ledger = Ledger::from_settings(&settings, store);
    tracing::info!(
        backend = ledger.backend(),
        quantity = settings.trade_quantity,
        "trade ledger ready"
    );

    let llm: Option<Arc<dyn LlmClient>> = match AnthropicClient::from_settings(&settings) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::error!(error = %e, "LLM client unavailable; AI routes will answer 503");
            None
        }
    };

    let state = AppState {
        ledger: Arc::new(ledger),
        market: Arc::new(MockMarketData),
        scan: Arc::new(LiveMarketScan::new(Arc::new(RandomJitter::default()))),
        marks: Arc::new(TradeMarks::new(Arc::new(RandomJitter::default()))),
        fetcher: llm.clone().map(SuggestionFetcher::new),
        summarizer: llm.map(ReportSummarizer::new),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/market/snapshot", get(get_market_snapshot))
        .route("/market/scan", get(get_market_scan))
        .route("/suggestions", get(get_suggestions).post(post_suggestions))
        .route("/trades", post(open_trade))
        .route("/trades/close", post(close_trade))
        .route("/trades/open", get(list_open_trades))
        .route("/trades/open/marks", get(mark_open_trades))
        .route("/trades/closed", get(list_closed_trades))
        .route("/reports/summary", post(summarize_report))
        .route("/backtests", post(run_backtest))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Postgres when asked for and reachable; the in-memory ledger otherwise.
async fn build_store(settings: &Settings) -> Arc<dyn TradeStore> {
    if settings.trade_store == TradeStoreKind::Memory {
        return Arc::new(InMemoryTradeStore::new());
    }

    let db_url = match settings.require_database_url() {
        Ok(db_url) => db_url,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; using in-memory trade store");
            return Arc::new(InMemoryTradeStore::new());
        }
    };

    match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
    {
        Ok(pool) => match scalpdesk_core::storage::migrate(&pool).await {
            Ok(()) => Arc::new(PgTradeStore::new(pool)),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "db migrations failed; using in-memory trade store");
                Arc::new(InMemoryTradeStore::new())
            }
        },
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "db connect failed; using in-memory trade store");
            Arc::new(InMemoryTradeStore::new())
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    ledger: Arc<Ledger>,
    market: Arc<dyn MarketDataSource>,
    scan: Arc<dyn MarketDataSource>,
    marks: Arc<TradeMarks>,
    fetcher: Option<SuggestionFetcher>,
    summarizer: Option<ReportSummarizer>,
}

impl AppState {
    fn fetcher(&self) -> Result<&SuggestionFetcher, ApiError> {
        self.fetcher
            .as_ref()
            .ok_or_else(|| ApiError::unavailable("AI suggestions"))
    }

    fn summarizer(&self) -> Result<&ReportSummarizer, ApiError> {
        self.summarizer
            .as_ref()
            .ok_or_else(|| ApiError::unavailable("AI summaries"))
    }
}

async fn get_market_snapshot(
    State(state): State<AppState>,
) -> Result<Json<MarketSnapshot>, ApiError> {
    Ok(Json(load_snapshot(state.market.as_ref()).await?))
}

async fn get_market_scan(
    State(state): State<AppState>,
) -> Result<Json<MarketSnapshot>, ApiError> {
    Ok(Json(load_snapshot(state.scan.as_ref()).await?))
}

async fn load_snapshot(source: &dyn MarketDataSource) -> anyhow::Result<MarketSnapshot> {
    let snapshot = source.snapshot().await?;
    tracing::debug!(
        source = source.source_name(),
        quotes = snapshot.quotes.len(),
        as_of = %snapshot.as_of,
        "market snapshot"
    );
    Ok(snapshot)
}

async fn get_suggestions(
    State(state): State<AppState>,
) -> Result<Json<SuggestionBatch>, ApiError> {
    let fetcher = state.fetcher()?;
    let snapshot = load_snapshot(state.market.as_ref()).await?;
    Ok(Json(fetcher.fetch_for_snapshot(&snapshot).await?))
}

async fn post_suggestions(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ScalpingSuggestions>, ApiError> {
    let Json(body) = payload?;
    let request = SuggestRequest::parse(body)?;
    Ok(Json(state.fetcher()?.fetch(request).await?))
}

async fn open_trade(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<TradeRecord>), ApiError> {
    let Json(body) = payload?;
    let request = OpenTradeRequest::parse(body)?;
    let trade = state.ledger.open(request).await?;
    Ok((StatusCode::CREATED, Json(trade)))
}

async fn close_trade(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TradeRecord>, ApiError> {
    let Json(body) = payload?;
    let request = CloseTradeRequest::parse(body)?;
    Ok(Json(state.ledger.close(request).await?))
}

async fn list_open_trades(
    State(state): State<AppState>,
) -> Result<Json<Vec<TradeRecord>>, ApiError> {
    Ok(Json(state.ledger.list_open().await?))
}

async fn mark_open_trades(
    State(state): State<AppState>,
) -> Result<Json<Vec<MarkedTrade>>, ApiError> {
    Ok(Json(state.ledger.mark_open(&state.marks).await?))
}

async fn list_closed_trades(
    State(state): State<AppState>,
) -> Result<Json<Vec<TradeRecord>>, ApiError> {
    Ok(Json(state.ledger.list_closed().await?))
}

async fn summarize_report(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ReportSummary>, ApiError> {
    let Json(body) = payload?;
    let request = SummarizeRequest::parse(body)?;
    Ok(Json(state.summarizer()?.summarize(request).await?))
}

async fn run_backtest(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BacktestReport>, ApiError> {
    let Json(body) = payload?;
    let request = BacktestRequest::parse(body)?;
    let report = backtest::run_and_summarize(state.summarizer()?, request).await?;
    Ok(Json(report))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
