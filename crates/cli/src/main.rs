use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scalpdesk_core::advisor::suggestions::SuggestionFetcher;
use scalpdesk_core::advisor::summary::ReportSummarizer;
use scalpdesk_core::backtest::{self, BacktestRequest, Strategy};
use scalpdesk_core::config::Settings;
use scalpdesk_core::domain::request::{SuggestRequest, SummarizeRequest};
use scalpdesk_core::llm::anthropic::AnthropicClient;
use scalpdesk_core::llm::LlmClient;
use scalpdesk_core::market::jitter::RandomJitter;
use scalpdesk_core::market::scan::LiveMarketScan;
use scalpdesk_core::market::{MarketDataSource, MockMarketData};

#[derive(Debug, Parser)]
#[command(name = "scalpdesk")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the mock market snapshot.
    Snapshot,

    /// Print successive ticks of the live market scan.
    Scan {
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=100))]
        ticks: u32,

        /// Fixed RNG seed for a reproducible walk; 0 picks one at random.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Ask the AI for scalping picks.
    Suggest {
        /// JSON stock data to rank. Defaults to the mock snapshot, joined back into full suggestions.
        #[arg(long)]
        stock_data_file: Option<PathBuf>,

        /// Market sentiment line sent with --stock-data-file.
        #[arg(long, requires = "stock_data_file")]
        sentiment: Option<String>,
    },

    /// Summarize a backtesting report read from a file.
    Summarize {
        #[arg(long)]
        report_file: PathBuf,
    },

    /// Run a canned backtest.
    Backtest {
        #[arg(long, default_value = "NIFTY50")]
        ticker: String,

        /// AI_SCALPING_V1, MA_CROSSOVER, RSI_EXTREME or GENERAL_TREND_FOLLOWING.
        #[arg(long, default_value = "AI_SCALPING_V1", value_parser = parse_strategy)]
        strategy: Strategy,

        /// YYYY-MM-DD
        #[arg(long, default_value = "2023-01-01")]
        start_date: String,

        /// YYYY-MM-DD
        #[arg(long, default_value = "2023-12-31")]
        end_date: String,

        /// Skip the AI summary and print the canned report text as well.
        #[arg(long)]
        no_summary: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(&settings, args.command).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "command failed");
    }
    result
}

async fn run(settings: &Settings, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Snapshot => {
            let snapshot = MockMarketData.snapshot().await?;
            print_json(&snapshot)
        }
        Command::Scan { ticks, seed } => {
            let scan = LiveMarketScan::new(Arc::new(RandomJitter::new(seed)));
            tracing::info!(source = scan.source_name(), ticks, seed, "running market scan");
            for _ in 0..ticks {
                print_json(&scan.snapshot().await?)?;
            }
            Ok(())
        }
        Command::Suggest {
            stock_data_file,
            sentiment,
        } => {
            let fetcher = SuggestionFetcher::new(llm(settings)?);
            match stock_data_file {
                Some(path) => {
                    let stock_data = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let request = SuggestRequest {
                        stock_data,
                        market_sentiment: sentiment.unwrap_or_default(),
                    };
                    print_json(&fetcher.fetch(request).await?)
                }
                None => {
                    let snapshot = MockMarketData.snapshot().await?;
                    print_json(&fetcher.fetch_for_snapshot(&snapshot).await?)
                }
            }
        }
        Command::Summarize { report_file } => {
            let report = std::fs::read_to_string(&report_file)
                .with_context(|| format!("failed to read {}", report_file.display()))?;
            let summarizer = ReportSummarizer::new(llm(settings)?);
            print_json(&summarizer.summarize(SummarizeRequest { report }).await?)
        }
        Command::Backtest {
            ticker,
            strategy,
            start_date,
            end_date,
            no_summary,
        } => {
            let request = BacktestRequest {
                stock_ticker: ticker,
                strategy,
                start_date: parse_date(&start_date)?,
                end_date: parse_date(&end_date)?,
            }
            .validate()?;

            if no_summary {
                let canned = backtest::run_canned(&request);
                println!("{}\n", canned.report_text);
                return print_json(&canned.report);
            }

            let summarizer = ReportSummarizer::new(llm(settings)?);
            print_json(&backtest::run_and_summarize(&summarizer, request).await?)
        }
    }
}

fn llm(settings: &Settings) -> anyhow::Result<Arc<dyn LlmClient>> {
    Ok(Arc::new(AnthropicClient::from_settings(settings)?))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_date(s: &str) -> anyhow::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date (expected YYYY-MM-DD): {s}"))
}

fn parse_strategy(s: &str) -> Result<Strategy, String> {
    Strategy::ALL
        .into_iter()
        .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown strategy: {s}"))
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
