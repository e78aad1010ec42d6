//! value-scorecard: score tickers against value-investing fundamentals.
//!
//! Usage:
//!   value-scorecard --tickers AAPL,MSFT
//!   value-scorecard --watchlist watchlist.txt --format json
//!   SMOKE_TEST=1 value-scorecard -t DEMO      # synthetic data, no network
//!   value-scorecard -t KO --thresholds thresholds.toml --verbose

mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use analysis_orchestrator::{
    load_watchlist, normalize_tickers, Fetcher, ScorecardService, DEFAULT_CONCURRENCY, DEFAULT_TICKERS,
};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use fundamental_analysis::{FundamentalAnalysisEngine, ScoringConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "value-scorecard")]
#[command(about = "Value-investing scorecard: fundamentals, pass/fail metrics and a Buy/Hold/Sell call", long_about = None)]
#[command(version)]
struct Cli {
    /// Tickers to score, comma separated (may be repeated)
    #[arg(short, long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// File of comma- or newline-separated tickers
    #[arg(short, long)]
    watchlist: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// TOML file overriding thresholds and the recommendation policy
    #[arg(long)]
    thresholds: Option<PathBuf>,

    /// Tickers fetched in parallel
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "value_scorecard=debug,analysis_orchestrator=debug,fundamental_analysis=debug,yahoo_client=debug"
    } else {
        "value_scorecard=info,analysis_orchestrator=info,yahoo_client=warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Logs go to stderr so stdout stays a clean report
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Config problems surface as `Err` (exit 2); per-ticker failures as exit 1
async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.thresholds {
        Some(path) => ScoringConfig::load(path)
            .with_context(|| format!("loading thresholds from {}", path.display()))?,
        None => ScoringConfig::default(),
    };
    let engine = FundamentalAnalysisEngine::with_config(config.clone())?;

    let mut requested = cli.tickers.clone();
    if let Some(path) = &cli.watchlist {
        let listed = load_watchlist(path)
            .with_context(|| format!("reading watchlist {}", path.display()))?;
        if listed.is_empty() {
            tracing::warn!("Watchlist {} has no tickers", path.display());
        }
        requested.extend(listed);
    } else if requested.is_empty() {
        tracing::info!("No tickers given, using default watchlist {}", DEFAULT_TICKERS.join(","));
        requested.extend(DEFAULT_TICKERS.iter().map(|s| s.to_string()));
    }

    let tickers = normalize_tickers(&requested);
    if tickers.is_empty() {
        eprintln!("error: no tickers to score");
        return Ok(ExitCode::from(1));
    }

    let fetcher = Fetcher::from_env();
    if fetcher.options().stub {
        tracing::info!("SMOKE_TEST set: serving synthetic fundamentals, no network calls");
    }
    let service = ScorecardService::new(fetcher, engine).with_concurrency(cli.concurrency);
    let reports = service.run(&tickers).await;

    let output = match cli.format {
        OutputFormat::Text => render::render_text(&reports, &config),
        OutputFormat::Json => render::render_json(&reports).context("serializing report")?,
    };
    println!("{}", output.trim_end());

    if reports.iter().any(|r| r.is_failed()) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
