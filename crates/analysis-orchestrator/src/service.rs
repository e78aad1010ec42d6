use std::collections::HashSet;

use analysis_core::{Field, RawFundamentals, TickerReport};
use fundamental_analysis::FundamentalAnalysisEngine;
use futures_util::stream::{self, StreamExt};

use crate::fetcher::{normalize_symbol, Fetcher};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Fields whose absence is called out in a report's warnings
pub const CRITICAL_FIELDS: [Field; 3] = [Field::MarketCap, Field::Revenue, Field::TotalDebt];

/// Trim, upper-case, drop empties and de-duplicate, keeping first occurrences
pub fn normalize_tickers<I, S>(inputs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    inputs
        .into_iter()
        .map(|s| s.as_ref().trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Warnings for critical fields the provider did not report
pub fn data_warnings(raw: &RawFundamentals) -> Vec<String> {
    CRITICAL_FIELDS
        .iter()
        .filter(|f| !raw.has(**f))
        .map(|f| format!("Missing {}; related metrics are unavailable", f.label()))
        .collect()
}

/// Fetches and scores batches of tickers
pub struct ScorecardService {
    fetcher: Fetcher,
    engine: FundamentalAnalysisEngine,
    concurrency: usize,
}

impl ScorecardService {
    pub fn new(fetcher: Fetcher, engine: FundamentalAnalysisEngine) -> Self {
        Self {
            fetcher,
            engine,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Fetch and score one ticker; failures become a `Failed` report
    pub async fn report(&self, ticker: &str) -> TickerReport {
        let symbol = normalize_symbol(ticker).unwrap_or_else(|_| ticker.trim().to_ascii_uppercase());

        match self.fetcher.fetch(ticker).await {
            Ok(raw) => {
                let warnings = data_warnings(&raw);
                for warning in &warnings {
                    tracing::warn!("{}: {}", symbol, warning);
                }
                let scorecard = self.engine.score(&raw);
                TickerReport::Scored {
                    symbol,
                    profile: raw.profile,
                    warnings,
                    scorecard,
                }
            }
            Err(error) => TickerReport::Failed { symbol, error },
        }
    }

    /// Score every ticker concurrently; reports come back in request order
    pub async fn run(&self, tickers: &[String]) -> Vec<TickerReport> {
        tracing::info!(
            "Scoring {} ticker(s) via {} (concurrency {})",
            tickers.len(),
            self.fetcher.provider_name(),
            self.concurrency
        );

        let reports: Vec<TickerReport> = stream::iter(tickers.iter().map(|t| self.report(t)))
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = reports.iter().filter(|r| r.is_failed()).count();
        tracing::info!("Done: {} scored, {} failed", reports.len() - failed, failed);
        reports
    }
}
