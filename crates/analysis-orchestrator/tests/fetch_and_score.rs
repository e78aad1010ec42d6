use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use analysis_core::{
    FetchError, FetchErrorKind, FundamentalsProvider, RawFundamentals, Recommendation, TickerReport,
};
use analysis_orchestrator::{stub_fundamentals, FetchOptions, Fetcher, ScorecardService};
use async_trait::async_trait;
use fundamental_analysis::FundamentalAnalysisEngine;
use wiremock::{Mock, MockServer, ResponseTemplate};
use yahoo_client::YahooClient;

/// Serves canned fundamentals, counting calls; unknown symbols are NotFound
#[derive(Default)]
struct MockProvider {
    data: HashMap<String, RawFundamentals>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl MockProvider {
    fn with(mut self, raw: RawFundamentals) -> Self {
        self.data.insert(raw.symbol.clone(), raw);
        self
    }

    fn slow(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FundamentalsProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch(&self, symbol: &str) -> Result<RawFundamentals, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(symbol) {
            tokio::time::sleep(*delay).await;
        }
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| FetchError::not_found(symbol, "no such symbol"))
    }
}

fn options() -> FetchOptions {
    FetchOptions {
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn second_fetch_within_ttl_is_served_from_cache() {
    let provider = Arc::new(MockProvider::default().with(stub_fundamentals("AAPL")));
    let fetcher = Fetcher::new(provider.clone(), options());

    let first = fetcher.fetch("aapl").await.unwrap();
    let second = fetcher.fetch(" AAPL ").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.calls(), 1);
    assert_eq!(fetcher.cached_len(), 1);
}

#[tokio::test]
async fn disabled_cache_always_calls_provider() {
    let provider = Arc::new(MockProvider::default().with(stub_fundamentals("AAPL")));
    let fetcher = Fetcher::new(
        provider.clone(),
        FetchOptions {
            cache_enabled: false,
            ..options()
        },
    );

    fetcher.fetch("AAPL").await.unwrap();
    fetcher.fetch("AAPL").await.unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(fetcher.cached_len(), 0);
}

#[tokio::test]
async fn expired_entries_are_refetched() {
    let provider = Arc::new(MockProvider::default().with(stub_fundamentals("AAPL")));
    let fetcher = Fetcher::new(
        provider.clone(),
        FetchOptions {
            cache_ttl: Duration::ZERO,
            ..options()
        },
    );

    fetcher.fetch("AAPL").await.unwrap();
    fetcher.fetch("AAPL").await.unwrap();
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let provider = Arc::new(MockProvider::default());
    let fetcher = Fetcher::new(provider.clone(), options());

    assert!(fetcher.fetch("NOPE").await.is_err());
    assert!(fetcher.fetch("NOPE").await.is_err());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn stub_mode_never_touches_provider() {
    let provider = Arc::new(MockProvider::default());
    let fetcher = Fetcher::new(
        provider.clone(),
        FetchOptions {
            stub: true,
            ..options()
        },
    );

    let raw = fetcher.fetch("zzzz").await.unwrap();
    assert_eq!(raw, stub_fundamentals("ZZZZ"));
    assert_eq!(provider.calls(), 0);
    assert_eq!(fetcher.cached_len(), 0);
}

#[tokio::test]
async fn malformed_ticker_fails_without_network() {
    let provider = Arc::new(MockProvider::default());
    let fetcher = Fetcher::new(provider.clone(), options());

    let err = fetcher.fetch("not a ticker!").await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::NotFound);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn slow_provider_times_out() {
    let provider = Arc::new(
        MockProvider::default()
            .with(stub_fundamentals("SLOW"))
            .slow("SLOW", Duration::from_secs(2)),
    );
    let fetcher = Fetcher::new(
        provider,
        FetchOptions {
            timeout: Duration::from_millis(50),
            ..options()
        },
    );

    let err = fetcher.fetch("SLOW").await.unwrap_err();
    assert_eq!(err, FetchError::Timeout { after_ms: 50 });
}

#[tokio::test]
async fn long_retry_after_reports_rate_limit_not_timeout() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(
        Arc::new(YahooClient::with_base_url(server.uri())),
        FetchOptions {
            timeout: Duration::from_secs(2),
            ..Default::default()
        },
    );

    let err = fetcher.fetch("AAPL").await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::RateLimited);
}

#[tokio::test]
async fn batch_keeps_order_and_isolates_failures() {
    let mut sparse = RawFundamentals::new("THIN");
    sparse.price = Some(10.0);

    let provider = Arc::new(
        MockProvider::default()
            .with(stub_fundamentals("AAPL"))
            .with(stub_fundamentals("MSFT"))
            .with(sparse)
            // Finishes last despite being requested first
            .slow("AAPL", Duration::from_millis(100)),
    );
    let service = ScorecardService::new(
        Fetcher::new(provider, options()),
        FundamentalAnalysisEngine::new(),
    )
    .with_concurrency(3);

    let tickers: Vec<String> = ["AAPL", "ZZZZ", "MSFT", "THIN"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let reports = service.run(&tickers).await;

    let symbols: Vec<&str> = reports.iter().map(|r| r.symbol()).collect();
    assert_eq!(symbols, vec!["AAPL", "ZZZZ", "MSFT", "THIN"]);

    assert_eq!(
        reports[0].scorecard().map(|c| c.recommendation),
        Some(Recommendation::Buy)
    );
    assert_eq!(
        reports[1].error().map(|e| e.kind()),
        Some(FetchErrorKind::NotFound)
    );
    assert!(!reports[2].is_failed());

    match &reports[3] {
        TickerReport::Scored {
            warnings, scorecard, ..
        } => {
            assert_eq!(warnings.len(), 3);
            assert_eq!(scorecard.recommendation, Recommendation::Unknown);
        }
        other => panic!("expected scored report, got {:?}", other),
    }
}
