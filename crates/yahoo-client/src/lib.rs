pub mod cooldown;
pub mod parse;
pub mod retry;

pub use cooldown::HostCooldown;
pub use parse::{parse_quote_summary, MODULES};
pub use retry::RetryPolicy;

use analysis_core::{FetchError, FundamentalsProvider, RawFundamentals};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Retryable failure of a single attempt
enum Attempt {
    RateLimited(Option<Duration>),
    Server(StatusCode),
    Transport(String),
}

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    host: String,
    timeout: Duration,
    retry: RetryPolicy,
    cooldown: HostCooldown,
}

impl YahooClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let host = reqwest::Url::parse(&base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| base_url.clone());

        Self {
            client: build_client(DEFAULT_TIMEOUT),
            base_url,
            host,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            cooldown: HostCooldown::new(),
        }
    }

    /// Reads `YAHOO_BASE_URL`, falling back to the public endpoint
    pub fn from_env() -> Self {
        match std::env::var("YAHOO_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(url.trim()),
            _ => Self::new(),
        }
    }

    /// Per-request HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = build_client(timeout);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Share cooldown state between clients hitting the same host
    pub fn with_cooldown(mut self, cooldown: HostCooldown) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn rate_limited(&self, wait: Option<Duration>) -> FetchError {
        FetchError::RateLimited {
            host: self.host.clone(),
            retry_after_secs: wait.map(|d| d.as_secs_f64().ceil() as u64),
        }
    }

    /// GET with bounded, jittered retry on 429/5xx/connection errors.
    ///
    /// Retries stop early when the next wait would run past `budget`, so the
    /// caller sees the rate-limit or server error rather than its own timeout.
    async fn send_request(
        &self,
        symbol: &str,
        url: &str,
        budget: Duration,
    ) -> Result<String, FetchError> {
        if let Some(remaining) = self.cooldown.remaining(&self.host) {
            tracing::debug!("{} still cooling down, skipping {}", self.host, symbol);
            return Err(self.rate_limited(Some(remaining)));
        }

        let modules = MODULES.join(",");
        let started = tokio::time::Instant::now();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = self
                .client
                .get(url)
                .query(&[("modules", modules.as_str())])
                .send()
                .await;

            let failure = match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().await.map_err(|e| self.transport_error(e));
                    }
                    if status == StatusCode::NOT_FOUND {
                        let body = response.text().await.unwrap_or_default();
                        return Err(match parse_quote_summary(symbol, &body) {
                            Err(err @ FetchError::NotFound { .. }) => err,
                            _ => FetchError::not_found(symbol, "HTTP 404"),
                        });
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = retry_after(response.headers());
                        let cooldown = retry_after
                            .unwrap_or(self.retry.max_delay)
                            .min(self.retry.max_retry_after);
                        self.cooldown.mark(&self.host, cooldown);
                        Attempt::RateLimited(retry_after)
                    } else if status.is_server_error() {
                        Attempt::Server(status)
                    } else {
                        return Err(FetchError::Unknown {
                            detail: format!("HTTP {} for {}", status, symbol),
                            status: Some(status.as_u16()),
                        });
                    }
                }
                Err(e) if e.is_timeout() => {
                    return Err(FetchError::Timeout {
                        after_ms: self.timeout.as_millis() as u64,
                    });
                }
                Err(e) => Attempt::Transport(e.to_string()),
            };

            if attempt >= self.retry.max_attempts {
                return Err(self.give_up(failure, attempt));
            }

            let delay = match &failure {
                Attempt::RateLimited(wait) => self.retry.rate_limit_delay(attempt, *wait),
                _ => self.retry.backoff(attempt),
            };
            if started.elapsed() + delay >= budget {
                tracing::warn!(
                    "Yahoo retry for {} would wait {:.1}s, past the {:.1}s budget",
                    symbol,
                    delay.as_secs_f64(),
                    budget.as_secs_f64()
                );
                return Err(self.give_up(failure, attempt));
            }
            let reason = match &failure {
                Attempt::RateLimited(_) => "429 rate limited".to_string(),
                Attempt::Server(status) => format!("HTTP {}", status),
                Attempt::Transport(detail) => detail.clone(),
            };
            tracing::warn!(
                "Yahoo {} for {}, waiting {:.1}s before retry {}/{}",
                reason,
                symbol,
                delay.as_secs_f64(),
                attempt,
                self.retry.max_attempts - 1
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn give_up(&self, failure: Attempt, attempt: u32) -> FetchError {
        match failure {
            Attempt::RateLimited(wait) => self.rate_limited(wait),
            Attempt::Server(status) => FetchError::Unknown {
                detail: format!("HTTP {} after {} attempts", status, attempt),
                status: Some(status.as_u16()),
            },
            Attempt::Transport(detail) => FetchError::unknown(detail),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            FetchError::unknown(e.to_string())
        }
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FundamentalsProvider for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch(&self, symbol: &str) -> Result<RawFundamentals, FetchError> {
        self.fetch_within(symbol, self.timeout).await
    }

    async fn fetch_within(
        &self,
        symbol: &str,
        budget: Duration,
    ) -> Result<RawFundamentals, FetchError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
        let body = self.send_request(symbol, &url, budget).await?;
        let raw = parse_quote_summary(symbol, &body)?;
        tracing::debug!(
            "Fetched {} from Yahoo ({} field(s) missing)",
            symbol,
            raw.missing_fields().len()
        );
        Ok(raw)
    }
}

fn build_client(timeout: Duration) -> Client {
    let mut headers = HeaderMap::new();
    if let Ok(ua) = BROWSER_UA.parse() {
        headers.insert(USER_AGENT, ua);
    }
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Retry-After in delta-seconds form; HTTP-date values are ignored
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
