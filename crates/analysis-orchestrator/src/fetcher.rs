use std::sync::Arc;
use std::time::Duration;

use analysis_core::{FetchError, FundamentalsProvider, RawFundamentals};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use yahoo_client::YahooClient;

use crate::stub::stub_fundamentals;

const MAX_SYMBOL_LEN: usize = 12;

/// Knobs for a fetch; `from_env` reads them once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub cache_enabled: bool,
    /// Serve synthetic fundamentals instead of calling the provider
    pub stub: bool,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            stub: false,
            timeout: Duration::from_secs(20),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl FetchOptions {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build options from a variable lookup (`SMOKE_TEST`, `DISABLE_CACHE`,
    /// `FETCH_TIMEOUT_SECS`, `CACHE_TTL_SECS`)
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| -> Duration {
            match get(key) {
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(n) => Duration::from_secs(n),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid {}={:?}", key, raw);
                        default
                    }
                },
                None => default,
            }
        };

        Self {
            cache_enabled: !get("DISABLE_CACHE").map_or(false, |v| parse_flag(&v)),
            stub: get("SMOKE_TEST").map_or(false, |v| parse_flag(&v)),
            timeout: secs("FETCH_TIMEOUT_SECS", defaults.timeout),
            cache_ttl: secs("CACHE_TTL_SECS", defaults.cache_ttl),
        }
    }
}

/// `1/true/yes/on`, case-insensitive
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Trim and upper-case a ticker, rejecting anything that cannot be a symbol
pub fn normalize_symbol(input: &str) -> Result<String, FetchError> {
    let symbol = input.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(FetchError::not_found(symbol, "empty ticker"));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(FetchError::not_found(symbol, "ticker too long"));
    }
    let valid = symbol
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '^' | '='));
    if !valid {
        return Err(FetchError::not_found(symbol, "malformed ticker"));
    }
    Ok(symbol)
}

struct CacheEntry {
    data: RawFundamentals,
    cached_at: DateTime<Utc>,
}

/// Provider wrapper adding stub mode, a TTL cache and a hard timeout
pub struct Fetcher {
    provider: Arc<dyn FundamentalsProvider>,
    options: FetchOptions,
    cache: DashMap<String, CacheEntry>,
}

impl Fetcher {
    pub fn new(provider: Arc<dyn FundamentalsProvider>, options: FetchOptions) -> Self {
        Self {
            provider,
            options,
            cache: DashMap::new(),
        }
    }

    /// Live Yahoo provider configured from the environment
    pub fn from_env() -> Self {
        let options = FetchOptions::from_env();
        let client = YahooClient::from_env().with_timeout(options.timeout);
        Self::new(Arc::new(client), options)
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub async fn fetch(&self, ticker: &str) -> Result<RawFundamentals, FetchError> {
        self.fetch_with(ticker, &self.options).await
    }

    pub async fn fetch_with(
        &self,
        ticker: &str,
        options: &FetchOptions,
    ) -> Result<RawFundamentals, FetchError> {
        let symbol = normalize_symbol(ticker)?;

        if options.stub {
            tracing::debug!("Stub fundamentals for {}", symbol);
            return Ok(stub_fundamentals(&symbol));
        }

        if options.cache_enabled {
            if let Some(entry) = self.cache.get(&symbol) {
                let fresh = (Utc::now() - entry.cached_at)
                    .to_std()
                    .map_or(false, |age| age < options.cache_ttl);
                if fresh {
                    tracing::debug!("Cache hit for {}", symbol);
                    return Ok(entry.data.clone());
                }
            }
            tracing::debug!("Cache miss for {}", symbol);
        }

        let attempt = self.provider.fetch_within(&symbol, options.timeout);
        let result = match tokio::time::timeout(options.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                after_ms: options.timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(raw) => {
                if options.cache_enabled {
                    self.cache.insert(
                        symbol,
                        CacheEntry {
                            data: raw.clone(),
                            cached_at: Utc::now(),
                        },
                    );
                }
                Ok(raw)
            }
            Err(e) => {
                tracing::warn!("Fetch failed for {} via {}: {}", symbol, self.provider.name(), e);
                Err(e)
            }
        }
    }
}
