use std::time::Duration;

use async_trait::async_trait;
use crate::{FetchError, RawFundamentals};

/// Source of raw fundamentals for a single, already-normalized ticker
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Short provider name for logs and error attribution
    fn name(&self) -> &'static str;

    async fn fetch(&self, symbol: &str) -> Result<RawFundamentals, FetchError>;

    /// Fetch that has to settle within `budget`. Providers that retry should
    /// give up with their own error rather than sleep past it.
    async fn fetch_within(
        &self,
        symbol: &str,
        budget: Duration,
    ) -> Result<RawFundamentals, FetchError> {
        let _ = budget;
        self.fetch(symbol).await
    }
}
