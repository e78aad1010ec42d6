use serde::Serialize;
use thiserror::Error;

/// Why fundamentals for a ticker could not be obtained.
///
/// Every variant means "no data for this ticker"; the variants exist so callers
/// can log and report them differently.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("No data found for {symbol}: {detail}")]
    NotFound { symbol: String, detail: String },

    #[error("Rate limited by {host}{}", retry_hint(.retry_after_secs))]
    RateLimited {
        host: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("Unexpected response schema: {detail}")]
    SchemaChanged { detail: String },

    #[error("Transport failure: {detail}")]
    Unknown {
        detail: String,
        status: Option<u16>,
    },
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    }
}

/// Discriminant of [`FetchError`], handy for counters and log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    NotFound,
    RateLimited,
    Timeout,
    SchemaChanged,
    Unknown,
}

impl FetchError {
    pub fn not_found(symbol: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::NotFound {
            symbol: symbol.into(),
            detail: detail.into(),
        }
    }

    pub fn schema(detail: impl Into<String>) -> Self {
        Self::SchemaChanged {
            detail: detail.into(),
        }
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::Unknown {
            detail: detail.into(),
            status: None,
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::NotFound { .. } => FetchErrorKind::NotFound,
            FetchError::RateLimited { .. } => FetchErrorKind::RateLimited,
            FetchError::Timeout { .. } => FetchErrorKind::Timeout,
            FetchError::SchemaChanged { .. } => FetchErrorKind::SchemaChanged,
            FetchError::Unknown { .. } => FetchErrorKind::Unknown,
        }
    }

    /// Transient failures are worth retrying later; the rest will not change on their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            FetchErrorKind::RateLimited | FetchErrorKind::Timeout | FetchErrorKind::Unknown
        )
    }
}
