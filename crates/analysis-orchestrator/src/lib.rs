pub mod fetcher;
pub mod service;
pub mod stub;
pub mod watchlist;

pub use fetcher::{normalize_symbol, parse_flag, FetchOptions, Fetcher};
pub use service::{data_warnings, normalize_tickers, ScorecardService, CRITICAL_FIELDS, DEFAULT_CONCURRENCY};
pub use stub::stub_fundamentals;
pub use watchlist::{load_watchlist, DEFAULT_TICKERS};
