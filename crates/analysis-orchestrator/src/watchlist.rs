use std::io;
use std::path::Path;

use crate::service::normalize_tickers;

/// Used when neither tickers nor a watchlist are supplied
pub const DEFAULT_TICKERS: [&str; 3] = ["AAPL", "MSFT", "META"];

/// Read a watchlist of comma- and/or newline-separated symbols.
///
/// Text after `#` on a line is ignored. A missing file is an empty watchlist;
/// other I/O errors are returned.
pub fn load_watchlist(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No watchlist at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let symbols = normalize_tickers(
        content
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default())
            .flat_map(|line| line.split(',')),
    );
    tracing::debug!("Loaded {} symbol(s) from {}", symbols.len(), path.display());
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_watchlist() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "aapl, msft").unwrap();
        writeln!(file, "# tech").unwrap();
        writeln!(file, "nvda # chips").unwrap();
        writeln!(file, "MSFT,,").unwrap();

        let symbols = load_watchlist(file.path()).unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn test_missing_watchlist_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let symbols = load_watchlist(dir.path().join("watchlist.txt")).unwrap();
        assert!(symbols.is_empty());
    }
}
