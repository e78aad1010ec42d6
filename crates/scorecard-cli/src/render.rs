use std::fmt::Write;

use analysis_core::{CompanyProfile, ScoreCard, TickerReport, Verdict};
use fundamental_analysis::ScoringConfig;

/// Human-readable scorecard table per ticker
pub fn render_text(reports: &[TickerReport], config: &ScoringConfig) -> String {
    let mut out = String::new();
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        match report {
            TickerReport::Scored {
                symbol,
                profile,
                warnings,
                scorecard,
            } => {
                let _ = writeln!(out, "{}", heading(symbol, profile));
                write_scorecard(&mut out, scorecard, config);
                for warning in warnings {
                    let _ = writeln!(out, "  warning: {}", warning);
                }
            }
            TickerReport::Failed { symbol, error } => {
                let _ = writeln!(out, "{}", symbol);
                let _ = writeln!(out, "  error: {}", error);
            }
        }
    }
    out
}

pub fn render_json(reports: &[TickerReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

fn heading(symbol: &str, profile: &CompanyProfile) -> String {
    let mut line = symbol.to_string();
    if let Some(name) = profile.name.as_deref().filter(|n| *n != symbol) {
        let _ = write!(line, "  {}", name);
    }
    match (&profile.sector, &profile.industry) {
        (Some(sector), Some(industry)) => {
            let _ = write!(line, " ({} / {})", sector, industry);
        }
        (Some(only), None) | (None, Some(only)) => {
            let _ = write!(line, " ({})", only);
        }
        (None, None) => {}
    }
    line
}

fn write_scorecard(out: &mut String, card: &ScoreCard, config: &ScoringConfig) {
    let _ = writeln!(
        out,
        "  Recommendation: {}  ({} pass, {} fail, {} unknown)",
        card.recommendation.to_label(),
        card.pass_count,
        card.fail_count,
        card.unknown_count
    );
    let _ = writeln!(
        out,
        "  {:<24} {:>12}  {:<12} {}",
        "Metric", "Value", "Threshold", "Verdict"
    );
    for result in &card.results {
        let verdict = match (&result.verdict, &result.unavailable) {
            (Verdict::Unknown, Some(reason)) => format!("Unknown ({})", reason),
            (verdict, _) => verdict.to_label().to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<24} {:>12}  {:<12} {}",
            result.name,
            result.display,
            config.threshold(result.id).describe(),
            verdict
        );
    }
}
