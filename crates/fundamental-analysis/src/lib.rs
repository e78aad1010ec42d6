pub mod config;
pub mod format;
pub mod metrics;

pub use config::{default_threshold, ConfigError, RecommendationPolicy, ScoringConfig, Threshold};
pub use format::{format_money, format_value, NOT_AVAILABLE};
pub use metrics::{compound_growth, definition, Direction, MetricDefinition, ValueFormat, METRICS};

use analysis_core::{MetricResult, MetricValue, RawFundamentals, ScoreCard, Verdict};

/// Scores a ticker's fundamentals against the metric table.
///
/// Pure and deterministic: the same fundamentals and configuration always
/// produce the same scorecard, and a missing input only ever turns the metrics
/// that need it into `Unknown`.
pub struct FundamentalAnalysisEngine {
    config: ScoringConfig,
}

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }

    pub fn with_config(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Evaluate one metric: resolve inputs, compute, compare to its threshold
    pub fn evaluate(&self, def: &MetricDefinition, raw: &RawFundamentals) -> MetricResult {
        let computed = match def.inputs.iter().find(|f| !raw.has(**f)) {
            Some(field) => Err(analysis_core::Unavailable::MissingInput { field: *field }),
            None => (def.formula)(raw, &self.config),
        };

        let (value, unavailable) = match computed {
            Ok(value) => (value, None),
            Err(reason) => (MetricValue::NotApplicable, Some(reason)),
        };

        let verdict = self.config.threshold(def.id).evaluate(value);

        MetricResult {
            id: def.id,
            name: def.name,
            value,
            display: format_value(value, def.format),
            verdict,
            unavailable,
        }
    }

    pub fn score(&self, raw: &RawFundamentals) -> ScoreCard {
        let results: Vec<MetricResult> = METRICS.iter().map(|def| self.evaluate(def, raw)).collect();

        let count = |verdict: Verdict| results.iter().filter(|r| r.verdict == verdict).count();
        let pass_count = count(Verdict::Pass);
        let fail_count = count(Verdict::Fail);
        let unknown_count = count(Verdict::Unknown);

        let recommendation = self
            .config
            .recommendation
            .recommend(pass_count, fail_count, unknown_count);

        tracing::debug!(
            "Scored {}: {} pass, {} fail, {} unknown -> {}",
            raw.symbol,
            pass_count,
            fail_count,
            unknown_count,
            recommendation.to_label()
        );

        ScoreCard {
            symbol: raw.symbol.clone(),
            results,
            pass_count,
            fail_count,
            unknown_count,
            recommendation,
        }
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Score with the default configuration
pub fn score(raw: &RawFundamentals) -> ScoreCard {
    FundamentalAnalysisEngine::new().score(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Field, MetricId, Recommendation, Unavailable};
    use std::collections::BTreeMap;

    fn healthy() -> RawFundamentals {
        let mut raw = RawFundamentals::new("GOOD");
        raw.price = Some(50.0);
        raw.revenue = Some(1_000.0);
        raw.net_income = Some(150.0);
        raw.operating_income = Some(200.0);
        raw.ebitda = Some(250.0);
        raw.total_equity = Some(1_000.0);
        raw.total_debt = Some(400.0);
        raw.total_assets = Some(2_000.0);
        raw.current_assets = Some(600.0);
        raw.current_liabilities = Some(300.0);
        raw.inventory = Some(100.0);
        raw.operating_cash_flow = Some(220.0);
        raw.capital_expenditures = Some(-60.0);
        raw.shares_outstanding = Some(100.0);
        raw.eps = Some(5.0);
        raw.dividend_yield = Some(0.03);
        raw.insider_ownership = Some(0.08);
        raw.enterprise_value = Some(3_000.0);
        raw.market_cap = Some(5_000.0);
        raw.revenue_history = vec![Some(800.0), Some(870.0), Some(930.0), Some(1_000.0)];
        raw.eps_history = vec![Some(3.0), Some(3.5), Some(4.2), Some(5.0)];
        raw.buybacks = Some(true);
        raw
    }

    #[test]
    fn test_empty_fundamentals_score_unknown() {
        let card = score(&RawFundamentals::new("EMPTY"));

        assert_eq!(card.results.len(), 21);
        assert_eq!(card.unknown_count, 21);
        assert_eq!(card.pass_count, 0);
        assert_eq!(card.fail_count, 0);
        assert_eq!(card.recommendation, Recommendation::Unknown);
        for result in &card.results {
            assert_eq!(result.value, MetricValue::NotApplicable);
            assert_eq!(result.display, "N/A");
            assert!(matches!(result.unavailable, Some(Unavailable::MissingInput { .. })));
        }
    }

    #[test]
    fn test_exact_threshold_passes() {
        let mut raw = RawFundamentals::new("EDGE");
        raw.revenue = Some(100.0);
        raw.net_income = Some(10.0);

        let card = score(&raw);
        let margin = card.result(MetricId::NetProfitMargin).unwrap();
        assert_eq!(margin.value, MetricValue::Number(10.0));
        assert_eq!(margin.verdict, Verdict::Pass);
        assert_eq!(margin.display, "10.00%");
    }

    #[test]
    fn test_zero_current_liabilities_is_unknown_not_infinite() {
        let mut raw = RawFundamentals::new("ZERO");
        raw.current_assets = Some(500.0);
        raw.current_liabilities = Some(0.0);
        raw.inventory = Some(10.0);

        let card = score(&raw);
        for id in [MetricId::CurrentRatio, MetricId::QuickRatio] {
            let result = card.result(id).unwrap();
            assert_eq!(result.verdict, Verdict::Unknown);
            assert_eq!(
                result.unavailable,
                Some(Unavailable::InvalidDenominator {
                    field: Field::CurrentLiabilities
                })
            );
        }
    }

    #[test]
    fn test_results_follow_table_order_and_counts_add_up() {
        let card = score(&healthy());
        let ids: Vec<MetricId> = card.results.iter().map(|r| r.id).collect();
        assert_eq!(ids, MetricId::ALL.to_vec());
        assert_eq!(card.pass_count + card.fail_count + card.unknown_count, card.total());
    }

    #[test]
    fn test_healthy_company_is_a_buy() {
        let card = score(&healthy());
        assert_eq!(card.unknown_count, 0);
        assert_eq!(card.recommendation, Recommendation::Buy);
        // P/E of 10 sits inside the 0..=25 band
        assert_eq!(card.result(MetricId::PriceToEarnings).unwrap().verdict, Verdict::Pass);
    }

    #[test]
    fn test_missing_input_only_affects_dependent_metrics() {
        let mut raw = healthy();
        raw.revenue = None;
        let card = score(&raw);

        for result in &card.results {
            let needs_revenue = definition(result.id).inputs.contains(&Field::Revenue);
            if needs_revenue {
                assert_eq!(result.verdict, Verdict::Unknown, "{:?}", result.id);
                assert_eq!(
                    result.unavailable,
                    Some(Unavailable::MissingInput {
                        field: Field::Revenue
                    })
                );
            } else {
                assert_ne!(result.verdict, Verdict::Unknown, "{:?}", result.id);
            }
        }
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let raw = healthy();
        let engine = FundamentalAnalysisEngine::new();
        assert_eq!(engine.score(&raw), engine.score(&raw));
    }

    #[test]
    fn test_threshold_override_changes_verdict() {
        let mut thresholds = BTreeMap::new();
        thresholds.insert(
            "net_profit_margin".to_string(),
            Threshold::AtLeast { min: 20.0 },
        );
        let engine = FundamentalAnalysisEngine::with_config(ScoringConfig {
            thresholds,
            ..Default::default()
        })
        .unwrap();

        let card = engine.score(&healthy());
        assert_eq!(card.result(MetricId::NetProfitMargin).unwrap().verdict, Verdict::Fail);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = ScoringConfig {
            growth_window: 0,
            ..Default::default()
        };
        assert!(FundamentalAnalysisEngine::with_config(config).is_err());
    }
}
