//! Tunable scoring configuration.
//!
//! Thresholds and the recommendation policy are product decisions, so they live
//! here as data rather than inside the formulas. Defaults mirror the classic
//! value-investing rules of thumb; any of them can be overridden from TOML:
//!
//! ```toml
//! growth_window = 4
//!
//! [recommendation]
//! buy_min_pass_ratio = 0.7
//!
//! [thresholds]
//! net_profit_margin = { rule = "at_least", min = 12.0 }
//! current_ratio = { rule = "between", min = 1.2, max = 8.0 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use analysis_core::{MetricId, MetricValue, Recommendation, Verdict};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::{definition, Direction};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown metric '{0}' in thresholds")]
    UnknownMetric(String),

    #[error("Rule '{rule}' does not fit metric '{metric}'")]
    IncompatibleRule { metric: &'static str, rule: &'static str },

    #[error("Threshold for '{0}' must be finite, with min <= max")]
    InvalidThreshold(&'static str),

    #[error("Invalid recommendation policy: {0}")]
    InvalidPolicy(String),

    #[error("growth_window must be at least 2, got {0}")]
    InvalidGrowthWindow(usize),
}

/// Pass rule for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case", deny_unknown_fields)]
pub enum Threshold {
    AtLeast { min: f64 },
    AtMost { max: f64 },
    GreaterThan { min: f64 },
    Between { min: f64, max: f64 },
    Expect { value: bool },
}

impl Threshold {
    pub fn evaluate(&self, value: MetricValue) -> Verdict {
        let passed = match (self, value) {
            (_, MetricValue::NotApplicable) => return Verdict::Unknown,
            (Threshold::AtLeast { min }, MetricValue::Number(v)) => v >= *min,
            (Threshold::AtMost { max }, MetricValue::Number(v)) => v <= *max,
            (Threshold::GreaterThan { min }, MetricValue::Number(v)) => v > *min,
            (Threshold::Between { min, max }, MetricValue::Number(v)) => v >= *min && v <= *max,
            (Threshold::Expect { value }, MetricValue::Flag(b)) => b == *value,
            // Shape mismatches are rejected by `ScoringConfig::validate`
            _ => return Verdict::Unknown,
        };
        if passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn rule_name(&self) -> &'static str {
        match self {
            Threshold::AtLeast { .. } => "at_least",
            Threshold::AtMost { .. } => "at_most",
            Threshold::GreaterThan { .. } => "greater_than",
            Threshold::Between { .. } => "between",
            Threshold::Expect { .. } => "expect",
        }
    }

    /// Short human form, e.g. `>= 10` or `1.5..=10`
    pub fn describe(&self) -> String {
        match self {
            Threshold::AtLeast { min } => format!(">= {}", min),
            Threshold::AtMost { max } => format!("<= {}", max),
            Threshold::GreaterThan { min } => format!("> {}", min),
            Threshold::Between { min, max } => format!("{}..={}", min, max),
            Threshold::Expect { value } => {
                if *value {
                    "Yes".to_string()
                } else {
                    "No".to_string()
                }
            }
        }
    }

    fn fits(&self, direction: Direction) -> bool {
        match direction {
            Direction::HigherIsBetter => matches!(
                self,
                Threshold::AtLeast { .. } | Threshold::GreaterThan { .. } | Threshold::Between { .. }
            ),
            Direction::LowerIsBetter => {
                matches!(self, Threshold::AtMost { .. } | Threshold::Between { .. })
            }
            Direction::Banded => matches!(self, Threshold::Between { .. }),
            Direction::Flag => matches!(self, Threshold::Expect { .. }),
        }
    }

    fn is_well_formed(&self) -> bool {
        match self {
            Threshold::AtLeast { min } | Threshold::GreaterThan { min } => min.is_finite(),
            Threshold::AtMost { max } => max.is_finite(),
            Threshold::Between { min, max } => min.is_finite() && max.is_finite() && min <= max,
            Threshold::Expect { .. } => true,
        }
    }
}

/// Default pass rule per metric
pub fn default_threshold(id: MetricId) -> Threshold {
    use Threshold::*;
    match id {
        MetricId::NetProfitMargin => AtLeast { min: 10.0 },
        MetricId::ReturnOnEquity => AtLeast { min: 10.0 },
        MetricId::PriceToEarnings => Between { min: 0.0, max: 25.0 },
        MetricId::PriceToBook => AtMost { max: 3.0 },
        MetricId::PriceToSales => AtMost { max: 3.0 },
        MetricId::DividendYield => AtLeast { min: 2.0 },
        MetricId::CurrentRatio => Between { min: 1.5, max: 10.0 },
        MetricId::QuickRatio => AtLeast { min: 1.0 },
        MetricId::CashFlowPerShare => GreaterThan { min: 0.0 },
        MetricId::SalesPerShare => GreaterThan { min: 0.0 },
        MetricId::SalesGrowth => AtLeast { min: 5.0 },
        MetricId::EpsGrowth => AtLeast { min: 5.0 },
        MetricId::OperatingMargin => AtLeast { min: 10.0 },
        MetricId::DebtToEquity => AtMost { max: 1.0 },
        MetricId::FreeCashFlow => GreaterThan { min: 0.0 },
        MetricId::EbitdaMargin => AtLeast { min: 10.0 },
        MetricId::ReturnOnAssets => AtLeast { min: 5.0 },
        MetricId::EvToEbitda => AtMost { max: 20.0 },
        MetricId::PegRatio => AtMost { max: 1.5 },
        MetricId::InsiderOwnership => AtLeast { min: 5.0 },
        MetricId::Buybacks => Expect { value: true },
    }
}

/// Maps aggregate pass/fail counts to a recommendation.
///
/// Unknown metrics are excluded from the pass ratio. When nothing could be
/// evaluated the result is `Recommendation::Unknown`, never Hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecommendationPolicy {
    /// Buy needs pass / (pass + fail) at or above this
    pub buy_min_pass_ratio: f64,
    /// ...and no more than this many failed metrics
    pub buy_max_fails: usize,
    /// Sell when pass / (pass + fail) is strictly below this
    pub sell_below_pass_ratio: f64,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            buy_min_pass_ratio: 0.65,
            buy_max_fails: 5,
            sell_below_pass_ratio: 0.35,
        }
    }
}

impl RecommendationPolicy {
    pub fn recommend(&self, pass: usize, fail: usize, _unknown: usize) -> Recommendation {
        let evaluated = pass + fail;
        if evaluated == 0 {
            return Recommendation::Unknown;
        }

        let ratio = pass as f64 / evaluated as f64;
        if ratio >= self.buy_min_pass_ratio && fail <= self.buy_max_fails {
            Recommendation::Buy
        } else if ratio < self.sell_below_pass_ratio {
            Recommendation::Sell
        } else {
            Recommendation::Hold
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |r: f64| (0.0..=1.0).contains(&r);
        if !in_unit(self.buy_min_pass_ratio) || !in_unit(self.sell_below_pass_ratio) {
            return Err(ConfigError::InvalidPolicy(
                "pass ratios must lie within [0, 1]".to_string(),
            ));
        }
        if self.sell_below_pass_ratio >= self.buy_min_pass_ratio {
            return Err(ConfigError::InvalidPolicy(format!(
                "sell_below_pass_ratio ({}) must be below buy_min_pass_ratio ({})",
                self.sell_below_pass_ratio, self.buy_min_pass_ratio
            )));
        }
        Ok(())
    }
}

/// Scoring configuration: threshold overrides, policy and growth window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Number of trailing yearly slots used for compound growth
    pub growth_window: usize,
    pub recommendation: RecommendationPolicy,
    /// Overrides keyed by metric key (see `MetricId::key`)
    pub thresholds: BTreeMap<String, Threshold>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            growth_window: 4,
            recommendation: RecommendationPolicy::default(),
            thresholds: BTreeMap::new(),
        }
    }
}

impl ScoringConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: ScoringConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(
            "Loaded scoring config from {} ({} threshold override(s))",
            path.display(),
            config.thresholds.len()
        );
        Ok(config)
    }

    /// Effective threshold for a metric: override if configured, else the default
    pub fn threshold(&self, id: MetricId) -> Threshold {
        self.thresholds
            .get(id.key())
            .copied()
            .unwrap_or_else(|| default_threshold(id))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.growth_window < 2 {
            return Err(ConfigError::InvalidGrowthWindow(self.growth_window));
        }
        self.recommendation.validate()?;

        for (key, threshold) in &self.thresholds {
            let id = MetricId::from_key(key).ok_or_else(|| ConfigError::UnknownMetric(key.clone()))?;
            let def = definition(id);
            if !threshold.fits(def.direction) {
                return Err(ConfigError::IncompatibleRule {
                    metric: id.key(),
                    rule: threshold.rule_name(),
                });
            }
            if !threshold.is_well_formed() {
                return Err(ConfigError::InvalidThreshold(id.key()));
            }
        }
        Ok(())
    }
}
