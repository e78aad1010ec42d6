//! Static metric table and formulas.
//!
//! Each formula returns either a value or the reason it could not be computed.
//! Division guards follow one rule: a denominator that is zero or negative makes
//! the metric unavailable instead of producing a misleading number.

use analysis_core::{Field, MetricId, MetricValue, RawFundamentals, Unavailable};

use crate::config::ScoringConfig;

/// Which way "good" points for a metric; constrains the threshold rules it accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
    /// Good only inside a band (e.g. current ratio)
    Banded,
    Flag,
}

/// Display style for a computed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    Percent,
    Ratio,
    Currency,
    PerShare,
    YesNo,
}

pub type Formula = fn(&RawFundamentals, &ScoringConfig) -> Result<MetricValue, Unavailable>;

pub struct MetricDefinition {
    pub id: MetricId,
    pub name: &'static str,
    /// Raw fields that must be present before the formula runs
    pub inputs: &'static [Field],
    pub direction: Direction,
    pub format: ValueFormat,
    pub formula: Formula,
}

impl std::fmt::Debug for MetricDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("direction", &self.direction)
            .field("format", &self.format)
            .finish()
    }
}

/// Every scored metric, in report order
pub static METRICS: [MetricDefinition; 21] = [
    MetricDefinition {
        id: MetricId::NetProfitMargin,
        name: "Net Profit Margin (%)",
        inputs: &[Field::NetIncome, Field::Revenue],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Percent,
        formula: net_profit_margin,
    },
    MetricDefinition {
        id: MetricId::ReturnOnEquity,
        name: "ROE (%)",
        inputs: &[Field::NetIncome, Field::TotalEquity],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Percent,
        formula: return_on_equity,
    },
    MetricDefinition {
        id: MetricId::PriceToEarnings,
        name: "P/E Ratio",
        inputs: &[Field::Price, Field::Eps],
        direction: Direction::Banded,
        format: ValueFormat::Ratio,
        formula: price_to_earnings,
    },
    MetricDefinition {
        id: MetricId::PriceToBook,
        name: "P/B Ratio",
        inputs: &[Field::Price, Field::TotalEquity, Field::SharesOutstanding],
        direction: Direction::LowerIsBetter,
        format: ValueFormat::Ratio,
        formula: price_to_book,
    },
    MetricDefinition {
        id: MetricId::PriceToSales,
        name: "P/S Ratio",
        inputs: &[Field::Price, Field::Revenue, Field::SharesOutstanding],
        direction: Direction::LowerIsBetter,
        format: ValueFormat::Ratio,
        formula: price_to_sales,
    },
    MetricDefinition {
        id: MetricId::DividendYield,
        name: "Dividend Yield (%)",
        inputs: &[Field::DividendYield],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Percent,
        formula: dividend_yield,
    },
    MetricDefinition {
        id: MetricId::CurrentRatio,
        name: "Current Ratio",
        inputs: &[Field::CurrentAssets, Field::CurrentLiabilities],
        direction: Direction::Banded,
        format: ValueFormat::Ratio,
        formula: current_ratio,
    },
    MetricDefinition {
        id: MetricId::QuickRatio,
        name: "Quick Ratio",
        inputs: &[Field::CurrentAssets, Field::Inventory, Field::CurrentLiabilities],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Ratio,
        formula: quick_ratio,
    },
    MetricDefinition {
        id: MetricId::CashFlowPerShare,
        name: "Cash Flow/Share",
        inputs: &[Field::OperatingCashFlow, Field::SharesOutstanding],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::PerShare,
        formula: cash_flow_per_share,
    },
    MetricDefinition {
        id: MetricId::SalesPerShare,
        name: "Sales/Share",
        inputs: &[Field::Revenue, Field::SharesOutstanding],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::PerShare,
        formula: sales_per_share,
    },
    MetricDefinition {
        id: MetricId::SalesGrowth,
        name: "4 Yr Sales Growth (%)",
        inputs: &[Field::RevenueHistory],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Percent,
        formula: sales_growth,
    },
    MetricDefinition {
        id: MetricId::EpsGrowth,
        name: "4 Yr EPS Growth (%)",
        inputs: &[Field::EpsHistory],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Percent,
        formula: eps_growth,
    },
    MetricDefinition {
        id: MetricId::OperatingMargin,
        name: "Operating Margin (%)",
        inputs: &[Field::OperatingIncome, Field::Revenue],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Percent,
        formula: operating_margin,
    },
    MetricDefinition {
        id: MetricId::DebtToEquity,
        name: "Debt/Equity",
        inputs: &[Field::TotalDebt, Field::TotalEquity],
        direction: Direction::LowerIsBetter,
        format: ValueFormat::Ratio,
        formula: debt_to_equity,
    },
    MetricDefinition {
        id: MetricId::FreeCashFlow,
        name: "Free Cash Flow",
        inputs: &[Field::OperatingCashFlow, Field::CapitalExpenditures],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Currency,
        formula: free_cash_flow,
    },
    MetricDefinition {
        id: MetricId::EbitdaMargin,
        name: "EBITDA Margin (%)",
        inputs: &[Field::Ebitda, Field::Revenue],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Percent,
        formula: ebitda_margin,
    },
    MetricDefinition {
        id: MetricId::ReturnOnAssets,
        name: "Return on Assets (%)",
        inputs: &[Field::NetIncome, Field::TotalAssets],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Percent,
        formula: return_on_assets,
    },
    MetricDefinition {
        id: MetricId::EvToEbitda,
        name: "EV / EBITDA",
        inputs: &[Field::EnterpriseValue, Field::Ebitda],
        direction: Direction::LowerIsBetter,
        format: ValueFormat::Ratio,
        formula: ev_to_ebitda,
    },
    MetricDefinition {
        id: MetricId::PegRatio,
        name: "PEG Ratio",
        inputs: &[Field::Price, Field::Eps, Field::EpsHistory],
        direction: Direction::LowerIsBetter,
        format: ValueFormat::Ratio,
        formula: peg_ratio,
    },
    MetricDefinition {
        id: MetricId::InsiderOwnership,
        name: "Insider Ownership (%)",
        inputs: &[Field::InsiderOwnership],
        direction: Direction::HigherIsBetter,
        format: ValueFormat::Percent,
        formula: insider_ownership,
    },
    MetricDefinition {
        id: MetricId::Buybacks,
        name: "Buybacks",
        inputs: &[Field::Buybacks],
        direction: Direction::Flag,
        format: ValueFormat::YesNo,
        formula: buybacks,
    },
];

/// Table entry for `id`
pub fn definition(id: MetricId) -> &'static MetricDefinition {
    // METRICS is declared in MetricId order; checked by test_table_matches_metric_order
    &METRICS[id as usize]
}

fn input(raw: &RawFundamentals, field: Field) -> Result<f64, Unavailable> {
    raw.number(field).ok_or(Unavailable::MissingInput { field })
}

fn finite(value: f64) -> Result<f64, Unavailable> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Unavailable::NonFinite)
    }
}

/// `numerator / denominator`, unavailable unless the denominator is strictly positive
fn divide(numerator: f64, denominator: f64, field: Field) -> Result<f64, Unavailable> {
    if denominator > 0.0 {
        finite(numerator / denominator)
    } else {
        Err(Unavailable::InvalidDenominator { field })
    }
}

fn ratio(raw: &RawFundamentals, numerator: Field, denominator: Field) -> Result<f64, Unavailable> {
    divide(input(raw, numerator)?, input(raw, denominator)?, denominator)
}

fn number(value: f64) -> Result<MetricValue, Unavailable> {
    finite(value).map(MetricValue::Number)
}

/// Compound annual growth over the last `window` yearly slots, in percent.
///
/// Uses the oldest and newest present points within the window; the span in
/// years is their index distance, so interior gaps are tolerated. A non-positive
/// base or a negative end point has no meaningful CAGR.
pub fn compound_growth(history: &[Option<f64>], field: Field, window: usize) -> Result<f64, Unavailable> {
    let start = history.len().saturating_sub(window.max(2));
    let points: Vec<(usize, f64)> = history[start..]
        .iter()
        .enumerate()
        .filter_map(|(i, point)| point.filter(|v| v.is_finite()).map(|v| (i, v)))
        .collect();

    if points.len() < 2 {
        return Err(Unavailable::InsufficientHistory {
            field,
            points: points.len(),
        });
    }

    let (first_idx, first) = points[0];
    let (last_idx, last) = points[points.len() - 1];
    if first <= 0.0 || last < 0.0 {
        return Err(Unavailable::InvalidDenominator { field });
    }

    let years = (last_idx - first_idx) as f64;
    finite(((last / first).powf(1.0 / years) - 1.0) * 100.0)
}

fn net_profit_margin(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::NetIncome, Field::Revenue)? * 100.0)
}

fn return_on_equity(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::NetIncome, Field::TotalEquity)? * 100.0)
}

fn price_to_earnings(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::Price, Field::Eps)?)
}

fn price_to_book(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    let book_per_share = ratio(raw, Field::TotalEquity, Field::SharesOutstanding)?;
    number(divide(input(raw, Field::Price)?, book_per_share, Field::TotalEquity)?)
}

fn price_to_sales(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    let sales_per_share = ratio(raw, Field::Revenue, Field::SharesOutstanding)?;
    number(divide(input(raw, Field::Price)?, sales_per_share, Field::Revenue)?)
}

fn dividend_yield(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(input(raw, Field::DividendYield)? * 100.0)
}

fn current_ratio(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::CurrentAssets, Field::CurrentLiabilities)?)
}

fn quick_ratio(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    let liquid = input(raw, Field::CurrentAssets)? - input(raw, Field::Inventory)?;
    number(divide(liquid, input(raw, Field::CurrentLiabilities)?, Field::CurrentLiabilities)?)
}

fn cash_flow_per_share(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::OperatingCashFlow, Field::SharesOutstanding)?)
}

fn sales_per_share(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::Revenue, Field::SharesOutstanding)?)
}

fn sales_growth(raw: &RawFundamentals, config: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(compound_growth(
        raw.history(Field::RevenueHistory),
        Field::RevenueHistory,
        config.growth_window,
    )?)
}

fn eps_growth(raw: &RawFundamentals, config: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(compound_growth(
        raw.history(Field::EpsHistory),
        Field::EpsHistory,
        config.growth_window,
    )?)
}

fn operating_margin(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::OperatingIncome, Field::Revenue)? * 100.0)
}

fn debt_to_equity(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::TotalDebt, Field::TotalEquity)?)
}

fn free_cash_flow(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    // Providers disagree on the sign of capex
    let capex = input(raw, Field::CapitalExpenditures)?.abs();
    number(input(raw, Field::OperatingCashFlow)? - capex)
}

fn ebitda_margin(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::Ebitda, Field::Revenue)? * 100.0)
}

fn return_on_assets(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::NetIncome, Field::TotalAssets)? * 100.0)
}

fn ev_to_ebitda(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(ratio(raw, Field::EnterpriseValue, Field::Ebitda)?)
}

fn peg_ratio(raw: &RawFundamentals, config: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    let pe = ratio(raw, Field::Price, Field::Eps)?;
    let growth = compound_growth(
        raw.history(Field::EpsHistory),
        Field::EpsHistory,
        config.growth_window,
    )?;
    number(divide(pe, growth, Field::EpsHistory)?)
}

fn insider_ownership(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    number(input(raw, Field::InsiderOwnership)? * 100.0)
}

fn buybacks(raw: &RawFundamentals, _: &ScoringConfig) -> Result<MetricValue, Unavailable> {
    raw.buybacks
        .map(MetricValue::Flag)
        .ok_or(Unavailable::MissingInput {
            field: Field::Buybacks,
        })
}
