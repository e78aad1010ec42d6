use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::FetchError;

/// Raw input fields the scoring engine can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Price,
    Revenue,
    NetIncome,
    OperatingIncome,
    Ebitda,
    TotalEquity,
    TotalDebt,
    TotalAssets,
    CurrentAssets,
    CurrentLiabilities,
    Inventory,
    OperatingCashFlow,
    CapitalExpenditures,
    SharesOutstanding,
    Eps,
    DividendYield,
    InsiderOwnership,
    EnterpriseValue,
    MarketCap,
    RevenueHistory,
    EpsHistory,
    Buybacks,
}

impl Field {
    pub const ALL: [Field; 22] = [
        Field::Price,
        Field::Revenue,
        Field::NetIncome,
        Field::OperatingIncome,
        Field::Ebitda,
        Field::TotalEquity,
        Field::TotalDebt,
        Field::TotalAssets,
        Field::CurrentAssets,
        Field::CurrentLiabilities,
        Field::Inventory,
        Field::OperatingCashFlow,
        Field::CapitalExpenditures,
        Field::SharesOutstanding,
        Field::Eps,
        Field::DividendYield,
        Field::InsiderOwnership,
        Field::EnterpriseValue,
        Field::MarketCap,
        Field::RevenueHistory,
        Field::EpsHistory,
        Field::Buybacks,
    ];

    /// Human-readable label, used in warnings and log lines
    pub fn label(&self) -> &'static str {
        match self {
            Field::Price => "price",
            Field::Revenue => "total revenue",
            Field::NetIncome => "net income",
            Field::OperatingIncome => "operating income",
            Field::Ebitda => "EBITDA",
            Field::TotalEquity => "shareholder equity",
            Field::TotalDebt => "total debt",
            Field::TotalAssets => "total assets",
            Field::CurrentAssets => "current assets",
            Field::CurrentLiabilities => "current liabilities",
            Field::Inventory => "inventory",
            Field::OperatingCashFlow => "operating cash flow",
            Field::CapitalExpenditures => "capital expenditures",
            Field::SharesOutstanding => "shares outstanding",
            Field::Eps => "EPS",
            Field::DividendYield => "dividend yield",
            Field::InsiderOwnership => "insider ownership",
            Field::EnterpriseValue => "enterprise value",
            Field::MarketCap => "market cap",
            Field::RevenueHistory => "revenue history",
            Field::EpsHistory => "EPS history",
            Field::Buybacks => "buybacks",
        }
    }

    pub fn is_history(&self) -> bool {
        matches!(self, Field::RevenueHistory | Field::EpsHistory)
    }
}

/// Descriptive company metadata; never scored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// Sparse bag of fundamentals for one ticker.
///
/// Every field is optional; `None` means the provider did not report it and is
/// distinct from a reported zero. Histories are yearly, oldest first, and may
/// contain gaps. Ratios such as `dividend_yield` and `insider_ownership` are
/// fractions (0.02 == 2%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFundamentals {
    pub symbol: String,
    #[serde(default)]
    pub profile: CompanyProfile,
    pub price: Option<f64>,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub operating_income: Option<f64>,
    pub ebitda: Option<f64>,
    pub total_equity: Option<f64>,
    pub total_debt: Option<f64>,
    pub total_assets: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub inventory: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub capital_expenditures: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub eps: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub insider_ownership: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub revenue_history: Vec<Option<f64>>,
    #[serde(default)]
    pub eps_history: Vec<Option<f64>>,
    pub buybacks: Option<bool>,
}

impl RawFundamentals {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Scalar value of `field`, or `None` when absent, non-finite, or not a scalar field.
    pub fn number(&self, field: Field) -> Option<f64> {
        let value = match field {
            Field::Price => self.price,
            Field::Revenue => self.revenue,
            Field::NetIncome => self.net_income,
            Field::OperatingIncome => self.operating_income,
            Field::Ebitda => self.ebitda,
            Field::TotalEquity => self.total_equity,
            Field::TotalDebt => self.total_debt,
            Field::TotalAssets => self.total_assets,
            Field::CurrentAssets => self.current_assets,
            Field::CurrentLiabilities => self.current_liabilities,
            Field::Inventory => self.inventory,
            Field::OperatingCashFlow => self.operating_cash_flow,
            Field::CapitalExpenditures => self.capital_expenditures,
            Field::SharesOutstanding => self.shares_outstanding,
            Field::Eps => self.eps,
            Field::DividendYield => self.dividend_yield,
            Field::InsiderOwnership => self.insider_ownership,
            Field::EnterpriseValue => self.enterprise_value,
            Field::MarketCap => self.market_cap,
            Field::RevenueHistory | Field::EpsHistory | Field::Buybacks => None,
        };
        value.filter(|v| v.is_finite())
    }

    /// Yearly series for a history field; empty for scalar fields
    pub fn history(&self, field: Field) -> &[Option<f64>] {
        match field {
            Field::RevenueHistory => &self.revenue_history,
            Field::EpsHistory => &self.eps_history,
            _ => &[],
        }
    }

    /// Whether `field` carries a usable value.
    ///
    /// A history counts as present when at least one finite point exists; whether
    /// there are enough points is the consuming metric's concern.
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Buybacks => self.buybacks.is_some(),
            f if f.is_history() => self
                .history(f)
                .iter()
                .any(|p| p.map_or(false, |v| v.is_finite())),
            f => self.number(f).is_some(),
        }
    }

    /// Fields not carrying a usable value, in declaration order
    pub fn missing_fields(&self) -> Vec<Field> {
        Field::ALL.iter().copied().filter(|f| !self.has(*f)).collect()
    }
}

/// Identity of every scored metric, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    NetProfitMargin,
    ReturnOnEquity,
    PriceToEarnings,
    PriceToBook,
    PriceToSales,
    DividendYield,
    CurrentRatio,
    QuickRatio,
    CashFlowPerShare,
    SalesPerShare,
    SalesGrowth,
    EpsGrowth,
    OperatingMargin,
    DebtToEquity,
    FreeCashFlow,
    EbitdaMargin,
    ReturnOnAssets,
    EvToEbitda,
    PegRatio,
    InsiderOwnership,
    Buybacks,
}

impl MetricId {
    pub const ALL: [MetricId; 21] = [
        MetricId::NetProfitMargin,
        MetricId::ReturnOnEquity,
        MetricId::PriceToEarnings,
        MetricId::PriceToBook,
        MetricId::PriceToSales,
        MetricId::DividendYield,
        MetricId::CurrentRatio,
        MetricId::QuickRatio,
        MetricId::CashFlowPerShare,
        MetricId::SalesPerShare,
        MetricId::SalesGrowth,
        MetricId::EpsGrowth,
        MetricId::OperatingMargin,
        MetricId::DebtToEquity,
        MetricId::FreeCashFlow,
        MetricId::EbitdaMargin,
        MetricId::ReturnOnAssets,
        MetricId::EvToEbitda,
        MetricId::PegRatio,
        MetricId::InsiderOwnership,
        MetricId::Buybacks,
    ];

    /// Stable snake_case key, used in configuration files
    pub fn key(&self) -> &'static str {
        match self {
            MetricId::NetProfitMargin => "net_profit_margin",
            MetricId::ReturnOnEquity => "return_on_equity",
            MetricId::PriceToEarnings => "price_to_earnings",
            MetricId::PriceToBook => "price_to_book",
            MetricId::PriceToSales => "price_to_sales",
            MetricId::DividendYield => "dividend_yield",
            MetricId::CurrentRatio => "current_ratio",
            MetricId::QuickRatio => "quick_ratio",
            MetricId::CashFlowPerShare => "cash_flow_per_share",
            MetricId::SalesPerShare => "sales_per_share",
            MetricId::SalesGrowth => "sales_growth",
            MetricId::EpsGrowth => "eps_growth",
            MetricId::OperatingMargin => "operating_margin",
            MetricId::DebtToEquity => "debt_to_equity",
            MetricId::FreeCashFlow => "free_cash_flow",
            MetricId::EbitdaMargin => "ebitda_margin",
            MetricId::ReturnOnAssets => "return_on_assets",
            MetricId::EvToEbitda => "ev_to_ebitda",
            MetricId::PegRatio => "peg_ratio",
            MetricId::InsiderOwnership => "insider_ownership",
            MetricId::Buybacks => "buybacks",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.key() == key)
    }
}

/// Computed metric value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
    NotApplicable,
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, MetricValue::NotApplicable)
    }
}

// Absent values serialize as an explicit "N/A" marker, never null or zero.
impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Number(v) => serializer.serialize_f64(*v),
            MetricValue::Flag(b) => serializer.serialize_bool(*b),
            MetricValue::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

/// Outcome of comparing a metric to its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    Pass,
    Fail,
    Unknown,
}

impl Verdict {
    pub fn to_label(&self) -> &'static str {
        match self {
            Verdict::Pass => "Pass",
            Verdict::Fail => "Fail",
            Verdict::Unknown => "Unknown",
        }
    }
}

/// Why a metric could not be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unavailable {
    MissingInput { field: Field },
    InvalidDenominator { field: Field },
    InsufficientHistory { field: Field, points: usize },
    NonFinite,
}

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unavailable::MissingInput { field } => write!(f, "missing {}", field.label()),
            Unavailable::InvalidDenominator { field } => {
                write!(f, "{} is zero or negative", field.label())
            }
            Unavailable::InsufficientHistory { field, points } => {
                write!(f, "{} has {} usable point(s)", field.label(), points)
            }
            Unavailable::NonFinite => write!(f, "result is not finite"),
        }
    }
}

/// One evaluated metric for one ticker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub id: MetricId,
    pub name: &'static str,
    pub value: MetricValue,
    pub display: String,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<Unavailable>,
}

/// Aggregate recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
    /// No metric could be evaluated
    Unknown,
}

impl Recommendation {
    pub fn to_label(&self) -> &'static str {
        match self {
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
            Recommendation::Unknown => "Unknown",
        }
    }
}

/// Ordered metric results plus aggregate counts for one ticker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub symbol: String,
    pub results: Vec<MetricResult>,
    pub pass_count: usize,
    pub fail_count: usize,
    pub unknown_count: usize,
    pub recommendation: Recommendation,
}

impl ScoreCard {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// pass / (pass + fail); `None` when nothing was evaluated
    pub fn pass_ratio(&self) -> Option<f64> {
        let evaluated = self.pass_count + self.fail_count;
        if evaluated == 0 {
            None
        } else {
            Some(self.pass_count as f64 / evaluated as f64)
        }
    }

    pub fn result(&self, id: MetricId) -> Option<&MetricResult> {
        self.results.iter().find(|r| r.id == id)
    }
}

/// Per-ticker outcome handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickerReport {
    Scored {
        symbol: String,
        profile: CompanyProfile,
        warnings: Vec<String>,
        scorecard: ScoreCard,
    },
    Failed {
        symbol: String,
        error: FetchError,
    },
}

impl TickerReport {
    pub fn symbol(&self) -> &str {
        match self {
            TickerReport::Scored { symbol, .. } | TickerReport::Failed { symbol, .. } => symbol,
        }
    }

    pub fn scorecard(&self) -> Option<&ScoreCard> {
        match self {
            TickerReport::Scored { scorecard, .. } => Some(scorecard),
            TickerReport::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            TickerReport::Failed { error, .. } => Some(error),
            TickerReport::Scored { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TickerReport::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_filters_non_finite() {
        let mut raw = RawFundamentals::new("TEST");
        raw.revenue = Some(f64::NAN);
        raw.net_income = Some(f64::INFINITY);
        raw.price = Some(0.0);

        assert_eq!(raw.number(Field::Revenue), None);
        assert_eq!(raw.number(Field::NetIncome), None);
        // Zero is a reported value, not an absence
        assert_eq!(raw.number(Field::Price), Some(0.0));
        assert!(raw.has(Field::Price));
    }

    #[test]
    fn test_history_presence() {
        let mut raw = RawFundamentals::new("TEST");
        assert!(!raw.has(Field::EpsHistory));

        raw.eps_history = vec![None, Some(f64::NAN)];
        assert!(!raw.has(Field::EpsHistory));

        raw.eps_history = vec![None, Some(1.2)];
        assert!(raw.has(Field::EpsHistory));
        assert_eq!(raw.number(Field::EpsHistory), None);
    }

    #[test]
    fn test_missing_fields_lists_everything_for_empty_bag() {
        let raw = RawFundamentals::new("EMPTY");
        assert_eq!(raw.missing_fields().len(), Field::ALL.len());
    }

    #[test]
    fn test_metric_keys_round_trip() {
        for id in MetricId::ALL {
            assert_eq!(MetricId::from_key(id.key()), Some(id));
        }
        assert_eq!(MetricId::from_key("not_a_metric"), None);
    }

    #[test]
    fn test_not_applicable_serializes_as_marker() {
        let json = serde_json::to_string(&MetricValue::NotApplicable).unwrap();
        assert_eq!(json, "\"N/A\"");
        let json = serde_json::to_string(&MetricValue::Number(1.5)).unwrap();
        assert_eq!(json, "1.5");
    }

    #[test]
    fn test_pass_ratio_excludes_unknowns() {
        let card = ScoreCard {
            symbol: "TEST".to_string(),
            results: Vec::new(),
            pass_count: 3,
            fail_count: 1,
            unknown_count: 10,
            recommendation: Recommendation::Buy,
        };
        assert_eq!(card.pass_ratio(), Some(0.75));

        let empty = ScoreCard {
            pass_count: 0,
            fail_count: 0,
            ..card
        };
        assert_eq!(empty.pass_ratio(), None);
    }
}
