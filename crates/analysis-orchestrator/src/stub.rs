use analysis_core::{CompanyProfile, RawFundamentals};

/// Fixed synthetic fundamentals for smoke runs; only the symbol varies.
///
/// Every field is populated so all metrics evaluate, and the figures describe
/// a steady, moderately valued business that lands on Buy under default
/// thresholds.
pub fn stub_fundamentals(symbol: &str) -> RawFundamentals {
    RawFundamentals {
        symbol: symbol.to_string(),
        profile: CompanyProfile {
            name: Some(format!("{} (stub data)", symbol)),
            sector: Some("Technology".to_string()),
            industry: Some("Software".to_string()),
        },
        price: Some(100.0),
        revenue: Some(50_000_000_000.0),
        net_income: Some(7_500_000_000.0),
        operating_income: Some(10_000_000_000.0),
        ebitda: Some(12_500_000_000.0),
        total_equity: Some(30_000_000_000.0),
        total_debt: Some(15_000_000_000.0),
        total_assets: Some(80_000_000_000.0),
        current_assets: Some(25_000_000_000.0),
        current_liabilities: Some(12_500_000_000.0),
        inventory: Some(5_000_000_000.0),
        operating_cash_flow: Some(11_000_000_000.0),
        capital_expenditures: Some(-3_000_000_000.0),
        shares_outstanding: Some(1_000_000_000.0),
        eps: Some(7.5),
        dividend_yield: Some(0.025),
        insider_ownership: Some(0.06),
        enterprise_value: Some(115_000_000_000.0),
        market_cap: Some(100_000_000_000.0),
        revenue_history: vec![
            Some(40_000_000_000.0),
            Some(43_500_000_000.0),
            Some(46_500_000_000.0),
            Some(50_000_000_000.0),
        ],
        eps_history: vec![Some(5.0), Some(5.8), Some(6.6), Some(7.5)],
        buybacks: Some(true),
    }
}
