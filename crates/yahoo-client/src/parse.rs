//! quoteSummary response parsing.

use analysis_core::{CompanyProfile, FetchError, RawFundamentals};
use serde::Deserialize;
use serde_json::Value;

/// Modules requested from quoteSummary
pub const MODULES: [&str; 9] = [
    "price",
    "summaryDetail",
    "financialData",
    "defaultKeyStatistics",
    "assetProfile",
    "quoteType",
    "incomeStatementHistory",
    "balanceSheetHistory",
    "cashflowStatementHistory",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    quote_summary: Option<QuoteSummary>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

/// Parse a quoteSummary body into fundamentals for `symbol`
pub fn parse_quote_summary(symbol: &str, body: &str) -> Result<RawFundamentals, FetchError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| FetchError::schema(format!("invalid JSON: {}", e)))?;
    let summary = envelope
        .quote_summary
        .ok_or_else(|| FetchError::schema("missing quoteSummary"))?;

    if let Some(err) = summary.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Err(FetchError::not_found(symbol, err.description));
        }
        return Err(FetchError::unknown(format!("{}: {}", err.code, err.description)));
    }

    let result = summary
        .result
        .and_then(|items| items.into_iter().next())
        .ok_or_else(|| FetchError::not_found(symbol, "empty quoteSummary result"))?;

    if !MODULES.iter().any(|m| result.get(*m).map_or(false, Value::is_object)) {
        return Err(FetchError::schema("none of the requested modules present"));
    }

    Ok(Sections::new(&result).into_fundamentals(symbol))
}

/// Yahoo numbers come as `{"raw": 1.5, "fmt": "1.50"}` or bare; anything else is absent
fn number(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::Object(obj) => obj.get("raw").and_then(Value::as_f64),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

struct Sections<'a> {
    price: Option<&'a Value>,
    summary: Option<&'a Value>,
    financial: Option<&'a Value>,
    key_stats: Option<&'a Value>,
    profile: Option<&'a Value>,
    quote_type: Option<&'a Value>,
    /// Annual statements, newest first as reported
    income: &'a [Value],
    balance: &'a [Value],
    cash_flow: &'a [Value],
}

fn statements<'a>(result: &'a Value, module: &str, list: &str) -> &'a [Value] {
    result
        .get(module)
        .and_then(|m| m.get(list))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

impl<'a> Sections<'a> {
    fn new(result: &'a Value) -> Self {
        Self {
            price: result.get("price"),
            summary: result.get("summaryDetail"),
            financial: result.get("financialData"),
            key_stats: result.get("defaultKeyStatistics"),
            profile: result.get("assetProfile"),
            quote_type: result.get("quoteType"),
            income: statements(result, "incomeStatementHistory", "incomeStatementHistory"),
            balance: statements(result, "balanceSheetHistory", "balanceSheetStatements"),
            cash_flow: statements(result, "cashflowStatementHistory", "cashflowStatements"),
        }
    }

    fn get(section: Option<&'a Value>, key: &str) -> Option<f64> {
        number(section.and_then(|s| s.get(key)))
    }

    fn latest(list: &'a [Value], key: &str) -> Option<f64> {
        number(list.first().and_then(|s| s.get(key)))
    }

    /// Yearly series, oldest first
    fn history(list: &'a [Value], key: &str) -> Vec<Option<f64>> {
        list.iter().rev().map(|s| number(s.get(key))).collect()
    }

    fn company_name(&self, symbol: &str) -> String {
        text(self.quote_type.and_then(|q| q.get("longName")))
            .or_else(|| text(self.price.and_then(|p| p.get("longName"))))
            .or_else(|| text(self.price.and_then(|p| p.get("shortName"))))
            .unwrap_or_else(|| symbol.to_string())
    }

    fn into_fundamentals(self, symbol: &str) -> RawFundamentals {
        let shares = Self::get(self.key_stats, "sharesOutstanding");
        let revenue = Self::get(self.financial, "totalRevenue")
            .or_else(|| Self::latest(self.income, "totalRevenue"));

        let eps_history = self
            .income
            .iter()
            .rev()
            .map(|s| {
                number(s.get("dilutedEPS")).or_else(|| {
                    let net_income = number(s.get("netIncome"))?;
                    shares.filter(|n| *n > 0.0).map(|n| net_income / n)
                })
            })
            .collect();

        let buybacks = Self::latest(self.cash_flow, "repurchaseOfStock").map(|v| v < 0.0);

        RawFundamentals {
            symbol: symbol.to_string(),
            profile: CompanyProfile {
                name: Some(self.company_name(symbol)),
                sector: text(self.profile.and_then(|p| p.get("sector"))),
                industry: text(self.profile.and_then(|p| p.get("industry"))),
            },
            price: Self::get(self.price, "regularMarketPrice")
                .or_else(|| Self::get(self.financial, "currentPrice")),
            revenue,
            net_income: Self::get(self.key_stats, "netIncomeToCommon")
                .or_else(|| Self::latest(self.income, "netIncome")),
            operating_income: Self::latest(self.income, "operatingIncome"),
            ebitda: Self::get(self.financial, "ebitda"),
            total_equity: Self::latest(self.balance, "totalStockholderEquity"),
            total_debt: Self::get(self.financial, "totalDebt"),
            total_assets: Self::latest(self.balance, "totalAssets"),
            current_assets: Self::latest(self.balance, "totalCurrentAssets"),
            current_liabilities: Self::latest(self.balance, "totalCurrentLiabilities"),
            inventory: Self::latest(self.balance, "inventory"),
            operating_cash_flow: Self::get(self.financial, "operatingCashflow")
                .or_else(|| Self::latest(self.cash_flow, "totalCashFromOperatingActivities")),
            capital_expenditures: Self::latest(self.cash_flow, "capitalExpenditures"),
            shares_outstanding: shares,
            eps: Self::get(self.key_stats, "trailingEps"),
            dividend_yield: Self::get(self.summary, "dividendYield"),
            insider_ownership: Self::get(self.key_stats, "heldPercentInsiders"),
            enterprise_value: Self::get(self.key_stats, "enterpriseValue"),
            market_cap: Self::get(self.price, "marketCap")
                .or_else(|| Self::get(self.summary, "marketCap")),
            revenue_history: Self::history(self.income, "totalRevenue"),
            eps_history,
            buybacks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::FetchErrorKind;
    use serde_json::json;

    fn body(result: Value) -> String {
        json!({ "quoteSummary": { "result": [result], "error": null } }).to_string()
    }

    #[test]
    fn test_parses_raw_objects_and_bare_numbers() {
        let raw = parse_quote_summary(
            "ACME",
            &body(json!({
                "price": { "regularMarketPrice": { "raw": 42.5, "fmt": "42.50" }, "marketCap": 1.0e9 },
                "summaryDetail": { "dividendYield": { "raw": 0.021, "fmt": "2.10%" } },
                "defaultKeyStatistics": { "sharesOutstanding": { "raw": 1000.0 }, "trailingEps": {} }
            })),
        )
        .unwrap();

        assert_eq!(raw.price, Some(42.5));
        assert_eq!(raw.market_cap, Some(1.0e9));
        assert_eq!(raw.dividend_yield, Some(0.021));
        assert_eq!(raw.shares_outstanding, Some(1000.0));
        // `{}` carries no raw value
        assert_eq!(raw.eps, None);
        assert_eq!(raw.revenue, None);
    }

    #[test]
    fn test_histories_are_oldest_first() {
        let raw = parse_quote_summary(
            "ACME",
            &body(json!({
                "defaultKeyStatistics": { "sharesOutstanding": { "raw": 10.0 } },
                "incomeStatementHistory": { "incomeStatementHistory": [
                    { "totalRevenue": { "raw": 300.0 }, "netIncome": { "raw": 30.0 }, "operatingIncome": { "raw": 45.0 } },
                    { "totalRevenue": { "raw": 200.0 }, "dilutedEPS": { "raw": 2.5 } },
                    { "totalRevenue": {} , "netIncome": { "raw": 10.0 } }
                ]}
            })),
        )
        .unwrap();

        assert_eq!(raw.revenue_history, vec![None, Some(200.0), Some(300.0)]);
        // dilutedEPS when reported, else net income / shares
        assert_eq!(raw.eps_history, vec![Some(1.0), Some(2.5), Some(3.0)]);
        assert_eq!(raw.operating_income, Some(45.0));
        assert_eq!(raw.revenue, Some(300.0));
    }

    #[test]
    fn test_buybacks_from_latest_cash_flow() {
        let parse = |repurchase: Value| {
            parse_quote_summary(
                "ACME",
                &body(json!({
                    "cashflowStatementHistory": { "cashflowStatements": [
                        { "repurchaseOfStock": repurchase, "capitalExpenditures": { "raw": -50.0 } },
                        { "repurchaseOfStock": { "raw": -1.0 } }
                    ]}
                })),
            )
            .unwrap()
        };

        assert_eq!(parse(json!({ "raw": -500.0 })).buybacks, Some(true));
        assert_eq!(parse(json!({ "raw": 0.0 })).buybacks, Some(false));
        assert_eq!(parse(json!(null)).buybacks, None);
        assert_eq!(parse(json!(null)).capital_expenditures, Some(-50.0));
    }

    #[test]
    fn test_company_name_fallback_order() {
        let name = |result: Value| {
            parse_quote_summary("ACME", &body(result))
                .unwrap()
                .profile
                .name
        };

        assert_eq!(
            name(json!({
                "quoteType": { "longName": "Acme Holdings Inc." },
                "price": { "longName": "Acme Price Long", "shortName": "Acme" }
            })),
            Some("Acme Holdings Inc.".to_string())
        );
        assert_eq!(
            name(json!({ "price": { "shortName": "Acme" } })),
            Some("Acme".to_string())
        );
        assert_eq!(
            name(json!({ "assetProfile": { "sector": "Industrials" } })),
            Some("ACME".to_string())
        );
    }

    #[test]
    fn test_embedded_not_found_error() {
        let body = json!({
            "quoteSummary": {
                "result": null,
                "error": { "code": "Not Found", "description": "Quote not found for ticker symbol: ZZZZ" }
            }
        })
        .to_string();
        let err = parse_quote_summary("ZZZZ", &body).unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::NotFound);
    }

    #[test]
    fn test_schema_drift() {
        let err = parse_quote_summary("ACME", "<html>oops</html>").unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::SchemaChanged);

        let err = parse_quote_summary("ACME", r#"{"finance": {}}"#).unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::SchemaChanged);

        let err = parse_quote_summary("ACME", &body(json!({ "somethingElse": {} }))).unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::SchemaChanged);
    }
}
