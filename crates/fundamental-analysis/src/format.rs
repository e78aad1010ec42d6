use analysis_core::MetricValue;

use crate::metrics::ValueFormat;

pub const NOT_AVAILABLE: &str = "N/A";

/// Render a metric value for display; unavailable values render as `N/A`
pub fn format_value(value: MetricValue, format: ValueFormat) -> String {
    match value {
        MetricValue::NotApplicable => NOT_AVAILABLE.to_string(),
        MetricValue::Flag(b) => yes_no(b).to_string(),
        MetricValue::Number(v) => match format {
            ValueFormat::Percent => format!("{:.2}%", v),
            ValueFormat::Ratio => format!("{:.2}", v),
            ValueFormat::PerShare => format!("${:.2}", v),
            ValueFormat::Currency => format_money(v),
            ValueFormat::YesNo => yes_no(v != 0.0).to_string(),
        },
    }
}

/// Large amounts in compact form: `12.35B`, `450.00M`, `-1.20B`
pub fn format_money(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else {
        format!("{:.2}", value)
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}
