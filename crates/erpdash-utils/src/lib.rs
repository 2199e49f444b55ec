//! Formatting helpers and small utilities
//!
//! Every formatter accepts missing input and renders a fixed fallback
//! instead of failing, since upstream records are not under our control.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use erpdash_config::{CurrencyConfig, DateConfig, SymbolPosition};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Rendered when a date is missing
pub const DATE_FALLBACK: &str = "-";

/// Where the currency symbol goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPlacement {
    #[default]
    Before,
    After,
}

/// Number and currency formatting rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub symbol: String,
    pub decimal_places: usize,
    pub thousands_separator: String,
    pub decimal_separator: String,
    pub placement: SymbolPlacement,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            symbol: "$".to_string(),
            decimal_places: 2,
            thousands_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
            placement: SymbolPlacement::Before,
        }
    }
}

impl NumberFormat {
    /// Format a currency amount, falling back to zero for missing or non-finite input
    pub fn format_currency(&self, value: Option<f64>) -> String {
        let value = finite_or_zero(value);
        let (negative, digits) = self.split_sign(value, self.decimal_places);
        let sign = if negative { "-" } else { "" };
        match self.placement {
            SymbolPlacement::Before => format!("{}{}{}", sign, self.symbol, digits),
            SymbolPlacement::After => format!("{}{} {}", sign, digits, self.symbol),
        }
    }

    /// Format a plain number with separators, falling back to zero
    pub fn format_number(&self, value: Option<f64>, decimal_places: usize) -> String {
        let value = finite_or_zero(value);
        let (negative, digits) = self.split_sign(value, decimal_places);
        if negative {
            format!("-{}", digits)
        } else {
            digits
        }
    }

    fn split_sign(&self, value: f64, decimal_places: usize) -> (bool, String) {
        let rendered = format!("{:.*}", decimal_places, value.abs());
        let (int_part, frac_part) = match rendered.split_once('.') {
            Some((i, f)) => (i.to_string(), Some(f.to_string())),
            None => (rendered.clone(), None),
        };

        let grouped = group_thousands(&int_part, &self.thousands_separator);
        let digits = match frac_part {
            Some(frac) => format!("{}{}{}", grouped, self.decimal_separator, frac),
            None => grouped,
        };

        // values that round to zero carry no sign
        let is_zero = rendered.chars().all(|c| c == '0' || c == '.');
        (value < 0.0 && !is_zero, digits)
    }
}

impl From<&CurrencyConfig> for NumberFormat {
    fn from(config: &CurrencyConfig) -> Self {
        Self {
            symbol: config.symbol.clone(),
            decimal_places: config.decimal_places as usize,
            thousands_separator: config.thousands_separator.clone(),
            decimal_separator: config.decimal_separator.clone(),
            placement: match config.symbol_position {
                SymbolPosition::Before => SymbolPlacement::Before,
                SymbolPosition::After => SymbolPlacement::After,
            },
        }
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Insert a separator every three digits from the right
pub fn group_thousands(digits: &str, separator: &str) -> String {
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push_str(&separator.chars().rev().collect::<String>());
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    result.chars().rev().collect()
}

/// Format a count with thousands separators
pub fn format_count(n: usize) -> String {
    group_thousands(&n.to_string(), ",")
}

/// Format a percentage with one decimal place ("12.5%")
pub fn format_percentage(value: Option<f64>) -> String {
    format!("{:.1}%", finite_or_zero(value))
}

/// Parse a calendar date from `YYYY-MM-DD`, an RFC 3339 timestamp, or `YYYY-MM-DD HH:MM:SS`
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(dt.date());
        }
    }
    None
}

/// Render a date with a strftime pattern.
///
/// Missing input renders [`DATE_FALLBACK`]; input that does not parse as a
/// date, or a pattern that cannot render a date, shows the input as-is.
pub fn format_date(value: Option<&str>, pattern: &str) -> String {
    match value {
        None => DATE_FALLBACK.to_string(),
        Some(raw) if raw.trim().is_empty() => DATE_FALLBACK.to_string(),
        Some(raw) => match parse_date(raw) {
            Some(date) => {
                let mut out = String::new();
                match write!(out, "{}", date.format(pattern)) {
                    Ok(()) => out,
                    Err(_) => raw.to_string(),
                }
            }
            None => raw.to_string(),
        },
    }
}

/// Which configured date pattern to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// Table cells
    Short,
    /// Headings and summaries
    Medium,
}

/// Configured date patterns
#[derive(Debug, Clone, PartialEq)]
pub struct DateFormat {
    pub short: String,
    pub medium: String,
}

impl Default for DateFormat {
    fn default() -> Self {
        Self::from(&DateConfig::default())
    }
}

impl From<&DateConfig> for DateFormat {
    fn from(config: &DateConfig) -> Self {
        Self {
            short: config.short_format.clone(),
            medium: config.medium_format.clone(),
        }
    }
}

impl DateFormat {
    pub fn format_date(&self, value: Option<&str>, style: DateStyle) -> String {
        match style {
            DateStyle::Short => format_date(value, &self.short),
            DateStyle::Medium => format_date(value, &self.medium),
        }
    }
}

/// Escape text for inclusion in HTML
pub fn escape_html(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_default() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format_currency(Some(1234567.891)), "$1,234,567.89");
        assert_eq!(fmt.format_currency(Some(0.5)), "$0.50");
        assert_eq!(fmt.format_currency(Some(-42.0)), "-$42.00");
    }

    #[test]
    fn test_currency_fallbacks() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format_currency(None), "$0.00");
        assert_eq!(fmt.format_currency(Some(f64::NAN)), "$0.00");
        assert_eq!(fmt.format_currency(Some(f64::INFINITY)), "$0.00");
        assert_eq!(fmt.format_currency(Some(-0.001)), "$0.00");
    }

    #[test]
    fn test_currency_european_style() {
        let fmt = NumberFormat {
            symbol: "€".to_string(),
            decimal_places: 2,
            thousands_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
            placement: SymbolPlacement::After,
        };
        assert_eq!(fmt.format_currency(Some(9876.5)), "9.876,50 €");
    }

    #[test]
    fn test_number_formatting() {
        let fmt = NumberFormat::default();
        assert_eq!(fmt.format_number(None, 0), "0");
        assert_eq!(fmt.format_number(Some(1500.0), 0), "1,500");
        assert_eq!(fmt.format_number(Some(-1500.26), 1), "-1,500.3");
        assert_eq!(format_count(1_000_000), "1,000,000");
        assert_eq!(format_count(7), "7");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(format_percentage(Some(12.345)), "12.3%");
        assert_eq!(format_percentage(None), "0.0%");
        assert_eq!(format_percentage(Some(f64::NAN)), "0.0%");
    }

    #[test]
    fn test_parse_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(parse_date("2024-01-01"), Some(expected));
        assert_eq!(parse_date("2024-01-01T23:10:00Z"), Some(expected));
        assert_eq!(parse_date("2024-01-01T10:00:00.123456"), Some(expected));
        assert_eq!(parse_date("2024-01-01 08:30:00"), Some(expected));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(Some("2024-03-05"), "%b %d, %Y"), "Mar 05, 2024");
        assert_eq!(format_date(Some("2024-03-05T12:00:00Z"), "%Y-%m-%d"), "2024-03-05");
        assert_eq!(format_date(None, "%Y-%m-%d"), "-");
        assert_eq!(format_date(Some("  "), "%Y-%m-%d"), "-");
        assert_eq!(format_date(Some("soon"), "%Y-%m-%d"), "soon");
    }

    #[test]
    fn test_format_date_with_unusable_pattern_shows_input() {
        assert_eq!(format_date(Some("2024-01-01"), "%Y-%m-%d %H:%M"), "2024-01-01");
        assert_eq!(format_date(Some("2024-01-01"), "%Q"), "2024-01-01");

        let formats = DateFormat {
            short: "%Y-%m-%d %H:%M".to_string(),
            medium: "%b %d, %Y".to_string(),
        };
        assert_eq!(formats.format_date(Some("2024-01-01"), DateStyle::Short), "2024-01-01");
        assert_eq!(formats.format_date(Some("2024-01-01"), DateStyle::Medium), "Jan 01, 2024");
    }

    #[test]
    fn test_formats_from_config() {
        let currency = CurrencyConfig {
            symbol: "kr".to_string(),
            decimal_places: 0,
            symbol_position: SymbolPosition::After,
            ..CurrencyConfig::default()
        };
        let fmt = NumberFormat::from(&currency);
        assert_eq!(fmt.format_currency(Some(12500.4)), "12,500 kr");

        let dates = DateFormat::default();
        assert_eq!(dates.format_date(Some("2024-03-05"), DateStyle::Short), "2024-03-05");
        assert_eq!(dates.format_date(Some("2024-03-05"), DateStyle::Medium), "Mar 05, 2024");
        assert_eq!(dates.format_date(None, DateStyle::Medium), "-");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }
}
