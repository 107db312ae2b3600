use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How currency amounts are printed. Defaults to the fr-FR convention,
/// `1 234,56 €` with no-break spaces so an amount never splits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoneyFormat {
    pub thousands_separator: char,
    pub decimal_separator: char,
    pub currency_suffix: String,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        MoneyFormat {
            thousands_separator: '\u{a0}',
            decimal_separator: ',',
            currency_suffix: "€".to_string(),
        }
    }
}

fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

/// Format an amount in cents with exactly two decimals and the currency suffix.
pub fn format_money(cents: i64, fmt: &MoneyFormat) -> String {
    let abs = cents.unsigned_abs();
    let mut out = String::new();
    if cents < 0 {
        out.push('-');
    }
    out.push_str(&group_thousands(&(abs / 100).to_string(), fmt.thousands_separator));
    out.push(fmt.decimal_separator);
    out.push_str(&format!("{:02}", abs % 100));
    if !fmt.currency_suffix.is_empty() {
        out.push('\u{a0}');
        out.push_str(&fmt.currency_suffix);
    }
    out
}

/// Quantities print without decimals when whole, otherwise with up to two.
pub fn format_quantity(quantity: f64, fmt: &MoneyFormat) -> String {
    let rounded = (quantity * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        return group_thousands(&format!("{rounded:.0}"), fmt.thousands_separator);
    }
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0');
    match text.split_once('.') {
        Some((int, frac)) => format!(
            "{}{}{}",
            group_thousands(int, fmt.thousands_separator),
            fmt.decimal_separator,
            frac
        ),
        None => text.to_string(),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
