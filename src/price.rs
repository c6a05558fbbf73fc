use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

const CURRENCY_SYMBOLS: [char; 3] = ['€', '$', '£'];

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"))
}

/// Rewrites a displayed price into dot-decimal form.
///
/// A comma means the listing uses `.` for thousands and `,` for decimals
/// (`1.234,56`); without a comma the dot already is the decimal point (`330.66`).
fn canonicalize(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !CURRENCY_SYMBOLS.contains(c)).collect();
    let stripped = stripped.trim();

    if stripped.contains(',') {
        stripped.replace('.', "").replacen(',', ".", 1)
    } else {
        stripped.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

fn number_text(raw: &str) -> Option<String> {
    let canonical = canonicalize(raw);
    number_regex().find(&canonical).map(|m| m.as_str().to_string())
}

/// Exact value of a displayed price, `None` when the text carries no number.
pub fn parse_price_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&number_text(raw)?).ok()
}

/// Numeric value of a displayed price for ranking.
///
/// Unparsable text yields `f64::INFINITY` so un-priced listings sort last.
pub fn parse_price(raw: &str) -> f64 {
    number_text(raw)
        .and_then(|n| n.parse::<f64>().ok())
        .unwrap_or(f64::INFINITY)
}
