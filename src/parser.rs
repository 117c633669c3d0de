use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const MAN_YEN: u64 = 10_000;

fn man_yen_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]+)(?:\.([0-9]+))?\s*万円").unwrap())
}

fn yen_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9]+)\s*円").unwrap())
}

/// Converts a price text such as `98.5万円` or `1,480,000円` into whole yen.
///
/// Returns `None` when no amount followed by a yen unit can be found.
pub fn normalize_price(text: &str) -> Option<u64> {
    let cleaned = text.replace([',', '，'], "");

    if let Some(captures) = man_yen_regex().captures(&cleaned) {
        let whole: u64 = captures.get(1)?.as_str().parse().ok()?;
        // Only four fractional digits survive the multiplication, the rest truncate.
        let fraction = captures
            .get(2)
            .map(|m| {
                let digits: String = m.as_str().chars().chain("0000".chars()).take(4).collect();
                digits.parse::<u64>().unwrap_or(0)
            })
            .unwrap_or(0);
        return whole.checked_mul(MAN_YEN)?.checked_add(fraction);
    }

    let captures = yen_regex().captures(&cleaned)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Reads an `offers.price` value as a plain number, truncating any fraction.
pub fn parse_numeric_price(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().and_then(truncate_amount)),
        Value::String(text) => text.trim().parse::<f64>().ok().and_then(truncate_amount),
        _ => None,
    }
}

fn truncate_amount(amount: f64) -> Option<u64> {
    if amount.is_finite() && amount >= 0.0 && amount < u64::MAX as f64 {
        Some(amount.trunc() as u64)
    } else {
        None
    }
}

/// Formats whole yen the way the report shows it, e.g. `1,480,000 円`.
pub fn format_price_label(yen: u64) -> String {
    format!("{} 円", group_thousands(yen))
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
