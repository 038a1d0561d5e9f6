use serde_json::Value;

/// Reads a monetary or hour amount out of a loosely typed stored value.
///
/// Stored documents carry amounts either as JSON numbers or as strings typed
/// by hand (`"500 000"`, `"12,5"`). Anything missing or unreadable resolves to
/// `default` instead of failing the caller.
pub fn amount(value: &Value, default: f64) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(default),
        Value::String(s) => amount_str(s, default),
        _ => default,
    }
}

/// String flavour of [`amount`].
pub fn amount_str(raw: &str, default: f64) -> f64 {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = cleaned.replacen(',', ".", 1);
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => default,
    }
}

/// Rounds to the nearest currency unit, halves going up (`2.5 -> 3`, `-2.5 -> -2`).
pub fn round_currency(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Rounds to one decimal place, as leave balances are kept.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
