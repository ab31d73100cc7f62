use once_cell::sync::Lazy;
use regex::Regex;

/// Everything an amount may not contain: anything but digits, `.` and `-`.
static NON_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9.\-]").expect("amount filter regex should compile"));

/// Field value as stored on a row: surrounding whitespace removed, then the
/// first and last `"` dropped when the trimmed field both opens and closes
/// with one. A lone `"` or an unbalanced opening quote is kept verbatim.
///
/// Doubled quotes are not unescaped, so `"a ""b"""` becomes `a ""b""`.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a currency-like string (`"$1,234.56"`, `"-40"`, `"1234"`) into a number.
///
/// Every character that is not a digit, `.` or `-` is dropped before parsing.
/// Anything that still fails to parse, or parses to NaN, yields `0.0`.
pub fn parse_amount(raw: &str) -> f64 {
    let digits = NON_NUMERIC.replace_all(raw, "");
    match digits.parse::<f64>() {
        Ok(v) if !v.is_nan() => v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_str_strips_one_quote_pair() {
        assert_eq!(clean_str("  \"Tony Goh\" "), "Tony Goh");
        assert_eq!(clean_str("\"\"x\"\""), "\"x\"");
        assert_eq!(clean_str("\""), "\"");
        assert_eq!(clean_str("\"open"), "\"open");
        assert_eq!(clean_str("plain"), "plain");
    }

    #[test]
    fn amounts_drop_currency_punctuation() {
        assert_eq!(parse_amount("$1,234,567.89"), 1234567.89);
        assert_eq!(parse_amount("1234"), 1234.0);
        assert_eq!(parse_amount("AUD 50,000"), 50000.0);
        assert_eq!(parse_amount("-$2,500"), -2500.0);
        // the exponent marker is stripped along with the other letters
        assert_eq!(parse_amount("1e5"), 15.0);
    }

    #[test]
    fn unparseable_amounts_are_zero() {
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("1.2.3"), 0.0);
        assert_eq!(parse_amount("--"), 0.0);
        assert_eq!(parse_amount("$"), 0.0);
        // a trailing or embedded minus is not a sign
        assert_eq!(parse_amount("$1,234-"), 0.0);
        assert_eq!(parse_amount("12-31"), 0.0);
    }
}
