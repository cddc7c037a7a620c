//! Heuristic text-to-number conversion for prices and quantities.
//!
//! Prices are read without any locale information. After everything except
//! digits, separators and signs is stripped, the remaining text is tried
//! against a European grouping (`1.234,56`), then a US/plain grouping
//! (`1,234.56`, `1234.5`), and finally a lossy fallback that turns every comma
//! into a period. A lone separator followed by one to three digits (`"1,5"`)
//! is therefore read as a European decimal; this is a known limitation of
//! locale-free parsing and is not resolved by guessing.

use std::sync::LazyLock;

use fancy_regex::Regex;

static EUROPEAN_GROUPING: LazyLock<Regex> =
    LazyLock::new(|| compile_pattern(r"^\d{1,3}(\.\d{3})*,\d+$"));
static US_GROUPING: LazyLock<Regex> =
    LazyLock::new(|| compile_pattern(r"^\d{1,3}(,\d{3})*\.?\d*$"));
static PLAIN_DECIMAL: LazyLock<Regex> = LazyLock::new(|| compile_pattern(r"^\d+\.?\d*$"));
static FLOAT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| compile_pattern(r"^[+-]?(\d+(\.\d*)?|\.\d+)"));

fn compile_pattern(pattern: &str) -> Regex {
    Regex::new(pattern).expect("numeric patterns are static and valid")
}

fn is_full_match(pattern: &Regex, text: &str) -> bool {
    pattern.is_match(text).unwrap_or(false)
}

/// Parses a price out of free-form text such as `"Total: €1.234,56"`.
///
/// Returns `None` when the text holds no readable number.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned = strip_to_numeric(text);
    if cleaned.is_empty() {
        return None;
    }

    if is_full_match(&EUROPEAN_GROUPING, &cleaned) {
        let normalized = cleaned.replace('.', "").replacen(',', ".", 1);
        return parse_float_prefix(&normalized);
    }

    if is_full_match(&US_GROUPING, &cleaned) || is_full_match(&PLAIN_DECIMAL, &cleaned) {
        return parse_float_prefix(&cleaned.replace(',', ""));
    }

    parse_float_prefix(&cleaned.replace(',', "."))
}

/// Reads a positive quantity.
///
/// Empty text counts as `"1"`. Leading whitespace and an optional sign are
/// accepted, then the longest run of decimal digits; anything after it is
/// ignored. Zero and negative values are rejected; digit runs beyond
/// `i64::MAX` saturate there.
pub fn parse_quantity(text: &str) -> Option<u64> {
    let source = if text.is_empty() { "1" } else { text };
    let value = parse_int_prefix(source)?;
    if value <= 0 {
        return None;
    }
    u64::try_from(value).ok()
}

fn strip_to_numeric(text: &str) -> String {
    text.chars()
        .filter(|ch| ch.is_ascii_digit() || matches!(ch, ',' | '.' | '-' | '+'))
        .collect()
}

fn parse_float_prefix(text: &str) -> Option<f64> {
    let matched = FLOAT_PREFIX.find(text).ok().flatten()?;
    matched.as_str().parse::<f64>().ok()
}

fn parse_int_prefix(text: &str) -> Option<i64> {
    let trimmed = text.trim_start_matches(|ch: char| ch.is_whitespace() || ch == '\u{FEFF}');
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let run = digits.bytes().take_while(u8::is_ascii_digit).count();
    if run == 0 {
        return None;
    }

    let magnitude = digits[..run].bytes().fold(0i64, |acc, digit| {
        acc.saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}
