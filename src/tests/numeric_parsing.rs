use super::*;

#[test]
fn parse_price_reads_plain_numbers() {
    assert_eq!(parse_price("123"), Some(123.0));
    assert_eq!(parse_price("123.45"), Some(123.45));
    assert_eq!(parse_price("0"), Some(0.0));
}

#[test]
fn parse_price_ignores_currency_symbols() {
    assert_eq!(parse_price("$123.45"), Some(123.45));
    assert_eq!(parse_price("€99,99"), Some(99.99));
    assert_eq!(parse_price("£1,234.56"), Some(1234.56));
    assert_eq!(parse_price("¥1000"), Some(1000.0));
    assert_eq!(parse_price("EUR 15"), Some(15.0));
}

#[test]
fn parse_price_resolves_us_and_european_grouping() {
    assert_eq!(parse_price("1,234.56"), Some(1234.56));
    assert_eq!(parse_price("1.234,56"), Some(1234.56));
    assert_eq!(parse_price("1.234.567,89"), Some(1_234_567.89));
    assert_eq!(parse_price("12,345,678"), Some(12_345_678.0));
    assert_eq!(parse_price("€ 1.299,00"), Some(1299.0));
}

#[test]
fn parse_price_strips_whitespace_grouping() {
    assert_eq!(parse_price("1 234.56"), Some(1234.56));
}

#[test]
fn parse_price_returns_none_without_digits() {
    assert_eq!(parse_price(""), None);
    assert_eq!(parse_price("abc"), None);
    assert_eq!(parse_price("$"), None);
    assert_eq!(parse_price("-"), None);
    assert_eq!(parse_price("..,"), None);
}

#[test]
fn parse_price_honors_leading_sign() {
    assert_eq!(parse_price("-123.45"), Some(-123.45));
    assert_eq!(parse_price("+123.45"), Some(123.45));
    assert_eq!(parse_price("--5"), None);
}

#[test]
fn parse_price_fallback_keeps_leading_number() {
    // "(incl. tax)" leaves a trailing period behind, so neither grouping
    // pattern matches and the comma becomes the decimal point.
    assert_eq!(parse_price("Total: €99,99 (incl. tax)"), Some(99.99));
    assert_eq!(parse_price("99.99."), Some(99.99));
    assert_eq!(parse_price("1,2,3"), Some(1.2));
}

#[test]
fn parse_price_reads_single_separator_heuristically() {
    assert_eq!(parse_price("1,5"), Some(1.5));
    assert_eq!(parse_price("1.5"), Some(1.5));
    assert_eq!(parse_price("1.234"), Some(1.234));
    assert_eq!(parse_price("1,234"), Some(1.234));
    assert_eq!(parse_price("1,234,5"), Some(1.234));
}

#[test]
fn parse_quantity_reads_leading_integer() {
    assert_eq!(parse_quantity("5"), Some(5));
    assert_eq!(parse_quantity("  7"), Some(7));
    assert_eq!(parse_quantity("+3"), Some(3));
    assert_eq!(parse_quantity("2.5"), Some(2));
    assert_eq!(parse_quantity("5 items"), Some(5));
}

#[test]
fn parse_quantity_defaults_empty_text_to_one() {
    assert_eq!(parse_quantity(""), Some(1));
}

#[test]
fn parse_quantity_rejects_zero_negative_and_garbage() {
    assert_eq!(parse_quantity("0"), None);
    assert_eq!(parse_quantity("-1"), None);
    assert_eq!(parse_quantity("abc"), None);
    assert_eq!(parse_quantity("   "), None);
    assert_eq!(parse_quantity("x5"), None);
}

#[test]
fn parse_quantity_saturates_huge_values() {
    assert_eq!(parse_quantity("5000000000"), Some(5_000_000_000));
    assert_eq!(parse_quantity("4294967296"), Some(u64::from(u32::MAX) + 1));
    assert_eq!(parse_quantity("9223372036854775807"), Some(i64::MAX as u64));
    assert_eq!(parse_quantity("99999999999999999999999"), Some(i64::MAX as u64));
}
