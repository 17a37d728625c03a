//! Locale-encoded decimals: `.` groups thousands, `,` separates decimals.
//!
//! Parsing is lenient. Anything that is not a digit or separator is dropped and
//! unparseable input degrades to zero instead of failing.

use std::str::FromStr;

use rust_decimal::Decimal;

pub fn parse_locale_decimal(raw: &str) -> Decimal {
    // `.` is always grouping, so it goes along with currency symbols and spaces.
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();

    let normalized = match kept.rfind(',') {
        Some(idx) => {
            let int_part = kept[..idx].replace(',', "");
            let frac_part = &kept[idx + 1..];
            match (int_part.is_empty(), frac_part.is_empty()) {
                (true, true) => String::new(),
                (_, true) => int_part,
                (true, false) => format!("0.{frac_part}"),
                (false, false) => format!("{int_part}.{frac_part}"),
            }
        }
        None => kept,
    };

    if normalized.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

pub fn format_locale_decimal(value: Decimal, decimal_places: u32) -> String {
    let rounded = value.round_dp(decimal_places);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.*}", decimal_places as usize, rounded.abs());

    let (int_digits, frac_digits) = match plain.split_once('.') {
        Some((int_digits, frac_digits)) => (int_digits, Some(frac_digits)),
        None => (plain.as_str(), None),
    };

    let mut out = String::with_capacity(plain.len() + plain.len() / 3 + 1);
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_digits));
    if let Some(frac_digits) = frac_digits {
        out.push(',');
        out.push_str(frac_digits);
    }
    out
}

pub fn format_currency(value: Decimal) -> String {
    format!("$ {}", format_locale_decimal(value, 2))
}

/// Exposure bound with at least two decimal places and no rounding, so the
/// value survives a trip through an edit input.
pub fn format_exposure(value: Decimal) -> String {
    let normalized = value.normalize();
    let places = normalized.scale().max(2);
    format_locale_decimal(normalized, places)
}

/// Percent label with at least one decimal place, e.g. `0,9 %` or `1,25 %`.
pub fn format_percent(value: Decimal) -> String {
    let normalized = value.normalize();
    let places = normalized.scale().max(1);
    format!("{} %", format_locale_decimal(normalized, places))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_grouped_currency_values() {
        assert_eq!(parse_locale_decimal("$ 494.223,00"), dec!(494223.00));
        assert_eq!(parse_locale_decimal("1.000.000,01"), dec!(1000000.01));
        assert_eq!(parse_locale_decimal("2.000.000"), dec!(2000000));
        assert_eq!(parse_locale_decimal("0,9 %"), dec!(0.9));
    }

    #[test]
    fn last_comma_is_the_decimal_separator() {
        assert_eq!(parse_locale_decimal("1,234,5"), dec!(1234.5));
        assert_eq!(parse_locale_decimal("12,"), dec!(12));
        assert_eq!(parse_locale_decimal(",5"), dec!(0.5));
    }

    #[test]
    fn unparseable_input_degrades_to_zero() {
        assert_eq!(parse_locale_decimal(""), Decimal::ZERO);
        assert_eq!(parse_locale_decimal("abc"), Decimal::ZERO);
        assert_eq!(parse_locale_decimal(","), Decimal::ZERO);
        assert_eq!(parse_locale_decimal("R$ --"), Decimal::ZERO);
    }

    #[test]
    fn formats_with_grouping_and_comma_decimals() {
        assert_eq!(format_locale_decimal(dec!(494223), 2), "494.223,00");
        assert_eq!(format_locale_decimal(dec!(1000000.01), 2), "1.000.000,01");
        assert_eq!(format_locale_decimal(dec!(999), 0), "999");
        assert_eq!(format_locale_decimal(dec!(-92677), 2), "-92.677,00");
        assert_eq!(format_locale_decimal(dec!(0.006), 2), "0,01");
    }

    #[test]
    fn currency_and_percent_labels() {
        assert_eq!(format_currency(dec!(293450)), "$ 293.450,00");
        assert_eq!(format_percent(dec!(0.9)), "0,9 %");
        assert_eq!(format_percent(dec!(1.0)), "1,0 %");
        assert_eq!(format_percent(dec!(1.25)), "1,25 %");
    }

    #[test]
    fn exposure_labels_keep_every_decimal() {
        assert_eq!(format_exposure(dec!(1000000)), "1.000.000,00");
        assert_eq!(format_exposure(dec!(1000000.01)), "1.000.000,01");
        assert_eq!(format_exposure(dec!(1000000.005)), "1.000.000,005");
        assert_eq!(
            parse_locale_decimal(&format_exposure(dec!(1234.56789))),
            dec!(1234.56789)
        );
    }

    #[test]
    fn formatted_values_parse_back() {
        let grouped = Regex::new(r"^\d{1,3}(\.\d{3})*,\d{2}$").unwrap();
        for value in [
            dec!(0),
            dec!(0.01),
            dec!(12.5),
            dec!(494223.00),
            dec!(1000000.01),
            dec!(4000000),
            dec!(123456789.99),
        ] {
            let text = format_locale_decimal(value, 2);
            assert!(grouped.is_match(&text), "unexpected format: {text}");
            assert_eq!(parse_locale_decimal(&text), value);
        }
    }
}
