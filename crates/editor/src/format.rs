//! Number display in the `no-NO` locale: `1 234 567,5`.

use rust_decimal::{Decimal, RoundingStrategy};

/// Thousands separator (U+00A0 NO-BREAK SPACE).
pub const GROUP_SEPARATOR: char = '\u{a0}';

pub const DECIMAL_SEPARATOR: char = ',';

/// Fraction digits shown at most; the rest is rounded away.
pub const MAX_FRACTION_DIGITS: u32 = 3;

/// Formats `value` for display. Zero renders as an empty string.
pub fn format_number(value: Decimal) -> String {
    if value.is_zero() {
        return String::new();
    }

    let rounded = value
        .round_dp_with_strategy(MAX_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.abs().to_string();
    let (integer, fraction) = match text.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + integer.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        // The locale uses U+2212 MINUS SIGN.
        out.push('\u{2212}');
    }
    push_grouped(&mut out, integer);
    if let Some(fraction) = fraction {
        out.push(DECIMAL_SEPARATOR);
        out.push_str(fraction);
    }
    out
}

fn push_grouped(out: &mut String, digits: &str) {
    let len = digits.len();
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(digit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn groups_thousands_with_no_break_spaces() {
        assert_eq!(format_number(dec!(5)), "5");
        assert_eq!(format_number(dec!(999)), "999");
        assert_eq!(format_number(dec!(1234)), "1\u{a0}234");
        assert_eq!(format_number(dec!(1234567)), "1\u{a0}234\u{a0}567");
    }

    #[test]
    fn uses_a_decimal_comma_and_at_most_three_fraction_digits() {
        assert_eq!(format_number(dec!(1234.50)), "1\u{a0}234,5");
        assert_eq!(format_number(dec!(0.1235)), "0,124");
        assert_eq!(format_number(dec!(12.00)), "12");
    }

    #[test]
    fn zero_is_blank() {
        assert_eq!(format_number(Decimal::ZERO), "");
        assert_eq!(format_number(dec!(0.00)), "");
    }
}
