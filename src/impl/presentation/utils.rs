use iso_currency::Currency;
use num_format::{Locale, ToFormattedString as _};
use rust_decimal::{prelude::ToPrimitive as _, Decimal};

/// Standard number decimal places for the given currency
/// (ex. JPY = 0, BRL = 2).
fn decimal_places(currency: Currency) -> u32 {
    currency.exponent().unwrap_or(0) as u32
}

/// Format cash amount with the currency symbol first, the currency's number
/// of decimal places and pt-BR separators (i.e. R$ 1.234,56).
pub(crate) fn format_amount(amount: Decimal, currency: Currency) -> String {
    let decimal_places = decimal_places(currency);
    let rounded = amount.round_dp(decimal_places);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let integer_part = rounded
        .abs()
        .trunc()
        .to_u64()
        .unwrap_or(0)
        .to_formatted_string(&Locale::pt);
    if decimal_places == 0 {
        return format!("{} {}{}", currency.symbol(), sign, integer_part);
    }
    let fractional_part = (rounded.abs().fract() * Decimal::from(10u64.pow(decimal_places)))
        .to_u64()
        .unwrap_or(0);
    format!(
        "{} {}{}{}{:0width$}",
        currency.symbol(),
        sign,
        integer_part,
        Locale::pt.decimal(),
        fractional_part,
        width = decimal_places as usize,
    )
}

/// Joins options as running text: "A", "A ou B", "A, B ou C".
pub(crate) fn join_options(options: &[String]) -> String {
    match options {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} ou {}", init.join(", "), last),
    }
}
