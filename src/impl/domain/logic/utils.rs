use chrono::{Months, NaiveDate};
use fractic_server_error::{CriticalError, ServerError};
use rust_decimal::{prelude::ToPrimitive as _, Decimal, RoundingStrategy};

/// Same day `months` months later, clamped to the last day of the target
/// month (Jan 31 + 1 month = Feb 28/29).
pub(crate) fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, ServerError> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        CriticalError::with_debug(
            "installment date calculation unexpectedly overflowed",
            &format!("date: {}, months: {}", date, months),
        )
    })
}

/// Splits `total` into `count` installments of whole cents. Every part is
/// rounded down and the first installment absorbs the remainder, so the parts
/// always sum to `total` and none is smaller than the others.
pub(crate) fn split_installments(total: Decimal, count: u32) -> Vec<Decimal> {
    if count == 0 {
        return Vec::new();
    }
    let n = Decimal::from(count);
    let base = (total / n).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let remainder = total - base * n;
    (0..count)
        .map(|i| if i == 0 { base + remainder } else { base })
        .collect()
}

/// Largest installment count for `total` that keeps every installment at
/// one cent or more, bounded by `max`.
pub(crate) fn installment_cap(total: Decimal, max: u32) -> u32 {
    (total * Decimal::ONE_HUNDRED)
        .trunc()
        .to_u32()
        .map_or(max, |cents| cents.min(max))
}
