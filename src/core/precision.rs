use crate::core::errors::ExchangeError;
use crate::core::types::Market;
use rust_decimal::{Decimal, RoundingStrategy};

/// How a value is snapped onto a step grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    Round,
    Truncate,
}

/// Step size for a digit count: `3` becomes `0.001`.
pub fn precision_from_digits(digits: i64) -> Option<Decimal> {
    if digits >= 0 {
        let scale = u32::try_from(digits).ok()?;
        if scale > 28 {
            return None;
        }
        Some(Decimal::new(1, scale))
    } else {
        let exp = u32::try_from(-digits).ok()?;
        10i64.checked_pow(exp).map(Decimal::from)
    }
}

/// Snap `value` onto a multiple of `step`. Values too large to snap are
/// returned unchanged.
pub fn round_to_step(value: Decimal, step: Decimal, mode: RoundingMode) -> Decimal {
    if step.is_zero() {
        return value;
    }
    let Some(units) = value.checked_div(step) else {
        return value;
    };
    let snapped = match mode {
        RoundingMode::Round => units.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        RoundingMode::Truncate => units.trunc(),
    };
    snapped.checked_mul(step).map_or(value, |v| v.normalize())
}

/// Decimal rendering without trailing zeros or exponent.
pub fn format_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

fn to_precision(value: Decimal, step: Option<Decimal>, mode: RoundingMode) -> String {
    format_decimal(step.map_or(value, |step| round_to_step(value, step, mode)))
}

/// Amounts are truncated to the market's amount step.
pub fn amount_to_precision(market: &Market, amount: Decimal) -> Result<String, ExchangeError> {
    let rounded = to_precision(amount, market.precision.amount, RoundingMode::Truncate);
    if amount > Decimal::ZERO && rounded == "0" {
        return Err(ExchangeError::InvalidOrder(format!(
            "{} amount of {} must be greater than minimum amount precision of {}",
            market.symbol(),
            amount,
            market.precision.amount.map(format_decimal).unwrap_or_default()
        )));
    }
    Ok(rounded)
}

/// Prices are rounded to the nearest tick.
pub fn price_to_precision(market: &Market, price: Decimal) -> String {
    to_precision(price, market.precision.price, RoundingMode::Round)
}

/// Costs are truncated to the price tick.
pub fn cost_to_precision(market: &Market, cost: Decimal) -> String {
    to_precision(cost, market.precision.price, RoundingMode::Truncate)
}

/// Treat a literal zero as "not configured".
pub fn omit_zero(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| !v.is_zero())
}

/// Textual variant of [`omit_zero`] for fields kept as strings
/// (`"0"`, `"0.00000"`, `""`).
pub fn omit_zero_str(value: Option<String>) -> Option<String> {
    value.filter(|s| crate::core::safe::parse_decimal(s).map_or(!s.is_empty(), |d| !d.is_zero()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn digits_to_step() {
        assert_eq!(precision_from_digits(3), Some(dec!(0.001)));
        assert_eq!(precision_from_digits(0), Some(dec!(1)));
        assert_eq!(precision_from_digits(-2), Some(dec!(100)));
    }

    #[test]
    fn truncate_and_round_on_step() {
        assert_eq!(round_to_step(dec!(1.23456), dec!(0.001), RoundingMode::Truncate), dec!(1.234));
        assert_eq!(round_to_step(dec!(1.2345), dec!(0.001), RoundingMode::Round), dec!(1.235));
        assert_eq!(round_to_step(dec!(17), dec!(5), RoundingMode::Truncate), dec!(15));
        assert_eq!(round_to_step(dec!(1.5), Decimal::ZERO, RoundingMode::Round), dec!(1.5));
    }

    #[test]
    fn rounding_is_idempotent() {
        let steps = [dec!(0.00001), dec!(0.25), dec!(1), dec!(0.1)];
        let values = [dec!(0.123456789), dec!(99.999), dec!(167.28002676), dec!(3)];
        for step in steps {
            for value in values {
                let once = round_to_step(value, step, RoundingMode::Truncate);
                let reparsed = crate::core::safe::parse_decimal(&format_decimal(once)).unwrap();
                assert_eq!(reparsed, once);
                assert_eq!(round_to_step(reparsed, step, RoundingMode::Truncate), once);
            }
        }
    }

    #[test]
    fn zero_means_absent() {
        assert_eq!(omit_zero(Some(dec!(0))), None);
        assert_eq!(omit_zero(Some(dec!(0.00000))), None);
        assert_eq!(omit_zero(Some(dec!(0.01))), Some(dec!(0.01)));
        assert_eq!(omit_zero_str(Some("0.00000".into())), None);
        assert_eq!(omit_zero_str(Some("0.01".into())), Some("0.01".into()));
        assert_eq!(omit_zero_str(None), None);
    }
}
