//! Small decimal helpers shared by the calculator and the wallet.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Only used for presentation. Computed amounts stay exact.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use taxplan_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps negative values to zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// `part` as a percentage of `whole`, clamped to `0..=100`.
///
/// A zero (or negative) `whole` yields 0 rather than dividing by zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use taxplan_core::calculations::common::percent_of;
///
/// assert_eq!(percent_of(dec!(75000), dec!(150000)), dec!(50));
/// assert_eq!(percent_of(dec!(200000), dec!(150000)), dec!(100));
/// assert_eq!(percent_of(dec!(5000), dec!(0)), dec!(0));
/// ```
pub fn percent_of(
    part: Decimal,
    whole: Decimal,
) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let percent = part
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(whole));
    match percent {
        Some(percent) => non_negative(percent).min(Decimal::ONE_HUNDRED),
        // Only a part far beyond `whole` overflows.
        None if part > Decimal::ZERO => Decimal::ONE_HUNDRED,
        None => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        assert_eq!(round_half_up(dec!(15000.004)), dec!(15000.00));
    }

    #[test]
    fn round_half_up_rounds_midpoint_away_from_zero() {
        assert_eq!(round_half_up(dec!(0.005)), dec!(0.01));
        assert_eq!(round_half_up(dec!(-0.005)), dec!(-0.01));
    }

    #[test]
    fn round_half_up_keeps_whole_amounts() {
        assert_eq!(round_half_up(dec!(90000)), dec!(90000.00));
    }

    // =========================================================================
    // non_negative / percent_of tests
    // =========================================================================

    #[test]
    fn non_negative_clamps_only_negatives() {
        assert_eq!(non_negative(dec!(-250000)), dec!(0));
        assert_eq!(non_negative(dec!(0)), dec!(0));
        assert_eq!(non_negative(dec!(42.5)), dec!(42.5));
    }

    #[test]
    fn percent_of_handles_partial_progress() {
        assert_eq!(percent_of(dec!(10000), dec!(25000)), dec!(40));
        assert_eq!(percent_of(dec!(1), dec!(3)).round_dp(2), dec!(33.33));
    }

    #[test]
    fn percent_of_zero_whole_is_zero() {
        assert_eq!(percent_of(dec!(0), dec!(0)), dec!(0));
        assert_eq!(percent_of(dec!(100), dec!(0)), dec!(0));
    }

    #[test]
    fn percent_of_is_capped_at_one_hundred() {
        assert_eq!(percent_of(dec!(300000), dec!(150000)), dec!(100));
    }

    #[test]
    fn percent_of_does_not_overflow_near_decimal_max() {
        assert_eq!(percent_of(Decimal::MAX, dec!(150000)), dec!(100));
        assert_eq!(percent_of(Decimal::MAX, Decimal::MAX), dec!(100));
        assert_eq!(percent_of(Decimal::MIN, dec!(150000)), dec!(0));
    }
}
