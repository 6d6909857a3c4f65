use rust_decimal::Decimal;
use thiserror::Error;

use super::deduction::{SectionCode, SlotId};

/// Largest amount accepted for any single figure: 10^15.
///
/// Sums and products of capped amounts stay well inside `Decimal`'s range,
/// so the calculators never overflow on validated input.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Malformed or out-of-range input. Always surfaced to the caller; nothing is
/// clamped on the way in.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be greater than zero, got {value}")]
    NonPositiveAmount { field: &'static str, value: Decimal },

    #[error("{field} must not be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    #[error("{field} of {value} is above the largest supported amount of {}", MAX_AMOUNT)]
    AmountOutOfRange { field: &'static str, value: Decimal },

    #[error("{field} must be a finite amount, got {value}")]
    NonFiniteAmount { field: &'static str, value: String },

    #[error("slot name must not be empty")]
    EmptySlotName,

    #[error("section code must not be empty")]
    EmptySectionCode,

    #[error("financial year must not be empty")]
    EmptyFinancialYear,

    #[error("user id must not be empty")]
    EmptyUserId,

    #[error("section {section} would reach {attempted}, above its limit of {limit}")]
    ExceedsSectionLimit {
        section: SectionCode,
        limit: Decimal,
        attempted: Decimal,
    },
}

/// A section or slot the caller referred to does not exist.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("section {0} not found")]
    Section(SectionCode),

    #[error("slot {0} not found")]
    Slot(SlotId),
}

pub fn require_positive(
    field: &'static str,
    value: Decimal,
) -> Result<Decimal, ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount { field, value });
    }
    require_in_range(field, value)
}

pub fn require_non_negative(
    field: &'static str,
    value: Decimal,
) -> Result<Decimal, ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::NegativeAmount { field, value });
    }
    require_in_range(field, value)
}

fn require_in_range(
    field: &'static str,
    value: Decimal,
) -> Result<Decimal, ValidationError> {
    if value > MAX_AMOUNT {
        return Err(ValidationError::AmountOutOfRange { field, value });
    }
    Ok(value)
}

/// Adds `amounts` without panicking on overflow.
///
/// Running totals may pass [`MAX_AMOUNT`]; only a total `Decimal` cannot hold
/// is rejected.
pub(crate) fn checked_sum(
    field: &'static str,
    amounts: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, ValidationError> {
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total
            .checked_add(amount)
            .ok_or(ValidationError::AmountOutOfRange {
                field,
                value: amount,
            })
    })
}

/// Converts a host-supplied float into a [`Decimal`].
///
/// NaN, infinities and magnitudes beyond `Decimal`'s range are rejected.
pub fn decimal_from_f64(
    field: &'static str,
    value: f64,
) -> Result<Decimal, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteAmount {
            field,
            value: value.to_string(),
        });
    }
    Decimal::try_from(value)
        .map(|d| d.normalize())
        .map_err(|_| ValidationError::NonFiniteAmount {
            field,
            value: value.to_string(),
        })
}

pub(crate) fn require_text(
    value: &str,
    err: ValidationError,
) -> Result<&str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn require_positive_rejects_zero_and_negatives() {
        assert_eq!(
            require_positive("amount", dec!(0)),
            Err(ValidationError::NonPositiveAmount {
                field: "amount",
                value: dec!(0)
            })
        );
        assert!(require_positive("amount", dec!(-5)).is_err());
        assert_eq!(require_positive("amount", dec!(0.01)), Ok(dec!(0.01)));
    }

    #[test]
    fn require_non_negative_accepts_zero() {
        assert_eq!(require_non_negative("income", dec!(0)), Ok(dec!(0)));
        assert_eq!(
            require_non_negative("income", dec!(-1)),
            Err(ValidationError::NegativeAmount {
                field: "income",
                value: dec!(-1)
            })
        );
    }

    #[test]
    fn amounts_above_the_cap_are_out_of_range() {
        assert_eq!(MAX_AMOUNT, dec!(1000000000000000));
        assert_eq!(require_positive("amount", MAX_AMOUNT), Ok(MAX_AMOUNT));
        assert_eq!(
            require_positive("amount", MAX_AMOUNT + dec!(0.01)),
            Err(ValidationError::AmountOutOfRange {
                field: "amount",
                value: MAX_AMOUNT + dec!(0.01)
            })
        );
        assert_eq!(
            require_non_negative("income", Decimal::MAX),
            Err(ValidationError::AmountOutOfRange {
                field: "income",
                value: Decimal::MAX
            })
        );
    }

    #[test]
    fn checked_sum_reports_overflow_instead_of_panicking() {
        assert_eq!(
            checked_sum("total", [dec!(100), dec!(250.50)]),
            Ok(dec!(350.50))
        );
        assert_eq!(
            checked_sum("total", [Decimal::MAX, Decimal::MAX]),
            Err(ValidationError::AmountOutOfRange {
                field: "total",
                value: Decimal::MAX
            })
        );
    }

    #[test]
    fn decimal_from_f64_rejects_non_finite_values() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = decimal_from_f64("income", value);

            assert!(
                matches!(result, Err(ValidationError::NonFiniteAmount { field: "income", .. })),
                "expected NonFiniteAmount for {value}, got {result:?}"
            );
        }
    }

    #[test]
    fn decimal_from_f64_converts_whole_amounts_exactly() {
        assert_eq!(decimal_from_f64("income", 1200000.0), Ok(dec!(1200000)));
        assert_eq!(decimal_from_f64("rate", 0.125), Ok(dec!(0.125)));
    }

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text("  PPF ", ValidationError::EmptySlotName), Ok("PPF"));
        assert_eq!(
            require_text("   ", ValidationError::EmptySlotName),
            Err(ValidationError::EmptySlotName)
        );
    }
}
