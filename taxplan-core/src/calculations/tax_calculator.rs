//! Progressive slab tax for the new and old regimes.
//!
//! Each regime has its own [`RegimeSchedule`]: an ordered list of slabs,
//! contiguous from zero, ending in an unbounded top slab. Tax for a taxable
//! amount is `base_tax + (taxable - min_income) * rate` of the slab that
//! contains it.
//!
//! | Step | Old regime | New regime |
//! |------|------------|------------|
//! | Taxable income | `max(0, gross - deductions)` | `gross` |
//! | Tax | slab lookup in the old schedule | slab lookup in the new schedule |
//! | Net income | `gross - tax` | `gross - tax` |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use taxplan_core::calculations::{RegimeSchedule, TaxCalculator, TaxRules};
//! use taxplan_core::{TaxBracket, TaxRegime};
//!
//! let slab = |min, max, rate, base| TaxBracket {
//!     min_income: min,
//!     max_income: max,
//!     rate,
//!     base_tax: base,
//! };
//!
//! let rules = TaxRules::new(
//!     RegimeSchedule::new(vec![
//!         slab(dec!(0), Some(dec!(300000)), dec!(0), dec!(0)),
//!         slab(dec!(300000), Some(dec!(600000)), dec!(0.05), dec!(0)),
//!         slab(dec!(600000), None, dec!(0.10), dec!(15000)),
//!     ])
//!     .unwrap(),
//!     RegimeSchedule::new(vec![
//!         slab(dec!(0), Some(dec!(250000)), dec!(0), dec!(0)),
//!         slab(dec!(250000), None, dec!(0.05), dec!(0)),
//!     ])
//!     .unwrap(),
//! );
//!
//! let calculator = TaxCalculator::new(&rules);
//!
//! let tax = |income, regime, deductions| {
//!     calculator.compute_tax(income, regime, deductions).unwrap()
//! };
//!
//! assert_eq!(tax(dec!(700000), TaxRegime::New, dec!(0)), dec!(25000));
//! // Deductions only count under the old regime.
//! assert_eq!(tax(dec!(700000), TaxRegime::New, dec!(150000)), dec!(25000));
//! assert_eq!(tax(dec!(450000), TaxRegime::Old, dec!(150000)), dec!(2500));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::non_negative;
use crate::models::{
    IncomeProfile, TaxBracket, TaxRegime, TaxResult, ValidationError, require_non_negative,
};

/// Reasons a list of slabs cannot be used as a schedule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule has no brackets")]
    Empty,

    #[error("first bracket must start at 0, starts at {0}")]
    FirstBracketNotAtZero(Decimal),

    #[error("bracket {index} starts at {actual}, expected {expected}")]
    NotContiguous {
        index: usize,
        expected: Decimal,
        actual: Decimal,
    },

    #[error("bracket {index} has upper bound {max} not above its lower bound {min}")]
    EmptyRange {
        index: usize,
        min: Decimal,
        max: Decimal,
    },

    #[error("bracket {0} has no upper bound but is not the top bracket")]
    UnboundedBracket(usize),

    #[error("top bracket must be unbounded, ends at {0}")]
    BoundedTopBracket(Decimal),

    #[error("bracket {index} rate must be between 0 and 1, got {rate}")]
    InvalidRate { index: usize, rate: Decimal },

    #[error("bracket {index} base tax is {actual}, expected {expected} accrued below it")]
    BaseTaxMismatch {
        index: usize,
        expected: Decimal,
        actual: Decimal,
    },
}

/// A validated slab schedule for one regime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaxBracket>", into = "Vec<TaxBracket>")]
pub struct RegimeSchedule {
    brackets: Vec<TaxBracket>,
}

impl RegimeSchedule {
    /// Builds a schedule from slabs ordered low to high.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] if the slabs are empty, do not start at 0,
    /// leave gaps, have an inverted range, have a rate outside `[0, 1]`, do
    /// not end in exactly one unbounded slab, or carry a `base_tax` that
    /// differs from the tax accrued by the slabs below.
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, ScheduleError> {
        let Some(first) = brackets.first() else {
            return Err(ScheduleError::Empty);
        };
        if !first.min_income.is_zero() {
            return Err(ScheduleError::FirstBracketNotAtZero(first.min_income));
        }

        let top = brackets.len() - 1;
        let mut expected_min = Decimal::ZERO;
        let mut expected_base = Decimal::ZERO;

        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.min_income != expected_min {
                return Err(ScheduleError::NotContiguous {
                    index,
                    expected: expected_min,
                    actual: bracket.min_income,
                });
            }
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(ScheduleError::InvalidRate {
                    index,
                    rate: bracket.rate,
                });
            }
            if bracket.base_tax != expected_base {
                return Err(ScheduleError::BaseTaxMismatch {
                    index,
                    expected: expected_base,
                    actual: bracket.base_tax,
                });
            }

            match bracket.max_income {
                Some(max) if max <= bracket.min_income => {
                    return Err(ScheduleError::EmptyRange {
                        index,
                        min: bracket.min_income,
                        max,
                    });
                }
                Some(max) if index == top => return Err(ScheduleError::BoundedTopBracket(max)),
                Some(max) => {
                    expected_min = max;
                    expected_base = bracket.base_tax + (max - bracket.min_income) * bracket.rate;
                }
                None if index != top => return Err(ScheduleError::UnboundedBracket(index)),
                None => {}
            }
        }

        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Tax due on `taxable`. Zero for anything at or below zero.
    pub fn tax_on(
        &self,
        taxable: Decimal,
    ) -> Decimal {
        if taxable <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        self.brackets
            .iter()
            .rev()
            .find(|b| taxable > b.min_income)
            .map(|b| b.base_tax + (taxable - b.min_income) * b.rate)
            .unwrap_or(Decimal::ZERO)
    }
}

impl TryFrom<Vec<TaxBracket>> for RegimeSchedule {
    type Error = ScheduleError;

    fn try_from(brackets: Vec<TaxBracket>) -> Result<Self, Self::Error> {
        Self::new(brackets)
    }
}

impl From<RegimeSchedule> for Vec<TaxBracket> {
    fn from(schedule: RegimeSchedule) -> Self {
        schedule.brackets
    }
}

/// The pair of schedules in force for one financial year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRules {
    #[serde(rename = "new")]
    pub new_regime: RegimeSchedule,
    #[serde(rename = "old")]
    pub old_regime: RegimeSchedule,
}

impl TaxRules {
    pub fn new(
        new_regime: RegimeSchedule,
        old_regime: RegimeSchedule,
    ) -> Self {
        Self {
            new_regime,
            old_regime,
        }
    }

    pub fn schedule(
        &self,
        regime: TaxRegime,
    ) -> &RegimeSchedule {
        match regime {
            TaxRegime::New => &self.new_regime,
            TaxRegime::Old => &self.old_regime,
        }
    }
}

/// Stateless calculator over a borrowed set of rules.
///
/// Every call recomputes from scratch; switching regime is just another call.
#[derive(Debug, Clone, Copy)]
pub struct TaxCalculator<'a> {
    rules: &'a TaxRules,
}

impl<'a> TaxCalculator<'a> {
    pub fn new(rules: &'a TaxRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'a TaxRules {
        self.rules
    }

    /// Income left to tax after deductions. The new regime ignores
    /// deductions; the old one clamps at zero.
    pub fn taxable_income(
        &self,
        gross_income: Decimal,
        regime: TaxRegime,
        deductions: Decimal,
    ) -> Decimal {
        if regime.honours_deductions() {
            non_negative(gross_income - deductions)
        } else {
            gross_income
        }
    }

    /// Tax payable for the given income, regime and total deductions.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeAmount`] if the income or deductions
    /// are negative, or [`ValidationError::AmountOutOfRange`] if either is
    /// above [`MAX_AMOUNT`](crate::models::MAX_AMOUNT).
    pub fn compute_tax(
        &self,
        gross_income: Decimal,
        regime: TaxRegime,
        deductions: Decimal,
    ) -> Result<Decimal, ValidationError> {
        require_non_negative("gross annual income", gross_income)?;
        require_non_negative("total deductions", deductions)?;

        let taxable = self.taxable_income(gross_income, regime, deductions);
        Ok(self.rules.schedule(regime).tax_on(taxable))
    }

    /// Full breakdown for a profile.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the profile is invalid or the deductions
    /// are negative.
    pub fn calculate(
        &self,
        profile: &IncomeProfile,
        deductions: Decimal,
    ) -> Result<TaxResult, ValidationError> {
        profile.validate()?;
        require_non_negative("total deductions", deductions)?;

        let gross_income = profile.gross_annual_income;
        let taxable_income = self.taxable_income(gross_income, profile.regime, deductions);
        let tax_payable = self.rules.schedule(profile.regime).tax_on(taxable_income);

        Ok(TaxResult {
            regime: profile.regime,
            gross_income,
            deductions_applied: gross_income - taxable_income,
            taxable_income,
            tax_payable,
            net_income: gross_income - tax_payable,
        })
    }
}
