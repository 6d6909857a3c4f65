//! Advisory investment suggestion for the primary deduction section.
//!
//! The suggestion is the smaller of the headroom left in the primary section
//! and a fixed share of income:
//!
//! ```text
//! remaining_cap        = max(0, primary_limit - invested_in_primary)
//! suggested_investment = min(remaining_cap, income * suggestion_rate)
//! ```
//!
//! It never feeds back into the tax computation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::non_negative;
use crate::models::{SectionCode, ValidationError, require_non_negative};
use crate::wallet::DeductionWallet;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SuggestionConfigError {
    #[error("primary limit must be non-negative, got {0}")]
    InvalidPrimaryLimit(Decimal),

    #[error("suggestion rate must be between 0 and 1, got {0}")]
    InvalidSuggestionRate(Decimal),
}

/// Injected settings for the heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionConfig {
    pub primary_section: SectionCode,
    pub primary_limit: Decimal,
    pub suggestion_rate: Decimal,
}

impl SuggestionConfig {
    /// # Errors
    ///
    /// Returns [`SuggestionConfigError`] if `primary_limit` is negative or
    /// `suggestion_rate` is outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), SuggestionConfigError> {
        if self.primary_limit < Decimal::ZERO {
            return Err(SuggestionConfigError::InvalidPrimaryLimit(
                self.primary_limit,
            ));
        }
        if self.suggestion_rate < Decimal::ZERO || self.suggestion_rate > Decimal::ONE {
            return Err(SuggestionConfigError::InvalidSuggestionRate(
                self.suggestion_rate,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentSuggestion {
    pub primary_section: SectionCode,
    pub already_invested: Decimal,
    pub remaining_cap: Decimal,
    pub suggested_investment: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct InvestmentAdvisor<'a> {
    config: &'a SuggestionConfig,
}

impl<'a> InvestmentAdvisor<'a> {
    pub fn new(config: &'a SuggestionConfig) -> Self {
        Self { config }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeAmount`] for negative income or a
    /// negative invested amount, and [`ValidationError::AmountOutOfRange`] for
    /// either above [`MAX_AMOUNT`](crate::models::MAX_AMOUNT).
    pub fn suggest(
        &self,
        income: Decimal,
        invested_in_primary: Decimal,
    ) -> Result<InvestmentSuggestion, ValidationError> {
        require_non_negative("income", income)?;
        require_non_negative("invested amount", invested_in_primary)?;

        let remaining_cap =
            non_negative(self.config.primary_limit.saturating_sub(invested_in_primary));
        let suggested_investment =
            remaining_cap.min(income.saturating_mul(self.config.suggestion_rate));

        Ok(InvestmentSuggestion {
            primary_section: self.config.primary_section.clone(),
            already_invested: invested_in_primary,
            remaining_cap,
            suggested_investment,
        })
    }

    /// Same as [`suggest`](Self::suggest), reading the invested amount from
    /// the wallet's primary section. A wallet without that section counts as
    /// nothing invested.
    pub fn suggest_for(
        &self,
        income: Decimal,
        wallet: &DeductionWallet,
    ) -> Result<InvestmentSuggestion, ValidationError> {
        let invested = wallet
            .invested_in(&self.config.primary_section)
            .unwrap_or(Decimal::ZERO);
        self.suggest(income, invested)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::SectionLimits;

    fn config() -> SuggestionConfig {
        SuggestionConfig {
            primary_section: SectionCode::parse("80C").unwrap(),
            primary_limit: dec!(150000),
            suggestion_rate: dec!(0.125),
        }
    }

    // =========================================================================
    // SuggestionConfig::validate tests
    // =========================================================================

    #[test]
    fn default_settings_are_valid() {
        assert_eq!(config().validate(), Ok(()));
    }

    #[test]
    fn rate_outside_unit_interval_is_rejected() {
        let config = SuggestionConfig {
            suggestion_rate: dec!(1.25),
            ..config()
        };

        assert_eq!(
            config.validate(),
            Err(SuggestionConfigError::InvalidSuggestionRate(dec!(1.25)))
        );
    }

    #[test]
    fn negative_primary_limit_is_rejected() {
        let config = SuggestionConfig {
            primary_limit: dec!(-1),
            ..config()
        };

        assert_eq!(
            config.validate(),
            Err(SuggestionConfigError::InvalidPrimaryLimit(dec!(-1)))
        );
    }

    // =========================================================================
    // suggest tests
    // =========================================================================

    #[test]
    fn high_income_is_capped_by_headroom() {
        let config = config();
        let advisor = InvestmentAdvisor::new(&config);

        let suggestion = advisor.suggest(dec!(1200000), dec!(0)).unwrap();

        assert_eq!(suggestion.remaining_cap, dec!(150000));
        assert_eq!(suggestion.suggested_investment, dec!(150000));
    }

    #[test]
    fn low_income_is_capped_by_rate() {
        let config = config();
        let advisor = InvestmentAdvisor::new(&config);

        let suggestion = advisor.suggest(dec!(400000), dec!(0)).unwrap();

        assert_eq!(suggestion.suggested_investment, dec!(50000));
    }

    #[test]
    fn existing_investment_shrinks_headroom() {
        let config = config();
        let advisor = InvestmentAdvisor::new(&config);

        let suggestion = advisor.suggest(dec!(1200000), dec!(120000)).unwrap();

        assert_eq!(suggestion.remaining_cap, dec!(30000));
        assert_eq!(suggestion.suggested_investment, dec!(30000));
    }

    #[test]
    fn overspent_primary_section_suggests_nothing() {
        let config = config();
        let advisor = InvestmentAdvisor::new(&config);

        let suggestion = advisor.suggest(dec!(1200000), dec!(200000)).unwrap();

        assert_eq!(suggestion.remaining_cap, dec!(0));
        assert_eq!(suggestion.suggested_investment, dec!(0));
    }

    #[test]
    fn negative_income_is_rejected() {
        let config = config();
        let advisor = InvestmentAdvisor::new(&config);

        assert!(advisor.suggest(dec!(-1), dec!(0)).is_err());
    }

    #[test]
    fn income_above_the_amount_cap_is_rejected() {
        let config = config();
        let advisor = InvestmentAdvisor::new(&config);

        assert!(matches!(
            advisor.suggest(Decimal::MAX, dec!(0)),
            Err(ValidationError::AmountOutOfRange { field: "income", .. })
        ));
    }

    #[test]
    fn unvalidated_rate_cannot_overflow_the_suggestion() {
        let config = SuggestionConfig {
            suggestion_rate: Decimal::MAX,
            ..config()
        };
        let advisor = InvestmentAdvisor::new(&config);

        let suggestion = advisor.suggest(dec!(1000000), dec!(0)).unwrap();

        assert_eq!(suggestion.suggested_investment, dec!(150000));
    }

    #[test]
    fn suggest_for_reads_primary_section_from_wallet() {
        let config = config();
        let advisor = InvestmentAdvisor::new(&config);
        let code = SectionCode::parse("80C").unwrap();
        let mut limits = SectionLimits::new();
        limits.insert(code.clone(), dec!(150000)).unwrap();
        let mut wallet = DeductionWallet::new();
        wallet.initialize_sections([code.clone()], &limits);
        wallet.add_slot(&code, "ELSS", dec!(100000)).unwrap();

        let suggestion = advisor.suggest_for(dec!(1200000), &wallet).unwrap();

        assert_eq!(suggestion.already_invested, dec!(100000));
        assert_eq!(suggestion.suggested_investment, dec!(50000));
    }

    #[test]
    fn suggest_for_uninitialized_wallet_counts_nothing_invested() {
        let config = config();
        let advisor = InvestmentAdvisor::new(&config);

        let suggestion = advisor.suggest_for(dec!(800000), &DeductionWallet::new()).unwrap();

        assert_eq!(suggestion.suggested_investment, dec!(100000));
    }
}
