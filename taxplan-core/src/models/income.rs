use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::regime::TaxRegime;
use super::validation::{ValidationError, checked_sum, require_non_negative, require_text};

/// What the host hands the calculator on every income or regime change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeProfile {
    pub gross_annual_income: Decimal,
    pub regime: TaxRegime,
    pub financial_year: String,
}

impl IncomeProfile {
    pub fn new(
        gross_annual_income: Decimal,
        regime: TaxRegime,
        financial_year: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let profile = Self {
            gross_annual_income,
            regime,
            financial_year: financial_year.into(),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("gross annual income", self.gross_annual_income)?;
        require_text(&self.financial_year, ValidationError::EmptyFinancialYear)?;
        Ok(())
    }

    /// Same income under a different regime.
    pub fn with_regime(
        &self,
        regime: TaxRegime,
    ) -> Self {
        Self {
            regime,
            ..self.clone()
        }
    }
}

/// Income heads that add up to the gross annual income.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeSources {
    pub salary: Decimal,
    pub business_income: Decimal,
    pub capital_gains: Decimal,
    pub other_income: Decimal,
}

impl IncomeSources {
    pub fn salary_only(salary: Decimal) -> Self {
        Self {
            salary,
            ..Default::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::AmountOutOfRange`] if the heads add up to
    /// more than `Decimal` can hold.
    pub fn total(&self) -> Result<Decimal, ValidationError> {
        checked_sum(
            "total income",
            [
                self.salary,
                self.business_income,
                self.capital_gains,
                self.other_income,
            ],
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("salary", self.salary)?;
        require_non_negative("business income", self.business_income)?;
        require_non_negative("capital gains", self.capital_gains)?;
        require_non_negative("other income", self.other_income)?;
        Ok(())
    }
}

/// Persisted income for one user and financial year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRecord {
    pub id: i64,
    pub user_id: String,
    pub financial_year: String,
    #[serde(flatten)]
    pub sources: IncomeSources,
    pub total_income: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IncomeRecord {
    pub fn to_profile(
        &self,
        regime: TaxRegime,
    ) -> IncomeProfile {
        IncomeProfile {
            gross_annual_income: self.total_income,
            regime,
            financial_year: self.financial_year.clone(),
        }
    }
}

/// For creating new income records (no id, total or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncomeRecord {
    pub user_id: String,
    pub financial_year: String,
    #[serde(flatten)]
    pub sources: IncomeSources,
}

impl NewIncomeRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.user_id, ValidationError::EmptyUserId)?;
        require_text(&self.financial_year, ValidationError::EmptyFinancialYear)?;
        self.sources.validate()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn profile_rejects_negative_income() {
        let result = IncomeProfile::new(dec!(-1), TaxRegime::New, "2024-25");

        assert!(matches!(result, Err(ValidationError::NegativeAmount { .. })));
    }

    #[test]
    fn profile_rejects_blank_financial_year() {
        let result = IncomeProfile::new(dec!(500000), TaxRegime::Old, " ");

        assert_eq!(result, Err(ValidationError::EmptyFinancialYear));
    }

    #[test]
    fn with_regime_keeps_income() {
        let profile = IncomeProfile::new(dec!(900000), TaxRegime::New, "2024-25").unwrap();

        let switched = profile.with_regime(TaxRegime::Old);

        assert_eq!(switched.regime, TaxRegime::Old);
        assert_eq!(switched.gross_annual_income, dec!(900000));
    }

    #[test]
    fn sources_total_adds_every_head() {
        let sources = IncomeSources {
            salary: dec!(900000),
            business_income: dec!(200000),
            capital_gains: dec!(50000),
            other_income: dec!(10000),
        };

        assert_eq!(sources.total(), Ok(dec!(1160000)));
    }

    #[test]
    fn sources_total_overflow_is_an_error() {
        let sources = IncomeSources {
            salary: Decimal::MAX,
            other_income: Decimal::MAX,
            ..Default::default()
        };

        assert!(matches!(
            sources.total(),
            Err(ValidationError::AmountOutOfRange { field: "total income", .. })
        ));
        assert!(sources.validate().is_err());
    }

    #[test]
    fn new_record_requires_user_and_year() {
        let record = NewIncomeRecord {
            user_id: "".to_string(),
            financial_year: "2024-25".to_string(),
            sources: IncomeSources::salary_only(dec!(100)),
        };

        assert_eq!(record.validate(), Err(ValidationError::EmptyUserId));
    }

    #[test]
    fn new_record_rejects_negative_heads() {
        let record = NewIncomeRecord {
            user_id: "u1".to_string(),
            financial_year: "2024-25".to_string(),
            sources: IncomeSources {
                capital_gains: dec!(-10),
                ..Default::default()
            },
        };

        assert!(matches!(
            record.validate(),
            Err(ValidationError::NegativeAmount { field: "capital gains", .. })
        ));
    }
}
