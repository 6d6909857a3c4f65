//! One entry point that ties configuration, calculator, wallet and advisor
//! together for a financial year.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::{
    InvestmentAdvisor, InvestmentSuggestion, SuggestionConfig, SuggestionConfigError,
    TaxCalculator, TaxRules,
};
use crate::models::{
    IncomeProfile, SectionCode, SectionLimits, TaxResult, ValidationError, WalletSummary,
};
use crate::wallet::{DeductionWallet, LimitPolicy, WalletBook};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlannerConfigError {
    #[error("financial year must not be empty")]
    EmptyFinancialYear,

    #[error("invalid suggestion settings: {0}")]
    Suggestion(#[from] SuggestionConfigError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("income is for {actual} but the planner is configured for {expected}")]
    FinancialYearMismatch { expected: String, actual: String },
}

/// Everything injected for one financial year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    pub financial_year: String,
    pub rules: TaxRules,
    pub section_limits: SectionLimits,
    pub suggestion: SuggestionConfig,
    #[serde(default)]
    pub limit_policy: LimitPolicy,
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), PlannerConfigError> {
        if self.financial_year.trim().is_empty() {
            return Err(PlannerConfigError::EmptyFinancialYear);
        }
        self.suggestion.validate()?;
        Ok(())
    }
}

/// Tax, wallet totals and suggestion computed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxPlan {
    pub tax: TaxResult,
    pub wallet: WalletSummary,
    pub suggestion: InvestmentSuggestion,
}

#[derive(Debug, Clone)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Result<Self, PlannerConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn calculator(&self) -> TaxCalculator<'_> {
        TaxCalculator::new(&self.config.rules)
    }

    pub fn advisor(&self) -> InvestmentAdvisor<'_> {
        InvestmentAdvisor::new(&self.config.suggestion)
    }

    pub fn new_wallet(&self) -> DeductionWallet {
        DeductionWallet::with_policy(self.config.limit_policy)
    }

    pub fn wallet_book(&self) -> WalletBook {
        WalletBook::new(self.config.limit_policy)
    }

    /// Creates every configured section the wallet does not have yet.
    pub fn initialize_wallet(
        &self,
        wallet: &mut DeductionWallet,
    ) -> Vec<SectionCode> {
        let limits = &self.config.section_limits;
        wallet.initialize_sections(limits.codes().cloned(), limits)
    }

    /// Computes tax with the wallet's eligible deductions, plus the
    /// suggestion for the primary section.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the profile is invalid or belongs to a
    /// different financial year than the configuration.
    pub fn plan(
        &self,
        profile: &IncomeProfile,
        wallet: &DeductionWallet,
    ) -> Result<TaxPlan, PlanError> {
        if profile.financial_year.trim() != self.config.financial_year.trim() {
            return Err(PlanError::FinancialYearMismatch {
                expected: self.config.financial_year.clone(),
                actual: profile.financial_year.clone(),
            });
        }

        let summary = wallet.summary();
        let tax = self.calculator().calculate(profile, summary.total_eligible)?;
        let suggestion = self
            .advisor()
            .suggest_for(profile.gross_annual_income, wallet)?;
        debug!(
            regime = %profile.regime,
            gross_income = %profile.gross_annual_income,
            deductions = %tax.deductions_applied,
            tax_payable = %tax.tax_payable,
            "Computed tax plan"
        );

        Ok(TaxPlan {
            tax,
            wallet: summary,
            suggestion,
        })
    }
}
