use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    DeductionSection, IncomeRecord, NewIncomeRecord, SectionCode, SectionLimits, TaxBracket,
    TaxRegime,
};
use crate::wallet::WalletKey;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage for reference data, income records and wallets.
///
/// The planner core never calls this; the host loads inputs through it and
/// saves results after each core operation returns.
#[async_trait]
pub trait PlannerRepository: Send + Sync {
    // Reference data
    async fn list_financial_years(&self) -> Result<Vec<String>, RepositoryError>;

    async fn get_tax_brackets(
        &self,
        financial_year: &str,
        regime: TaxRegime,
    ) -> Result<Vec<TaxBracket>, RepositoryError>;

    /// Swaps the stored schedule for one year and regime with `brackets`.
    /// All or nothing: if any row fails, the previous schedule stays.
    async fn replace_tax_brackets(
        &self,
        financial_year: &str,
        regime: TaxRegime,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError>;

    async fn get_section_limits(
        &self,
        financial_year: &str,
    ) -> Result<SectionLimits, RepositoryError>;

    async fn upsert_section_limit(
        &self,
        financial_year: &str,
        section: &SectionCode,
        limit: Decimal,
    ) -> Result<(), RepositoryError>;

    // Income records
    async fn create_income(
        &self,
        record: NewIncomeRecord,
    ) -> Result<IncomeRecord, RepositoryError>;

    async fn get_income(
        &self,
        user_id: &str,
        financial_year: &str,
    ) -> Result<IncomeRecord, RepositoryError>;

    async fn update_income(
        &self,
        record: &IncomeRecord,
    ) -> Result<(), RepositoryError>;

    async fn delete_income(&self, id: i64) -> Result<(), RepositoryError>;

    async fn list_income(
        &self,
        user_id: &str,
        financial_year: Option<&str>,
    ) -> Result<Vec<IncomeRecord>, RepositoryError>;

    // Wallets
    async fn load_wallet_sections(
        &self,
        key: &WalletKey,
    ) -> Result<Vec<DeductionSection>, RepositoryError>;

    /// Replaces every stored section and slot for `key` in one transaction.
    async fn save_wallet_sections(
        &self,
        key: &WalletKey,
        sections: &[DeductionSection],
    ) -> Result<(), RepositoryError>;
}
