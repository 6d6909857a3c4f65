use taxplan_core::calculations::ScheduleError;
use taxplan_core::{RepositoryError, TaxRegime, ValidationError};
use thiserror::Error;

/// Errors that can occur when loading reference data.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Invalid regime '{0}' (expected 'new' or 'old')")]
    InvalidRegime(String),

    #[error("Invalid {regime} schedule for {financial_year}: {source}")]
    InvalidSchedule {
        financial_year: String,
        regime: TaxRegime,
        source: ScheduleError,
    },

    #[error("No {regime} schedule for {financial_year}")]
    MissingSchedule {
        financial_year: String,
        regime: TaxRegime,
    },

    #[error("Invalid section limit row: {0}")]
    InvalidLimit(#[from] ValidationError),

    #[error("Financial year {0} not found in database (have you run the seeds?)")]
    FinancialYearNotFound(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for LoaderError {
    fn from(err: csv::Error) -> Self {
        LoaderError::CsvParse(err.to_string())
    }
}

/// Maps a foreign-key failure to [`LoaderError::FinancialYearNotFound`].
pub(crate) fn year_not_found_or(
    err: RepositoryError,
    financial_year: &str,
) -> LoaderError {
    if let RepositoryError::Database(ref inner) = err {
        if inner.contains("FOREIGN KEY constraint failed") {
            return LoaderError::FinancialYearNotFound(financial_year.to_string());
        }
    }
    LoaderError::Repository(err)
}
