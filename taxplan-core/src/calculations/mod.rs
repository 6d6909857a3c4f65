//! Tax computation and the investment suggestion heuristic.
//!
//! Everything in here is a pure function of its inputs and the injected
//! configuration. Nothing performs I/O.

pub mod common;
pub mod suggestion;
pub mod tax_calculator;

pub use suggestion::{
    InvestmentAdvisor, InvestmentSuggestion, SuggestionConfig, SuggestionConfigError,
};
pub use tax_calculator::{RegimeSchedule, ScheduleError, TaxCalculator, TaxRules};
