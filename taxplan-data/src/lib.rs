//! CSV loaders for the reference tables the planner reads per financial year.

mod error;
pub mod limits;
pub mod loader;

pub use error::LoaderError;
pub use limits::{SectionLimitLoader, SectionLimitRecord};
pub use loader::{TaxBracketLoader, TaxBracketRecord};
