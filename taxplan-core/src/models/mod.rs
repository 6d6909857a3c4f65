mod deduction;
mod income;
mod regime;
mod tax_bracket;
mod tax_result;
mod validation;
mod wallet_summary;

pub use deduction::{
    DeductionSection, DeductionSlot, SectionCode, SectionLimits, SectionSnapshot, SlotId,
};
pub use income::{IncomeProfile, IncomeRecord, IncomeSources, NewIncomeRecord};
pub use regime::TaxRegime;
pub use tax_bracket::TaxBracket;
pub use tax_result::TaxResult;
pub(crate) use validation::{checked_sum, require_text};
pub use validation::{
    MAX_AMOUNT, NotFoundError, ValidationError, decimal_from_f64, require_non_negative,
    require_positive,
};
pub use wallet_summary::{SectionProgress, WalletSummary};
