use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::regime::TaxRegime;

/// Output of one tax computation. Values are exact; round only for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResult {
    pub regime: TaxRegime,
    pub gross_income: Decimal,
    /// Deductions actually subtracted. Always zero under the new regime.
    pub deductions_applied: Decimal,
    pub taxable_income: Decimal,
    pub tax_payable: Decimal,
    pub net_income: Decimal,
}
