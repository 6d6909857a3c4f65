use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::deduction::{DeductionSection, SectionCode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    pub section_code: SectionCode,
    pub limit: Decimal,
    pub invested: Decimal,
    pub remaining: Decimal,
    pub progress: Decimal,
}

/// Totals across every section of a wallet, derived on each read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub total_invested: Decimal,
    pub total_limit: Decimal,
    pub total_remaining: Decimal,
    /// Sum of the amounts that count as deductions (invested capped at each
    /// positive limit).
    pub total_eligible: Decimal,
    pub by_section: Vec<SectionProgress>,
}

impl WalletSummary {
    pub fn from_sections<'a>(sections: impl IntoIterator<Item = &'a DeductionSection>) -> Self {
        let mut summary = Self::default();
        for section in sections {
            let invested = section.invested();
            let remaining = section.remaining();

            summary.total_invested = summary.total_invested.saturating_add(invested);
            summary.total_limit = summary.total_limit.saturating_add(section.limit);
            summary.total_remaining = summary.total_remaining.saturating_add(remaining);
            summary.total_eligible = summary.total_eligible.saturating_add(section.eligible());
            summary.by_section.push(SectionProgress {
                section_code: section.section_code.clone(),
                limit: section.limit,
                invested,
                remaining,
                progress: section.progress(),
            });
        }
        summary
    }
}
