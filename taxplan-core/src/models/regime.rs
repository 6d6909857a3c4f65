use std::fmt;

use serde::{Deserialize, Serialize};

/// The two mutually exclusive rule sets a taxpayer can choose between.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaxRegime {
    /// Concessional slabs. Itemized deductions are not honoured.
    #[default]
    New,
    /// Legacy slabs. Section-80 deductions reduce taxable income.
    Old,
}

impl TaxRegime {
    pub const ALL: [TaxRegime; 2] = [TaxRegime::New, TaxRegime::Old];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Old => "old",
        }
    }

    /// Case-insensitive, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Some(Self::New),
            "old" => Some(Self::Old),
            _ => None,
        }
    }

    pub fn to_long_str(&self) -> &'static str {
        match self {
            Self::New => "New Regime",
            Self::Old => "Old Regime",
        }
    }

    pub fn honours_deductions(&self) -> bool {
        matches!(self, Self::Old)
    }
}

impl fmt::Display for TaxRegime {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_accepts_any_case() {
        assert_eq!(TaxRegime::parse("new"), Some(TaxRegime::New));
        assert_eq!(TaxRegime::parse(" OLD "), Some(TaxRegime::Old));
        assert_eq!(TaxRegime::parse("Old"), Some(TaxRegime::Old));
    }

    #[test]
    fn parse_rejects_unknown_regime() {
        assert_eq!(TaxRegime::parse("legacy"), None);
        assert_eq!(TaxRegime::parse(""), None);
    }

    #[test]
    fn serializes_as_lowercase() {
        let json = serde_json::to_string(&TaxRegime::Old).unwrap();

        assert_eq!(json, "\"old\"");
        assert_eq!(
            serde_json::from_str::<TaxRegime>("\"new\"").unwrap(),
            TaxRegime::New
        );
    }

    #[test]
    fn only_old_regime_honours_deductions() {
        assert!(TaxRegime::Old.honours_deductions());
        assert!(!TaxRegime::New.honours_deductions());
    }
}
