use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{ValidationError, require_non_negative, require_text};
use crate::calculations::common::{non_negative, percent_of};

/// Identifier of a statutory deduction category, e.g. `80C` or `80CCD(1B)`.
///
/// Codes are trimmed and upper-cased so `80c` and `80C` name the same section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectionCode(String);

impl SectionCode {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let code = require_text(raw, ValidationError::EmptySectionCode)?;
        Ok(Self(code.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SectionCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SectionCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SectionCode> for String {
    fn from(code: SectionCode) -> Self {
        code.0
    }
}

impl fmt::Display for SectionCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(Uuid);

impl SlotId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl FromStr for SlotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Display for SlotId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One named investment counted toward a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionSlot {
    pub id: SlotId,
    pub name: String,
    pub amount: Decimal,
    pub date_added: DateTime<Utc>,
}

/// Stored state of a deduction section. Aggregates are always derived from
/// `slots` and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionSection {
    pub section_code: SectionCode,
    pub limit: Decimal,
    pub slots: Vec<DeductionSlot>,
}

impl DeductionSection {
    pub fn new(
        section_code: SectionCode,
        limit: Decimal,
    ) -> Self {
        Self {
            section_code,
            limit,
            slots: Vec::new(),
        }
    }

    /// Sum of the slot amounts. Saturates at `Decimal::MAX` for sections
    /// built by hand past the wallet's amount checks.
    pub fn invested(&self) -> Decimal {
        self.slots
            .iter()
            .fold(Decimal::ZERO, |total, slot| total.saturating_add(slot.amount))
    }

    /// Headroom left before the limit is reached.
    pub fn remaining(&self) -> Decimal {
        non_negative(self.limit.saturating_sub(self.invested()))
    }

    /// Percentage of the limit used, capped at 100. Zero when the limit is zero.
    pub fn progress(&self) -> Decimal {
        percent_of(self.invested(), self.limit)
    }

    /// The part of `invested` that counts as a deduction. A zero limit marks
    /// an uncapped section.
    pub fn eligible(&self) -> Decimal {
        let invested = self.invested();
        if self.limit.is_zero() {
            invested
        } else {
            invested.min(self.limit)
        }
    }

    pub fn snapshot(&self) -> SectionSnapshot {
        SectionSnapshot {
            section_code: self.section_code.clone(),
            limit: self.limit,
            invested: self.invested(),
            remaining: self.remaining(),
            progress: self.progress(),
            slots: self.slots.clone(),
        }
    }
}

/// A section as handed to the host, with aggregates computed at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSnapshot {
    pub section_code: SectionCode,
    pub limit: Decimal,
    pub invested: Decimal,
    pub remaining: Decimal,
    pub progress: Decimal,
    pub slots: Vec<DeductionSlot>,
}

/// Statutory cap per section, injected by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<SectionCode, Decimal>")]
pub struct SectionLimits(BTreeMap<SectionCode, Decimal>);

impl SectionLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the limit for `code`, returning the previous limit if any.
    pub fn insert(
        &mut self,
        code: SectionCode,
        limit: Decimal,
    ) -> Result<Option<Decimal>, ValidationError> {
        require_non_negative("section limit", limit)?;
        Ok(self.0.insert(code, limit))
    }

    pub fn get(
        &self,
        code: &SectionCode,
    ) -> Option<Decimal> {
        self.0.get(code).copied()
    }

    pub fn codes(&self) -> impl Iterator<Item = &SectionCode> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SectionCode, Decimal)> {
        self.0.iter().map(|(code, limit)| (code, *limit))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<SectionCode, Decimal>> for SectionLimits {
    type Error = ValidationError;

    fn try_from(map: BTreeMap<SectionCode, Decimal>) -> Result<Self, Self::Error> {
        let mut limits = Self::new();
        for (code, limit) in map {
            limits.insert(code, limit)?;
        }
        Ok(limits)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn slot(amount: Decimal) -> DeductionSlot {
        DeductionSlot {
            id: SlotId::generate(),
            name: "PPF".to_string(),
            amount,
            date_added: Utc::now(),
        }
    }

    fn section_80c(amounts: &[Decimal]) -> DeductionSection {
        let mut section = DeductionSection::new(SectionCode::parse("80C").unwrap(), dec!(150000));
        section.slots = amounts.iter().copied().map(slot).collect();
        section
    }

    // =========================================================================
    // SectionCode tests
    // =========================================================================

    #[test]
    fn section_code_is_normalized() {
        let code = SectionCode::parse("  80ccd(1b) ").unwrap();

        assert_eq!(code.as_str(), "80CCD(1B)");
        assert_eq!(code, SectionCode::parse("80CCD(1B)").unwrap());
    }

    #[test]
    fn section_code_rejects_blank_input() {
        assert_eq!(SectionCode::parse("  "), Err(ValidationError::EmptySectionCode));
    }

    // =========================================================================
    // DeductionSection aggregate tests
    // =========================================================================

    #[test]
    fn empty_section_has_full_headroom() {
        let section = section_80c(&[]);

        assert_eq!(section.invested(), dec!(0));
        assert_eq!(section.remaining(), dec!(150000));
        assert_eq!(section.progress(), dec!(0));
    }

    #[test]
    fn aggregates_follow_slot_amounts() {
        let section = section_80c(&[dec!(50000), dec!(25000)]);

        assert_eq!(section.invested(), dec!(75000));
        assert_eq!(section.remaining(), dec!(75000));
        assert_eq!(section.progress(), dec!(50));
    }

    #[test]
    fn overspent_section_clamps_remaining_and_progress() {
        let section = section_80c(&[dec!(100000), dec!(100000)]);

        assert_eq!(section.invested(), dec!(200000));
        assert_eq!(section.remaining(), dec!(0));
        assert_eq!(section.progress(), dec!(100));
        assert_eq!(section.eligible(), dec!(150000));
    }

    #[test]
    fn hand_built_section_with_huge_slots_saturates() {
        let section = section_80c(&[Decimal::MAX, Decimal::MAX]);

        assert_eq!(section.invested(), Decimal::MAX);
        assert_eq!(section.remaining(), dec!(0));
        assert_eq!(section.progress(), dec!(100));
        assert_eq!(section.eligible(), dec!(150000));
    }

    #[test]
    fn zero_limit_section_reports_no_progress_and_is_uncapped() {
        let mut section = DeductionSection::new(SectionCode::parse("80E").unwrap(), dec!(0));
        section.slots.push(slot(dec!(40000)));

        assert_eq!(section.remaining(), dec!(0));
        assert_eq!(section.progress(), dec!(0));
        assert_eq!(section.eligible(), dec!(40000));
    }

    #[test]
    fn snapshot_serializes_with_boundary_field_names() {
        let snapshot = section_80c(&[dec!(1000)]).snapshot();

        let json = serde_json::to_value(&snapshot).unwrap();

        for key in ["sectionCode", "limit", "invested", "remaining", "progress", "slots"] {
            assert!(json.get(key).is_some(), "missing {key} in {json}");
        }
        assert!(json["slots"][0].get("dateAdded").is_some());
    }

    // =========================================================================
    // SectionLimits tests
    // =========================================================================

    #[test]
    fn section_limits_reject_negative_caps() {
        let mut limits = SectionLimits::new();

        let result = limits.insert(SectionCode::parse("80D").unwrap(), dec!(-1));

        assert!(matches!(result, Err(ValidationError::NegativeAmount { .. })));
        assert!(limits.is_empty());
    }

    #[test]
    fn section_limits_deserialize_from_a_map() {
        let limits: SectionLimits =
            serde_json::from_str(r#"{"80c": "150000", "80D": "25000"}"#).unwrap();

        assert_eq!(limits.len(), 2);
        assert_eq!(limits.get(&SectionCode::parse("80C").unwrap()), Some(dec!(150000)));
    }
}
