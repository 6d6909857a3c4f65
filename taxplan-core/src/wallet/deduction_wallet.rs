use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    DeductionSection, DeductionSlot, NotFoundError, SectionCode, SectionLimits, SectionSnapshot,
    SlotId, ValidationError, WalletSummary, checked_sum, require_non_negative, require_positive,
    require_text,
};

/// Errors surfaced by wallet operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

/// What happens when a section's invested total would pass its limit.
///
/// A zero limit is treated as uncapped under either policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPolicy {
    /// Record the amount; `remaining` clamps to zero.
    #[default]
    Track,
    /// Reject the add or update.
    Enforce,
}

impl LimitPolicy {
    fn check(
        self,
        section: &DeductionSection,
        attempted: Decimal,
    ) -> Result<(), ValidationError> {
        if self == LimitPolicy::Enforce
            && section.limit > Decimal::ZERO
            && attempted > section.limit
        {
            return Err(ValidationError::ExceedsSectionLimit {
                section: section.section_code.clone(),
                limit: section.limit,
                attempted,
            });
        }
        Ok(())
    }
}

/// Deduction sections and their slots for one user and financial year.
///
/// Invested, remaining and progress figures are computed on every read from
/// the stored slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeductionWallet {
    sections: BTreeMap<SectionCode, DeductionSection>,
    policy: LimitPolicy,
}

impl DeductionWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: LimitPolicy) -> Self {
        Self {
            sections: BTreeMap::new(),
            policy,
        }
    }

    /// Rebuilds a wallet from persisted sections.
    ///
    /// Stored limits and slot amounts go through the same checks as
    /// [`add_slot`](Self::add_slot).
    pub fn from_sections(
        sections: impl IntoIterator<Item = DeductionSection>,
        policy: LimitPolicy,
    ) -> Result<Self, ValidationError> {
        let mut stored = BTreeMap::new();
        for section in sections {
            require_non_negative("section limit", section.limit)?;
            for slot in &section.slots {
                require_positive("slot amount", slot.amount)?;
            }
            stored.insert(section.section_code.clone(), section);
        }
        Ok(Self {
            sections: stored,
            policy,
        })
    }

    pub fn policy(&self) -> LimitPolicy {
        self.policy
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Creates any of `codes` that do not exist yet, using the limit from
    /// `limits`. Existing sections and their slots are left alone, so calling
    /// this repeatedly is harmless. Codes without a limit are skipped.
    ///
    /// Returns the codes that were created.
    pub fn initialize_sections(
        &mut self,
        codes: impl IntoIterator<Item = SectionCode>,
        limits: &SectionLimits,
    ) -> Vec<SectionCode> {
        let mut created = Vec::new();
        for code in codes {
            if self.sections.contains_key(&code) {
                continue;
            }
            let Some(limit) = limits.get(&code) else {
                warn!(section = %code, "No limit configured for section; skipping");
                continue;
            };
            debug!(section = %code, limit = %limit, "Created deduction section");
            self.sections
                .insert(code.clone(), DeductionSection::new(code.clone(), limit));
            created.push(code);
        }
        created
    }

    /// Adds a slot to an existing section and returns its new id.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptySlotName`] for a blank name
    /// - [`ValidationError::NonPositiveAmount`] for an amount at or below zero
    /// - [`ValidationError::AmountOutOfRange`] for an amount above
    ///   [`MAX_AMOUNT`](crate::models::MAX_AMOUNT)
    /// - [`NotFoundError::Section`] if the section was never initialized
    /// - [`ValidationError::ExceedsSectionLimit`] under [`LimitPolicy::Enforce`]
    pub fn add_slot(
        &mut self,
        code: &SectionCode,
        name: &str,
        amount: Decimal,
    ) -> Result<SlotId, WalletError> {
        let name = require_text(name, ValidationError::EmptySlotName)?;
        let amount = require_positive("slot amount", amount)?;
        let policy = self.policy;
        let section = self
            .sections
            .get_mut(code)
            .ok_or_else(|| NotFoundError::Section(code.clone()))?;
        let attempted = checked_sum(
            "section total",
            section.slots.iter().map(|slot| slot.amount).chain([amount]),
        )?;
        policy.check(section, attempted)?;

        let id = SlotId::generate();
        section.slots.push(DeductionSlot {
            id,
            name: name.to_string(),
            amount,
            date_added: Utc::now(),
        });
        debug!(section = %code, slot = %id, amount = %amount, "Added deduction slot");
        Ok(id)
    }

    /// Replaces a slot's amount. Name and date added are kept.
    pub fn update_slot(
        &mut self,
        id: SlotId,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let amount = require_positive("slot amount", amount)?;
        let policy = self.policy;
        let (section, index) = self.section_with_slot_mut(id)?;
        let others = section
            .slots
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .map(|(_, slot)| slot.amount);
        let attempted = checked_sum("section total", others.chain([amount]))?;
        policy.check(section, attempted)?;

        section.slots[index].amount = amount;
        debug!(
            section = %section.section_code,
            slot = %id,
            amount = %amount,
            "Updated deduction slot"
        );
        Ok(())
    }

    /// Replaces a slot's name. Amount and date added are kept.
    pub fn rename_slot(
        &mut self,
        id: SlotId,
        name: &str,
    ) -> Result<(), WalletError> {
        let name = require_text(name, ValidationError::EmptySlotName)?;
        let (section, index) = self.section_with_slot_mut(id)?;

        section.slots[index].name = name.to_string();
        debug!(section = %section.section_code, slot = %id, "Renamed deduction slot");
        Ok(())
    }

    /// Removes a slot and returns it. The section stays even when it is left
    /// with no slots.
    pub fn delete_slot(
        &mut self,
        id: SlotId,
    ) -> Result<DeductionSlot, WalletError> {
        let (section, index) = self.section_with_slot_mut(id)?;

        let slot = section.slots.remove(index);
        debug!(section = %section.section_code, slot = %id, "Deleted deduction slot");
        Ok(slot)
    }

    pub fn section(
        &self,
        code: &SectionCode,
    ) -> Result<SectionSnapshot, WalletError> {
        self.sections
            .get(code)
            .map(DeductionSection::snapshot)
            .ok_or_else(|| NotFoundError::Section(code.clone()).into())
    }

    /// All sections ordered by code.
    pub fn sections(&self) -> Vec<SectionSnapshot> {
        self.sections.values().map(DeductionSection::snapshot).collect()
    }

    pub fn slot(
        &self,
        id: SlotId,
    ) -> Option<&DeductionSlot> {
        self.sections
            .values()
            .flat_map(|section| section.slots.iter())
            .find(|slot| slot.id == id)
    }

    /// Invested total of one section, or `None` if it was never initialized.
    pub fn invested_in(
        &self,
        code: &SectionCode,
    ) -> Option<Decimal> {
        self.sections.get(code).map(DeductionSection::invested)
    }

    pub fn summary(&self) -> WalletSummary {
        WalletSummary::from_sections(self.sections.values())
    }

    /// Stored state, for persistence.
    pub fn stored_sections(&self) -> impl Iterator<Item = &DeductionSection> {
        self.sections.values()
    }

    pub fn into_sections(self) -> Vec<DeductionSection> {
        self.sections.into_values().collect()
    }

    fn section_with_slot_mut(
        &mut self,
        id: SlotId,
    ) -> Result<(&mut DeductionSection, usize), NotFoundError> {
        self.sections
            .values_mut()
            .find_map(|section| {
                let index = section.slots.iter().position(|slot| slot.id == id)?;
                Some((section, index))
            })
            .ok_or(NotFoundError::Slot(id))
    }
}
