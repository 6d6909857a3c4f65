use std::collections::BTreeMap;
use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use taxplan_core::calculations::{RegimeSchedule, TaxRules};
use taxplan_core::{PlannerRepository, TaxBracket, TaxRegime};

use crate::error::{LoaderError, year_not_found_or};

/// A single record from the tax brackets CSV file.
///
/// - `financial_year`: e.g. `2024-25`
/// - `regime`: `new` or `old`
/// - `min_income`: lower bound of the slab
/// - `max_income`: upper bound of the slab (empty for the top slab)
/// - `base_tax`: tax accrued on everything below `min_income`
/// - `rate`: marginal rate as a decimal (e.g. 0.05 for 5%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub financial_year: String,
    pub regime: String,
    pub min_income: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub max_income: Option<Decimal>,
    pub base_tax: Decimal,
    pub rate: Decimal,
}

impl TaxBracketRecord {
    fn regime(&self) -> Result<TaxRegime, LoaderError> {
        TaxRegime::parse(&self.regime)
            .ok_or_else(|| LoaderError::InvalidRegime(self.regime.clone()))
    }

    fn bracket(&self) -> TaxBracket {
        TaxBracket {
            min_income: self.min_income,
            max_income: self.max_income,
            rate: self.rate,
            base_tax: self.base_tax,
        }
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Groups records by (financial year, regime) and validates each group as a
/// complete schedule.
fn schedules(
    records: &[TaxBracketRecord]
) -> Result<BTreeMap<(String, TaxRegime), RegimeSchedule>, LoaderError> {
    let mut groups: BTreeMap<(String, TaxRegime), Vec<TaxBracket>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.financial_year.trim().to_string(), record.regime()?))
            .or_default()
            .push(record.bracket());
    }

    groups
        .into_iter()
        .map(|((financial_year, regime), mut brackets)| {
            brackets.sort_by(|a, b| a.min_income.cmp(&b.min_income));
            match RegimeSchedule::new(brackets) {
                Ok(schedule) => Ok(((financial_year, regime), schedule)),
                Err(source) => Err(LoaderError::InvalidSchedule {
                    financial_year,
                    regime,
                    source,
                }),
            }
        })
        .collect()
}

/// Loader for slab schedules from CSV files.
///
/// Loading goes through the [`PlannerRepository`] trait, so it works with any
/// storage backend.
pub struct TaxBracketLoader;

impl TaxBracketLoader {
    /// Parse tax bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxBracketRecord>, LoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxBracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Builds the NEW/OLD rules for `financial_year` from parsed records.
    pub fn rules_for(
        records: &[TaxBracketRecord],
        financial_year: &str,
    ) -> Result<TaxRules, LoaderError> {
        let mut schedules = schedules(records)?;
        let mut take = |regime: TaxRegime| {
            schedules
                .remove(&(financial_year.trim().to_string(), regime))
                .ok_or_else(|| LoaderError::MissingSchedule {
                    financial_year: financial_year.to_string(),
                    regime,
                })
        };

        let new_regime = take(TaxRegime::New)?;
        let old_regime = take(TaxRegime::Old)?;
        Ok(TaxRules::new(new_regime, old_regime))
    }

    /// Load tax bracket records into the database.
    ///
    /// Every (financial year, regime) group is validated as a schedule
    /// before anything is written. Each group then atomically replaces the
    /// stored brackets for that pair, so loading the same file twice yields
    /// the same result and a failed write leaves the old schedule in place.
    pub async fn load<R: PlannerRepository + ?Sized>(
        repo: &R,
        records: &[TaxBracketRecord],
    ) -> Result<usize, LoaderError> {
        let mut inserted = 0;

        for ((financial_year, regime), schedule) in schedules(records)? {
            let brackets = schedule.brackets();
            repo.replace_tax_brackets(&financial_year, regime, brackets)
                .await
                .map_err(|e| year_not_found_or(e, &financial_year))?;
            inserted += brackets.len();
        }

        Ok(inserted)
    }
}
