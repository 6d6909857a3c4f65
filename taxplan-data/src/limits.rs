use std::io::Read;

use rust_decimal::Decimal;
use serde::Deserialize;
use taxplan_core::{PlannerRepository, SectionCode, SectionLimits, require_non_negative};

use crate::error::{LoaderError, year_not_found_or};

/// One row of a section-limit table: `financial_year,section,limit`.
///
/// A limit of 0 marks a section without a statutory cap.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SectionLimitRecord {
    pub financial_year: String,
    pub section: String,
    pub limit: Decimal,
}

pub struct SectionLimitLoader;

impl SectionLimitLoader {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<SectionLimitRecord>, LoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: SectionLimitRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// The limit table for `financial_year`. A section listed twice keeps its
    /// last value.
    pub fn limits_for(
        records: &[SectionLimitRecord],
        financial_year: &str,
    ) -> Result<SectionLimits, LoaderError> {
        let mut limits = SectionLimits::new();
        for record in records
            .iter()
            .filter(|r| r.financial_year.trim() == financial_year.trim())
        {
            limits.insert(SectionCode::parse(&record.section)?, record.limit)?;
        }
        Ok(limits)
    }

    /// Upserts every row. Rows are validated before the first write.
    pub async fn load<R: PlannerRepository + ?Sized>(
        repo: &R,
        records: &[SectionLimitRecord],
    ) -> Result<usize, LoaderError> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let code = SectionCode::parse(&record.section)?;
            require_non_negative("section limit", record.limit)?;
            rows.push((record.financial_year.trim(), code, record.limit));
        }

        for (financial_year, code, limit) in &rows {
            repo.upsert_section_limit(financial_year, code, *limit)
                .await
                .map_err(|e| year_not_found_or(e, financial_year))?;
        }

        Ok(rows.len())
    }
}
