use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use taxplan_core::wallet::WalletKey;
use taxplan_core::{
    DeductionSection, DeductionSlot, IncomeRecord, IncomeSources, NewIncomeRecord,
    PlannerRepository, RepositoryError, SectionCode, SectionLimits, SlotId, TaxBracket, TaxRegime,
};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connects to `database_url`, creating the database file if missing.
    ///
    /// Accepts sqlx URLs (`sqlite:plan.db`), bare paths and `:memory:`.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if database_url.contains(":memory:") {
            // An in-memory database lives only as long as a connection to it.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            info!(file = %path.display(), "Applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn get_income_by_id(
        &self,
        id: i64,
    ) -> Result<IncomeRecord, RepositoryError> {
        let row = sqlx::query(&format!("{INCOME_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_income_record(&row)
    }
}

const INCOME_COLUMNS: &str = "SELECT id, user_id, financial_year, salary, business_income,
        capital_gains, other_income, total_income, created_at, updated_at
     FROM income_records";

fn database_error(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn get_text(
    row: &SqliteRow,
    column: &str,
) -> Result<String, RepositoryError> {
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))
}

fn get_section_code(
    row: &SqliteRow,
    column: &str,
) -> Result<SectionCode, RepositoryError> {
    let raw = get_text(row, column)?;
    SectionCode::parse(&raw)
        .map_err(|e| RepositoryError::Database(format!("Invalid section code '{}': {}", raw, e)))
}

fn get_timestamp(
    row: &SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    row.try_get::<DateTime<Utc>, _>(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))
}

fn row_to_income_record(row: &SqliteRow) -> Result<IncomeRecord, RepositoryError> {
    Ok(IncomeRecord {
        id: row.try_get("id").map_err(database_error)?,
        user_id: get_text(row, "user_id")?,
        financial_year: get_text(row, "financial_year")?,
        sources: IncomeSources {
            salary: get_decimal(row, "salary")?,
            business_income: get_decimal(row, "business_income")?,
            capital_gains: get_decimal(row, "capital_gains")?,
            other_income: get_decimal(row, "other_income")?,
        },
        total_income: get_decimal(row, "total_income")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn row_to_slot(row: &SqliteRow) -> Result<DeductionSlot, RepositoryError> {
    let raw_id = get_text(row, "id")?;
    let id = raw_id
        .parse::<SlotId>()
        .map_err(|e| RepositoryError::Database(format!("Invalid slot id '{}': {}", raw_id, e)))?;

    Ok(DeductionSlot {
        id,
        name: get_text(row, "name")?,
        amount: get_decimal(row, "amount")?,
        date_added: get_timestamp(row, "date_added")?,
    })
}

#[async_trait]
impl PlannerRepository for SqliteRepository {
    async fn list_financial_years(&self) -> Result<Vec<String>, RepositoryError> {
        let rows =
            sqlx::query("SELECT financial_year FROM financial_years ORDER BY financial_year DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(database_error)?;

        rows.iter()
            .map(|row| get_text(row, "financial_year"))
            .collect()
    }

    async fn get_tax_brackets(
        &self,
        financial_year: &str,
        regime: TaxRegime,
    ) -> Result<Vec<TaxBracket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT min_income, max_income, rate, base_tax
             FROM tax_brackets
             WHERE financial_year = ? AND regime = ?
             ORDER BY CAST(min_income AS REAL)",
        )
        .bind(financial_year)
        .bind(regime.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        let mut brackets = Vec::with_capacity(rows.len());
        for row in rows {
            brackets.push(TaxBracket {
                min_income: get_decimal(&row, "min_income")?,
                max_income: get_optional_decimal(&row, "max_income")?,
                rate: get_decimal(&row, "rate")?,
                base_tax: get_decimal(&row, "base_tax")?,
            });
        }
        Ok(brackets)
    }

    async fn replace_tax_brackets(
        &self,
        financial_year: &str,
        regime: TaxRegime,
        brackets: &[TaxBracket],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query("DELETE FROM tax_brackets WHERE financial_year = ? AND regime = ?")
            .bind(financial_year)
            .bind(regime.as_str())
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        for bracket in brackets {
            sqlx::query(
                "INSERT INTO tax_brackets
                    (financial_year, regime, min_income, max_income, rate, base_tax)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(financial_year)
            .bind(regime.as_str())
            .bind(decimal_to_text(bracket.min_income))
            .bind(bracket.max_income.map(decimal_to_text))
            .bind(decimal_to_text(bracket.rate))
            .bind(decimal_to_text(bracket.base_tax))
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)?;

        debug!(
            financial_year = %financial_year,
            regime = %regime,
            brackets = brackets.len(),
            "Replaced tax brackets"
        );
        Ok(())
    }

    async fn get_section_limits(
        &self,
        financial_year: &str,
    ) -> Result<SectionLimits, RepositoryError> {
        let rows = sqlx::query(
            "SELECT section_code, limit_amount FROM section_limits WHERE financial_year = ?",
        )
        .bind(financial_year)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        let mut limits = SectionLimits::new();
        for row in rows {
            let code = get_section_code(&row, "section_code")?;
            let limit = get_decimal(&row, "limit_amount")?;
            limits.insert(code, limit).map_err(database_error)?;
        }
        Ok(limits)
    }

    async fn upsert_section_limit(
        &self,
        financial_year: &str,
        section: &SectionCode,
        limit: Decimal,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO section_limits (financial_year, section_code, limit_amount)
             VALUES (?, ?, ?)
             ON CONFLICT (financial_year, section_code)
             DO UPDATE SET limit_amount = excluded.limit_amount",
        )
        .bind(financial_year)
        .bind(section.as_str())
        .bind(decimal_to_text(limit))
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn create_income(
        &self,
        record: NewIncomeRecord,
    ) -> Result<IncomeRecord, RepositoryError> {
        let now = Utc::now();
        let sources = &record.sources;
        let total = sources
            .total()
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO income_records (
                user_id, financial_year, salary, business_income, capital_gains,
                other_income, total_income, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.user_id.trim())
        .bind(record.financial_year.trim())
        .bind(decimal_to_text(sources.salary))
        .bind(decimal_to_text(sources.business_income))
        .bind(decimal_to_text(sources.capital_gains))
        .bind(decimal_to_text(sources.other_income))
        .bind(decimal_to_text(total))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        self.get_income_by_id(result.last_insert_rowid()).await
    }

    async fn get_income(
        &self,
        user_id: &str,
        financial_year: &str,
    ) -> Result<IncomeRecord, RepositoryError> {
        let row = sqlx::query(&format!(
            "{INCOME_COLUMNS} WHERE user_id = ? AND financial_year = ?"
        ))
        .bind(user_id)
        .bind(financial_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_income_record(&row)
    }

    async fn update_income(
        &self,
        record: &IncomeRecord,
    ) -> Result<(), RepositoryError> {
        let sources = &record.sources;
        let total = sources
            .total()
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE income_records SET
                salary = ?, business_income = ?, capital_gains = ?, other_income = ?,
                total_income = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(decimal_to_text(sources.salary))
        .bind(decimal_to_text(sources.business_income))
        .bind(decimal_to_text(sources.capital_gains))
        .bind(decimal_to_text(sources.other_income))
        .bind(decimal_to_text(total))
        .bind(Utc::now())
        .bind(record.id)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_income(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM income_records WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_income(
        &self,
        user_id: &str,
        financial_year: Option<&str>,
    ) -> Result<Vec<IncomeRecord>, RepositoryError> {
        let rows = match financial_year {
            Some(year) => {
                sqlx::query(&format!(
                    "{INCOME_COLUMNS} WHERE user_id = ? AND financial_year = ?
                     ORDER BY financial_year DESC"
                ))
                .bind(user_id)
                .bind(year)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "{INCOME_COLUMNS} WHERE user_id = ? ORDER BY financial_year DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(database_error)?;

        rows.iter().map(row_to_income_record).collect()
    }

    async fn load_wallet_sections(
        &self,
        key: &WalletKey,
    ) -> Result<Vec<DeductionSection>, RepositoryError> {
        let section_rows = sqlx::query(
            "SELECT section_code, limit_amount FROM wallet_sections
             WHERE user_id = ? AND financial_year = ?",
        )
        .bind(key.user_id())
        .bind(key.financial_year())
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        let mut sections = BTreeMap::new();
        for row in &section_rows {
            let code = get_section_code(row, "section_code")?;
            let limit = get_decimal(row, "limit_amount")?;
            sections.insert(code.clone(), DeductionSection::new(code, limit));
        }

        let slot_rows = sqlx::query(
            "SELECT id, section_code, name, amount, date_added FROM wallet_slots
             WHERE user_id = ? AND financial_year = ?
             ORDER BY section_code, position",
        )
        .bind(key.user_id())
        .bind(key.financial_year())
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        for row in &slot_rows {
            let code = get_section_code(row, "section_code")?;
            let section = sections.get_mut(&code).ok_or_else(|| {
                RepositoryError::Database(format!("Slot references missing section {}", code))
            })?;
            section.slots.push(row_to_slot(row)?);
        }

        Ok(sections.into_values().collect())
    }

    async fn save_wallet_sections(
        &self,
        key: &WalletKey,
        sections: &[DeductionSection],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query("DELETE FROM wallet_slots WHERE user_id = ? AND financial_year = ?")
            .bind(key.user_id())
            .bind(key.financial_year())
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;
        sqlx::query("DELETE FROM wallet_sections WHERE user_id = ? AND financial_year = ?")
            .bind(key.user_id())
            .bind(key.financial_year())
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

        for section in sections {
            sqlx::query(
                "INSERT INTO wallet_sections (user_id, financial_year, section_code, limit_amount)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(key.user_id())
            .bind(key.financial_year())
            .bind(section.section_code.as_str())
            .bind(decimal_to_text(section.limit))
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;

            for (position, slot) in section.slots.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO wallet_slots (
                        id, user_id, financial_year, section_code, position,
                        name, amount, date_added
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(slot.id.to_string())
                .bind(key.user_id())
                .bind(key.financial_year())
                .bind(section.section_code.as_str())
                .bind(position as i64)
                .bind(&slot.name)
                .bind(decimal_to_text(slot.amount))
                .bind(slot.date_added)
                .execute(&mut *tx)
                .await
                .map_err(database_error)?;
            }
        }

        tx.commit().await.map_err(database_error)?;
        debug!(wallet = %key, sections = sections.len(), "Saved wallet");
        Ok(())
    }
}
