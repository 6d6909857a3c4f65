//! Host layer: wires storage, configuration and the planning core together
//! and persists wallet state after every mutation.

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use serde::Serialize;
use taxplan_core::calculations::{RegimeSchedule, TaxRules};
use taxplan_core::db::RepositoryRegistry;
use taxplan_core::planner::{Planner, PlannerConfig, TaxPlan};
use taxplan_core::wallet::{DeductionWallet, WalletBook, WalletKey};
use taxplan_core::{
    DeductionSlot, IncomeProfile, IncomeRecord, IncomeSources, NewIncomeRecord, PlannerRepository,
    RepositoryError, SectionCode, SectionSnapshot, SlotId, TaxRegime, TaxResult, WalletSummary,
};
use taxplan_db_sqlite::SqliteRepositoryFactory;
use tracing::{debug, info};

/// Registry with every storage backend this binary ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Replaces the configured brackets and limits with the ones stored for
/// `config.financial_year`, when the database has them.
///
/// With `require_stored` set, a year without stored brackets is an error
/// instead of falling back to the configured tables.
pub async fn resolve_planner_config(
    repo: &dyn PlannerRepository,
    mut config: PlannerConfig,
    require_stored: bool,
) -> Result<PlannerConfig> {
    let year = config.financial_year.clone();

    let new_brackets = repo.get_tax_brackets(&year, TaxRegime::New).await?;
    let old_brackets = repo.get_tax_brackets(&year, TaxRegime::Old).await?;
    match (new_brackets.is_empty(), old_brackets.is_empty()) {
        (true, true) if require_stored => bail!("No tax brackets stored for {year}"),
        (true, true) => debug!(financial_year = %year, "Using configured tax brackets"),
        (false, false) => {
            let new_regime = RegimeSchedule::new(new_brackets)
                .with_context(|| format!("Stored new regime brackets for {year} are invalid"))?;
            let old_regime = RegimeSchedule::new(old_brackets)
                .with_context(|| format!("Stored old regime brackets for {year} are invalid"))?;
            config.rules = TaxRules::new(new_regime, old_regime);
            info!(financial_year = %year, "Using stored tax brackets");
        }
        (true, false) => bail!("Stored brackets for {year} have no new regime schedule"),
        (false, true) => bail!("Stored brackets for {year} have no old regime schedule"),
    }

    let limits = repo.get_section_limits(&year).await?;
    if !limits.is_empty() {
        config.section_limits = limits;
    }

    Ok(config)
}

/// Sections and totals of one wallet, as printed by `wallet show`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub sections: Vec<SectionSnapshot>,
    pub summary: WalletSummary,
}

/// One user's view of one financial year.
pub struct Session {
    repo: Box<dyn PlannerRepository>,
    planner: Planner,
    wallets: WalletBook,
    key: WalletKey,
}

impl Session {
    /// Loads the stored wallet for (`user_id`, `config.financial_year`).
    pub async fn open(
        repo: Box<dyn PlannerRepository>,
        config: PlannerConfig,
        user_id: &str,
    ) -> Result<Self> {
        let planner = Planner::new(config).context("Invalid planner configuration")?;
        let key = WalletKey::new(user_id, &planner.config().financial_year)?;

        let sections = repo
            .load_wallet_sections(&key)
            .await
            .with_context(|| format!("Failed to load wallet {key}"))?;
        let wallets = planner.wallet_book();
        let wallet = DeductionWallet::from_sections(sections, planner.config().limit_policy)
            .with_context(|| format!("Stored wallet {key} is invalid"))?;
        wallets.insert(key.clone(), wallet);
        debug!(wallet = %key, "Opened session");

        Ok(Self {
            repo,
            planner,
            wallets,
            key,
        })
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn key(&self) -> &WalletKey {
        &self.key
    }

    pub fn financial_year(&self) -> &str {
        self.key.financial_year()
    }

    // ── tax ──────────────────────────────────────────────────────────────

    pub fn compute(
        &self,
        income: Decimal,
        regime: TaxRegime,
        deductions: Decimal,
    ) -> Result<TaxResult> {
        let profile = IncomeProfile::new(income, regime, self.financial_year())?;
        Ok(self.planner.calculator().calculate(&profile, deductions)?)
    }

    /// The same income under every regime.
    pub fn compare(
        &self,
        income: Decimal,
        deductions: Decimal,
    ) -> Result<Vec<TaxResult>> {
        TaxRegime::ALL
            .into_iter()
            .map(|regime| self.compute(income, regime, deductions))
            .collect()
    }

    // ── income ───────────────────────────────────────────────────────────

    /// Creates or replaces the income record for this session's year.
    pub async fn set_income(
        &self,
        sources: IncomeSources,
    ) -> Result<IncomeRecord> {
        let record = NewIncomeRecord {
            user_id: self.key.user_id().to_string(),
            financial_year: self.financial_year().to_string(),
            sources,
        };
        record.validate()?;

        match self.income().await? {
            Some(mut existing) => {
                existing.sources = record.sources;
                self.repo.update_income(&existing).await?;
                info!(wallet = %self.key, "Updated income record");
            }
            None => {
                self.repo.create_income(record).await?;
                info!(wallet = %self.key, "Created income record");
            }
        }

        self.income()
            .await?
            .context("Income record missing after save")
    }

    pub async fn income(&self) -> Result<Option<IncomeRecord>> {
        match self
            .repo
            .get_income(self.key.user_id(), self.financial_year())
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(RepositoryError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ── wallet ───────────────────────────────────────────────────────────

    /// Creates every configured section missing from the wallet.
    pub async fn init_wallet(&self) -> Result<Vec<SectionCode>> {
        let created = self
            .wallets
            .with_wallet(&self.key, |wallet| self.planner.initialize_wallet(wallet));
        self.persist_wallet().await?;
        Ok(created)
    }

    pub async fn add_slot(
        &self,
        section: &str,
        name: &str,
        amount: Decimal,
    ) -> Result<SlotId> {
        let code = SectionCode::parse(section)?;
        let id = self
            .wallets
            .with_wallet(&self.key, |wallet| wallet.add_slot(&code, name, amount))?;
        self.persist_wallet().await?;
        Ok(id)
    }

    pub async fn update_slot(
        &self,
        id: SlotId,
        amount: Decimal,
    ) -> Result<()> {
        self.wallets
            .with_wallet(&self.key, |wallet| wallet.update_slot(id, amount))?;
        self.persist_wallet().await
    }

    pub async fn rename_slot(
        &self,
        id: SlotId,
        name: &str,
    ) -> Result<()> {
        self.wallets
            .with_wallet(&self.key, |wallet| wallet.rename_slot(id, name))?;
        self.persist_wallet().await
    }

    pub async fn delete_slot(
        &self,
        id: SlotId,
    ) -> Result<DeductionSlot> {
        let removed = self
            .wallets
            .with_wallet(&self.key, |wallet| wallet.delete_slot(id))?;
        self.persist_wallet().await?;
        Ok(removed)
    }

    pub fn wallet(&self) -> WalletView {
        self.wallets.read(&self.key, |wallet| WalletView {
            sections: wallet.sections(),
            summary: wallet.summary(),
        })
    }

    async fn persist_wallet(&self) -> Result<()> {
        let sections = self.wallets.snapshot(&self.key);
        self.repo
            .save_wallet_sections(&self.key, &sections)
            .await
            .with_context(|| format!("Failed to save wallet {}", self.key))
    }

    // ── plan ─────────────────────────────────────────────────────────────

    /// Tax with the wallet's deductions plus the investment suggestion.
    /// Uses `income` when given, otherwise the stored income record.
    pub async fn plan(
        &self,
        regime: TaxRegime,
        income: Option<Decimal>,
    ) -> Result<TaxPlan> {
        let gross = match income {
            Some(gross) => gross,
            None => match self.income().await? {
                Some(record) => record.total_income,
                None => bail!(
                    "No income recorded for {}; run `taxplan income set` or pass --income",
                    self.key
                ),
            },
        };

        let profile = IncomeProfile::new(gross, regime, self.financial_year())?;
        let plan = self
            .wallets
            .read(&self.key, |wallet| self.planner.plan(&profile, wallet))?;
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use taxplan_core::db::DbConfig;

    use super::*;
    use crate::config::AppConfig;

    async fn memory_repo() -> Box<dyn PlannerRepository> {
        build_registry()
            .create(&DbConfig::default())
            .await
            .expect("in-memory repository")
    }

    async fn session(user: &str) -> Session {
        let config = AppConfig::builtin().unwrap().planner;
        Session::open(memory_repo().await, config, user).await.unwrap()
    }

    #[test]
    fn registry_ships_sqlite() {
        assert_eq!(build_registry().available_backends(), vec!["sqlite"]);
    }

    #[tokio::test]
    async fn stored_brackets_replace_configured_ones() {
        let repo = memory_repo().await;
        let mut config = AppConfig::builtin().unwrap().planner;
        config.rules.new_regime = config.rules.old_regime.clone();

        let resolved = resolve_planner_config(&*repo, config, false).await.unwrap();

        // Seeds hold the real new regime table.
        assert_eq!(resolved.rules.new_regime.brackets().len(), 6);
        assert_eq!(resolved.section_limits.len(), 8);
    }

    #[tokio::test]
    async fn unknown_year_needs_stored_brackets() {
        let repo = memory_repo().await;
        let mut config = AppConfig::builtin().unwrap().planner;
        config.financial_year = "2031-32".to_string();

        let err = resolve_planner_config(&*repo, config.clone(), true)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No tax brackets stored for 2031-32");

        let fallback = resolve_planner_config(&*repo, config, false).await.unwrap();
        assert_eq!(fallback.section_limits.len(), 8);
    }

    #[tokio::test]
    async fn compare_reports_both_regimes() {
        let session = session("u1").await;

        let results = session.compare(dec!(1000000), dec!(150000)).unwrap();

        assert_eq!(results[0].regime, TaxRegime::New);
        assert_eq!(results[0].tax_payable, dec!(60000));
        assert_eq!(results[1].regime, TaxRegime::Old);
        assert_eq!(results[1].tax_payable, dec!(82500));
    }

    #[tokio::test]
    async fn set_income_creates_then_updates() {
        let session = session("u1").await;

        let created = session
            .set_income(IncomeSources::salary_only(dec!(900000)))
            .await
            .unwrap();
        let updated = session
            .set_income(IncomeSources {
                salary: dec!(900000),
                other_income: dec!(50000),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.total_income, dec!(950000));
    }

    #[tokio::test]
    async fn negative_income_is_rejected_before_storage() {
        let session = session("u1").await;

        let result = session.set_income(IncomeSources::salary_only(dec!(-1))).await;

        assert!(result.is_err());
        assert_eq!(session.income().await.unwrap(), None);
    }

    #[tokio::test]
    async fn wallet_changes_are_persisted() {
        let session = session("u1").await;
        session.init_wallet().await.unwrap();
        let ppf = session.add_slot("80c", "PPF", dec!(50000)).await.unwrap();
        let elss = session.add_slot("80C", "ELSS", dec!(20000)).await.unwrap();
        session.update_slot(ppf, dec!(60000)).await.unwrap();
        session.rename_slot(elss, "ELSS fund").await.unwrap();

        let stored = session.repo.load_wallet_sections(session.key()).await.unwrap();
        let section_80c = stored
            .iter()
            .find(|s| s.section_code.as_str() == "80C")
            .unwrap();
        assert_eq!(stored.len(), 8);
        assert_eq!(section_80c.invested(), dec!(80000));
        assert_eq!(section_80c.slots[1].name, "ELSS fund");

        let removed = session.delete_slot(ppf).await.unwrap();
        assert_eq!(removed.amount, dec!(60000));
        assert_eq!(session.wallet().summary.total_invested, dec!(20000));
    }

    #[tokio::test]
    async fn unknown_section_is_reported() {
        let session = session("u1").await;

        let err = session.add_slot("80Z", "Mystery", dec!(1)).await.unwrap_err();

        assert!(err.to_string().contains("80Z"), "got: {err:#}");
    }

    #[tokio::test]
    async fn plan_uses_stored_income_and_wallet() {
        let session = session("u1").await;
        session.init_wallet().await.unwrap();
        session.add_slot("80C", "PPF", dec!(150000)).await.unwrap();
        session
            .set_income(IncomeSources::salary_only(dec!(1000000)))
            .await
            .unwrap();

        let plan = session.plan(TaxRegime::Old, None).await.unwrap();

        assert_eq!(plan.tax.taxable_income, dec!(850000));
        assert_eq!(plan.tax.tax_payable, dec!(82500));
        assert_eq!(plan.suggestion.suggested_investment, dec!(0));
    }

    #[tokio::test]
    async fn plan_without_income_explains_what_to_do() {
        let session = session("u1").await;

        let err = session.plan(TaxRegime::New, None).await.unwrap_err();

        assert!(err.to_string().starts_with("No income recorded for u1/2024-25"));
        assert!(session.plan(TaxRegime::New, Some(dec!(1200000))).await.is_ok());
    }
}
