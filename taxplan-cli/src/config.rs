//! TOML configuration for the `taxplan` binary.
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connectionString = "taxplan.db"
//!
//! [planner]
//! financialYear = "2024-25"
//! limitPolicy = "track"            # or "enforce"
//!
//! [planner.suggestion]
//! primarySection = "80C"
//! primaryLimit = "150000"
//! suggestionRate = "0.125"
//!
//! [planner.sectionLimits]
//! "80C" = "150000"
//!
//! [[planner.rules.new]]
//! minIncome = "0"
//! rate = "0"
//! baseTax = "0"
//!
//! [[planner.rules.old]]
//! minIncome = "0"
//! rate = "0"
//! baseTax = "0"
//! ```
//!
//! Amounts are strings so they parse exactly.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use taxplan_core::db::DbConfig;
use taxplan_core::planner::PlannerConfig;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub database: DbConfig,
    pub planner: PlannerConfig,
}

impl AppConfig {
    /// The configuration compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Self::parse(DEFAULT_CONFIG).context("Built-in configuration is invalid")
    }

    /// Reads `path`, or the built-in configuration when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
                Self::parse(&text)
                    .with_context(|| format!("Invalid config file '{}'", path.display()))
            }
            None => Self::builtin(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.planner.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use taxplan_core::wallet::LimitPolicy;
    use taxplan_core::{SectionCode, TaxRegime};

    use super::*;

    #[test]
    fn builtin_config_reproduces_2024_25_tables() {
        let config = AppConfig::builtin().expect("built-in config should parse");
        let planner = &config.planner;

        assert_eq!(planner.financial_year, "2024-25");
        assert_eq!(planner.limit_policy, LimitPolicy::Track);
        assert_eq!(planner.rules.schedule(TaxRegime::New).brackets().len(), 6);
        assert_eq!(planner.rules.schedule(TaxRegime::Old).brackets().len(), 4);
        assert_eq!(planner.section_limits.len(), 8);
        assert_eq!(
            planner.section_limits.get(&SectionCode::parse("80ccd(1b)").unwrap()),
            Some(dec!(50000))
        );
        assert_eq!(planner.suggestion.suggestion_rate, dec!(0.125));
        assert_eq!(config.database.connection_string, "taxplan.db");
    }

    #[test]
    fn builtin_new_regime_matches_reference_points() {
        let config = AppConfig::builtin().unwrap();
        let schedule = config.planner.rules.schedule(TaxRegime::New);

        assert_eq!(schedule.tax_on(dec!(300000)), dec!(0));
        assert_eq!(schedule.tax_on(dec!(600000)), dec!(15000));
        assert_eq!(schedule.tax_on(dec!(1200000)), dec!(90000));
    }

    #[test]
    fn missing_database_section_uses_default() {
        let text = DEFAULT_CONFIG.replace("connectionString = \"taxplan.db\"", "");
        let text = text.replace("[database]\nbackend = \"sqlite\"\n", "");

        let config = AppConfig::parse(&text).unwrap();

        assert_eq!(config.database, DbConfig::default());
    }

    #[test]
    fn invalid_schedule_is_rejected() {
        let text = DEFAULT_CONFIG.replacen("baseTax = \"15000\"", "baseTax = \"1\"", 1);

        let err = AppConfig::parse(&text).expect_err("gapless schedule check should fail");

        assert!(err.to_string().contains("base tax"), "got: {err:#}");
    }

    #[test]
    fn invalid_suggestion_rate_is_rejected() {
        let text = DEFAULT_CONFIG.replace("suggestionRate = \"0.125\"", "suggestionRate = \"1.5\"");

        assert!(AppConfig::parse(&text).is_err());
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let err = AppConfig::load(Some(Path::new("./no-such-config.toml"))).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to read config file './no-such-config.toml'"
        );
    }
}
