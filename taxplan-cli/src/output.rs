//! Plain-text rendering of command results. `--json` bypasses this and
//! prints the serialized boundary shapes instead.

use std::fmt::Write;

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use taxplan_core::planner::TaxPlan;
use taxplan_core::{IncomeRecord, TaxResult, WalletSummary};

use crate::app::WalletView;
use crate::utils::{money, percent};

pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn limit_label(limit: Decimal) -> String {
    if limit.is_zero() {
        "uncapped".to_string()
    } else {
        money(limit)
    }
}

pub fn tax_results(results: &[TaxResult]) -> String {
    let mut out = format!(
        "{:<12} {:>14} {:>14} {:>14} {:>14} {:>14}\n",
        "Regime", "Gross", "Deductions", "Taxable", "Tax", "Net"
    );
    for r in results {
        let _ = writeln!(
            out,
            "{:<12} {:>14} {:>14} {:>14} {:>14} {:>14}",
            r.regime.to_long_str(),
            money(r.gross_income),
            money(r.deductions_applied),
            money(r.taxable_income),
            money(r.tax_payable),
            money(r.net_income),
        );
    }
    out
}

pub fn income_record(record: &IncomeRecord) -> String {
    let s = &record.sources;
    format!(
        concat!(
            "Income for {} ({})\n",
            "  Salary           {:>14}\n",
            "  Business income  {:>14}\n",
            "  Capital gains    {:>14}\n",
            "  Other income     {:>14}\n",
            "  Total            {:>14}\n",
        ),
        record.user_id,
        record.financial_year,
        money(s.salary),
        money(s.business_income),
        money(s.capital_gains),
        money(s.other_income),
        money(record.total_income),
    )
}

fn summary_lines(
    out: &mut String,
    summary: &WalletSummary,
) {
    let _ = writeln!(out, "Total invested   {:>14}", money(summary.total_invested));
    let _ = writeln!(out, "Total limit      {:>14}", money(summary.total_limit));
    let _ = writeln!(out, "Total remaining  {:>14}", money(summary.total_remaining));
    let _ = writeln!(out, "Eligible         {:>14}", money(summary.total_eligible));
}

pub fn wallet(view: &WalletView) -> String {
    if view.sections.is_empty() {
        return "Wallet is empty; run `taxplan wallet init` first.\n".to_string();
    }

    let mut out = String::new();
    for section in &view.sections {
        let _ = writeln!(
            out,
            "{:<10} {:>14} / {:<14} {:>7}  remaining {}",
            section.section_code.as_str(),
            money(section.invested),
            limit_label(section.limit),
            percent(section.progress),
            money(section.remaining),
        );
        for slot in &section.slots {
            let _ = writeln!(
                out,
                "    {}  {:<24} {:>14}  {}",
                slot.id,
                slot.name,
                money(slot.amount),
                slot.date_added.format("%Y-%m-%d"),
            );
        }
    }
    out.push('\n');
    summary_lines(&mut out, &view.summary);
    out
}

pub fn plan(plan: &TaxPlan) -> String {
    let mut out = tax_results(std::slice::from_ref(&plan.tax));
    out.push('\n');
    summary_lines(&mut out, &plan.wallet);

    let s = &plan.suggestion;
    let _ = writeln!(
        out,
        "\nSection {}: invested {}, room {}. Suggested investment: {}",
        s.primary_section,
        money(s.already_invested),
        money(s.remaining_cap),
        money(s.suggested_investment),
    );
    out
}
