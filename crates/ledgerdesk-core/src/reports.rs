//! Report structures returned by the statement aggregator

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::period::DateRange;
use crate::types::StatementSection;

/// Kind of report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    GeneralLedger,
    TrialBalance,
}

impl ReportKind {
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::IncomeStatement => "Income Statement",
            ReportKind::BalanceSheet => "Balance Sheet",
            ReportKind::CashFlow => "Cash Flow Statement",
            ReportKind::GeneralLedger => "General Ledger",
            ReportKind::TrialBalance => "Trial Balance",
        }
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "income_statement" | "income" => Ok(ReportKind::IncomeStatement),
            "balance_sheet" | "balance" => Ok(ReportKind::BalanceSheet),
            "cash_flow" | "cashflow" => Ok(ReportKind::CashFlow),
            "general_ledger" | "ledger" => Ok(ReportKind::GeneralLedger),
            "trial_balance" => Ok(ReportKind::TrialBalance),
            _ => Err(format!("Invalid report kind: {}", s)),
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::IncomeStatement => write!(f, "income_statement"),
            ReportKind::BalanceSheet => write!(f, "balance_sheet"),
            ReportKind::CashFlow => write!(f, "cash_flow"),
            ReportKind::GeneralLedger => write!(f, "general_ledger"),
            ReportKind::TrialBalance => write!(f, "trial_balance"),
        }
    }
}

/// Posted entry reduced to the figures a statement needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementEntry {
    pub entry_id: String,
    pub entry_name: String,
    pub entry_date: Option<NaiveDate>,
    pub section: StatementSection,
    pub debit: f64,
    pub credit: f64,
}

impl StatementEntry {
    /// Net movement magnitude, |debit - credit|
    pub fn magnitude(&self) -> f64 {
        (self.debit - self.credit).abs()
    }

    /// Signed movement, debit positive
    pub fn signed(&self) -> f64 {
        self.debit - self.credit
    }
}

/// One row of a report section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLine {
    pub entry_id: String,
    pub label: String,
    pub date: Option<NaiveDate>,
    pub amount: f64,
    /// Share of the section total, 0 when the total is 0
    pub percentage: f64,
}

/// Bucket of lines with its total. Empty sections total zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub key: String,
    pub title: String,
    pub lines: Vec<ReportLine>,
    pub total: f64,
}

impl ReportSection {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Derived figure shown under the sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub key: String,
    pub label: String,
    pub amount: f64,
    /// Display emphasis for the bottom line
    pub is_net: bool,
}

impl SummaryRow {
    pub fn new(key: &str, label: &str, amount: f64) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            amount,
            is_net: false,
        }
    }

    pub fn net(key: &str, label: &str, amount: f64) -> Self {
        Self {
            is_net: true,
            ..Self::new(key, label, amount)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub period: Option<DateRange>,
    pub revenue: ReportSection,
    pub cost_of_sales: ReportSection,
    pub operating_expenses: ReportSection,
    pub other_income: ReportSection,
    pub financing_costs: ReportSection,
    pub total_revenue: f64,
    pub total_cost_of_sales: f64,
    pub gross_profit: f64,
    pub total_operating_expenses: f64,
    pub operating_profit: f64,
    pub total_other_income: f64,
    pub total_financing_costs: f64,
    pub net_income: f64,
    pub summary: Vec<SummaryRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub period: Option<DateRange>,
    pub current_assets: ReportSection,
    pub non_current_assets: ReportSection,
    pub current_liabilities: ReportSection,
    pub non_current_liabilities: ReportSection,
    pub equity: ReportSection,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_equity: f64,
    /// total_assets - (total_liabilities + total_equity); zero for a consistent ledger
    pub balance_check: f64,
    pub summary: Vec<SummaryRow>,
}

impl BalanceSheet {
    /// Diagnostic only, nothing enforces it
    pub fn is_consistent(&self, tolerance: f64) -> bool {
        self.balance_check.abs() < tolerance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub period: Option<DateRange>,
    pub operating: ReportSection,
    pub investing: ReportSection,
    pub financing: ReportSection,
    pub cash_from_operating: f64,
    pub cash_from_investing: f64,
    pub cash_from_financing: f64,
    pub net_cash_flow: f64,
    pub summary: Vec<SummaryRow>,
}

/// One posting in an account's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerPosting {
    pub entry_id: String,
    pub entry_name: String,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub debit: f64,
    pub credit: f64,
    /// Cumulative debit - credit up to and including this posting
    pub running_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub account_id: String,
    pub account_number: String,
    pub account_name: String,
    pub postings: Vec<LedgerPosting>,
    pub total_debit: f64,
    pub total_credit: f64,
    /// Sum of debit - credit over the account's postings
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralLedger {
    pub period: Option<DateRange>,
    pub accounts: Vec<LedgerAccount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_id: String,
    pub account_number: String,
    pub account_name: String,
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub period: Option<DateRange>,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: f64,
    pub total_credit: f64,
    pub is_balanced: bool,
}

/// Any generated report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report {
    IncomeStatement(IncomeStatement),
    BalanceSheet(BalanceSheet),
    CashFlow(CashFlowStatement),
    GeneralLedger(GeneralLedger),
    TrialBalance(TrialBalance),
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::IncomeStatement(_) => ReportKind::IncomeStatement,
            Report::BalanceSheet(_) => ReportKind::BalanceSheet,
            Report::CashFlow(_) => ReportKind::CashFlow,
            Report::GeneralLedger(_) => ReportKind::GeneralLedger,
            Report::TrialBalance(_) => ReportKind::TrialBalance,
        }
    }
}
