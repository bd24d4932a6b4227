//! Financial statement aggregation
//!
//! Posted journal entries are reduced to [`StatementEntry`] rows, bucketed by
//! their financial statement section and summed into the income statement,
//! balance sheet and cash flow statement. The general ledger and trial balance
//! work on the individual lines instead. All functions here are pure: the same
//! entries and range always produce the same report.

use std::collections::{BTreeMap, HashMap};

use crate::journal::BALANCE_TOLERANCE;
use crate::models::{Account, JournalEntry};
use crate::period::DateRange;
use crate::reports::{
    BalanceSheet, CashFlowStatement, GeneralLedger, IncomeStatement, LedgerAccount, LedgerPosting, Report,
    ReportKind, ReportLine, ReportSection, StatementEntry, SummaryRow, TrialBalance, TrialBalanceRow,
};
use crate::types::StatementSection;
use ledgerdesk_utils::round_to;

/// Which lines of an entry carry its statement amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountBasis {
    /// Lines on accounts of the section's family (revenue lines for revenue, ...)
    SectionAccounts,
    /// Lines on cash and bank accounts
    CashAccounts,
}

/// Reduce posted entries to statement rows.
///
/// Drafts are skipped. The debit/credit of a row are the totals of the lines
/// selected by `basis`. Entries stored with header totals only fall back to
/// those totals, as do section-basis entries with no line in the family.
pub fn resolve_entries(entries: &[JournalEntry], accounts: &[Account], basis: AmountBasis) -> Vec<StatementEntry> {
    let by_id: HashMap<&str, &Account> = accounts.iter().map(|a| (a.id.as_str(), a)).collect();

    entries
        .iter()
        .filter(|e| e.is_posted())
        .map(|entry| {
            let family = entry.financial_statement_section.account_family();
            let selected = |account: &Account| match basis {
                AmountBasis::SectionAccounts => Some(account.account_type) == family,
                AmountBasis::CashAccounts => account.is_cash_account(),
            };
            let lines: Vec<_> = entry
                .items
                .iter()
                .filter(|item| by_id.get(item.account_id.as_str()).is_some_and(|a| selected(a)))
                .collect();

            let (debit, credit) = match (lines.is_empty(), basis) {
                (false, _) => lines.iter().fold((0.0, 0.0), |(d, c), i| (d + i.debit, c + i.credit)),
                // Lines that never touch cash move no cash
                (true, AmountBasis::CashAccounts) if !entry.items.is_empty() => (0.0, 0.0),
                (true, _) => (entry.total_debit, entry.total_credit),
            };

            StatementEntry {
                entry_id: entry.id.clone(),
                entry_name: entry.entry_name.clone(),
                entry_date: entry.entry_date,
                section: entry.financial_statement_section.clone(),
                debit,
                credit,
            }
        })
        .collect()
}

fn in_range(date: Option<chrono::NaiveDate>, range: Option<&DateRange>) -> bool {
    match (range, date) {
        (None, _) => true,
        (Some(r), Some(d)) => r.contains(&d),
        (Some(_), None) => false,
    }
}

/// Build one bucket from the rows whose section is in `sections`
fn bucket<F>(
    key: &str,
    title: &str,
    entries: &[StatementEntry],
    range: Option<&DateRange>,
    sections: &[StatementSection],
    amount: F,
) -> ReportSection
where
    F: Fn(&StatementEntry) -> f64,
{
    let mut selected: Vec<&StatementEntry> = entries
        .iter()
        .filter(|e| sections.contains(&e.section))
        .filter(|e| in_range(e.entry_date, range))
        .collect();
    selected.sort_by(|a, b| a.entry_date.cmp(&b.entry_date).then_with(|| a.entry_id.cmp(&b.entry_id)));

    let total: f64 = selected.iter().map(|e| amount(e)).sum();
    let lines = selected
        .into_iter()
        .map(|e| {
            let value = amount(e);
            ReportLine {
                entry_id: e.entry_id.clone(),
                label: e.entry_name.clone(),
                date: e.entry_date,
                amount: value,
                percentage: percentage(value, total),
            }
        })
        .collect();

    ReportSection {
        key: key.to_string(),
        title: title.to_string(),
        lines,
        total,
    }
}

/// Share of the bucket total, two decimals
fn percentage(value: f64, total: f64) -> f64 {
    if total.abs() < f64::EPSILON {
        0.0
    } else {
        round_to(value * 100.0 / total, 2)
    }
}

/// Revenue, cost of sales, operating expenses, other income and financing
/// costs, with gross profit, operating profit and net income.
pub fn income_statement(entries: &[StatementEntry], range: Option<&DateRange>) -> IncomeStatement {
    let amount = StatementEntry::magnitude;
    let revenue = bucket("revenue", "Revenue", entries, range, &[StatementSection::Revenue], amount);
    let cost_of_sales = bucket(
        "cost_of_sales",
        "Cost of Sales",
        entries,
        range,
        &[StatementSection::CostOfSales],
        amount,
    );
    let operating_expenses = bucket(
        "operating_expenses",
        "Operating Expenses",
        entries,
        range,
        &[StatementSection::OperatingExpense],
        amount,
    );
    let other_income = bucket(
        "other_income",
        "Other Income",
        entries,
        range,
        &[StatementSection::OtherIncome],
        amount,
    );
    let financing_costs = bucket(
        "financing_costs",
        "Financing Costs",
        entries,
        range,
        &[StatementSection::FinancingCost],
        amount,
    );

    let total_revenue = revenue.total;
    let total_cost_of_sales = cost_of_sales.total;
    let gross_profit = total_revenue - total_cost_of_sales;
    let total_operating_expenses = operating_expenses.total;
    let operating_profit = gross_profit - total_operating_expenses;
    let total_other_income = other_income.total;
    let total_financing_costs = financing_costs.total;
    let net_income = operating_profit + total_other_income - total_financing_costs;

    let summary = vec![
        SummaryRow::new("total_revenue", "Total Revenue", total_revenue),
        SummaryRow::new("total_cost_of_sales", "Total Cost of Sales", total_cost_of_sales),
        SummaryRow::new("gross_profit", "Gross Profit", gross_profit),
        SummaryRow::new("total_operating_expenses", "Total Operating Expenses", total_operating_expenses),
        SummaryRow::new("operating_profit", "Operating Profit", operating_profit),
        SummaryRow::new("total_other_income", "Other Income", total_other_income),
        SummaryRow::new("total_financing_costs", "Financing Costs", total_financing_costs),
        SummaryRow::net("net_income", "Net Income", net_income),
    ];

    IncomeStatement {
        period: range.copied(),
        revenue,
        cost_of_sales,
        operating_expenses,
        other_income,
        financing_costs,
        total_revenue,
        total_cost_of_sales,
        gross_profit,
        total_operating_expenses,
        operating_profit,
        total_other_income,
        total_financing_costs,
        net_income,
        summary,
    }
}

/// Asset, liability and equity classes with the assets = liabilities + equity
/// diagnostic. The diagnostic is reported, never enforced.
pub fn balance_sheet(entries: &[StatementEntry], range: Option<&DateRange>) -> BalanceSheet {
    let amount = StatementEntry::magnitude;
    let current_assets = bucket(
        "current_assets",
        "Current Assets",
        entries,
        range,
        &[StatementSection::CurrentAsset],
        amount,
    );
    let non_current_assets = bucket(
        "non_current_assets",
        "Non-current Assets",
        entries,
        range,
        &[StatementSection::NonCurrentAsset],
        amount,
    );
    let current_liabilities = bucket(
        "current_liabilities",
        "Current Liabilities",
        entries,
        range,
        &[StatementSection::CurrentLiability],
        amount,
    );
    let non_current_liabilities = bucket(
        "non_current_liabilities",
        "Non-current Liabilities",
        entries,
        range,
        &[StatementSection::NonCurrentLiability],
        amount,
    );
    let equity = bucket("equity", "Equity", entries, range, &[StatementSection::Equity], amount);

    let total_assets = current_assets.total + non_current_assets.total;
    let total_liabilities = current_liabilities.total + non_current_liabilities.total;
    let total_equity = equity.total;
    let balance_check = total_assets - (total_liabilities + total_equity);

    if balance_check.abs() >= BALANCE_TOLERANCE {
        log::debug!(
            target: "ledgerdesk::statements",
            "balance sheet out of balance by {:.3}",
            balance_check
        );
    }

    let summary = vec![
        SummaryRow::new("total_assets", "Total Assets", total_assets),
        SummaryRow::new("total_liabilities", "Total Liabilities", total_liabilities),
        SummaryRow::new("total_equity", "Total Equity", total_equity),
        SummaryRow::new(
            "liabilities_and_equity",
            "Total Liabilities and Equity",
            total_liabilities + total_equity,
        ),
        SummaryRow::new("balance_check", "Balance Check", balance_check),
    ];

    BalanceSheet {
        period: range.copied(),
        current_assets,
        non_current_assets,
        current_liabilities,
        non_current_liabilities,
        equity,
        total_assets,
        total_liabilities,
        total_equity,
        balance_check,
        summary,
    }
}

/// Operating, investing and financing activities with signed amounts
pub fn cash_flow(entries: &[StatementEntry], range: Option<&DateRange>) -> CashFlowStatement {
    let amount = StatementEntry::signed;
    let operating = bucket(
        "operating",
        "Operating Activities",
        entries,
        range,
        &[
            StatementSection::Operating,
            StatementSection::Revenue,
            StatementSection::CostOfSales,
            StatementSection::OperatingExpense,
        ],
        amount,
    );
    let investing = bucket(
        "investing",
        "Investing Activities",
        entries,
        range,
        &[StatementSection::Investing, StatementSection::NonCurrentAsset],
        amount,
    );
    let financing = bucket(
        "financing",
        "Financing Activities",
        entries,
        range,
        &[
            StatementSection::Financing,
            StatementSection::NonCurrentLiability,
            StatementSection::Equity,
        ],
        amount,
    );

    let cash_from_operating = operating.total;
    let cash_from_investing = investing.total;
    let cash_from_financing = financing.total;
    let net_cash_flow = cash_from_operating + cash_from_investing + cash_from_financing;

    let summary = vec![
        SummaryRow::new("cash_from_operating", "Net Cash from Operating Activities", cash_from_operating),
        SummaryRow::new("cash_from_investing", "Net Cash from Investing Activities", cash_from_investing),
        SummaryRow::new("cash_from_financing", "Net Cash from Financing Activities", cash_from_financing),
        SummaryRow::net("net_cash_flow", "Net Cash Flow", net_cash_flow),
    ];

    CashFlowStatement {
        period: range.copied(),
        operating,
        investing,
        financing,
        cash_from_operating,
        cash_from_investing,
        cash_from_financing,
        net_cash_flow,
        summary,
    }
}

fn eligible<'a>(entries: &'a [JournalEntry], range: Option<&'a DateRange>) -> impl Iterator<Item = &'a JournalEntry> {
    entries
        .iter()
        .filter(|e| e.is_posted())
        .filter(move |e| in_range(e.entry_date, range))
}

/// Per-account chronological postings with a running debit - credit balance.
///
/// Accounts are ordered by account number; lines referencing accounts missing
/// from `accounts` are kept under their raw id.
pub fn general_ledger(entries: &[JournalEntry], accounts: &[Account], range: Option<&DateRange>) -> GeneralLedger {
    let by_id: HashMap<&str, &Account> = accounts.iter().map(|a| (a.id.as_str(), a)).collect();

    let mut grouped: HashMap<&str, Vec<(&JournalEntry, usize)>> = HashMap::new();
    for entry in eligible(entries, range) {
        for (idx, item) in entry.items.iter().enumerate() {
            grouped.entry(item.account_id.as_str()).or_default().push((entry, idx));
        }
    }

    let mut ledger_accounts: Vec<LedgerAccount> = grouped
        .into_iter()
        .map(|(account_id, mut lines)| {
            lines.sort_by(|(a, ai), (b, bi)| {
                a.entry_date
                    .cmp(&b.entry_date)
                    .then_with(|| a.id.cmp(&b.id))
                    .then_with(|| ai.cmp(bi))
            });

            let mut running = 0.0;
            let postings: Vec<LedgerPosting> = lines
                .into_iter()
                .map(|(entry, idx)| {
                    let item = &entry.items[idx];
                    running += item.net();
                    LedgerPosting {
                        entry_id: entry.id.clone(),
                        entry_name: entry.entry_name.clone(),
                        date: entry.entry_date,
                        description: if item.description.is_empty() {
                            entry.description.clone()
                        } else {
                            item.description.clone()
                        },
                        debit: item.debit,
                        credit: item.credit,
                        running_balance: running,
                    }
                })
                .collect();

            let account = by_id.get(account_id);
            LedgerAccount {
                account_id: account_id.to_string(),
                account_number: account.map(|a| a.account_number.clone()).unwrap_or_default(),
                account_name: account.map(|a| a.account_name.clone()).unwrap_or_default(),
                total_debit: postings.iter().map(|p| p.debit).sum(),
                total_credit: postings.iter().map(|p| p.credit).sum(),
                total: postings.iter().map(|p| p.debit - p.credit).sum(),
                postings,
            }
        })
        .collect();

    ledger_accounts.sort_by(|a, b| {
        a.account_number
            .cmp(&b.account_number)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });

    GeneralLedger {
        period: range.copied(),
        accounts: ledger_accounts,
    }
}

/// Debit and credit totals per account over posted entries
pub fn trial_balance(entries: &[JournalEntry], accounts: &[Account], range: Option<&DateRange>) -> TrialBalance {
    let by_id: HashMap<&str, &Account> = accounts.iter().map(|a| (a.id.as_str(), a)).collect();

    let mut sums: BTreeMap<(String, String), (f64, f64)> = BTreeMap::new();
    for entry in eligible(entries, range) {
        for item in &entry.items {
            let number = by_id
                .get(item.account_id.as_str())
                .map(|a| a.account_number.clone())
                .unwrap_or_default();
            let slot = sums.entry((number, item.account_id.clone())).or_insert((0.0, 0.0));
            slot.0 += item.debit;
            slot.1 += item.credit;
        }
    }

    let rows: Vec<TrialBalanceRow> = sums
        .into_iter()
        .map(|((account_number, account_id), (debit, credit))| TrialBalanceRow {
            account_name: by_id
                .get(account_id.as_str())
                .map(|a| a.account_name.clone())
                .unwrap_or_default(),
            account_id,
            account_number,
            debit,
            credit,
            balance: debit - credit,
        })
        .collect();

    let total_debit: f64 = rows.iter().map(|r| r.debit).sum();
    let total_credit: f64 = rows.iter().map(|r| r.credit).sum();

    TrialBalance {
        period: range.copied(),
        rows,
        total_debit,
        total_credit,
        is_balanced: (total_debit - total_credit).abs() < BALANCE_TOLERANCE,
    }
}

/// Generate a report of the given kind from stored entries
pub fn generate_report(
    kind: ReportKind,
    entries: &[JournalEntry],
    accounts: &[Account],
    range: Option<&DateRange>,
) -> Report {
    log::debug!(
        target: "ledgerdesk::statements",
        "generating {} from {} entries ({})",
        kind,
        entries.len(),
        range.map(|r| r.to_string()).unwrap_or_else(|| "all dates".to_string())
    );

    match kind {
        ReportKind::IncomeStatement => {
            let rows = resolve_entries(entries, accounts, AmountBasis::SectionAccounts);
            Report::IncomeStatement(income_statement(&rows, range))
        }
        ReportKind::BalanceSheet => {
            let rows = resolve_entries(entries, accounts, AmountBasis::SectionAccounts);
            Report::BalanceSheet(balance_sheet(&rows, range))
        }
        ReportKind::CashFlow => {
            let rows = resolve_entries(entries, accounts, AmountBasis::CashAccounts);
            Report::CashFlow(cash_flow(&rows, range))
        }
        ReportKind::GeneralLedger => Report::GeneralLedger(general_ledger(entries, accounts, range)),
        ReportKind::TrialBalance => Report::TrialBalance(trial_balance(entries, accounts, range)),
    }
}
