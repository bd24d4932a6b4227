//! Journal entry validation
//!
//! Gatekeeping for double-entry postings: debits must equal credits within
//! [`BALANCE_TOLERANCE`], an entry needs at least [`MIN_ENTRY_LINES`] lines and
//! every line must reference an account. Validation never touches stored state.

use serde::Serialize;
use std::collections::HashMap;

use ledgerdesk_config::LedgerConfig;

use crate::models::{Account, JournalEntry, JournalEntryItem};

/// Largest |debit - credit| difference still treated as balanced
pub const BALANCE_TOLERANCE: f64 = 0.001;

/// A double-entry posting touches at least two lines
pub const MIN_ENTRY_LINES: usize = 2;

/// Single problem found in a journal entry. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryIssue {
    Unbalanced { total_debit: f64, total_credit: f64 },
    TooFewLines { count: usize, minimum: usize },
    MissingAccount { line: usize },
    UnknownAccount { line: usize, account_id: String },
    InactiveAccount { line: usize, account_id: String },
    InvalidAmount { line: usize },
    MissingName,
    MissingDescription,
    MissingDate,
}

impl std::fmt::Display for EntryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryIssue::Unbalanced {
                total_debit,
                total_credit,
            } => write!(
                f,
                "entry is not balanced: debits {:.2} vs credits {:.2}",
                total_debit, total_credit
            ),
            EntryIssue::TooFewLines { count, minimum } => {
                write!(f, "entry needs at least {} lines, found {}", minimum, count)
            }
            EntryIssue::MissingAccount { line } => write!(f, "line {} has no account selected", line),
            EntryIssue::UnknownAccount { line, account_id } => {
                write!(f, "line {} references unknown account {}", line, account_id)
            }
            EntryIssue::InactiveAccount { line, account_id } => {
                write!(f, "line {} posts to inactive account {}", line, account_id)
            }
            EntryIssue::InvalidAmount { line } => {
                write!(f, "line {} has a negative or non-numeric amount", line)
            }
            EntryIssue::MissingName => write!(f, "entry name is required"),
            EntryIssue::MissingDescription => write!(f, "description is required"),
            EntryIssue::MissingDate => write!(f, "entry date is required"),
        }
    }
}

/// Human-readable messages for a list of issues
pub fn issue_messages(issues: &[EntryIssue]) -> Vec<String> {
    issues.iter().map(|i| i.to_string()).collect()
}

/// Sum of debits and credits over the lines
pub fn totals(items: &[JournalEntryItem]) -> (f64, f64) {
    items
        .iter()
        .fold((0.0, 0.0), |(d, c), item| (d + item.debit, c + item.credit))
}

/// True iff |sum(debit) - sum(credit)| < 0.001
pub fn is_balanced(items: &[JournalEntryItem]) -> bool {
    EntryRules::default().is_balanced(items)
}

/// Header and line checks with the default rules
pub fn validate_entry(entry: &JournalEntry, items: &[JournalEntryItem]) -> Vec<EntryIssue> {
    EntryRules::default().validate(entry, items)
}

/// Thresholds applied when validating entries
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRules {
    pub tolerance: f64,
    pub min_lines: usize,
    pub reject_inactive_accounts: bool,
}

impl Default for EntryRules {
    fn default() -> Self {
        Self {
            tolerance: BALANCE_TOLERANCE,
            min_lines: MIN_ENTRY_LINES,
            reject_inactive_accounts: true,
        }
    }
}

impl From<&LedgerConfig> for EntryRules {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            tolerance: config.balance_tolerance,
            min_lines: config.min_entry_lines,
            reject_inactive_accounts: config.reject_inactive_accounts,
        }
    }
}

impl EntryRules {
    pub fn is_balanced(&self, items: &[JournalEntryItem]) -> bool {
        let (debit, credit) = totals(items);
        (debit - credit).abs() < self.tolerance
    }

    /// Collect every header and line problem; empty means the entry may be submitted
    pub fn validate(&self, entry: &JournalEntry, items: &[JournalEntryItem]) -> Vec<EntryIssue> {
        let mut issues = Vec::new();

        if entry.entry_name.trim().is_empty() {
            issues.push(EntryIssue::MissingName);
        }
        if entry.description.trim().is_empty() {
            issues.push(EntryIssue::MissingDescription);
        }
        if entry.entry_date.is_none() {
            issues.push(EntryIssue::MissingDate);
        }

        if items.len() < self.min_lines {
            issues.push(EntryIssue::TooFewLines {
                count: items.len(),
                minimum: self.min_lines,
            });
        }

        for (i, item) in items.iter().enumerate() {
            if item.account_id.trim().is_empty() {
                issues.push(EntryIssue::MissingAccount { line: i + 1 });
            }
            let valid = |v: f64| v.is_finite() && v >= 0.0;
            if !valid(item.debit) || !valid(item.credit) {
                issues.push(EntryIssue::InvalidAmount { line: i + 1 });
            }
        }

        if !self.is_balanced(items) {
            let (total_debit, total_credit) = totals(items);
            issues.push(EntryIssue::Unbalanced {
                total_debit,
                total_credit,
            });
        }

        issues
    }

    /// Check line accounts against the chart: they must exist and, unless
    /// disabled, be active.
    pub fn validate_against_chart(&self, items: &[JournalEntryItem], accounts: &[Account]) -> Vec<EntryIssue> {
        let by_id: HashMap<&str, &Account> = accounts.iter().map(|a| (a.id.as_str(), a)).collect();
        let mut issues = Vec::new();

        for (i, item) in items.iter().enumerate() {
            if item.account_id.trim().is_empty() {
                continue;
            }
            match by_id.get(item.account_id.as_str()) {
                None => issues.push(EntryIssue::UnknownAccount {
                    line: i + 1,
                    account_id: item.account_id.clone(),
                }),
                Some(account) if self.reject_inactive_accounts && !account.is_active => {
                    issues.push(EntryIssue::InactiveAccount {
                        line: i + 1,
                        account_id: item.account_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        issues
    }
}

/// Journal entry being edited.
///
/// Every line mutation recomputes the header totals before returning, so the
/// balance check can never observe stale totals.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    entry: JournalEntry,
    rules: EntryRules,
}

impl EntryDraft {
    pub fn new(entry: JournalEntry) -> Self {
        Self::with_rules(entry, EntryRules::default())
    }

    pub fn with_rules(mut entry: JournalEntry, rules: EntryRules) -> Self {
        entry.recompute_totals();
        Self { entry, rules }
    }

    pub fn entry(&self) -> &JournalEntry {
        &self.entry
    }

    pub fn lines(&self) -> &[JournalEntryItem] {
        &self.entry.items
    }

    pub fn add_line(&mut self, item: JournalEntryItem) {
        self.entry.items.push(item);
        self.entry.recompute_totals();
    }

    /// Change a line's amounts; returns false if there is no such line
    pub fn set_line_amounts(&mut self, index: usize, debit: f64, credit: f64) -> bool {
        let Some(line) = self.entry.items.get_mut(index) else {
            return false;
        };
        line.debit = debit;
        line.credit = credit;
        self.entry.recompute_totals();
        true
    }

    /// Change a line's account; returns false if there is no such line
    pub fn set_line_account(&mut self, index: usize, account_id: impl Into<String>) -> bool {
        match self.entry.items.get_mut(index) {
            Some(line) => {
                line.account_id = account_id.into();
                true
            }
            None => false,
        }
    }

    pub fn remove_line(&mut self, index: usize) -> Option<JournalEntryItem> {
        if index >= self.entry.items.len() {
            return None;
        }
        let removed = self.entry.items.remove(index);
        self.entry.recompute_totals();
        Some(removed)
    }

    pub fn replace_lines(&mut self, items: Vec<JournalEntryItem>) {
        self.entry.items = items;
        self.entry.recompute_totals();
    }

    pub fn total_debit(&self) -> f64 {
        self.entry.total_debit
    }

    pub fn total_credit(&self) -> f64 {
        self.entry.total_credit
    }

    /// Debit minus credit
    pub fn difference(&self) -> f64 {
        self.entry.total_debit - self.entry.total_credit
    }

    pub fn is_balanced(&self) -> bool {
        self.rules.is_balanced(&self.entry.items)
    }

    pub fn validate(&self) -> Vec<EntryIssue> {
        self.rules.validate(&self.entry, &self.entry.items)
    }

    pub fn into_entry(self) -> JournalEntry {
        self.entry
    }
}
