//! Core data models for the bookkeeping core

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::{AccountType, BalanceType, EntryStatus, StatementSection};

/// Chart of accounts node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: String,
    /// Account number, unique per company (e.g., "1101")
    pub account_number: String,
    /// Display label
    pub account_name: String,
    pub account_type: AccountType,
    /// Side that increases the account
    pub balance_type: BalanceType,
    /// Parent account, `None` for roots
    #[serde(default)]
    pub parent_account_id: Option<String>,
    /// Depth in the tree (root = 1), maintained by the store
    #[serde(default = "default_level")]
    pub level: u32,
    /// Inactive accounts accept no new postings
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Cash or bank account; the cash flow statement reads only these
    #[serde(default)]
    pub is_cash: bool,
}

fn default_level() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

impl Account {
    /// Create an active root account with the type's natural balance side
    pub fn new(
        id: impl Into<String>,
        account_number: impl Into<String>,
        account_name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            id: id.into(),
            account_number: account_number.into(),
            account_name: account_name.into(),
            account_type,
            balance_type: account_type.natural_balance(),
            parent_account_id: None,
            level: 1,
            is_active: true,
            is_cash: false,
        }
    }

    /// Set the parent account
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_account_id = Some(parent_id.into());
        self
    }

    /// Mark the account inactive
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Flag as a cash or bank account
    pub fn cash(mut self) -> Self {
        self.is_cash = true;
        self
    }

    /// Only asset accounts hold cash
    pub fn is_cash_account(&self) -> bool {
        self.is_cash && self.account_type == AccountType::Asset
    }

    pub fn is_root(&self) -> bool {
        self.parent_account_id.is_none()
    }

    /// "1101 - Cash on hand"
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.account_number, self.account_name)
    }
}

/// One debit/credit line of a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JournalEntryItem {
    /// Referenced account; empty while the line is still being filled in
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub debit: f64,
    #[serde(default)]
    pub credit: f64,
    #[serde(default)]
    pub description: String,
}

impl JournalEntryItem {
    pub fn debit(account_id: impl Into<String>, amount: f64) -> Self {
        Self {
            account_id: account_id.into(),
            debit: amount,
            ..Default::default()
        }
    }

    pub fn credit(account_id: impl Into<String>, amount: f64) -> Self {
        Self {
            account_id: account_id.into(),
            credit: amount,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Signed movement of this line (debit positive)
    pub fn net(&self) -> f64 {
        self.debit - self.credit
    }
}

/// Journal entry header with its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub entry_name: String,
    #[serde(default)]
    pub description: String,
    pub entry_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_debit: f64,
    #[serde(default)]
    pub total_credit: f64,
    #[serde(default)]
    pub financial_statement_section: StatementSection,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub items: Vec<JournalEntryItem>,
}

impl JournalEntry {
    /// Create an empty draft
    pub fn draft(
        entry_name: impl Into<String>,
        description: impl Into<String>,
        entry_date: NaiveDate,
        section: StatementSection,
    ) -> Self {
        Self {
            id: String::new(),
            entry_name: entry_name.into(),
            description: description.into(),
            entry_date: Some(entry_date),
            total_debit: 0.0,
            total_credit: 0.0,
            financial_statement_section: section,
            status: EntryStatus::Draft,
            is_approved: false,
            items: Vec::new(),
        }
    }

    /// Replace the lines and recompute both totals
    pub fn with_items(mut self, items: Vec<JournalEntryItem>) -> Self {
        self.items = items;
        self.recompute_totals();
        self
    }

    /// Recompute `total_debit`/`total_credit` from the lines
    pub fn recompute_totals(&mut self) {
        self.total_debit = self.items.iter().map(|i| i.debit).sum();
        self.total_credit = self.items.iter().map(|i| i.credit).sum();
    }

    pub fn is_posted(&self) -> bool {
        self.status == EntryStatus::Posted
    }

    /// Posted or approved entries no longer accept line edits
    pub fn is_locked(&self) -> bool {
        self.is_posted() || self.is_approved
    }

    /// Check if any line posts to the given account
    pub fn involves_account(&self, account_id: &str) -> bool {
        self.items.iter().any(|i| i.account_id == account_id)
    }
}

/// Caller identity and tenant, passed explicitly to store operations
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestContext {
    pub company_id: String,
    pub user_id: Option<String>,
}

impl RequestContext {
    pub fn new(company_id: impl Into<String>) -> Self {
        Self {
            company_id: company_id.into(),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_new_uses_natural_side() {
        let account = Account::new("a1", "4100", "Sales", AccountType::Revenue);
        assert_eq!(account.balance_type, BalanceType::Credit);
        assert!(account.is_root());
        assert!(account.is_active);
        assert_eq!(account.level, 1);
        assert_eq!(account.display_name(), "4100 - Sales");
    }

    #[test]
    fn test_account_deserialize_defaults() {
        let account: Account = serde_json::from_str(
            r#"{"id":"a","account_number":"1","account_name":"Cash","account_type":"asset","balance_type":"debit"}"#,
        )
        .unwrap();
        assert!(account.is_active);
        assert_eq!(account.level, 1);
        assert!(account.parent_account_id.is_none());
        assert!(!account.is_cash);
    }

    #[test]
    fn test_cash_flag_needs_asset_type() {
        assert!(Account::new("c", "1101", "Cash", AccountType::Asset).cash().is_cash_account());
        assert!(!Account::new("r", "1201", "Receivables", AccountType::Asset).is_cash_account());
        assert!(!Account::new("l", "2101", "Overdraft", AccountType::Liability).cash().is_cash_account());
    }

    #[test]
    fn test_entry_recomputes_totals() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let entry = JournalEntry::draft("Sale", "Cash sale", date, StatementSection::Revenue).with_items(vec![
            JournalEntryItem::debit("cash", 150.0),
            JournalEntryItem::credit("sales", 100.0),
            JournalEntryItem::credit("vat", 50.0),
        ]);

        assert_eq!(entry.total_debit, 150.0);
        assert_eq!(entry.total_credit, 150.0);
        assert!(entry.involves_account("vat"));
        assert!(!entry.is_locked());
    }

    #[test]
    fn test_locked_when_posted_or_approved() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let mut entry = JournalEntry::draft("Rent", "March rent", date, StatementSection::OperatingExpense);
        entry.is_approved = true;
        assert!(entry.is_locked());

        entry.is_approved = false;
        entry.status = EntryStatus::Posted;
        assert!(entry.is_locked());
    }
}
