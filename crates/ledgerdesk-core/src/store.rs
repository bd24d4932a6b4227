//! Ledger persistence boundary
//!
//! [`LedgerStore`] is the only async seam of the core. Every call carries an
//! explicit [`RequestContext`]; books are kept per company. [`MemoryStore`]
//! keeps everything in memory and can load/save a JSON snapshot. With
//! `persist_on_write`, a mutation only succeeds once its snapshot is on disk;
//! a failed write reverts the caller's book.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;

use ledgerdesk_config::Config;
use ledgerdesk_utils::generate_id;

use crate::accounts::{validate_account, AccountTree};
use crate::error::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::journal::EntryRules;
use crate::models::{Account, JournalEntry, JournalEntryItem, RequestContext};
use crate::period::DateRange;
use crate::types::{AccountType, EntryStatus};

/// Account listing filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountFilter {
    #[serde(default)]
    pub account_type: Option<AccountType>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub parent_account_id: Option<String>,
    /// Only accounts without a parent
    #[serde(default)]
    pub roots_only: bool,
}

impl AccountFilter {
    pub fn matches(&self, account: &Account) -> bool {
        if let Some(kind) = self.account_type {
            if account.account_type != kind {
                return false;
            }
        }
        if let Some(active) = self.is_active {
            if account.is_active != active {
                return false;
            }
        }
        if let Some(parent) = &self.parent_account_id {
            if account.parent_account_id.as_deref() != Some(parent.as_str()) {
                return false;
            }
        }
        !self.roots_only || account.parent_account_id.is_none()
    }
}

/// Storage operations used by the API
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn list_accounts(&self, ctx: &RequestContext, filter: &AccountFilter) -> CoreResult<Vec<Account>>;

    /// Insert (empty id) or update an account, enforcing number uniqueness and
    /// a valid parent. Returns the stored account with its level set.
    async fn upsert_account(&self, ctx: &RequestContext, account: Account) -> CoreResult<Account>;

    async fn delete_account(&self, ctx: &RequestContext, id: &str) -> CoreResult<()>;

    async fn list_journal_entries(
        &self,
        ctx: &RequestContext,
        range: Option<DateRange>,
        status: Option<EntryStatus>,
    ) -> CoreResult<Vec<JournalEntry>>;

    async fn get_journal_entry(&self, ctx: &RequestContext, id: &str) -> CoreResult<JournalEntry>;

    /// Save an entry header with its full set of lines. The lines replace any
    /// stored ones in a single step and the totals are recomputed from them.
    async fn upsert_journal_entry(
        &self,
        ctx: &RequestContext,
        entry: JournalEntry,
        items: Vec<JournalEntryItem>,
    ) -> CoreResult<JournalEntry>;

    async fn post_entry(&self, ctx: &RequestContext, id: &str) -> CoreResult<JournalEntry>;

    async fn approve_entry(&self, ctx: &RequestContext, id: &str) -> CoreResult<JournalEntry>;

    /// Drafts only
    async fn delete_journal_entry(&self, ctx: &RequestContext, id: &str) -> CoreResult<()>;
}

/// Accounts and entries of one company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyBook {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
}

impl CompanyBook {
    fn account_position(&self, id: &str) -> Option<usize> {
        self.accounts.iter().position(|a| a.id == id)
    }

    fn entry_position(&self, id: &str) -> CoreResult<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| CoreError::EntryNotFound { id: id.to_string() })
    }

    pub fn upsert_account(&mut self, mut account: Account) -> CoreResult<Account> {
        account.account_number = account.account_number.trim().to_string();
        account.account_name = account.account_name.trim().to_string();
        if account
            .parent_account_id
            .as_deref()
            .map_or(false, |p| p.trim().is_empty())
        {
            account.parent_account_id = None;
        }

        let editing = !account.id.is_empty() && self.account_position(&account.id).is_some();
        let editing_id = if editing { Some(account.id.as_str()) } else { None };
        if let Some(issue) = validate_account(&account, &self.accounts, editing_id).into_iter().next() {
            return Err(issue.into());
        }

        if account.id.is_empty() {
            account.id = generate_id("acc");
        }

        AccountTree::new(&self.accounts)
            .check_parent_assignment(&account, account.parent_account_id.as_deref())
            .map_err(|rejection| CoreError::InvalidParent {
                account_id: account.id.clone(),
                reason: rejection.to_string(),
            })?;

        if editing {
            let children = AccountTree::new(&self.accounts)
                .children(&account.id)
                .iter()
                .filter(|c| c.account_type != account.account_type)
                .count();
            if children > 0 {
                return Err(CoreError::InvalidParent {
                    account_id: account.id.clone(),
                    reason: format!("{} child account(s) have a different account type", children),
                });
            }
        }

        match self.account_position(&account.id) {
            Some(pos) => self.accounts[pos] = account.clone(),
            None => self.accounts.push(account.clone()),
        }
        self.refresh_levels(&account.id);

        let stored = self
            .account_position(&account.id)
            .map(|pos| self.accounts[pos].clone())
            .ok_or_else(|| CoreError::Internal {
                message: format!("account {} vanished after save", account.id),
            })?;
        Ok(stored)
    }

    /// Recompute `level` for an account and everything below it
    fn refresh_levels(&mut self, id: &str) {
        let updates: Vec<(usize, u32)> = {
            let tree = AccountTree::new(&self.accounts);
            let mut ids: Vec<&str> = vec![id];
            let descendants = tree.descendants(id);
            ids.extend(descendants.iter().map(|a| a.id.as_str()));
            ids.into_iter()
                .filter_map(|i| {
                    let pos = self.accounts.iter().position(|a| a.id == i)?;
                    Some((pos, tree.depth_of(i).unwrap_or(1)))
                })
                .collect()
        };
        for (pos, level) in updates {
            self.accounts[pos].level = level;
        }
    }

    pub fn delete_account(&mut self, id: &str) -> CoreResult<()> {
        let pos = self
            .account_position(id)
            .ok_or_else(|| CoreError::AccountNotFound { id: id.to_string() })?;

        let children = self
            .accounts
            .iter()
            .filter(|a| a.parent_account_id.as_deref() == Some(id))
            .count();
        if children > 0 {
            return Err(CoreError::HasChildren {
                account_id: id.to_string(),
                count: children,
            });
        }

        let postings = self
            .entries
            .iter()
            .flat_map(|e| e.items.iter())
            .filter(|i| i.account_id == id)
            .count();
        if postings > 0 {
            return Err(CoreError::HasPostings {
                account_id: id.to_string(),
                count: postings,
            });
        }

        self.accounts.remove(pos);
        Ok(())
    }

    pub fn list_entries(&self, range: Option<&DateRange>, status: Option<EntryStatus>) -> Vec<JournalEntry> {
        let mut entries: Vec<JournalEntry> = self
            .entries
            .iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .filter(|e| match (range, e.entry_date) {
                (None, _) => true,
                (Some(r), Some(d)) => r.contains(&d),
                (Some(_), None) => false,
            })
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.entry_date.cmp(&b.entry_date).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    pub fn upsert_entry(
        &mut self,
        mut entry: JournalEntry,
        items: Vec<JournalEntryItem>,
        rules: &EntryRules,
    ) -> CoreResult<JournalEntry> {
        let existing = if entry.id.is_empty() {
            None
        } else {
            self.entries.iter().position(|e| e.id == entry.id)
        };

        if let Some(pos) = existing {
            if self.entries[pos].is_locked() {
                return Err(CoreError::EntryLocked { id: entry.id });
            }
        }

        entry.items = items;
        entry.recompute_totals();

        let mut issues = rules.validate(&entry, &entry.items);
        issues.extend(rules.validate_against_chart(&entry.items, &self.accounts));
        if !issues.is_empty() {
            return Err(CoreError::InvalidEntry { issues });
        }

        // Status changes go through post/approve only
        entry.status = EntryStatus::Draft;
        entry.is_approved = false;

        match existing {
            Some(pos) => self.entries[pos] = entry.clone(),
            None => {
                if entry.id.is_empty() {
                    entry.id = generate_id("je");
                }
                self.entries.push(entry.clone());
            }
        }
        Ok(entry)
    }

    pub fn post_entry(&mut self, id: &str, rules: &EntryRules) -> CoreResult<JournalEntry> {
        let pos = self.entry_position(id)?;
        if self.entries[pos].is_posted() {
            return Ok(self.entries[pos].clone());
        }

        // The chart may have changed since the draft was saved
        let entry = &self.entries[pos];
        let mut issues = rules.validate(entry, &entry.items);
        issues.extend(rules.validate_against_chart(&entry.items, &self.accounts));
        if !issues.is_empty() {
            return Err(CoreError::InvalidEntry { issues });
        }

        self.entries[pos].status = EntryStatus::Posted;
        Ok(self.entries[pos].clone())
    }

    pub fn approve_entry(&mut self, id: &str) -> CoreResult<JournalEntry> {
        let pos = self.entry_position(id)?;
        self.entries[pos].is_approved = true;
        Ok(self.entries[pos].clone())
    }

    pub fn delete_entry(&mut self, id: &str) -> CoreResult<()> {
        let pos = self.entry_position(id)?;
        if self.entries[pos].is_locked() {
            return Err(CoreError::EntryLocked { id: id.to_string() });
        }
        self.entries.remove(pos);
        Ok(())
    }
}

/// On-disk snapshot of every company book
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub companies: BTreeMap<String, CompanyBook>,
}

/// In-memory store with optional JSON persistence
pub struct MemoryStore {
    books: RwLock<BTreeMap<String, CompanyBook>>,
    /// Held from a persisted mutation until its snapshot is written
    write_lock: Mutex<()>,
    rules: EntryRules,
    snapshot_path: Option<PathBuf>,
    persist_on_write: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            books: RwLock::new(BTreeMap::new()),
            write_lock: Mutex::new(()),
            rules: EntryRules::default(),
            snapshot_path: None,
            persist_on_write: false,
        }
    }

    pub fn with_rules(mut self, rules: EntryRules) -> Self {
        self.rules = rules;
        self
    }

    /// Store configured from the ledger and data sections
    pub fn from_config(config: &Config) -> Self {
        Self {
            books: RwLock::new(BTreeMap::new()),
            write_lock: Mutex::new(()),
            rules: EntryRules::from(&config.ledger),
            snapshot_path: Some(config.snapshot_path()),
            persist_on_write: config.data.persist_on_write,
        }
    }

    pub fn rules(&self) -> &EntryRules {
        &self.rules
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn read_books(&self) -> CoreResult<RwLockReadGuard<'_, BTreeMap<String, CompanyBook>>> {
        self.books.read().map_err(|_| CoreError::StoreUnavailable {
            message: "ledger lock poisoned".to_string(),
        })
    }

    fn write_books(&self) -> CoreResult<RwLockWriteGuard<'_, BTreeMap<String, CompanyBook>>> {
        self.books.write().map_err(|_| CoreError::StoreUnavailable {
            message: "ledger lock poisoned".to_string(),
        })
    }

    /// Run `f` against the caller's book under the write lock
    fn with_book<T>(&self, ctx: &RequestContext, f: impl FnOnce(&mut CompanyBook) -> CoreResult<T>) -> CoreResult<T> {
        let company = company_of(ctx)?;
        let mut books = self.write_books()?;
        f(books.entry(company.to_string()).or_default())
    }

    /// Apply `f` to the caller's book, then write the snapshot when persisting
    /// on write. If the write fails the book is put back and the error returned.
    async fn commit<T>(
        &self,
        ctx: &RequestContext,
        f: impl FnOnce(&mut CompanyBook) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let path = match (&self.snapshot_path, self.persist_on_write) {
            (Some(path), true) => path,
            _ => return self.with_book(ctx, f),
        };
        let company = company_of(ctx)?;

        let _write = self.write_lock.lock().await;
        let (result, previous, content) = {
            let mut books = self.write_books()?;
            let previous = books.get(company).cloned();
            let result = f(books.entry(company.to_string()).or_default())?;
            let content = serde_json::to_string_pretty(&Snapshot {
                companies: books.clone(),
            });
            (result, previous, content)
        };

        let written = match content {
            Ok(content) => write_snapshot(path, content).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = written {
            log::error!(
                target: "ledgerdesk::store",
                "snapshot write to {} failed, reverting change for {}: {}",
                path.display(),
                company,
                e
            );
            let mut books = self.write_books()?;
            match previous {
                Some(book) => {
                    books.insert(company.to_string(), book);
                }
                None => {
                    books.remove(company);
                }
            }
            return Err(e);
        }
        Ok(result)
    }

    fn read_book<T>(&self, ctx: &RequestContext, f: impl FnOnce(&CompanyBook) -> T) -> CoreResult<T> {
        let company = company_of(ctx)?;
        let books = self.read_books()?;
        match books.get(company) {
            Some(book) => Ok(f(book)),
            None => Ok(f(&CompanyBook::default())),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> CoreResult<Snapshot> {
        Ok(Snapshot {
            companies: self.read_books()?.clone(),
        })
    }

    /// Replace the state with a snapshot, reporting account cycles it contains
    pub fn restore(&self, snapshot: Snapshot) -> CoreResult<()> {
        for (company, book) in &snapshot.companies {
            let context = ErrorContext::new("restore").with_company(company.clone());
            for cycle in AccountTree::new(&book.accounts).find_cycles() {
                DefaultErrorLogger.log_warning(&format!("account parent cycle {}", cycle.join(" -> ")), &context);
            }
        }
        *self.write_books()? = snapshot.companies;
        Ok(())
    }

    /// Load a JSON snapshot. A missing file leaves the store empty.
    pub async fn load_snapshot(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            log::info!(
                target: "ledgerdesk::store",
                "no snapshot at {}, starting empty",
                path.display()
            );
            return Ok(());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        log::info!(
            target: "ledgerdesk::store",
            "loaded {} company book(s) from {}",
            snapshot.companies.len(),
            path.display()
        );
        self.restore(snapshot)
    }

    /// Write the current state as pretty JSON
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let _write = self.write_lock.lock().await;
        let content = serde_json::to_string_pretty(&self.snapshot()?)?;
        write_snapshot(path.as_ref(), content).await
    }
}

/// Write to a sibling `.tmp` file, then rename it over `path`
async fn write_snapshot(path: &Path, content: String) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    log::debug!(target: "ledgerdesk::store", "snapshot written to {}", path.display());
    Ok(())
}

fn company_of(ctx: &RequestContext) -> CoreResult<&str> {
    let company = ctx.company_id.trim();
    if company.is_empty() {
        return Err(CoreError::MissingField {
            field: "company_id".to_string(),
        });
    }
    Ok(company)
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn list_accounts(&self, ctx: &RequestContext, filter: &AccountFilter) -> CoreResult<Vec<Account>> {
        self.read_book(ctx, |book| {
            let mut accounts: Vec<Account> = book.accounts.iter().filter(|a| filter.matches(a)).cloned().collect();
            accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));
            accounts
        })
    }

    async fn upsert_account(&self, ctx: &RequestContext, account: Account) -> CoreResult<Account> {
        let saved = self.commit(ctx, |book| book.upsert_account(account)).await?;
        log::info!(
            target: "ledgerdesk::store",
            "account {} saved for {} by {:?}",
            saved.display_name(),
            ctx.company_id,
            ctx.user_id
        );
        Ok(saved)
    }

    async fn delete_account(&self, ctx: &RequestContext, id: &str) -> CoreResult<()> {
        self.commit(ctx, |book| book.delete_account(id)).await?;
        log::info!(target: "ledgerdesk::store", "account {} deleted for {}", id, ctx.company_id);
        Ok(())
    }

    async fn list_journal_entries(
        &self,
        ctx: &RequestContext,
        range: Option<DateRange>,
        status: Option<EntryStatus>,
    ) -> CoreResult<Vec<JournalEntry>> {
        self.read_book(ctx, |book| book.list_entries(range.as_ref(), status))
    }

    async fn get_journal_entry(&self, ctx: &RequestContext, id: &str) -> CoreResult<JournalEntry> {
        self.read_book(ctx, |book| book.entries.iter().find(|e| e.id == id).cloned())?
            .ok_or_else(|| CoreError::EntryNotFound { id: id.to_string() })
    }

    async fn upsert_journal_entry(
        &self,
        ctx: &RequestContext,
        entry: JournalEntry,
        items: Vec<JournalEntryItem>,
    ) -> CoreResult<JournalEntry> {
        let rules = &self.rules;
        let saved = self.commit(ctx, |book| book.upsert_entry(entry, items, rules)).await?;
        log::info!(
            target: "ledgerdesk::store",
            "journal entry {} saved for {} ({} lines, {:.2})",
            saved.id,
            ctx.company_id,
            saved.items.len(),
            saved.total_debit
        );
        Ok(saved)
    }

    async fn post_entry(&self, ctx: &RequestContext, id: &str) -> CoreResult<JournalEntry> {
        let rules = &self.rules;
        let posted = self.commit(ctx, |book| book.post_entry(id, rules)).await?;
        log::info!(target: "ledgerdesk::store", "journal entry {} posted for {}", id, ctx.company_id);
        Ok(posted)
    }

    async fn approve_entry(&self, ctx: &RequestContext, id: &str) -> CoreResult<JournalEntry> {
        let approved = self.commit(ctx, |book| book.approve_entry(id)).await?;
        log::info!(
            target: "ledgerdesk::store",
            "journal entry {} approved for {} by {:?}",
            id,
            ctx.company_id,
            ctx.user_id
        );
        Ok(approved)
    }

    async fn delete_journal_entry(&self, ctx: &RequestContext, id: &str) -> CoreResult<()> {
        self.commit(ctx, |book| book.delete_entry(id)).await?;
        log::info!(target: "ledgerdesk::store", "journal entry {} deleted for {}", id, ctx.company_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::journal::EntryIssue;
    use crate::types::StatementSection;
    use chrono::NaiveDate;

    fn ctx() -> RequestContext {
        RequestContext::new("acme").with_user("u1")
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn account(number: &str, name: &str, kind: AccountType) -> Account {
        Account::new("", number, name, kind)
    }

    async fn seeded() -> (MemoryStore, Account, Account) {
        let store = MemoryStore::new();
        let cash = store
            .upsert_account(&ctx(), account("1101", "Cash", AccountType::Asset))
            .await
            .unwrap();
        let sales = store
            .upsert_account(&ctx(), account("4101", "Sales", AccountType::Revenue))
            .await
            .unwrap();
        (store, cash, sales)
    }

    fn sale(cash: &Account, sales: &Account, amount: f64) -> Vec<JournalEntryItem> {
        vec![
            JournalEntryItem::debit(&cash.id, amount),
            JournalEntryItem::credit(&sales.id, amount),
        ]
    }

    fn header(day: u32) -> JournalEntry {
        JournalEntry::draft("Cash sale", "Counter sale", date(3, day), StatementSection::Revenue)
    }

    #[tokio::test]
    async fn test_upsert_account_assigns_id_and_level() {
        let store = MemoryStore::new();
        let parent = store
            .upsert_account(&ctx(), account("1000", "Current assets", AccountType::Asset))
            .await
            .unwrap();
        assert!(parent.id.starts_with("acc"));
        assert_eq!(parent.level, 1);

        let child = store
            .upsert_account(
                &ctx(),
                account("1100", "Cash", AccountType::Asset).with_parent(parent.id.clone()),
            )
            .await
            .unwrap();
        assert_eq!(child.level, 2);
    }

    #[tokio::test]
    async fn test_duplicate_account_number_rejected() {
        let (store, cash, _) = seeded().await;
        let err = store
            .upsert_account(&ctx(), account(" 1101 ", "Petty cash", AccountType::Asset))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateAccountNumber { .. }));
        assert_eq!(err.category(), ErrorCategory::Validation);

        let mut renamed = cash.clone();
        renamed.account_name = "Cash on hand".to_string();
        let saved = store.upsert_account(&ctx(), renamed).await.unwrap();
        assert_eq!(saved.account_name, "Cash on hand");
    }

    #[tokio::test]
    async fn test_missing_name_rejected() {
        let store = MemoryStore::new();
        let err = store
            .upsert_account(&ctx(), account("1101", "  ", AccountType::Asset))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_parent_cycle_rejected() {
        let store = MemoryStore::new();
        let a = store
            .upsert_account(&ctx(), account("1000", "A", AccountType::Asset))
            .await
            .unwrap();
        let b = store
            .upsert_account(&ctx(), account("1100", "B", AccountType::Asset).with_parent(a.id.clone()))
            .await
            .unwrap();
        let c = store
            .upsert_account(&ctx(), account("1110", "C", AccountType::Asset).with_parent(b.id.clone()))
            .await
            .unwrap();
        assert_eq!(c.level, 3);

        let err = store
            .upsert_account(&ctx(), a.clone().with_parent(c.id.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidParent { .. }));

        let err = store
            .upsert_account(&ctx(), account("4000", "Income", AccountType::Revenue).with_parent(a.id.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidParent { .. }));
    }

    #[tokio::test]
    async fn test_moving_subtree_updates_levels() {
        let store = MemoryStore::new();
        let root = store
            .upsert_account(&ctx(), account("1000", "Assets", AccountType::Asset))
            .await
            .unwrap();
        let other = store
            .upsert_account(&ctx(), account("1500", "Fixed", AccountType::Asset))
            .await
            .unwrap();
        let mid = store
            .upsert_account(&ctx(), account("1510", "Vehicles", AccountType::Asset).with_parent(other.id.clone()))
            .await
            .unwrap();
        let leaf = store
            .upsert_account(&ctx(), account("1511", "Trucks", AccountType::Asset).with_parent(mid.id.clone()))
            .await
            .unwrap();
        assert_eq!(leaf.level, 3);

        // re-root "Fixed" under "Assets": the whole subtree moves down one level
        store
            .upsert_account(&ctx(), other.clone().with_parent(root.id.clone()))
            .await
            .unwrap();
        let accounts = store.list_accounts(&ctx(), &AccountFilter::default()).await.unwrap();
        let level = |id: &str| accounts.iter().find(|a| a.id == id).unwrap().level;
        assert_eq!(level(&other.id), 2);
        assert_eq!(level(&mid.id), 3);
        assert_eq!(level(&leaf.id), 4);
    }

    #[tokio::test]
    async fn test_list_accounts_filter() {
        let (store, cash, _) = seeded().await;
        store
            .upsert_account(&ctx(), account("1102", "Old till", AccountType::Asset).inactive())
            .await
            .unwrap();

        let filter = AccountFilter {
            account_type: Some(AccountType::Asset),
            is_active: Some(true),
            ..Default::default()
        };
        let assets = store.list_accounts(&ctx(), &filter).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].id, cash.id);

        let other_company = RequestContext::new("globex");
        assert!(store
            .list_accounts(&other_company, &AccountFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_missing_company_rejected() {
        let store = MemoryStore::new();
        let err = store
            .list_accounts(&RequestContext::default(), &AccountFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_delete_account_integrity() {
        let (store, cash, sales) = seeded().await;
        let child = store
            .upsert_account(&ctx(), account("1101-1", "Till", AccountType::Asset).with_parent(cash.id.clone()))
            .await
            .unwrap();

        let err = store.delete_account(&ctx(), &cash.id).await.unwrap_err();
        assert!(matches!(err, CoreError::HasChildren { count: 1, .. }));

        store
            .upsert_journal_entry(&ctx(), header(1), sale(&child, &sales, 50.0))
            .await
            .unwrap();
        let err = store.delete_account(&ctx(), &sales.id).await.unwrap_err();
        assert!(matches!(err, CoreError::HasPostings { count: 1, .. }));
        assert_eq!(err.category(), ErrorCategory::Integrity);

        let err = store.delete_account(&ctx(), "missing").await.unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound { .. }));

        let spare = store
            .upsert_account(&ctx(), account("5999", "Spare", AccountType::Expense))
            .await
            .unwrap();
        store.delete_account(&ctx(), &spare.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_entry_recomputes_totals() {
        let (store, cash, sales) = seeded().await;
        let mut entry = header(3);
        entry.total_debit = 1.0;
        let saved = store
            .upsert_journal_entry(&ctx(), entry, sale(&cash, &sales, 250.0))
            .await
            .unwrap();
        assert!(saved.id.starts_with("je"));
        assert_eq!(saved.total_debit, 250.0);
        assert_eq!(saved.total_credit, 250.0);
        assert_eq!(saved.status, EntryStatus::Draft);
    }

    #[tokio::test]
    async fn test_upsert_entry_rejects_unbalanced() {
        let (store, cash, sales) = seeded().await;
        let items = vec![
            JournalEntryItem::debit(&cash.id, 100.0),
            JournalEntryItem::credit(&sales.id, 99.5),
        ];
        let err = store.upsert_journal_entry(&ctx(), header(3), items).await.unwrap_err();
        match err {
            CoreError::InvalidEntry { issues } => {
                assert!(issues.iter().any(|i| matches!(i, EntryIssue::Unbalanced { .. })))
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(store
            .list_journal_entries(&ctx(), None, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_upsert_entry_rejects_unknown_and_missing_accounts() {
        let (store, cash, _) = seeded().await;
        let items = vec![
            JournalEntryItem::debit(&cash.id, 10.0),
            JournalEntryItem::credit("", 5.0),
            JournalEntryItem::credit("ghost", 5.0),
        ];
        let Err(CoreError::InvalidEntry { issues }) = store.upsert_journal_entry(&ctx(), header(3), items).await
        else {
            panic!("expected invalid entry");
        };
        assert!(issues.contains(&EntryIssue::MissingAccount { line: 2 }));
        assert!(issues.iter().any(|i| matches!(i, EntryIssue::UnknownAccount { line: 3, .. })));
    }

    #[tokio::test]
    async fn test_entry_lines_replaced_on_update() {
        let (store, cash, sales) = seeded().await;
        let saved = store
            .upsert_journal_entry(&ctx(), header(3), sale(&cash, &sales, 100.0))
            .await
            .unwrap();
        let updated = store
            .upsert_journal_entry(&ctx(), saved.clone(), sale(&cash, &sales, 40.0))
            .await
            .unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.total_debit, 40.0);
        assert_eq!(store.list_journal_entries(&ctx(), None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_posted_entry_is_locked() {
        let (store, cash, sales) = seeded().await;
        let saved = store
            .upsert_journal_entry(&ctx(), header(3), sale(&cash, &sales, 100.0))
            .await
            .unwrap();
        let posted = store.post_entry(&ctx(), &saved.id).await.unwrap();
        assert!(posted.is_posted());

        let err = store
            .upsert_journal_entry(&ctx(), posted.clone(), sale(&cash, &sales, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EntryLocked { .. }));
        let err = store.delete_journal_entry(&ctx(), &saved.id).await.unwrap_err();
        assert!(matches!(err, CoreError::EntryLocked { .. }));
    }

    #[tokio::test]
    async fn test_approved_draft_is_locked_and_drafts_delete() {
        let (store, cash, sales) = seeded().await;
        let first = store
            .upsert_journal_entry(&ctx(), header(3), sale(&cash, &sales, 100.0))
            .await
            .unwrap();
        let second = store
            .upsert_journal_entry(&ctx(), header(4), sale(&cash, &sales, 20.0))
            .await
            .unwrap();

        assert!(store.approve_entry(&ctx(), &first.id).await.unwrap().is_approved);
        assert!(matches!(
            store.delete_journal_entry(&ctx(), &first.id).await,
            Err(CoreError::EntryLocked { .. })
        ));

        store.delete_journal_entry(&ctx(), &second.id).await.unwrap();
        assert!(matches!(
            store.get_journal_entry(&ctx(), &second.id).await,
            Err(CoreError::EntryNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_post_rejects_deactivated_account() {
        let (store, cash, sales) = seeded().await;
        let saved = store
            .upsert_journal_entry(&ctx(), header(3), sale(&cash, &sales, 100.0))
            .await
            .unwrap();
        store.upsert_account(&ctx(), sales.clone().inactive()).await.unwrap();

        let err = store.post_entry(&ctx(), &saved.id).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidEntry { .. }));
    }

    #[tokio::test]
    async fn test_list_entries_by_range_and_status() {
        let (store, cash, sales) = seeded().await;
        let march = store
            .upsert_journal_entry(&ctx(), header(3), sale(&cash, &sales, 100.0))
            .await
            .unwrap();
        let mut april = header(1);
        april.entry_date = Some(date(4, 2));
        store
            .upsert_journal_entry(&ctx(), april, sale(&cash, &sales, 5.0))
            .await
            .unwrap();
        store.post_entry(&ctx(), &march.id).await.unwrap();

        let range = DateRange::new(date(3, 1), date(3, 31));
        let in_march = store.list_journal_entries(&ctx(), Some(range), None).await.unwrap();
        assert_eq!(in_march.len(), 1);
        assert_eq!(in_march[0].id, march.id);

        let drafts = store
            .list_journal_entries(&ctx(), None, Some(EntryStatus::Draft))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].entry_date, Some(date(4, 2)));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let (store, cash, sales) = seeded().await;
        store
            .upsert_journal_entry(&ctx(), header(3), sale(&cash, &sales, 100.0))
            .await
            .unwrap();

        let path = std::env::temp_dir().join(format!("{}.json", generate_id("ledgerdesk-test")));
        store.save_snapshot(&path).await.unwrap();

        let restored = MemoryStore::new();
        restored.load_snapshot(&path).await.unwrap();
        assert_eq!(restored.snapshot().unwrap(), store.snapshot().unwrap());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_missing_snapshot_starts_empty() {
        let store = MemoryStore::new();
        let path = std::env::temp_dir().join(format!("{}.json", generate_id("ledgerdesk-absent")));
        store.load_snapshot(&path).await.unwrap();
        assert!(store.snapshot().unwrap().companies.is_empty());
    }

    fn persisting(dir: PathBuf) -> MemoryStore {
        let mut config = Config::default();
        config.data.path = dir;
        config.data.persist_on_write = true;
        MemoryStore::from_config(&config)
    }

    #[tokio::test]
    async fn test_persist_on_write_saves_each_change() {
        let dir = std::env::temp_dir().join(generate_id("ledgerdesk-persist"));
        let store = persisting(dir.clone());
        let cash = store
            .upsert_account(&ctx(), account("1101", "Cash", AccountType::Asset))
            .await
            .unwrap();

        let reloaded = MemoryStore::new();
        reloaded.load_snapshot(dir.join("ledger.json")).await.unwrap();
        let accounts = reloaded.list_accounts(&ctx(), &AccountFilter::default()).await.unwrap();
        assert_eq!(accounts, vec![cash]);
        assert!(!dir.join("ledger.json.tmp").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_reverts_change() {
        // a regular file where the data directory should be
        let blocker = std::env::temp_dir().join(generate_id("ledgerdesk-blocker"));
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = persisting(blocker.clone());

        let err = store
            .upsert_account(&ctx(), account("1101", "Cash", AccountType::Asset))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
        assert!(store.list_accounts(&ctx(), &AccountFilter::default()).await.unwrap().is_empty());

        // retrying fails the same way instead of hitting its own half-applied write
        let err = store
            .upsert_account(&ctx(), account("1101", "Cash", AccountType::Asset))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));

        let mut book = CompanyBook::default();
        book.accounts = vec![
            Account::new("cash", "1101", "Cash", AccountType::Asset),
            Account::new("sales", "4101", "Sales", AccountType::Revenue),
        ];
        let mut snapshot = Snapshot::default();
        snapshot.companies.insert("acme".to_string(), book.clone());
        store.restore(snapshot).unwrap();

        let err = store
            .upsert_journal_entry(&ctx(), header(3), sale(&book.accounts[0], &book.accounts[1], 100.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
        assert!(store.list_journal_entries(&ctx(), None, None).await.unwrap().is_empty());
        assert_eq!(store.snapshot().unwrap().companies["acme"], book);
        let _ = std::fs::remove_file(&blocker);
    }

    #[tokio::test]
    async fn test_concurrent_writes_all_reach_snapshot() {
        let dir = std::env::temp_dir().join(generate_id("ledgerdesk-concurrent"));
        let store = persisting(dir.clone());
        let ctx = ctx();

        let (a, b, c, d) = tokio::join!(
            store.upsert_account(&ctx, account("1101", "Cash", AccountType::Asset)),
            store.upsert_account(&ctx, account("1102", "Bank", AccountType::Asset)),
            store.upsert_account(&ctx, account("2101", "Payables", AccountType::Liability)),
            store.upsert_account(&ctx, account("4101", "Sales", AccountType::Revenue)),
        );
        for result in [a, b, c, d] {
            result.unwrap();
        }

        let reloaded = MemoryStore::new();
        reloaded.load_snapshot(dir.join("ledger.json")).await.unwrap();
        assert_eq!(reloaded.snapshot().unwrap(), store.snapshot().unwrap());
        assert_eq!(reloaded.list_accounts(&ctx, &AccountFilter::default()).await.unwrap().len(), 4);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_restore_keeps_cyclic_chart() {
        let mut book = CompanyBook::default();
        book.accounts = vec![
            Account::new("a", "1", "A", AccountType::Asset).with_parent("c"),
            Account::new("b", "2", "B", AccountType::Asset).with_parent("a"),
            Account::new("c", "3", "C", AccountType::Asset).with_parent("b"),
        ];
        let mut snapshot = Snapshot::default();
        snapshot.companies.insert("acme".to_string(), book);

        let store = MemoryStore::new();
        store.restore(snapshot).unwrap();

        // assignments into the loop are refused rather than repaired
        let mut books = store.books.write().unwrap();
        let book = books.get_mut("acme").unwrap();
        let err = book
            .upsert_account(Account::new("x", "9", "X", AccountType::Asset).with_parent("a"))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidParent { .. }));
    }
}
