//! Core bookkeeping logic: chart of accounts, journal entry validation and
//! financial statement aggregation

pub mod accounts;
pub mod error;
pub mod export;
pub mod journal;
pub mod models;
pub mod payroll;
pub mod period;
pub mod reports;
pub mod statements;
pub mod store;
pub mod types;

pub use accounts::{
    is_descendant_of, possible_parents, validate_account, AccountIssue, AccountTree, AccountTreeNode,
    ParentRejection,
};
pub use error::{
    CoreError, CoreResult, DefaultErrorLogger, ErrorCategory, ErrorCode, ErrorContext, ErrorDetails, ErrorLogger,
    ErrorSeverity,
};
pub use export::{to_delimited, to_document, AmountFormat, IntoReportTable, ReportTable};
pub use journal::{is_balanced, validate_entry, EntryDraft, EntryIssue, EntryRules, BALANCE_TOLERANCE};
pub use models::{Account, JournalEntry, JournalEntryItem, RequestContext};
pub use payroll::{AdjustmentLine, PayrollIssue, PayrollSlip};
pub use period::{DateRange, ReportPeriod};
pub use reports::{Report, ReportKind};
pub use statements::generate_report;
pub use store::{AccountFilter, LedgerStore, MemoryStore};
pub use types::{AccountType, BalanceType, EntryStatus, StatementSection};
