//! Error types for ledgerdesk-core
//!
//! Every failure carries a stable code, a severity and a category telling the
//! caller whether the user can fix it (validation), the backend refused it
//! (integrity) or it may succeed on a manual retry (transient).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accounts::AccountIssue;
use crate::journal::EntryIssue;
use crate::models::RequestContext;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingField,
    DuplicateAccountNumber,
    InvalidParent,
    InvalidEntry,
    AccountNotFound,
    EntryNotFound,
    HasChildren,
    HasPostings,
    EntryLocked,
    StoreUnavailable,
    IoError,
    SerializationError,
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::MissingField => write!(f, "MISSING_FIELD"),
            ErrorCode::DuplicateAccountNumber => write!(f, "DUPLICATE_ACCOUNT_NUMBER"),
            ErrorCode::InvalidParent => write!(f, "INVALID_PARENT"),
            ErrorCode::InvalidEntry => write!(f, "INVALID_ENTRY"),
            ErrorCode::AccountNotFound => write!(f, "ACCOUNT_NOT_FOUND"),
            ErrorCode::EntryNotFound => write!(f, "ENTRY_NOT_FOUND"),
            ErrorCode::HasChildren => write!(f, "HAS_CHILDREN"),
            ErrorCode::HasPostings => write!(f, "HAS_POSTINGS"),
            ErrorCode::EntryLocked => write!(f, "ENTRY_LOCKED"),
            ErrorCode::StoreUnavailable => write!(f, "STORE_UNAVAILABLE"),
            ErrorCode::IoError => write!(f, "IO_ERROR"),
            ErrorCode::SerializationError => write!(f, "SERIALIZATION_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Who can resolve the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Client-correctable, re-prompt the user
    Validation,
    /// Rejected by the store's integrity rules, shown verbatim
    Integrity,
    /// Backend unavailable, the caller may retry manually
    Transient,
    Internal,
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    /// Individual problems when several were collected (entry validation)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    pub fn new(code: ErrorCode, category: ErrorCategory, message: String) -> Self {
        Self {
            code,
            category,
            message,
            errors: vec![],
            suggestions: vec![],
        }
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        for error in &self.errors {
            write!(f, "\n  * {}", error)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Main error type for ledgerdesk-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Account number already in use: {account_number}")]
    DuplicateAccountNumber { account_number: String },

    #[error("Invalid parent for account {account_id}: {reason}")]
    InvalidParent { account_id: String, reason: String },

    #[error("Invalid journal entry: {}", join_issues(.issues))]
    InvalidEntry { issues: Vec<EntryIssue> },

    #[error("Account not found: {id}")]
    AccountNotFound { id: String },

    #[error("Journal entry not found: {id}")]
    EntryNotFound { id: String },

    #[error("Account {account_id} has {count} child account(s)")]
    HasChildren { account_id: String, count: usize },

    #[error("Account {account_id} is referenced by {count} journal line(s)")]
    HasPostings { account_id: String, count: usize },

    #[error("Journal entry {id} is posted or approved and can no longer be edited")]
    EntryLocked { id: String },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn join_issues(issues: &[EntryIssue]) -> String {
    issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; ")
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::MissingField { .. } => ErrorCode::MissingField,
            CoreError::DuplicateAccountNumber { .. } => ErrorCode::DuplicateAccountNumber,
            CoreError::InvalidParent { .. } => ErrorCode::InvalidParent,
            CoreError::InvalidEntry { .. } => ErrorCode::InvalidEntry,
            CoreError::AccountNotFound { .. } => ErrorCode::AccountNotFound,
            CoreError::EntryNotFound { .. } => ErrorCode::EntryNotFound,
            CoreError::HasChildren { .. } => ErrorCode::HasChildren,
            CoreError::HasPostings { .. } => ErrorCode::HasPostings,
            CoreError::EntryLocked { .. } => ErrorCode::EntryLocked,
            CoreError::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            CoreError::Io(_) => ErrorCode::IoError,
            CoreError::Serialization(_) => ErrorCode::SerializationError,
            CoreError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::MissingField { .. }
            | CoreError::DuplicateAccountNumber { .. }
            | CoreError::InvalidParent { .. }
            | CoreError::InvalidEntry { .. } => ErrorCategory::Validation,
            CoreError::AccountNotFound { .. }
            | CoreError::EntryNotFound { .. }
            | CoreError::HasChildren { .. }
            | CoreError::HasPostings { .. }
            | CoreError::EntryLocked { .. } => ErrorCategory::Integrity,
            CoreError::StoreUnavailable { .. } | CoreError::Io(_) => ErrorCategory::Transient,
            CoreError::Serialization(_) | CoreError::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Info,
            ErrorCategory::Integrity => ErrorSeverity::Warning,
            ErrorCategory::Transient => ErrorSeverity::Error,
            ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// Only transient failures are worth a manual retry
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.category(), self.to_string());

        match self {
            CoreError::DuplicateAccountNumber { account_number } => {
                details = details.with_suggestion(format!(
                    "Choose a number other than '{}' or edit the existing account.",
                    account_number
                ));
            }
            CoreError::InvalidParent { .. } => {
                details = details.with_suggestion(
                    "Pick a parent of the same account type that is not below this account.".to_string(),
                );
            }
            CoreError::InvalidEntry { issues } => {
                details = details.with_errors(issues.iter().map(|i| i.to_string()).collect());
                details = details.with_suggestion(
                    "Total debits must equal total credits before the entry can be saved.".to_string(),
                );
            }
            CoreError::HasChildren { .. } => {
                details = details.with_suggestion(
                    "Move or delete the child accounts first, or deactivate this account.".to_string(),
                );
            }
            CoreError::HasPostings { .. } => {
                details = details.with_suggestion(
                    "Accounts with postings cannot be deleted; deactivate the account instead.".to_string(),
                );
            }
            CoreError::EntryLocked { .. } => {
                details = details.with_suggestion(
                    "Record a reversing entry to correct a posted entry.".to_string(),
                );
            }
            CoreError::StoreUnavailable { .. } => {
                details = details.with_suggestion("Try again in a moment.".to_string());
            }
            _ => {}
        }

        details
    }
}

impl From<AccountIssue> for CoreError {
    fn from(issue: AccountIssue) -> Self {
        match issue {
            AccountIssue::MissingField { field } => CoreError::MissingField {
                field: field.to_string(),
            },
            AccountIssue::DuplicateAccountNumber { account_number } => {
                CoreError::DuplicateAccountNumber { account_number }
            }
        }
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub company_id: Option<String>,
    pub user_id: Option<String>,
    /// Operation being performed
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn with_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Context of an operation run on behalf of a caller
    pub fn for_request(operation: impl Into<String>, ctx: &RequestContext) -> Self {
        Self::new(operation)
            .with_company(ctx.company_id.clone())
            .with_user_id(ctx.user_id.clone())
    }
}

/// Error logger trait
pub trait ErrorLogger: Send + Sync {
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
    fn log_warning(&self, message: &str, context: &ErrorContext);
}

/// Default error logger using the log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        // Validation failures are routine user input, keep them out of the error stream
        let level = match error.category() {
            ErrorCategory::Validation => log::Level::Debug,
            ErrorCategory::Integrity => log::Level::Info,
            ErrorCategory::Transient => log::Level::Warn,
            ErrorCategory::Internal => log::Level::Error,
        };
        log::log!(
            target: "ledgerdesk::error",
            level,
            "[{}] {} - Operation: {} - Company: {:?} - User: {:?}",
            error.code(),
            error,
            context.operation,
            context.company_id,
            context.user_id
        );
    }

    fn log_warning(&self, message: &str, context: &ErrorContext) {
        log::warn!(
            target: "ledgerdesk::error",
            "WARNING: {} - Operation: {} - Company: {:?}",
            message,
            context.operation,
            context.company_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::DuplicateAccountNumber.to_string(), "DUPLICATE_ACCOUNT_NUMBER");
        assert_eq!(ErrorCode::HasPostings.to_string(), "HAS_POSTINGS");
    }

    #[test]
    fn test_categories() {
        let error = CoreError::DuplicateAccountNumber {
            account_number: "1101".to_string(),
        };
        assert_eq!(error.category(), ErrorCategory::Validation);
        assert_eq!(error.severity(), ErrorSeverity::Info);

        let error = CoreError::HasChildren {
            account_id: "a".to_string(),
            count: 2,
        };
        assert_eq!(error.category(), ErrorCategory::Integrity);
        assert!(!error.is_retryable());

        let error = CoreError::StoreUnavailable {
            message: "lock poisoned".to_string(),
        };
        assert_eq!(error.category(), ErrorCategory::Transient);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_invalid_entry_details_list_each_issue() {
        let error = CoreError::InvalidEntry {
            issues: vec![
                EntryIssue::TooFewLines { count: 1, minimum: 2 },
                EntryIssue::MissingName,
            ],
        };
        let details = error.to_details();

        assert_eq!(details.code, ErrorCode::InvalidEntry);
        assert_eq!(details.errors.len(), 2);
        assert!(error.to_string().contains("; "));
    }

    #[test]
    fn test_account_issue_conversion() {
        let error: CoreError = AccountIssue::DuplicateAccountNumber {
            account_number: "2100".to_string(),
        }
        .into();
        assert_eq!(error.code(), ErrorCode::DuplicateAccountNumber);

        let error: CoreError = AccountIssue::MissingField { field: "account_name" }.into();
        assert!(error.to_string().contains("account_name"));
    }

    #[test]
    fn test_error_context_for_request() {
        let ctx = RequestContext::new("acme").with_user("u-7");
        let context = ErrorContext::for_request("upsert_account", &ctx);

        assert_eq!(context.operation, "upsert_account");
        assert_eq!(context.company_id.as_deref(), Some("acme"));
        assert_eq!(context.user_id.as_deref(), Some("u-7"));

        let anonymous = ErrorContext::for_request("list_accounts", &RequestContext::new("acme"));
        assert!(anonymous.user_id.is_none());
    }
}
