//! Basic enumerations shared by accounts, entries and reports

use serde::{Deserialize, Serialize};

/// Account type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Cash, receivables, inventory, fixed assets
    Asset,
    /// Payables, loans, accrued salaries
    Liability,
    /// Capital and retained earnings
    Equity,
    /// Sales and other income
    Revenue,
    /// Cost of sales and operating expenses
    Expense,
}

impl AccountType {
    /// Side that increases an account of this type
    pub fn natural_balance(&self) -> BalanceType {
        match self {
            AccountType::Asset | AccountType::Expense => BalanceType::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => BalanceType::Credit,
        }
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Asset
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asset" | "assets" => Ok(AccountType::Asset),
            "liability" | "liabilities" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "revenue" | "income" => Ok(AccountType::Revenue),
            "expense" | "expenses" => Ok(AccountType::Expense),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Asset => write!(f, "asset"),
            AccountType::Liability => write!(f, "liability"),
            AccountType::Equity => write!(f, "equity"),
            AccountType::Revenue => write!(f, "revenue"),
            AccountType::Expense => write!(f, "expense"),
        }
    }
}

/// Natural side of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceType {
    Debit,
    Credit,
}

impl std::fmt::Display for BalanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BalanceType::Debit => write!(f, "debit"),
            BalanceType::Credit => write!(f, "credit"),
        }
    }
}

/// Journal entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Draft,
    Posted,
}

impl Default for EntryStatus {
    fn default() -> Self {
        EntryStatus::Draft
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(EntryStatus::Draft),
            "posted" => Ok(EntryStatus::Posted),
            _ => Err(format!("Invalid entry status: {}", s)),
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Draft => write!(f, "draft"),
            EntryStatus::Posted => write!(f, "posted"),
        }
    }
}

/// Financial statement section a journal entry is classified under.
///
/// Stored as a plain tag; aliases used by older rows (`income`, `cogs`,
/// `fixed_asset`, `loan`, `capital`, ...) map onto the canonical variants and
/// unknown tags are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementSection {
    Revenue,
    CostOfSales,
    OperatingExpense,
    OtherIncome,
    FinancingCost,
    CurrentAsset,
    NonCurrentAsset,
    CurrentLiability,
    NonCurrentLiability,
    Equity,
    Operating,
    Investing,
    Financing,
    Other(String),
}

impl StatementSection {
    /// Canonical tag
    pub fn as_str(&self) -> &str {
        match self {
            StatementSection::Revenue => "revenue",
            StatementSection::CostOfSales => "cost_of_sales",
            StatementSection::OperatingExpense => "operating_expense",
            StatementSection::OtherIncome => "other_income",
            StatementSection::FinancingCost => "financing_cost",
            StatementSection::CurrentAsset => "current_asset",
            StatementSection::NonCurrentAsset => "non_current_asset",
            StatementSection::CurrentLiability => "current_liability",
            StatementSection::NonCurrentLiability => "non_current_liability",
            StatementSection::Equity => "equity",
            StatementSection::Operating => "operating",
            StatementSection::Investing => "investing",
            StatementSection::Financing => "financing",
            StatementSection::Other(tag) => tag.as_str(),
        }
    }

    /// Parse a stored tag. Never fails: unknown tags become `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().replace('-', "_").as_str() {
            "revenue" | "income" | "sales" => StatementSection::Revenue,
            "cost_of_sales" | "cogs" | "cost_of_goods_sold" => StatementSection::CostOfSales,
            "operating_expense" | "expense" | "expenses" => StatementSection::OperatingExpense,
            "other_income" => StatementSection::OtherIncome,
            "financing_cost" | "financing_costs" | "interest" => StatementSection::FinancingCost,
            "current_asset" | "current_assets" => StatementSection::CurrentAsset,
            "non_current_asset" | "non_current_assets" | "fixed_asset" | "fixed_assets" => {
                StatementSection::NonCurrentAsset
            }
            "current_liability" | "current_liabilities" => StatementSection::CurrentLiability,
            "non_current_liability" | "non_current_liabilities" | "long_term_liability" => {
                StatementSection::NonCurrentLiability
            }
            "equity" | "capital" => StatementSection::Equity,
            "operating" => StatementSection::Operating,
            "investing" => StatementSection::Investing,
            "financing" | "loan" | "loans" => StatementSection::Financing,
            _ => StatementSection::Other(tag.trim().to_string()),
        }
    }

    /// Account type whose lines carry this section's amount.
    ///
    /// Cash flow activity tags have none: the cash flow statement reads the
    /// lines on cash accounts instead.
    pub fn account_family(&self) -> Option<AccountType> {
        match self {
            StatementSection::Revenue | StatementSection::OtherIncome => Some(AccountType::Revenue),
            StatementSection::CostOfSales
            | StatementSection::OperatingExpense
            | StatementSection::FinancingCost => Some(AccountType::Expense),
            StatementSection::CurrentAsset | StatementSection::NonCurrentAsset => Some(AccountType::Asset),
            StatementSection::CurrentLiability | StatementSection::NonCurrentLiability => {
                Some(AccountType::Liability)
            }
            StatementSection::Equity => Some(AccountType::Equity),
            StatementSection::Operating
            | StatementSection::Investing
            | StatementSection::Financing
            | StatementSection::Other(_) => None,
        }
    }
}

impl Default for StatementSection {
    fn default() -> Self {
        StatementSection::Other(String::new())
    }
}

impl std::fmt::Display for StatementSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for StatementSection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatementSection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(StatementSection::from_tag(&tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_from_str() {
        assert_eq!("asset".parse::<AccountType>().unwrap(), AccountType::Asset);
        assert_eq!("Liabilities".parse::<AccountType>().unwrap(), AccountType::Liability);
        assert_eq!("income".parse::<AccountType>().unwrap(), AccountType::Revenue);
        assert!("bogus".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_natural_balance() {
        assert_eq!(AccountType::Asset.natural_balance(), BalanceType::Debit);
        assert_eq!(AccountType::Expense.natural_balance(), BalanceType::Debit);
        assert_eq!(AccountType::Revenue.natural_balance(), BalanceType::Credit);
        assert_eq!(AccountType::Equity.natural_balance(), BalanceType::Credit);
    }

    #[test]
    fn test_section_aliases() {
        assert_eq!(StatementSection::from_tag("income"), StatementSection::Revenue);
        assert_eq!(StatementSection::from_tag("COGS"), StatementSection::CostOfSales);
        assert_eq!(StatementSection::from_tag("fixed_asset"), StatementSection::NonCurrentAsset);
        assert_eq!(StatementSection::from_tag("capital"), StatementSection::Equity);
        assert_eq!(StatementSection::from_tag("loan"), StatementSection::Financing);
        assert_eq!(
            StatementSection::from_tag("memo"),
            StatementSection::Other("memo".to_string())
        );
    }

    #[test]
    fn test_section_serde_uses_tags() {
        let json = serde_json::to_string(&StatementSection::CostOfSales).unwrap();
        assert_eq!(json, "\"cost_of_sales\"");
        let parsed: StatementSection = serde_json::from_str("\"interest\"").unwrap();
        assert_eq!(parsed, StatementSection::FinancingCost);
    }
}
