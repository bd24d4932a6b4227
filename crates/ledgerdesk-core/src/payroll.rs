//! Payroll slips with typed allowance and deduction lines

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Named allowance or deduction amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentLine {
    pub name: String,
    pub amount: f64,
}

impl AdjustmentLine {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Problem found on a payroll slip
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayrollIssue {
    MissingEmployee,
    InvalidSalary,
    /// `list` is "allowances" or "deductions", `index` is 1-based
    UnnamedAdjustment { list: &'static str, index: usize },
    InvalidAdjustment { list: &'static str, index: usize },
}

impl std::fmt::Display for PayrollIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayrollIssue::MissingEmployee => write!(f, "employee is required"),
            PayrollIssue::InvalidSalary => write!(f, "basic salary must be a non-negative number"),
            PayrollIssue::UnnamedAdjustment { list, index } => write!(f, "{} line {} has no name", list, index),
            PayrollIssue::InvalidAdjustment { list, index } => {
                write!(f, "{} line {} must be a non-negative number", list, index)
            }
        }
    }
}

/// Monthly payroll slip for one employee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollSlip {
    pub employee_id: String,
    /// First day of the paid month
    pub period: NaiveDate,
    pub basic_salary: f64,
    #[serde(default)]
    pub allowances: Vec<AdjustmentLine>,
    #[serde(default)]
    pub deductions: Vec<AdjustmentLine>,
}

impl PayrollSlip {
    pub fn new(employee_id: impl Into<String>, period: NaiveDate, basic_salary: f64) -> Self {
        Self {
            employee_id: employee_id.into(),
            period,
            basic_salary,
            allowances: Vec::new(),
            deductions: Vec::new(),
        }
    }

    pub fn with_allowance(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.allowances.push(AdjustmentLine::new(name, amount));
        self
    }

    pub fn with_deduction(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.deductions.push(AdjustmentLine::new(name, amount));
        self
    }

    pub fn total_allowances(&self) -> f64 {
        self.allowances.iter().map(|l| l.amount).sum()
    }

    pub fn total_deductions(&self) -> f64 {
        self.deductions.iter().map(|l| l.amount).sum()
    }

    /// Basic salary plus allowances
    pub fn gross_pay(&self) -> f64 {
        self.basic_salary + self.total_allowances()
    }

    /// Gross pay less deductions; may go negative when deductions exceed pay
    pub fn net_pay(&self) -> f64 {
        self.gross_pay() - self.total_deductions()
    }

    pub fn validate(&self) -> Vec<PayrollIssue> {
        let mut issues = Vec::new();
        let valid = |v: f64| v.is_finite() && v >= 0.0;

        if self.employee_id.trim().is_empty() {
            issues.push(PayrollIssue::MissingEmployee);
        }
        if !valid(self.basic_salary) {
            issues.push(PayrollIssue::InvalidSalary);
        }

        for (list, lines) in [("allowances", &self.allowances), ("deductions", &self.deductions)] {
            for (i, line) in lines.iter().enumerate() {
                if line.name.trim().is_empty() {
                    issues.push(PayrollIssue::UnnamedAdjustment { list, index: i + 1 });
                }
                if !valid(line.amount) {
                    issues.push(PayrollIssue::InvalidAdjustment { list, index: i + 1 });
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_net_pay() {
        let slip = PayrollSlip::new("emp-1", march(), 8000.0)
            .with_allowance("Housing", 2000.0)
            .with_allowance("Transport", 500.0)
            .with_deduction("Social insurance", 975.0);

        assert_eq!(slip.gross_pay(), 10500.0);
        assert_eq!(slip.total_deductions(), 975.0);
        assert_eq!(slip.net_pay(), 9525.0);
        assert!(slip.validate().is_empty());
    }

    #[test]
    fn test_no_adjustments() {
        let slip = PayrollSlip::new("emp-1", march(), 4000.0);
        assert_eq!(slip.net_pay(), 4000.0);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let slip = PayrollSlip::new(" ", march(), f64::NAN)
            .with_allowance("", 10.0)
            .with_deduction("Loan", -5.0);
        let issues = slip.validate();

        assert_eq!(
            issues,
            vec![
                PayrollIssue::MissingEmployee,
                PayrollIssue::InvalidSalary,
                PayrollIssue::UnnamedAdjustment {
                    list: "allowances",
                    index: 1
                },
                PayrollIssue::InvalidAdjustment {
                    list: "deductions",
                    index: 1
                },
            ]
        );
        assert_eq!(issues[3].to_string(), "deductions line 1 must be a non-negative number");
    }

    #[test]
    fn test_deserialize_adjustments() {
        let slip: PayrollSlip = serde_json::from_str(
            r#"{"employee_id":"e","period":"2024-03-01","basic_salary":100,"allowances":[{"name":"Bonus","amount":20}]}"#,
        )
        .unwrap();
        assert!(slip.deductions.is_empty());
        assert_eq!(slip.gross_pay(), 120.0);
    }
}
