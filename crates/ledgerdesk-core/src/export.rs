//! Report export
//!
//! Every report flattens into a [`ReportTable`] of display strings, which is
//! then encoded either as delimited text or as a paginated plain-text document.

use serde::Serialize;

use ledgerdesk_config::{ExportConfig, ReportsConfig};
use ledgerdesk_utils::format_amount;

use crate::error::{CoreError, CoreResult};
use crate::reports::{
    BalanceSheet, CashFlowStatement, GeneralLedger, IncomeStatement, Report, ReportSection, SummaryRow, TrialBalance,
};

const BOM: &str = "\u{feff}";
const PAGE_BREAK: &str = "\u{000c}";

/// How amounts are rendered in exported tables
#[derive(Debug, Clone, PartialEq)]
pub struct AmountFormat {
    pub decimals: usize,
    pub thousands_separator: String,
    /// Currency code printed in document headers
    pub currency: Option<String>,
}

impl Default for AmountFormat {
    fn default() -> Self {
        Self {
            decimals: 2,
            thousands_separator: ",".to_string(),
            currency: None,
        }
    }
}

impl From<&ReportsConfig> for AmountFormat {
    fn from(config: &ReportsConfig) -> Self {
        let currency = config.currency.trim();
        Self {
            decimals: config.decimal_places,
            thousands_separator: config.thousands_separator.clone(),
            currency: (!currency.is_empty()).then(|| currency.to_string()),
        }
    }
}

impl AmountFormat {
    pub fn amount(&self, value: f64) -> String {
        format_amount(value, self.decimals, &self.thousands_separator)
    }

    fn percent(&self, value: f64) -> String {
        format!("{:.1}%", value)
    }
}

/// Flat table ready for encoding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub title: String,
    /// Period line under the title
    pub subtitle: Option<String>,
    pub currency: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            currency: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Header of a report whose amounts use `format`
    fn for_report(title: &str, columns: &[&str], format: &AmountFormat) -> Self {
        let mut table = Self::new(title, columns);
        table.currency = format.currency.clone();
        table
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// Conversion of a report into a table
pub trait IntoReportTable {
    fn to_table(&self, format: &AmountFormat) -> ReportTable;
}

const STATEMENT_COLUMNS: [&str; 5] = ["Section", "Item", "Date", "Amount", "Share"];

fn period_line(period: Option<&crate::period::DateRange>) -> Option<String> {
    period.map(|p| p.to_string())
}

fn push_section(table: &mut ReportTable, section: &ReportSection, format: &AmountFormat) {
    for line in &section.lines {
        table.push_row(vec![
            section.title.clone(),
            line.label.clone(),
            line.date.map(|d| d.to_string()).unwrap_or_default(),
            format.amount(line.amount),
            format.percent(line.percentage),
        ]);
    }
    table.push_row(vec![
        section.title.clone(),
        format!("Total {}", section.title),
        String::new(),
        format.amount(section.total),
        String::new(),
    ]);
}

fn push_summary(table: &mut ReportTable, summary: &[SummaryRow], format: &AmountFormat) {
    for row in summary {
        table.push_row(vec![
            "Summary".to_string(),
            row.label.clone(),
            String::new(),
            format.amount(row.amount),
            String::new(),
        ]);
    }
}

fn statement_table(
    title: &str,
    period: Option<&crate::period::DateRange>,
    sections: &[&ReportSection],
    summary: &[SummaryRow],
    format: &AmountFormat,
) -> ReportTable {
    let mut table = ReportTable::for_report(title, &STATEMENT_COLUMNS, format);
    table.subtitle = period_line(period);
    for section in sections {
        push_section(&mut table, section, format);
    }
    push_summary(&mut table, summary, format);
    table
}

impl IntoReportTable for IncomeStatement {
    fn to_table(&self, format: &AmountFormat) -> ReportTable {
        statement_table(
            "Income Statement",
            self.period.as_ref(),
            &[
                &self.revenue,
                &self.cost_of_sales,
                &self.operating_expenses,
                &self.other_income,
                &self.financing_costs,
            ],
            &self.summary,
            format,
        )
    }
}

impl IntoReportTable for BalanceSheet {
    fn to_table(&self, format: &AmountFormat) -> ReportTable {
        statement_table(
            "Balance Sheet",
            self.period.as_ref(),
            &[
                &self.current_assets,
                &self.non_current_assets,
                &self.current_liabilities,
                &self.non_current_liabilities,
                &self.equity,
            ],
            &self.summary,
            format,
        )
    }
}

impl IntoReportTable for CashFlowStatement {
    fn to_table(&self, format: &AmountFormat) -> ReportTable {
        statement_table(
            "Cash Flow Statement",
            self.period.as_ref(),
            &[&self.operating, &self.investing, &self.financing],
            &self.summary,
            format,
        )
    }
}

impl IntoReportTable for GeneralLedger {
    fn to_table(&self, format: &AmountFormat) -> ReportTable {
        let mut table = ReportTable::for_report(
            "General Ledger",
            &["Account", "Date", "Entry", "Description", "Debit", "Credit", "Balance"],
            format,
        );
        table.subtitle = period_line(self.period.as_ref());

        for account in &self.accounts {
            let label = if account.account_number.is_empty() {
                account.account_id.clone()
            } else {
                format!("{} - {}", account.account_number, account.account_name)
            };
            for posting in &account.postings {
                table.push_row(vec![
                    label.clone(),
                    posting.date.map(|d| d.to_string()).unwrap_or_default(),
                    posting.entry_name.clone(),
                    posting.description.clone(),
                    format.amount(posting.debit),
                    format.amount(posting.credit),
                    format.amount(posting.running_balance),
                ]);
            }
            table.push_row(vec![
                label,
                String::new(),
                "Total".to_string(),
                String::new(),
                format.amount(account.total_debit),
                format.amount(account.total_credit),
                format.amount(account.total),
            ]);
        }
        table
    }
}

impl IntoReportTable for TrialBalance {
    fn to_table(&self, format: &AmountFormat) -> ReportTable {
        let mut table = ReportTable::for_report(
            "Trial Balance",
            &["Account Number", "Account Name", "Debit", "Credit", "Balance"],
            format,
        );
        table.subtitle = period_line(self.period.as_ref());

        for row in &self.rows {
            table.push_row(vec![
                row.account_number.clone(),
                row.account_name.clone(),
                format.amount(row.debit),
                format.amount(row.credit),
                format.amount(row.balance),
            ]);
        }
        table.push_row(vec![
            String::new(),
            "Total".to_string(),
            format.amount(self.total_debit),
            format.amount(self.total_credit),
            format.amount(self.total_debit - self.total_credit),
        ]);
        table
    }
}

impl IntoReportTable for Report {
    fn to_table(&self, format: &AmountFormat) -> ReportTable {
        match self {
            Report::IncomeStatement(r) => r.to_table(format),
            Report::BalanceSheet(r) => r.to_table(format),
            Report::CashFlow(r) => r.to_table(format),
            Report::GeneralLedger(r) => r.to_table(format),
            Report::TrialBalance(r) => r.to_table(format),
        }
    }
}

fn csv_error(e: impl std::fmt::Display) -> CoreError {
    CoreError::Internal {
        message: format!("CSV write error: {}", e),
    }
}

/// Encode as delimited text: header row then data rows, optionally BOM-prefixed
pub fn to_delimited(table: &ReportTable, config: &ExportConfig) -> CoreResult<String> {
    let delimiter = u8::try_from(config.delimiter).map_err(|_| CoreError::Internal {
        message: format!("delimiter {:?} is not a single byte", config.delimiter),
    })?;

    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    csv.write_record(&table.columns).map_err(csv_error)?;
    for row in &table.rows {
        csv.write_record(row).map_err(csv_error)?;
    }
    csv.flush().map_err(csv_error)?;

    let bytes = csv.into_inner().map_err(csv_error)?;
    let body = String::from_utf8(bytes).map_err(csv_error)?;

    Ok(if config.include_bom {
        format!("{}{}", BOM, body)
    } else {
        body
    })
}

/// Encode as a paginated fixed-width text document.
///
/// Each page repeats the title and column header; pages are separated by a
/// form feed. Right-to-left layout reverses the column order and right-aligns
/// every cell.
pub fn to_document(table: &ReportTable, rows_per_page: usize, right_to_left: bool) -> String {
    let arrange = |cells: &[String]| -> Vec<String> {
        let mut cells = cells.to_vec();
        if right_to_left {
            cells.reverse();
        }
        cells
    };

    let header = arrange(&table.columns);
    let rows: Vec<Vec<String>> = table.rows.iter().map(|r| arrange(r)).collect();

    let mut widths: Vec<usize> = header.iter().map(|c| c.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let render = |cells: &[String]| -> String {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                if right_to_left {
                    format!("{:>w$}", cell, w = w)
                } else {
                    format!("{:<w$}", cell, w = w)
                }
            })
            .collect();
        let line = padded.join(" | ");
        if right_to_left {
            line
        } else {
            line.trim_end().to_string()
        }
    };

    let per_page = if rows_per_page == 0 { rows.len().max(1) } else { rows_per_page };
    let empty: &[Vec<String>] = &[];
    let chunks: Vec<&[Vec<String>]> = if rows.is_empty() {
        vec![empty]
    } else {
        rows.chunks(per_page).collect()
    };
    let total_pages = chunks.len();
    let rule = "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1));

    let mut pages = Vec::with_capacity(total_pages);
    for (page, chunk) in chunks.into_iter().enumerate() {
        let mut out = String::new();
        out.push_str(&table.title);
        out.push('\n');
        if let Some(subtitle) = &table.subtitle {
            out.push_str(subtitle);
            out.push('\n');
        }
        if let Some(currency) = &table.currency {
            out.push_str(&format!("Amounts in {}\n", currency));
        }
        out.push_str(&format!("Page {} of {}\n\n", page + 1, total_pages));
        out.push_str(&render(&header));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        for row in chunk {
            out.push_str(&render(row));
            out.push('\n');
        }
        pages.push(out);
    }

    pages.join(&format!("{}\n", PAGE_BREAK))
}
