use crate::schema::{
    CashEntry, ContributionEntry, EntryKind, LedgerEntry, PeriodKey, ReportConfig, ReportWarning,
    RowSource,
};
use crate::utils::{parse_amount, parse_date, parse_optional_amount};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A fiscal document row as the spreadsheet loader hands it over: every cell
/// still a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerRow {
    #[schemars(description = "Document date or month, in any of the configured date formats")]
    pub date: String,

    #[schemars(description = "credit for inbound documents, debit for outbound documents")]
    pub kind: EntryKind,

    #[schemars(description = "ICMS value of the document. Blank or non-numeric counts as 0.")]
    pub tax_amount: String,

    #[serde(default)]
    #[schemars(description = "Document total value. Blank or non-numeric counts as 0.")]
    pub gross_amount: String,

    #[serde(default)]
    #[schemars(description = "State code of the issuer (credits) or recipient (debits)")]
    pub category: Option<String>,

    #[serde(default)]
    #[schemars(description = "ICMS rate as a fraction, e.g. 0.12")]
    pub tax_rate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashRow {
    pub date: String,
    #[serde(default)]
    pub inflow: String,
    #[serde(default)]
    pub outflow: String,
}

/// A PIS/COFINS row. `period` is any configured date format; only its month
/// is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContributionRow {
    pub period: String,
    #[serde(default)]
    pub credit: String,
    #[serde(default)]
    pub debit: String,
    #[serde(default)]
    pub balance: String,
}

/// A named result line (e.g. an income statement row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LineItemRow {
    pub description: String,
    #[serde(default)]
    pub value: String,
}

/// Everything the host loaded from its source files for one report run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceExtract {
    #[serde(default)]
    pub ledger_rows: Vec<LedgerRow>,
    #[serde(default)]
    pub cash_rows: Vec<CashRow>,
    #[serde(default)]
    pub line_items: Vec<LineItemRow>,
    #[serde(default)]
    pub contribution_rows: Vec<ContributionRow>,
}

impl SourceExtract {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SourceExtract)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub row: usize,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingested<T> {
    pub entries: Vec<T>,
    pub rejected: Vec<RejectedRow>,
    source: RowSource,
}

impl<T> Ingested<T> {
    pub fn warnings(&self) -> Vec<ReportWarning> {
        self.rejected
            .iter()
            .map(|r| ReportWarning::MalformedDate {
                source: self.source,
                row: r.row,
                value: r.value.clone(),
            })
            .collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn ingest_ledger_rows(rows: &[LedgerRow], config: &ReportConfig) -> Ingested<LedgerEntry> {
    let mut entries = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        match parse_date(&row.date, &config.date_formats) {
            Ok(date) => entries.push(LedgerEntry {
                date,
                kind: row.kind,
                tax_amount: parse_amount(&row.tax_amount),
                gross_amount: parse_amount(&row.gross_amount),
                category: non_blank(&row.category),
                tax_rate: parse_optional_amount(row.tax_rate.as_deref()),
            }),
            Err(e) => {
                warn!("Ledger row #{} excluded: {}", idx, e);
                rejected.push(RejectedRow {
                    row: idx,
                    value: row.date.clone(),
                });
            }
        }
    }

    Ingested {
        entries,
        rejected,
        source: RowSource::Ledger,
    }
}

pub fn ingest_cash_rows(rows: &[CashRow], config: &ReportConfig) -> Ingested<CashEntry> {
    let mut entries = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        match parse_date(&row.date, &config.date_formats) {
            Ok(date) => entries.push(CashEntry::new(
                date,
                parse_amount(&row.inflow),
                parse_amount(&row.outflow),
            )),
            Err(e) => {
                warn!("Cash row #{} excluded: {}", idx, e);
                rejected.push(RejectedRow {
                    row: idx,
                    value: row.date.clone(),
                });
            }
        }
    }

    Ingested {
        entries,
        rejected,
        source: RowSource::Cash,
    }
}

pub fn ingest_contribution_rows(
    rows: &[ContributionRow],
    config: &ReportConfig,
) -> Ingested<ContributionEntry> {
    let mut entries = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        match parse_date(&row.period, &config.date_formats) {
            Ok(date) => entries.push(ContributionEntry {
                period: PeriodKey::from_date(date),
                credit: parse_amount(&row.credit),
                debit: parse_amount(&row.debit),
                balance: parse_amount(&row.balance),
            }),
            Err(e) => {
                warn!("Contribution row #{} excluded: {}", idx, e);
                rejected.push(RejectedRow {
                    row: idx,
                    value: row.period.clone(),
                });
            }
        }
    }

    Ingested {
        entries,
        rejected,
        source: RowSource::Contributions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ledger_row(date: &str, kind: EntryKind, tax: &str) -> LedgerRow {
        LedgerRow {
            date: date.to_string(),
            kind,
            tax_amount: tax.to_string(),
            gross_amount: String::new(),
            category: Some("  ".to_string()),
            tax_rate: None,
        }
    }

    #[test]
    fn test_malformed_dates_are_excluded_not_fatal() {
        let rows = vec![
            ledger_row("2025-01-10", EntryKind::Credit, "100"),
            ledger_row("garbage", EntryKind::Debit, "50"),
            ledger_row("2025-01-20", EntryKind::Debit, "abc"),
        ];

        let ingested = ingest_ledger_rows(&rows, &ReportConfig::default());

        assert_eq!(ingested.entries.len(), 2);
        assert_eq!(ingested.entries[1].tax_amount, 0.0);
        assert_eq!(ingested.entries[0].category, None);
        assert_eq!(
            ingested.rejected,
            vec![RejectedRow {
                row: 1,
                value: "garbage".to_string()
            }]
        );
        assert_eq!(
            ingested.warnings(),
            vec![ReportWarning::MalformedDate {
                source: RowSource::Ledger,
                row: 1,
                value: "garbage".to_string()
            }]
        );
    }

    #[test]
    fn test_cash_rows_coerce_amounts() {
        let rows = vec![
            CashRow {
                date: "05/02/2025".to_string(),
                inflow: "250.5".to_string(),
                outflow: String::new(),
            },
            CashRow {
                date: String::new(),
                inflow: "10".to_string(),
                outflow: "0".to_string(),
            },
        ];

        let ingested = ingest_cash_rows(&rows, &ReportConfig::default());

        assert_eq!(
            ingested.entries,
            vec![CashEntry::new(
                NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(),
                250.5,
                0.0
            )]
        );
        assert_eq!(ingested.rejected.len(), 1);
        assert_eq!(ingested.warnings()[0].to_string(), "Cash row 1 excluded: malformed date ''");
    }

    #[test]
    fn test_contribution_rows_keep_month_only() {
        let rows = vec![
            ContributionRow {
                period: "2025-02".to_string(),
                credit: "1200".to_string(),
                debit: "800.5".to_string(),
                balance: "399.5".to_string(),
            },
            ContributionRow {
                period: "15/03/2025".to_string(),
                credit: String::new(),
                debit: "50".to_string(),
                balance: "349.5".to_string(),
            },
            ContributionRow {
                period: "Fevereiro".to_string(),
                credit: "1".to_string(),
                debit: "1".to_string(),
                balance: "0".to_string(),
            },
        ];

        let ingested = ingest_contribution_rows(&rows, &ReportConfig::default());

        assert_eq!(ingested.entries.len(), 2);
        assert_eq!(ingested.entries[0].period, PeriodKey::new(2025, 2).unwrap());
        assert_eq!(ingested.entries[0].debit, 800.5);
        assert_eq!(ingested.entries[1].period, PeriodKey::new(2025, 3).unwrap());
        assert_eq!(ingested.entries[1].credit, 0.0);
        assert_eq!(
            ingested.warnings(),
            vec![ReportWarning::MalformedDate {
                source: RowSource::Contributions,
                row: 2,
                value: "Fevereiro".to_string()
            }]
        );
    }
}
