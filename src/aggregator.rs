use crate::ingestion::{ingest_ledger_rows, LedgerRow, RejectedRow};
use crate::schema::{EntryKind, LedgerEntry, MonthlyTaxAggregate, PeriodKey, ReportConfig, ReportWarning};
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    pub aggregates: Vec<MonthlyTaxAggregate>,
    pub rejected: Vec<RejectedRow>,
    pub warnings: Vec<ReportWarning>,
}

/// Groups entries into per-calendar-month credit and debit totals, ascending.
/// Months without entries are absent from the output.
pub fn aggregate_monthly(entries: &[LedgerEntry]) -> Vec<MonthlyTaxAggregate> {
    let mut months: BTreeMap<PeriodKey, MonthlyTaxAggregate> = BTreeMap::new();

    for entry in entries {
        let period = PeriodKey::from_date(entry.date);
        let aggregate = months
            .entry(period)
            .or_insert_with(|| MonthlyTaxAggregate::empty(period));

        match entry.kind {
            EntryKind::Credit => aggregate.credit += entry.tax_amount,
            EntryKind::Debit => aggregate.debit += entry.tax_amount,
        }
    }

    debug!(
        "Aggregated {} ledger entries into {} months",
        entries.len(),
        months.len()
    );

    months.into_values().collect()
}

pub fn aggregate_rows(rows: &[LedgerRow], config: &ReportConfig) -> AggregationOutcome {
    let ingested = ingest_ledger_rows(rows, config);
    let warnings = ingested.warnings();

    AggregationOutcome {
        aggregates: aggregate_monthly(&ingested.entries),
        rejected: ingested.rejected,
        warnings,
    }
}
