//! # ICMS Report
//!
//! The computational core of a monthly/quarterly fiscal report: ICMS credit
//! carryforward apportionment and a cash-balance timeline sampled at
//! decendial checkpoints.
//!
//! ## Core Concepts
//!
//! - **Apportionment**: per month, how much credit offsets the debit and how much
//!   remains due. Unused credit carries into the next month.
//! - **Full-history chain**: carryforward always runs from the earliest month
//!   available; display filtering happens afterwards.
//! - **Balance timeline**: the cash ledger sorted by date with its running
//!   balance, including everything before the display window.
//! - **Checkpoints**: start, mid-month (the 15th) and end points for a single
//!   month, or one end-of-month point per month for a multi-month view.
//!
//! Loading spreadsheets, drawing charts and exporting files belong to the host;
//! this crate works on rows the host already read.
//!
//! ## Example
//!
//! ```rust,ignore
//! use icms_report::*;
//!
//! let extract = SourceExtract {
//!     ledger_rows: vec![LedgerRow {
//!         date: "2025-01-10".to_string(),
//!         kind: EntryKind::Credit,
//!         tax_amount: "120.00".to_string(),
//!         gross_amount: "1000.00".to_string(),
//!         category: Some("SP".to_string()),
//!         tax_rate: Some("0.12".to_string()),
//!     }],
//!     cash_rows: vec![CashRow {
//!         date: "2025-01-10".to_string(),
//!         inflow: "1000.00".to_string(),
//!         outflow: String::new(),
//!     }],
//!     line_items: vec![],
//!     contribution_rows: vec![],
//! };
//!
//! let selection = PeriodSelection::parse("2025-Q1").unwrap();
//! let report = process_report(&extract, &selection).unwrap();
//! ```

pub mod aggregator;
pub mod breakdown;
pub mod cache;
pub mod carryforward;
pub mod checkpoints;
pub mod error;
pub mod ingestion;
pub mod lookup;
pub mod schema;
pub mod timeline;
pub mod utils;

pub use aggregator::{aggregate_monthly, aggregate_rows, AggregationOutcome};
pub use breakdown::{
    category_totals, rate_breakdown, CashSummary, CategoryTotal, ContributionPoint,
    ContributionSummary, RateBucket,
};
pub use cache::{ExtractFingerprint, ReportCache};
pub use carryforward::{compute_apportionment, run_carryforward, CarryforwardState};
pub use checkpoints::{select_checkpoints, CheckpointSelector, CheckpointSeries, CheckpointView};
pub use error::{ReportError, Result};
pub use ingestion::*;
pub use lookup::{normalize_key, LineItemIndex};
pub use schema::*;
pub use timeline::{reconstruct_timeline, BalanceTimeline, TimelinePoint};

use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub selection: PeriodSelection,
    /// Carryforward results for the selected months, cut from the full chain
    pub apportionment: Vec<ApportionmentResult>,
    pub checkpoints: Vec<Checkpoint>,
    pub cash_summary: CashSummary,
    /// Cash rows inside the selection with baseline-inclusive balances
    pub cash_window: Vec<TimelinePoint>,
    pub rate_breakdown: Vec<RateBucket>,
    pub purchases_by_category: Vec<CategoryTotal>,
    pub sales_by_category: Vec<CategoryTotal>,
    /// Ledger documents dated inside the selection, in input order
    pub ledger_window: Vec<LedgerEntry>,
    pub contributions: ContributionSummary,
    /// Income statement lines keyed by normalized description
    pub line_items: LineItemIndex,
    pub warnings: Vec<ReportWarning>,
}

pub struct ReportProcessor;

impl ReportProcessor {
    pub fn process(
        extract: &SourceExtract,
        selection: &PeriodSelection,
        config: &ReportConfig,
    ) -> Result<Report> {
        config.validate()?;
        if selection.is_empty() {
            return Err(ReportError::InvalidPeriod(
                "selection contains no months".to_string(),
            ));
        }

        info!("Building report for {}", selection);
        debug!(
            "Extract contains {} ledger rows, {} cash rows, {} contribution rows and {} line items",
            extract.ledger_rows.len(),
            extract.cash_rows.len(),
            extract.contribution_rows.len(),
            extract.line_items.len()
        );

        let mut warnings = Vec::new();

        let ledger = ingest_ledger_rows(&extract.ledger_rows, config);
        warnings.extend(ledger.warnings());

        let history = aggregate_monthly(&ledger.entries);
        let apportionment = compute_apportionment(&history, selection.months())?;
        if apportionment.is_empty() {
            warnings.push(ReportWarning::EmptySeries {
                series: SeriesKind::Apportionment,
                period: None,
            });
        }

        let cash = ingest_cash_rows(&extract.cash_rows, config);
        warnings.extend(cash.warnings());

        let contributions = ingest_contribution_rows(&extract.contribution_rows, config);
        warnings.extend(contributions.warnings());

        let timeline = reconstruct_timeline(&cash.entries);
        let series = CheckpointSelector::new(config.mid_month_day)?.select(&timeline, selection);
        warnings.extend(series.warnings);

        let report = Report {
            selection: selection.clone(),
            apportionment,
            checkpoints: series.checkpoints,
            cash_summary: CashSummary::for_months(&timeline, selection),
            cash_window: timeline.window(selection),
            rate_breakdown: rate_breakdown(&ledger.entries, selection),
            purchases_by_category: category_totals(&ledger.entries, EntryKind::Credit, selection),
            sales_by_category: category_totals(&ledger.entries, EntryKind::Debit, selection),
            ledger_window: ledger
                .entries
                .iter()
                .filter(|e| selection.contains_date(e.date))
                .cloned()
                .collect(),
            contributions: ContributionSummary::for_months(&contributions.entries, selection),
            line_items: LineItemIndex::from_rows(&extract.line_items),
            warnings,
        };

        info!(
            "Report for {}: {} apportionment periods, {} checkpoints, {} warnings",
            selection,
            report.apportionment.len(),
            report.checkpoints.len(),
            report.warnings.len()
        );

        Ok(report)
    }
}

pub fn process_report(extract: &SourceExtract, selection: &PeriodSelection) -> Result<Report> {
    ReportProcessor::process(extract, selection, &ReportConfig::default())
}

pub fn process_with_config(
    extract: &SourceExtract,
    selection: &PeriodSelection,
    config: &ReportConfig,
) -> Result<Report> {
    ReportProcessor::process(extract, selection, config)
}
