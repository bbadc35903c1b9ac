use crate::schema::{ContributionEntry, EntryKind, LedgerEntry, PeriodKey, PeriodSelection};
use crate::timeline::BalanceTimeline;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals for one ICMS rate, in whole percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateBucket {
    pub rate_percent: u32,
    /// Document totals of credit (purchase) entries
    pub gross_purchases: f64,
    pub credit: f64,
    pub debit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub gross_total: f64,
    /// Share of the side's gross total, 0-100
    pub share_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashSummary {
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub net: f64,
    /// Net over inflow, as a percentage. Zero when there was no inflow.
    pub margin_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContributionPoint {
    pub period: PeriodKey,
    pub balance: f64,
}

/// PIS/COFINS totals over the selected months.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionSummary {
    pub total_credit: f64,
    pub total_debit: f64,
    /// Total credit minus total debit
    pub final_balance: f64,
    /// Recorded balance of each month's last row. Months with no rows are left out.
    pub month_end: Vec<ContributionPoint>,
}

fn rate_percent(rate: Option<f64>) -> u32 {
    (rate.unwrap_or(0.0) * 100.0).round().max(0.0) as u32
}

/// Credit and debit per tax rate for entries inside the selected months,
/// ascending by rate. Entries without a rate count under 0%.
pub fn rate_breakdown(entries: &[LedgerEntry], selection: &PeriodSelection) -> Vec<RateBucket> {
    let mut buckets: BTreeMap<u32, RateBucket> = BTreeMap::new();

    for entry in entries.iter().filter(|e| selection.contains_date(e.date)) {
        let rate = rate_percent(entry.tax_rate);
        let bucket = buckets.entry(rate).or_insert_with(|| RateBucket {
            rate_percent: rate,
            gross_purchases: 0.0,
            credit: 0.0,
            debit: 0.0,
        });

        match entry.kind {
            EntryKind::Credit => {
                bucket.gross_purchases += entry.gross_amount;
                bucket.credit += entry.tax_amount;
            }
            EntryKind::Debit => bucket.debit += entry.tax_amount,
        }
    }

    buckets.into_values().collect()
}

/// Gross totals per category for one side, ordered by category. Entries with
/// no category are left out.
pub fn category_totals(
    entries: &[LedgerEntry],
    kind: EntryKind,
    selection: &PeriodSelection,
) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();

    for entry in entries
        .iter()
        .filter(|e| e.kind == kind && selection.contains_date(e.date))
    {
        if let Some(category) = entry.category.as_deref() {
            *totals.entry(category).or_insert(0.0) += entry.gross_amount;
        }
    }

    let grand_total: f64 = totals.values().sum();

    totals
        .into_iter()
        .map(|(category, gross_total)| CategoryTotal {
            category: category.to_string(),
            gross_total,
            share_percent: if grand_total != 0.0 {
                gross_total / grand_total * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

impl CashSummary {
    pub fn for_months(timeline: &BalanceTimeline, selection: &PeriodSelection) -> Self {
        let rows = timeline.window(selection);
        let total_inflow: f64 = rows.iter().map(|r| r.inflow).sum();
        let total_outflow: f64 = rows.iter().map(|r| r.outflow).sum();
        let net = total_inflow - total_outflow;

        Self {
            total_inflow,
            total_outflow,
            net,
            margin_percent: if total_inflow != 0.0 {
                net / total_inflow * 100.0
            } else {
                0.0
            },
        }
    }
}

impl ContributionSummary {
    pub fn for_months(entries: &[ContributionEntry], selection: &PeriodSelection) -> Self {
        let mut last_by_month: BTreeMap<PeriodKey, f64> = BTreeMap::new();
        let mut total_credit = 0.0;
        let mut total_debit = 0.0;

        for entry in entries.iter().filter(|e| selection.contains(&e.period)) {
            total_credit += entry.credit;
            total_debit += entry.debit;
            last_by_month.insert(entry.period, entry.balance);
        }

        Self {
            total_credit,
            total_debit,
            final_balance: total_credit - total_debit,
            month_end: last_by_month
                .into_iter()
                .map(|(period, balance)| ContributionPoint { period, balance })
                .collect(),
        }
    }
}
