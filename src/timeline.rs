use crate::schema::{CashEntry, PeriodKey, PeriodSelection};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub inflow: f64,
    pub outflow: f64,
    /// Cumulative balance after this entry, counting every earlier entry
    pub balance: f64,
}

impl TimelinePoint {
    pub fn net(&self) -> f64 {
        self.inflow - self.outflow
    }
}

/// A cash ledger sorted by date with its running balance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceTimeline {
    points: Vec<TimelinePoint>,
}

/// Sorts the ledger by date (stable, so same-day entries keep their order)
/// and accumulates the running balance.
pub fn reconstruct_timeline(entries: &[CashEntry]) -> BalanceTimeline {
    let mut sorted: Vec<&CashEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.date);

    let points: Vec<TimelinePoint> = sorted
        .into_iter()
        .scan(0.0, |balance, entry| {
            *balance += entry.net();
            Some(TimelinePoint {
                date: entry.date,
                inflow: entry.inflow,
                outflow: entry.outflow,
                balance: *balance,
            })
        })
        .collect();

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        debug!(
            "Reconstructed cash timeline: {} entries from {} to {}",
            points.len(),
            first.date,
            last.date
        );
    }

    BalanceTimeline { points }
}

impl BalanceTimeline {
    pub fn points(&self) -> &[TimelinePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Sum of net amounts of every entry dated on or before `date`.
    pub fn balance_as_of(&self, date: NaiveDate) -> f64 {
        let idx = self.points.partition_point(|p| p.date <= date);
        self.balance_before_index(idx)
    }

    /// Sum of net amounts of every entry dated strictly before `window_start`.
    pub fn baseline(&self, window_start: NaiveDate) -> f64 {
        let idx = self.points.partition_point(|p| p.date < window_start);
        self.balance_before_index(idx)
    }

    /// The last entry dated strictly before `date`.
    pub fn last_before(&self, date: NaiveDate) -> Option<&TimelinePoint> {
        let idx = self.points.partition_point(|p| p.date < date);
        idx.checked_sub(1).map(|i| &self.points[i])
    }

    /// Entries dated between `start` and `end`, both inclusive.
    pub fn entries_between(&self, start: NaiveDate, end: NaiveDate) -> &[TimelinePoint] {
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);
        if hi <= lo {
            return &[];
        }
        &self.points[lo..hi]
    }

    pub fn entries_in_month(&self, month: PeriodKey) -> &[TimelinePoint] {
        self.entries_between(month.first_day(), month.last_day())
    }

    /// Entries inside the selected months. Balances keep the history before
    /// the window, so the first row starts from the true position.
    pub fn window(&self, selection: &PeriodSelection) -> Vec<TimelinePoint> {
        selection
            .months()
            .iter()
            .flat_map(|month| self.entries_in_month(*month).iter().cloned())
            .collect()
    }

    fn balance_before_index(&self, idx: usize) -> f64 {
        idx.checked_sub(1)
            .map(|i| self.points[i].balance)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn ledger() -> Vec<CashEntry> {
        vec![
            CashEntry::new(date(2, 10), 0.0, 40.0),
            CashEntry::new(date(1, 5), 100.0, 0.0),
            CashEntry::new(date(2, 10), 15.0, 0.0),
            CashEntry::new(date(1, 20), 0.0, 30.0),
            CashEntry::new(date(3, 1), 200.0, 50.0),
        ]
    }

    #[test]
    fn test_sorted_with_running_balance() {
        let timeline = reconstruct_timeline(&ledger());
        let balances: Vec<f64> = timeline.points().iter().map(|p| p.balance).collect();
        assert_eq!(balances, vec![100.0, 70.0, 30.0, 45.0, 195.0]);
    }

    #[test]
    fn test_same_day_entries_keep_input_order() {
        let timeline = reconstruct_timeline(&ledger());
        let feb = timeline.entries_in_month(PeriodKey::new(2025, 2).unwrap());
        assert_eq!(feb.len(), 2);
        assert_eq!(feb[0].outflow, 40.0);
        assert_eq!(feb[1].inflow, 15.0);
    }

    #[test]
    fn test_balance_as_of_includes_the_query_date() {
        let timeline = reconstruct_timeline(&ledger());

        assert_eq!(timeline.balance_as_of(date(1, 4)), 0.0);
        assert_eq!(timeline.balance_as_of(date(1, 5)), 100.0);
        assert_eq!(timeline.balance_as_of(date(2, 10)), 45.0);
        assert_eq!(timeline.balance_as_of(date(2, 28)), 45.0);
        assert_eq!(timeline.balance_as_of(date(12, 31)), 195.0);
    }

    #[test]
    fn test_baseline_excludes_window_start() {
        let timeline = reconstruct_timeline(&ledger());

        assert_eq!(timeline.baseline(date(1, 5)), 0.0);
        assert_eq!(timeline.baseline(date(2, 1)), 70.0);
        assert_eq!(timeline.baseline(date(2, 10)), 70.0);
        assert_eq!(timeline.baseline(date(3, 1)), 45.0);
    }

    #[test]
    fn test_net_zero_ledger_returns_to_baseline() {
        let entries = vec![
            CashEntry::new(date(1, 3), 250.0, 0.0),
            CashEntry::new(date(1, 9), 0.0, 100.0),
            CashEntry::new(date(1, 12), 50.0, 200.0),
        ];
        let timeline = reconstruct_timeline(&entries);

        let last = timeline.last_date().unwrap();
        let start = timeline.first_date().unwrap();
        assert_eq!(timeline.balance_as_of(last), timeline.baseline(start));
    }

    #[test]
    fn test_window_keeps_historical_position() {
        let timeline = reconstruct_timeline(&ledger());
        let selection = PeriodSelection::single(PeriodKey::new(2025, 2).unwrap());

        let rows = timeline.window(&selection);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].balance, 30.0);
        assert_eq!(rows[1].balance, 45.0);
    }

    #[test]
    fn test_last_before() {
        let timeline = reconstruct_timeline(&ledger());
        assert_eq!(timeline.last_before(date(2, 1)).map(|p| p.date), Some(date(1, 20)));
        assert!(timeline.last_before(date(1, 5)).is_none());
    }

    #[test]
    fn test_empty_timeline_is_always_zero() {
        let timeline = reconstruct_timeline(&[]);
        assert!(timeline.is_empty());
        assert_eq!(timeline.balance_as_of(date(6, 1)), 0.0);
        assert_eq!(timeline.baseline(date(6, 1)), 0.0);
        assert!(timeline.entries_in_month(PeriodKey::new(2025, 6).unwrap()).is_empty());
    }
}
