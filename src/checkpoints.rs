use crate::error::Result;
use crate::schema::{
    check_mid_month_day, Checkpoint, CheckpointLabel, PeriodKey, PeriodSelection, ReportWarning,
    SeriesKind, DEFAULT_MID_MONTH_DAY,
};
use crate::timeline::BalanceTimeline;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointView {
    /// One month selected: start, mid-month and end points
    Monthly,
    /// Several months selected: one end-of-month point each
    MultiMonth,
}

impl CheckpointView {
    pub fn for_selection(selection: &PeriodSelection) -> Self {
        if selection.is_single_month() {
            CheckpointView::Monthly
        } else {
            CheckpointView::MultiMonth
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointSeries {
    pub checkpoints: Vec<Checkpoint>,
    pub warnings: Vec<ReportWarning>,
}

pub struct CheckpointSelector {
    mid_month_day: u32,
}

impl Default for CheckpointSelector {
    fn default() -> Self {
        Self {
            mid_month_day: DEFAULT_MID_MONTH_DAY,
        }
    }
}

impl CheckpointSelector {
    /// Fails with `InvalidMidMonthDay` unless the day is within 1..=28.
    pub fn new(mid_month_day: u32) -> Result<Self> {
        check_mid_month_day(mid_month_day)?;
        Ok(Self { mid_month_day })
    }

    pub fn select(
        &self,
        timeline: &BalanceTimeline,
        selection: &PeriodSelection,
    ) -> CheckpointSeries {
        let view = CheckpointView::for_selection(selection);
        let mut series = CheckpointSeries::default();

        for &month in selection.months() {
            if timeline.entries_in_month(month).is_empty() {
                debug!("No cash entries in {}; month skipped", month);
                series.warnings.push(ReportWarning::EmptySeries {
                    series: SeriesKind::CashBalance,
                    period: Some(month),
                });
                continue;
            }

            if view == CheckpointView::Monthly {
                series.checkpoints.push(self.start_of_month(timeline, month));
                match self.mid_month(timeline, month) {
                    Some(checkpoint) => series.checkpoints.push(checkpoint),
                    None => {
                        let reference = month.day(self.mid_month_day);
                        debug!(
                            "No cash entry on or before {}; mid-month checkpoint omitted",
                            reference
                        );
                        series
                            .warnings
                            .push(ReportWarning::MissingReferenceDate { period: month, reference });
                    }
                }
            }

            if let Some(checkpoint) = self.end_of_month(timeline, month) {
                series.checkpoints.push(checkpoint);
            }
        }

        series
    }

    /// Dated at the last entry before the month, or the day before the
    /// month starts when there is no earlier entry.
    fn start_of_month(&self, timeline: &BalanceTimeline, month: PeriodKey) -> Checkpoint {
        let first_day = month.first_day();
        let date = timeline
            .last_before(first_day)
            .map(|p| p.date)
            .or_else(|| first_day.pred_opt())
            .unwrap_or(first_day);

        Checkpoint {
            date,
            label: CheckpointLabel::Start,
            balance: timeline.baseline(first_day),
            period: month,
        }
    }

    /// Dated at the latest entry on or before the reference day, so it never
    /// falls after the end-of-month point.
    fn mid_month(&self, timeline: &BalanceTimeline, month: PeriodKey) -> Option<Checkpoint> {
        let reference = month.day(self.mid_month_day);
        let latest = timeline
            .entries_between(month.first_day(), reference)
            .last()?;

        Some(Checkpoint {
            date: latest.date,
            label: CheckpointLabel::Mid,
            balance: latest.balance,
            period: month,
        })
    }

    fn end_of_month(&self, timeline: &BalanceTimeline, month: PeriodKey) -> Option<Checkpoint> {
        let last = timeline.entries_in_month(month).last()?;

        Some(Checkpoint {
            date: last.date,
            label: CheckpointLabel::End,
            balance: last.balance,
            period: month,
        })
    }
}

/// Chart points for the selected months, using the 15th as the mid-month date.
pub fn select_checkpoints(timeline: &BalanceTimeline, selected_months: &[PeriodKey]) -> Vec<Checkpoint> {
    let selection = PeriodSelection::from_months(selected_months.iter().copied());
    CheckpointSelector::default()
        .select(timeline, &selection)
        .checkpoints
}
