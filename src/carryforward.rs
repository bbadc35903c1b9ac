//! Credit carryforward over an ordered monthly history.
//!
//! The chain is a fold: each period consumes the credit carried in from the
//! previous one and hands on whatever credit it did not use. Results for a
//! display window are always cut from a chain computed over the full history,
//! so they do not depend on which months happen to be on screen.

use crate::error::{ReportError, Result};
use crate::schema::{ApportionmentResult, MonthlyTaxAggregate, PeriodKey};
use crate::utils::{month_range, months_between};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unused credit entering the next period. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarryforwardState(f64);

impl CarryforwardState {
    pub fn initial() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn step(self, period: &MonthlyTaxAggregate) -> (Self, ApportionmentResult) {
        let carry_in = self.0;
        let total_credit = period.credit + carry_in;
        let due = period.debit - total_credit;

        let result = ApportionmentResult {
            period: period.period,
            credit: period.credit,
            debit: period.debit,
            carry_in,
            due,
        };

        (Self((-due).max(0.0)), result)
    }
}

/// Fails on the first period that does not strictly follow its predecessor.
pub fn validate_order(history: &[MonthlyTaxAggregate]) -> Result<()> {
    for pair in history.windows(2) {
        if pair[1].period <= pair[0].period {
            return Err(ReportError::OutOfOrderPeriod {
                previous: pair[0].period,
                found: pair[1].period,
            });
        }
    }
    Ok(())
}

/// Expands an ordered history into one aggregate per month from its first
/// month through `end`, with missing months as zero credit and zero debit.
fn fill_gaps(history: &[MonthlyTaxAggregate], end: PeriodKey) -> Vec<MonthlyTaxAggregate> {
    let Some(first) = history.first() else {
        return Vec::new();
    };

    let mut known = history.iter().peekable();
    let mut filled = 0usize;
    let months: Vec<MonthlyTaxAggregate> = month_range(first.period, end)
        .into_iter()
        .map(|month| match known.next_if(|a| a.period == month) {
            Some(aggregate) => aggregate.clone(),
            None => {
                filled += 1;
                MonthlyTaxAggregate::empty(month)
            }
        })
        .collect();

    if filled > 0 {
        debug!(
            "Filled {} of {} months between {} and {} with zero activity",
            filled,
            months_between(first.period, end) + 1,
            first.period,
            end
        );
    }

    months
}

fn fold_periods(periods: &[MonthlyTaxAggregate]) -> Vec<ApportionmentResult> {
    periods
        .iter()
        .scan(CarryforwardState::initial(), |state, period| {
            let (next, result) = state.step(period);
            *state = next;
            Some(result)
        })
        .collect()
}

/// Runs the carryforward chain over the whole history.
pub fn run_carryforward(history: &[MonthlyTaxAggregate]) -> Result<Vec<ApportionmentResult>> {
    validate_order(history)?;

    let Some(last) = history.last() else {
        return Ok(Vec::new());
    };

    Ok(fold_periods(&fill_gaps(history, last.period)))
}

/// Computes the chain from the first history month through the latest display
/// period, then keeps only the display periods. Months past the end of the
/// history continue the chain with zero activity.
pub fn compute_apportionment(
    full_history: &[MonthlyTaxAggregate],
    display_periods: &[PeriodKey],
) -> Result<Vec<ApportionmentResult>> {
    validate_order(full_history)?;

    let display: BTreeSet<PeriodKey> = display_periods.iter().copied().collect();
    let Some(&end) = display.last() else {
        return Ok(Vec::new());
    };

    let chain = fold_periods(&fill_gaps(full_history, end));

    Ok(chain
        .into_iter()
        .filter(|result| display.contains(&result.period))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(m: u32) -> PeriodKey {
        PeriodKey::new(2025, m).unwrap()
    }

    fn history(values: &[(u32, f64, f64)]) -> Vec<MonthlyTaxAggregate> {
        values
            .iter()
            .map(|&(m, credit, debit)| MonthlyTaxAggregate::new(month(m), credit, debit))
            .collect()
    }

    #[test]
    fn test_three_period_chain() {
        let results = run_carryforward(&history(&[
            (1, 100.0, 30.0),
            (2, 0.0, 50.0),
            (3, 50.0, 0.0),
        ]))
        .unwrap();

        let dues: Vec<f64> = results.iter().map(|r| r.due).collect();
        let carries: Vec<f64> = results.iter().map(|r| r.carry_in).collect();
        assert_eq!(dues, vec![-70.0, -20.0, -70.0]);
        assert_eq!(carries, vec![0.0, 70.0, 20.0]);
    }

    #[test]
    fn test_carry_in_follows_previous_due() {
        let results = run_carryforward(&history(&[
            (1, 10.0, 80.0),
            (2, 200.0, 20.0),
            (3, 0.0, 500.0),
            (4, 40.0, 10.0),
            (5, 5.0, 5.0),
        ]))
        .unwrap();

        assert_eq!(results[0].carry_in, 0.0);
        for pair in results.windows(2) {
            assert_eq!(pair[1].carry_in, (-pair[0].due).max(0.0));
            assert!(pair[1].carry_in >= 0.0);
        }
        // A payable month does not carry anything forward.
        assert_eq!(results[3].carry_in, 0.0);
    }

    #[test]
    fn test_step_never_carries_negative_credit() {
        let (state, result) =
            CarryforwardState::initial().step(&MonthlyTaxAggregate::new(month(1), 10.0, 25.0));
        assert_eq!(result.due, 15.0);
        assert_eq!(state.value(), 0.0);
    }

    #[test]
    fn test_out_of_order_periods_are_rejected() {
        let err = run_carryforward(&history(&[(2, 10.0, 0.0), (1, 0.0, 5.0)])).unwrap_err();
        match err {
            ReportError::OutOfOrderPeriod { previous, found } => {
                assert_eq!(previous, month(2));
                assert_eq!(found, month(1));
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(compute_apportionment(&history(&[(2, 10.0, 0.0), (1, 0.0, 5.0)]), &[month(1)]).is_err());
    }

    #[test]
    fn test_duplicate_periods_are_rejected() {
        let result = run_carryforward(&history(&[(1, 10.0, 0.0), (1, 0.0, 5.0)]));
        assert!(matches!(result, Err(ReportError::OutOfOrderPeriod { .. })));
    }

    #[test]
    fn test_gaps_are_zero_months() {
        let results = run_carryforward(&history(&[(1, 100.0, 0.0), (4, 0.0, 30.0)])).unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[1].period, month(2));
        assert_eq!(results[1].credit, 0.0);
        assert_eq!(results[1].carry_in, 100.0);
        assert_eq!(results[3].carry_in, 100.0);
        assert_eq!(results[3].due, -70.0);
    }

    #[test]
    fn test_display_filter_applies_after_full_chain() {
        let full = history(&[(1, 100.0, 30.0), (2, 0.0, 50.0), (3, 50.0, 0.0)]);

        let march = compute_apportionment(&full, &[month(3)]).unwrap();
        assert_eq!(march.len(), 1);
        assert_eq!(march[0].carry_in, 20.0);
        assert_eq!(march[0].due, -70.0);

        // Computing over the filtered window alone would lose January's credit.
        let windowed = run_carryforward(&full[2..]).unwrap();
        assert_ne!(windowed[0].carry_in, march[0].carry_in);
    }

    #[test]
    fn test_display_beyond_history_continues_chain() {
        let full = history(&[(1, 100.0, 30.0)]);
        let results = compute_apportionment(&full, &[month(3), month(2)]).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].period, month(2));
        assert_eq!(results[1].carry_in, 70.0);
    }

    #[test]
    fn test_compute_apportionment_is_idempotent() {
        let full = history(&[(1, 12.5, 40.0), (2, 80.0, 10.0), (3, 3.0, 99.0)]);
        let display = [month(2), month(3)];

        let first = compute_apportionment(&full, &display).unwrap();
        let second = compute_apportionment(&full, &display).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(run_carryforward(&[]).unwrap().is_empty());
        assert!(compute_apportionment(&[], &[month(1)]).unwrap().is_empty());
        assert!(compute_apportionment(&history(&[(1, 1.0, 1.0)]), &[]).unwrap().is_empty());
    }

    #[test]
    fn test_display_before_history_yields_nothing() {
        let full = history(&[(5, 10.0, 1.0)]);
        assert!(compute_apportionment(&full, &[month(2)]).unwrap().is_empty());
    }
}
