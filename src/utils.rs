use crate::error::{ReportError, Result};
use crate::schema::PeriodKey;
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;

/// Every month from `start` through `end` inclusive. Empty when `end < start`.
pub fn month_range(start: PeriodKey, end: PeriodKey) -> Vec<PeriodKey> {
    let mut months = Vec::new();

    let mut current = Some(start);
    while let Some(month) = current {
        if month > end {
            break;
        }
        months.push(month);
        current = month.succ();
    }

    months
}

pub fn months_between(start: PeriodKey, end: PeriodKey) -> i32 {
    let year_diff = end.year() - start.year();
    let month_diff = end.month() as i32 - start.month() as i32;
    year_diff * 12 + month_diff
}

/// Parses a period string in the format "YYYY-MM", "YYYY-MM:YYYY-MM" or "YYYY-Qn".
/// Returns every month the period covers, ascending.
pub fn parse_period_string(period: &str) -> Result<Vec<PeriodKey>> {
    let parts: Vec<&str> = period.split(':').collect();

    match parts.len() {
        1 => {
            let part = parts[0].trim();
            if let Some((year, quarter)) = part.split_once("-Q").or_else(|| part.split_once("-q")) {
                return parse_quarter(year, quarter, period);
            }
            Ok(vec![part.parse()?])
        }
        2 => {
            let start: PeriodKey = parts[0].parse()?;
            let end: PeriodKey = parts[1].parse()?;
            if end < start {
                return Err(ReportError::InvalidPeriod(format!(
                    "{}: end month {} before start month {}",
                    period, end, start
                )));
            }
            Ok(month_range(start, end))
        }
        _ => Err(ReportError::InvalidPeriod(format!(
            "{}. Expected 'YYYY-MM', 'YYYY-MM:YYYY-MM' or 'YYYY-Qn'",
            period
        ))),
    }
}

fn parse_quarter(year: &str, quarter: &str, period: &str) -> Result<Vec<PeriodKey>> {
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| ReportError::InvalidPeriod(format!("Invalid year in period: {}", period)))?;
    let quarter: u32 = match quarter.trim().parse() {
        Ok(q @ 1..=4) => q,
        _ => {
            return Err(ReportError::InvalidPeriod(format!(
                "Invalid quarter in period: {}. Expected Q1 to Q4",
                period
            )))
        }
    };

    let first_month = (quarter - 1) * 3 + 1;
    let start = PeriodKey::new(year, first_month)?;
    let end = PeriodKey::new(year, first_month + 2)?;
    Ok(month_range(start, end))
}

/// Tries each format in order. A format without a day component resolves to
/// the first day of the month.
pub fn parse_date(raw: &str, formats: &[String]) -> Result<NaiveDate> {
    let raw = raw.trim();

    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date);
        }
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(datetime.date());
        }
        if !format.contains("%d") && !format.contains("%e") {
            let padded = format!("{}-01", raw);
            let padded_format = format!("{}-%d", format);
            if let Ok(date) = NaiveDate::parse_from_str(&padded, &padded_format) {
                return Ok(date);
            }
        }
    }

    Err(ReportError::MalformedDate {
        value: raw.to_string(),
    })
}

/// Spreadsheet-style numeric coercion: blank or non-numeric becomes 0.
pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            debug!("Non-numeric amount '{}' coerced to 0", trimmed);
            0.0
        }
    }
}

pub fn parse_optional_amount(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
