use crate::error::{ReportError, Result};
use crate::utils::parse_period_string;
use chrono::{Datelike, Months, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MID_MONTH_DAY: u32 = 15;

/// A calendar month. Internally anchored on the month's first day, so every
/// value is a valid month and ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey(NaiveDate);

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| ReportError::InvalidPeriod(format!("{:04}-{:02}", year, month)))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.0
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// The given day of this month, clamped to the month's last day.
    pub fn day(&self, day: u32) -> NaiveDate {
        self.0
            .with_day(day)
            .unwrap_or_else(|| self.last_day())
    }

    pub fn succ(&self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Self)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for PeriodKey {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map_err(|_| ReportError::InvalidPeriod(format!("{}. Expected YYYY-MM", s)))?;
        Ok(Self(date))
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(key: PeriodKey) -> Self {
        key.to_string()
    }
}

/// The months a report is filtered to. One month is the monthly view,
/// several months the quarterly (multi-month) view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<PeriodKey>", into = "Vec<PeriodKey>")]
pub struct PeriodSelection {
    months: Vec<PeriodKey>,
}

impl PeriodSelection {
    pub fn from_months(months: impl IntoIterator<Item = PeriodKey>) -> Self {
        let mut months: Vec<PeriodKey> = months.into_iter().collect();
        months.sort();
        months.dedup();
        Self { months }
    }

    pub fn single(month: PeriodKey) -> Self {
        Self {
            months: vec![month],
        }
    }

    /// Parses "YYYY-MM", "YYYY-MM:YYYY-MM" or "YYYY-Qn".
    pub fn parse(period: &str) -> Result<Self> {
        Ok(Self::from_months(parse_period_string(period)?))
    }

    pub fn months(&self) -> &[PeriodKey] {
        &self.months
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn is_single_month(&self) -> bool {
        self.months.len() == 1
    }

    pub fn first(&self) -> Option<PeriodKey> {
        self.months.first().copied()
    }

    pub fn last(&self) -> Option<PeriodKey> {
        self.months.last().copied()
    }

    pub fn contains(&self, period: &PeriodKey) -> bool {
        self.months.binary_search(period).is_ok()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(&PeriodKey::from_date(date))
    }
}

impl From<Vec<PeriodKey>> for PeriodSelection {
    fn from(months: Vec<PeriodKey>) -> Self {
        Self::from_months(months)
    }
}

impl From<PeriodSelection> for Vec<PeriodKey> {
    fn from(selection: PeriodSelection) -> Self {
        selection.months
    }
}

impl fmt::Display for PeriodSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.months.iter().map(|m| m.to_string()).collect();
        write!(f, "[{}]", labels.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[schemars(description = "Inbound document (purchase). Its ICMS value is a credit.")]
    #[serde(alias = "entrada", alias = "inbound")]
    Credit,

    #[schemars(description = "Outbound document (sale). Its ICMS value is a debit owed.")]
    #[serde(alias = "saida", alias = "outbound")]
    Debit,
}

/// One fiscal document line from the transaction extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub kind: EntryKind,
    /// ICMS value of the document
    pub tax_amount: f64,
    /// Document total
    pub gross_amount: f64,
    /// Issuer state for credits, recipient state for debits
    pub category: Option<String>,
    /// Fraction, e.g. 0.12 for 12%
    pub tax_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTaxAggregate {
    pub period: PeriodKey,
    pub credit: f64,
    pub debit: f64,
}

impl MonthlyTaxAggregate {
    pub fn new(period: PeriodKey, credit: f64, debit: f64) -> Self {
        Self {
            period,
            credit,
            debit,
        }
    }

    pub fn empty(period: PeriodKey) -> Self {
        Self::new(period, 0.0, 0.0)
    }
}

/// Resolution of one period: how much credit offset the debit and what remains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApportionmentResult {
    pub period: PeriodKey,
    pub credit: f64,
    pub debit: f64,
    /// Credit carried in from the previous period
    pub carry_in: f64,
    /// Negative when credit exceeds debit; the excess carries forward
    pub due: f64,
}

impl ApportionmentResult {
    pub fn total_credit(&self) -> f64 {
        self.credit + self.carry_in
    }

    pub fn carry_out(&self) -> f64 {
        (-self.due).max(0.0)
    }

    pub fn amount_payable(&self) -> f64 {
        self.due.max(0.0)
    }
}

/// One month of PIS/COFINS apuração as kept by the accounting workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionEntry {
    pub period: PeriodKey,
    pub credit: f64,
    pub debit: f64,
    /// Running balance as recorded on the row
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashEntry {
    pub date: NaiveDate,
    pub inflow: f64,
    pub outflow: f64,
}

impl CashEntry {
    pub fn new(date: NaiveDate, inflow: f64, outflow: f64) -> Self {
        Self {
            date,
            inflow,
            outflow,
        }
    }

    pub fn net(&self) -> f64 {
        self.inflow - self.outflow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointLabel {
    Start,
    Mid,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub date: NaiveDate,
    pub label: CheckpointLabel,
    pub balance: f64,
    /// The selected month this point was sampled for
    pub period: PeriodKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSource {
    Ledger,
    Cash,
    Contributions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Apportionment,
    CashBalance,
}

/// Degradations that shrink a report without failing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ReportWarning {
    MalformedDate {
        source: RowSource,
        row: usize,
        value: String,
    },
    EmptySeries {
        series: SeriesKind,
        period: Option<PeriodKey>,
    },
    MissingReferenceDate {
        period: PeriodKey,
        reference: NaiveDate,
    },
}

impl fmt::Display for ReportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportWarning::MalformedDate { source, row, value } => {
                write!(f, "{:?} row {} excluded: malformed date '{}'", source, row, value)
            }
            ReportWarning::EmptySeries { series, period } => match period {
                Some(p) => write!(f, "No {:?} data for {}", series, p),
                None => write!(f, "No {:?} data", series),
            },
            ReportWarning::MissingReferenceDate { period, reference } => write!(
                f,
                "No cash entry on or before {} in {}; mid-month checkpoint omitted",
                reference, period
            ),
        }
    }
}

/// Reference days past the 28th would not exist in every month.
pub(crate) fn check_mid_month_day(day: u32) -> Result<()> {
    if !(1..=28).contains(&day) {
        return Err(ReportError::InvalidMidMonthDay(day));
    }
    Ok(())
}

fn default_mid_month_day() -> u32 {
    DEFAULT_MID_MONTH_DAY
}

fn default_date_formats() -> Vec<String> {
    ["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y", "%Y-%m"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportConfig {
    #[serde(default = "default_mid_month_day")]
    #[schemars(
        description = "Calendar day used as the mid-month reference date in the monthly view. Must be between 1 and 28."
    )]
    pub mid_month_day: u32,

    #[serde(default = "default_date_formats")]
    #[schemars(
        description = "chrono format strings tried in order when parsing raw dates. Formats without a day component (e.g. %Y-%m) resolve to the first day of the month."
    )]
    pub date_formats: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            mid_month_day: DEFAULT_MID_MONTH_DAY,
            date_formats: default_date_formats(),
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<()> {
        check_mid_month_day(self.mid_month_day)?;
        if self.date_formats.is_empty() {
            return Err(ReportError::InvalidConfig(
                "at least one date format is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
