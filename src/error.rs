use crate::schema::PeriodKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Malformed date: '{value}'")]
    MalformedDate { value: String },

    #[error("Out of order period: {found} follows {previous} (periods must be strictly ascending with no duplicates)")]
    OutOfOrderPeriod { previous: PeriodKey, found: PeriodKey },

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid mid-month reference day {0}: must be between 1 and 28")]
    InvalidMidMonthDay(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
