use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{BindingError, BindingResult};

pub fn decimal_to_f64(value: Decimal, field_name: &str) -> BindingResult<f64> {
    value.to_f64().ok_or_else(|| {
        BindingError::InvalidData(format!("{field_name} cannot be represented as f64"))
    })
}

#[must_use]
pub fn datetime_to_unix_seconds(time: DateTime<Utc>) -> i64 {
    time.timestamp()
}

/// Splits a calendar date into the `(year, month, day)` triple used by business days.
#[must_use]
pub fn date_parts(date: NaiveDate) -> (i32, u32, u32) {
    (date.year(), date.month(), date.day())
}

pub fn parse_iso_date(input: &str) -> BindingResult<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| BindingError::InvalidData(format!("`{input}` is not a YYYY-MM-DD date: {e}")))
}
