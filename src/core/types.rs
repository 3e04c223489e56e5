use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::primitives::{date_parts, datetime_to_unix_seconds, decimal_to_f64, parse_iso_date};
use crate::error::BindingResult;

/// Horizontal coordinate of a data item as the engine understands it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Time {
    /// Unix timestamp in seconds.
    Timestamp(i64),
    BusinessDay { year: i32, month: u32, day: u32 },
    /// `YYYY-MM-DD` date string.
    Date(String),
}

impl Time {
    #[must_use]
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self::Timestamp(datetime_to_unix_seconds(time))
    }

    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        let (year, month, day) = date_parts(date);
        Self::BusinessDay { year, month, day }
    }

    /// Parses a `YYYY-MM-DD` string into a business day.
    pub fn parse_date(input: &str) -> BindingResult<Self> {
        parse_iso_date(input).map(Self::from_date)
    }
}

impl From<i64> for Time {
    fn from(value: i64) -> Self {
        Self::Timestamp(value)
    }
}

/// Series flavours the engine can plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesKind {
    Area,
    Bar,
    Baseline,
    Candlestick,
    Histogram,
    Line,
}

impl SeriesKind {
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Area => "AreaSeries",
            Self::Bar => "BarSeries",
            Self::Baseline => "BaselineSeries",
            Self::Candlestick => "CandlestickSeries",
            Self::Histogram => "HistogramSeries",
            Self::Line => "LineSeries",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceScaleSide {
    Left,
    Right,
}

/// Pixel position inside the chart plot area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Uniform `(width, height)` pair used for every box measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleValueData {
    pub time: Time,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SingleValueData {
    #[must_use]
    pub fn new(time: impl Into<Time>, value: f64) -> Self {
        Self {
            time: time.into(),
            value,
            color: None,
        }
    }

    pub fn from_decimal(time: DateTime<Utc>, value: Decimal) -> BindingResult<Self> {
        Ok(Self {
            time: Time::from_datetime(time),
            value: decimal_to_f64(value, "value")?,
            color: None,
        })
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcData {
    pub time: Time,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcData {
    #[must_use]
    pub fn new(time: impl Into<Time>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time: time.into(),
            open,
            high,
            low,
            close,
        }
    }

    pub fn from_decimal(
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> BindingResult<Self> {
        Ok(Self {
            time: Time::from_datetime(time),
            open: decimal_to_f64(open, "open")?,
            high: decimal_to_f64(high, "high")?,
            low: decimal_to_f64(low, "low")?,
            close: decimal_to_f64(close, "close")?,
        })
    }
}

/// One item of a series data list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesDataItem {
    Ohlc(OhlcData),
    Value(SingleValueData),
    /// A time slot without a value.
    Whitespace { time: Time },
}

impl SeriesDataItem {
    #[must_use]
    pub fn value(time: impl Into<Time>, value: f64) -> Self {
        Self::Value(SingleValueData::new(time, value))
    }

    #[must_use]
    pub fn time(&self) -> &Time {
        match self {
            Self::Ohlc(bar) => &bar.time,
            Self::Value(point) => &point.time,
            Self::Whitespace { time } => time,
        }
    }

    /// The value the crosshair reports for this item.
    #[must_use]
    pub fn to_series_value(&self) -> Option<SeriesValue> {
        match self {
            Self::Ohlc(bar) => Some(SeriesValue::Bar {
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            }),
            Self::Value(point) => Some(SeriesValue::Price(point.value)),
            Self::Whitespace { .. } => None,
        }
    }
}

impl From<SingleValueData> for SeriesDataItem {
    fn from(value: SingleValueData) -> Self {
        Self::Value(value)
    }
}

impl From<OhlcData> for SeriesDataItem {
    fn from(value: OhlcData) -> Self {
        Self::Ohlc(value)
    }
}

/// Value at cursor for one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SeriesValue {
    Price(f64),
    Bar {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// Opaque identity of a series handle, stable for the lifetime of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId(u64);

impl SeriesId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Payload of click and crosshair-move events.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MouseEventParams {
    pub time: Option<Time>,
    pub point: Option<Point>,
    pub series_values: IndexMap<SeriesId, SeriesValue>,
}

impl MouseEventParams {
    /// Event emitted when the pointer leaves the plot area.
    #[must_use]
    pub fn outside() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at(time: impl Into<Time>, point: Point) -> Self {
        Self {
            time: Some(time.into()),
            point: Some(point),
            series_values: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_series_value(mut self, series: SeriesId, value: SeriesValue) -> Self {
        self.series_values.insert(series, value);
        self
    }

    #[must_use]
    pub fn series_value(&self, series: SeriesId) -> Option<SeriesValue> {
        self.series_values.get(&series).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Time,
    pub to: Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogicalRange {
    pub from: f64,
    pub to: f64,
}

/// Payload of the time-scale size-change stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScaleSize {
    pub width: f64,
    pub height: f64,
}
