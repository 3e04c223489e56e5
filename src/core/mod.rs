pub mod markers;
pub mod options;
pub mod primitives;
pub mod types;

pub use markers::{MarkerPosition, MarkerShape, SeriesMarker};
pub use options::{ChartOptions, LineStyle, OptionBag, PriceLineOptions, SeriesOptions};
pub use types::{
    LogicalRange, MouseEventParams, OhlcData, Point, PriceScaleSide, SeriesDataItem, SeriesId,
    SeriesKind, SeriesValue, SingleValueData, Size, Time, TimeRange, TimeScaleSize,
};
