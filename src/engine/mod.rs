//! Contract required from the charting engine.
//!
//! The bindings never draw anything; they drive an existing engine through
//! these traits. Handles use interior mutability because the engine is
//! shared by every binding of one tree and only ever touched from the UI
//! thread.

mod events;
mod recording;

use std::cell::Cell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

pub use events::{
    Click, CrosshairMove, EventHandler, EventKind, EventStream, LogicalRangeChangeHandler,
    MouseEventHandler, SizeChangeHandler, TimeRangeChangeHandler, TimeScaleSizeChange,
    VisibleLogicalRangeChange, VisibleTimeRangeChange,
};
pub use recording::{EngineCall, RecordingChart, RecordingEngine, RecordingSeries};

use crate::core::{
    ChartOptions, PriceLineOptions, PriceScaleSide, SeriesDataItem, SeriesId, SeriesKind,
    SeriesMarker, SeriesOptions,
};
use crate::error::BindingResult;
use crate::platform::ElementRef;

/// Creates chart instances inside a container element.
pub trait ChartFactory {
    fn create_chart(
        &self,
        container: &ElementRef,
        options: &ChartOptions,
    ) -> BindingResult<Rc<dyn ChartApi>>;
}

/// One live chart instance.
pub trait ChartApi {
    fn apply_options(&self, options: &ChartOptions);
    fn resize(&self, width: u32, height: u32);
    /// Destroys the chart and every series it owns.
    fn remove(&self) -> BindingResult<()>;

    fn add_series(&self, kind: SeriesKind, options: &SeriesOptions)
    -> BindingResult<SeriesHandle>;
    /// Fails with `DoubleRemoval` when the series (or its chart) is already gone.
    fn remove_series(&self, series: &SeriesHandle) -> BindingResult<()>;

    fn price_scale_width(&self, side: PriceScaleSide) -> f64;
    fn fit_content(&self);

    fn subscribe_click(&self, handler: MouseEventHandler);
    fn unsubscribe_click(&self, handler: &MouseEventHandler);
    fn subscribe_crosshair_move(&self, handler: MouseEventHandler);
    fn unsubscribe_crosshair_move(&self, handler: &MouseEventHandler);

    fn subscribe_size_change(&self, handler: SizeChangeHandler);
    fn unsubscribe_size_change(&self, handler: &SizeChangeHandler);
    fn subscribe_visible_time_range_change(&self, handler: TimeRangeChangeHandler);
    fn unsubscribe_visible_time_range_change(&self, handler: &TimeRangeChangeHandler);
    fn subscribe_visible_logical_range_change(&self, handler: LogicalRangeChangeHandler);
    fn unsubscribe_visible_logical_range_change(&self, handler: &LogicalRangeChangeHandler);
}

/// One plotted series owned by a chart.
pub trait SeriesApi {
    fn id(&self) -> SeriesId;
    fn kind(&self) -> SeriesKind;

    /// Replaces the whole displayed data list.
    fn set_data(&self, data: &[SeriesDataItem]);
    /// Appends or replaces the last item; time must not go backwards.
    fn update(&self, item: &SeriesDataItem);
    fn set_markers(&self, markers: &[SeriesMarker]);
    fn apply_options(&self, options: &SeriesOptions);

    fn create_price_line(&self, options: &PriceLineOptions) -> BindingResult<PriceLineHandle>;
    /// Fails with `DoubleRemoval` when the line (or its series) is already gone.
    fn remove_price_line(&self, line: &PriceLineHandle) -> BindingResult<()>;
}

pub trait PriceLineApi {
    fn id(&self) -> u64;
    fn apply_options(&self, options: &PriceLineOptions);
}

pub type SeriesHandle = Rc<dyn SeriesApi>;
pub type PriceLineHandle = Rc<dyn PriceLineApi>;

/// Engine handle as owned by a chart host and shared through the chart scope.
///
/// Clones share a liveness flag: once the owning host destroys the chart,
/// every clone (including ones captured by deferred tasks) reports
/// `is_alive() == false`.
#[derive(Clone)]
pub struct ChartHandle {
    api: Rc<dyn ChartApi>,
    alive: Rc<Cell<bool>>,
}

impl ChartHandle {
    #[must_use]
    pub fn new(api: Rc<dyn ChartApi>) -> Self {
        Self {
            api,
            alive: Rc::new(Cell::new(true)),
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Returns `true` when both handles refer to the same chart lifetime.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.alive, &other.alive)
    }

    pub(crate) fn mark_removed(&self) {
        self.alive.set(false);
    }
}

impl Deref for ChartHandle {
    type Target = dyn ChartApi;

    fn deref(&self) -> &Self::Target {
        self.api.as_ref()
    }
}

impl fmt::Debug for ChartHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartHandle")
            .field("identity", &Rc::as_ptr(&self.alive))
            .field("alive", &self.alive.get())
            .finish()
    }
}

/// Compares two optional chart handles by lifetime identity.
#[must_use]
pub fn same_chart(a: Option<&ChartHandle>, b: Option<&ChartHandle>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same(b),
        (None, None) => true,
        _ => false,
    }
}
