use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::{LogicalRange, MouseEventParams, TimeRange, TimeScaleSize};

use super::ChartApi;

/// Engine event streams a binding can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStream {
    Click,
    CrosshairMove,
    TimeScaleSizeChange,
    VisibleTimeRangeChange,
    VisibleLogicalRangeChange,
}

/// Shared event callback whose identity is the allocation it points to.
///
/// Cloning keeps the identity, so a clone unsubscribes the registration made
/// with the original. Wrapping the same closure twice yields two identities.
pub struct EventHandler<P> {
    callback: Rc<dyn Fn(&P)>,
}

impl<P> EventHandler<P> {
    pub fn new(callback: impl Fn(&P) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub fn call(&self, payload: &P) {
        (self.callback)(payload);
    }

    /// Returns `true` when both values refer to the same registration identity.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
    }
}

impl<P> Clone for EventHandler<P> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<P> fmt::Debug for EventHandler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("identity", &Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

pub type MouseEventHandler = EventHandler<MouseEventParams>;
pub type SizeChangeHandler = EventHandler<TimeScaleSize>;
pub type TimeRangeChangeHandler = EventHandler<Option<TimeRange>>;
pub type LogicalRangeChangeHandler = EventHandler<Option<LogicalRange>>;

/// Static description of one engine event stream.
///
/// Implemented by the marker types below so subscription plumbing can be
/// written once and instantiated per stream.
pub trait EventKind: 'static {
    type Payload: 'static;
    const STREAM: EventStream;

    fn subscribe(chart: &dyn ChartApi, handler: EventHandler<Self::Payload>);
    fn unsubscribe(chart: &dyn ChartApi, handler: &EventHandler<Self::Payload>);
}

#[derive(Debug, Clone, Copy)]
pub struct Click;

#[derive(Debug, Clone, Copy)]
pub struct CrosshairMove;

#[derive(Debug, Clone, Copy)]
pub struct TimeScaleSizeChange;

#[derive(Debug, Clone, Copy)]
pub struct VisibleTimeRangeChange;

#[derive(Debug, Clone, Copy)]
pub struct VisibleLogicalRangeChange;

impl EventKind for Click {
    type Payload = MouseEventParams;
    const STREAM: EventStream = EventStream::Click;

    fn subscribe(chart: &dyn ChartApi, handler: EventHandler<Self::Payload>) {
        chart.subscribe_click(handler);
    }

    fn unsubscribe(chart: &dyn ChartApi, handler: &EventHandler<Self::Payload>) {
        chart.unsubscribe_click(handler);
    }
}

impl EventKind for CrosshairMove {
    type Payload = MouseEventParams;
    const STREAM: EventStream = EventStream::CrosshairMove;

    fn subscribe(chart: &dyn ChartApi, handler: EventHandler<Self::Payload>) {
        chart.subscribe_crosshair_move(handler);
    }

    fn unsubscribe(chart: &dyn ChartApi, handler: &EventHandler<Self::Payload>) {
        chart.unsubscribe_crosshair_move(handler);
    }
}

impl EventKind for TimeScaleSizeChange {
    type Payload = TimeScaleSize;
    const STREAM: EventStream = EventStream::TimeScaleSizeChange;

    fn subscribe(chart: &dyn ChartApi, handler: EventHandler<Self::Payload>) {
        chart.subscribe_size_change(handler);
    }

    fn unsubscribe(chart: &dyn ChartApi, handler: &EventHandler<Self::Payload>) {
        chart.unsubscribe_size_change(handler);
    }
}

impl EventKind for VisibleTimeRangeChange {
    type Payload = Option<TimeRange>;
    const STREAM: EventStream = EventStream::VisibleTimeRangeChange;

    fn subscribe(chart: &dyn ChartApi, handler: EventHandler<Self::Payload>) {
        chart.subscribe_visible_time_range_change(handler);
    }

    fn unsubscribe(chart: &dyn ChartApi, handler: &EventHandler<Self::Payload>) {
        chart.unsubscribe_visible_time_range_change(handler);
    }
}

impl EventKind for VisibleLogicalRangeChange {
    type Payload = Option<LogicalRange>;
    const STREAM: EventStream = EventStream::VisibleLogicalRangeChange;

    fn subscribe(chart: &dyn ChartApi, handler: EventHandler<Self::Payload>) {
        chart.subscribe_visible_logical_range_change(handler);
    }

    fn unsubscribe(chart: &dyn ChartApi, handler: &EventHandler<Self::Payload>) {
        chart.unsubscribe_visible_logical_range_change(handler);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::EventHandler;

    #[test]
    fn clones_share_identity_but_new_wrappers_do_not() {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let handler = EventHandler::<u32>::new(move |value| counter.set(counter.get() + value));
        let clone = handler.clone();
        let other = EventHandler::<u32>::new(|_| {});

        assert!(handler.same(&clone));
        assert!(!handler.same(&other));

        clone.call(&3);
        assert_eq!(hits.get(), 3);
    }
}
