use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::{
    ChartOptions, LogicalRange, MouseEventParams, PriceLineOptions, PriceScaleSide,
    SeriesDataItem, SeriesId, SeriesKind, SeriesMarker, SeriesOptions, TimeRange, TimeScaleSize,
};
use crate::error::{BindingError, BindingResult, HandleKind};
use crate::platform::ElementRef;

use super::{
    ChartApi, ChartFactory, EventHandler, EventStream, LogicalRangeChangeHandler,
    MouseEventHandler, PriceLineApi, PriceLineHandle, SeriesApi, SeriesHandle, SizeChangeHandler,
    TimeRangeChangeHandler,
};

/// One call observed by the recording engine, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    CreateChart {
        chart: u64,
        options: ChartOptions,
    },
    ApplyChartOptions {
        chart: u64,
        options: ChartOptions,
    },
    Resize {
        chart: u64,
        width: u32,
        height: u32,
    },
    RemoveChart {
        chart: u64,
    },
    FitContent {
        chart: u64,
    },
    Subscribe {
        chart: u64,
        stream: EventStream,
    },
    Unsubscribe {
        chart: u64,
        stream: EventStream,
    },
    AddSeries {
        chart: u64,
        series: SeriesId,
        kind: SeriesKind,
        options: SeriesOptions,
    },
    RemoveSeries {
        chart: u64,
        series: SeriesId,
    },
    SetData {
        series: SeriesId,
        data: Vec<SeriesDataItem>,
    },
    Update {
        series: SeriesId,
        item: SeriesDataItem,
    },
    SetMarkers {
        series: SeriesId,
        markers: Vec<SeriesMarker>,
    },
    ApplySeriesOptions {
        series: SeriesId,
        options: SeriesOptions,
    },
    CreatePriceLine {
        series: SeriesId,
        line: u64,
        options: PriceLineOptions,
    },
    ApplyPriceLineOptions {
        line: u64,
        options: PriceLineOptions,
    },
    RemovePriceLine {
        series: SeriesId,
        line: u64,
    },
}

#[derive(Debug, Default)]
struct Journal {
    calls: RefCell<Vec<EngineCall>>,
    next_id: Cell<u64>,
}

impl Journal {
    fn record(&self, call: EngineCall) {
        self.calls.borrow_mut().push(call);
    }

    fn allocate_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

/// Headless engine that keeps engine-side state in memory and journals every call.
///
/// It enforces the removal rules of a real engine (removing twice fails with
/// `DoubleRemoval`, removing a chart implicitly removes its series) so
/// binding teardown order can be exercised without a renderer.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    journal: Rc<Journal>,
    charts: RefCell<Vec<Rc<RecordingChart>>>,
}

impl RecordingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.journal.calls.borrow().clone()
    }

    #[must_use]
    pub fn count_calls(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.journal.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    /// Index of the first journaled call matching `predicate`.
    #[must_use]
    pub fn position_of(&self, predicate: impl Fn(&EngineCall) -> bool) -> Option<usize> {
        self.journal.calls.borrow().iter().position(|call| predicate(call))
    }

    pub fn clear_calls(&self) {
        self.journal.calls.borrow_mut().clear();
    }

    #[must_use]
    pub fn charts(&self) -> Vec<Rc<RecordingChart>> {
        self.charts.borrow().clone()
    }

    #[must_use]
    pub fn last_chart(&self) -> Option<Rc<RecordingChart>> {
        self.charts.borrow().last().cloned()
    }
}

impl ChartFactory for RecordingEngine {
    fn create_chart(
        &self,
        _container: &ElementRef,
        options: &ChartOptions,
    ) -> BindingResult<Rc<dyn ChartApi>> {
        let chart = Rc::new(RecordingChart::new(Rc::clone(&self.journal), options.clone()));
        self.journal.record(EngineCall::CreateChart {
            chart: chart.id,
            options: options.clone(),
        });
        self.charts.borrow_mut().push(Rc::clone(&chart));
        Ok(chart)
    }
}

#[derive(Debug, Default)]
struct Subscriptions {
    click: Vec<MouseEventHandler>,
    crosshair_move: Vec<MouseEventHandler>,
    size_change: Vec<SizeChangeHandler>,
    visible_time_range: Vec<TimeRangeChangeHandler>,
    visible_logical_range: Vec<LogicalRangeChangeHandler>,
}

impl Subscriptions {
    fn clear(&mut self) {
        self.click.clear();
        self.crosshair_move.clear();
        self.size_change.clear();
        self.visible_time_range.clear();
        self.visible_logical_range.clear();
    }
}

fn remove_registration<P>(list: &mut Vec<EventHandler<P>>, handler: &EventHandler<P>) {
    if let Some(position) = list.iter().position(|entry| entry.same(handler)) {
        list.remove(position);
    }
}

#[derive(Debug)]
pub struct RecordingChart {
    id: u64,
    journal: Rc<Journal>,
    removed: Cell<bool>,
    options: RefCell<ChartOptions>,
    size: Cell<Option<(u32, u32)>>,
    price_scale_widths: Cell<(f64, f64)>,
    series: RefCell<Vec<Rc<RecordingSeries>>>,
    subscriptions: RefCell<Subscriptions>,
}

impl RecordingChart {
    fn new(journal: Rc<Journal>, options: ChartOptions) -> Self {
        let id = journal.allocate_id();
        Self {
            id,
            journal,
            removed: Cell::new(false),
            options: RefCell::new(options),
            size: Cell::new(None),
            price_scale_widths: Cell::new((0.0, 0.0)),
            series: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(Subscriptions::default()),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed.get()
    }

    /// Options after every `apply_options` merge.
    #[must_use]
    pub fn options(&self) -> ChartOptions {
        self.options.borrow().clone()
    }

    #[must_use]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size.get()
    }

    pub fn set_price_scale_width(&self, side: PriceScaleSide, width: f64) {
        let (left, right) = self.price_scale_widths.get();
        self.price_scale_widths.set(match side {
            PriceScaleSide::Left => (width, right),
            PriceScaleSide::Right => (left, width),
        });
    }

    #[must_use]
    pub fn series(&self) -> Vec<Rc<RecordingSeries>> {
        self.series.borrow().clone()
    }

    #[must_use]
    pub fn subscriber_count(&self, stream: EventStream) -> usize {
        let subscriptions = self.subscriptions.borrow();
        match stream {
            EventStream::Click => subscriptions.click.len(),
            EventStream::CrosshairMove => subscriptions.crosshair_move.len(),
            EventStream::TimeScaleSizeChange => subscriptions.size_change.len(),
            EventStream::VisibleTimeRangeChange => subscriptions.visible_time_range.len(),
            EventStream::VisibleLogicalRangeChange => subscriptions.visible_logical_range.len(),
        }
    }

    pub fn emit_click(&self, event: &MouseEventParams) {
        let handlers = self.subscriptions.borrow().click.clone();
        handlers.iter().for_each(|handler| handler.call(event));
    }

    pub fn emit_crosshair_move(&self, event: &MouseEventParams) {
        let handlers = self.subscriptions.borrow().crosshair_move.clone();
        handlers.iter().for_each(|handler| handler.call(event));
    }

    pub fn emit_size_change(&self, size: TimeScaleSize) {
        let handlers = self.subscriptions.borrow().size_change.clone();
        handlers.iter().for_each(|handler| handler.call(&size));
    }

    pub fn emit_visible_time_range_change(&self, range: Option<TimeRange>) {
        let handlers = self.subscriptions.borrow().visible_time_range.clone();
        handlers.iter().for_each(|handler| handler.call(&range));
    }

    pub fn emit_visible_logical_range_change(&self, range: Option<LogicalRange>) {
        let handlers = self.subscriptions.borrow().visible_logical_range.clone();
        handlers.iter().for_each(|handler| handler.call(&range));
    }

    fn record_subscription(&self, stream: EventStream, subscribe: bool) {
        let chart = self.id;
        self.journal.record(if subscribe {
            EngineCall::Subscribe { chart, stream }
        } else {
            EngineCall::Unsubscribe { chart, stream }
        });
    }
}

impl ChartApi for RecordingChart {
    fn apply_options(&self, options: &ChartOptions) {
        self.options.borrow_mut().merge(options);
        self.journal.record(EngineCall::ApplyChartOptions {
            chart: self.id,
            options: options.clone(),
        });
    }

    fn resize(&self, width: u32, height: u32) {
        self.size.set(Some((width, height)));
        self.journal.record(EngineCall::Resize {
            chart: self.id,
            width,
            height,
        });
    }

    fn remove(&self) -> BindingResult<()> {
        if self.removed.replace(true) {
            return Err(BindingError::DoubleRemoval {
                kind: HandleKind::Chart,
            });
        }
        for series in self.series.borrow_mut().drain(..) {
            series.mark_removed();
        }
        self.subscriptions.borrow_mut().clear();
        self.journal.record(EngineCall::RemoveChart { chart: self.id });
        Ok(())
    }

    fn add_series(
        &self,
        kind: SeriesKind,
        options: &SeriesOptions,
    ) -> BindingResult<SeriesHandle> {
        if self.removed.get() {
            return Err(BindingError::Engine(format!(
                "chart {} is removed, cannot add series",
                self.id
            )));
        }
        let series = Rc::new(RecordingSeries::new(
            Rc::clone(&self.journal),
            kind,
            options.clone(),
        ));
        self.journal.record(EngineCall::AddSeries {
            chart: self.id,
            series: series.id,
            kind,
            options: options.clone(),
        });
        self.series.borrow_mut().push(Rc::clone(&series));
        Ok(series)
    }

    fn remove_series(&self, series: &SeriesHandle) -> BindingResult<()> {
        let target = series.id();
        let position = self
            .series
            .borrow()
            .iter()
            .position(|entry| entry.id == target);
        let Some(position) = position.filter(|_| !self.removed.get()) else {
            return Err(BindingError::DoubleRemoval {
                kind: HandleKind::Series,
            });
        };
        let removed = self.series.borrow_mut().remove(position);
        removed.mark_removed();
        self.journal.record(EngineCall::RemoveSeries {
            chart: self.id,
            series: target,
        });
        Ok(())
    }

    fn price_scale_width(&self, side: PriceScaleSide) -> f64 {
        let (left, right) = self.price_scale_widths.get();
        match side {
            PriceScaleSide::Left => left,
            PriceScaleSide::Right => right,
        }
    }

    fn fit_content(&self) {
        self.journal.record(EngineCall::FitContent { chart: self.id });
    }

    fn subscribe_click(&self, handler: MouseEventHandler) {
        self.subscriptions.borrow_mut().click.push(handler);
        self.record_subscription(EventStream::Click, true);
    }

    fn unsubscribe_click(&self, handler: &MouseEventHandler) {
        remove_registration(&mut self.subscriptions.borrow_mut().click, handler);
        self.record_subscription(EventStream::Click, false);
    }

    fn subscribe_crosshair_move(&self, handler: MouseEventHandler) {
        self.subscriptions.borrow_mut().crosshair_move.push(handler);
        self.record_subscription(EventStream::CrosshairMove, true);
    }

    fn unsubscribe_crosshair_move(&self, handler: &MouseEventHandler) {
        remove_registration(&mut self.subscriptions.borrow_mut().crosshair_move, handler);
        self.record_subscription(EventStream::CrosshairMove, false);
    }

    fn subscribe_size_change(&self, handler: SizeChangeHandler) {
        self.subscriptions.borrow_mut().size_change.push(handler);
        self.record_subscription(EventStream::TimeScaleSizeChange, true);
    }

    fn unsubscribe_size_change(&self, handler: &SizeChangeHandler) {
        remove_registration(&mut self.subscriptions.borrow_mut().size_change, handler);
        self.record_subscription(EventStream::TimeScaleSizeChange, false);
    }

    fn subscribe_visible_time_range_change(&self, handler: TimeRangeChangeHandler) {
        self.subscriptions
            .borrow_mut()
            .visible_time_range
            .push(handler);
        self.record_subscription(EventStream::VisibleTimeRangeChange, true);
    }

    fn unsubscribe_visible_time_range_change(&self, handler: &TimeRangeChangeHandler) {
        remove_registration(
            &mut self.subscriptions.borrow_mut().visible_time_range,
            handler,
        );
        self.record_subscription(EventStream::VisibleTimeRangeChange, false);
    }

    fn subscribe_visible_logical_range_change(&self, handler: LogicalRangeChangeHandler) {
        self.subscriptions
            .borrow_mut()
            .visible_logical_range
            .push(handler);
        self.record_subscription(EventStream::VisibleLogicalRangeChange, true);
    }

    fn unsubscribe_visible_logical_range_change(&self, handler: &LogicalRangeChangeHandler) {
        remove_registration(
            &mut self.subscriptions.borrow_mut().visible_logical_range,
            handler,
        );
        self.record_subscription(EventStream::VisibleLogicalRangeChange, false);
    }
}

#[derive(Debug)]
pub struct RecordingSeries {
    id: SeriesId,
    kind: SeriesKind,
    journal: Rc<Journal>,
    removed: Cell<bool>,
    options: RefCell<SeriesOptions>,
    data: RefCell<Vec<SeriesDataItem>>,
    markers: RefCell<Vec<SeriesMarker>>,
    price_lines: RefCell<Vec<Rc<RecordingPriceLine>>>,
}

impl RecordingSeries {
    fn new(journal: Rc<Journal>, kind: SeriesKind, options: SeriesOptions) -> Self {
        Self {
            id: SeriesId::new(journal.allocate_id()),
            kind,
            journal,
            removed: Cell::new(false),
            options: RefCell::new(options),
            data: RefCell::new(Vec::new()),
            markers: RefCell::new(Vec::new()),
            price_lines: RefCell::new(Vec::new()),
        }
    }

    fn mark_removed(&self) {
        self.removed.set(true);
        self.price_lines.borrow_mut().clear();
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed.get()
    }

    #[must_use]
    pub fn data(&self) -> Vec<SeriesDataItem> {
        self.data.borrow().clone()
    }

    #[must_use]
    pub fn markers(&self) -> Vec<SeriesMarker> {
        self.markers.borrow().clone()
    }

    #[must_use]
    pub fn options(&self) -> SeriesOptions {
        self.options.borrow().clone()
    }

    #[must_use]
    pub fn price_line_options(&self) -> Vec<PriceLineOptions> {
        self.price_lines
            .borrow()
            .iter()
            .map(|line| line.options.borrow().clone())
            .collect()
    }
}

impl SeriesApi for RecordingSeries {
    fn id(&self) -> SeriesId {
        self.id
    }

    fn kind(&self) -> SeriesKind {
        self.kind
    }

    fn set_data(&self, data: &[SeriesDataItem]) {
        *self.data.borrow_mut() = data.to_vec();
        self.journal.record(EngineCall::SetData {
            series: self.id,
            data: data.to_vec(),
        });
    }

    fn update(&self, item: &SeriesDataItem) {
        {
            let mut data = self.data.borrow_mut();
            match data.last_mut() {
                Some(last) if last.time() == item.time() => *last = item.clone(),
                _ => data.push(item.clone()),
            }
        }
        self.journal.record(EngineCall::Update {
            series: self.id,
            item: item.clone(),
        });
    }

    fn set_markers(&self, markers: &[SeriesMarker]) {
        *self.markers.borrow_mut() = markers.to_vec();
        self.journal.record(EngineCall::SetMarkers {
            series: self.id,
            markers: markers.to_vec(),
        });
    }

    fn apply_options(&self, options: &SeriesOptions) {
        self.options.borrow_mut().merge(options);
        self.journal.record(EngineCall::ApplySeriesOptions {
            series: self.id,
            options: options.clone(),
        });
    }

    fn create_price_line(&self, options: &PriceLineOptions) -> BindingResult<PriceLineHandle> {
        if self.removed.get() {
            return Err(BindingError::NotReady {
                kind: HandleKind::PriceLine,
            });
        }
        let line = Rc::new(RecordingPriceLine {
            id: self.journal.allocate_id(),
            journal: Rc::clone(&self.journal),
            options: RefCell::new(options.clone()),
        });
        self.journal.record(EngineCall::CreatePriceLine {
            series: self.id,
            line: line.id,
            options: options.clone(),
        });
        self.price_lines.borrow_mut().push(Rc::clone(&line));
        Ok(line)
    }

    fn remove_price_line(&self, line: &PriceLineHandle) -> BindingResult<()> {
        let target = line.id();
        let position = self
            .price_lines
            .borrow()
            .iter()
            .position(|entry| entry.id == target);
        let Some(position) = position.filter(|_| !self.removed.get()) else {
            return Err(BindingError::DoubleRemoval {
                kind: HandleKind::PriceLine,
            });
        };
        self.price_lines.borrow_mut().remove(position);
        self.journal.record(EngineCall::RemovePriceLine {
            series: self.id,
            line: target,
        });
        Ok(())
    }
}

#[derive(Debug)]
pub struct RecordingPriceLine {
    id: u64,
    journal: Rc<Journal>,
    options: RefCell<PriceLineOptions>,
}

impl PriceLineApi for RecordingPriceLine {
    fn id(&self) -> u64 {
        self.id
    }

    fn apply_options(&self, options: &PriceLineOptions) {
        *self.options.borrow_mut() = options.clone();
        self.journal.record(EngineCall::ApplyPriceLineOptions {
            line: self.id,
            options: options.clone(),
        });
    }
}
