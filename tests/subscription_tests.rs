use std::cell::RefCell;
use std::rc::Rc;

use chart_binding::api::{
    ChartHost, ChartHostConfig, ChartHostProps, ChartSubscriber, SeriesBinding, SeriesHoverHandler,
    SeriesHoverSubscriber, SeriesProps, TaskQueue,
};
use chart_binding::core::{
    LogicalRange, MouseEventParams, Point, SeriesKind, SeriesValue, Size, TimeRange,
};
use chart_binding::engine::{
    ChartHandle, Click, CrosshairMove, EngineCall, EventHandler, EventStream, RecordingEngine,
    SeriesHandle, VisibleLogicalRangeChange, VisibleTimeRangeChange,
};
use chart_binding::platform::Platform;
use chart_binding::platform::headless::HeadlessElement;

fn mounted_host(engine: &Rc<RecordingEngine>) -> ChartHost {
    let mut host = ChartHost::new(
        engine.clone(),
        Platform::new(),
        TaskQueue::new(),
        ChartHostProps::new(ChartHostConfig::new().with_size(500, 250)),
    );
    host.mount(HeadlessElement::new(Size::new(500.0, 250.0)))
        .expect("host mount");
    host
}

#[test]
fn subscriber_follows_handler_identity() {
    let engine = Rc::new(RecordingEngine::new());
    let host = mounted_host(&engine);
    let chart = engine.last_chart().expect("chart");

    let hits = Rc::new(RefCell::new(Vec::new()));
    let first_hits = Rc::clone(&hits);
    let first = EventHandler::new(move |_: &MouseEventParams| first_hits.borrow_mut().push(1));
    let second_hits = Rc::clone(&hits);
    let second = EventHandler::new(move |_: &MouseEventParams| second_hits.borrow_mut().push(2));

    let mut subscriber = ChartSubscriber::<Click>::mount(host.scope(), first.clone());
    subscriber.update(first.clone());
    subscriber.refresh();
    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::Subscribe { .. })),
        1
    );

    subscriber.update(second);
    assert_eq!(chart.subscriber_count(EventStream::Click), 1);
    chart.emit_click(&MouseEventParams::outside());
    assert_eq!(*hits.borrow(), vec![2]);

    subscriber.unmount();
    assert!(!subscriber.is_subscribed());
    chart.emit_click(&MouseEventParams::outside());
    assert_eq!(*hits.borrow(), vec![2]);
}

#[test]
fn subscriber_waits_for_the_chart_and_follows_swaps() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = ChartHost::new(
        engine.clone(),
        Platform::new(),
        TaskQueue::new(),
        ChartHostProps::new(ChartHostConfig::new().with_size(500, 250)),
    );
    let ranges = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&ranges);
    let handler = EventHandler::new(move |range: &Option<LogicalRange>| {
        sink.borrow_mut().push(*range);
    });

    let subscriber = ChartSubscriber::<VisibleLogicalRangeChange>::mount(host.scope(), handler);
    assert!(!subscriber.is_subscribed());

    host.mount(HeadlessElement::new(Size::new(500.0, 250.0)))
        .expect("mount");
    assert!(subscriber.is_subscribed());

    host.mount(HeadlessElement::new(Size::new(500.0, 250.0)))
        .expect("swap");
    let charts = engine.charts();
    assert_eq!(charts[0].subscriber_count(EventStream::VisibleLogicalRangeChange), 0);
    assert_eq!(charts[1].subscriber_count(EventStream::VisibleLogicalRangeChange), 1);

    charts[1].emit_visible_logical_range_change(Some(LogicalRange { from: 0.5, to: 9.5 }));
    assert_eq!(
        *ranges.borrow(),
        vec![Some(LogicalRange { from: 0.5, to: 9.5 })]
    );
}

#[test]
fn destroyed_chart_is_still_unsubscribed_exactly_once() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = mounted_host(&engine);
    let handler = EventHandler::new(|_: &Option<TimeRange>| {});
    let mut subscriber = ChartSubscriber::<VisibleTimeRangeChange>::mount(host.scope(), handler);

    host.unmount().expect("host unmount");
    assert!(!subscriber.is_subscribed());
    subscriber.unmount();

    let chart = engine.last_chart().expect("chart").id();
    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::Unsubscribe { .. })),
        1
    );
    assert!(engine.calls().contains(&EngineCall::Unsubscribe {
        chart,
        stream: EventStream::VisibleTimeRangeChange,
    }));
}

#[test]
fn series_hover_reports_the_value_of_its_own_series() {
    let engine = Rc::new(RecordingEngine::new());
    let host = mounted_host(&engine);
    let series = SeriesBinding::mount(SeriesKind::Line, host.scope(), SeriesProps::new())
        .expect("series");
    let other = SeriesBinding::mount(SeriesKind::Line, host.scope(), SeriesProps::new())
        .expect("other series");

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let handler: SeriesHoverHandler = Rc::new(
        move |value: Option<SeriesValue>,
              _event: &MouseEventParams,
              series: &SeriesHandle,
              chart: &ChartHandle| {
            assert!(chart.is_alive());
            sink.borrow_mut().push((value, series.id()));
        },
    );
    let hover = SeriesHoverSubscriber::mount(host.scope(), series.scope(), handler);
    assert!(hover.is_subscribed());

    let own = series.series().expect("own").id();
    let foreign = other.series().expect("other").id();
    let chart = engine.last_chart().expect("chart");
    chart.emit_crosshair_move(
        &MouseEventParams::at(3_i64, Point::new(10.0, 10.0))
            .with_series_value(own, SeriesValue::Price(42.0))
            .with_series_value(foreign, SeriesValue::Price(7.0)),
    );
    chart.emit_crosshair_move(&MouseEventParams::outside());

    assert_eq!(
        *seen.borrow(),
        vec![(Some(SeriesValue::Price(42.0)), own), (None, own)]
    );
}

#[test]
fn series_hover_is_inactive_without_a_series() {
    let engine = Rc::new(RecordingEngine::new());
    let host = mounted_host(&engine);
    let mut series = SeriesBinding::mount(SeriesKind::Area, host.scope(), SeriesProps::new())
        .expect("series");

    let handler: SeriesHoverHandler = Rc::new(
        |_: Option<SeriesValue>, _: &MouseEventParams, _: &SeriesHandle, _: &ChartHandle| {},
    );
    let mut hover = SeriesHoverSubscriber::mount(host.scope(), series.scope(), handler.clone());
    assert!(hover.is_subscribed());

    hover.update(handler);
    assert_eq!(
        engine.count_calls(|call| matches!(
            call,
            EngineCall::Subscribe {
                stream: EventStream::CrosshairMove,
                ..
            }
        )),
        1
    );

    series.unmount().expect("series unmount");
    assert!(!hover.is_subscribed());
    let chart = engine.last_chart().expect("chart");
    assert_eq!(chart.subscriber_count(EventStream::CrosshairMove), 0);
}

#[test]
fn duplicate_subscribers_on_one_chart_are_tolerated() {
    let engine = Rc::new(RecordingEngine::new());
    let host = mounted_host(&engine);
    let handler = EventHandler::new(|_: &MouseEventParams| {});

    let first = ChartSubscriber::<CrosshairMove>::mount(host.scope(), handler.clone());
    let second = ChartSubscriber::<CrosshairMove>::mount(host.scope(), handler);
    assert!(first.is_subscribed() && second.is_subscribed());
    assert_eq!(
        engine
            .last_chart()
            .expect("chart")
            .subscriber_count(EventStream::CrosshairMove),
        2
    );
}
