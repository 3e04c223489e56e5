use std::rc::Rc;

use chart_binding::api::{
    ChartHost, ChartHostConfig, ChartHostProps, SeriesBinding, SeriesProps, TaskQueue,
};
use chart_binding::core::{
    MarkerPosition, MarkerShape, OhlcData, SeriesDataItem, SeriesKind, SeriesMarker,
    SeriesOptions, Size,
};
use chart_binding::engine::{EngineCall, RecordingEngine};
use chart_binding::platform::Platform;
use chart_binding::platform::headless::HeadlessElement;

fn host(engine: &Rc<RecordingEngine>) -> ChartHost {
    ChartHost::new(
        engine.clone(),
        Platform::new(),
        TaskQueue::new(),
        ChartHostProps::new(ChartHostConfig::new().with_size(800, 400)),
    )
}

fn container() -> Rc<HeadlessElement> {
    HeadlessElement::new(Size::new(800.0, 400.0))
}

fn line_data(len: i64) -> Rc<[SeriesDataItem]> {
    (1..=len)
        .map(|time| SeriesDataItem::value(time, time as f64 * 1.5))
        .collect::<Vec<_>>()
        .into()
}

fn count(engine: &RecordingEngine, predicate: impl Fn(&EngineCall) -> bool) -> usize {
    engine.count_calls(predicate)
}

#[test]
fn creation_waits_for_a_chart() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    let series = SeriesBinding::mount(SeriesKind::Line, host.scope(), SeriesProps::new())
        .expect("mount without chart");
    assert!(series.series().is_none());
    assert_eq!(count(&engine, |call| matches!(call, EngineCall::AddSeries { .. })), 0);

    host.mount(container()).expect("host mount");

    assert!(series.series().is_some());
    assert!(series.scope().get().series().is_some());
    assert_eq!(count(&engine, |call| matches!(call, EngineCall::AddSeries { .. })), 1);
}

#[test]
fn creation_pushes_data_and_markers_once() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    let series = SeriesBinding::mount(SeriesKind::Area, host.scope(), SeriesProps::new())
        .expect("mount");
    let handle = series.series().expect("series");

    let calls = engine.calls();
    assert!(calls.contains(&EngineCall::SetData {
        series: handle.id(),
        data: Vec::new()
    }));
    assert!(calls.contains(&EngineCall::SetMarkers {
        series: handle.id(),
        markers: Vec::new()
    }));
    assert_eq!(count(&engine, |call| matches!(call, EngineCall::Update { .. })), 0);
}

#[test]
fn data_is_replaced_only_on_reference_change() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    let data = line_data(10);
    let mut series = SeriesBinding::mount(
        SeriesKind::Line,
        host.scope(),
        SeriesProps::new().with_data(Rc::clone(&data)),
    )
    .expect("mount");

    series
        .update(SeriesProps::new().with_data(Rc::clone(&data)))
        .expect("same reference");
    engine.clear_calls();

    let data2 = line_data(10);
    series
        .update(SeriesProps::new().with_data(Rc::clone(&data2)))
        .expect("new reference");

    let id = series.series().expect("series").id();
    assert_eq!(
        engine.calls(),
        vec![EngineCall::SetData {
            series: id,
            data: data2.to_vec()
        }]
    );
    assert_eq!(count(&engine, |call| matches!(call, EngineCall::Update { .. })), 0);
}

#[test]
fn latest_item_goes_through_incremental_update() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    let data = line_data(10);
    let mut series = SeriesBinding::mount(
        SeriesKind::Line,
        host.scope(),
        SeriesProps::new().with_data(Rc::clone(&data)),
    )
    .expect("mount");
    engine.clear_calls();

    let props = SeriesProps::new()
        .with_data(Rc::clone(&data))
        .with_latest_item(SeriesDataItem::value(11_i64, 5.0));
    series.update(props.clone()).expect("latest item");
    series.update(props).expect("unchanged latest item");

    assert_eq!(count(&engine, |call| matches!(call, EngineCall::Update { .. })), 1);
    assert_eq!(count(&engine, |call| matches!(call, EngineCall::SetData { .. })), 0);

    let recorded = engine
        .last_chart()
        .expect("chart")
        .series()
        .first()
        .expect("series")
        .data();
    assert_eq!(recorded.len(), 11);
    assert_eq!(recorded.last(), Some(&SeriesDataItem::value(11_i64, 5.0)));
}

#[test]
fn options_change_applies_without_recreation() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    let blue = SeriesOptions::new().with("color", "blue");
    let mut series = SeriesBinding::mount(
        SeriesKind::Histogram,
        host.scope(),
        SeriesProps::new().with_options(blue.clone()),
    )
    .expect("mount");
    series
        .update(SeriesProps::new().with_options(blue))
        .expect("equal options");
    series
        .update(SeriesProps::new().with_options(SeriesOptions::new().with("color", "red")))
        .expect("changed options");

    assert_eq!(count(&engine, |call| matches!(call, EngineCall::AddSeries { .. })), 1);
    assert_eq!(
        count(&engine, |call| matches!(call, EngineCall::ApplySeriesOptions { .. })),
        1
    );
}

#[test]
fn markers_follow_their_own_replacement_path() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    let data = line_data(3);
    let markers: Rc<[SeriesMarker]> = vec![
        SeriesMarker::new(2_i64, MarkerPosition::AboveBar, MarkerShape::ArrowDown, "#f00")
            .with_id("exit-2")
            .with_text("sell"),
    ]
    .into();
    let mut series = SeriesBinding::mount(
        SeriesKind::Line,
        host.scope(),
        SeriesProps::new().with_data(Rc::clone(&data)),
    )
    .expect("mount");
    engine.clear_calls();

    series
        .update(
            SeriesProps::new()
                .with_data(Rc::clone(&data))
                .with_markers(Rc::clone(&markers)),
        )
        .expect("markers");

    assert_eq!(count(&engine, |call| matches!(call, EngineCall::SetMarkers { .. })), 1);
    assert_eq!(count(&engine, |call| matches!(call, EngineCall::SetData { .. })), 0);
    let recording = engine.last_chart().expect("chart").series()[0].clone();
    assert_eq!(recording.markers(), markers.to_vec());
    assert_eq!(recording.markers()[0].id.as_deref(), Some("exit-2"));
}

#[test]
fn chart_switch_moves_the_series_to_the_new_chart() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    let series = SeriesBinding::mount(SeriesKind::Candlestick, host.scope(), SeriesProps::new())
        .expect("mount");
    let first = series.series().expect("first series");

    host.mount(container()).expect("container swap");
    let second = series.series().expect("second series");

    assert_ne!(first.id(), second.id());
    assert_eq!(count(&engine, |call| matches!(call, EngineCall::AddSeries { .. })), 2);
    let charts = engine.charts();
    assert_eq!(charts.len(), 2);
    assert_eq!(charts[1].series().len(), 1);
}

#[test]
fn teardown_after_the_chart_is_gone_is_silent() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    let mut series = SeriesBinding::mount(SeriesKind::Bar, host.scope(), SeriesProps::new())
        .expect("mount");
    let scope = series.scope();
    assert!(scope.get().series().is_some());

    host.unmount().expect("host first");
    series.unmount().expect("double removal is swallowed");
    assert_eq!(count(&engine, |call| matches!(call, EngineCall::RemoveSeries { .. })), 0);
    assert!(scope.get().series().is_none());
    assert!(series.series().is_none());
}

#[test]
fn unmount_removes_the_series_exactly_once() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    {
        let mut series =
            SeriesBinding::mount(SeriesKind::Baseline, host.scope(), SeriesProps::new())
                .expect("mount");
        series.unmount().expect("unmount");
    }
    assert_eq!(count(&engine, |call| matches!(call, EngineCall::RemoveSeries { .. })), 1);
    assert!(engine.last_chart().expect("chart").series().is_empty());
}

#[test]
fn every_series_kind_can_be_bound() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    let kinds = [
        SeriesKind::Area,
        SeriesKind::Bar,
        SeriesKind::Baseline,
        SeriesKind::Candlestick,
        SeriesKind::Histogram,
        SeriesKind::Line,
    ];
    let bindings: Vec<SeriesBinding> = kinds
        .iter()
        .map(|kind| SeriesBinding::mount(*kind, host.scope(), SeriesProps::new()).expect("mount"))
        .collect();

    let created: Vec<SeriesKind> = engine
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            EngineCall::AddSeries { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(created, kinds.to_vec());
    assert!(bindings.iter().zip(kinds).all(|(binding, kind)| binding.kind() == kind));
}

#[test]
fn ohlc_items_reach_the_engine_unchanged() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = host(&engine);
    host.mount(container()).expect("host mount");

    let bars: Rc<[SeriesDataItem]> = vec![
        OhlcData::new(1_i64, 10.0, 12.0, 9.5, 11.0).into(),
        OhlcData::new(2_i64, 11.0, 13.0, 10.0, 12.5).into(),
    ]
    .into();
    let _series = SeriesBinding::mount(
        SeriesKind::Candlestick,
        host.scope(),
        SeriesProps::new().with_data(Rc::clone(&bars)),
    )
    .expect("mount");

    let recording = engine.last_chart().expect("chart").series()[0].clone();
    assert_eq!(recording.data(), bars.to_vec());
}
