use std::rc::Rc;

use chart_binding::api::{
    ChartHost, ChartHostConfig, ChartHostProps, PriceLineBinding, ScopeConsumer, ScopeProvider,
    SeriesBinding, SeriesProps, SeriesScope, TaskQueue,
};
use chart_binding::core::{LineStyle, PriceLineOptions, SeriesKind, Size};
use chart_binding::engine::{EngineCall, RecordingEngine};
use chart_binding::platform::Platform;
use chart_binding::platform::headless::HeadlessElement;

fn mounted_series(engine: &Rc<RecordingEngine>) -> (ChartHost, SeriesBinding) {
    let mut host = ChartHost::new(
        engine.clone(),
        Platform::new(),
        TaskQueue::new(),
        ChartHostProps::new(ChartHostConfig::new().with_size(600, 300)),
    );
    host.mount(HeadlessElement::new(Size::new(600.0, 300.0)))
        .expect("host mount");
    let series = SeriesBinding::mount(SeriesKind::Line, host.scope(), SeriesProps::new())
        .expect("series mount");
    (host, series)
}

#[test]
fn first_update_with_a_series_creates_the_line() {
    let engine = Rc::new(RecordingEngine::new());
    let (_host, series) = mounted_series(&engine);

    let options = PriceLineOptions::at_price(101.5).with_title("entry");
    let line = PriceLineBinding::mount(series.scope(), options.clone()).expect("mount");

    assert!(line.price_line().is_some());
    let recording = engine.last_chart().expect("chart").series()[0].clone();
    assert_eq!(recording.price_line_options(), vec![options]);
}

#[test]
fn every_update_reapplies_options() {
    let engine = Rc::new(RecordingEngine::new());
    let (_host, series) = mounted_series(&engine);

    let options = PriceLineOptions::at_price(50.0).with_color("#26a69a");
    let mut line = PriceLineBinding::mount(series.scope(), options.clone()).expect("mount");
    line.update(options.clone()).expect("same options");
    line.update(options.with_line_style(LineStyle::Dashed))
        .expect("changed options");

    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::CreatePriceLine { .. })),
        1
    );
    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::ApplyPriceLineOptions { .. })),
        2
    );
    let recording = engine.last_chart().expect("chart").series()[0].clone();
    assert_eq!(
        recording.price_line_options()[0].line_style,
        LineStyle::Dashed
    );
}

#[test]
fn without_a_series_the_binding_stays_empty() {
    let scope = ScopeConsumer::detached(SeriesScope::default());
    let mut line =
        PriceLineBinding::mount(scope, PriceLineOptions::at_price(1.0)).expect("mount");
    line.update(PriceLineOptions::at_price(2.0)).expect("update");
    assert!(line.price_line().is_none());
    line.unmount().expect("unmount");
}

#[test]
fn unmount_removes_the_line_once() {
    let engine = Rc::new(RecordingEngine::new());
    let (_host, series) = mounted_series(&engine);

    let mut line =
        PriceLineBinding::mount(series.scope(), PriceLineOptions::at_price(10.0)).expect("mount");
    line.unmount().expect("unmount");
    line.unmount().expect("second unmount");
    drop(line);

    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::RemovePriceLine { .. })),
        1
    );
}

#[test]
fn removal_after_the_series_is_gone_is_swallowed() {
    let engine = Rc::new(RecordingEngine::new());
    let (_host, mut series) = mounted_series(&engine);

    let mut line =
        PriceLineBinding::mount(series.scope(), PriceLineOptions::at_price(10.0)).expect("mount");
    series.unmount().expect("series first");
    line.unmount().expect("double removal is swallowed");

    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::RemovePriceLine { .. })),
        0
    );
}

#[test]
fn series_recreation_moves_the_line() {
    let engine = Rc::new(RecordingEngine::new());
    let (mut host, series) = mounted_series(&engine);

    let line =
        PriceLineBinding::mount(series.scope(), PriceLineOptions::at_price(10.0)).expect("mount");
    let first = line.price_line().expect("first line").id();

    host.mount(HeadlessElement::new(Size::new(600.0, 300.0)))
        .expect("container swap");

    let second = line.price_line().expect("second line").id();
    assert_ne!(first, second);
    let recording = engine.last_chart().expect("new chart").series()[0].clone();
    assert_eq!(recording.price_line_options().len(), 1);
}

#[test]
fn series_removed_with_its_chart_defers_the_line() {
    let engine = Rc::new(RecordingEngine::new());
    let (mut host, series) = mounted_series(&engine);
    let stale = series.series().expect("series");

    host.unmount().expect("host first");
    assert!(series.scope().get().series().is_none());

    let provider = ScopeProvider::new(SeriesScope {
        series: Some(stale),
    });
    let line = PriceLineBinding::mount(provider.consumer(), PriceLineOptions::at_price(3.0))
        .expect("not ready is recovered");

    assert!(line.price_line().is_none());
    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::CreatePriceLine { .. })),
        0
    );
}

#[test]
fn a_different_series_with_an_equal_id_still_moves_the_line() {
    let first_engine = Rc::new(RecordingEngine::new());
    let second_engine = Rc::new(RecordingEngine::new());
    let (_first_host, first) = mounted_series(&first_engine);
    let (_second_host, second) = mounted_series(&second_engine);
    let first = first.series().expect("first series");
    let second = second.series().expect("second series");
    assert_eq!(first.id(), second.id());

    let provider = ScopeProvider::new(SeriesScope {
        series: Some(Rc::clone(&first)),
    });
    let line = PriceLineBinding::mount(provider.consumer(), PriceLineOptions::at_price(7.0))
        .expect("mount");
    provider.publish(SeriesScope {
        series: Some(Rc::clone(&second)),
    });

    assert!(line.price_line().is_some());
    assert_eq!(
        first_engine.count_calls(|call| matches!(call, EngineCall::RemovePriceLine { .. })),
        1
    );
    assert_eq!(
        second_engine.count_calls(|call| matches!(call, EngineCall::CreatePriceLine { .. })),
        1
    );
}

#[test]
fn line_is_created_once_its_series_is_published() {
    let engine = Rc::new(RecordingEngine::new());
    let mut host = ChartHost::new(
        engine.clone(),
        Platform::new(),
        TaskQueue::new(),
        ChartHostProps::new(ChartHostConfig::new().with_size(600, 300)),
    );
    let series = SeriesBinding::mount(SeriesKind::Line, host.scope(), SeriesProps::new())
        .expect("series mount");
    let line = PriceLineBinding::mount(series.scope(), PriceLineOptions::at_price(4.0))
        .expect("line mount");
    assert!(line.price_line().is_none());

    host.mount(HeadlessElement::new(Size::new(600.0, 300.0)))
        .expect("host mount");

    assert!(line.price_line().is_some());
    assert_eq!(
        engine.count_calls(|call| matches!(call, EngineCall::CreatePriceLine { .. })),
        1
    );
}
