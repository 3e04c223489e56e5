use std::rc::Rc;

use chart_binding::api::{
    ChartHost, ChartHostConfig, ChartHostProps, SeriesBinding, SeriesProps, TaskQueue,
    TOOLTIP_GAP_ABOVE, TOOLTIP_OFFSET_BELOW, format_translate, tooltip_position,
};
use chart_binding::core::{ChartOptions, Point, SeriesDataItem, SeriesKind, Size};
use chart_binding::engine::{EngineCall, RecordingEngine};
use chart_binding::platform::Platform;
use chart_binding::platform::headless::HeadlessElement;
use proptest::prelude::*;

fn host_with_font_size(engine: &Rc<RecordingEngine>, font_size: u8) -> ChartHost {
    ChartHost::new(
        engine.clone(),
        Platform::new(),
        TaskQueue::new(),
        props_with_font_size(font_size),
    )
}

fn props_with_font_size(font_size: u8) -> ChartHostProps {
    ChartHostProps::new(
        ChartHostConfig::new()
            .with_size(320, 200)
            .with_options(ChartOptions::new().with("layout.fontSize", font_size)),
    )
}

fn dataset(len: usize, offset: f64) -> Rc<[SeriesDataItem]> {
    (0..len as i64)
        .map(|time| SeriesDataItem::value(time, offset + time as f64))
        .collect::<Vec<_>>()
        .into()
}

proptest! {
    #[test]
    fn tooltip_x_stays_inside_the_plot_area_when_it_fits(
        point_x in -200.0f64..1_200.0,
        point_y in 0.0f64..600.0,
        overlay_width in 0.0f64..200.0,
        overlay_height in 0.0f64..120.0,
        padding_left in 0.0f64..80.0,
        padding_right in 0.0f64..80.0,
        slack in 0.0f64..800.0
    ) {
        let container_width = padding_left + padding_right + overlay_width + slack;
        let position = tooltip_position(
            Point::new(point_x, point_y),
            Size::new(overlay_width, overlay_height),
            container_width,
            padding_left,
            padding_right,
        );

        prop_assert!(position.x >= padding_left);
        prop_assert!(position.x <= container_width - padding_right - overlay_width + 1e-9);
    }

    #[test]
    fn tooltip_flips_below_only_when_above_would_leave_the_container(
        point_y in -50.0f64..600.0,
        overlay_height in 0.0f64..120.0
    ) {
        let position = tooltip_position(
            Point::new(100.0, point_y),
            Size::new(40.0, overlay_height),
            800.0,
            0.0,
            0.0,
        );

        let above = point_y - overlay_height - TOOLTIP_GAP_ABOVE;
        if above >= 0.0 {
            prop_assert_eq!(position.y, above);
        } else {
            prop_assert_eq!(position.y, point_y + TOOLTIP_OFFSET_BELOW);
        }
    }

    #[test]
    fn translate_never_renders_negative_zero(x in -1.0f64..1.0, y in -1.0f64..1.0) {
        let rendered = format_translate(Point::new(x * 0.0, y * 0.0));
        prop_assert_eq!(rendered, "translate(0px, 0px)");
    }

    #[test]
    fn option_updates_never_recreate_the_chart(
        font_sizes in prop::collection::vec(8u8..16, 1..24)
    ) {
        let engine = Rc::new(RecordingEngine::new());
        let mut host = host_with_font_size(&engine, font_sizes[0]);
        host.mount(HeadlessElement::new(Size::new(320.0, 200.0))).expect("mount");
        for font_size in &font_sizes[1..] {
            host.update(props_with_font_size(*font_size)).expect("update");
        }

        let changes = font_sizes.windows(2).filter(|pair| pair[0] != pair[1]).count();
        prop_assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::CreateChart { .. })),
            1
        );
        prop_assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::ApplyChartOptions { .. })),
            changes
        );

        host.unmount().expect("unmount");
        drop(host);
        prop_assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::RemoveChart { .. })),
            1
        );
    }

    #[test]
    fn set_data_runs_once_per_distinct_data_reference(
        swaps in prop::collection::vec(any::<bool>(), 0..32),
        len in 0usize..16
    ) {
        let engine = Rc::new(RecordingEngine::new());
        let mut host = host_with_font_size(&engine, 12);
        host.mount(HeadlessElement::new(Size::new(320.0, 200.0))).expect("mount");

        let mut data = dataset(len, 0.0);
        let mut series = SeriesBinding::mount(
            SeriesKind::Line,
            host.scope(),
            SeriesProps::new().with_data(Rc::clone(&data)),
        )
        .expect("series");

        for (step, swap) in swaps.iter().enumerate() {
            if *swap {
                // Equal content under a new reference still counts as new data.
                data = dataset(len, if step % 2 == 0 { 0.0 } else { 1.0 });
            }
            series
                .update(SeriesProps::new().with_data(Rc::clone(&data)))
                .expect("update");
        }

        let expected = 1 + swaps.iter().filter(|swap| **swap).count();
        prop_assert_eq!(
            engine.count_calls(|call| matches!(call, EngineCall::SetData { .. })),
            expected
        );
    }
}
