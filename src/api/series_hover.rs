use std::cell::RefCell;
use std::rc::Rc;

use crate::core::{MouseEventParams, SeriesValue};
use crate::engine::{ChartHandle, CrosshairMove, MouseEventHandler, SeriesHandle, same_chart};
use crate::error::BindingResult;

use super::scope::refresh_on_publish;
use super::{ChartScope, ScopeConsumer, ScopeWatch, SeriesScope, SubscriptionBridge};

/// Receives the hovered value of one series along with the raw event.
pub type SeriesHoverHandler =
    Rc<dyn Fn(Option<SeriesValue>, &MouseEventParams, &SeriesHandle, &ChartHandle)>;

struct Bound {
    chart: ChartHandle,
    series: SeriesHandle,
    handler: SeriesHoverHandler,
}

struct HoverState {
    chart_scope: ScopeConsumer<ChartScope>,
    series_scope: ScopeConsumer<SeriesScope>,
    handler: SeriesHoverHandler,
    bound: Option<Bound>,
    listener: Option<MouseEventHandler>,
    bridge: SubscriptionBridge<CrosshairMove>,
}

/// Crosshair subscriber scoped to one series.
///
/// Active only while both the chart and the series exist; any change of
/// chart, series or handler replaces the registration. Both scopes are
/// watched, so the registration follows them without outside calls.
pub struct SeriesHoverSubscriber {
    state: Rc<RefCell<HoverState>>,
    watches: Vec<ScopeWatch>,
}

impl SeriesHoverSubscriber {
    #[must_use]
    pub fn mount(
        chart_scope: ScopeConsumer<ChartScope>,
        series_scope: ScopeConsumer<SeriesScope>,
        handler: SeriesHoverHandler,
    ) -> Self {
        let state = Rc::new(RefCell::new(HoverState {
            chart_scope: chart_scope.clone(),
            series_scope: series_scope.clone(),
            handler,
            bound: None,
            listener: None,
            bridge: SubscriptionBridge::new(),
        }));
        let refresh = |state: &mut HoverState| -> BindingResult<()> {
            state.refresh();
            Ok(())
        };
        let watches = vec![
            refresh_on_publish(&chart_scope, &state, "series-hover", refresh),
            refresh_on_publish(&series_scope, &state, "series-hover", refresh),
        ];
        state.borrow_mut().refresh();
        Self {
            state,
            watches,
        }
    }

    pub fn update(&mut self, handler: SeriesHoverHandler) {
        let mut state = self.state.borrow_mut();
        state.handler = handler;
        state.refresh();
    }

    pub fn refresh(&mut self) {
        self.state.borrow_mut().refresh();
    }

    pub fn unmount(&mut self) {
        self.watches.clear();
        let mut state = self.state.borrow_mut();
        state.bridge.release();
        state.bound = None;
        state.listener = None;
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().bridge.is_subscribed()
    }
}

impl HoverState {
    fn refresh(&mut self) {
        let chart = self.chart_scope.with(|scope| scope.chart.clone());
        let series = self.series_scope.with(|scope| scope.series.clone());

        let unchanged = match (&self.bound, &chart, &series) {
            (Some(bound), Some(chart), Some(series)) => {
                same_chart(Some(&bound.chart), Some(chart))
                    && std::ptr::addr_eq(Rc::as_ptr(&bound.series), Rc::as_ptr(series))
                    && std::ptr::addr_eq(Rc::as_ptr(&bound.handler), Rc::as_ptr(&self.handler))
            }
            (None, _, _) => chart.is_none() || series.is_none(),
            _ => false,
        };
        if unchanged {
            return;
        }

        self.bridge.release();
        self.bound = None;
        self.listener = None;
        let (Some(chart), Some(series)) = (chart, series) else {
            return;
        };

        let listener = {
            let chart = chart.clone();
            let series = Rc::clone(&series);
            let handler = Rc::clone(&self.handler);
            MouseEventHandler::new(move |event| {
                handler(event.series_value(series.id()), event, &series, &chart);
            })
        };
        self.bridge.sync(Some(&chart), Some(&listener));
        self.listener = Some(listener);
        self.bound = Some(Bound {
            chart,
            series,
            handler: Rc::clone(&self.handler),
        });
    }
}
