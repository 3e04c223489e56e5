use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{MouseEventParams, Point, PriceScaleSide, Size};
use crate::engine::{ChartHandle, CrosshairMove, MouseEventHandler, SeriesHandle, same_chart};
use crate::error::BindingResult;
use crate::platform::{
    ElementRef, ObservationId, Platform, ResizeEntry, ResizeObservation, size_from_entry,
};

use super::scope::refresh_on_publish;
use super::{ChartScope, ScopeConsumer, ScopeWatch, SeriesScope, SubscriptionBridge};

/// Vertical gap kept between the crosshair point and the overlay above it.
pub const TOOLTIP_GAP_ABOVE: f64 = 8.0;
/// Offset used when the overlay flips below the crosshair point.
pub const TOOLTIP_OFFSET_BELOW: f64 = 20.0;

/// Style declarations every tooltip overlay starts from.
pub const DEFAULT_TOOLTIP_DECLARATIONS: [(&str, &str); 7] = [
    ("pointer-events", "none"),
    ("position", "absolute"),
    ("top", "0"),
    ("left", "0"),
    ("z-index", "10"),
    ("transition-duration", "150ms"),
    ("transition-timing-function", "ease-out"),
];

/// Everything a transform function may look at.
#[derive(Clone, Copy)]
pub struct TransformInput<'a> {
    pub chart: Option<&'a ChartHandle>,
    pub event: Option<&'a MouseEventParams>,
    pub container: Option<&'a ElementRef>,
    pub overlay_size: Size,
}

/// Returns the overlay transform, or `None` to keep the previous one.
pub type MakeTransform = Rc<dyn Fn(&TransformInput<'_>) -> Option<String>>;

/// Arguments of the tooltip content function.
pub struct TooltipContext<'a> {
    pub event: &'a MouseEventParams,
    pub chart: Option<&'a ChartHandle>,
    /// Present only when the tooltip lives under a series.
    pub series: Option<&'a SeriesHandle>,
}

pub type TooltipContent<C> = Rc<dyn Fn(&TooltipContext<'_>) -> C>;

/// Top-left overlay position for a crosshair `point`.
///
/// The overlay is centered horizontally on the point and clamped inside the
/// plot area between the two price scales. It sits above the point unless
/// that would leave the container, in which case it moves below.
#[must_use]
pub fn tooltip_position(
    point: Point,
    overlay: Size,
    container_width: f64,
    padding_left: f64,
    padding_right: f64,
) -> Point {
    let centered = point.x + padding_left - overlay.width / 2.0;
    let x = padding_left.max(centered.min(container_width - padding_right - overlay.width));
    let above = point.y - overlay.height - TOOLTIP_GAP_ABOVE;
    let y = if above < 0.0 {
        point.y + TOOLTIP_OFFSET_BELOW
    } else {
        above
    };
    Point::new(x, y)
}

#[must_use]
pub fn format_translate(position: Point) -> String {
    // `+ 0.0` folds negative zero so it never renders as "-0px".
    format!("translate({}px, {}px)", position.x + 0.0, position.y + 0.0)
}

/// Default positioning: above the crosshair, bounded by the chart box.
#[must_use]
pub fn default_make_transform(input: &TransformInput<'_>) -> Option<String> {
    let point = input.event.and_then(|event| event.point)?;
    let container = input.container?;
    let (padding_left, padding_right) = input.chart.map_or((0.0, 0.0), |chart| {
        (
            chart.price_scale_width(PriceScaleSide::Left),
            chart.price_scale_width(PriceScaleSide::Right),
        )
    });
    let position = tooltip_position(
        point,
        input.overlay_size,
        container.bounding_width(),
        padding_left,
        padding_right,
    );
    Some(format_translate(position))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TooltipVisibility {
    Hidden,
    Visible,
}

/// Computed overlay style.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipStyle {
    pub visibility: TooltipVisibility,
    pub transform: String,
    pub transition_property: &'static str,
    /// Final declarations: defaults, computed values, then caller overrides.
    pub declarations: IndexMap<String, String>,
}

impl TooltipStyle {
    fn compose(
        visibility: TooltipVisibility,
        transform: String,
        transition_property: &'static str,
        overrides: &IndexMap<String, String>,
    ) -> Self {
        let mut declarations: IndexMap<String, String> = DEFAULT_TOOLTIP_DECLARATIONS
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        let opacity = match visibility {
            TooltipVisibility::Hidden => "0",
            TooltipVisibility::Visible => "1",
        };
        declarations.insert("opacity".to_owned(), opacity.to_owned());
        declarations.insert("transform".to_owned(), transform.clone());
        declarations.insert(
            "transition-property".to_owned(),
            transition_property.to_owned(),
        );
        for (name, value) in overrides {
            declarations.insert(name.clone(), value.clone());
        }
        Self {
            visibility,
            transform,
            transition_property,
            declarations,
        }
    }

    /// Opacity as declared, caller overrides included.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.declarations
            .get("opacity")
            .and_then(|value| value.parse().ok())
            .unwrap_or(0.0)
    }

    #[must_use]
    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct TooltipProps<C> {
    pub content: Option<TooltipContent<C>>,
    /// `None` uses [`default_make_transform`].
    pub make_transform: Option<MakeTransform>,
    /// Caller declarations, applied over the computed ones.
    pub style: IndexMap<String, String>,
}

impl<C> TooltipProps<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            content: None,
            make_transform: None,
            style: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Fn(&TooltipContext<'_>) -> C + 'static) -> Self {
        self.content = Some(Rc::new(content));
        self
    }

    #[must_use]
    pub fn with_make_transform(
        mut self,
        make_transform: impl Fn(&TransformInput<'_>) -> Option<String> + 'static,
    ) -> Self {
        self.make_transform = Some(Rc::new(make_transform));
        self
    }

    #[must_use]
    pub fn with_style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(name.into(), value.into());
        self
    }
}

impl<C> Default for TooltipProps<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for TooltipProps<C> {
    fn clone(&self) -> Self {
        Self {
            content: self.content.clone(),
            make_transform: self.make_transform.clone(),
            style: self.style.clone(),
        }
    }
}

impl<C> fmt::Debug for TooltipProps<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TooltipProps")
            .field("content", &self.content.is_some())
            .field("make_transform", &self.make_transform.is_some())
            .field("style", &self.style)
            .finish()
    }
}

fn same_rc<T: ?Sized>(a: Option<&Rc<T>>, b: Option<&Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
        (None, None) => true,
        _ => false,
    }
}

struct TooltipState<C> {
    chart_scope: ScopeConsumer<ChartScope>,
    series_scope: Option<ScopeConsumer<SeriesScope>>,
    props: TooltipProps<C>,
    last_event: Option<MouseEventParams>,
    overlay_size: Size,
    /// Held across hidden states; only `reset_position` clears it.
    last_transform: String,
    style: TooltipStyle,
    content: Option<C>,
}

impl<C> TooltipState<C> {
    fn chart(&self) -> Option<ChartHandle> {
        self.chart_scope.with(|scope| scope.chart.clone())
    }

    fn series(&self) -> Option<SeriesHandle> {
        self.series_scope
            .as_ref()
            .and_then(|scope| scope.with(|scope| scope.series.clone()))
    }
}

/// Recomputes the overlay style from the current event and size.
///
/// User callbacks run with the state unborrowed.
fn restyle<C>(state: &RefCell<TooltipState<C>>) {
    let (event, overlay_size, make_transform, chart, container, previous) = {
        let state = state.borrow();
        (
            state.last_event.clone(),
            state.overlay_size,
            state.props.make_transform.clone(),
            state.chart(),
            state.chart_scope.with(|scope| scope.container.clone()),
            state.last_transform.clone(),
        )
    };

    let visible = event.as_ref().is_some_and(|event| event.time.is_some());
    let transform = if visible {
        let input = TransformInput {
            chart: chart.as_ref(),
            event: event.as_ref(),
            container: container.as_ref(),
            overlay_size,
        };
        let computed = match &make_transform {
            Some(make_transform) => make_transform(&input),
            None => default_make_transform(&input),
        };
        computed.unwrap_or_else(|| previous.clone())
    } else {
        previous.clone()
    };
    let transition_property = if previous.is_empty() {
        "opacity"
    } else {
        "transform,opacity"
    };
    let visibility = if visible {
        TooltipVisibility::Visible
    } else {
        TooltipVisibility::Hidden
    };

    let mut state = state.borrow_mut();
    state.last_transform = transform.clone();
    let style = TooltipStyle::compose(visibility, transform, transition_property, &state.props.style);
    trace!(?visibility, transform = %style.transform, "tooltip restyled");
    state.style = style;
}

fn recompute_content<C>(state: &RefCell<TooltipState<C>>) {
    let (event, content_fn, chart, series) = {
        let state = state.borrow();
        (
            state.last_event.clone(),
            state.props.content.clone(),
            state.chart(),
            state.series(),
        )
    };
    let content = match (event, content_fn) {
        (Some(event), Some(content_fn)) => Some(content_fn(&TooltipContext {
            event: &event,
            chart: chart.as_ref(),
            series: series.as_ref(),
        })),
        _ => None,
    };
    state.borrow_mut().content = content;
}

fn on_crosshair_move<C>(state: &RefCell<TooltipState<C>>, event: &MouseEventParams) {
    state.borrow_mut().last_event = Some(event.clone());
    recompute_content(state);
    restyle(state);
}

fn on_overlay_resize<C>(state: &RefCell<TooltipState<C>>, size: Size) {
    {
        let mut state = state.borrow_mut();
        if state.overlay_size == size {
            return;
        }
        state.overlay_size = size;
    }
    restyle(state);
}

/// Crosshair registration and the handles the content was last computed for.
struct TooltipLink<C> {
    state: Rc<RefCell<TooltipState<C>>>,
    handler: MouseEventHandler,
    bridge: SubscriptionBridge<CrosshairMove>,
    bound_chart: Option<ChartHandle>,
    bound_series: Option<SeriesHandle>,
}

impl<C> TooltipLink<C> {
    fn refresh(&mut self) {
        let (chart, series) = {
            let state = self.state.borrow();
            (state.chart(), state.series())
        };
        self.bridge.sync(chart.as_ref(), Some(&self.handler));

        let chart_changed = !same_chart(chart.as_ref(), self.bound_chart.as_ref());
        let series_changed = !same_rc(series.as_ref(), self.bound_series.as_ref());
        self.bound_chart = chart;
        self.bound_series = series;
        if chart_changed || series_changed {
            recompute_content(&self.state);
        }
        if chart_changed {
            restyle(&self.state);
        }
    }
}

/// Floating overlay following the crosshair.
///
/// `C` is whatever the content function renders to. The overlay element is
/// observed for size changes so its position stays bounded by the chart.
/// The chart scope and, when given, the series scope are watched.
pub struct Tooltip<C: 'static> {
    state: Rc<RefCell<TooltipState<C>>>,
    link: Rc<RefCell<TooltipLink<C>>>,
    overlay: ElementRef,
    observation: Option<(Rc<dyn ResizeObservation>, ObservationId)>,
    watches: Vec<ScopeWatch>,
}

impl<C: 'static> Tooltip<C> {
    #[must_use]
    pub fn mount(
        chart_scope: ScopeConsumer<ChartScope>,
        series_scope: Option<ScopeConsumer<SeriesScope>>,
        platform: &Platform,
        overlay: ElementRef,
        props: TooltipProps<C>,
    ) -> Self {
        let style = TooltipStyle::compose(
            TooltipVisibility::Hidden,
            String::new(),
            "opacity",
            &props.style,
        );
        let state = Rc::new(RefCell::new(TooltipState {
            chart_scope: chart_scope.clone(),
            series_scope: series_scope.clone(),
            props,
            last_event: None,
            overlay_size: overlay.content_size(),
            last_transform: String::new(),
            style,
            content: None,
        }));

        let weak: Weak<RefCell<TooltipState<C>>> = Rc::downgrade(&state);
        let handler = MouseEventHandler::new(move |event| {
            if let Some(state) = weak.upgrade() {
                on_crosshair_move(&state, event);
            }
        });

        let observation = platform.resize_observation.as_ref().map(|observation| {
            let weak = Rc::downgrade(&state);
            let id = observation.observe(
                &overlay,
                Rc::new(move |entries: &[ResizeEntry]| {
                    let (Some(state), Some(entry)) = (weak.upgrade(), entries.first()) else {
                        return;
                    };
                    on_overlay_resize(&state, size_from_entry(entry));
                }),
            );
            (Rc::clone(observation), id)
        });

        let link = Rc::new(RefCell::new(TooltipLink {
            state: Rc::clone(&state),
            handler,
            bridge: SubscriptionBridge::new(),
            bound_chart: None,
            bound_series: None,
        }));
        let refresh = |link: &mut TooltipLink<C>| -> BindingResult<()> {
            link.refresh();
            Ok(())
        };
        let mut watches = vec![refresh_on_publish(&chart_scope, &link, "tooltip", refresh)];
        if let Some(series_scope) = &series_scope {
            watches.push(refresh_on_publish(series_scope, &link, "tooltip", refresh));
        }
        link.borrow_mut().refresh();

        Self {
            state,
            link,
            overlay,
            observation,
            watches,
        }
    }

    /// Applies new props; content and style are recomputed when the
    /// callbacks or declarations changed.
    pub fn update(&mut self, props: TooltipProps<C>) {
        let (content_changed, style_changed) = {
            let mut state = self.state.borrow_mut();
            let content_changed =
                !same_rc(state.props.content.as_ref(), props.content.as_ref());
            let style_changed = !same_rc(
                state.props.make_transform.as_ref(),
                props.make_transform.as_ref(),
            ) || state.props.style != props.style;
            state.props = props;
            (content_changed, style_changed)
        };
        if content_changed {
            recompute_content(&self.state);
        }
        if style_changed {
            restyle(&self.state);
        }
    }

    /// Re-binds to the current chart/series scopes.
    pub fn refresh(&mut self) {
        self.link.borrow_mut().refresh();
    }

    /// Drops the held transform so the next appearance does not animate
    /// from a stale position.
    pub fn reset_position(&mut self) {
        self.state.borrow_mut().last_transform.clear();
        restyle(&self.state);
    }

    #[must_use]
    pub fn style(&self) -> TooltipStyle {
        self.state.borrow().style.clone()
    }

    #[must_use]
    pub fn visibility(&self) -> TooltipVisibility {
        self.state.borrow().style.visibility
    }

    #[must_use]
    pub fn overlay_size(&self) -> Size {
        self.state.borrow().overlay_size
    }

    #[must_use]
    pub fn overlay(&self) -> &ElementRef {
        &self.overlay
    }

    pub fn with_content<R>(&self, read: impl FnOnce(Option<&C>) -> R) -> R {
        read(self.state.borrow().content.as_ref())
    }

    #[must_use]
    pub fn content(&self) -> Option<C>
    where
        C: Clone,
    {
        self.state.borrow().content.clone()
    }

    pub fn unmount(&mut self) {
        self.watches.clear();
        self.link.borrow_mut().bridge.release();
        if let Some((observation, id)) = self.observation.take() {
            observation.unobserve(id);
        }
    }
}

impl<C: 'static> Drop for Tooltip<C> {
    fn drop(&mut self) {
        self.unmount();
    }
}
