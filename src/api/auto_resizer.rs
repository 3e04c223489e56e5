use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::Size;
use crate::engine::{ChartHandle, same_chart};
use crate::platform::{
    ElementRef, ListenerId, ObservationId, Platform, ResizeEntry, ResizeObservation,
    WindowResizeSignal, size_from_entry,
};

use super::scope::refresh_on_publish;
use super::{ChartScope, ExplicitSize, ScopeConsumer, ScopeWatch};

/// Set of measurement sources that re-run the resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerSources {
    bits: u8,
}

impl TriggerSources {
    /// Window-level resize signal.
    pub const WINDOW_RESIZE: Self = Self { bits: 1 << 0 };
    /// Size observation of the container's parent.
    pub const PARENT_RESIZE: Self = Self { bits: 1 << 1 };

    #[must_use]
    pub const fn none() -> Self {
        Self { bits: 0 }
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.bits != 0 && (self.bits & other.bits) == other.bits
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Parent observation when the platform has it, the window signal otherwise.
    #[must_use]
    pub fn default_for(platform: &Platform) -> Self {
        if platform.supports_resize_observation() {
            Self::PARENT_RESIZE
        } else {
            Self::WINDOW_RESIZE
        }
    }
}

impl std::ops::BitOr for TriggerSources {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// Called after every resize with the chart that was resized, if any.
pub type ResizeNotifier = Rc<dyn Fn(Option<&ChartHandle>)>;

/// Clamps a measured length to whole device pixels.
#[must_use]
pub(crate) fn to_pixels(length: f64) -> u32 {
    if length.is_finite() && length > 0.0 {
        length.trunc() as u32
    } else {
        0
    }
}

pub(crate) struct ResizeTarget {
    pub(crate) chart: Option<ChartHandle>,
    pub(crate) container: Option<ElementRef>,
    pub(crate) explicit_size: ExplicitSize,
    pub(crate) on_resize: Option<ResizeNotifier>,
}

impl ResizeTarget {
    fn parent(&self) -> Option<ElementRef> {
        self.container.as_ref().and_then(|container| container.parent())
    }

    fn measure_parent(&self) -> Size {
        self.parent()
            .map(|parent| parent.content_size())
            .unwrap_or(Size::ZERO)
    }

    fn apply(&self, observed: Size) {
        let width = self
            .explicit_size
            .width
            .unwrap_or_else(|| to_pixels(observed.width));
        let height = self
            .explicit_size
            .height
            .unwrap_or_else(|| to_pixels(observed.height));
        if let Some(chart) = self.chart.as_ref().filter(|chart| chart.is_alive()) {
            trace!(width, height, "auto-resizing chart");
            chart.resize(width, height);
        }
        if let Some(on_resize) = &self.on_resize {
            on_resize(self.chart.as_ref());
        }
    }
}

enum ActiveSource {
    Window(Rc<dyn WindowResizeSignal>, ListenerId),
    Parent(Rc<dyn ResizeObservation>, ObservationId),
}

/// Registered measurement sources for one resize target.
///
/// Registering runs one synchronous measure-and-resize; dropping the
/// registration unregisters every source it added.
pub(crate) struct ResizeRegistration {
    sources: SmallVec<[ActiveSource; 2]>,
}

impl ResizeRegistration {
    pub(crate) fn register(target: ResizeTarget, triggers: TriggerSources, platform: &Platform) -> Self {
        let target = Rc::new(target);
        target.apply(target.measure_parent());

        let mut sources = SmallVec::new();
        if triggers.contains(TriggerSources::WINDOW_RESIZE) {
            if let Some(window) = &platform.window {
                let listener_target = Rc::clone(&target);
                let id = window.add_resize_listener(Rc::new(move || {
                    listener_target.apply(listener_target.measure_parent());
                }));
                sources.push(ActiveSource::Window(Rc::clone(window), id));
            }
        }
        if triggers.contains(TriggerSources::PARENT_RESIZE) {
            if let (Some(observation), Some(parent)) =
                (&platform.resize_observation, target.parent())
            {
                let observer_target = Rc::clone(&target);
                let id = observation.observe(
                    &parent,
                    Rc::new(move |entries: &[ResizeEntry]| {
                        let observed = entries
                            .first()
                            .map(size_from_entry)
                            .unwrap_or_else(|| observer_target.measure_parent());
                        observer_target.apply(observed);
                    }),
                );
                sources.push(ActiveSource::Parent(Rc::clone(observation), id));
            }
        }
        debug!(sources = sources.len(), "registered resize sources");
        Self { sources }
    }
}

impl Drop for ResizeRegistration {
    fn drop(&mut self) {
        for source in self.sources.drain(..) {
            match source {
                ActiveSource::Window(window, id) => window.remove_resize_listener(id),
                ActiveSource::Parent(observation, id) => observation.unobserve(id),
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct AutoResizerProps {
    /// `None` picks `TriggerSources::default_for` the platform.
    pub trigger_sources: Option<TriggerSources>,
    pub on_resize: Option<ResizeNotifier>,
}

impl fmt::Debug for AutoResizerProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoResizerProps")
            .field("trigger_sources", &self.trigger_sources)
            .field("on_resize", &self.on_resize.is_some())
            .finish()
    }
}

struct BoundState {
    chart: Option<ChartHandle>,
    explicit_size: ExplicitSize,
    triggers: TriggerSources,
    on_resize: Option<ResizeNotifier>,
}

impl BoundState {
    fn matches(&self, other: &BoundState) -> bool {
        let same_notifier = match (&self.on_resize, &other.on_resize) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_chart(self.chart.as_ref(), other.chart.as_ref())
            && self.explicit_size == other.explicit_size
            && self.triggers == other.triggers
            && same_notifier
    }
}

struct ResizerState {
    chart_scope: ScopeConsumer<ChartScope>,
    platform: Platform,
    props: AutoResizerProps,
    bound: Option<BoundState>,
    registration: Option<ResizeRegistration>,
}

impl ResizerState {
    /// Re-registers when the chart, explicit size, triggers or callback changed.
    fn refresh(&mut self) {
        let scope = self.chart_scope.get();
        let next = BoundState {
            chart: scope.chart.clone(),
            explicit_size: scope.explicit_size,
            triggers: self
                .props
                .trigger_sources
                .unwrap_or_else(|| TriggerSources::default_for(&self.platform)),
            on_resize: self.props.on_resize.clone(),
        };
        if self.bound.as_ref().is_some_and(|bound| bound.matches(&next)) {
            return;
        }

        self.registration = None;
        if !next.triggers.is_empty() {
            self.registration = Some(ResizeRegistration::register(
                ResizeTarget {
                    chart: next.chart.clone(),
                    container: scope.container.clone(),
                    explicit_size: next.explicit_size,
                    on_resize: next.on_resize.clone(),
                },
                next.triggers,
                &self.platform,
            ));
        }
        self.bound = Some(next);
    }
}

/// Sizes the nearest chart to its container's parent box.
///
/// A new chart, container or explicit size in the chart scope re-registers
/// the sources and resizes immediately.
pub struct AutoResizer {
    state: Rc<RefCell<ResizerState>>,
    chart_watch: Option<ScopeWatch>,
}

impl AutoResizer {
    #[must_use]
    pub fn mount(
        chart_scope: ScopeConsumer<ChartScope>,
        platform: Platform,
        props: AutoResizerProps,
    ) -> Self {
        let state = Rc::new(RefCell::new(ResizerState {
            chart_scope: chart_scope.clone(),
            platform,
            props,
            bound: None,
            registration: None,
        }));
        let chart_watch = refresh_on_publish(&chart_scope, &state, "auto-resizer", |state| {
            state.refresh();
            Ok(())
        });
        state.borrow_mut().refresh();
        Self {
            state,
            chart_watch: Some(chart_watch),
        }
    }

    pub fn update(&mut self, props: AutoResizerProps) {
        let mut state = self.state.borrow_mut();
        state.props = props;
        state.refresh();
    }

    pub fn refresh(&mut self) {
        self.state.borrow_mut().refresh();
    }

    pub fn unmount(&mut self) {
        drop(self.chart_watch.take());
        let mut state = self.state.borrow_mut();
        state.registration = None;
        state.bound = None;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.borrow().registration.is_some()
    }
}
