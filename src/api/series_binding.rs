use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::core::{SeriesDataItem, SeriesKind, SeriesMarker, SeriesOptions};
use crate::engine::{ChartHandle, SeriesHandle};
use crate::error::{BindingResult, swallow_double_removal};

use super::scope::refresh_on_publish;
use super::{ChartScope, ScopeConsumer, ScopeProvider, ScopeWatch, SeriesScope};

/// Props of one series binding.
///
/// `data` and `markers` are full replacements keyed by `Rc` identity: hand
/// the same `Rc` back to skip the engine call, a new one to replace.
#[derive(Debug, Clone, Default)]
pub struct SeriesProps {
    pub options: SeriesOptions,
    pub data: Option<Rc<[SeriesDataItem]>>,
    /// Incremental item pushed through `update`; compared by value.
    pub latest_item: Option<SeriesDataItem>,
    pub markers: Option<Rc<[SeriesMarker]>>,
}

impl SeriesProps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(mut self, options: SeriesOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Rc<[SeriesDataItem]>) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_latest_item(mut self, item: SeriesDataItem) -> Self {
        self.latest_item = Some(item);
        self
    }

    #[must_use]
    pub fn with_markers(mut self, markers: Rc<[SeriesMarker]>) -> Self {
        self.markers = Some(markers);
        self
    }
}

fn same_list<T>(a: Option<&Rc<[T]>>, b: Option<&Rc<[T]>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Last props pushed to the engine; `None` before the first push.
#[derive(Default)]
struct Applied {
    data: Option<Option<Rc<[SeriesDataItem]>>>,
    latest_item: Option<SeriesDataItem>,
    markers: Option<Option<Rc<[SeriesMarker]>>>,
}

struct OwnedSeries {
    chart: ChartHandle,
    series: SeriesHandle,
    options: SeriesOptions,
    applied: Applied,
}

struct SeriesState {
    kind: SeriesKind,
    chart_scope: ScopeConsumer<ChartScope>,
    props: SeriesProps,
    owned: Option<OwnedSeries>,
    scope: ScopeProvider<SeriesScope>,
}

/// Binds one series of a fixed kind to the nearest chart.
///
/// Creation waits for a live chart in the scope and happens as soon as the
/// chart host publishes one; no call from the owner is needed.
pub struct SeriesBinding {
    state: Rc<RefCell<SeriesState>>,
    scope: ScopeConsumer<SeriesScope>,
    chart_watch: Option<ScopeWatch>,
}

impl SeriesBinding {
    pub fn mount(
        kind: SeriesKind,
        chart_scope: ScopeConsumer<ChartScope>,
        props: SeriesProps,
    ) -> BindingResult<Self> {
        let provider = ScopeProvider::new(SeriesScope::default());
        let scope = provider.consumer();
        let state = Rc::new(RefCell::new(SeriesState {
            kind,
            chart_scope: chart_scope.clone(),
            props,
            owned: None,
            scope: provider,
        }));
        let chart_watch =
            refresh_on_publish(&chart_scope, &state, "series", SeriesState::refresh);
        state.borrow_mut().refresh()?;
        Ok(Self {
            state,
            scope,
            chart_watch: Some(chart_watch),
        })
    }

    #[must_use]
    pub fn kind(&self) -> SeriesKind {
        self.state.borrow().kind
    }

    /// Scope handed to price lines and other series-level descendants.
    #[must_use]
    pub fn scope(&self) -> ScopeConsumer<SeriesScope> {
        self.scope.clone()
    }

    #[must_use]
    pub fn series(&self) -> Option<SeriesHandle> {
        self.state
            .borrow()
            .owned
            .as_ref()
            .map(|owned| Rc::clone(&owned.series))
    }

    pub fn update(&mut self, props: SeriesProps) -> BindingResult<()> {
        let mut state = self.state.borrow_mut();
        state.props = props;
        state.refresh()
    }

    /// Reconciles the series with the current chart scope and props.
    pub fn refresh(&mut self) -> BindingResult<()> {
        self.state.borrow_mut().refresh()
    }

    /// Removes the series and stops following the chart scope.
    pub fn unmount(&mut self) -> BindingResult<()> {
        drop(self.chart_watch.take());
        self.state.borrow_mut().teardown()
    }
}

impl SeriesState {
    fn refresh(&mut self) -> BindingResult<()> {
        let chart = self
            .chart_scope
            .with(|scope| scope.chart.clone())
            .filter(ChartHandle::is_alive);

        let stale = self.owned.as_ref().is_some_and(|owned| {
            chart
                .as_ref()
                .is_none_or(|chart| !chart.same(&owned.chart))
        });
        if stale {
            debug!(kind = self.kind.display_name(), "chart changed, dropping series");
            self.teardown()?;
        }

        let Some(chart) = chart else {
            return Ok(());
        };

        let created = match self.owned.as_mut() {
            Some(owned) => {
                if owned.options != self.props.options {
                    trace!(series = owned.series.id().raw(), "applying changed series options");
                    owned.series.apply_options(&self.props.options);
                    owned.options = self.props.options.clone();
                }
                None
            }
            None => {
                let series = chart.add_series(self.kind, &self.props.options)?;
                debug!(
                    kind = self.kind.display_name(),
                    series = series.id().raw(),
                    "created series"
                );
                self.owned = Some(OwnedSeries {
                    chart,
                    series: Rc::clone(&series),
                    options: self.props.options.clone(),
                    applied: Applied::default(),
                });
                Some(series)
            }
        };

        if let Some(owned) = self.owned.as_mut() {
            sync_content(owned, &self.props);
        }
        if let Some(series) = created {
            self.scope.publish(SeriesScope {
                series: Some(series),
            });
        }
        Ok(())
    }

    /// Removes the series, then tells descendants it is gone.
    fn teardown(&mut self) -> BindingResult<()> {
        let Some(owned) = self.owned.take() else {
            return Ok(());
        };
        debug!(series = owned.series.id().raw(), "removing series");
        let removed = swallow_double_removal(owned.chart.remove_series(&owned.series));
        self.scope.publish(SeriesScope::default());
        removed
    }
}

fn sync_content(owned: &mut OwnedSeries, props: &SeriesProps) {
    let applied = &mut owned.applied;

    let data_changed = applied
        .data
        .as_ref()
        .is_none_or(|data| !same_list(data.as_ref(), props.data.as_ref()));
    if data_changed {
        let items = props.data.as_deref().unwrap_or(&[]);
        trace!(series = owned.series.id().raw(), len = items.len(), "replacing series data");
        owned.series.set_data(items);
        applied.data = Some(props.data.clone());
    }

    if let Some(item) = &props.latest_item {
        if applied.latest_item.as_ref() != Some(item) {
            trace!(series = owned.series.id().raw(), "pushing latest series item");
            owned.series.update(item);
        }
    }
    applied.latest_item = props.latest_item.clone();

    let markers_changed = applied
        .markers
        .as_ref()
        .is_none_or(|markers| !same_list(markers.as_ref(), props.markers.as_ref()));
    if markers_changed {
        owned
            .series
            .set_markers(props.markers.as_deref().unwrap_or(&[]));
        applied.markers = Some(props.markers.clone());
    }
}

impl Drop for SeriesState {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!(error = %err, "series removal failed during drop");
        }
    }
}
