use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use ordered_float::OrderedFloat;
use tracing::{trace, warn};

use crate::engine::{ChartHandle, same_chart};

use super::scope::refresh_on_publish;
use super::{ChartScope, ScopeConsumer, ScopeWatch, TaskQueue};

/// Defers a fit-content call on `chart` to the next tick.
///
/// The task no-ops when the chart was destroyed in the meantime.
pub(crate) fn schedule_fit_content(tasks: &TaskQueue, chart: &ChartHandle, label: &'static str) {
    let chart = chart.clone();
    tasks.defer(label, move || {
        if chart.is_alive() {
            chart.fit_content();
        } else {
            trace!("skipping fit-content for a destroyed chart");
        }
    });
}

/// Shallow-comparable entry of a dependency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepKey(u64);

impl DepKey {
    /// Keys a shared value by allocation identity, the way array props are keyed.
    ///
    /// Only meaningful while the `Rc` is alive; a freed allocation may be reused.
    #[must_use]
    pub fn identity<T: ?Sized>(value: &Rc<T>) -> Self {
        Self(Rc::as_ptr(value).cast::<()>() as usize as u64)
    }

    /// Keys a plain value by its hash.
    #[must_use]
    pub fn value<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Self(hasher.finish())
    }

    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::value(&OrderedFloat(value))
    }
}

struct FitState {
    chart_scope: ScopeConsumer<ChartScope>,
    deps: Vec<DepKey>,
    fitted_chart: Option<ChartHandle>,
    fitted_deps: Option<Vec<DepKey>>,
}

impl FitState {
    fn refresh(&mut self) {
        let scope = self.chart_scope.get();
        let unchanged = same_chart(scope.chart(), self.fitted_chart.as_ref())
            && self.fitted_deps.as_deref() == Some(self.deps.as_slice());
        if unchanged {
            return;
        }

        self.fitted_chart = scope.chart.clone();
        self.fitted_deps = Some(self.deps.clone());
        if let Some(chart) = scope.chart() {
            schedule_fit_content(&scope.tasks, chart, "fit-content-trigger");
        }
    }
}

/// Re-fits the visible range whenever the dependency list or the chart
/// changes.
pub struct FitContentTrigger {
    state: Rc<RefCell<FitState>>,
    chart_watch: Option<ScopeWatch>,
}

impl FitContentTrigger {
    #[must_use]
    pub fn mount(chart_scope: ScopeConsumer<ChartScope>, deps: Vec<DepKey>) -> Self {
        let state = Rc::new(RefCell::new(FitState {
            chart_scope: chart_scope.clone(),
            deps,
            fitted_chart: None,
            fitted_deps: None,
        }));
        let chart_watch = refresh_on_publish(&chart_scope, &state, "fit-content", |state| {
            state.refresh();
            Ok(())
        });
        state.borrow_mut().refresh();
        Self {
            state,
            chart_watch: Some(chart_watch),
        }
    }

    /// Replaces the dependency list.
    ///
    /// The list is compared entry by entry, so its length is expected to
    /// stay stable; a length change counts as a change and re-fits.
    pub fn update(&mut self, deps: Vec<DepKey>) {
        let mut state = self.state.borrow_mut();
        if state.deps.len() != deps.len() {
            warn!(
                previous = state.deps.len(),
                next = deps.len(),
                "fit-content dependency list changed length"
            );
        }
        state.deps = deps;
        state.refresh();
    }

    pub fn refresh(&mut self) {
        self.state.borrow_mut().refresh();
    }

    /// Stops following the chart scope; an already deferred fit still runs.
    pub fn unmount(&mut self) {
        drop(self.chart_watch.take());
    }
}
