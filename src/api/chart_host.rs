use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::core::ChartOptions;
use crate::engine::{
    ChartFactory, ChartHandle, Click, CrosshairMove, TimeScaleSizeChange, VisibleLogicalRangeChange,
    VisibleTimeRangeChange, same_chart,
};
use crate::error::{BindingResult, swallow_double_removal};
use crate::platform::{ElementRef, Platform, same_element};

use super::auto_resizer::{ResizeRegistration, ResizeTarget};
use super::fit_content_trigger::schedule_fit_content;
use super::{
    ChartEventHandlers, ChartHostProps, ChartScope, ExplicitSize, ScopeConsumer, ScopeProvider,
    SubscriptionBridge, TaskQueue, TriggerSources,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizePolicy {
    Fixed { width: u32, height: u32 },
    Auto {
        explicit: ExplicitSize,
        triggers: TriggerSources,
    },
    Disabled,
}

struct OwnedChart {
    handle: ChartHandle,
    applied_options: ChartOptions,
    size_policy: Option<SizePolicy>,
    auto_resize: Option<ResizeRegistration>,
}

#[derive(Default)]
struct EventBridges {
    click: SubscriptionBridge<Click>,
    crosshair_move: SubscriptionBridge<CrosshairMove>,
    size_change: SubscriptionBridge<TimeScaleSizeChange>,
    visible_time_range: SubscriptionBridge<VisibleTimeRangeChange>,
    visible_logical_range: SubscriptionBridge<VisibleLogicalRangeChange>,
}

impl EventBridges {
    fn sync(&mut self, chart: Option<&ChartHandle>, handlers: &ChartEventHandlers) {
        self.click.sync(chart, handlers.on_click.as_ref());
        self.crosshair_move
            .sync(chart, handlers.on_crosshair_move.as_ref());
        self.size_change
            .sync(chart, handlers.on_time_scale_size_change.as_ref());
        self.visible_time_range
            .sync(chart, handlers.on_visible_time_range_change.as_ref());
        self.visible_logical_range
            .sync(chart, handlers.on_visible_logical_range_change.as_ref());
    }

    fn release(&mut self) {
        self.click.release();
        self.crosshair_move.release();
        self.size_change.release();
        self.visible_time_range.release();
        self.visible_logical_range.release();
    }
}

/// Owns one engine chart for the lifetime of a container element.
///
/// The host creates the chart the first time a container is available,
/// applies option changes in place, sizes the chart, bridges the chart-level
/// event streams and publishes the chart scope to descendant bindings.
/// Descendants watch the published scope and reconcile on every change;
/// deferred work (the initial fit-content) runs on the next
/// `TaskQueue::run_pending`.
pub struct ChartHost {
    factory: Rc<dyn ChartFactory>,
    platform: Platform,
    tasks: TaskQueue,
    props: ChartHostProps,
    container: Option<ElementRef>,
    owned: Option<OwnedChart>,
    scope: ScopeProvider<ChartScope>,
    bridges: EventBridges,
}

impl ChartHost {
    #[must_use]
    pub fn new(
        factory: Rc<dyn ChartFactory>,
        platform: Platform,
        tasks: TaskQueue,
        props: ChartHostProps,
    ) -> Self {
        let scope = ScopeProvider::new(ChartScope::empty(tasks.clone()));
        Self {
            factory,
            platform,
            tasks,
            props,
            container: None,
            owned: None,
            scope,
            bridges: EventBridges::default(),
        }
    }

    /// Scope handed to descendant bindings.
    #[must_use]
    pub fn scope(&self) -> ScopeConsumer<ChartScope> {
        self.scope.consumer()
    }

    /// Imperative access to the live chart.
    #[must_use]
    pub fn chart(&self) -> Option<ChartHandle> {
        self.owned.as_ref().map(|owned| owned.handle.clone())
    }

    #[must_use]
    pub fn container(&self) -> Option<ElementRef> {
        self.container.clone()
    }

    #[must_use]
    pub fn props(&self) -> &ChartHostProps {
        &self.props
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Attaches the container element; a different element than the current
    /// one destroys the existing chart first.
    pub fn mount(&mut self, container: ElementRef) -> BindingResult<()> {
        let swapped = self
            .container
            .as_ref()
            .is_some_and(|current| !same_element(current, &container));
        if swapped {
            debug!("chart container swapped, recreating chart");
            self.teardown()?;
        }
        self.container = Some(container);
        self.sync()
    }

    pub fn update(&mut self, props: ChartHostProps) -> BindingResult<()> {
        self.props = props;
        self.sync()
    }

    /// Destroys the chart and detaches the container.
    pub fn unmount(&mut self) -> BindingResult<()> {
        let result = self.teardown();
        self.container = None;
        self.publish_scope();
        result
    }

    fn sync(&mut self) -> BindingResult<()> {
        let Some(container) = self.container.clone() else {
            return Ok(());
        };
        let options = self.props.config.merged_options();

        match self.owned.as_mut() {
            Some(owned) => {
                if owned.applied_options != options {
                    trace!("applying changed chart options");
                    owned.handle.apply_options(&options);
                    owned.applied_options = options;
                }
            }
            None => {
                let handle = ChartHandle::new(self.factory.create_chart(&container, &options)?);
                debug!("created chart");
                if !self.props.config.disable_auto_content_fit_on_init {
                    schedule_fit_content(&self.tasks, &handle, "initial-fit-content");
                }
                self.owned = Some(OwnedChart {
                    handle,
                    applied_options: options,
                    size_policy: None,
                    auto_resize: None,
                });
            }
        }

        self.sync_size(&container);
        self.publish_scope();
        let chart = self.owned.as_ref().map(|owned| &owned.handle);
        self.bridges.sync(chart, &self.props.handlers);
        Ok(())
    }

    fn size_policy(&self) -> SizePolicy {
        let config = &self.props.config;
        let explicit = config.explicit_size();
        match (explicit.width, explicit.height) {
            (Some(width), Some(height)) => SizePolicy::Fixed { width, height },
            _ if config.disable_auto_resize => SizePolicy::Disabled,
            _ => SizePolicy::Auto {
                explicit,
                triggers: config.auto_resize_triggers(),
            },
        }
    }

    fn sync_size(&mut self, container: &ElementRef) {
        let policy = self.size_policy();
        let Some(owned) = self.owned.as_mut() else {
            return;
        };
        if owned.size_policy == Some(policy) {
            return;
        }

        owned.auto_resize = None;
        match policy {
            SizePolicy::Fixed { width, height } => {
                trace!(width, height, "resizing chart to explicit size");
                owned.handle.resize(width, height);
            }
            SizePolicy::Auto { explicit, triggers } => {
                owned.auto_resize = Some(ResizeRegistration::register(
                    ResizeTarget {
                        chart: Some(owned.handle.clone()),
                        container: Some(Rc::clone(container)),
                        explicit_size: explicit,
                        on_resize: None,
                    },
                    triggers,
                    &self.platform,
                ));
            }
            SizePolicy::Disabled => {}
        }
        owned.size_policy = Some(policy);
    }

    fn publish_scope(&self) {
        let next = ChartScope {
            chart: self.chart(),
            container: self.container.clone(),
            explicit_size: self.props.config.explicit_size(),
            tasks: self.tasks.clone(),
        };
        let unchanged = self.scope.consumer().with(|current| {
            let same_container = match (current.container(), next.container()) {
                (Some(a), Some(b)) => same_element(a, b),
                (None, None) => true,
                _ => false,
            };
            same_chart(current.chart(), next.chart())
                && same_container
                && current.explicit_size == next.explicit_size
        });
        if !unchanged {
            self.scope.publish(next);
        }
    }

    fn teardown(&mut self) -> BindingResult<()> {
        self.bridges.release();
        let Some(owned) = self.owned.take() else {
            return Ok(());
        };
        drop(owned.auto_resize);
        owned.handle.mark_removed();
        debug!("removing chart");
        let result = swallow_double_removal(owned.handle.remove());
        self.publish_scope();
        result
    }
}

impl Drop for ChartHost {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!(error = %err, "chart removal failed during drop");
        }
    }
}
