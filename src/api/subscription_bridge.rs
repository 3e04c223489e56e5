use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::engine::{ChartHandle, EventHandler, EventKind};

use super::scope::refresh_on_publish;
use super::{ChartScope, ScopeConsumer, ScopeWatch};

struct Registration<K: EventKind> {
    chart: ChartHandle,
    handler: EventHandler<K::Payload>,
}

/// Keeps at most one engine registration alive for one event stream.
///
/// `sync` is called with the current chart and handler after every update;
/// when either identity changed the previous registration is removed before
/// the new one is made.
pub struct SubscriptionBridge<K: EventKind> {
    active: Option<Registration<K>>,
}

impl<K: EventKind> Default for SubscriptionBridge<K> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<K: EventKind> SubscriptionBridge<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(
        &mut self,
        chart: Option<&ChartHandle>,
        handler: Option<&EventHandler<K::Payload>>,
    ) {
        if let Some(active) = &self.active {
            let same_chart = chart.is_some_and(|chart| chart.same(&active.chart));
            let same_handler = handler.is_some_and(|handler| handler.same(&active.handler));
            if same_chart && same_handler && active.chart.is_alive() {
                return;
            }
        }

        self.release();

        let (Some(chart), Some(handler)) = (chart, handler) else {
            return;
        };
        if !chart.is_alive() {
            return;
        }
        K::subscribe(&**chart, handler.clone());
        debug!(stream = ?K::STREAM, "subscribed chart event handler");
        self.active = Some(Registration {
            chart: chart.clone(),
            handler: handler.clone(),
        });
    }

    /// Drops the current registration, if any.
    pub fn release(&mut self) {
        let Some(registration) = self.active.take() else {
            return;
        };
        K::unsubscribe(&*registration.chart, &registration.handler);
        debug!(
            stream = ?K::STREAM,
            chart_alive = registration.chart.is_alive(),
            "unsubscribed chart event handler"
        );
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }
}

impl<K: EventKind> Drop for SubscriptionBridge<K> {
    fn drop(&mut self) {
        self.release();
    }
}

struct SubscriberState<K: EventKind> {
    chart_scope: ScopeConsumer<ChartScope>,
    handler: EventHandler<K::Payload>,
    bridge: SubscriptionBridge<K>,
}

impl<K: EventKind> SubscriberState<K> {
    fn refresh(&mut self) {
        let chart = self.chart_scope.with(|scope| scope.chart.clone());
        self.bridge.sync(chart.as_ref(), Some(&self.handler));
    }
}

/// Standalone binding subscribing one handler to the nearest chart.
///
/// Follows the chart scope: a chart published later is subscribed to, a
/// replaced chart is unsubscribed from first.
pub struct ChartSubscriber<K: EventKind> {
    state: Rc<RefCell<SubscriberState<K>>>,
    chart_watch: Option<ScopeWatch>,
}

impl<K: EventKind> ChartSubscriber<K> {
    #[must_use]
    pub fn mount(chart_scope: ScopeConsumer<ChartScope>, handler: EventHandler<K::Payload>) -> Self {
        let state = Rc::new(RefCell::new(SubscriberState {
            chart_scope: chart_scope.clone(),
            handler,
            bridge: SubscriptionBridge::new(),
        }));
        let chart_watch = refresh_on_publish(&chart_scope, &state, "chart-subscriber", |state| {
            state.refresh();
            Ok(())
        });
        state.borrow_mut().refresh();
        Self {
            state,
            chart_watch: Some(chart_watch),
        }
    }

    pub fn update(&mut self, handler: EventHandler<K::Payload>) {
        let mut state = self.state.borrow_mut();
        state.handler = handler;
        state.refresh();
    }

    /// Re-evaluates the registration against the current chart scope.
    pub fn refresh(&mut self) {
        self.state.borrow_mut().refresh();
    }

    pub fn unmount(&mut self) {
        drop(self.chart_watch.take());
        self.state.borrow_mut().bridge.release();
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().bridge.is_subscribed()
    }
}
