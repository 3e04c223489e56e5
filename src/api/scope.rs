use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::engine::{ChartHandle, SeriesHandle};
use crate::error::BindingResult;
use crate::platform::ElementRef;

use super::TaskQueue;

struct ScopeSlot<T> {
    value: RefCell<T>,
    revision: Cell<u64>,
    watchers: RefCell<Vec<Weak<dyn Fn()>>>,
}

/// Write side of a scope value, owned by exactly one binding.
///
/// Assigning the owning binding's slot and publishing to descendants are two
/// separate steps: bindings update their own state first, then `publish`.
pub struct ScopeProvider<T> {
    slot: Rc<ScopeSlot<T>>,
}

/// Read side of a scope value, handed to descendants at construction.
pub struct ScopeConsumer<T> {
    slot: Rc<ScopeSlot<T>>,
}

impl<T: Clone> ScopeProvider<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            slot: Rc::new(ScopeSlot {
                value: RefCell::new(initial),
                revision: Cell::new(0),
                watchers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Stores `value`, then notifies every live watcher in registration order.
    ///
    /// Watchers run with no borrow of the slot held, so they may read the
    /// new value and publish to other scopes.
    pub fn publish(&self, value: T) {
        *self.slot.value.borrow_mut() = value;
        self.slot.revision.set(self.slot.revision.get() + 1);

        let watchers: Vec<Rc<dyn Fn()>> = {
            let mut watchers = self.slot.watchers.borrow_mut();
            watchers.retain(|watcher| watcher.strong_count() > 0);
            watchers.iter().filter_map(Weak::upgrade).collect()
        };
        for watcher in watchers {
            watcher();
        }
    }

    #[must_use]
    pub fn consumer(&self) -> ScopeConsumer<T> {
        ScopeConsumer {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: Clone> ScopeConsumer<T> {
    /// A consumer bound to a fixed value with no provider behind it.
    #[must_use]
    pub fn detached(value: T) -> Self {
        ScopeProvider::new(value).consumer()
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.slot.value.borrow().clone()
    }

    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&self.slot.value.borrow())
    }

    /// Number of publishes seen so far; changes whenever the provider publishes.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.slot.revision.get()
    }

    /// Runs `on_change` after every publish until the returned guard drops.
    pub fn watch(&self, on_change: impl Fn() + 'static) -> ScopeWatch {
        let callback: Rc<dyn Fn()> = Rc::new(on_change);
        self.slot.watchers.borrow_mut().push(Rc::downgrade(&callback));
        ScopeWatch { callback }
    }
}

/// Keeps a scope watcher registered; dropping it stops notifications.
#[must_use = "dropping the guard unregisters the watcher"]
pub struct ScopeWatch {
    callback: Rc<dyn Fn()>,
}

impl fmt::Debug for ScopeWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeWatch")
            .field("holders", &Rc::strong_count(&self.callback))
            .finish()
    }
}

/// Re-runs `refresh` on a binding's shared state after every publish of
/// `consumer`.
///
/// The watcher holds the state weakly. A binding already borrowed further up
/// the stack skips the notification; it reconciles when that call returns.
pub(crate) fn refresh_on_publish<T, S>(
    consumer: &ScopeConsumer<T>,
    state: &Rc<RefCell<S>>,
    binding: &'static str,
    refresh: impl Fn(&mut S) -> BindingResult<()> + 'static,
) -> ScopeWatch
where
    T: Clone,
    S: 'static,
{
    let state = Rc::downgrade(state);
    consumer.watch(move || {
        let Some(state) = state.upgrade() else {
            return;
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            trace!(binding, "binding busy, scope change left to the running call");
            return;
        };
        if let Err(err) = refresh(&mut *state) {
            warn!(binding, error = %err, "refresh after scope change failed");
        }
    })
}

impl<T> Clone for ScopeConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ScopeConsumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeConsumer")
            .field("value", &self.slot.value.borrow())
            .field("revision", &self.slot.revision.get())
            .finish()
    }
}

/// Width/height given explicitly to the chart host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExplicitSize {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ExplicitSize {
    #[must_use]
    pub fn is_complete(self) -> bool {
        self.width.is_some() && self.height.is_some()
    }
}

/// Chart-level scope published by a `ChartHost`.
#[derive(Clone)]
pub struct ChartScope {
    pub chart: Option<ChartHandle>,
    pub container: Option<ElementRef>,
    pub explicit_size: ExplicitSize,
    pub tasks: TaskQueue,
}

impl ChartScope {
    #[must_use]
    pub fn empty(tasks: TaskQueue) -> Self {
        Self {
            chart: None,
            container: None,
            explicit_size: ExplicitSize::default(),
            tasks,
        }
    }

    #[must_use]
    pub fn chart(&self) -> Option<&ChartHandle> {
        self.chart.as_ref()
    }

    #[must_use]
    pub fn container(&self) -> Option<&ElementRef> {
        self.container.as_ref()
    }
}

impl fmt::Debug for ChartScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartScope")
            .field("chart", &self.chart)
            .field("container", &self.container.is_some())
            .field("explicit_size", &self.explicit_size)
            .finish()
    }
}

/// Series-level scope published by a `SeriesBinding`.
#[derive(Clone, Default)]
pub struct SeriesScope {
    pub series: Option<SeriesHandle>,
}

impl SeriesScope {
    #[must_use]
    pub fn series(&self) -> Option<&SeriesHandle> {
        self.series.as_ref()
    }
}

impl fmt::Debug for SeriesScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesScope")
            .field("series", &self.series.as_ref().map(|series| series.id()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::{ScopeProvider, refresh_on_publish};

    #[test]
    fn consumers_observe_publishes_and_revisions() {
        let provider = ScopeProvider::new(1_u32);
        let consumer = provider.consumer();
        assert_eq!(consumer.get(), 1);
        assert_eq!(consumer.revision(), 0);

        provider.publish(5);
        assert_eq!(consumer.get(), 5);
        assert_eq!(consumer.clone().revision(), 1);
    }

    #[test]
    fn watchers_run_after_each_publish_until_dropped() {
        let provider = ScopeProvider::new(0_u32);
        let consumer = provider.consumer();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let reader = consumer.clone();
        let watch = consumer.watch(move || sink.borrow_mut().push(reader.get()));
        provider.publish(3);
        provider.publish(4);
        drop(watch);
        provider.publish(5);

        assert_eq!(*seen.borrow(), vec![3, 4]);
    }

    #[test]
    fn busy_state_skips_the_notification() {
        let provider = ScopeProvider::new(0_u32);
        let state = Rc::new(RefCell::new(0_u32));
        let runs = Rc::new(Cell::new(0));

        let counter = Rc::clone(&runs);
        let _watch = refresh_on_publish(&provider.consumer(), &state, "counter", move |value| {
            *value += 1;
            counter.set(counter.get() + 1);
            Ok(())
        });
        provider.publish(1);
        {
            let _held = state.borrow_mut();
            provider.publish(2);
        }
        drop(state);
        provider.publish(3);

        assert_eq!(runs.get(), 1);
    }
}
