use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

struct DeferredTask {
    label: &'static str,
    run: Box<dyn FnOnce()>,
}

/// Ordered queue of work deferred to the next scheduling tick.
///
/// Bindings perform their engine mutations synchronously while the host
/// updates them; anything that must observe those mutations (fit-content)
/// goes through this queue and runs when the host calls `run_pending` after
/// the pass. Clones share the same queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<DeferredTask>>>,
}

impl TaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer(&self, label: &'static str, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(DeferredTask {
            label,
            run: Box::new(task),
        });
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Runs every task deferred before this call in FIFO order.
    ///
    /// Tasks deferred while the batch runs wait for the next call. Returns the
    /// number of tasks executed.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<DeferredTask> = self.tasks.borrow_mut().drain(..).collect();
        let executed = batch.len();
        for task in batch {
            debug!(task = task.label, "running deferred task");
            (task.run)();
        }
        executed
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending())
            .finish()
    }
}
