//! In-memory platform used by tests and headless hosts.
//!
//! Nothing fires on its own: observers and window listeners run only when
//! the host calls `notify`/`dispatch_resize`, which keeps ordering explicit.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::Size;

use super::{
    Element, ElementRef, ListenerId, ObservationId, ResizeCallback, ResizeEntry,
    ResizeObservation, WindowResizeSignal, same_element,
};

pub struct HeadlessElement {
    parent: Option<ElementRef>,
    size: Cell<Size>,
}

impl HeadlessElement {
    #[must_use]
    pub fn new(size: Size) -> Rc<Self> {
        Rc::new(Self {
            parent: None,
            size: Cell::new(size),
        })
    }

    #[must_use]
    pub fn with_parent(parent: ElementRef, size: Size) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(parent),
            size: Cell::new(size),
        })
    }

    pub fn set_size(&self, size: Size) {
        self.size.set(size);
    }
}

impl Element for HeadlessElement {
    fn parent(&self) -> Option<ElementRef> {
        self.parent.clone()
    }

    fn content_size(&self) -> Size {
        self.size.get()
    }

    fn bounding_width(&self) -> f64 {
        self.size.get().width
    }
}

#[derive(Default)]
pub struct ManualResizeObserver {
    next_id: Cell<u64>,
    registrations: RefCell<Vec<(ObservationId, ElementRef, ResizeCallback)>>,
}

impl ManualResizeObserver {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Delivers `entries` to every callback observing `target`.
    pub fn notify(&self, target: &ElementRef, entries: &[ResizeEntry]) {
        let callbacks: Vec<ResizeCallback> = self
            .registrations
            .borrow()
            .iter()
            .filter(|(_, element, _)| same_element(element, target))
            .map(|(_, _, callback)| Rc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(entries);
        }
    }

    pub fn resize(&self, target: &ElementRef, size: Size) {
        self.notify(target, &[ResizeEntry::from_box(size.width, size.height)]);
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.registrations.borrow().len()
    }

    #[must_use]
    pub fn is_observing(&self, target: &ElementRef) -> bool {
        self.registrations
            .borrow()
            .iter()
            .any(|(_, element, _)| same_element(element, target))
    }
}

impl ResizeObservation for ManualResizeObserver {
    fn observe(&self, target: &ElementRef, callback: ResizeCallback) -> ObservationId {
        let id = ObservationId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.registrations
            .borrow_mut()
            .push((id, Rc::clone(target), callback));
        id
    }

    fn unobserve(&self, id: ObservationId) {
        self.registrations
            .borrow_mut()
            .retain(|(registered, _, _)| *registered != id);
    }
}

#[derive(Default)]
pub struct ManualWindow {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Rc<dyn Fn()>)>>,
}

impl ManualWindow {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn dispatch_resize(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl WindowResizeSignal for ManualWindow {
    fn add_resize_listener(&self, listener: Rc<dyn Fn()>) -> ListenerId {
        let id = ListenerId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_resize_listener(&self, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(registered, _)| *registered != id);
    }
}
