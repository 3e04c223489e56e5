//! Platform primitives consumed as black boxes: element geometry, box-size
//! observation and the window-level resize signal.

pub mod headless;

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::Size;

/// DOM-like element the chart is mounted into.
pub trait Element {
    fn parent(&self) -> Option<ElementRef>;
    /// Content box size as laid out by the host.
    fn content_size(&self) -> Size;
    /// Width of the element's bounding rectangle.
    fn bounding_width(&self) -> f64;
}

pub type ElementRef = Rc<dyn Element>;

#[must_use]
pub fn same_element(a: &ElementRef, b: &ElementRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub inline_size: f64,
    pub block_size: f64,
}

/// `contentBoxSize` comes either as a list of fragments or as a single box
/// depending on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentBoxSize {
    Fragments(Vec<BoxSize>),
    Single(BoxSize),
}

/// Raw observation entry as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeEntry {
    pub content_box_size: Option<ContentBoxSize>,
    pub content_rect: Size,
}

impl ResizeEntry {
    #[must_use]
    pub fn from_rect(size: Size) -> Self {
        Self {
            content_box_size: None,
            content_rect: size,
        }
    }

    #[must_use]
    pub fn from_box(width: f64, height: f64) -> Self {
        Self {
            content_box_size: Some(ContentBoxSize::Fragments(vec![BoxSize {
                inline_size: width,
                block_size: height,
            }])),
            content_rect: Size::new(width, height),
        }
    }
}

/// Normalizes every entry shape to a `(width, height)` pair.
///
/// The first fragment wins for fragment lists; an empty list or a missing
/// content box falls back to the content rectangle.
#[must_use]
pub fn size_from_entry(entry: &ResizeEntry) -> Size {
    let content_box = match &entry.content_box_size {
        Some(ContentBoxSize::Fragments(fragments)) => fragments.first().copied(),
        Some(ContentBoxSize::Single(single)) => Some(*single),
        None => None,
    };
    match content_box {
        Some(content_box) => Size::new(content_box.inline_size, content_box.block_size),
        None => entry.content_rect,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type ResizeCallback = Rc<dyn Fn(&[ResizeEntry])>;

/// Continuous box-size observation of an element.
pub trait ResizeObservation {
    fn observe(&self, target: &ElementRef, callback: ResizeCallback) -> ObservationId;
    fn unobserve(&self, id: ObservationId);
}

/// Window-level resize notifications.
pub trait WindowResizeSignal {
    fn add_resize_listener(&self, listener: Rc<dyn Fn()>) -> ListenerId;
    fn remove_resize_listener(&self, id: ListenerId);
}

/// Primitives available on the current platform; either may be missing.
#[derive(Clone, Default)]
pub struct Platform {
    pub resize_observation: Option<Rc<dyn ResizeObservation>>,
    pub window: Option<Rc<dyn WindowResizeSignal>>,
}

impl Platform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_resize_observation(mut self, observation: Rc<dyn ResizeObservation>) -> Self {
        self.resize_observation = Some(observation);
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: Rc<dyn WindowResizeSignal>) -> Self {
        self.window = Some(window);
        self
    }

    #[must_use]
    pub fn supports_resize_observation(&self) -> bool {
        self.resize_observation.is_some()
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("resize_observation", &self.resize_observation.is_some())
            .field("window", &self.window.is_some())
            .finish()
    }
}
