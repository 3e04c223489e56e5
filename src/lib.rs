//! chart-binding: lifecycle bindings for a Lightweight-Charts style engine.
//!
//! A `ChartHost` owns one engine chart per container element and publishes
//! it through an explicit scope; series, price lines, subscribers, resizers,
//! fit-content triggers and tooltips bind to that scope and keep the engine
//! in step with their props. The engine and the platform are consumed
//! through traits, so the crate runs headless against
//! `engine::RecordingEngine` and `platform::headless`.

pub mod api;
pub mod core;
pub mod engine;
pub mod error;
pub mod platform;
pub mod telemetry;

pub use api::{
    ChartHost, ChartHostConfig, ChartHostProps, ChartScope, PriceLineBinding, SeriesBinding,
    SeriesProps, TaskQueue, Tooltip,
};
pub use engine::{ChartApi, ChartFactory, ChartHandle, SeriesApi};
pub use error::{BindingError, BindingResult};
