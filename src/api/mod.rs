//! Bindings between a declarative component tree and the charting engine.
//!
//! Every binding follows the same lifecycle: `mount` with the scope of its
//! nearest parent, `update` when its props change, `unmount` (or drop) on
//! teardown. Bindings watch their parent scopes and reconcile on every
//! publish, so a child mounted before its parent's handle exists picks the
//! handle up as soon as it is published. Engine mutations happen
//! synchronously inside those calls; work that must observe sibling
//! mutations is deferred on the `TaskQueue`.

pub mod auto_resizer;
pub mod chart_config;
pub mod chart_host;
pub mod fit_content_trigger;
pub mod price_line_binding;
pub mod scope;
pub mod series_binding;
pub mod series_hover;
pub mod subscription_bridge;
pub mod task_queue;
pub mod tooltip;

pub use auto_resizer::{AutoResizer, AutoResizerProps, ResizeNotifier, TriggerSources};
pub use chart_config::{
    CHART_HOST_CONFIG_JSON_SCHEMA_V1, ChartEventHandlers, ChartHostConfig,
    ChartHostConfigJsonContractV1, ChartHostProps,
};
pub use chart_host::ChartHost;
pub use fit_content_trigger::{DepKey, FitContentTrigger};
pub use price_line_binding::PriceLineBinding;
pub use scope::{ChartScope, ExplicitSize, ScopeConsumer, ScopeProvider, ScopeWatch, SeriesScope};
pub use series_binding::{SeriesBinding, SeriesProps};
pub use series_hover::{SeriesHoverHandler, SeriesHoverSubscriber};
pub use subscription_bridge::{ChartSubscriber, SubscriptionBridge};
pub use task_queue::TaskQueue;
pub use tooltip::{
    DEFAULT_TOOLTIP_DECLARATIONS, MakeTransform, TOOLTIP_GAP_ABOVE, TOOLTIP_OFFSET_BELOW, Tooltip,
    TooltipContent, TooltipContext, TooltipProps, TooltipStyle, TooltipVisibility, TransformInput,
    default_make_transform, format_translate, tooltip_position,
};
