use serde::{Deserialize, Serialize};

use crate::core::ChartOptions;
use crate::engine::{
    LogicalRangeChangeHandler, MouseEventHandler, SizeChangeHandler, TimeRangeChangeHandler,
};
use crate::error::{BindingError, BindingResult};

use super::{ExplicitSize, TriggerSources};

pub const CHART_HOST_CONFIG_JSON_SCHEMA_V1: u32 = 1;

/// Serializable part of the chart host props.
///
/// Width/height are kept out of `options` so they can decide the resize
/// policy; they are merged back in when talking to the engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartHostConfig {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub options: ChartOptions,
    /// Skips the built-in window-driven resize when a standalone
    /// `AutoResizer` takes care of sizing.
    #[serde(default)]
    pub disable_auto_resize: bool,
    /// Sources driving the built-in resize; `None` means the window signal.
    #[serde(default)]
    pub auto_resize_triggers: Option<TriggerSources>,
    /// Skips the fit-content scheduled right after creation when a
    /// `FitContentTrigger` takes care of it.
    #[serde(default)]
    pub disable_auto_content_fit_on_init: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartHostConfigJsonContractV1 {
    pub schema_version: u32,
    pub config: ChartHostConfig,
}

impl ChartHostConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ChartOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_auto_resize_disabled(mut self) -> Self {
        self.disable_auto_resize = true;
        self
    }

    #[must_use]
    pub fn with_auto_resize_triggers(mut self, triggers: TriggerSources) -> Self {
        self.auto_resize_triggers = Some(triggers);
        self
    }

    #[must_use]
    pub fn auto_resize_triggers(&self) -> TriggerSources {
        self.auto_resize_triggers
            .unwrap_or(TriggerSources::WINDOW_RESIZE)
    }

    #[must_use]
    pub fn with_initial_fit_disabled(mut self) -> Self {
        self.disable_auto_content_fit_on_init = true;
        self
    }

    #[must_use]
    pub fn explicit_size(&self) -> ExplicitSize {
        ExplicitSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Options handed to the engine; explicit width/height win over `options`.
    #[must_use]
    pub fn merged_options(&self) -> ChartOptions {
        let mut merged = self.options.clone();
        if let Some(width) = self.width {
            merged.set("width", width);
        }
        if let Some(height) = self.height {
            merged.set("height", height);
        }
        merged
    }

    pub fn to_json_contract_v1_pretty(&self) -> BindingResult<String> {
        let payload = ChartHostConfigJsonContractV1 {
            schema_version: CHART_HOST_CONFIG_JSON_SCHEMA_V1,
            config: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            BindingError::InvalidData(format!("failed to serialize chart host config v1: {e}"))
        })
    }

    /// Accepts either a bare config object or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> BindingResult<Self> {
        if let Ok(config) = serde_json::from_str::<Self>(input) {
            return Ok(config);
        }
        let payload: ChartHostConfigJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            BindingError::InvalidData(format!("failed to parse chart host config payload: {e}"))
        })?;
        if payload.schema_version != CHART_HOST_CONFIG_JSON_SCHEMA_V1 {
            return Err(BindingError::InvalidData(format!(
                "unsupported chart host config schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.config)
    }
}

/// Handlers bridged to the engine's event streams.
#[derive(Debug, Clone, Default)]
pub struct ChartEventHandlers {
    pub on_click: Option<MouseEventHandler>,
    pub on_crosshair_move: Option<MouseEventHandler>,
    pub on_time_scale_size_change: Option<SizeChangeHandler>,
    pub on_visible_time_range_change: Option<TimeRangeChangeHandler>,
    pub on_visible_logical_range_change: Option<LogicalRangeChangeHandler>,
}

#[derive(Debug, Clone, Default)]
pub struct ChartHostProps {
    pub config: ChartHostConfig,
    pub handlers: ChartEventHandlers,
}

impl ChartHostProps {
    #[must_use]
    pub fn new(config: ChartHostConfig) -> Self {
        Self {
            config,
            handlers: ChartEventHandlers::default(),
        }
    }

    #[must_use]
    pub fn with_handlers(mut self, handlers: ChartEventHandlers) -> Self {
        self.handlers = handlers;
        self
    }
}
