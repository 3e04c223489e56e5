use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BindingError, BindingResult};

/// Deep-partial option object forwarded to the engine.
///
/// The binding never interprets individual options; it only compares bags by
/// value and deep-merges them, so any engine option shape round-trips.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionBag(Map<String, Value>);

pub type ChartOptions = OptionBag;
pub type SeriesOptions = OptionBag;

impl OptionBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value at a dotted path such as `layout.textColor`.
    #[must_use]
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set(path, value);
        self
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let mut segments = path.split('.').peekable();
        let mut cursor = &mut self.0;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                cursor.insert(segment.to_owned(), value.into());
                return;
            }
            let entry = cursor
                .entry(segment.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return;
            };
            cursor = next;
        }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.0.get(first)?, |value, segment| value.get(segment))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Recursively merges `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &OptionBag) {
        merge_maps(&mut self.0, &other.0);
    }

    #[must_use]
    pub fn merged(mut self, other: &OptionBag) -> Self {
        self.merge(other);
        self
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn from_json_str(input: &str) -> BindingResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| BindingError::InvalidData(format!("failed to parse option bag: {e}")))
    }
}

impl From<Map<String, Value>> for OptionBag {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, incoming) in source {
        match (target.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_maps(existing, nested),
            _ => {
                target.insert(key.clone(), incoming.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dotted,
    Dashed,
    LargeDashed,
    SparseDotted,
}

/// Options of a horizontal price line attached to a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLineOptions {
    pub price: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    #[serde(default)]
    pub line_style: LineStyle,
    #[serde(default = "default_line_visible")]
    pub line_visible: bool,
    #[serde(default = "default_axis_label_visible")]
    pub axis_label_visible: bool,
    #[serde(default)]
    pub title: String,
}

impl PriceLineOptions {
    #[must_use]
    pub fn at_price(price: f64) -> Self {
        Self {
            price,
            color: String::new(),
            line_width: default_line_width(),
            line_style: LineStyle::default(),
            line_visible: default_line_visible(),
            axis_label_visible: default_axis_label_visible(),
            title: String::new(),
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_line_style(mut self, style: LineStyle) -> Self {
        self.line_style = style;
        self
    }
}

fn default_line_width() -> u32 {
    1
}

fn default_line_visible() -> bool {
    true
}

fn default_axis_label_visible() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::OptionBag;

    #[test]
    fn dotted_paths_build_nested_objects() {
        let bag = OptionBag::new()
            .with("layout.textColor", "#333")
            .with("layout.fontSize", 12);
        assert_eq!(bag.get("layout.textColor"), Some(&json!("#333")));
        assert_eq!(bag.get("layout"), Some(&json!({"textColor": "#333", "fontSize": 12})));
    }

    #[test]
    fn merge_is_recursive_and_incoming_wins() {
        let base = OptionBag::new()
            .with("grid.vertLines.visible", true)
            .with("grid.horzLines.visible", true);
        let patch = OptionBag::new().with("grid.vertLines.visible", false);
        let merged = base.merged(&patch);
        assert_eq!(merged.get("grid.vertLines.visible"), Some(&json!(false)));
        assert_eq!(merged.get("grid.horzLines.visible"), Some(&json!(true)));
    }

    #[test]
    fn scalar_is_replaced_by_nested_path() {
        let bag = OptionBag::new().with("a", 1).with("a.b", 2);
        assert_eq!(bag.get("a.b"), Some(&json!(2)));
    }
}
