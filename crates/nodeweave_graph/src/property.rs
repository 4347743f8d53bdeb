// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node property values and the editor metadata that describes them.
//!
//! Values and metadata are kept apart: a [`PropertyValue`] lives on the node,
//! while its [`PropertyMeta`] is stored once per node type in the graph's
//! common property schema.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Dynamically typed property value.
///
/// Serialized as a plain JSON value, so `1` reads back as `Int` and `1.0`
/// as `Float`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    String(String),
    /// Ordered list
    List(Vec<PropertyValue>),
    /// Ordered string-keyed map
    Map(IndexMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Get the value as a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a float; integers are widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get the value as an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as a list
    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Interpret a two element numeric list as a point/size pair
    pub fn as_pair(&self) -> Option<[f64; 2]> {
        match self.as_list()? {
            [x, y] => Some([x.as_f64()?, y.as_f64()?]),
            _ => None,
        }
    }

    /// Interpret a 3 or 4 element integer list as an RGBA color
    pub fn as_color(&self) -> Option<[u8; 4]> {
        let channels = self.as_list()?;
        if !(3..=4).contains(&channels.len()) {
            return None;
        }
        let mut rgba = [0, 0, 0, 255];
        for (slot, channel) in rgba.iter_mut().zip(channels) {
            *slot = u8::try_from(channel.as_i64()?).ok()?;
        }
        Some(rgba)
    }

    /// Build a list value from a point/size pair
    pub fn pair(value: [f64; 2]) -> Self {
        Self::List(vec![Self::Float(value[0]), Self::Float(value[1])])
    }

    /// Build a list value from an RGBA color
    pub fn color(value: [u8; 4]) -> Self {
        Self::List(value.iter().map(|c| Self::Int(i64::from(*c))).collect())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(value: Vec<PropertyValue>) -> Self {
        Self::List(value)
    }
}

/// Editor widget used to present a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    /// Not shown in a properties panel
    #[default]
    Hidden,
    /// Read-only label
    Label,
    /// Single line text input
    LineEdit,
    /// Multi line text input
    TextEdit,
    /// Drop down list, see [`PropertyMeta::items`]
    ComboBox,
    /// Check box
    CheckBox,
    /// Integer spin box
    SpinBox,
    /// Float spin box
    DoubleSpinBox,
    /// Color picker
    ColorPicker,
    /// Integer slider, see [`PropertyMeta::range`]
    Slider,
    /// Float slider, see [`PropertyMeta::range`]
    DoubleSlider,
    /// File open path
    FileOpen,
    /// File save path
    FileSave,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
}

/// Editor metadata for one property
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyMeta {
    /// Widget used by a properties panel
    pub widget_type: WidgetType,
    /// Properties panel tab
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    /// Choices for [`WidgetType::ComboBox`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    /// Min/max for sliders and spin boxes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    /// Widget tooltip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl PropertyMeta {
    /// Default tab for custom properties
    pub const DEFAULT_TAB: &'static str = "Properties";

    /// Create metadata for a widget type
    pub fn new(widget_type: WidgetType) -> Self {
        Self {
            widget_type,
            ..Self::default()
        }
    }

    /// Set the tab
    pub fn with_tab(mut self, tab: impl Into<String>) -> Self {
        self.tab = Some(tab.into());
        self
    }

    /// Set the combo box items
    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self
    }

    /// Set the slider range
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some([min, max]);
        self
    }

    /// Set the tooltip
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Overlay the fields that `other` sets
    pub fn merge(&mut self, other: &PropertyMeta) {
        self.widget_type = other.widget_type;
        if other.tab.is_some() {
            self.tab.clone_from(&other.tab);
        }
        if !other.items.is_empty() {
            self.items.clone_from(&other.items);
        }
        if other.range.is_some() {
            self.range = other.range;
        }
        if other.tooltip.is_some() {
            self.tooltip.clone_from(&other.tooltip);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_encoding() {
        let mut map = IndexMap::new();
        map.insert("mode".to_string(), PropertyValue::from("add"));
        map.insert("gain".to_string(), PropertyValue::from(0.5));
        map.insert("steps".to_string(), PropertyValue::from(4));
        map.insert("flags".to_string(), PropertyValue::List(vec![true.into(), false.into()]));

        let json = serde_json::to_string(&PropertyValue::Map(map.clone())).unwrap();
        assert_eq!(
            json,
            r#"{"mode":"add","gain":0.5,"steps":4,"flags":[true,false]}"#
        );

        let loaded: PropertyValue = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, PropertyValue::Map(map));
    }

    #[test]
    fn test_pair_and_color_helpers() {
        assert_eq!(PropertyValue::pair([1.0, -2.5]).as_pair(), Some([1.0, -2.5]));

        let ints = PropertyValue::List(vec![3.into(), 4.into()]);
        assert_eq!(ints.as_pair(), Some([3.0, 4.0]));

        let rgb = PropertyValue::List(vec![10.into(), 20.into(), 30.into()]);
        assert_eq!(rgb.as_color(), Some([10, 20, 30, 255]));
        assert_eq!(PropertyValue::List(vec![300.into(), 0.into(), 0.into()]).as_color(), None);
    }

    #[test]
    fn test_meta_merge() {
        let mut meta = PropertyMeta::new(WidgetType::ComboBox).with_items(["a", "b"]);
        meta.merge(&PropertyMeta::new(WidgetType::ComboBox).with_tab("Extra"));
        assert_eq!(meta.items, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(meta.tab.as_deref(), Some("Extra"));
    }
}
