// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.
//!
//! A [`Node`] is a plain record: built-in properties as typed fields, ports
//! keyed by name per direction, and a bag of custom [`PropertyValue`]s whose
//! editor metadata travels alongside until the node joins a graph.

use crate::error::{GraphError, Result};
use crate::port::{Port, PortDirection, PortSpec};
use crate::property::{PropertyMeta, PropertyValue, WidgetType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node, 32 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Port flow direction of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    /// Inputs on the left, outputs on the right
    #[default]
    Horizontal,
    /// Inputs on top, outputs below
    Vertical,
}

impl LayoutDirection {
    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }

    /// Parse from a property value; accepts the name or `0`/`1`
    pub fn from_value(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::String(s) => match s.as_str() {
                "horizontal" => Some(Self::Horizontal),
                "vertical" => Some(Self::Vertical),
                _ => None,
            },
            PropertyValue::Int(0) => Some(Self::Horizontal),
            PropertyValue::Int(1) => Some(Self::Vertical),
            _ => None,
        }
    }
}

/// Names of the properties every node carries
pub const BUILTIN_PROPERTIES: &[&str] = &[
    "id",
    "type_id",
    "name",
    "color",
    "text_color",
    "disabled",
    "selected",
    "visible",
    "width",
    "height",
    "pos",
    "layout_direction",
    "port_deletion_allowed",
];

/// Whether `name` is a built-in node property
pub fn is_builtin_property(name: &str) -> bool {
    BUILTIN_PROPERTIES.contains(&name)
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Registered type identifier, `<domain>.<ClassName>`
    pub type_id: String,
    /// Display name, unique within a graph
    pub name: String,
    /// Position in the graph
    pub position: [f64; 2],
    /// Size reported by the view
    pub size: [f64; 2],
    /// Border color (RGBA)
    pub color: [u8; 4],
    /// Label color (RGBA)
    pub text_color: [u8; 4],
    /// Whether the node is disabled
    pub disabled: bool,
    /// Whether the node is selected
    pub selected: bool,
    /// Whether the node is visible
    pub visible: bool,
    /// Port flow direction
    pub layout_direction: LayoutDirection,
    /// Whether ports may be added and removed after creation
    pub port_deletion_allowed: bool,
    inputs: IndexMap<String, Port>,
    outputs: IndexMap<String, Port>,
    custom: IndexMap<String, PropertyValue>,
    property_meta: IndexMap<String, PropertyMeta>,
}

impl Node {
    /// Default node size
    pub const DEFAULT_SIZE: [f64; 2] = [100.0, 80.0];

    /// Create a node with default properties and no ports
    pub fn new(type_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            type_id: type_id.into(),
            name: name.into(),
            position: [0.0, 0.0],
            size: Self::DEFAULT_SIZE,
            color: [74, 84, 85, 255],
            text_color: [255, 255, 255, 180],
            disabled: false,
            selected: false,
            visible: true,
            layout_direction: LayoutDirection::Horizontal,
            port_deletion_allowed: false,
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            custom: IndexMap::new(),
            property_meta: IndexMap::new(),
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = [x, y];
        self
    }

    /// Allow ports to be added and removed after creation
    pub fn with_port_deletion(mut self) -> Self {
        self.port_deletion_allowed = true;
        self
    }

    /// Add an input port, logging and skipping duplicates
    pub fn with_input(mut self, spec: impl Into<PortSpec>) -> Self {
        if let Err(e) = self.add_input(spec) {
            tracing::warn!("{}: {}", self.type_id, e);
        }
        self
    }

    /// Add an output port, logging and skipping duplicates
    pub fn with_output(mut self, spec: impl Into<PortSpec>) -> Self {
        if let Err(e) = self.add_output(spec) {
            tracing::warn!("{}: {}", self.type_id, e);
        }
        self
    }

    /// Declare a custom property, logging and skipping duplicates
    pub fn with_property(
        mut self,
        name: &str,
        value: impl Into<PropertyValue>,
        meta: PropertyMeta,
    ) -> Self {
        if let Err(e) = self.add_property(name, value, meta) {
            tracing::warn!("{}: {}", self.type_id, e);
        }
        self
    }

    /// Add an input port
    pub fn add_input(&mut self, spec: impl Into<PortSpec>) -> Result<&Port> {
        self.add_port(PortDirection::In, spec.into())
    }

    /// Add an output port
    pub fn add_output(&mut self, spec: impl Into<PortSpec>) -> Result<&Port> {
        self.add_port(PortDirection::Out, spec.into())
    }

    fn add_port(&mut self, direction: PortDirection, spec: PortSpec) -> Result<&Port> {
        if self.ports(direction).contains_key(&spec.name) {
            return Err(GraphError::DuplicateProperty(spec.name));
        }
        let port = spec.build(self.id.clone(), direction);
        let ports = self.ports_mut(direction);
        let (index, _) = ports.insert_full(port.name.clone(), port);
        Ok(&ports[index])
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.get(name)
    }

    /// Get an output port by name
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.get(name)
    }

    /// Get a port by direction and name
    pub fn port(&self, direction: PortDirection, name: &str) -> Option<&Port> {
        self.ports(direction).get(name)
    }

    /// Get a port by direction and name or fail with `PortNotFound`
    pub fn require_port(&self, direction: PortDirection, name: &str) -> Result<&Port> {
        self.port(direction, name)
            .ok_or_else(|| GraphError::PortNotFound {
                node: self.id.clone(),
                direction,
                port: name.to_string(),
            })
    }

    /// Input ports in declaration order
    pub fn inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.values()
    }

    /// Output ports in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.values()
    }

    /// All ports, inputs first
    pub fn all_ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.values().chain(self.outputs.values())
    }

    /// Ports of one direction keyed by name
    pub fn ports(&self, direction: PortDirection) -> &IndexMap<String, Port> {
        match direction {
            PortDirection::In => &self.inputs,
            PortDirection::Out => &self.outputs,
        }
    }

    pub(crate) fn ports_mut(&mut self, direction: PortDirection) -> &mut IndexMap<String, Port> {
        match direction {
            PortDirection::In => &mut self.inputs,
            PortDirection::Out => &mut self.outputs,
        }
    }

    pub(crate) fn port_mut(&mut self, direction: PortDirection, name: &str) -> Option<&mut Port> {
        self.ports_mut(direction).get_mut(name)
    }

    /// Insert a detached port at `index`, clamped to the port count
    pub(crate) fn insert_port(&mut self, index: usize, mut port: Port) {
        port.set_node(self.id.clone());
        let ports = self.ports_mut(port.direction);
        let index = index.min(ports.len());
        ports.shift_insert(index, port.name.clone(), port);
    }

    /// Remove a port, returning its former index
    pub(crate) fn take_port(&mut self, direction: PortDirection, name: &str) -> Option<(usize, Port)> {
        self.ports_mut(direction)
            .shift_remove_full(name)
            .map(|(index, _, port)| (index, port))
    }

    /// Replace the id, keeping the ports pointing at their node
    pub(crate) fn assign_id(&mut self, id: NodeId) {
        for port in self.inputs.values_mut().chain(self.outputs.values_mut()) {
            port.set_node(id.clone());
        }
        self.id = id;
    }

    /// Drop every peer entry, used on freshly copied nodes
    pub(crate) fn clear_peers(&mut self) {
        for port in self.inputs.values_mut().chain(self.outputs.values_mut()) {
            port.clear_peers();
        }
    }

    /// Declare a custom property
    pub fn add_property(
        &mut self,
        name: &str,
        value: impl Into<PropertyValue>,
        meta: PropertyMeta,
    ) -> Result<()> {
        if is_builtin_property(name) || self.custom.contains_key(name) {
            return Err(GraphError::DuplicateProperty(name.to_string()));
        }
        let mut meta = meta;
        if meta.tab.is_none() {
            meta.tab = Some(PropertyMeta::DEFAULT_TAB.to_string());
        }
        self.custom.insert(name.to_string(), value.into());
        self.property_meta.insert(name.to_string(), meta);
        Ok(())
    }

    /// Whether the property exists, built-in or custom
    pub fn has_property(&self, name: &str) -> bool {
        is_builtin_property(name) || self.custom.contains_key(name)
    }

    /// Whether the property is a declared custom property
    pub fn is_custom_property(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Custom properties in declaration order
    pub fn custom_properties(&self) -> &IndexMap<String, PropertyValue> {
        &self.custom
    }

    /// Editor metadata declared by the constructor
    pub fn property_meta(&self) -> &IndexMap<String, PropertyMeta> {
        &self.property_meta
    }

    /// Read a property by name
    pub fn get_property(&self, name: &str) -> Option<PropertyValue> {
        let value = match name {
            "id" => self.id.as_str().into(),
            "type_id" => self.type_id.as_str().into(),
            "name" => self.name.as_str().into(),
            "color" => PropertyValue::color(self.color),
            "text_color" => PropertyValue::color(self.text_color),
            "disabled" => self.disabled.into(),
            "selected" => self.selected.into(),
            "visible" => self.visible.into(),
            "width" => self.size[0].into(),
            "height" => self.size[1].into(),
            "pos" => PropertyValue::pair(self.position),
            "layout_direction" => self.layout_direction.as_str().into(),
            "port_deletion_allowed" => self.port_deletion_allowed.into(),
            _ => return self.custom.get(name).cloned(),
        };
        Some(value)
    }

    /// Write a property by name.
    ///
    /// Built-ins are checked for shape; `id` and `type_id` are read-only.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<()> {
        let invalid = || GraphError::InvalidPropertyValue(name.to_string());
        match name {
            "id" | "type_id" => return Err(GraphError::ReadOnlyProperty(name.to_string())),
            "name" => self.name = value.as_str().ok_or_else(invalid)?.to_string(),
            "color" => self.color = value.as_color().ok_or_else(invalid)?,
            "text_color" => self.text_color = value.as_color().ok_or_else(invalid)?,
            "disabled" => self.disabled = value.as_bool().ok_or_else(invalid)?,
            "selected" => self.selected = value.as_bool().ok_or_else(invalid)?,
            "visible" => self.visible = value.as_bool().ok_or_else(invalid)?,
            "width" => self.size[0] = value.as_f64().ok_or_else(invalid)?,
            "height" => self.size[1] = value.as_f64().ok_or_else(invalid)?,
            "pos" => self.position = value.as_pair().ok_or_else(invalid)?,
            "layout_direction" => {
                self.layout_direction = LayoutDirection::from_value(&value).ok_or_else(invalid)?;
            }
            "port_deletion_allowed" => {
                self.port_deletion_allowed = value.as_bool().ok_or_else(invalid)?;
            }
            _ => {
                let slot = self
                    .custom
                    .get_mut(name)
                    .ok_or_else(|| GraphError::UnknownProperty(name.to_string()))?;
                *slot = value;
            }
        }
        Ok(())
    }

    /// Every property value, built-ins first then custom ones
    pub fn properties(&self) -> IndexMap<String, PropertyValue> {
        BUILTIN_PROPERTIES
            .iter()
            .map(|name| name.to_string())
            .chain(self.custom.keys().cloned())
            .filter_map(|name| {
                let value = self.get_property(&name)?;
                Some((name, value))
            })
            .collect()
    }

    /// Editor metadata for the built-in properties
    pub fn builtin_meta() -> IndexMap<String, PropertyMeta> {
        let widget = |name: &str| match name {
            "id" | "type_id" => WidgetType::Label,
            "name" => WidgetType::LineEdit,
            "color" | "text_color" => WidgetType::ColorPicker,
            "disabled" => WidgetType::CheckBox,
            _ => WidgetType::Hidden,
        };
        BUILTIN_PROPERTIES
            .iter()
            .map(|name| (name.to_string(), PropertyMeta::new(widget(name)).with_tab("Node")))
            .collect()
    }
}
