//! Static model description consumed by [`Server::build`](crate::Server::build).
//!
//! A description lists logical devices, logical nodes, data objects and data
//! attributes with their initial values, in the order they should appear in
//! directory listings. It can be assembled in code with the fluent builders
//! or loaded from JSON:
//!
//! ```json
//! {
//!   "name": "IED1",
//!   "devices": [{
//!     "name": "Device1",
//!     "nodes": [{
//!       "name": "MMXU1",
//!       "objects": [{
//!         "name": "PhV",
//!         "attributes": [{ "name": "phsA", "value": { "Float": 0.0 } }]
//!       }]
//!     }]
//!   }]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{DataValue, Quality};

/// Description of a whole server namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    /// Server (IED) name
    pub name: String,
    /// Logical devices
    #[serde(default)]
    pub devices: Vec<DeviceDescription>,
}

impl ModelDescription {
    /// Create an empty description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            devices: Vec::new(),
        }
    }

    /// Append a logical device.
    pub fn device(mut self, device: DeviceDescription) -> Self {
        self.devices.push(device);
        self
    }

    /// Parse a description from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the description as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Description of a logical device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescription {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
}

impl DeviceDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// Append a logical node.
    pub fn node(mut self, node: NodeDescription) -> Self {
        self.nodes.push(node);
        self
    }
}

/// Description of a logical node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
}

impl NodeDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    /// Append a data object.
    pub fn object(mut self, object: ObjectDescription) -> Self {
        self.objects.push(object);
        self
    }
}

/// Description of a data object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDescription>,
}

impl ObjectDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Append a data attribute with good initial quality.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.attributes.push(AttributeDescription {
            name: name.into(),
            value: value.into(),
            quality: Quality::Good,
        });
        self
    }
}

/// Description of a data attribute. The kind of `value` becomes the
/// attribute's fixed kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescription {
    pub name: String,
    pub value: DataValue,
    #[serde(default)]
    pub quality: Quality,
}
