//! Object references.
//!
//! An object reference addresses a node of the model tree:
//!
//! ```text
//! LD              logical device
//! LD/LN           logical node
//! LD/LN.DO        data object
//! LD/LN.DO.DA     data attribute (DA may itself contain '.')
//! ```

use std::str::FromStr;

use crate::error::{Iec61850Error, Result};

/// Separator between logical device and logical node.
pub const DEVICE_SEPARATOR: char = '/';

/// Separator between logical node, data object and data attribute.
pub const MEMBER_SEPARATOR: char = '.';

/// Level of the tree an object reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceLevel {
    /// Logical device
    Device,
    /// Logical node
    Node,
    /// Data object
    Object,
    /// Data attribute
    Attribute,
}

/// Parsed object reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectReference {
    device: String,
    node: Option<String>,
    object: Option<String>,
    attribute: Option<String>,
}

impl ObjectReference {
    /// Parse a reference of any level.
    pub fn parse(s: &str) -> Result<Self> {
        let (device, rest) = match s.split_once(DEVICE_SEPARATOR) {
            Some((device, rest)) => (device, Some(rest)),
            None => (s, None),
        };
        validate_name(device, s, false)?;

        let mut reference = Self {
            device: device.to_string(),
            node: None,
            object: None,
            attribute: None,
        };

        let Some(rest) = rest else {
            return Ok(reference);
        };

        let mut parts = rest.splitn(3, MEMBER_SEPARATOR);
        if let Some(node) = parts.next() {
            validate_name(node, s, false)?;
            reference.node = Some(node.to_string());
        }
        if let Some(object) = parts.next() {
            validate_name(object, s, false)?;
            reference.object = Some(object.to_string());
        }
        if let Some(attribute) = parts.next() {
            validate_name(attribute, s, true)?;
            reference.attribute = Some(attribute.to_string());
        }

        Ok(reference)
    }

    /// Parse a reference that must address a data attribute.
    pub fn parse_attribute(s: &str) -> Result<Self> {
        let reference = Self::parse(s)?;
        if reference.level() != ReferenceLevel::Attribute {
            return Err(Iec61850Error::invalid_reference(format!(
                "{} does not address a data attribute",
                s
            )));
        }
        Ok(reference)
    }

    /// Parse a reference that must address a logical node.
    pub fn parse_node(s: &str) -> Result<Self> {
        let reference = Self::parse(s)?;
        if reference.level() != ReferenceLevel::Node {
            return Err(Iec61850Error::invalid_reference(format!(
                "{} does not address a logical node",
                s
            )));
        }
        Ok(reference)
    }

    /// Build a data attribute reference from its four names.
    pub fn attribute(device: &str, node: &str, object: &str, attribute: &str) -> Self {
        Self {
            device: device.to_string(),
            node: Some(node.to_string()),
            object: Some(object.to_string()),
            attribute: Some(attribute.to_string()),
        }
    }

    /// Build a logical node reference.
    pub fn node(device: &str, node: &str) -> Self {
        Self {
            device: device.to_string(),
            node: Some(node.to_string()),
            object: None,
            attribute: None,
        }
    }

    /// Level addressed by this reference.
    pub fn level(&self) -> ReferenceLevel {
        match (&self.node, &self.object, &self.attribute) {
            (None, _, _) => ReferenceLevel::Device,
            (Some(_), None, _) => ReferenceLevel::Node,
            (Some(_), Some(_), None) => ReferenceLevel::Object,
            (Some(_), Some(_), Some(_)) => ReferenceLevel::Attribute,
        }
    }

    /// Logical device name.
    pub fn device_name(&self) -> &str {
        &self.device
    }

    /// Logical node name, if addressed.
    pub fn node_name(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// Data object name, if addressed.
    pub fn object_name(&self) -> Option<&str> {
        self.object.as_deref()
    }

    /// Data attribute name, if addressed.
    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute.as_deref()
    }
}

impl FromStr for ObjectReference {
    type Err = Iec61850Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.device)?;
        if let Some(node) = &self.node {
            write!(f, "{}{}", DEVICE_SEPARATOR, node)?;
        }
        if let Some(object) = &self.object {
            write!(f, "{}{}", MEMBER_SEPARATOR, object)?;
        }
        if let Some(attribute) = &self.attribute {
            write!(f, "{}{}", MEMBER_SEPARATOR, attribute)?;
        }
        Ok(())
    }
}

/// Check a single node name.
///
/// Names are non-empty and never contain [`DEVICE_SEPARATOR`]. Only data
/// attribute names may contain [`MEMBER_SEPARATOR`] (`phsA.cVal.mag.f`), and
/// then not as a leading, trailing or doubled separator.
pub(crate) fn validate_name(name: &str, context: &str, allow_dots: bool) -> Result<()> {
    let bad = name.is_empty()
        || name.contains(DEVICE_SEPARATOR)
        || name.chars().any(char::is_whitespace)
        || if allow_dots {
            name.split(MEMBER_SEPARATOR).any(str::is_empty)
        } else {
            name.contains(MEMBER_SEPARATOR)
        };

    if bad {
        return Err(Iec61850Error::invalid_reference(format!(
            "illegal name {:?} in {:?}",
            name, context
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!(
            ObjectReference::parse("Device1").unwrap().level(),
            ReferenceLevel::Device
        );
        assert_eq!(
            ObjectReference::parse("Device1/MMXU1").unwrap().level(),
            ReferenceLevel::Node
        );
        assert_eq!(
            ObjectReference::parse("Device1/MMXU1.PhV").unwrap().level(),
            ReferenceLevel::Object
        );
        assert_eq!(
            ObjectReference::parse("Device1/MMXU1.PhV.phsA").unwrap().level(),
            ReferenceLevel::Attribute
        );
    }

    #[test]
    fn test_dotted_attribute_name() {
        let r = ObjectReference::parse("Protection/MMXU1.PhV.phsA.cVal.mag.f").unwrap();
        assert_eq!(r.device_name(), "Protection");
        assert_eq!(r.node_name(), Some("MMXU1"));
        assert_eq!(r.object_name(), Some("PhV"));
        assert_eq!(r.attribute_name(), Some("phsA.cVal.mag.f"));
        assert_eq!(r.to_string(), "Protection/MMXU1.PhV.phsA.cVal.mag.f");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "/MMXU1",
            "Device1/",
            "Device1/MMXU1.",
            "Device1/MMXU1..phsA",
            "Device1/MMXU1.PhV.phsA.",
            "Device1/MMXU1.PhV.ph sA",
            "Device1/MMXU1/PhV",
            "Device1.MMXU1",
        ] {
            assert!(
                matches!(
                    ObjectReference::parse(bad),
                    Err(Iec61850Error::InvalidReference(_))
                ),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_parse_attribute_requires_leaf() {
        assert!(ObjectReference::parse_attribute("Device1/MMXU1.PhV").is_err());
        assert!(ObjectReference::parse_attribute("Device1/MMXU1.PhV.phsA").is_ok());
        assert!(ObjectReference::parse_node("Device1/MMXU1").is_ok());
        assert!(ObjectReference::parse_node("Device1").is_err());
    }

    #[test]
    fn test_constructors_match_parse() {
        assert_eq!(
            ObjectReference::attribute("Device1", "MMXU1", "PhV", "phsA"),
            "Device1/MMXU1.PhV.phsA".parse().unwrap()
        );
        assert_eq!(
            ObjectReference::node("Device1", "MMXU1"),
            "Device1/MMXU1".parse().unwrap()
        );
    }
}
