//! Typed attribute values.
//!
//! Every data attribute has a [`ValueKind`] fixed when the model is built.
//! Writes carrying a [`DataValue`] of another kind are rejected.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Basic value kinds of a data attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// BOOLEAN
    Boolean,
    /// INT64 (all signed/unsigned integer basic types map here)
    Integer,
    /// FLOAT64 (FLOAT32 is widened)
    Float,
    /// VISIBLE STRING / UNICODE STRING
    VisibleString,
    /// OCTET STRING
    OctetString,
}

impl ValueKind {
    /// Check if this is a numeric kind.
    #[inline]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::VisibleString => write!(f, "VISIBLE_STRING"),
            Self::OctetString => write!(f, "OCTET_STRING"),
        }
    }
}

/// Attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// Boolean status (e.g. `Pos.stVal` of a switch)
    Boolean(bool),

    /// Integer value (counters, enumerations, step positions)
    Integer(i64),

    /// Floating point measurement (e.g. `PhV.phsA.cVal.mag.f`)
    Float(f64),

    /// Text value
    VisibleString(String),

    /// Raw octets
    OctetString(Bytes),
}

impl DataValue {
    /// Get the kind of this value.
    #[inline]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::VisibleString(_) => ValueKind::VisibleString,
            Self::OctetString(_) => ValueKind::OctetString,
        }
    }

    /// Convert to f64 if numeric.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to bool if boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow the text if this is a string value.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::VisibleString(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::VisibleString(v) => write!(f, "\"{}\"", v),
            Self::OctetString(v) => {
                for byte in v.iter() {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f32> for DataValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        Self::VisibleString(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        Self::VisibleString(v)
    }
}

impl From<Bytes> for DataValue {
    fn from(v: Bytes) -> Self {
        Self::OctetString(v)
    }
}
