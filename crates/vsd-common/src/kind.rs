//! Signal classification: what role a node plays and what type it carries

use std::fmt;

use crate::error::VsdError;

/// The role a signal plays in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ElementKind {
    /// An interior node; holds children, no value
    Branch,
    /// A read-only descriptive property
    Attribute,
    /// A read-only measured quantity
    Sensor,
    /// A writable control point
    Actuator,
    /// A generic leaf not further classified
    Element,
}

impl ElementKind {
    /// True for [`ElementKind::Branch`]
    pub fn is_branch(self) -> bool {
        matches!(self, ElementKind::Branch)
    }

    /// Parse a CSV `elem_kind` token, case-insensitively
    pub fn parse(token: &str) -> Result<Self, VsdError> {
        match token.to_ascii_lowercase().as_str() {
            "branch" => Ok(ElementKind::Branch),
            "attribute" => Ok(ElementKind::Attribute),
            "sensor" => Ok(ElementKind::Sensor),
            "actuator" => Ok(ElementKind::Actuator),
            "element" => Ok(ElementKind::Element),
            other => Err(VsdError::invalid_argument(format!("unknown elem_kind: {other}"))),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementKind::Branch => "branch",
            ElementKind::Attribute => "attribute",
            ElementKind::Sensor => "sensor",
            ElementKind::Actuator => "actuator",
            ElementKind::Element => "element",
        };
        f.write_str(s)
    }
}

/// The scalar (or string/stream) type a leaf's value cell holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DataKind {
    /// 8-bit signed integer
    I8,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit signed integer
    I16,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit signed integer
    I32,
    /// 32-bit unsigned integer
    U32,
    /// 32-bit IEEE-754 float
    F32,
    /// 64-bit IEEE-754 float
    F64,
    /// Boolean
    Bool,
    /// UTF-8 string, grow-only buffer
    String,
    /// Opaque byte stream; not transportable by the codec (§4.3, unsupported-kind)
    Stream,
    /// No associated value; used for pure branches that were mistakenly typed
    None,
}

impl DataKind {
    /// Fixed wire width in bytes for scalar kinds; `None` for variable-length kinds (string, stream)
    /// or for kinds with no wire representation at all.
    pub fn fixed_width(self) -> Option<usize> {
        use DataKind::*;
        match self {
            I8 | U8 | Bool => Some(1),
            I16 | U16 => Some(2),
            I32 | U32 | F32 => Some(4),
            F64 => Some(8),
            String | Stream | DataKind::None => Option::None,
        }
    }

    /// True for [`DataKind::String`]
    pub fn is_string(self) -> bool {
        matches!(self, DataKind::String)
    }

    /// True for kinds the codec refuses to carry (§4.3)
    pub fn is_transportable(self) -> bool {
        !matches!(self, DataKind::Stream | DataKind::None)
    }

    /// Parse a CSV `data_kind` token, case-insensitively
    pub fn parse(token: &str) -> Result<Self, VsdError> {
        use DataKind::*;
        match token.to_ascii_lowercase().as_str() {
            "i8" => Ok(I8),
            "u8" => Ok(U8),
            "i16" => Ok(I16),
            "u16" => Ok(U16),
            "i32" => Ok(I32),
            "u32" => Ok(U32),
            "f32" => Ok(F32),
            "f64" => Ok(F64),
            "bool" => Ok(Bool),
            "string" => Ok(String),
            "stream" => Ok(Stream),
            "none" => Ok(DataKind::None),
            other => Err(VsdError::invalid_argument(format!("unknown data_kind: {other}"))),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataKind::I8 => "i8",
            DataKind::U8 => "u8",
            DataKind::I16 => "i16",
            DataKind::U16 => "u16",
            DataKind::I32 => "i32",
            DataKind::U32 => "u32",
            DataKind::F32 => "f32",
            DataKind::F64 => "f64",
            DataKind::Bool => "bool",
            DataKind::String => "string",
            DataKind::Stream => "stream",
            DataKind::None => "none",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_json() {
        for kind in [DataKind::I8, DataKind::String, DataKind::Stream] {
            let encoded = serde_json::to_string(&kind).unwrap();
            let decoded: DataKind = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, kind);
        }
    }

    #[test]
    fn parse_rejects_unknown_tokens() {
        assert!(ElementKind::parse("bogus").is_err());
        assert!(DataKind::parse("bogus").is_err());
        assert_eq!(DataKind::parse("U16").unwrap(), DataKind::U16);
    }
}
