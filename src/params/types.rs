use std::fmt;

use crate::error::{Result, TrsError};

/// Element type of a parameter, as stored in trace set files.
///
/// Each type carries a fixed wire byte and a fixed per-element size.
/// The two are a bijection: decoding maps wire bytes back to exactly
/// one type, and any other byte is rejected as corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementType {
    Byte,
    Short,
    Int,
    Float,
    Long,
    Double,
    String,
    Bool,
}

impl ElementType {
    pub const ALL: [ElementType; 8] = [
        ElementType::Byte,
        ElementType::Short,
        ElementType::Int,
        ElementType::Float,
        ElementType::Long,
        ElementType::Double,
        ElementType::String,
        ElementType::Bool,
    ];

    /// Byte identifying this type on the wire.
    pub fn wire(self) -> u8 {
        match self {
            ElementType::Byte => 0x01,
            ElementType::Short => 0x02,
            ElementType::Int => 0x04,
            ElementType::Float => 0x14,
            ElementType::Long => 0x08,
            ElementType::Double => 0x18,
            ElementType::String => 0x20,
            ElementType::Bool => 0x31,
        }
    }

    /// Encoded size of one element in bytes.
    ///
    /// Strings count one byte per UTF-8 byte.
    pub fn byte_size(self) -> usize {
        match self {
            ElementType::Byte | ElementType::String | ElementType::Bool => 1,
            ElementType::Short => 2,
            ElementType::Int | ElementType::Float => 4,
            ElementType::Long | ElementType::Double => 8,
        }
    }

    /// Maps a wire byte back to its element type.
    ///
    /// # Errors
    ///
    /// Returns [`TrsError::UnknownParameterType`] for any byte outside
    /// the catalogue. Unlike unknown header tags, an unknown parameter
    /// type makes the surrounding block unparseable, so this is fatal.
    pub fn from_wire(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(ElementType::Byte),
            0x02 => Ok(ElementType::Short),
            0x04 => Ok(ElementType::Int),
            0x14 => Ok(ElementType::Float),
            0x08 => Ok(ElementType::Long),
            0x18 => Ok(ElementType::Double),
            0x20 => Ok(ElementType::String),
            0x31 => Ok(ElementType::Bool),
            other => Err(TrsError::UnknownParameterType(other)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementType::Byte => "byte",
            ElementType::Short => "short",
            ElementType::Int => "int",
            ElementType::Float => "float",
            ElementType::Long => "long",
            ElementType::Double => "double",
            ElementType::String => "string",
            ElementType::Bool => "bool",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
