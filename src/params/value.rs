use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, TrsError};

use super::types::ElementType;

/// The value held by a parameter, one variant per element type.
///
/// Values are owned and self-contained; constructing one copies the
/// caller's data, so later mutation of the source never changes what
/// gets written to disk.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParameterValue {
    Byte(Vec<u8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Long(Vec<i64>),
    Double(Vec<f64>),
    String(String),
    Bool(Vec<bool>),
}

impl ParameterValue {
    pub fn element_type(&self) -> ElementType {
        match self {
            ParameterValue::Byte(_) => ElementType::Byte,
            ParameterValue::Short(_) => ElementType::Short,
            ParameterValue::Int(_) => ElementType::Int,
            ParameterValue::Float(_) => ElementType::Float,
            ParameterValue::Long(_) => ElementType::Long,
            ParameterValue::Double(_) => ElementType::Double,
            ParameterValue::String(_) => ElementType::String,
            ParameterValue::Bool(_) => ElementType::Bool,
        }
    }

    /// Element count; for strings, the UTF-8 byte count.
    pub fn len(&self) -> usize {
        match self {
            ParameterValue::Byte(v) => v.len(),
            ParameterValue::Short(v) => v.len(),
            ParameterValue::Int(v) => v.len(),
            ParameterValue::Float(v) => v.len(),
            ParameterValue::Long(v) => v.len(),
            ParameterValue::Double(v) => v.len(),
            ParameterValue::String(s) => s.len(),
            ParameterValue::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.element_type().byte_size()
    }

    /// Appends the raw little-endian element bytes to `out`.
    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            ParameterValue::Byte(v) => out.extend_from_slice(v),
            ParameterValue::Short(v) => {
                let start = out.len();
                out.resize(start + v.len() * 2, 0);
                LittleEndian::write_i16_into(v, &mut out[start..]);
            }
            ParameterValue::Int(v) => {
                let start = out.len();
                out.resize(start + v.len() * 4, 0);
                LittleEndian::write_i32_into(v, &mut out[start..]);
            }
            ParameterValue::Float(v) => {
                let start = out.len();
                out.resize(start + v.len() * 4, 0);
                LittleEndian::write_f32_into(v, &mut out[start..]);
            }
            ParameterValue::Long(v) => {
                let start = out.len();
                out.resize(start + v.len() * 8, 0);
                LittleEndian::write_i64_into(v, &mut out[start..]);
            }
            ParameterValue::Double(v) => {
                let start = out.len();
                out.resize(start + v.len() * 8, 0);
                LittleEndian::write_f64_into(v, &mut out[start..]);
            }
            ParameterValue::String(s) => out.extend_from_slice(s.as_bytes()),
            ParameterValue::Bool(v) => out.extend(v.iter().map(|&b| b as u8)),
        }
    }

    /// Decodes `count` elements of `element_type` from `bytes`.
    ///
    /// `bytes` must hold exactly `count * element_type.byte_size()`
    /// bytes.
    pub(crate) fn decode(element_type: ElementType, count: usize, bytes: &[u8]) -> Result<Self> {
        let expected = count * element_type.byte_size();
        if bytes.len() != expected {
            return Err(TrsError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        match element_type {
            ElementType::Byte => Ok(ParameterValue::Byte(bytes.to_vec())),
            ElementType::Short => {
                let mut v = vec![0i16; count];
                LittleEndian::read_i16_into(bytes, &mut v);
                Ok(ParameterValue::Short(v))
            }
            ElementType::Int => {
                let mut v = vec![0i32; count];
                LittleEndian::read_i32_into(bytes, &mut v);
                Ok(ParameterValue::Int(v))
            }
            ElementType::Float => {
                let mut v = vec![0f32; count];
                LittleEndian::read_f32_into(bytes, &mut v);
                Ok(ParameterValue::Float(v))
            }
            ElementType::Long => {
                let mut v = vec![0i64; count];
                LittleEndian::read_i64_into(bytes, &mut v);
                Ok(ParameterValue::Long(v))
            }
            ElementType::Double => {
                let mut v = vec![0f64; count];
                LittleEndian::read_f64_into(bytes, &mut v);
                Ok(ParameterValue::Double(v))
            }
            ElementType::String => Ok(ParameterValue::String(String::from_utf8(bytes.to_vec())?)),
            ElementType::Bool => Ok(ParameterValue::Bool(bytes.iter().map(|&b| b != 0).collect())),
        }
    }
}

/// A single named parameter's payload: a typed value plus a scalar flag.
///
/// Length-one arrays are stored with the scalar flag set, so a scalar
/// round-trips as a scalar no matter which insertion form produced it.
/// Equality is element-wise and ignores nothing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Parameter {
    value: ParameterValue,
    scalar: bool,
}

impl Parameter {
    pub(crate) fn from_value(value: ParameterValue, scalar: bool) -> Self {
        Self { value, scalar }
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    pub fn element_type(&self) -> ElementType {
        self.value.element_type()
    }

    /// Element count; for strings, the UTF-8 byte count.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether the parameter was stored as a single value.
    pub fn is_scalar(&self) -> bool {
        self.scalar
    }

    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.value.byte_len()
    }
}
