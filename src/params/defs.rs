//! Per-trace parameter layout definitions.
//!
//! Version 2 trace sets describe the parameter block of every trace
//! once, in the header: for each name, an element type, an element
//! count, and a byte offset into the block. Records themselves then
//! carry only raw element bytes. The definition map is built from the
//! first trace of a set and never changes afterwards, which is why the
//! type exposes no mutating methods at all.

use crate::error::{Result, TrsError};
use crate::wire::{LeReader, LeWriter, MAX_U16_LEN};

use super::map::TraceParameterMap;
use super::types::ElementType;

/// Layout of one named parameter inside a trace's parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterDefinition {
    element_type: ElementType,
    length: u16,
    offset: u16,
}

impl ParameterDefinition {
    pub(crate) fn new(element_type: ElementType, length: u16, offset: u16) -> Self {
        Self {
            element_type,
            length,
            offset,
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Element count; for strings, the UTF-8 byte budget.
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// Byte offset of this parameter inside the block.
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    /// Encoded size of this parameter in bytes.
    pub fn byte_len(&self) -> usize {
        self.length() * self.element_type.byte_size()
    }
}

/// The ordered set of parameter definitions for a trace set.
///
/// Built once from the first trace written to a set (or decoded from a
/// header) and finalized on construction. Offsets always increase in
/// entry order with no gaps.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceParameterDefinitions {
    entries: Vec<(String, ParameterDefinition)>,
}

impl TraceParameterDefinitions {
    /// Derives definitions from a parameter map, walking it in
    /// insertion order and accumulating byte offsets.
    ///
    /// # Errors
    ///
    /// Returns [`TrsError::LengthOverflow`] when an element count or an
    /// accumulated offset does not fit the 16-bit wire field.
    pub fn from_parameters(parameters: &TraceParameterMap) -> Result<Self> {
        let mut entries = Vec::with_capacity(parameters.len());
        let mut offset = 0usize;
        for (name, parameter) in parameters.iter() {
            let length = parameter.len();
            if length > MAX_U16_LEN {
                return Err(TrsError::LengthOverflow {
                    what: format!("parameter {name:?} element count"),
                    len: length,
                    max: MAX_U16_LEN,
                });
            }
            if offset > MAX_U16_LEN {
                return Err(TrsError::LengthOverflow {
                    what: format!("parameter {name:?} byte offset"),
                    len: offset,
                    max: MAX_U16_LEN,
                });
            }
            let definition =
                ParameterDefinition::new(parameter.element_type(), length as u16, offset as u16);
            offset += definition.byte_len();
            entries.push((name.to_string(), definition));
        }
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDefinition> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, definition)| definition)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterDefinition)> {
        self.entries
            .iter()
            .map(|(name, definition)| (name.as_str(), definition))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total encoded size of one trace's parameter block.
    pub fn total_byte_len(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, definition)| definition.byte_len())
            .sum()
    }

    pub(crate) fn encode<W: std::io::Write>(&self, writer: &mut LeWriter<W>) -> Result<()> {
        if self.entries.len() > MAX_U16_LEN {
            return Err(TrsError::LengthOverflow {
                what: "parameter definition count".to_string(),
                len: self.entries.len(),
                max: MAX_U16_LEN,
            });
        }
        writer.write_u16(self.entries.len() as u16)?;
        for (name, definition) in &self.entries {
            if name.len() > MAX_U16_LEN {
                return Err(TrsError::LengthOverflow {
                    what: format!("parameter {name:?} name"),
                    len: name.len(),
                    max: MAX_U16_LEN,
                });
            }
            writer.write_u16(name.len() as u16)?;
            writer.write_bytes(name.as_bytes())?;
            writer.write_u8(definition.element_type.wire())?;
            writer.write_u16(definition.length)?;
            writer.write_u16(definition.offset)?;
        }
        Ok(())
    }

    pub(crate) fn decode<R: std::io::Read>(reader: &mut LeReader<R>) -> Result<Self> {
        let count = reader.read_u16()? as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let name_len = reader.read_u16()? as usize;
            let name = String::from_utf8(reader.read_vec(name_len)?)?;
            let element_type = ElementType::from_wire(reader.read_u8()?)?;
            let length = reader.read_u16()?;
            let offset = reader.read_u16()?;
            entries.push((name, ParameterDefinition::new(element_type, length, offset)));
        }
        Ok(Self { entries })
    }

    /// Serializes to the header payload form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut writer = LeWriter::new(&mut out);
        self.encode(&mut writer)?;
        Ok(out)
    }

    /// Parses a header payload.
    ///
    /// # Errors
    ///
    /// The payload must be consumed exactly; trailing bytes are
    /// reported as a length mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = LeReader::new(bytes);
        let definitions = Self::decode(&mut reader)?;
        if reader.consumed() != bytes.len() as u64 {
            return Err(TrsError::LengthMismatch {
                expected: bytes.len(),
                actual: reader.consumed() as usize,
            });
        }
        Ok(definitions)
    }
}
