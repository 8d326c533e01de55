//! Insertion-ordered parameter maps.
//!
//! Two shapes of map share one entry layout. [`TraceParameterMap`]
//! holds the per-trace parameters whose element bytes are packed into
//! every record; their layout lives in the header's definition map, so
//! the records themselves carry no structure. [`TraceSetParameterMap`]
//! holds set-global parameters and is fully self-describing on the
//! wire, since it appears once in the header.
//!
//! Iteration order is insertion order in both maps, and that order is
//! what fixes the on-disk layout of the first trace written to a set.

use crate::error::{Result, TrsError};
use crate::wire::{truncate_utf8, LeReader, LeWriter, MAX_U16_LEN};

use super::defs::TraceParameterDefinitions;
use super::key::{ParameterData, TypedKey};
use super::types::ElementType;
use super::value::{Parameter, ParameterValue};

fn lookup<'e>(entries: &'e [(String, Parameter)], name: &str) -> Option<&'e Parameter> {
    entries
        .iter()
        .find(|(entry, _)| entry == name)
        .map(|(_, parameter)| parameter)
}

fn store(entries: &mut Vec<(String, Parameter)>, name: &str, parameter: Parameter) {
    match entries.iter_mut().find(|(entry, _)| entry == name) {
        Some((_, slot)) => *slot = parameter,
        None => entries.push((name.to_string(), parameter)),
    }
}

/// Parameters attached to a single trace.
///
/// # Examples
///
/// ```
/// use trs::{TraceParameterMap, TypedKey};
///
/// let input: TypedKey<Vec<u8>> = TypedKey::new("INPUT");
/// let mut map = TraceParameterMap::new();
/// map.insert(&input, vec![0x13, 0x37])?;
///
/// assert_eq!(map.len(), 1);
/// assert_eq!(map.get(&input)?, vec![0x13, 0x37]);
/// # Ok::<(), trs::TrsError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceParameterMap {
    entries: Vec<(String, Parameter)>,
}

impl TraceParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value while
    /// keeping the key's original position.
    ///
    /// # Errors
    ///
    /// Returns [`TrsError::EmptyArray`] when `value` is an empty array.
    pub fn insert<T: ParameterData>(&mut self, key: &TypedKey<T>, value: T) -> Result<()> {
        let parameter = value.into_parameter(key.name())?;
        store(&mut self.entries, key.name(), parameter);
        Ok(())
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`TrsError::MissingParameter`] when the key is absent,
    /// [`TrsError::TypeMismatch`] when the stored element type differs,
    /// and [`TrsError::NotScalar`] for scalar access to a longer array.
    pub fn get<T: ParameterData>(&self, key: &TypedKey<T>) -> Result<T> {
        let parameter = self
            .raw(key.name())
            .ok_or_else(|| TrsError::MissingParameter {
                key: key.name().to_string(),
            })?;
        T::from_parameter(key.name(), parameter)
    }

    /// Untyped access to a stored parameter.
    pub fn raw(&self, name: &str) -> Option<&Parameter> {
        lookup(&self.entries, name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.raw(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.entries
            .iter()
            .map(|(name, parameter)| (name.as_str(), parameter))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Concatenates the raw element bytes of every parameter in
    /// insertion order, strings at their natural length.
    ///
    /// This is the byte image the set's definition map is derived from.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (_, parameter) in &self.entries {
            parameter.value().encode_into(&mut out);
        }
        out
    }

    /// Serializes against a locked definition map, in definition order.
    ///
    /// Strings are truncated (UTF-8 safe) and zero-padded to their
    /// definition budget; every other type must match its definition
    /// length exactly.
    pub(crate) fn serialize_with(&self, definitions: &TraceParameterDefinitions) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(definitions.total_byte_len());
        for (name, definition) in definitions.iter() {
            let parameter = self.raw(name).ok_or_else(|| TrsError::MissingParameter {
                key: name.to_string(),
            })?;
            if parameter.element_type() != definition.element_type() {
                return Err(TrsError::TypeMismatch {
                    key: name.to_string(),
                    expected: definition.element_type().name(),
                    actual: parameter.element_type().name(),
                });
            }
            let start = out.len();
            match parameter.value() {
                ParameterValue::String(s) => {
                    let budget = definition.byte_len();
                    let mut writer = LeWriter::new(&mut out);
                    writer.write_padded(truncate_utf8(s, budget).as_bytes(), budget)?;
                }
                value => value.encode_into(&mut out),
            }
            let written = out.len() - start;
            if written != definition.byte_len() {
                return Err(TrsError::LengthMismatch {
                    expected: definition.byte_len(),
                    actual: written,
                });
            }
        }
        Ok(out)
    }

    /// Rebuilds a map from one trace's parameter block.
    ///
    /// `bytes` must be exactly as long as the definitions say; trailing
    /// string padding is stripped.
    pub fn deserialize(bytes: &[u8], definitions: &TraceParameterDefinitions) -> Result<Self> {
        if bytes.len() != definitions.total_byte_len() {
            return Err(TrsError::LengthMismatch {
                expected: definitions.total_byte_len(),
                actual: bytes.len(),
            });
        }
        let mut entries = Vec::with_capacity(definitions.len());
        for (name, definition) in definitions.iter() {
            let start = definition.offset();
            let end = start + definition.byte_len();
            if end > bytes.len() {
                return Err(TrsError::LengthMismatch {
                    expected: end,
                    actual: bytes.len(),
                });
            }
            let element_type = definition.element_type();
            if definition.length() == 0 && element_type != ElementType::String {
                return Err(TrsError::EmptyArray {
                    key: name.to_string(),
                });
            }
            let mut value =
                ParameterValue::decode(element_type, definition.length(), &bytes[start..end])?;
            if let ParameterValue::String(s) = &mut value {
                let trimmed = s.trim_end_matches('\0').len();
                s.truncate(trimmed);
            }
            let scalar = definition.length() == 1 || element_type == ElementType::String;
            entries.push((name.to_string(), Parameter::from_value(value, scalar)));
        }
        Ok(Self { entries })
    }
}

/// Parameters attached to a whole trace set, stored once in the header.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraceSetParameterMap {
    entries: Vec<(String, Parameter)>,
}

impl TraceSetParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value while
    /// keeping the key's original position.
    pub fn insert<T: ParameterData>(&mut self, key: &TypedKey<T>, value: T) -> Result<()> {
        let parameter = value.into_parameter(key.name())?;
        store(&mut self.entries, key.name(), parameter);
        Ok(())
    }

    /// Reads the value stored under `key`.
    pub fn get<T: ParameterData>(&self, key: &TypedKey<T>) -> Result<T> {
        let parameter = self
            .raw(key.name())
            .ok_or_else(|| TrsError::MissingParameter {
                key: key.name().to_string(),
            })?;
        T::from_parameter(key.name(), parameter)
    }

    /// Untyped access to a stored parameter.
    pub fn raw(&self, name: &str) -> Option<&Parameter> {
        lookup(&self.entries, name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.raw(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.entries
            .iter()
            .map(|(name, parameter)| (name.as_str(), parameter))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn encode<W: std::io::Write>(&self, writer: &mut LeWriter<W>) -> Result<()> {
        if self.entries.len() > MAX_U16_LEN {
            return Err(TrsError::LengthOverflow {
                what: "trace set parameter count".to_string(),
                len: self.entries.len(),
                max: MAX_U16_LEN,
            });
        }
        writer.write_u16(self.entries.len() as u16)?;
        for (name, parameter) in &self.entries {
            if name.len() > MAX_U16_LEN {
                return Err(TrsError::LengthOverflow {
                    what: format!("parameter {name:?} name"),
                    len: name.len(),
                    max: MAX_U16_LEN,
                });
            }
            if parameter.len() > MAX_U16_LEN {
                return Err(TrsError::LengthOverflow {
                    what: format!("parameter {name:?} element count"),
                    len: parameter.len(),
                    max: MAX_U16_LEN,
                });
            }
            writer.write_u16(name.len() as u16)?;
            writer.write_bytes(name.as_bytes())?;
            writer.write_u8(parameter.element_type().wire())?;
            writer.write_u16(parameter.len() as u16)?;
            let mut bytes = Vec::with_capacity(parameter.byte_len());
            parameter.value().encode_into(&mut bytes);
            writer.write_bytes(&bytes)?;
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
            let element_count = reader.read_u16()? as usize;
            if element_count == 0 && element_type != ElementType::String {
                return Err(TrsError::EmptyArray { key: name });
            }
            let bytes = reader.read_vec(element_count * element_type.byte_size())?;
            let value = ParameterValue::decode(element_type, element_count, &bytes)?;
            let scalar = element_count == 1 || element_type == ElementType::String;
            entries.push((name, Parameter::from_value(value, scalar)));
        }
        Ok(Self { entries })
    }

    /// Serializes to the header payload form.
    ///
    /// # Errors
    ///
    /// Returns [`TrsError::LengthOverflow`] when the entry count, a
    /// name, or an element count exceeds the 16-bit wire limit.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut writer = LeWriter::new(&mut out);
        self.encode(&mut writer)?;
        Ok(out)
    }

    /// Parses a header payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = LeReader::new(bytes);
        let map = Self::decode(&mut reader)?;
        if reader.consumed() != bytes.len() as u64 {
            return Err(TrsError::LengthMismatch {
                expected: bytes.len(),
                actual: reader.consumed() as usize,
            });
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut map = TraceParameterMap::new();
        map.insert(&TypedKey::<i32>::new("C"), 3).unwrap();
        map.insert(&TypedKey::<i32>::new("A"), 1).unwrap();
        map.insert(&TypedKey::<i32>::new("B"), 2).unwrap();
        let names: Vec<_> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let key = TypedKey::<i32>::new("A");
        let mut map = TraceParameterMap::new();
        map.insert(&TypedKey::<i32>::new("Z"), 0).unwrap();
        map.insert(&key, 1).unwrap();
        map.insert(&TypedKey::<i32>::new("Q"), 9).unwrap();
        map.insert(&key, 2).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&key).unwrap(), 2);
        let names: Vec<_> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Z", "A", "Q"]);
    }

    #[test]
    fn test_missing_key() {
        let map = TraceParameterMap::new();
        let err = map.get(&TypedKey::<i32>::new("NOPE")).unwrap_err();
        assert!(matches!(err, TrsError::MissingParameter { .. }));
    }

    fn mixed_map() -> TraceParameterMap {
        let mut map = TraceParameterMap::new();
        map.insert(&TypedKey::<Vec<u8>>::new("INPUT"), vec![1, 2, 3, 4])
            .unwrap();
        map.insert(&TypedKey::<String>::new("LABEL"), "first".to_string())
            .unwrap();
        map.insert(&TypedKey::<i64>::new("STAMP"), -5).unwrap();
        map.insert(&TypedKey::<Vec<bool>>::new("MASK"), vec![true, false])
            .unwrap();
        map
    }

    #[test]
    fn test_local_serialize_deserialize() {
        let map = mixed_map();
        let definitions = TraceParameterDefinitions::from_parameters(&map).unwrap();
        let bytes = map.serialize();
        assert_eq!(bytes.len(), definitions.total_byte_len());
        let decoded = TraceParameterMap::deserialize(&bytes, &definitions).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_serialize_with_pads_strings() {
        let map = mixed_map();
        let definitions = TraceParameterDefinitions::from_parameters(&map).unwrap();

        // same keys, shorter string: padded out to the locked budget
        let mut second = map.clone();
        second
            .insert(&TypedKey::<String>::new("LABEL"), "hi".to_string())
            .unwrap();
        let bytes = second.serialize_with(&definitions).unwrap();
        assert_eq!(bytes.len(), definitions.total_byte_len());
        let decoded = TraceParameterMap::deserialize(&bytes, &definitions).unwrap();
        assert_eq!(
            decoded.get(&TypedKey::<String>::new("LABEL")).unwrap(),
            "hi"
        );

        // longer string: truncated to the locked budget
        second
            .insert(&TypedKey::<String>::new("LABEL"), "overlong".to_string())
            .unwrap();
        let bytes = second.serialize_with(&definitions).unwrap();
        let decoded = TraceParameterMap::deserialize(&bytes, &definitions).unwrap();
        assert_eq!(
            decoded.get(&TypedKey::<String>::new("LABEL")).unwrap(),
            "overl"
        );
    }

    #[test]
    fn test_serialize_with_rejects_wrong_length() {
        let map = mixed_map();
        let definitions = TraceParameterDefinitions::from_parameters(&map).unwrap();
        let mut second = map.clone();
        second
            .insert(&TypedKey::<Vec<u8>>::new("INPUT"), vec![1, 2, 3])
            .unwrap();
        let err = second.serialize_with(&definitions).unwrap_err();
        assert!(matches!(
            err,
            TrsError::LengthMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_deserialize_rejects_wrong_total() {
        let map = mixed_map();
        let definitions = TraceParameterDefinitions::from_parameters(&map).unwrap();
        let mut bytes = map.serialize();
        bytes.push(0);
        assert!(TraceParameterMap::deserialize(&bytes, &definitions).is_err());
    }

    #[test]
    fn test_set_map_roundtrip() {
        let mut map = TraceSetParameterMap::new();
        map.insert(&TypedKey::<String>::new("SCOPE"), "oscilloscope-1".to_string())
            .unwrap();
        map.insert(&TypedKey::<Vec<f32>>::new("CAL"), vec![0.25, 0.5])
            .unwrap();
        map.insert(&TypedKey::<bool>::new("FILTERED"), true).unwrap();

        let bytes = map.to_bytes().unwrap();
        let decoded = TraceSetParameterMap::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, map);
        assert!(decoded.raw("FILTERED").is_some_and(Parameter::is_scalar));
    }

    #[test]
    fn test_set_map_empty_string_roundtrip() {
        let mut map = TraceSetParameterMap::new();
        map.insert(&TypedKey::<String>::new("NOTE"), String::new())
            .unwrap();
        let bytes = map.to_bytes().unwrap();
        let decoded = TraceSetParameterMap::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.get(&TypedKey::<String>::new("NOTE")).unwrap(), "");
    }

    #[test]
    fn test_set_map_element_count_limit() {
        let key = TypedKey::<Vec<u8>>::new("BULK");

        let mut map = TraceSetParameterMap::new();
        map.insert(&key, vec![0u8; 65_535]).unwrap();
        let bytes = map.to_bytes().unwrap();
        let decoded = TraceSetParameterMap::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.get(&key).unwrap().len(), 65_535);

        map.insert(&key, vec![0u8; 65_536]).unwrap();
        let err = map.to_bytes().unwrap_err();
        assert!(matches!(err, TrsError::LengthOverflow { len: 65_536, .. }));
    }

    #[test]
    fn test_set_map_truncated_payload() {
        let mut map = TraceSetParameterMap::new();
        map.insert(&TypedKey::<Vec<i32>>::new("N"), vec![1, 2, 3])
            .unwrap();
        let bytes = map.to_bytes().unwrap();
        let err = TraceSetParameterMap::from_bytes(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, TrsError::TruncatedFile { .. }));
    }
}
