//! Trace set header: the tag catalogue and its TLV codec.
//!
//! A trace set file opens with a sequence of header entries, each a
//! known tag byte, an encoded length, and a payload, terminated by the
//! trace block sentinel tag. Every tag the format knows is listed in
//! [`Tag`] together with its value type, wire width, required flag and
//! default value. Tags outside the catalogue are skipped on read so
//! files from newer writers stay readable; within the catalogue an
//! entry's declared type decides how its payload is decoded.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};

use tracing::warn;

use crate::error::{Result, TrsError};
use crate::params::{TraceParameterDefinitions, TraceSetParameterMap};
use crate::samples::SampleEncoding;
use crate::wire::{LeReader, LeWriter, MAX_U16_LEN};

/// Format version written by this crate.
pub const TRS_VERSION: i32 = 2;

/// A header tag known to the format.
///
/// Declaration order is wire order; encoding walks the catalogue in
/// this order, which makes header output deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Tag {
    NumberOfTraces = 0x41,
    NumberOfSamples = 0x42,
    SampleCoding = 0x43,
    DataLength = 0x44,
    TitleSpace = 0x45,
    GlobalTitle = 0x46,
    Description = 0x47,
    OffsetX = 0x48,
    LabelX = 0x49,
    LabelY = 0x4A,
    ScaleX = 0x4B,
    ScaleY = 0x4C,
    TraceOffset = 0x4D,
    LogarithmicScale = 0x4E,
    Version = 0x4F,
    AcquisitionRangeOfScope = 0x55,
    AcquisitionCouplingOfScope = 0x56,
    AcquisitionOffsetOfScope = 0x57,
    AcquisitionInputImpedance = 0x58,
    AcquisitionDeviceId = 0x59,
    AcquisitionTypeFilter = 0x5A,
    AcquisitionFrequencyFilter = 0x5B,
    AcquisitionRangeFilter = 0x5C,
    TraceBlock = 0x5F,
    ExternalClockUsed = 0x60,
    ExternalClockThreshold = 0x61,
    ExternalClockMultiplier = 0x62,
    ExternalClockPhaseShift = 0x63,
    ExternalClockResamplerMask = 0x64,
    ExternalClockResamplerEnabled = 0x65,
    ExternalClockFrequency = 0x66,
    ExternalClockTimeBase = 0x67,
    NumberView = 0x68,
    TraceOverlap = 0x69,
    GoLastTrace = 0x6A,
    InputOffset = 0x6B,
    OutputOffset = 0x6C,
    KeyOffset = 0x6D,
    InputLength = 0x6E,
    OutputLength = 0x6F,
    KeyLength = 0x70,
    NumberOfEnabledChannels = 0x71,
    NumberOfUsedOscilloscopes = 0x72,
    XyScanWidth = 0x73,
    XyScanHeight = 0x74,
    XyMeasurementsPerSpot = 0x75,
    TraceSetParameters = 0x76,
    TraceParameterDefinitions = 0x77,
}

/// Value type of a header tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    Int,
    Float,
    Bool,
    String,
    SetParameters,
    Definitions,
    Marker,
}

impl TagType {
    pub fn name(self) -> &'static str {
        match self {
            TagType::Int => "int",
            TagType::Float => "float",
            TagType::Bool => "bool",
            TagType::String => "string",
            TagType::SetParameters => "trace set parameter",
            TagType::Definitions => "trace parameter definition",
            TagType::Marker => "marker",
        }
    }
}

impl Tag {
    pub const ALL: [Tag; 48] = [
        Tag::NumberOfTraces,
        Tag::NumberOfSamples,
        Tag::SampleCoding,
        Tag::DataLength,
        Tag::TitleSpace,
        Tag::GlobalTitle,
        Tag::Description,
        Tag::OffsetX,
        Tag::LabelX,
        Tag::LabelY,
        Tag::ScaleX,
        Tag::ScaleY,
        Tag::TraceOffset,
        Tag::LogarithmicScale,
        Tag::Version,
        Tag::AcquisitionRangeOfScope,
        Tag::AcquisitionCouplingOfScope,
        Tag::AcquisitionOffsetOfScope,
        Tag::AcquisitionInputImpedance,
        Tag::AcquisitionDeviceId,
        Tag::AcquisitionTypeFilter,
        Tag::AcquisitionFrequencyFilter,
        Tag::AcquisitionRangeFilter,
        Tag::TraceBlock,
        Tag::ExternalClockUsed,
        Tag::ExternalClockThreshold,
        Tag::ExternalClockMultiplier,
        Tag::ExternalClockPhaseShift,
        Tag::ExternalClockResamplerMask,
        Tag::ExternalClockResamplerEnabled,
        Tag::ExternalClockFrequency,
        Tag::ExternalClockTimeBase,
        Tag::NumberView,
        Tag::TraceOverlap,
        Tag::GoLastTrace,
        Tag::InputOffset,
        Tag::OutputOffset,
        Tag::KeyOffset,
        Tag::InputLength,
        Tag::OutputLength,
        Tag::KeyLength,
        Tag::NumberOfEnabledChannels,
        Tag::NumberOfUsedOscilloscopes,
        Tag::XyScanWidth,
        Tag::XyScanHeight,
        Tag::XyMeasurementsPerSpot,
        Tag::TraceSetParameters,
        Tag::TraceParameterDefinitions,
    ];

    /// Byte identifying this tag on the wire.
    pub fn wire(self) -> u8 {
        self as u8
    }

    /// Maps a wire byte back to its tag, if the catalogue knows it.
    pub fn from_wire(byte: u8) -> Option<Tag> {
        Tag::ALL.iter().copied().find(|tag| tag.wire() == byte)
    }

    pub fn tag_type(self) -> TagType {
        match self {
            Tag::GlobalTitle
            | Tag::Description
            | Tag::LabelX
            | Tag::LabelY
            | Tag::AcquisitionDeviceId => TagType::String,
            Tag::ScaleX
            | Tag::ScaleY
            | Tag::AcquisitionRangeOfScope
            | Tag::AcquisitionOffsetOfScope
            | Tag::AcquisitionInputImpedance
            | Tag::AcquisitionFrequencyFilter
            | Tag::AcquisitionRangeFilter
            | Tag::ExternalClockThreshold
            | Tag::ExternalClockFrequency => TagType::Float,
            Tag::LogarithmicScale
            | Tag::ExternalClockUsed
            | Tag::ExternalClockResamplerEnabled
            | Tag::TraceOverlap
            | Tag::GoLastTrace => TagType::Bool,
            Tag::TraceBlock => TagType::Marker,
            Tag::TraceSetParameters => TagType::SetParameters,
            Tag::TraceParameterDefinitions => TagType::Definitions,
            _ => TagType::Int,
        }
    }

    /// Encoded payload width in bytes; zero for variable-length tags.
    pub fn fixed_len(self) -> usize {
        match self {
            Tag::SampleCoding | Tag::TitleSpace | Tag::Version => 1,
            Tag::DataLength => 2,
            _ => match self.tag_type() {
                TagType::Int | TagType::Float => 4,
                TagType::Bool => 1,
                TagType::String
                | TagType::SetParameters
                | TagType::Definitions
                | TagType::Marker => 0,
            },
        }
    }

    /// Whether the tag is emitted even when its value equals the
    /// default.
    pub fn required(self) -> bool {
        matches!(
            self,
            Tag::NumberOfTraces | Tag::NumberOfSamples | Tag::SampleCoding | Tag::TraceBlock
        )
    }

    /// Value assumed when the tag is absent. The trace block sentinel
    /// carries no value.
    pub fn default_value(self) -> Option<HeaderValue> {
        match self {
            Tag::SampleCoding => Some(HeaderValue::Int(SampleEncoding::Float.wire() as i32)),
            Tag::GlobalTitle => Some(HeaderValue::String("trace".to_string())),
            Tag::ScaleX | Tag::ScaleY => Some(HeaderValue::Float(1.0)),
            _ => match self.tag_type() {
                TagType::Int => Some(HeaderValue::Int(0)),
                TagType::Float => Some(HeaderValue::Float(0.0)),
                TagType::Bool => Some(HeaderValue::Bool(false)),
                TagType::String => Some(HeaderValue::String(String::new())),
                TagType::SetParameters => {
                    Some(HeaderValue::SetParameters(TraceSetParameterMap::new()))
                }
                TagType::Definitions => Some(HeaderValue::Definitions(
                    TraceParameterDefinitions::default(),
                )),
                TagType::Marker => None,
            },
        }
    }

    fn meta(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Tag::NumberOfTraces => ("NumberOfTraces", "NT", "Number of traces"),
            Tag::NumberOfSamples => ("NumberOfSamples", "NS", "Number of samples per trace"),
            Tag::SampleCoding => ("SampleCoding", "SC", "Sample coding"),
            Tag::DataLength => ("DataLength", "DS", "Length of the data bytes in each trace"),
            Tag::TitleSpace => ("TitleSpace", "TS", "Title space reserved per trace"),
            Tag::GlobalTitle => ("GlobalTitle", "GT", "Global trace title"),
            Tag::Description => ("Description", "DC", "Description"),
            Tag::OffsetX => ("OffsetX", "XO", "Offset in x-axis for trace display"),
            Tag::LabelX => ("LabelX", "XL", "Label of x-axis"),
            Tag::LabelY => ("LabelY", "YL", "Label of y-axis"),
            Tag::ScaleX => ("ScaleX", "XS", "Scale value for x-axis"),
            Tag::ScaleY => ("ScaleY", "YS", "Scale value for y-axis"),
            Tag::TraceOffset => ("TraceOffset", "TO", "Trace offset for displaying trace numbers"),
            Tag::LogarithmicScale => ("LogarithmicScale", "LS", "Logarithmic scale"),
            Tag::Version => ("Version", "VS", "Trace set format version"),
            Tag::AcquisitionRangeOfScope => {
                ("AcquisitionRangeOfScope", "RG", "Range of the acquisition scope")
            }
            Tag::AcquisitionCouplingOfScope => {
                ("AcquisitionCouplingOfScope", "CL", "Coupling of the acquisition scope")
            }
            Tag::AcquisitionOffsetOfScope => {
                ("AcquisitionOffsetOfScope", "OS", "Offset of the acquisition scope")
            }
            Tag::AcquisitionInputImpedance => {
                ("AcquisitionInputImpedance", "II", "Input impedance of the acquisition scope")
            }
            Tag::AcquisitionDeviceId => {
                ("AcquisitionDeviceId", "AI", "Device id of the acquisition scope")
            }
            Tag::AcquisitionTypeFilter => {
                ("AcquisitionTypeFilter", "FT", "Type of filter used during acquisition")
            }
            Tag::AcquisitionFrequencyFilter => {
                ("AcquisitionFrequencyFilter", "FF", "Frequency of the acquisition filter")
            }
            Tag::AcquisitionRangeFilter => {
                ("AcquisitionRangeFilter", "FR", "Range of the acquisition filter")
            }
            Tag::TraceBlock => ("TraceBlock", "TB", "Marks the end of the header"),
            Tag::ExternalClockUsed => ("ExternalClockUsed", "EU", "External clock used"),
            Tag::ExternalClockThreshold => {
                ("ExternalClockThreshold", "ET", "External clock threshold")
            }
            Tag::ExternalClockMultiplier => {
                ("ExternalClockMultiplier", "EM", "External clock multiplier")
            }
            Tag::ExternalClockPhaseShift => {
                ("ExternalClockPhaseShift", "EP", "External clock phase shift")
            }
            Tag::ExternalClockResamplerMask => {
                ("ExternalClockResamplerMask", "ER", "External clock resampler mask")
            }
            Tag::ExternalClockResamplerEnabled => {
                ("ExternalClockResamplerEnabled", "RE", "External clock resampler enabled")
            }
            Tag::ExternalClockFrequency => {
                ("ExternalClockFrequency", "EF", "External clock frequency")
            }
            Tag::ExternalClockTimeBase => {
                ("ExternalClockTimeBase", "EB", "External clock time base")
            }
            Tag::NumberView => ("NumberView", "VT", "Number of traces shown on opening"),
            Tag::TraceOverlap => ("TraceOverlap", "OV", "Overlap traces in multi trace view"),
            Tag::GoLastTrace => ("GoLastTrace", "GL", "Go to last trace on opening"),
            Tag::InputOffset => ("InputOffset", "IO", "Input data offset in trace data"),
            Tag::OutputOffset => ("OutputOffset", "OO", "Output data offset in trace data"),
            Tag::KeyOffset => ("KeyOffset", "KO", "Key data offset in trace data"),
            Tag::InputLength => ("InputLength", "IL", "Input data length in trace data"),
            Tag::OutputLength => ("OutputLength", "OL", "Output data length in trace data"),
            Tag::KeyLength => ("KeyLength", "KL", "Key data length in trace data"),
            Tag::NumberOfEnabledChannels => {
                ("NumberOfEnabledChannels", "CH", "Number of oscilloscope channels used")
            }
            Tag::NumberOfUsedOscilloscopes => {
                ("NumberOfUsedOscilloscopes", "NO", "Number of oscilloscopes used")
            }
            Tag::XyScanWidth => ("XyScanWidth", "WI", "Steps in the x direction of an xy-scan"),
            Tag::XyScanHeight => ("XyScanHeight", "HE", "Steps in the y direction of an xy-scan"),
            Tag::XyMeasurementsPerSpot => {
                ("XyMeasurementsPerSpot", "ME", "Measurements per spot of an xy-scan")
            }
            Tag::TraceSetParameters => {
                ("TraceSetParameters", "GP", "Custom parameters of the whole set")
            }
            Tag::TraceParameterDefinitions => (
                "TraceParameterDefinitions",
                "LP",
                "Layout of the custom parameters of each trace",
            ),
        }
    }

    pub fn name(self) -> &'static str {
        self.meta().0
    }

    /// Two-letter mnemonic used by the format documentation.
    pub fn mnemonic(self) -> &'static str {
        self.meta().1
    }

    pub fn description(self) -> &'static str {
        self.meta().2
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value stored under a header tag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeaderValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    String(String),
    SetParameters(TraceSetParameterMap),
    Definitions(TraceParameterDefinitions),
}

impl HeaderValue {
    fn tag_type(&self) -> TagType {
        match self {
            HeaderValue::Int(_) => TagType::Int,
            HeaderValue::Float(_) => TagType::Float,
            HeaderValue::Bool(_) => TagType::Bool,
            HeaderValue::String(_) => TagType::String,
            HeaderValue::SetParameters(_) => TagType::SetParameters,
            HeaderValue::Definitions(_) => TagType::Definitions,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.tag_type().name()
    }
}

/// The metadata of a trace set.
///
/// A header stores only values that were set explicitly; everything
/// else falls back to the catalogue default. Encoding re-emits the
/// explicit values (plus required tags) in catalogue order, so encode
/// and decode are mutually idempotent and a decoded header re-encodes
/// byte for byte.
///
/// # Examples
///
/// ```
/// use trs::{Header, HeaderValue, Tag};
///
/// let mut header = Header::new();
/// assert_eq!(header.global_title(), "trace");
///
/// header.set(Tag::GlobalTitle, HeaderValue::String("aes-ttest".into()))?;
/// header.set(Tag::ScaleY, HeaderValue::Float(0.125))?;
/// assert_eq!(header.global_title(), "aes-ttest");
/// assert!(!header.is_default(Tag::ScaleY));
///
/// // a header value must match the tag's declared type
/// assert!(header.set(Tag::NumberOfTraces, HeaderValue::Bool(true)).is_err());
/// # Ok::<(), trs::TrsError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    values: BTreeMap<Tag, HeaderValue>,
}

impl Header {
    /// Creates a header with every tag at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit value for a tag.
    ///
    /// # Errors
    ///
    /// Returns [`TrsError::HeaderTypeMismatch`] when the value's type
    /// does not match the tag's declared type. The trace block sentinel
    /// holds no value and rejects every set.
    pub fn set(&mut self, tag: Tag, value: HeaderValue) -> Result<()> {
        if tag.tag_type() != value.tag_type() {
            return Err(TrsError::HeaderTypeMismatch {
                tag: tag.name(),
                expected: tag.tag_type().name(),
                actual: value.type_name(),
            });
        }
        self.values.insert(tag, value);
        Ok(())
    }

    /// The tag's current value: explicit if set, otherwise the
    /// catalogue default. `None` only for the trace block sentinel.
    pub fn value_of(&self, tag: Tag) -> Option<HeaderValue> {
        self.values.get(&tag).cloned().or_else(|| tag.default_value())
    }

    /// Whether an explicit value has been stored for the tag.
    pub fn is_set(&self, tag: Tag) -> bool {
        self.values.contains_key(&tag)
    }

    /// Whether the tag's current value equals its catalogue default.
    pub fn is_default(&self, tag: Tag) -> bool {
        match (self.values.get(&tag), tag.default_value()) {
            (Some(value), Some(default)) => *value == default,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    fn int_of(&self, tag: Tag) -> i32 {
        match self.values.get(&tag) {
            Some(HeaderValue::Int(value)) => *value,
            _ => match tag.default_value() {
                Some(HeaderValue::Int(value)) => value,
                _ => 0,
            },
        }
    }

    fn string_of(&self, tag: Tag) -> String {
        match self.values.get(&tag) {
            Some(HeaderValue::String(value)) => value.clone(),
            _ => match tag.default_value() {
                Some(HeaderValue::String(value)) => value,
                _ => String::new(),
            },
        }
    }

    pub fn trace_count(&self) -> usize {
        self.int_of(Tag::NumberOfTraces).max(0) as usize
    }

    pub fn set_trace_count(&mut self, count: usize) {
        self.values
            .insert(Tag::NumberOfTraces, HeaderValue::Int(count as i32));
    }

    pub fn sample_count(&self) -> usize {
        self.int_of(Tag::NumberOfSamples).max(0) as usize
    }

    pub fn set_sample_count(&mut self, count: usize) {
        self.values
            .insert(Tag::NumberOfSamples, HeaderValue::Int(count as i32));
    }

    /// The sample encoding of every trace in the set.
    ///
    /// # Errors
    ///
    /// Returns [`TrsError::UnknownSampleEncoding`] when the stored
    /// coding value is not one of the four on-disk widths.
    pub fn sample_coding(&self) -> Result<SampleEncoding> {
        let value = self.int_of(Tag::SampleCoding);
        match u8::try_from(value) {
            Ok(byte) => SampleEncoding::from_wire(byte),
            Err(_) => Err(TrsError::UnknownSampleEncoding(value as u8)),
        }
    }

    pub fn set_sample_coding(&mut self, encoding: SampleEncoding) {
        self.values
            .insert(Tag::SampleCoding, HeaderValue::Int(encoding.wire() as i32));
    }

    pub fn data_length(&self) -> usize {
        self.int_of(Tag::DataLength).max(0) as usize
    }

    pub fn set_data_length(&mut self, length: usize) {
        self.values
            .insert(Tag::DataLength, HeaderValue::Int(length as i32));
    }

    pub fn title_space(&self) -> usize {
        self.int_of(Tag::TitleSpace).max(0) as usize
    }

    pub fn set_title_space(&mut self, space: usize) {
        self.values
            .insert(Tag::TitleSpace, HeaderValue::Int(space as i32));
    }

    pub fn version(&self) -> i32 {
        self.int_of(Tag::Version)
    }

    pub fn set_version(&mut self, version: i32) {
        self.values.insert(Tag::Version, HeaderValue::Int(version));
    }

    pub fn global_title(&self) -> String {
        self.string_of(Tag::GlobalTitle)
    }

    pub fn set_global_title(&mut self, title: impl Into<String>) {
        self.values
            .insert(Tag::GlobalTitle, HeaderValue::String(title.into()));
    }

    pub fn description(&self) -> String {
        self.string_of(Tag::Description)
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.values
            .insert(Tag::Description, HeaderValue::String(description.into()));
    }

    /// Custom parameters of the whole set.
    pub fn trace_set_parameters(&self) -> TraceSetParameterMap {
        match self.values.get(&Tag::TraceSetParameters) {
            Some(HeaderValue::SetParameters(map)) => map.clone(),
            _ => TraceSetParameterMap::new(),
        }
    }

    pub fn set_trace_set_parameters(&mut self, map: TraceSetParameterMap) {
        self.values
            .insert(Tag::TraceSetParameters, HeaderValue::SetParameters(map));
    }

    /// Layout of the custom parameters of each trace.
    pub fn trace_parameter_definitions(&self) -> TraceParameterDefinitions {
        match self.values.get(&Tag::TraceParameterDefinitions) {
            Some(HeaderValue::Definitions(definitions)) => definitions.clone(),
            _ => TraceParameterDefinitions::default(),
        }
    }

    pub fn set_trace_parameter_definitions(&mut self, definitions: TraceParameterDefinitions) {
        self.values.insert(
            Tag::TraceParameterDefinitions,
            HeaderValue::Definitions(definitions),
        );
    }

    /// Encodes the header, ending with the trace block sentinel.
    ///
    /// Optional tags whose value equals the default are skipped;
    /// required tags are always emitted.
    pub(crate) fn encode<W: Write>(&self, writer: &mut LeWriter<W>) -> Result<()> {
        for &tag in Tag::ALL.iter() {
            if tag == Tag::TraceBlock {
                continue;
            }
            let default = tag.default_value();
            let value = match (self.values.get(&tag), default.as_ref()) {
                (Some(value), Some(default)) if !tag.required() && value == default => continue,
                (Some(value), _) => value,
                (None, Some(default)) if tag.required() => default,
                _ => continue,
            };
            let payload = encode_value(tag, value)?;
            if payload.len() > MAX_U16_LEN {
                return Err(TrsError::TagLengthOutOfRange {
                    tag: tag.name(),
                    length: payload.len() as u64,
                });
            }
            writer.write_u8(tag.wire())?;
            writer.write_tlv_len(payload.len() as u64)?;
            writer.write_bytes(&payload)?;
        }
        writer.write_u8(Tag::TraceBlock.wire())?;
        writer.write_tlv_len(0)?;
        Ok(())
    }

    /// Decodes a header up to and including the trace block sentinel.
    ///
    /// Unknown tags are logged and skipped; unknown parameter types and
    /// out-of-range lengths inside known tags are fatal.
    pub(crate) fn decode<R: Read>(reader: &mut LeReader<R>) -> Result<Self> {
        let mut header = Header::new();
        loop {
            let wire = reader.read_u8()?;
            let length = reader.read_tlv_len()?;
            let Some(tag) = Tag::from_wire(wire) else {
                warn!(tag = wire, length, "skipping unknown header tag");
                reader.skip(length)?;
                continue;
            };
            if tag == Tag::TraceBlock {
                break;
            }
            if length > MAX_U16_LEN as u64 {
                return Err(TrsError::TagLengthOutOfRange {
                    tag: tag.name(),
                    length,
                });
            }
            let payload = reader.read_vec(length as usize)?;
            let value = decode_value(tag, &payload)?;
            header.values.insert(tag, value);
        }
        Ok(header)
    }
}

fn encode_value(tag: Tag, value: &HeaderValue) -> Result<Vec<u8>> {
    let out = match value {
        HeaderValue::Int(v) => {
            let width = tag.fixed_len();
            let max = match width {
                1 => 0xFF,
                2 => 0xFFFF,
                _ => i32::MAX,
            };
            if *v < 0 && width < 4 || *v > max {
                return Err(TrsError::HeaderValueOutOfRange {
                    tag: tag.name(),
                    value: *v,
                    width,
                });
            }
            v.to_le_bytes()[..width].to_vec()
        }
        HeaderValue::Float(v) => v.to_le_bytes().to_vec(),
        HeaderValue::Bool(v) => vec![*v as u8],
        HeaderValue::String(s) => s.as_bytes().to_vec(),
        HeaderValue::SetParameters(map) => map.to_bytes()?,
        HeaderValue::Definitions(definitions) => definitions.to_bytes()?,
    };
    Ok(out)
}

fn decode_value(tag: Tag, payload: &[u8]) -> Result<HeaderValue> {
    match tag.tag_type() {
        TagType::Int => {
            if payload.is_empty() || payload.len() > 8 {
                return Err(TrsError::LengthMismatch {
                    expected: tag.fixed_len(),
                    actual: payload.len(),
                });
            }
            let mut raw = [0u8; 8];
            raw[..payload.len()].copy_from_slice(payload);
            Ok(HeaderValue::Int(u64::from_le_bytes(raw) as i32))
        }
        TagType::Float => {
            let bytes: [u8; 4] = payload.try_into().map_err(|_| TrsError::LengthMismatch {
                expected: 4,
                actual: payload.len(),
            })?;
            Ok(HeaderValue::Float(f32::from_le_bytes(bytes)))
        }
        TagType::Bool => match payload.first() {
            Some(&byte) => Ok(HeaderValue::Bool(byte != 0)),
            None => Err(TrsError::LengthMismatch {
                expected: 1,
                actual: 0,
            }),
        },
        TagType::String => Ok(HeaderValue::String(String::from_utf8(payload.to_vec())?)),
        TagType::SetParameters => Ok(HeaderValue::SetParameters(
            TraceSetParameterMap::from_bytes(payload)?,
        )),
        TagType::Definitions => Ok(HeaderValue::Definitions(
            TraceParameterDefinitions::from_bytes(payload)?,
        )),
        // the decode loop breaks on the sentinel before reaching here
        TagType::Marker => Err(TrsError::HeaderTypeMismatch {
            tag: tag.name(),
            expected: TagType::Marker.name(),
            actual: "payload",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{TraceParameterMap, TypedKey};

    fn encode_to_vec(header: &Header) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = LeWriter::new(&mut out);
        header.encode(&mut writer).unwrap();
        out
    }

    fn decode_from_slice(bytes: &[u8]) -> Header {
        let mut reader = LeReader::new(bytes);
        let header = Header::decode(&mut reader).unwrap();
        assert_eq!(reader.consumed(), bytes.len() as u64);
        header
    }

    #[test]
    fn test_minimal_header_layout() {
        // required tags at their defaults, then the sentinel
        let bytes = encode_to_vec(&Header::new());
        assert_eq!(
            bytes,
            vec![
                0x41, 0x04, 0x00, 0x00, 0x00, 0x00, // NumberOfTraces = 0
                0x42, 0x04, 0x00, 0x00, 0x00, 0x00, // NumberOfSamples = 0
                0x43, 0x01, 0x14, // SampleCoding = float
                0x5F, 0x00, // TraceBlock
            ]
        );
    }

    #[test]
    fn test_roundtrip_idempotent_minimal() {
        let first = encode_to_vec(&Header::new());
        let second = encode_to_vec(&decode_from_slice(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn test_roundtrip_idempotent_fully_populated() {
        let mut set_parameters = TraceSetParameterMap::new();
        set_parameters
            .insert(&TypedKey::<String>::new("KEY"), "cafebabe".to_string())
            .unwrap();
        let mut trace_parameters = TraceParameterMap::new();
        trace_parameters
            .insert(&TypedKey::<Vec<u8>>::new("INPUT"), vec![0u8; 16])
            .unwrap();
        let definitions = TraceParameterDefinitions::from_parameters(&trace_parameters).unwrap();

        let mut header = Header::new();
        for &tag in Tag::ALL.iter() {
            let value = match tag.tag_type() {
                TagType::Int => HeaderValue::Int(1),
                TagType::Float => HeaderValue::Float(2.5),
                TagType::Bool => HeaderValue::Bool(true),
                TagType::String => HeaderValue::String("populated".to_string()),
                TagType::SetParameters => HeaderValue::SetParameters(set_parameters.clone()),
                TagType::Definitions => HeaderValue::Definitions(definitions.clone()),
                TagType::Marker => continue,
            };
            header.set(tag, value).unwrap();
        }

        let first = encode_to_vec(&header);
        let decoded = decode_from_slice(&first);
        assert_eq!(decoded, header);
        assert_eq!(encode_to_vec(&decoded), first);
    }

    #[test]
    fn test_long_string_uses_extended_length() {
        let mut header = Header::new();
        header.set_description("d".repeat(200));
        let bytes = encode_to_vec(&header);
        let decoded = decode_from_slice(&bytes);
        assert_eq!(decoded.description(), "d".repeat(200));
        assert_eq!(encode_to_vec(&decoded), bytes);
    }

    #[test]
    fn test_unknown_tags_are_skipped() {
        let mut bytes = Vec::new();
        let mut writer = LeWriter::new(&mut bytes);
        writer.write_u8(0x41).unwrap();
        writer.write_tlv_len(4).unwrap();
        writer.write_i32(7).unwrap();
        // unknown tag with a payload the reader must step over
        writer.write_u8(0x99).unwrap();
        writer.write_tlv_len(3).unwrap();
        writer.write_bytes(&[0xAA, 0xBB, 0xCC]).unwrap();
        writer.write_u8(0x42).unwrap();
        writer.write_tlv_len(4).unwrap();
        writer.write_i32(100).unwrap();
        writer.write_u8(0x5F).unwrap();
        writer.write_tlv_len(0).unwrap();

        let header = decode_from_slice(&bytes);
        assert_eq!(header.trace_count(), 7);
        assert_eq!(header.sample_count(), 100);
    }

    #[test]
    fn test_optional_default_not_emitted() {
        let mut header = Header::new();
        header.set(Tag::ScaleX, HeaderValue::Float(1.0)).unwrap();
        // explicitly set to the default: still skipped
        assert_eq!(encode_to_vec(&header), encode_to_vec(&Header::new()));

        header.set(Tag::ScaleX, HeaderValue::Float(2.0)).unwrap();
        assert_ne!(encode_to_vec(&header), encode_to_vec(&Header::new()));
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let mut header = Header::new();
        let err = header
            .set(Tag::NumberOfTraces, HeaderValue::Float(1.0))
            .unwrap_err();
        match err {
            TrsError::HeaderTypeMismatch { tag, expected, actual } => {
                assert_eq!(tag, "NumberOfTraces");
                assert_eq!(expected, "int");
                assert_eq!(actual, "float");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(header.set(Tag::TraceBlock, HeaderValue::Int(0)).is_err());
    }

    #[test]
    fn test_narrow_int_range_checked() {
        let mut header = Header::new();
        header.set(Tag::TitleSpace, HeaderValue::Int(300)).unwrap();
        let mut out = Vec::new();
        let err = header.encode(&mut LeWriter::new(&mut out)).unwrap_err();
        assert!(matches!(
            err,
            TrsError::HeaderValueOutOfRange {
                tag: "TitleSpace",
                value: 300,
                width: 1
            }
        ));

        let mut header = Header::new();
        header.set(Tag::DataLength, HeaderValue::Int(-1)).unwrap();
        let mut out = Vec::new();
        assert!(header.encode(&mut LeWriter::new(&mut out)).is_err());
    }

    #[test]
    fn test_sample_coding_accessors() {
        let mut header = Header::new();
        assert_eq!(header.sample_coding().unwrap(), SampleEncoding::Float);
        header.set_sample_coding(SampleEncoding::Short);
        assert_eq!(header.sample_coding().unwrap(), SampleEncoding::Short);
        header.set(Tag::SampleCoding, HeaderValue::Int(0x33)).unwrap();
        assert!(header.sample_coding().is_err());
    }

    #[test]
    fn test_from_wire_catalogue() {
        for &tag in Tag::ALL.iter() {
            assert_eq!(Tag::from_wire(tag.wire()), Some(tag));
        }
        assert_eq!(Tag::from_wire(0x40), None);
        assert_eq!(Tag::from_wire(0x50), None);
        assert_eq!(Tag::from_wire(0x99), None);
    }

    #[test]
    fn test_truncated_header() {
        let bytes = encode_to_vec(&Header::new());
        let mut reader = LeReader::new(&bytes[..bytes.len() - 2]);
        assert!(matches!(
            Header::decode(&mut reader),
            Err(TrsError::TruncatedFile { .. })
        ));
    }

    #[test]
    fn test_value_of_falls_back_to_default() {
        let header = Header::new();
        assert_eq!(
            header.value_of(Tag::GlobalTitle),
            Some(HeaderValue::String("trace".to_string()))
        );
        assert_eq!(header.value_of(Tag::ScaleY), Some(HeaderValue::Float(1.0)));
        assert_eq!(header.value_of(Tag::TraceBlock), None);
        assert!(!header.is_set(Tag::GlobalTitle));
        assert!(header.is_default(Tag::GlobalTitle));
    }
}
