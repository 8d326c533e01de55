//! Error handling for the TRS library.
//!
//! This module defines all error types that can occur while encoding,
//! decoding, writing, or reading trace set files. Structural errors (bad
//! bytes, mismatched sizes) are fatal for the file; shape and value errors
//! reject the offending call and leave the session usable.

use thiserror::Error;

/// A specialized `Result` type for TRS operations.
///
/// This type is used throughout the TRS library for any operation that can
/// fail. It's equivalent to `std::result::Result<T, TrsError>`.
///
/// # Examples
///
/// ```rust
/// use trs::{Result, TraceParameterMap, TypedKey};
///
/// fn tag_input(map: &mut TraceParameterMap, input: Vec<u8>) -> Result<()> {
///     let key: TypedKey<Vec<u8>> = TypedKey::new("INPUT");
///     map.insert(&key, input)
/// }
/// ```
pub type Result<T> = std::result::Result<T, TrsError>;

/// Error types for TRS operations.
///
/// This enum covers every failure mode of the trace set codec and store.
/// Variants fall into four families:
///
/// - **format** — malformed bytes, unknown wire tags, size cross-check
///   failures; the file is unusable past that point
///   ([`TruncatedFile`](TrsError::TruncatedFile),
///   [`UnknownParameterType`](TrsError::UnknownParameterType),
///   [`FileSizeMismatch`](TrsError::FileSizeMismatch), ...)
/// - **consistency** — a trace handed to a writer disagrees with the shape
///   locked by the first trace; only that `add` call is rejected
///   ([`SampleCountMismatch`](TrsError::SampleCountMismatch),
///   [`ParameterMismatch`](TrsError::ParameterMismatch))
/// - **usage** — an out-of-range trace index
///   ([`IndexOutOfRange`](TrsError::IndexOutOfRange))
/// - **value** — a single value that cannot be represented
///   ([`EmptyArray`](TrsError::EmptyArray),
///   [`IllegalSample`](TrsError::IllegalSample),
///   [`SampleOutOfRange`](TrsError::SampleOutOfRange), ...)
///
/// None of these conditions are retried: the backing store is a local file,
/// so every failure is either caller error or corruption.
///
/// # Examples
///
/// ```rust
/// use trs::{SampleEncoding, TrsError};
///
/// match SampleEncoding::from_wire(0x99) {
///     Err(TrsError::UnknownSampleEncoding(byte)) => assert_eq!(byte, 0x99),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum TrsError {
    /// I/O error from the underlying file or stream.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// A string field (title, parameter name, string value) is not valid
    /// UTF-8.
    #[error("Invalid UTF-8 string")]
    InvalidString(#[from] std::string::FromUtf8Error),

    /// The file ended before a fixed-size field could be filled.
    ///
    /// Always a fatal format error: the underlying store is a local file,
    /// so a short read means truncation or corruption, never a transient
    /// condition.
    #[error("Unexpected end of file at offset {offset}")]
    TruncatedFile { offset: u64 },

    /// A parameter type byte that maps to no known element type.
    ///
    /// Unlike unknown *header* tags (which are skipped for forward
    /// compatibility), an unknown parameter type makes the parameter block
    /// undecodable and is fatal.
    #[error("Unknown parameter type byte ({0:#04x})")]
    UnknownParameterType(u8),

    /// A sample coding byte that maps to no known sample encoding.
    #[error("Unknown sample encoding byte ({0:#04x})")]
    UnknownSampleEncoding(u8),

    /// A known header tag declared a payload length outside `[0, 0xFFFF]`.
    #[error("Length {length} of header tag {tag} outside [0, 65535]")]
    TagLengthOutOfRange { tag: &'static str, length: u64 },

    /// A header value whose type does not match the tag's declared type.
    #[error("Header tag {tag} holds {expected} values, got {actual}")]
    HeaderTypeMismatch {
        tag: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    /// An integer header value that does not fit the tag's declared wire
    /// width (1- and 2-byte header integers are unsigned on the wire).
    #[error("Value {value} of header tag {tag} does not fit in {width} byte(s)")]
    HeaderValueOutOfRange {
        tag: &'static str,
        value: i32,
        width: usize,
    },

    /// A byte block whose length disagrees with the length implied by the
    /// header (parameter block vs. definitions, sample block vs. coding).
    #[error("Data length mismatch, expected ({expected}) bytes, found ({actual})")]
    LengthMismatch { expected: usize, actual: usize },

    /// The file size does not equal `header size + trace size * trace
    /// count`.
    ///
    /// Raised when opening or reading a truncated or corrupt file, before
    /// any trace bytes are misinterpreted.
    #[error("File size does not match header, expected ({expected}) bytes, found ({actual})")]
    FileSizeMismatch { expected: u64, actual: u64 },

    /// A trace index at or beyond the number of traces in the set.
    #[error("Invalid trace index ({index}) - Must be less than {count}")]
    IndexOutOfRange { index: usize, count: usize },

    /// A trace whose sample count differs from the count locked by the
    /// first trace written to the set.
    #[error("Sample count mismatch, expected ({expected}), found ({actual})")]
    SampleCountMismatch { expected: usize, actual: usize },

    /// A trace whose parameter names or types differ from the set locked by
    /// the first trace written to the set.
    #[error("Trace parameters [{actual}] do not match the set's parameter definitions [{expected}]")]
    ParameterMismatch { expected: String, actual: String },

    /// A typed lookup for a key the map does not contain.
    #[error("Parameter {key:?} is not present in the map")]
    MissingParameter { key: String },

    /// An attempt to create a parameter from an empty array.
    #[error("Parameter {key:?} must hold at least one element")]
    EmptyArray { key: String },

    /// Typed access to a parameter holding a different element type.
    #[error("Parameter {key:?} holds {actual} values, requested {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Scalar access to a parameter holding more than one element.
    #[error("Parameter {key:?} holds {len} elements and cannot be read as a scalar")]
    NotScalar { key: String, len: usize },

    /// A NaN or infinite sample value.
    ///
    /// Traces containing such values have no legal sample encoding and can
    /// never be persisted.
    #[error("Sample {index} is NaN or infinite and cannot be encoded")]
    IllegalSample { index: usize },

    /// A sample value that does not fit the sample encoding locked for the
    /// set.
    #[error("Sample {index} ({value}) is not representable as {encoding}")]
    SampleOutOfRange {
        index: usize,
        value: f32,
        encoding: &'static str,
    },

    /// A name or element count above the 16-bit wire limit.
    #[error("Length of {what} ({len}) exceeds the maximum ({max})")]
    LengthOverflow {
        what: String,
        len: usize,
        max: usize,
    },
}
