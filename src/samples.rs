//! Sample encodings and the sample codec.
//!
//! Samples live in application code as `f32`. On disk each trace set
//! commits to one of four widths, chosen once from the first trace
//! written: signed bytes, signed 16-bit, signed 32-bit, or IEEE
//! float32. Integer widths cut file size for integral data; float
//! keeps fractional values intact at the cost of 32-bit precision for
//! large 32-bit integers.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, TrsError};

/// Width of the samples stored in a trace set.
///
/// `Illegal` never appears on disk; it is the selection result for
/// sample data containing NaN or infinities, which cannot be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleEncoding {
    Illegal,
    Byte,
    Short,
    Int,
    Float,
}

impl SampleEncoding {
    /// Value stored in the header's sample coding tag.
    pub fn wire(self) -> u8 {
        match self {
            SampleEncoding::Illegal => 0x00,
            SampleEncoding::Byte => 0x01,
            SampleEncoding::Short => 0x02,
            SampleEncoding::Int => 0x04,
            SampleEncoding::Float => 0x14,
        }
    }

    /// Encoded size of one sample in bytes.
    pub fn sample_size(self) -> usize {
        match self {
            SampleEncoding::Illegal => 0,
            SampleEncoding::Byte => 1,
            SampleEncoding::Short => 2,
            SampleEncoding::Int | SampleEncoding::Float => 4,
        }
    }

    /// Maps a sample coding byte back to its encoding.
    ///
    /// # Errors
    ///
    /// Returns [`TrsError::UnknownSampleEncoding`] for any other byte,
    /// including `0x00`: `Illegal` is a selection result, never a valid
    /// on-disk coding.
    ///
    /// # Examples
    ///
    /// ```
    /// use trs::{SampleEncoding, TrsError};
    ///
    /// assert_eq!(SampleEncoding::from_wire(0x14)?, SampleEncoding::Float);
    /// assert!(matches!(
    ///     SampleEncoding::from_wire(0x99),
    ///     Err(TrsError::UnknownSampleEncoding(0x99))
    /// ));
    /// # Ok::<(), TrsError>(())
    /// ```
    pub fn from_wire(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(SampleEncoding::Byte),
            0x02 => Ok(SampleEncoding::Short),
            0x04 => Ok(SampleEncoding::Int),
            0x14 => Ok(SampleEncoding::Float),
            other => Err(TrsError::UnknownSampleEncoding(other)),
        }
    }

    pub fn is_illegal(self) -> bool {
        self == SampleEncoding::Illegal
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleEncoding::Illegal => "illegal",
            SampleEncoding::Byte => "byte",
            SampleEncoding::Short => "short",
            SampleEncoding::Int => "int",
            SampleEncoding::Float => "float",
        }
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Picks the narrowest encoding that represents every sample exactly.
///
/// One pass over the data: NaN or infinite values force `Illegal`, any
/// fractional value forces `Float`, and otherwise the narrowest signed
/// integer width that covers the value range wins.
///
/// # Examples
///
/// ```
/// use trs::{preferred_encoding, SampleEncoding};
///
/// assert_eq!(preferred_encoding(&[1.0, -2.0, 100.0]), SampleEncoding::Byte);
/// assert_eq!(preferred_encoding(&[1.0, 256.0]), SampleEncoding::Short);
/// assert_eq!(preferred_encoding(&[40_000.0]), SampleEncoding::Int);
/// assert_eq!(preferred_encoding(&[0.5]), SampleEncoding::Float);
/// assert_eq!(preferred_encoding(&[f32::NAN]), SampleEncoding::Illegal);
/// ```
pub fn preferred_encoding(samples: &[f32]) -> SampleEncoding {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    let mut integral = true;
    for &value in samples {
        if !value.is_finite() {
            return SampleEncoding::Illegal;
        }
        if value < min {
            min = value;
        }
        if value > max {
            max = value;
        }
        if value.trunc() != value {
            integral = false;
        }
    }
    if !integral {
        SampleEncoding::Float
    } else if min < i16::MIN as f32 || max > i16::MAX as f32 {
        SampleEncoding::Int
    } else if min < i8::MIN as f32 || max > i8::MAX as f32 {
        SampleEncoding::Short
    } else {
        SampleEncoding::Byte
    }
}

// Exact f32 bounds of the i32 range. i32::MAX itself rounds up when
// cast to f32, so the upper comparison is exclusive.
const I32_LOWER: f32 = -2_147_483_648.0;
const I32_UPPER: f32 = 2_147_483_648.0;

/// Encodes samples at the given width.
///
/// # Errors
///
/// NaN and infinite values are [`TrsError::IllegalSample`] under every
/// encoding. A finite value that is fractional or outside the range of
/// an integer encoding is [`TrsError::SampleOutOfRange`]; samples are
/// never silently rounded or clamped.
pub fn encode_samples(samples: &[f32], encoding: SampleEncoding) -> Result<Vec<u8>> {
    if let Some(index) = samples.iter().position(|value| !value.is_finite()) {
        return Err(TrsError::IllegalSample { index });
    }
    let out_of_range = |index: usize, value: f32| TrsError::SampleOutOfRange {
        index,
        value,
        encoding: encoding.name(),
    };
    let mut out = Vec::with_capacity(samples.len() * encoding.sample_size());
    match encoding {
        SampleEncoding::Illegal => {
            return Err(TrsError::IllegalSample { index: 0 });
        }
        SampleEncoding::Byte => {
            for (index, &value) in samples.iter().enumerate() {
                if value.trunc() != value || value < i8::MIN as f32 || value > i8::MAX as f32 {
                    return Err(out_of_range(index, value));
                }
                out.push(value as i8 as u8);
            }
        }
        SampleEncoding::Short => {
            for (index, &value) in samples.iter().enumerate() {
                if value.trunc() != value || value < i16::MIN as f32 || value > i16::MAX as f32 {
                    return Err(out_of_range(index, value));
                }
                let mut buffer = [0u8; 2];
                LittleEndian::write_i16(&mut buffer, value as i16);
                out.extend_from_slice(&buffer);
            }
        }
        SampleEncoding::Int => {
            for (index, &value) in samples.iter().enumerate() {
                if value.trunc() != value || value < I32_LOWER || value >= I32_UPPER {
                    return Err(out_of_range(index, value));
                }
                let mut buffer = [0u8; 4];
                LittleEndian::write_i32(&mut buffer, value as i32);
                out.extend_from_slice(&buffer);
            }
        }
        SampleEncoding::Float => {
            let start = out.len();
            out.resize(start + samples.len() * 4, 0);
            LittleEndian::write_f32_into(samples, &mut out[start..]);
        }
    }
    Ok(out)
}

/// Decodes samples stored at the given width back to `f32`.
///
/// Integer samples convert exactly except for 32-bit magnitudes beyond
/// 2^24, which round to the nearest representable `f32`.
///
/// # Errors
///
/// `bytes` must be a whole number of samples, and `encoding` must be
/// one of the four on-disk widths.
pub fn decode_samples(bytes: &[u8], encoding: SampleEncoding) -> Result<Vec<f32>> {
    if encoding.is_illegal() {
        return Err(TrsError::UnknownSampleEncoding(encoding.wire()));
    }
    let size = encoding.sample_size();
    if !bytes.len().is_multiple_of(size) {
        return Err(TrsError::LengthMismatch {
            expected: bytes.len() / size * size,
            actual: bytes.len(),
        });
    }
    let count = bytes.len() / size;
    let samples = match encoding {
        SampleEncoding::Illegal => {
            return Err(TrsError::UnknownSampleEncoding(encoding.wire()));
        }
        SampleEncoding::Byte => bytes.iter().map(|&b| b as i8 as f32).collect(),
        SampleEncoding::Short => {
            let mut raw = vec![0i16; count];
            LittleEndian::read_i16_into(bytes, &mut raw);
            raw.into_iter().map(|v| v as f32).collect()
        }
        SampleEncoding::Int => {
            let mut raw = vec![0i32; count];
            LittleEndian::read_i32_into(bytes, &mut raw);
            raw.into_iter().map(|v| v as f32).collect()
        }
        SampleEncoding::Float => {
            let mut raw = vec![0f32; count];
            LittleEndian::read_f32_into(bytes, &mut raw);
            raw
        }
    };
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_bijection() {
        for encoding in [
            SampleEncoding::Byte,
            SampleEncoding::Short,
            SampleEncoding::Int,
            SampleEncoding::Float,
        ] {
            assert_eq!(SampleEncoding::from_wire(encoding.wire()).unwrap(), encoding);
        }
        assert!(SampleEncoding::from_wire(0x00).is_err());
        assert!(SampleEncoding::from_wire(0x08).is_err());
    }

    #[test]
    fn test_preferred_encoding_selection() {
        assert_eq!(preferred_encoding(&[0.0]), SampleEncoding::Byte);
        assert_eq!(preferred_encoding(&[-128.0, 127.0]), SampleEncoding::Byte);
        assert_eq!(preferred_encoding(&[-129.0]), SampleEncoding::Short);
        assert_eq!(preferred_encoding(&[128.0]), SampleEncoding::Short);
        assert_eq!(
            preferred_encoding(&[-32_768.0, 32_767.0]),
            SampleEncoding::Short
        );
        assert_eq!(preferred_encoding(&[32_768.0]), SampleEncoding::Int);
        assert_eq!(preferred_encoding(&[-40_000.0]), SampleEncoding::Int);
        assert_eq!(preferred_encoding(&[1.0, 2.5]), SampleEncoding::Float);
        assert_eq!(preferred_encoding(&[1e6, 0.25]), SampleEncoding::Float);
        assert_eq!(preferred_encoding(&[f32::NAN]), SampleEncoding::Illegal);
        assert_eq!(
            preferred_encoding(&[0.0, f32::INFINITY]),
            SampleEncoding::Illegal
        );
        assert_eq!(
            preferred_encoding(&[f32::NEG_INFINITY]),
            SampleEncoding::Illegal
        );
    }

    #[test]
    fn test_preferred_encoding_empty() {
        assert_eq!(preferred_encoding(&[]), SampleEncoding::Byte);
    }

    #[test]
    fn test_roundtrip_each_width() {
        let cases = [
            (vec![-128.0f32, -1.0, 0.0, 127.0], SampleEncoding::Byte),
            (vec![-32_768.0, 300.0, 32_767.0], SampleEncoding::Short),
            (vec![-1_000_000.0, 0.0, 8_388_608.0], SampleEncoding::Int),
            (vec![-1.5, 0.0, 3.25e7], SampleEncoding::Float),
        ];
        for (samples, encoding) in cases {
            assert_eq!(preferred_encoding(&samples), encoding);
            let bytes = encode_samples(&samples, encoding).unwrap();
            assert_eq!(bytes.len(), samples.len() * encoding.sample_size());
            assert_eq!(decode_samples(&bytes, encoding).unwrap(), samples);
        }
    }

    #[test]
    fn test_integers_fit_in_wider_encoding() {
        let samples = [1.0f32, -2.0, 3.0];
        let bytes = encode_samples(&samples, SampleEncoding::Float).unwrap();
        assert_eq!(decode_samples(&bytes, SampleEncoding::Float).unwrap(), samples);
    }

    #[test]
    fn test_illegal_sample_reports_index() {
        let err = encode_samples(&[0.0, f32::NAN, 1.0], SampleEncoding::Float).unwrap_err();
        assert!(matches!(err, TrsError::IllegalSample { index: 1 }));
    }

    #[test]
    fn test_out_of_range_reports_value() {
        let err = encode_samples(&[1.0, 300.0], SampleEncoding::Byte).unwrap_err();
        match err {
            TrsError::SampleOutOfRange {
                index,
                value,
                encoding,
            } => {
                assert_eq!(index, 1);
                assert_eq!(value, 300.0);
                assert_eq!(encoding, "byte");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_fractional_rejected_by_integer_widths() {
        assert!(encode_samples(&[0.5], SampleEncoding::Byte).is_err());
        assert!(encode_samples(&[0.5], SampleEncoding::Short).is_err());
        assert!(encode_samples(&[0.5], SampleEncoding::Int).is_err());
        assert!(encode_samples(&[0.5], SampleEncoding::Float).is_ok());
    }

    #[test]
    fn test_int_upper_bound_exclusive() {
        // 2^31 as f32 is exactly the first unrepresentable i32
        assert!(encode_samples(&[2_147_483_648.0], SampleEncoding::Int).is_err());
        assert!(encode_samples(&[-2_147_483_648.0], SampleEncoding::Int).is_ok());
    }

    #[test]
    fn test_decode_length_mismatch() {
        let err = decode_samples(&[0u8; 5], SampleEncoding::Short).unwrap_err();
        assert!(matches!(
            err,
            TrsError::LengthMismatch {
                expected: 4,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_decode_negative_bytes() {
        let samples = decode_samples(&[0xFF, 0x80, 0x7F], SampleEncoding::Byte).unwrap();
        assert_eq!(samples, vec![-1.0, -128.0, 127.0]);
    }
}
