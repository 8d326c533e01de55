//! Little-endian primitives shared by the header and record codecs.
//!
//! Every multi-byte integer in a trace set file is little-endian. The
//! reader and writer types here wrap any [`Read`]/[`Write`] impl, keep a
//! running byte counter, and translate short reads into
//! [`TrsError::TruncatedFile`] so callers always learn the offset at
//! which a file ran out.

use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, TrsError};

/// Largest length representable in a 16-bit wire field.
pub(crate) const MAX_U16_LEN: usize = u16::MAX as usize;

/// Truncates a string to at most `budget` bytes without splitting a
/// multi-byte code point.
pub(crate) fn truncate_utf8(s: &str, budget: usize) -> &str {
    if s.len() <= budget {
        return s;
    }
    let mut end = budget;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Little-endian writer over any byte sink.
pub struct LeWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> LeWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Total bytes written through this writer.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written = self.written.saturating_add(bytes.len() as u64);
        Ok(())
    }

    /// Writes `bytes` truncated to `budget`, zero-padded up to `budget`.
    pub fn write_padded(&mut self, bytes: &[u8], budget: usize) -> Result<()> {
        let n = bytes.len().min(budget);
        self.write_bytes(&bytes[..n])?;
        if n < budget {
            self.write_bytes(&vec![0u8; budget - n])?;
        }
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        let mut buffer = [0u8; 2];
        LittleEndian::write_u16(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        let mut buffer = [0u8; 2];
        LittleEndian::write_i16(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        let mut buffer = [0u8; 4];
        LittleEndian::write_i32(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        let mut buffer = [0u8; 4];
        LittleEndian::write_f32(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        let mut buffer = [0u8; 8];
        LittleEndian::write_i64(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        let mut buffer = [0u8; 8];
        LittleEndian::write_f64(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    /// Writes a header entry length.
    ///
    /// Lengths up to `0x7F` occupy a single byte. Longer lengths emit a
    /// marker byte `0x80 | n` followed by the `n` little-endian bytes
    /// that hold the length, with `n` minimal.
    pub fn write_tlv_len(&mut self, len: u64) -> Result<()> {
        if len <= 0x7F {
            return self.write_u8(len as u8);
        }
        let bytes = len.to_le_bytes();
        let n = 8 - len.leading_zeros() as usize / 8;
        self.write_u8(0x80 | n as u8)?;
        self.write_bytes(&bytes[..n])
    }
}

/// Little-endian reader over any byte source.
pub struct LeReader<R: Read> {
    inner: R,
    consumed: u64,
}

impl<R: Read> LeReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    /// Total bytes consumed through this reader.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    fn fill(&mut self, buffer: &mut [u8]) -> Result<()> {
        match self.inner.read_exact(buffer) {
            Ok(()) => {
                self.consumed = self.consumed.saturating_add(buffer.len() as u64);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(TrsError::TruncatedFile {
                offset: self.consumed,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.fill(&mut buffer)?;
        Ok(buffer)
    }

    /// Discards `len` bytes from the source.
    pub fn skip(&mut self, len: u64) -> Result<()> {
        let copied = io::copy(&mut self.inner.by_ref().take(len), &mut io::sink())?;
        self.consumed = self.consumed.saturating_add(copied);
        if copied < len {
            return Err(TrsError::TruncatedFile {
                offset: self.consumed,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buffer = [0u8; 1];
        self.fill(&mut buffer)?;
        Ok(buffer[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buffer = [0u8; 2];
        self.fill(&mut buffer)?;
        Ok(LittleEndian::read_u16(&buffer))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let mut buffer = [0u8; 2];
        self.fill(&mut buffer)?;
        Ok(LittleEndian::read_i16(&buffer))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buffer = [0u8; 4];
        self.fill(&mut buffer)?;
        Ok(LittleEndian::read_i32(&buffer))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let mut buffer = [0u8; 4];
        self.fill(&mut buffer)?;
        Ok(LittleEndian::read_f32(&buffer))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let mut buffer = [0u8; 8];
        self.fill(&mut buffer)?;
        Ok(LittleEndian::read_i64(&buffer))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let mut buffer = [0u8; 8];
        self.fill(&mut buffer)?;
        Ok(LittleEndian::read_f64(&buffer))
    }

    /// Reads a header entry length written by [`LeWriter::write_tlv_len`].
    ///
    /// Accepts up to eight length bytes after the marker. A marker that
    /// claims more is unreadable and rejected.
    pub fn read_tlv_len(&mut self) -> Result<u64> {
        let first = self.read_u8()?;
        if first & 0x80 == 0 {
            return Ok(first as u64);
        }
        let n = (first & 0x7F) as usize;
        if n > 8 {
            return Err(TrsError::LengthMismatch {
                expected: 8,
                actual: n,
            });
        }
        let mut bytes = [0u8; 8];
        self.fill(&mut bytes[..n])?;
        Ok(u64::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_roundtrip() {
        let mut out = Vec::new();
        let mut writer = LeWriter::new(&mut out);
        writer.write_u8(0xAB).unwrap();
        writer.write_u16(0xBEEF).unwrap();
        writer.write_i16(-1234).unwrap();
        writer.write_i32(-7_000_000).unwrap();
        writer.write_f32(1.5).unwrap();
        writer.write_i64(i64::MIN).unwrap();
        writer.write_f64(-2.25).unwrap();
        assert_eq!(writer.written(), 1 + 2 + 2 + 4 + 4 + 8 + 8);

        let mut reader = LeReader::new(out.as_slice());
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_i16().unwrap(), -1234);
        assert_eq!(reader.read_i32().unwrap(), -7_000_000);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_i64().unwrap(), i64::MIN);
        assert_eq!(reader.read_f64().unwrap(), -2.25);
        assert_eq!(reader.consumed(), 29);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut out = Vec::new();
        let mut writer = LeWriter::new(&mut out);
        writer.write_i32(0x0403_0201).unwrap();
        assert_eq!(out, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_tlv_len_single_byte() {
        for len in [0u64, 1, 0x7F] {
            let mut out = Vec::new();
            LeWriter::new(&mut out).write_tlv_len(len).unwrap();
            assert_eq!(out.len(), 1);
            assert_eq!(LeReader::new(out.as_slice()).read_tlv_len().unwrap(), len);
        }
    }

    #[test]
    fn test_tlv_len_extended() {
        let mut out = Vec::new();
        LeWriter::new(&mut out).write_tlv_len(0x80).unwrap();
        assert_eq!(out, vec![0x81, 0x80]);

        let mut out = Vec::new();
        LeWriter::new(&mut out).write_tlv_len(0xFFFF).unwrap();
        assert_eq!(out, vec![0x82, 0xFF, 0xFF]);

        let mut out = Vec::new();
        LeWriter::new(&mut out).write_tlv_len(0x0102_0304).unwrap();
        assert_eq!(out, vec![0x84, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(
            LeReader::new(out.as_slice()).read_tlv_len().unwrap(),
            0x0102_0304
        );
    }

    #[test]
    fn test_tlv_len_marker_with_no_bytes_is_zero() {
        let mut reader = LeReader::new([0x80u8].as_slice());
        assert_eq!(reader.read_tlv_len().unwrap(), 0);
    }

    #[test]
    fn test_tlv_len_rejects_oversized_marker() {
        let mut reader = LeReader::new([0x89u8, 0, 0, 0, 0, 0, 0, 0, 0, 0].as_slice());
        assert!(reader.read_tlv_len().is_err());
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let mut reader = LeReader::new([0x01u8, 0x02].as_slice());
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
        match reader.read_i32() {
            Err(TrsError::TruncatedFile { offset }) => assert_eq!(offset, 2),
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_skip_past_end() {
        let mut reader = LeReader::new([0u8; 4].as_slice());
        assert!(reader.skip(3).is_ok());
        assert!(matches!(
            reader.skip(3),
            Err(TrsError::TruncatedFile { offset: 4 })
        ));
    }

    #[test]
    fn test_write_padded() {
        let mut out = Vec::new();
        let mut writer = LeWriter::new(&mut out);
        writer.write_padded(b"abc", 6).unwrap();
        writer.write_padded(b"toolong", 4).unwrap();
        assert_eq!(out, b"abc\0\0\0tool");
    }

    #[test]
    fn test_truncate_utf8_keeps_char_boundaries() {
        assert_eq!(truncate_utf8("hello", 10), "hello");
        assert_eq!(truncate_utf8("hello", 3), "hel");
        // 'é' is two bytes; cutting inside it must back off
        assert_eq!(truncate_utf8("café", 4), "caf");
        assert_eq!(truncate_utf8("café", 5), "café");
        assert_eq!(truncate_utf8("日本", 4), "日");
    }
}
