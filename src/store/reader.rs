//! Random access to trace set files through a sliding memory map.
//!
//! The header is parsed once with buffered reads; the record array is
//! then served from a memory-mapped window that slides to cover
//! whichever trace is requested. Sequential scans remap rarely,
//! arbitrary jumps remap at most once per access.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Result, TrsError};
use crate::header::Header;
use crate::params::{TraceParameterDefinitions, TraceParameterMap, TypedKey};
use crate::samples::{decode_samples, SampleEncoding};
use crate::trace::{Trace, LEGACY_DATA};
use crate::wire::LeReader;

use super::window::{Window, DEFAULT_WINDOW_LEN};

/// A reader with random access to the traces of a trace set file.
///
/// Opening a file parses and validates the complete header and checks
/// that the file length matches the advertised trace count; traces are
/// decoded on demand by [`get`](Self::get) or the [`iter`](Self::iter)
/// iterator.
///
/// Legacy files (version below 2) carry an opaque per-trace data blob
/// instead of typed parameters; it surfaces as a byte-array parameter
/// named [`LEGACY_DATA`].
///
/// # Examples
///
/// ```no_run
/// use trs::TraceSetReader;
///
/// let mut reader = TraceSetReader::open("power.trs")?;
/// println!("{} traces of {} samples", reader.len(), reader.header().sample_count());
/// let trace = reader.get(17)?;
/// println!("{}: {:?}", trace.title(), &trace.samples()[..4]);
/// # Ok::<(), trs::TrsError>(())
/// ```
#[derive(Debug)]
pub struct TraceSetReader {
    file: File,
    file_len: u64,
    header: Header,
    metadata_size: u64,
    trace_count: usize,
    sample_count: usize,
    encoding: SampleEncoding,
    title_space: usize,
    data_length: usize,
    definitions: TraceParameterDefinitions,
    legacy: bool,
    trace_len: usize,
    window: Option<Window>,
    window_len: u64,
}

impl TraceSetReader {
    /// Opens a trace set file for reading.
    ///
    /// # Errors
    ///
    /// Fails if the header is malformed, if the sample coding is not a
    /// known encoding, or if the file length does not equal the header
    /// size plus `trace_count * trace_len`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_window(path, DEFAULT_WINDOW_LEN)
    }

    /// Opens a trace set file with a custom mapping window size.
    ///
    /// The window is grown to hold at least one trace, so a small
    /// `window_len` trades address space for a remap per access.
    pub fn open_with_window<P: AsRef<Path>>(path: P, window_len: u64) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        let mut reader = LeReader::new(BufReader::new(&file));
        let header = Header::decode(&mut reader)?;
        let metadata_size = reader.consumed();
        drop(reader);

        let trace_count = header.trace_count();
        let sample_count = header.sample_count();
        let encoding = header.sample_coding()?;
        let title_space = header.title_space();
        let legacy = header.version() < 2;
        let definitions = if legacy {
            TraceParameterDefinitions::default()
        } else {
            header.trace_parameter_definitions()
        };
        // v2 files may also carry the legacy data length tag; the
        // definitions are authoritative for the block size
        let data_length = if legacy {
            header.data_length()
        } else {
            definitions.total_byte_len()
        };
        let trace_len = title_space + data_length + sample_count * encoding.sample_size();

        let expected = metadata_size + (trace_len as u64) * (trace_count as u64);
        if expected != file_len {
            return Err(TrsError::FileSizeMismatch {
                expected,
                actual: file_len,
            });
        }

        Ok(Self {
            file,
            file_len,
            header,
            metadata_size,
            trace_count,
            sample_count,
            encoding,
            title_space,
            data_length,
            definitions,
            legacy,
            trace_len,
            window: None,
            window_len,
        })
    }

    /// Metadata parsed from the file header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of traces in the set.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.trace_count
    }

    /// Whether the set holds no traces.
    pub fn is_empty(&self) -> bool {
        self.trace_count == 0
    }

    /// Size in bytes of the encoded header.
    pub fn metadata_size(&self) -> u64 {
        self.metadata_size
    }

    /// Size in bytes of one encoded trace record.
    pub fn trace_len(&self) -> usize {
        self.trace_len
    }

    /// Decodes the trace at `index`.
    ///
    /// Takes `&mut self` because the mapped window may slide to cover
    /// the requested record. The file length is re-checked against the
    /// header on every access, so a file truncated behind an open
    /// reader fails with [`TrsError::FileSizeMismatch`] instead of
    /// faulting on the mapping.
    pub fn get(&mut self, index: usize) -> Result<Trace> {
        if index >= self.trace_count {
            return Err(TrsError::IndexOutOfRange {
                index,
                count: self.trace_count,
            });
        }
        let file_len = self.file.metadata()?.len();
        let expected = self.metadata_size + (self.trace_len as u64) * (self.trace_count as u64);
        if expected != file_len {
            return Err(TrsError::FileSizeMismatch {
                expected,
                actual: file_len,
            });
        }
        self.file_len = file_len;
        if self.trace_len == 0 {
            return self.decode_record(&[]);
        }
        let start = self.metadata_size + (index as u64) * (self.trace_len as u64);
        self.ensure_window(start, self.trace_len as u64)?;
        let window = self
            .window
            .as_ref()
            .ok_or(TrsError::TruncatedFile { offset: start })?;
        let bytes = window.slice(start, self.trace_len)?;
        self.decode_record(bytes)
    }

    /// Iterates over all traces in index order.
    pub fn iter(&mut self) -> Traces<'_> {
        Traces {
            reader: self,
            index: 0,
        }
    }

    fn ensure_window(&mut self, start: u64, len: u64) -> Result<()> {
        let stale = self
            .window
            .as_ref()
            .is_none_or(|window| !window.contains(start, len));
        if stale {
            tracing::debug!(start, len, "sliding trace window");
            let want = len.max(self.window_len);
            self.window = Some(Window::map_at(&self.file, start, want, self.file_len)?);
        }
        Ok(())
    }

    fn decode_record(&self, bytes: &[u8]) -> Result<Trace> {
        if bytes.len() != self.trace_len {
            return Err(TrsError::LengthMismatch {
                expected: self.trace_len,
                actual: bytes.len(),
            });
        }
        let (title_bytes, rest) = bytes.split_at(self.title_space);
        let (block, sample_bytes) = rest.split_at(self.data_length);

        let title = decode_title(title_bytes)?;
        let parameters = if self.legacy {
            let mut parameters = TraceParameterMap::new();
            if !block.is_empty() {
                parameters.insert(&TypedKey::<Vec<u8>>::new(LEGACY_DATA), block.to_vec())?;
            }
            parameters
        } else {
            TraceParameterMap::deserialize(block, &self.definitions)?
        };
        let samples = decode_samples(sample_bytes, self.encoding)?;
        Ok(Trace::new(title, samples, parameters))
    }
}

/// Iterator over the traces of a set, yielded in index order.
///
/// Returned by [`TraceSetReader::iter`]. Each item is a [`Result`]
/// because every trace is decoded on the fly.
pub struct Traces<'a> {
    reader: &'a mut TraceSetReader,
    index: usize,
}

impl Iterator for Traces<'_> {
    type Item = Result<Trace>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.reader.trace_count {
            return None;
        }
        let trace = self.reader.get(self.index);
        self.index += 1;
        Some(trace)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reader.trace_count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Traces<'_> {}

/// Titles are NUL-padded on disk; everything after the last non-NUL
/// byte is padding.
fn decode_title(bytes: &[u8]) -> Result<String> {
    let end = bytes
        .iter()
        .rposition(|&byte| byte != 0)
        .map_or(0, |last| last + 1);
    Ok(String::from_utf8(bytes[..end].to_vec())?)
}
