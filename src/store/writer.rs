//! Append-only write sessions for trace set files.
//!
//! A session writes the header lazily: the first trace added fixes the
//! shape of every record (sample count, sample encoding, title space
//! and the parameter layout), at which point a provisional header goes
//! to disk, followed by one fixed-size record per trace. Closing the
//! session rewrites the header in place with the final trace count.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Result, TrsError};
use crate::header::{Header, Tag, TRS_VERSION};
use crate::params::{TraceParameterDefinitions, TraceParameterMap};
use crate::samples::{encode_samples, SampleEncoding};
use crate::trace::Trace;
use crate::wire::{truncate_utf8, LeWriter};

// TitleSpace is a single header byte
const MAX_TITLE_SPACE: usize = 255;

/// Record shape fixed by the first trace added to a session.
struct LockedShape {
    sample_count: usize,
    encoding: SampleEncoding,
    title_space: usize,
    definitions: TraceParameterDefinitions,
}

impl LockedShape {
    fn record_len(&self) -> usize {
        self.title_space
            + self.definitions.total_byte_len()
            + self.sample_count * self.encoding.sample_size()
    }
}

/// A write session for a trace set file.
///
/// Traces are appended one at a time with [`add`](Self::add). The
/// first trace locks the shape of the set; every later trace must
/// carry the same sample count and the same parameter names and types,
/// and a trace that does not is rejected without ending the session.
///
/// [`close`](Self::close) finalizes the file. Dropping an unclosed
/// session finalizes on a best-effort basis, discarding any error, so
/// call `close` when the result matters.
///
/// # Examples
///
/// ```no_run
/// use trs::{Trace, TraceParameterMap, TraceSetWriter, TypedKey};
///
/// let input: TypedKey<Vec<u8>> = TypedKey::new("INPUT");
///
/// let mut writer = TraceSetWriter::create("power.trs")?;
/// for i in 0..100u8 {
///     let mut parameters = TraceParameterMap::new();
///     parameters.insert(&input, vec![i; 16])?;
///     let samples = vec![i as f32, -1.0, 3.0];
///     writer.add(&Trace::new(format!("trace {i}"), samples, parameters))?;
/// }
/// writer.close()?;
/// # Ok::<(), trs::TrsError>(())
/// ```
pub struct TraceSetWriter {
    file: BufWriter<File>,
    header: Header,
    locked: Option<LockedShape>,
    traces_written: usize,
    header_len: u64,
    finished: bool,
}

impl TraceSetWriter {
    /// Creates a trace set file with a default header.
    ///
    /// An existing file at `path` is truncated.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with(path, Header::new())
    }

    /// Creates a trace set file with caller-supplied metadata.
    ///
    /// Shape tags the caller pre-set to non-default values (sample
    /// count, sample coding, title space, parameter definitions) are
    /// kept as-is when the first trace locks the shape; the format
    /// version is always stamped to the current one.
    pub fn create_with<P: AsRef<Path>>(path: P, mut header: Header) -> Result<Self> {
        header.set_version(TRS_VERSION);
        let file = BufWriter::new(File::create(path)?);
        Ok(Self {
            file,
            header,
            locked: None,
            traces_written: 0,
            header_len: 0,
            finished: false,
        })
    }

    /// Appends one trace to the set.
    ///
    /// The first trace derives and locks the record shape and writes
    /// the header; later traces are validated against that shape.
    ///
    /// # Errors
    ///
    /// A trace whose samples cannot be represented at the locked
    /// encoding, or whose sample count or parameter set differs from
    /// the locked shape, is rejected. A failed `add` writes nothing
    /// and leaves the session usable.
    pub fn add(&mut self, trace: &Trace) -> Result<()> {
        if let Some(shape) = &self.locked {
            Self::check_shape(shape, trace)?;
            let record = Self::encode_record(shape, trace)?;
            self.file.write_all(&record)?;
            self.traces_written += 1;
            return Ok(());
        }

        let shape = self.derive_shape(trace)?;
        Self::check_shape(&shape, trace)?;
        let record = Self::encode_record(&shape, trace)?;
        let (header, header_bytes) = self.stamped_header(&shape)?;
        self.file.write_all(&header_bytes)?;
        self.file.write_all(&record)?;
        self.header = header;
        self.header_len = header_bytes.len() as u64;
        self.locked = Some(shape);
        self.traces_written = 1;
        Ok(())
    }

    /// Metadata as it will be written at close, minus the final trace
    /// count.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of traces added in this session.
    pub fn traces_written(&self) -> usize {
        self.traces_written
    }

    /// Finalizes the file and rewrites the header with the final trace
    /// count.
    ///
    /// A session closed before any trace was added still writes its
    /// header, producing a valid empty trace set.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.header.set_trace_count(self.traces_written);
        let mut bytes = Vec::new();
        self.header.encode(&mut LeWriter::new(&mut bytes))?;
        if self.locked.is_some() {
            // same tags, same widths: the rewrite cannot move the records
            debug_assert_eq!(bytes.len() as u64, self.header_len);
            self.file.seek(SeekFrom::Start(0))?;
        }
        self.file.write_all(&bytes)?;
        self.file.flush()?;
        Ok(())
    }

    fn derive_shape(&self, trace: &Trace) -> Result<LockedShape> {
        let header = &self.header;
        let sample_count = if header.is_default(Tag::NumberOfSamples) {
            trace.samples().len()
        } else {
            header.sample_count()
        };
        let encoding = if header.is_default(Tag::SampleCoding) {
            trace.preferred_encoding()
        } else {
            header.sample_coding()?
        };
        if encoding.is_illegal() {
            let index = trace
                .samples()
                .iter()
                .position(|value| !value.is_finite())
                .unwrap_or(0);
            return Err(TrsError::IllegalSample { index });
        }
        let title_space = if header.is_default(Tag::TitleSpace) {
            trace.title().len().min(MAX_TITLE_SPACE)
        } else {
            header.title_space()
        };
        let definitions = if header.is_default(Tag::TraceParameterDefinitions) {
            TraceParameterDefinitions::from_parameters(trace.parameters())?
        } else {
            header.trace_parameter_definitions()
        };
        Ok(LockedShape {
            sample_count,
            encoding,
            title_space,
            definitions,
        })
    }

    fn stamped_header(&self, shape: &LockedShape) -> Result<(Header, Vec<u8>)> {
        let mut header = self.header.clone();
        header.set_sample_count(shape.sample_count);
        header.set_sample_coding(shape.encoding);
        header.set_title_space(shape.title_space);
        header.set_data_length(shape.definitions.total_byte_len());
        header.set_trace_parameter_definitions(shape.definitions.clone());
        let mut bytes = Vec::new();
        header.encode(&mut LeWriter::new(&mut bytes))?;
        Ok((header, bytes))
    }

    fn check_shape(shape: &LockedShape, trace: &Trace) -> Result<()> {
        if trace.samples().len() != shape.sample_count {
            return Err(TrsError::SampleCountMismatch {
                expected: shape.sample_count,
                actual: trace.samples().len(),
            });
        }
        let parameters = trace.parameters();
        let matches = parameters.len() == shape.definitions.len()
            && shape.definitions.iter().all(|(name, definition)| {
                parameters
                    .raw(name)
                    .is_some_and(|parameter| parameter.element_type() == definition.element_type())
            });
        if !matches {
            return Err(TrsError::ParameterMismatch {
                expected: describe_definitions(&shape.definitions),
                actual: describe_parameters(parameters),
            });
        }
        Ok(())
    }

    fn encode_record(shape: &LockedShape, trace: &Trace) -> Result<Vec<u8>> {
        let data_length = shape.definitions.total_byte_len();
        let mut out = Vec::with_capacity(shape.record_len());
        let mut writer = LeWriter::new(&mut out);
        let title = truncate_utf8(trace.title(), shape.title_space);
        writer.write_padded(title.as_bytes(), shape.title_space)?;
        let block = trace.parameters().serialize_with(&shape.definitions)?;
        if block.len() != data_length {
            return Err(TrsError::LengthMismatch {
                expected: data_length,
                actual: block.len(),
            });
        }
        writer.write_bytes(&block)?;
        let samples = encode_samples(trace.samples(), shape.encoding)?;
        writer.write_bytes(&samples)?;
        Ok(out)
    }
}

impl Drop for TraceSetWriter {
    fn drop(&mut self) {
        self.finish().ok();
    }
}

fn describe_definitions(definitions: &TraceParameterDefinitions) -> String {
    definitions
        .iter()
        .map(|(name, definition)| format!("{name}:{}", definition.element_type()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_parameters(parameters: &TraceParameterMap) -> String {
    parameters
        .iter()
        .map(|(name, parameter)| format!("{name}:{}", parameter.element_type()))
        .collect::<Vec<_>>()
        .join(", ")
}
