//! # trs - Trace Set Files for Side-Channel Analysis
//!
//! `trs` reads and writes trace set files: compact binary archives of
//! measurement traces (power, electromagnetic, timing) together with
//! set-level metadata and typed per-trace parameters such as cipher
//! inputs, keys, and instrument settings.
//!
//! The format is the `.trs` trace set layout used by side-channel
//! acquisition and analysis tooling. Files written by this crate use
//! format version 2 with typed trace parameters; version 1 files with
//! opaque per-trace data blocks are read transparently.
//!
//! ## Format Specification
//!
//! A file is a metadata header followed by a contiguous array of
//! fixed-size trace records:
//!
//! ### Header
//! - Tag-length-value entries: tag byte, length, payload
//! - Lengths up to `0x7F` occupy one byte; longer payloads store
//!   `0x80 | n` followed by `n` little-endian length bytes
//! - Required entries: trace count, samples per trace, sample coding
//! - The trace block marker (tag `0x5F`, length 0) ends the header;
//!   records start at the next byte
//!
//! ### Trace record
//! - Title: UTF-8, NUL-padded to the set's title space
//! - Parameter block: fixed layout declared once in the header
//! - Samples: int8, int16, int32 or float32, little-endian
//!
//! Every record in a set has the same byte length, so any trace can be
//! located by index without scanning.
//!
//! ## Basic Usage
//!
//! ### Writing and Reading Traces
//!
//! ```rust
//! use trs::{Trace, TraceParameterMap, TraceSetReader, TraceSetWriter, TypedKey};
//!
//! # fn main() -> trs::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("acquisition.trs");
//!
//! let input: TypedKey<Vec<u8>> = TypedKey::new("INPUT");
//!
//! // The first trace added fixes the record shape for the whole set
//! let mut writer = TraceSetWriter::create(&path)?;
//! for i in 0..20u8 {
//!     let mut parameters = TraceParameterMap::new();
//!     parameters.insert(&input, vec![i; 16])?;
//!     let samples = vec![0.5 * i as f32, -1.0, 2.25];
//!     writer.add(&Trace::new(format!("trace {i:02}"), samples, parameters))?;
//! }
//! writer.close()?;
//!
//! // Random access without loading the whole file
//! let mut reader = TraceSetReader::open(&path)?;
//! assert_eq!(reader.len(), 20);
//! let trace = reader.get(7)?;
//! assert_eq!(trace.title(), "trace 07");
//! assert_eq!(trace.samples(), &[3.5, -1.0, 2.25]);
//! assert_eq!(trace.parameters().get(&input)?, vec![7; 16]);
//! # Ok(())
//! # }
//! ```
//!
//! ### Set-Level Metadata
//!
//! ```rust,no_run
//! use trs::{Header, HeaderValue, Tag, TraceSetWriter};
//!
//! # fn main() -> trs::Result<()> {
//! let mut header = Header::new();
//! header.set_global_title("AES-128 SBox acquisition");
//! header.set(Tag::ScaleX, HeaderValue::Float(1e-9))?;
//! header.set(Tag::OffsetX, HeaderValue::Int(-100))?;
//!
//! let writer = TraceSetWriter::create_with("run.trs", header)?;
//! # let _ = writer;
//! # Ok(())
//! # }
//! ```
//!
//! ### Fast Bulk Loading
//!
//! ```rust,no_run
//! use trs::load_to_vec;
//!
//! # fn main() -> trs::Result<()> {
//! // Decode an entire file into memory at once
//! let (header, traces) = load_to_vec("data.trs")?;
//! println!("loaded {} traces of {} samples", traces.len(), header.sample_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Performance Characteristics
//!
//! - Writes are buffered and append-only; the header is rewritten once
//!   at close with the final trace count
//! - Reads go through a sliding memory-mapped window, so sets much
//!   larger than memory can be scanned or sampled at random
//! - Traces decode lazily; opening a file parses only the header
//! - Sample blocks move through `byteorder` bulk conversions rather
//!   than per-value loops
//!
//! ## Error Handling
//!
//! All operations return `Result<T, TrsError>` with the failing
//! offsets and values attached:
//!
//! ```rust
//! use trs::{TraceSetReader, TrsError};
//!
//! # fn main() {
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("short.trs");
//! // a header entry whose declared length runs past the end
//! std::fs::write(&path, [0x41, 0x04, 1]).unwrap();
//!
//! match TraceSetReader::open(&path) {
//!     Err(TrsError::TruncatedFile { offset }) => {
//!         println!("file ends inside the header at byte {offset}");
//!     }
//!     Err(e) => println!("other error: {e}"),
//!     Ok(_) => unreachable!(),
//! }
//! # }
//! ```
//!
//! ## Serde
//!
//! With the default `serde` feature, headers, traces and parameters
//! implement `Serialize` and `Deserialize` for interchange outside the
//! binary format.

mod error;
mod header;
mod params;
mod samples;
mod store;
mod trace;
mod wire;

pub use error::{Result, TrsError};
pub use header::{Header, HeaderValue, Tag, TagType, TRS_VERSION};
pub use params::{
    Element, ElementType, Parameter, ParameterData, ParameterDefinition, ParameterValue,
    TraceParameterDefinitions, TraceParameterMap, TraceSetParameterMap, TypedKey,
};
pub use samples::{preferred_encoding, SampleEncoding};
pub use store::{load_to_vec, save, save_with, TraceSetReader, TraceSetWriter, Traces};
pub use trace::{Trace, LEGACY_DATA};
