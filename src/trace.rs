use std::cell::Cell;

use crate::params::TraceParameterMap;
use crate::samples::{self, SampleEncoding};

/// Name under which the raw data blob of a version 1 file is exposed.
///
/// Old files carry an untyped byte block per trace instead of typed
/// parameters. Readers surface that block as a byte-array parameter
/// with this name, so application code sees one parameter model for
/// both versions.
pub const LEGACY_DATA: &str = "LEGACY_DATA";

/// One trace: a title, samples, and typed parameters.
///
/// Samples always live in memory as `f32`, whatever width they take on
/// disk, and cannot be mutated in place after construction. The
/// parameter map stays editable through [`Trace::parameters_mut`].
///
/// # Examples
///
/// ```
/// use trs::{SampleEncoding, Trace, TraceParameterMap, TypedKey};
///
/// let mut parameters = TraceParameterMap::new();
/// parameters.insert(&TypedKey::<Vec<u8>>::new("INPUT"), vec![0xAA; 16])?;
///
/// let trace = Trace::new("trace 0", vec![1.0, -3.0, 127.0], parameters);
/// assert_eq!(trace.preferred_encoding(), SampleEncoding::Byte);
/// assert_eq!(trace.samples().len(), 3);
/// # Ok::<(), trs::TrsError>(())
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trace {
    title: String,
    samples: Vec<f32>,
    parameters: TraceParameterMap,
    #[cfg_attr(feature = "serde", serde(skip))]
    preferred: Cell<Option<SampleEncoding>>,
}

impl Trace {
    pub fn new(title: impl Into<String>, samples: Vec<f32>, parameters: TraceParameterMap) -> Self {
        Self {
            title: title.into(),
            samples,
            parameters,
            preferred: Cell::new(None),
        }
    }

    /// A trace with no parameters.
    pub fn from_samples(title: impl Into<String>, samples: Vec<f32>) -> Self {
        Self::new(title, samples, TraceParameterMap::new())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn parameters(&self) -> &TraceParameterMap {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut TraceParameterMap {
        &mut self.parameters
    }

    /// The narrowest encoding that represents every sample exactly,
    /// computed once and cached.
    pub fn preferred_encoding(&self) -> SampleEncoding {
        if let Some(encoding) = self.preferred.get() {
            return encoding;
        }
        let encoding = samples::preferred_encoding(&self.samples);
        self.preferred.set(Some(encoding));
        encoding
    }

    /// The parameter block of this trace as raw bytes, in insertion
    /// order with strings at their natural length.
    ///
    /// This is the view a version 1 file would store as its data blob.
    pub fn raw_data(&self) -> Vec<u8> {
        self.parameters.serialize()
    }
}

impl PartialEq for Trace {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.samples == other.samples
            && self.parameters == other.parameters
    }
}
