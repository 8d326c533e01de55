//! File-backed trace set sessions: an append-only writer and a
//! memory-mapped random access reader.

use std::path::Path;

use crate::error::Result;
use crate::header::Header;
use crate::trace::Trace;

mod reader;
mod window;
mod writer;

pub use reader::{TraceSetReader, Traces};
pub use writer::TraceSetWriter;

/// Writes a complete trace set to `path` with a default header.
///
/// # Examples
///
/// ```rust,no_run
/// use trs::Trace;
///
/// # fn main() -> trs::Result<()> {
/// let traces = vec![
///     Trace::from_samples("a", vec![1.0, 2.0]),
///     Trace::from_samples("b", vec![3.0, 4.0]),
/// ];
/// trs::save("data.trs", &traces)?;
/// # Ok(())
/// # }
/// ```
pub fn save<P: AsRef<Path>>(path: P, traces: &[Trace]) -> Result<()> {
    save_with(path, Header::new(), traces)
}

/// Writes a complete trace set to `path` with caller-supplied metadata.
pub fn save_with<P: AsRef<Path>>(path: P, header: Header, traces: &[Trace]) -> Result<()> {
    let mut writer = TraceSetWriter::create_with(path, header)?;
    for trace in traces {
        writer.add(trace)?;
    }
    writer.close()
}

/// Loads an entire trace set into memory.
///
/// For large sets prefer [`TraceSetReader`], which decodes traces on
/// demand instead of all at once.
///
/// # Examples
///
/// ```rust,no_run
/// use trs::load_to_vec;
///
/// # fn main() -> trs::Result<()> {
/// let (header, traces) = load_to_vec("data.trs")?;
/// println!("loaded {} traces of {} samples", traces.len(), header.sample_count());
/// # Ok(())
/// # }
/// ```
pub fn load_to_vec<P: AsRef<Path>>(path: P) -> Result<(Header, Vec<Trace>)> {
    let mut reader = TraceSetReader::open(path)?;
    let traces = reader.iter().collect::<Result<Vec<_>>>()?;
    Ok((reader.header().clone(), traces))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_to_vec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oneshot.trs");

        let traces = vec![
            Trace::from_samples("alpha", vec![1.0, -2.0, 3.0]),
            Trace::from_samples("bravo", vec![4.0, 5.0, -6.0]),
        ];
        save(&path, &traces).unwrap();

        let (header, loaded) = load_to_vec(&path).unwrap();
        assert_eq!(header.trace_count(), 2);
        assert_eq!(header.sample_count(), 3);
        assert_eq!(loaded, traces);
    }

    #[test]
    fn test_save_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("titled.trs");

        let mut header = Header::new();
        header.set_global_title("calibration run");
        save_with(&path, header, &[Trace::from_samples("only", vec![0.5])]).unwrap();

        let (header, loaded) = load_to_vec(&path).unwrap();
        assert_eq!(header.global_title(), "calibration run");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].samples(), &[0.5]);
    }
}
