use std::fs::File;

use memmap2::MmapOptions;

use crate::error::{Result, TrsError};

/// Default size of the mapped read window.
pub(crate) const DEFAULT_WINDOW_LEN: u64 = 256 * 1024 * 1024;

/// A memory-mapped view of part of a file, addressed by absolute file
/// offsets.
///
/// Remapping replaces the window wholesale; there is never more than
/// one mapping alive per reader.
#[derive(Debug)]
pub(crate) struct Window {
    map: memmap2::Mmap,
    start: u64,
    len: u64,
}

impl Window {
    /// Maps `want` bytes of `file` starting at `start`, clamped to the
    /// end of the file.
    pub(crate) fn map_at(file: &File, start: u64, want: u64, file_len: u64) -> Result<Self> {
        let len = want.min(file_len.saturating_sub(start));
        if len == 0 {
            return Err(TrsError::TruncatedFile { offset: start });
        }
        let map = unsafe { MmapOptions::new().offset(start).len(len as usize).map(file)? };
        Ok(Self { map, start, len })
    }

    pub(crate) fn start(&self) -> u64 {
        self.start
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// Whether the byte range `[start, start + len)` lies inside this
    /// window.
    pub(crate) fn contains(&self, start: u64, len: u64) -> bool {
        start >= self.start && start.saturating_add(len) <= self.start + self.len
    }

    /// Borrows the bytes at absolute file offset `start`.
    pub(crate) fn slice(&self, start: u64, len: usize) -> Result<&[u8]> {
        let rel = start
            .checked_sub(self.start)
            .ok_or(TrsError::TruncatedFile { offset: start })? as usize;
        let end = rel.saturating_add(len);
        if end > self.map.len() {
            return Err(TrsError::TruncatedFile {
                offset: self.start + end as u64,
            });
        }
        Ok(&self.map[rel..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_window_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.bin");
        let mut file = File::create(&path).unwrap();
        let bytes: Vec<u8> = (0u8..=255).collect();
        file.write_all(&bytes).unwrap();
        drop(file);

        let file = File::open(&path).unwrap();
        let window = Window::map_at(&file, 16, 64, 256).unwrap();
        assert_eq!(window.start(), 16);
        assert_eq!(window.len(), 64);
        assert!(window.contains(16, 64));
        assert!(window.contains(40, 8));
        assert!(!window.contains(8, 8));
        assert!(!window.contains(70, 32));

        assert_eq!(window.slice(16, 4).unwrap(), &[16, 17, 18, 19]);
        assert_eq!(window.slice(79, 1).unwrap(), &[79]);
        assert!(window.slice(8, 4).is_err());
        assert!(window.slice(79, 2).is_err());
    }

    #[test]
    fn test_window_clamps_to_file_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0u8; 100]).unwrap();
        drop(file);

        let file = File::open(&path).unwrap();
        let window = Window::map_at(&file, 40, 1024, 100).unwrap();
        assert_eq!(window.len(), 60);
        assert!(Window::map_at(&file, 100, 1024, 100).is_err());
    }
}
