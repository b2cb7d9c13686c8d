use std::fs::File;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::core::error::Result;

/// Read-only memory-mapped index file for zero-copy reads.
///
/// Empty files are represented without a mapping; some platforms reject
/// zero-length maps.
pub struct MmapFile {
    map: Option<Mmap>,
    pub len: usize,
}

impl MmapFile {
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let len = file.metadata()?.len() as usize;

        let map = if len == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().len(len).map(&file)? })
        };

        Ok(MmapFile { map, len })
    }

    pub fn data(&self) -> &[u8] {
        match &self.map {
            Some(map) => &map[..],
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"hello").unwrap();

        let map = MmapFile::open_read_only(&path).unwrap();
        assert_eq!(map.len, 5);
        assert_eq!(map.data(), b"hello");
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();

        let map = MmapFile::open_read_only(&path).unwrap();
        assert_eq!(map.len, 0);
        assert!(map.data().is_empty());
    }
}
