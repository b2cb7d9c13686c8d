use crate::core::error::{Error, ErrorKind, Result};
use crate::lexicon::types::{TermId, cstr, read_u32};
use crate::mmap::mmap_file::MmapFile;
use crate::storage::layout::ArchiveLayout;

/// Table size in bits for a 0.75 load factor, rounded up to a power of two
pub fn hash_bits(count: u32) -> u32 {
    let scaled = count as u64 * 4 / 3;
    if scaled == 0 {
        1
    } else {
        64 - scaled.leading_zeros() as u32
    }
}

pub fn hash_size(bits: u32) -> u32 {
    1 << bits
}

pub fn hash_mask(bits: u32) -> u32 {
    hash_size(bits) - 1
}

/// Open-addressed string → term id index over the mapped hash files.
///
/// Slots hold byte offsets into the bucket-data file; zero marks an empty
/// slot, which is why byte 0 of the data file is reserved.
pub struct TermHash {
    slots: MmapFile,
    data: MmapFile,
    mask: u32,
}

impl TermHash {
    pub fn open(layout: &ArchiveLayout) -> Result<Self> {
        let slots = MmapFile::open_read_only(layout.lexhash_path())?;
        let data = MmapFile::open_read_only(layout.lexhashdata_path())?;

        if slots.len == 0 || slots.len % 4 != 0 || !(slots.len / 4).is_power_of_two() {
            return Err(Error::new(
                ErrorKind::Corrupt,
                "lexhash slot table is not a power-of-two number of words".to_string(),
            ));
        }

        let mask = (slots.len / 4 - 1) as u32;
        Ok(TermHash { slots, data, mask })
    }

    /// Resolve a term string to its id; None when the term is unknown
    pub fn search(&self, term: &str, lexstr: &[u8]) -> Option<TermId> {
        let slot = crc32fast::hash(term.as_bytes()) & self.mask;
        let offset = read_u32(self.slots.data(), slot as usize * 4);
        if offset == 0 {
            return None;
        }

        let data = self.data.data();
        let mut at = offset as usize;
        let count = read_u32(data, at);
        at += 4;
        for _ in 0..count {
            let str_offset = read_u32(data, at);
            if cstr(lexstr, str_offset) == term.as_bytes() {
                return Some(read_u32(data, at + 4));
            }
            at += 8;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bits_sizing() {
        // every table must hold at least 4/3 of the term count
        for count in [1u32, 2, 3, 5, 100, 4096, 100_000] {
            let size = hash_size(hash_bits(count));
            assert!(size as u64 * 3 >= count as u64 * 4, "count {}", count);
        }
    }

    #[test]
    fn test_hash_mask() {
        assert_eq!(hash_mask(4), 15);
        assert_eq!(hash_size(4), 16);
    }
}
