use crate::core::error::{Error, ErrorKind, Result};
use crate::lexicon::types::{DIST_OFFSET_MASK, DIST_SHIFT, TermId, read_u32};
use crate::mmap::mmap_file::MmapFile;
use crate::storage::layout::ArchiveLayout;

/// One fuzzy neighbor of a term: its edit distance and the string offset
/// of the neighboring term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub distance: u8,
    pub str_offset: u32,
}

/// Per-term fuzzy neighbor lists produced by the distance builder.
///
/// The meta file holds one word per term: zero for "no neighbors", else a
/// byte offset into the data file where a count precedes the neighbor words.
pub struct DistanceView {
    meta: MmapFile,
    data: MmapFile,
}

impl DistanceView {
    /// Opens the neighbor files when present; a missing pair simply means
    /// fuzzy search is unavailable for this archive.
    pub fn open(layout: &ArchiveLayout) -> Result<Option<Self>> {
        let meta_path = layout.lexdistmeta_path();
        let data_path = layout.lexdist_path();
        if !meta_path.exists() || !data_path.exists() {
            return Ok(None);
        }

        let meta = MmapFile::open_read_only(meta_path)?;
        let data = MmapFile::open_read_only(data_path)?;
        if meta.len % 4 != 0 || data.len % 4 != 0 || data.len < 4 {
            return Err(Error::new(
                ErrorKind::Corrupt,
                "fuzzy neighbor files are not whole numbers of words".to_string(),
            ));
        }

        Ok(Some(DistanceView { meta, data }))
    }

    pub fn neighbors(&self, term: TermId) -> NeighborIter<'_> {
        let offset = read_u32(self.meta.data(), term as usize * 4) as usize;
        let (at, remaining) = if offset == 0 {
            (0, 0)
        } else {
            (offset + 4, read_u32(self.data.data(), offset))
        };

        NeighborIter {
            data: self.data.data(),
            at,
            remaining,
        }
    }
}

pub struct NeighborIter<'a> {
    data: &'a [u8],
    at: usize,
    remaining: u32,
}

impl Iterator for NeighborIter<'_> {
    type Item = Neighbor;

    fn next(&mut self) -> Option<Neighbor> {
        if self.remaining == 0 {
            return None;
        }
        let word = read_u32(self.data, self.at);
        self.at += 4;
        self.remaining -= 1;

        Some(Neighbor {
            distance: (word >> DIST_SHIFT) as u8,
            str_offset: word & DIST_OFFSET_MASK,
        })
    }
}
