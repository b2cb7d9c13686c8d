use crate::core::config::{LexiconConfig, Manifest};
use crate::core::error::{Error, ErrorKind, Result};
use crate::lexicon::distance::DistanceView;
use crate::lexicon::hash::TermHash;
use crate::lexicon::types::{
    CHILD_SHIFT, HIT_COUNT_SHIFT, HIT_OFFSET_MASK, POST_MASK, POSTING_SIZE, TERM_META_SIZE, TermId,
    TermMeta, cstr, read_u32,
};
use crate::mmap::mmap_file::MmapFile;
use crate::storage::file_lock::ArchiveLock;
use crate::storage::layout::ArchiveLayout;

/// Read surface over a fully built archive index.
///
/// All index files are opened read-only and memory-mapped for the lifetime
/// of the value; nothing is mutated after publication. A shared advisory
/// lock on the archive directory is held as long as the lexicon is open.
pub struct Lexicon {
    strings: MmapFile,
    meta: MmapFile,
    data: MmapFile,
    hits: MmapFile,
    hash: TermHash,
    dist: Option<DistanceView>,
    manifest: Manifest,
    _lock: ArchiveLock,
}

/// One decoded posting: post identity plus a view of its rank-sorted hit
/// stream, whether it was stored inline or in the spill array.
#[derive(Debug, Clone, Copy)]
pub struct PostingView<'a> {
    pub post_id: u32,
    pub children: u8,
    pub hits: &'a [u8],
}

impl Lexicon {
    pub fn open(layout: &ArchiveLayout) -> Result<Self> {
        let lock = ArchiveLock::shared(layout)?;
        let manifest = Manifest::load(&layout.manifest_path())?;

        let strings = MmapFile::open_read_only(layout.lexstr_path())?;
        let meta = MmapFile::open_read_only(layout.lexmeta_path())?;
        let data = MmapFile::open_read_only(layout.lexdata_path())?;
        let hits = MmapFile::open_read_only(layout.lexhit_path())?;

        if meta.len % TERM_META_SIZE != 0 {
            return Err(Error::new(
                ErrorKind::Corrupt,
                "lexmeta size is not a whole number of records".to_string(),
            ));
        }
        if data.len % POSTING_SIZE != 0 {
            return Err(Error::new(
                ErrorKind::Corrupt,
                "lexdata size is not a whole number of postings".to_string(),
            ));
        }

        let hash = TermHash::open(layout)?;
        let dist = DistanceView::open(layout)?;

        Ok(Lexicon {
            strings,
            meta,
            data,
            hits,
            hash,
            dist,
            manifest,
            _lock: lock,
        })
    }

    pub fn num_terms(&self) -> u32 {
        (self.meta.len / TERM_META_SIZE) as u32
    }

    pub fn message_count(&self) -> u32 {
        self.manifest.message_count
    }

    pub fn config(&self) -> &LexiconConfig {
        &self.manifest.config
    }

    pub fn has_distance_data(&self) -> bool {
        self.dist.is_some()
    }

    pub fn distance(&self) -> Option<&DistanceView> {
        self.dist.as_ref()
    }

    pub fn term_meta(&self, id: TermId) -> TermMeta {
        TermMeta::read(self.meta.data(), id as usize)
    }

    /// NUL-terminated term string at `offset` in the string blob
    pub fn term_str(&self, offset: u32) -> &str {
        std::str::from_utf8(cstr(self.strings.data(), offset)).unwrap_or("")
    }

    pub fn string_data(&self) -> &[u8] {
        self.strings.data()
    }

    /// Resolve a term string to its id
    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.hash.search(term, self.strings.data())
    }

    /// Iterate the postings recorded for one term
    pub fn postings(&self, meta: &TermMeta) -> PostingIter<'_> {
        PostingIter {
            data: self.data.data(),
            hits: self.hits.data(),
            at: meta.data_offset as usize,
            remaining: meta.data_size,
        }
    }
}

pub struct PostingIter<'a> {
    data: &'a [u8],
    hits: &'a [u8],
    at: usize,
    remaining: u32,
}

impl<'a> Iterator for PostingIter<'a> {
    type Item = PostingView<'a>;

    fn next(&mut self) -> Option<PostingView<'a>> {
        if self.remaining == 0 {
            return None;
        }
        let post = read_u32(self.data, self.at);
        let hit_info = read_u32(self.data, self.at + 4);

        let inline = (hit_info >> HIT_COUNT_SHIFT) as usize;
        let hits = if inline == 0 {
            let offset = (hit_info & HIT_OFFSET_MASK) as usize;
            let num = self.hits[offset] as usize;
            &self.hits[offset + 1..offset + 1 + num]
        } else {
            // inline hits live in the low bytes of the record itself
            &self.data[self.at + 4..self.at + 4 + inline]
        };

        self.at += POSTING_SIZE;
        self.remaining -= 1;

        Some(PostingView {
            post_id: post & POST_MASK,
            children: (post >> CHILD_SHIFT) as u8,
            hits,
        })
    }
}
