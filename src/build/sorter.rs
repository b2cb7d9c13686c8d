use std::fs;

use crate::core::error::Result;
use crate::lexicon::hit::rank_cmp;
use crate::lexicon::types::{
    HIT_COUNT_SHIFT, HIT_OFFSET_MASK, MAX_INLINE_HITS, POST_MASK, POSTING_SIZE, TERM_META_SIZE,
    TermMeta, read_u32,
};
use crate::storage::layout::ArchiveLayout;

/// Normalize the ordering the readers rely on: each term's postings sorted
/// by masked post id (binary-searchable by the AND join) and every hit
/// stream sorted by descending rank so the first hit is the representative
/// one. Inline streams are repacked into their record; spilled streams are
/// sorted in place in the hit array.
pub fn sort_postings(layout: &ArchiveLayout) -> Result<()> {
    let meta_buf = fs::read(layout.lexmeta_path())?;
    let mut data = fs::read(layout.lexdata_path())?;
    let mut hits = fs::read(layout.lexhit_path())?;
    let term_count = meta_buf.len() / TERM_META_SIZE;

    for t in 0..term_count {
        if t & 0x1FFF == 0 {
            eprintln!("sorting postings: {}/{}", t, term_count);
        }

        let meta = TermMeta::read(&meta_buf, t);
        let base = meta.data_offset as usize;
        let count = meta.data_size as usize;

        let mut records: Vec<(u32, u32)> = (0..count)
            .map(|i| {
                let at = base + i * POSTING_SIZE;
                (read_u32(&data, at), read_u32(&data, at + 4))
            })
            .collect();
        records.sort_by_key(|&(post, _)| post & POST_MASK);

        for (i, (post, hit_info)) in records.into_iter().enumerate() {
            let at = base + i * POSTING_SIZE;
            let hit_info = sort_hit_stream(hit_info, &mut hits);
            data[at..at + 4].copy_from_slice(&post.to_le_bytes());
            data[at + 4..at + 8].copy_from_slice(&hit_info.to_le_bytes());
        }
    }

    fs::write(layout.lexdata_path(), &data)?;
    fs::write(layout.lexhit_path(), &hits)?;
    Ok(())
}

fn sort_hit_stream(hit_info: u32, hits: &mut [u8]) -> u32 {
    let inline = (hit_info >> HIT_COUNT_SHIFT) as usize;
    if inline == 0 {
        let offset = (hit_info & HIT_OFFSET_MASK) as usize;
        let num = hits[offset] as usize;
        if num > 1 {
            hits[offset + 1..offset + 1 + num].sort_by(|&l, &r| rank_cmp(l, r));
        }
        hit_info
    } else if inline > 1 {
        let mut buf = [0u8; MAX_INLINE_HITS];
        for (i, slot) in buf[..inline].iter_mut().enumerate() {
            *slot = (hit_info >> (i * 8)) as u8;
        }
        buf[..inline].sort_by(|&l, &r| rank_cmp(l, r));

        let mut packed = (inline as u32) << HIT_COUNT_SHIFT;
        for (i, &hit) in buf[..inline].iter().enumerate() {
            packed |= (hit as u32) << (i * 8);
        }
        packed
    } else {
        hit_info
    }
}
