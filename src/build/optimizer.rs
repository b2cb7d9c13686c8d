use std::fs;

use crate::core::error::Result;
use crate::lexicon::types::{TERM_META_SIZE, TermMeta, cstr};
use crate::storage::layout::ArchiveLayout;

#[derive(Debug, Clone, Copy)]
pub struct OptimizeStats {
    pub saved_bytes: usize,
    pub output_bytes: usize,
}

/// Rewrite `lexstr` so that a term whose bytes already occur as the suffix
/// of a longer stored string shares that storage instead of being emitted
/// again.
///
/// Terms are processed in order of decreasing string length. `ends` records
/// the NUL offset of every string emitted so far; the `limit` cursor
/// restricts candidates to strings emitted while the length was strictly
/// greater than the current one, so a suffix match always ends exactly at
/// a recorded NUL.
pub fn optimize_strings(layout: &ArchiveLayout) -> Result<OptimizeStats> {
    let meta_buf = fs::read(layout.lexmeta_path())?;
    let str_buf = fs::read(layout.lexstr_path())?;
    let term_count = meta_buf.len() / TERM_META_SIZE;

    let mut metas: Vec<TermMeta> = (0..term_count)
        .map(|i| TermMeta::read(&meta_buf, i))
        .collect();
    let lengths: Vec<u32> = metas
        .iter()
        .map(|m| cstr(&str_buf, m.str_offset).len() as u32)
        .collect();

    let mut order: Vec<u32> = (0..term_count as u32).collect();
    order.sort_by(|&l, &r| lengths[r as usize].cmp(&lengths[l as usize]));

    let mut out = vec![0u8];    // offset 0 stays reserved
    let mut ends: Vec<u32> = Vec::new();
    let mut limit = 0usize;
    let mut prev_len = u32::MAX;
    let mut saved = 0usize;

    for (i, &idx) in order.iter().enumerate() {
        if i & 0x1FF == 0 {
            eprintln!("optimizing strings: {}/{}", i, term_count);
        }

        let idx = idx as usize;
        let len = lengths[idx];
        if len < prev_len {
            limit = ends.len();
            prev_len = len;
        }

        let bytes = cstr(&str_buf, metas[idx].str_offset);

        let mut found = None;
        for &end in &ends[..limit] {
            let candidate = (end - len) as usize;
            if &out[candidate..candidate + len as usize] == bytes {
                found = Some(candidate as u32);
                break;
            }
        }

        match found {
            Some(offset) => {
                saved += len as usize;
                metas[idx].str_offset = offset;
            }
            None => {
                let offset = out.len() as u32;
                out.extend_from_slice(bytes);
                out.push(0);
                metas[idx].str_offset = offset;
                ends.push(offset + len);
            }
        }
    }

    let mut meta_out = Vec::with_capacity(term_count * TERM_META_SIZE);
    for meta in &metas {
        meta.write(&mut meta_out);
    }
    fs::write(layout.lexstr_path(), &out)?;
    fs::write(layout.lexmeta_path(), &meta_out)?;

    Ok(OptimizeStats {
        saved_bytes: saved,
        output_bytes: out.len(),
    })
}
