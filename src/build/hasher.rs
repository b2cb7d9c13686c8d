use std::fs;

use crate::core::error::Result;
use crate::lexicon::hash::{hash_bits, hash_mask, hash_size};
use crate::lexicon::types::{TERM_META_SIZE, TermMeta, cstr};
use crate::storage::layout::ArchiveLayout;

/// Build the term hash index: bucket every `(str_offset, term_id)` pair by
/// the CRC32 of the term string, then emit one offset word per slot into
/// `lexhash` and the bucket payloads into `lexhashdata`.
///
/// Must run after string optimization, which is the last stage to move
/// string offsets.
pub fn build_hash(layout: &ArchiveLayout) -> Result<()> {
    let meta_buf = fs::read(layout.lexmeta_path())?;
    let str_buf = fs::read(layout.lexstr_path())?;
    let term_count = (meta_buf.len() / TERM_META_SIZE) as u32;

    let bits = hash_bits(term_count);
    let size = hash_size(bits);
    let mask = hash_mask(bits);

    let mut buckets: Vec<Vec<(u32, u32)>> = vec![Vec::new(); size as usize];
    for i in 0..term_count {
        if i & 0xFFF == 0 {
            eprintln!("hashing terms: {}/{}", i, term_count);
        }
        let meta = TermMeta::read(&meta_buf, i as usize);
        let term = cstr(&str_buf, meta.str_offset);
        let slot = crc32fast::hash(term) & mask;
        buckets[slot as usize].push((meta.str_offset, i));
    }

    let mut lexhash = Vec::with_capacity(size as usize * 4);
    let mut lexhashdata = vec![0u8; 4];     // offset 0 marks an empty slot

    for bucket in &mut buckets {
        // descending string order fails lookups early on shared prefixes
        bucket.sort_by(|l, r| cstr(&str_buf, r.0).cmp(cstr(&str_buf, l.0)));

        if bucket.is_empty() {
            lexhash.extend_from_slice(&0u32.to_le_bytes());
        } else {
            let offset = lexhashdata.len() as u32;
            lexhash.extend_from_slice(&offset.to_le_bytes());
            lexhashdata.extend_from_slice(&(bucket.len() as u32).to_le_bytes());
            for (str_offset, id) in bucket.iter() {
                lexhashdata.extend_from_slice(&str_offset.to_le_bytes());
                lexhashdata.extend_from_slice(&id.to_le_bytes());
            }
        }
    }

    fs::write(layout.lexhash_path(), &lexhash)?;
    fs::write(layout.lexhashdata_path(), &lexhashdata)?;
    Ok(())
}
