use std::fs;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::error::Result;
use crate::lexicon::types::{DIST_SHIFT, TERM_META_SIZE, TermMeta, cstr};
use crate::parallel::dispatch::TaskDispatch;
use crate::storage::layout::ArchiveLayout;

/// Longest term the two-row distance scratch accommodates
const MAX_LEV_LEN: usize = 127;

/// Standard two-row Levenshtein distance over raw bytes
fn levenshtein(s1: &[u8], s2: &[u8]) -> u32 {
    let mut prev = [0u32; MAX_LEV_LEN + 1];
    let mut cur = [0u32; MAX_LEV_LEN + 1];

    for (j, slot) in prev[..=s2.len()].iter_mut().enumerate() {
        *slot = j as u32;
    }
    for (i, &c1) in s1.iter().enumerate() {
        cur[0] = i as u32 + 1;
        for (j, &c2) in s2.iter().enumerate() {
            let subst = prev[j] + u32::from(c1 != c2);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(subst);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[s2.len()]
}

/// Compute, for every term, the set of other terms within edit distance 2
/// (distance 1 when both terms have length 3; pairs mixing length 3 with
/// longer strings are never compared) and emit `lexdist`/`lexdistmeta`.
///
/// Terms are partitioned into `workers × 16` contiguous tasks. Each term
/// owns a mutex-guarded neighbor row so the symmetric inserts from
/// different tasks never serialize globally; the progress counter sits
/// behind its own shared mutex.
///
/// Runs after string optimization: the emitted words reference final
/// string offsets.
pub fn build_distance(layout: &ArchiveLayout, workers: usize) -> Result<()> {
    let meta_buf = fs::read(layout.lexmeta_path())?;
    let str_buf = Arc::new(fs::read(layout.lexstr_path())?);
    let term_count = meta_buf.len() / TERM_META_SIZE;

    let str_offsets: Arc<Vec<u32>> = Arc::new(
        (0..term_count)
            .map(|i| TermMeta::read(&meta_buf, i).str_offset)
            .collect(),
    );
    let lengths: Arc<Vec<u32>> = Arc::new(
        str_offsets
            .iter()
            .map(|&off| cstr(&str_buf, off).len() as u32)
            .collect(),
    );

    let rows: Arc<Vec<Mutex<Vec<u32>>>> =
        Arc::new((0..term_count).map(|_| Mutex::new(Vec::new())).collect());
    let progress = Arc::new(Mutex::new(0u32));

    eprintln!("computing term distances on {} threads", workers);
    let pool = TaskDispatch::new(workers);
    let task_count = workers * 16;
    let per_task = term_count.div_ceil(task_count.max(1));

    let mut start = 0usize;
    let mut left = term_count;
    for _ in 0..task_count {
        let todo = left.min(per_task);
        let str_buf = Arc::clone(&str_buf);
        let str_offsets = Arc::clone(&str_offsets);
        let lengths = Arc::clone(&lengths);
        let rows = Arc::clone(&rows);
        let progress = Arc::clone(&progress);

        pool.queue(move || {
            for i in start..start + todo {
                {
                    let mut count = progress.lock();
                    *count += 1;
                    if *count & 0x3F == 0 {
                        eprintln!("{}/{}", *count, term_count);
                    }
                }

                let len1 = lengths[i];
                if len1 as usize > MAX_LEV_LEN {
                    continue;
                }
                let s1 = cstr(&str_buf, str_offsets[i]);
                let short1 = len1 == 3;

                for j in i + 1..term_count {
                    let len2 = lengths[j];
                    if short1 && len2 != 3 {
                        continue;
                    }
                    if len1.abs_diff(len2) > 2 || len2 as usize > MAX_LEV_LEN {
                        continue;
                    }
                    // at length 3 a distance of 2 is degenerate; pairs of a
                    // length-3 term with a longer one are skipped entirely
                    let max_dist = if short1 {
                        1
                    } else if len2 > 3 {
                        2
                    } else {
                        continue;
                    };

                    let s2 = cstr(&str_buf, str_offsets[j]);
                    let dist = levenshtein(s1, s2);
                    if dist <= max_dist {
                        rows[i].lock().push(dist << DIST_SHIFT | str_offsets[j]);
                        rows[j].lock().push(dist << DIST_SHIFT | str_offsets[i]);
                    }
                }
            }
        });

        start += todo;
        left -= todo;
    }
    pool.sync();

    let mut meta_out = Vec::with_capacity(term_count * 4);
    let mut data_out = vec![0u8; 4];    // reserved zero word; 0 in meta = empty
    for row in rows.iter() {
        let list = row.lock();
        if list.is_empty() {
            meta_out.extend_from_slice(&0u32.to_le_bytes());
        } else {
            let offset = data_out.len() as u32;
            meta_out.extend_from_slice(&offset.to_le_bytes());
            data_out.extend_from_slice(&(list.len() as u32).to_le_bytes());
            for word in list.iter() {
                data_out.extend_from_slice(&word.to_le_bytes());
            }
        }
    }

    fs::write(layout.lexdist_path(), &data_out)?;
    fs::write(layout.lexdistmeta_path(), &meta_out)?;
    Ok(())
}
