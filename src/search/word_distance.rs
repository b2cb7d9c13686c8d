use std::cell::RefCell;

use crate::lexicon::files::PostingView;
use crate::lexicon::hit::{HIT_POS_MASK, NUM_HIT_TYPES, decode_type, hit_pos};

/// Distance reported when no pair of words shares a hit type with known
/// positions, and the flat penalty for single-word adjacency scoring.
pub const UNKNOWN_DISTANCE: u32 = 127;

struct Scratch {
    // position lists per (hit type, word), reused across calls
    lists: Vec<Vec<u8>>,
}

thread_local! {
    static SCRATCH: RefCell<Scratch> = RefCell::new(Scratch { lists: Vec::new() });
}

/// Minimum distance between position buckets of any two words sharing a
/// hit type within one post. Hits carrying the all-ones "position unknown"
/// sentinel are excluded. Short-circuits to 1 as soon as two words are
/// adjacent; returns 127 when no comparable pair exists.
///
/// Scratch buffers are thread-local so concurrent queries on different
/// threads never contend or allocate per call.
pub fn word_distance(posts: &[&PostingView]) -> u32 {
    SCRATCH.with(|scratch| {
        let scratch = &mut *scratch.borrow_mut();
        let words = posts.len();
        let want = NUM_HIT_TYPES * words;
        if scratch.lists.len() < want {
            scratch.lists.resize_with(want, Vec::new);
        }
        for list in &mut scratch.lists[..want] {
            list.clear();
        }

        for (w, post) in posts.iter().enumerate() {
            for &hit in post.hits {
                let t = decode_type(hit).index();
                let pos = hit_pos(hit);
                if pos < HIT_POS_MASK[t] {
                    scratch.lists[t * words + w].push(pos);
                }
            }
        }

        let mut min = UNKNOWN_DISTANCE;
        for t in 0..NUM_HIT_TYPES {
            let lists = &mut scratch.lists[t * words..(t + 1) * words];
            for list in lists.iter_mut() {
                list.sort_unstable();
            }

            for w1 in 0..words - 1 {
                if lists[w1].is_empty() {
                    continue;
                }
                for w2 in w1 + 1..words {
                    if lists[w2].is_empty() {
                        continue;
                    }
                    let d = pair_distance(&lists[w1], &lists[w2], min);
                    if d < 2 {
                        return 1;
                    }
                    min = d;
                }
            }
        }
        min
    })
}

/// Two-cursor walk over ascending position lists, advancing whichever
/// cursor trails. Returns the running minimum, never larger than `min`.
fn pair_distance(a: &[u8], b: &[u8], mut min: u32) -> u32 {
    let mut i1 = 0;
    let mut i2 = 0;
    loop {
        let diff = a[i1] as i32 - b[i2] as i32;
        let ad = diff.unsigned_abs();
        if ad < min {
            if ad < 2 {
                return 1;
            }
            min = ad;
        }
        if diff < 0 {
            i1 += 1;
            if i1 == a.len() {
                break;
            }
        } else {
            i2 += 1;
            if i2 == b.len() {
                break;
            }
        }
    }
    min
}
