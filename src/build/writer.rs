use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::analysis::tokenizer::WordTokenizer;
use crate::core::config::{LexiconConfig, Manifest};
use crate::core::error::{Error, ErrorKind, Result};
use crate::lexicon::hit::{HitType, NUM_HIT_TYPES, encode_hit};
use crate::lexicon::types::{
    CHILD_MAX, CHILD_SHIFT, HIT_COUNT_SHIFT, HIT_OFFSET_MASK, MAX_INLINE_HITS, POST_MASK, TermMeta,
};
use crate::storage::layout::ArchiveLayout;

/// One message handed to the indexer: its reply-child count plus text
/// regions already classified by structural hit type by the ingestion side.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    pub child_count: u32,
    pub regions: Vec<(HitType, &'a str)>,
}

struct PostingAccum {
    post: u32,      // post id | child count << 27
    hits: Vec<u8>,
}

/// Accumulates per-term postings in memory and emits the four lexicon
/// files plus the archive manifest. Post ids are assigned densely in
/// insertion order, so per-term posting lists come out sorted already;
/// the sort stage still normalizes them.
pub struct LexiconWriter {
    config: LexiconConfig,
    tokenizer: WordTokenizer,
    term_ids: HashMap<String, u32>,
    terms: Vec<String>,
    postings: Vec<Vec<PostingAccum>>,
    message_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BuildStats {
    pub messages: u32,
    pub terms: usize,
    pub postings: usize,
}

impl LexiconWriter {
    pub fn new(config: LexiconConfig) -> Self {
        let tokenizer = WordTokenizer::new(&config);
        LexiconWriter {
            config,
            tokenizer,
            term_ids: HashMap::new(),
            terms: Vec::new(),
            postings: Vec::new(),
            message_count: 0,
        }
    }

    /// Index one message; returns the post id assigned to it
    pub fn add_message(&mut self, child_count: u32, regions: &[(HitType, &str)]) -> Result<u32> {
        let tokenized: Vec<(HitType, Vec<String>)> = regions
            .iter()
            .map(|(kind, text)| (*kind, self.tokenizer.tokenize(text)))
            .collect();
        self.add_tokenized(child_count, &tokenized)
    }

    /// Tokenize a batch of messages in parallel, then merge in input order
    /// so post id assignment stays deterministic.
    pub fn add_batch(&mut self, messages: &[Message]) -> Result<()> {
        let progress = AtomicUsize::new(0);
        let total = messages.len();
        let tokenizer = self.tokenizer.clone();

        let tokenized: Vec<Vec<(HitType, Vec<String>)>> = messages
            .par_iter()
            .map(|msg| {
                let regions = msg
                    .regions
                    .iter()
                    .map(|(kind, text)| (*kind, tokenizer.tokenize(text)))
                    .collect();

                let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 1000 == 0 {
                    eprintln!("tokenizing: {}/{}", done, total);
                }
                regions
            })
            .collect();

        for (msg, regions) in messages.iter().zip(&tokenized) {
            self.add_tokenized(msg.child_count, regions)?;
        }
        Ok(())
    }

    fn add_tokenized(
        &mut self,
        child_count: u32,
        regions: &[(HitType, Vec<String>)],
    ) -> Result<u32> {
        if self.message_count > POST_MASK {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "archive exceeds the 27-bit post id space".to_string(),
            ));
        }
        let post_id = self.message_count;
        self.message_count += 1;
        let post = post_id | child_count.min(CHILD_MAX) << CHILD_SHIFT;

        let hit_cap = self.config.max_hits_per_posting.min(255);
        let mut type_pos = [0u32; NUM_HIT_TYPES];

        for (kind, words) in regions {
            for word in words {
                let hit = encode_hit(*kind, type_pos[kind.index()]);
                type_pos[kind.index()] += 1;

                let id = match self.term_ids.get(word.as_str()).copied() {
                    Some(id) => id,
                    None => {
                        let id = self.terms.len() as u32;
                        self.term_ids.insert(word.clone(), id);
                        self.terms.push(word.clone());
                        self.postings.push(Vec::new());
                        id
                    }
                };

                let list = &mut self.postings[id as usize];
                match list.last_mut() {
                    Some(acc) if acc.post == post => {
                        if acc.hits.len() < hit_cap {
                            acc.hits.push(hit);
                        }
                    }
                    _ => list.push(PostingAccum {
                        post,
                        hits: vec![hit],
                    }),
                }
            }
        }

        Ok(post_id)
    }

    /// Emit lexstr, lexmeta, lexdata, lexhit and the manifest
    pub fn finish(&self, layout: &ArchiveLayout) -> Result<BuildStats> {
        // byte 0 of lexstr stays reserved so no term ever sits at offset 0
        let mut lexstr = vec![0u8];
        let mut str_offsets = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            str_offsets.push(lexstr.len() as u32);
            lexstr.extend_from_slice(term.as_bytes());
            lexstr.push(0);
        }

        let mut lexmeta = Vec::new();
        let mut lexdata = Vec::new();
        let mut lexhit: Vec<u8> = Vec::new();
        let mut posting_count = 0usize;

        for (id, list) in self.postings.iter().enumerate() {
            let meta = TermMeta {
                str_offset: str_offsets[id],
                data_offset: lexdata.len() as u32,
                data_size: list.len() as u32,
            };
            meta.write(&mut lexmeta);
            posting_count += list.len();

            for acc in list {
                let hit_info = if acc.hits.len() <= MAX_INLINE_HITS {
                    let mut packed = (acc.hits.len() as u32) << HIT_COUNT_SHIFT;
                    for (i, hit) in acc.hits.iter().enumerate() {
                        packed |= (*hit as u32) << (i * 8);
                    }
                    packed
                } else {
                    let offset = lexhit.len() as u32;
                    if offset > HIT_OFFSET_MASK {
                        return Err(Error::new(
                            ErrorKind::InvalidInput,
                            "hit spill array exceeds the 29-bit offset space".to_string(),
                        ));
                    }
                    lexhit.push(acc.hits.len() as u8);
                    lexhit.extend_from_slice(&acc.hits);
                    offset
                };

                lexdata.extend_from_slice(&acc.post.to_le_bytes());
                lexdata.extend_from_slice(&hit_info.to_le_bytes());
            }
        }

        fs::write(layout.lexstr_path(), &lexstr)?;
        fs::write(layout.lexmeta_path(), &lexmeta)?;
        fs::write(layout.lexdata_path(), &lexdata)?;
        fs::write(layout.lexhit_path(), &lexhit)?;

        let manifest = Manifest {
            message_count: self.message_count,
            config: self.config.clone(),
        };
        manifest.save(&layout.manifest_path())?;

        Ok(BuildStats {
            messages: self.message_count,
            terms: self.terms.len(),
            postings: posting_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::types::{TERM_META_SIZE, read_u32};

    fn content(text: &str) -> Vec<(HitType, &str)> {
        vec![(HitType::Content, text)]
    }

    #[test]
    fn test_post_ids_are_dense() {
        let mut writer = LexiconWriter::new(LexiconConfig::default());
        assert_eq!(writer.add_message(0, &content("hello world")).unwrap(), 0);
        assert_eq!(writer.add_message(0, &content("hello again")).unwrap(), 1);
    }

    #[test]
    fn test_inline_and_spilled_hits() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path()).unwrap();

        let mut writer = LexiconWriter::new(LexiconConfig::default());
        // "ham" occurs once (inline), "spam" five times (spilled)
        writer
            .add_message(0, &content("ham spam spam spam spam spam"))
            .unwrap();
        let stats = writer.finish(&layout).unwrap();
        assert_eq!(stats.terms, 2);
        assert_eq!(stats.postings, 2);

        let meta_buf = std::fs::read(layout.lexmeta_path()).unwrap();
        let data_buf = std::fs::read(layout.lexdata_path()).unwrap();
        let hit_buf = std::fs::read(layout.lexhit_path()).unwrap();
        assert_eq!(meta_buf.len(), 2 * TERM_META_SIZE);

        // term 0 is "ham": one hit packed inline
        let ham = TermMeta::read(&meta_buf, 0);
        let hit_info = read_u32(&data_buf, ham.data_offset as usize + 4);
        assert_eq!(hit_info >> HIT_COUNT_SHIFT, 1);

        // term 1 is "spam": five hits spilled with a leading count byte
        let spam = TermMeta::read(&meta_buf, 1);
        let hit_info = read_u32(&data_buf, spam.data_offset as usize + 4);
        assert_eq!(hit_info >> HIT_COUNT_SHIFT, 0);
        let offset = (hit_info & HIT_OFFSET_MASK) as usize;
        assert_eq!(hit_buf[offset], 5);
    }

    #[test]
    fn test_child_count_capped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path()).unwrap();

        let mut writer = LexiconWriter::new(LexiconConfig::default());
        writer.add_message(100, &content("hello")).unwrap();
        writer.finish(&layout).unwrap();

        let data_buf = std::fs::read(layout.lexdata_path()).unwrap();
        let post = read_u32(&data_buf, 0);
        assert_eq!(post >> CHILD_SHIFT, CHILD_MAX);
        assert_eq!(post & POST_MASK, 0);
    }

    #[test]
    fn test_string_blob_reserves_byte_zero() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path()).unwrap();

        let mut writer = LexiconWriter::new(LexiconConfig::default());
        writer.add_message(0, &content("hello")).unwrap();
        writer.finish(&layout).unwrap();

        let lexstr = std::fs::read(layout.lexstr_path()).unwrap();
        assert_eq!(lexstr[0], 0);
        assert_eq!(&lexstr[1..6], b"hello");
    }

    #[test]
    fn test_batch_matches_sequential() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let layout_a = ArchiveLayout::new(dir_a.path()).unwrap();
        let layout_b = ArchiveLayout::new(dir_b.path()).unwrap();

        let bodies = ["hello world", "world peace", "hello again world"];

        let mut writer = LexiconWriter::new(LexiconConfig::default());
        for body in &bodies {
            writer.add_message(1, &content(body)).unwrap();
        }
        writer.finish(&layout_a).unwrap();

        let messages: Vec<Message> = bodies
            .iter()
            .map(|body| Message {
                child_count: 1,
                regions: vec![(HitType::Content, *body)],
            })
            .collect();
        let mut writer = LexiconWriter::new(LexiconConfig::default());
        writer.add_batch(&messages).unwrap();
        writer.finish(&layout_b).unwrap();

        for path in ["lexstr", "lexmeta", "lexdata", "lexhit"] {
            let a = std::fs::read(layout_a.base_dir.join(path)).unwrap();
            let b = std::fs::read(layout_b.base_dir.join(path)).unwrap();
            assert_eq!(a, b, "{} differs between batch and sequential", path);
        }
    }
}
