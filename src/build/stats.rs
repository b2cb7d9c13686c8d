use crate::lexicon::files::Lexicon;

/// Per-term occurrence totals for corpus inspection
#[derive(Debug, Clone)]
pub struct TermStats {
    pub term: String,
    pub posts: u32,
    pub hits: u64,
}

/// Collect hit totals for every term, heaviest first
pub fn term_stats(lexicon: &Lexicon) -> Vec<TermStats> {
    let mut stats = Vec::with_capacity(lexicon.num_terms() as usize);
    for id in 0..lexicon.num_terms() {
        let meta = lexicon.term_meta(id);
        let hits = lexicon
            .postings(&meta)
            .map(|view| view.hits.len() as u64)
            .sum();
        stats.push(TermStats {
            term: lexicon.term_str(meta.str_offset).to_string(),
            posts: meta.data_size,
            hits,
        });
    }
    stats.sort_by(|l, r| r.hits.cmp(&l.hits));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_archive;
    use crate::build::writer::Message;
    use crate::core::config::LexiconConfig;
    use crate::lexicon::hit::HitType;
    use crate::storage::layout::ArchiveLayout;

    #[test]
    fn test_totals_sorted_descending() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path()).unwrap();

        let messages = vec![
            Message {
                child_count: 0,
                regions: vec![(HitType::Content, "linux linux linux kernel")],
            },
            Message {
                child_count: 0,
                regions: vec![(HitType::Content, "linux kernel")],
            },
        ];
        build_archive(&layout, LexiconConfig::default(), &messages).unwrap();

        let lexicon = Lexicon::open(&layout).unwrap();
        let stats = term_stats(&lexicon);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].term, "linux");
        assert_eq!(stats[0].posts, 2);
        assert_eq!(stats[0].hits, 4);
        assert_eq!(stats[1].term, "kernel");
        assert_eq!(stats[1].hits, 2);
    }
}
