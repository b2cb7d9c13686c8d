use std::collections::HashSet;

use crate::analysis::tokenizer::WordTokenizer;
use crate::lexicon::files::{Lexicon, PostingView};
use crate::lexicon::hit::{HitType, decode_type, hit_rank, rank_cmp};
use crate::lexicon::types::{CHILD_MAX, DIST_MOD, TermId};
use crate::query::parser::{QueryTerm, WordFlags, parse_query};
use crate::search::results::{MAX_HITS_PER_RESULT, SearchData, SearchFlags, SearchResult};
use crate::search::word_distance::{UNKNOWN_DISTANCE, word_distance};

/// Query-time engine over an opened lexicon. Stateless beyond the borrow;
/// one search runs on one thread, and the ranker's scratch is thread-local,
/// so engines can be shared freely across threads.
pub struct SearchEngine<'a> {
    lexicon: &'a Lexicon,
}

/// Resolved query words: term ids with their parse flags, fuzzy rank
/// modifiers and the literals that matched.
struct WordList {
    ids: Vec<TermId>,
    flags: Vec<WordFlags>,
    mods: Vec<f32>,
    matched: Vec<String>,
}

impl<'a> SearchEngine<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        SearchEngine { lexicon }
    }

    /// Parse and run a query. `filter` restricts matches to posts carrying
    /// at least one hit of the given type.
    pub fn search(&self, query: &str, flags: SearchFlags, filter: Option<HitType>) -> SearchData {
        let flags = self.fixup_flags(flags);
        let terms = parse_query(query, flags);
        self.run(&terms, flags, filter)
    }

    /// Run a query whose terms were already split by the caller
    pub fn search_terms(
        &self,
        terms: &[QueryTerm],
        flags: SearchFlags,
        filter: Option<HitType>,
    ) -> SearchData {
        let flags = self.fixup_flags(flags);
        self.run(terms, flags, filter)
    }

    /// Fuzzy search needs the neighbor files and falsifies a conjunction
    /// over expanded terms; a conjunction in turn ignores set-logic.
    fn fixup_flags(&self, mut flags: SearchFlags) -> SearchFlags {
        if flags.fuzzy {
            if self.lexicon.has_distance_data() {
                flags.require_all_words = false;
            } else {
                flags.fuzzy = false;
            }
        }
        if flags.require_all_words {
            flags.set_logic = false;
        }
        flags
    }

    fn run(&self, terms: &[QueryTerm], flags: SearchFlags, filter: Option<HitType>) -> SearchData {
        let Some(words) = self.extract_words(terms, flags) else {
            return SearchData::default();
        };
        if words.ids.len() == 1 && words.flags[0].cant {
            return SearchData::default();
        }

        let wdata = self.posts_for_words(&words, filter);

        let mut results = if wdata.len() == 1 {
            self.single_word_results(&wdata)
        } else if flags.require_all_words {
            self.all_word_results(&wdata, flags)
        } else {
            self.full_results(&wdata, &words, flags)
        };

        if results.is_empty() {
            return SearchData::default();
        }

        results.sort_by(|l, r| {
            r.rank
                .partial_cmp(&l.rank)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        SearchData {
            results,
            matched: words.matched,
        }
    }

    /// Resolve parsed terms against the term hash, expanding non-strict
    /// words through their fuzzy neighborhoods. Each term id enters the
    /// working set at most once; unknown terms are silently dropped.
    fn extract_words(&self, terms: &[QueryTerm], flags: SearchFlags) -> Option<WordList> {
        let tokenizer = WordTokenizer::new(self.lexicon.config());
        let mut words = WordList {
            ids: Vec::with_capacity(terms.len()),
            flags: Vec::with_capacity(terms.len()),
            mods: Vec::with_capacity(terms.len()),
            matched: Vec::with_capacity(terms.len()),
        };
        let mut seen: HashSet<TermId> = HashSet::new();

        for term in terms {
            let Some(text) = tokenizer.normalize(&term.text) else {
                continue;
            };
            let Some(id) = self.lexicon.term_id(&text) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }

            words.ids.push(id);
            words.flags.push(term.flags);
            words.mods.push(1.0);
            words
                .matched
                .push(self.lexicon.term_str(self.lexicon.term_meta(id).str_offset).to_string());

            if flags.fuzzy && !term.strict && !term.flags.must && !term.flags.cant {
                let Some(dist) = self.lexicon.distance() else {
                    continue;
                };
                for neighbor in dist.neighbors(id) {
                    let word = self.lexicon.term_str(neighbor.str_offset);
                    let Some(id) = self.lexicon.term_id(word) else {
                        continue;
                    };
                    if !seen.insert(id) {
                        continue;
                    }
                    words.ids.push(id);
                    words.flags.push(term.flags);
                    words.mods.push(DIST_MOD[neighbor.distance as usize]);
                    words.matched.push(word.to_string());
                }
            }
        }

        if words.ids.is_empty() { None } else { Some(words) }
    }

    /// Gather each word's posting views, keeping only posts that pass the
    /// type filter or, for `hdr:` words, posts with at least one header hit.
    fn posts_for_words(
        &self,
        words: &WordList,
        filter: Option<HitType>,
    ) -> Vec<Vec<PostingView<'a>>> {
        let mut wdata = Vec::with_capacity(words.ids.len());

        for (w, &id) in words.ids.iter().enumerate() {
            let meta = self.lexicon.term_meta(id);
            let mut views = Vec::with_capacity(meta.data_size as usize);

            for view in self.lexicon.postings(&meta) {
                let keep = if let Some(kind) = filter {
                    view.hits.iter().any(|&h| decode_type(h) == kind)
                } else if words.flags[w].header {
                    view.hits.iter().any(|&h| decode_type(h) == HitType::Header)
                } else {
                    true
                };
                if keep {
                    views.push(view);
                }
            }
            wdata.push(views);
        }

        wdata
    }

    fn single_word_results(&self, wdata: &[Vec<PostingView>]) -> Vec<SearchResult> {
        let mut results = Vec::with_capacity(wdata[0].len());
        for view in &wdata[0] {
            // hits are rank-sorted by the build, so a prefix is the top ones
            let n = view.hits.len().min(MAX_HITS_PER_RESULT);
            results.push(SearchResult {
                post_id: view.post_id,
                rank: post_rank(view) * top_hit_rank(view),
                hits: view.hits[..n].to_vec(),
                words: vec![0; n],
            });
        }
        results
    }

    /// AND join: walk the first word's postings and require every other
    /// word's sorted list to contain the same post. Results are rank-only;
    /// this path feeds thread assembly, which ignores hit data.
    fn all_word_results(
        &self,
        wdata: &[Vec<PostingView>],
        flags: SearchFlags,
    ) -> Vec<SearchResult> {
        let mut results = Vec::with_capacity(wdata[0].len());
        let mut list: Vec<&PostingView> = Vec::with_capacity(wdata.len());

        for post in &wdata[0] {
            list.clear();
            let mut ok = true;
            for other in &wdata[1..] {
                match other.binary_search_by_key(&post.post_id, |v| v.post_id) {
                    Ok(idx) => list.push(&other[idx]),
                    Err(_) => {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok {
                continue;
            }
            list.push(post);

            let mut rank: f32 = list.iter().map(|v| top_hit_rank(v)).sum();
            if flags.adjacent_words {
                if list.len() != 1 {
                    rank /= word_distance(&list) as f32;
                } else {
                    rank /= UNKNOWN_DISTANCE as f32;
                }
            }

            results.push(SearchResult {
                post_id: post.post_id,
                rank: rank * post_rank(post),
                hits: Vec::new(),
                words: Vec::new(),
            });
        }

        results
    }

    /// Full join: bucket every word's postings by post id through a scratch
    /// table sized to the archive, then rank each post over the words that
    /// hit it and pick its representative hits.
    fn full_results(
        &self,
        wdata: &[Vec<PostingView<'a>>],
        words: &WordList,
        flags: SearchFlags,
    ) -> Vec<SearchResult> {
        struct Bucket<'v> {
            post_id: u32,
            entries: Vec<(u32, PostingView<'v>)>,
        }

        let mut index = vec![-1i32; self.lexicon.message_count() as usize];
        let mut buckets: Vec<Bucket> = Vec::new();

        for (word, views) in wdata.iter().enumerate() {
            for view in views {
                let slot = match index[view.post_id as usize] {
                    -1 => {
                        index[view.post_id as usize] = buckets.len() as i32;
                        buckets.push(Bucket {
                            post_id: view.post_id,
                            entries: Vec::new(),
                        });
                        buckets.len() - 1
                    }
                    s => s as usize,
                };
                buckets[slot].entries.push((word as u32, *view));
            }
        }

        let must_words: Vec<u32> = words
            .flags
            .iter()
            .enumerate()
            .filter(|(_, f)| f.must)
            .map(|(w, _)| w as u32)
            .collect();

        let mut results = Vec::with_capacity(buckets.len());
        let mut hits: Vec<u8> = Vec::new();
        let mut wordlist: Vec<u32> = Vec::new();
        let mut list: Vec<&PostingView> = Vec::new();

        for bucket in &buckets {
            // set logic: drop posts containing an excluded word or missing
            // a required one
            if bucket.entries.iter().any(|(w, _)| words.flags[*w as usize].cant) {
                continue;
            }
            if must_words.iter().any(|m| !bucket.entries.iter().any(|(w, _)| w == m)) {
                continue;
            }

            hits.clear();
            wordlist.clear();

            let mut rank = 0.0f32;
            for (word, view) in &bucket.entries {
                rank += top_hit_rank(view) * words.mods[*word as usize];
                for &hit in view.hits {
                    wordlist.push(*word);
                    hits.push(hit);
                }
            }

            if flags.adjacent_words {
                if bucket.entries.len() != 1 {
                    list.clear();
                    list.extend(bucket.entries.iter().map(|(_, view)| view));
                    rank /= word_distance(&list) as f32;
                } else {
                    rank /= UNKNOWN_DISTANCE as f32;
                }
            }

            let mut order: Vec<u32> = (0..hits.len() as u32).collect();
            if order.len() > 1 {
                order.sort_by(|&l, &r| rank_cmp(hits[l as usize], hits[r as usize]));
            }

            let n = hits.len().min(MAX_HITS_PER_RESULT);
            let mut out_hits = Vec::with_capacity(n);
            let mut out_words = Vec::with_capacity(n);
            for &i in &order[..n] {
                out_hits.push(hits[i as usize]);
                out_words.push(wordlist[i as usize]);
            }

            results.push(SearchResult {
                post_id: bucket.post_id,
                rank: rank * post_rank(&bucket.entries[0].1),
                hits: out_hits,
                words: out_words,
            });
        }

        results
    }
}

/// Rank of a post under one word: the rank of its strongest hit, which the
/// sort stage placed first.
fn top_hit_rank(view: &PostingView) -> f32 {
    hit_rank(view.hits[0])
}

/// Thread salience of the post itself, from its reply-child count
fn post_rank(view: &PostingView) -> f32 {
    (view.children as f32 / CHILD_MAX as f32) * 0.9 + 0.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_archive;
    use crate::build::hasher::build_hash;
    use crate::build::optimizer::optimize_strings;
    use crate::build::sorter::sort_postings;
    use crate::build::writer::{LexiconWriter, Message};
    use crate::core::config::LexiconConfig;
    use crate::lexicon::hit::encode_hit;
    use crate::storage::layout::ArchiveLayout;

    fn content(text: &str) -> Message<'_> {
        Message {
            child_count: 0,
            regions: vec![(HitType::Content, text)],
        }
    }

    fn archive(messages: Vec<Message>) -> (tempfile::TempDir, Lexicon) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path()).unwrap();
        build_archive(&layout, LexiconConfig::default(), &messages).unwrap();
        let lexicon = Lexicon::open(&layout).unwrap();
        (dir, lexicon)
    }

    /// Same pipeline minus the distance stage, so fuzzy data is absent
    fn archive_without_distance(messages: Vec<Message>) -> (tempfile::TempDir, Lexicon) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArchiveLayout::new(dir.path()).unwrap();
        let mut writer = LexiconWriter::new(LexiconConfig::default());
        writer.add_batch(&messages).unwrap();
        writer.finish(&layout).unwrap();
        optimize_strings(&layout).unwrap();
        sort_postings(&layout).unwrap();
        build_hash(&layout).unwrap();
        let lexicon = Lexicon::open(&layout).unwrap();
        (dir, lexicon)
    }

    #[test]
    fn test_single_content_hit() {
        let (_dir, lexicon) = archive(vec![content("hello world")]);
        let engine = SearchEngine::new(&lexicon);

        let data = engine.search("hello", SearchFlags::default(), None);
        assert_eq!(data.matched, vec!["hello"]);
        assert_eq!(data.results.len(), 1);

        let result = &data.results[0];
        assert_eq!(result.post_id, 0);
        assert_eq!(result.hits, vec![0x00]);
        // full content weight at position 0 times the floor post rank
        assert!((result.rank - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_empty_and_unknown_queries() {
        let (_dir, lexicon) = archive(vec![content("hello world")]);
        let engine = SearchEngine::new(&lexicon);

        assert!(engine.search("", SearchFlags::default(), None).results.is_empty());
        assert!(engine.search("zzzzz", SearchFlags::default(), None).results.is_empty());
        // too short to ever be a term
        assert!(engine.search("ab", SearchFlags::default(), None).results.is_empty());
    }

    #[test]
    fn test_query_normalization_matches_index() {
        let (_dir, lexicon) = archive(vec![content("Hello __World__")]);
        let engine = SearchEngine::new(&lexicon);

        assert_eq!(engine.search("HELLO", SearchFlags::default(), None).results.len(), 1);
        assert_eq!(engine.search("__world__", SearchFlags::default(), None).results.len(), 1);
        assert_eq!(engine.search("world", SearchFlags::default(), None).results.len(), 1);
    }

    #[test]
    fn test_require_all_words() {
        let (_dir, lexicon) = archive(vec![content("hello world"), content("hello again")]);
        let engine = SearchEngine::new(&lexicon);

        let flags = SearchFlags {
            require_all_words: true,
            ..Default::default()
        };
        let data = engine.search("hello world", flags, None);
        assert_eq!(data.results.len(), 1);
        assert_eq!(data.results[0].post_id, 0);
        // rank-only path carries no hit data
        assert!(data.results[0].hits.is_empty());
    }

    #[test]
    fn test_set_logic_exclusion() {
        let (_dir, lexicon) = archive(vec![content("spam ham"), content("ham sandwich")]);
        let engine = SearchEngine::new(&lexicon);

        let flags = SearchFlags {
            set_logic: true,
            ..Default::default()
        };
        let data = engine.search("ham -spam", flags, None);
        assert_eq!(data.results.len(), 1);
        assert_eq!(data.results[0].post_id, 1);
    }

    #[test]
    fn test_set_logic_must() {
        let (_dir, lexicon) = archive(vec![content("linux kernel"), content("kernel panic")]);
        let engine = SearchEngine::new(&lexicon);

        let flags = SearchFlags {
            set_logic: true,
            ..Default::default()
        };
        let data = engine.search("kernel +linux", flags, None);
        assert_eq!(data.results.len(), 1);
        assert_eq!(data.results[0].post_id, 0);
    }

    #[test]
    fn test_single_cant_term_is_empty() {
        let (_dir, lexicon) = archive(vec![content("spam ham")]);
        let engine = SearchEngine::new(&lexicon);

        let flags = SearchFlags {
            set_logic: true,
            ..Default::default()
        };
        let data = engine.search("-spam", flags, None);
        assert!(data.results.is_empty());
        assert!(data.matched.is_empty());
    }

    #[test]
    fn test_header_filter() {
        let (_dir, lexicon) = archive(vec![
            Message {
                child_count: 0,
                regions: vec![
                    (HitType::Header, "linux kernel news"),
                    (HitType::Content, "body text here"),
                ],
            },
            Message {
                child_count: 0,
                regions: vec![(HitType::Content, "linux rocks")],
            },
        ]);
        let engine = SearchEngine::new(&lexicon);

        let data = engine.search("hdr:linux", SearchFlags::default(), None);
        assert_eq!(data.results.len(), 1);
        assert_eq!(data.results[0].post_id, 0);

        // without the modifier both posts match
        let data = engine.search("linux", SearchFlags::default(), None);
        assert_eq!(data.results.len(), 2);
    }

    #[test]
    fn test_type_filter() {
        let (_dir, lexicon) = archive(vec![
            Message {
                child_count: 0,
                regions: vec![(HitType::Signature, "linux fan club")],
            },
            Message {
                child_count: 0,
                regions: vec![(HitType::Content, "linux things")],
            },
        ]);
        let engine = SearchEngine::new(&lexicon);

        let data = engine.search("linux", SearchFlags::default(), Some(HitType::Signature));
        assert_eq!(data.results.len(), 1);
        assert_eq!(data.results[0].post_id, 0);
    }

    #[test]
    fn test_adjacency_ranks_closer_words_higher() {
        let (_dir, lexicon) = archive(vec![
            content("hello world"),
            content("hello one two three four world"),
        ]);
        let engine = SearchEngine::new(&lexicon);

        let flags = SearchFlags {
            adjacent_words: true,
            ..Default::default()
        };
        let data = engine.search("hello world", flags, None);
        assert_eq!(data.results.len(), 2);
        assert_eq!(data.results[0].post_id, 0);
        assert!(data.results[0].rank > data.results[1].rank);

        // adjacent pair short-circuits to distance 1, distant pair divides by 5
        let close = (1.0 + hit_rank(encode_hit(HitType::Content, 1))) * 0.1;
        let far = (1.0 + hit_rank(encode_hit(HitType::Content, 5))) / 5.0 * 0.1;
        assert!((data.results[0].rank - close).abs() < 1e-6);
        assert!((data.results[1].rank - far).abs() < 1e-6);
    }

    #[test]
    fn test_lone_word_gets_flat_adjacency_penalty() {
        let (_dir, lexicon) = archive(vec![content("hello world"), content("hello elsewhere")]);
        let engine = SearchEngine::new(&lexicon);

        let flags = SearchFlags {
            adjacent_words: true,
            ..Default::default()
        };
        let data = engine.search("hello world", flags, None);
        assert_eq!(data.results.len(), 2);

        let lone = data.results.iter().find(|r| r.post_id == 1).unwrap();
        assert!((lone.rank - 1.0 / 127.0 * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_fuzzy_expansion() {
        let (_dir, lexicon) = archive(vec![content("color printing"), content("colour printing")]);
        let engine = SearchEngine::new(&lexicon);

        let flags = SearchFlags {
            fuzzy: true,
            ..Default::default()
        };
        let data = engine.search("color", flags, None);
        assert!(data.matched.contains(&"color".to_string()));
        assert!(data.matched.contains(&"colour".to_string()));
        assert_eq!(data.results.len(), 2);

        // the exact match outranks the distance-1 expansion, which is
        // scaled by 0.5
        assert_eq!(data.results[0].post_id, 0);
        assert!((data.results[0].rank - 0.1).abs() < 1e-6);
        assert_eq!(data.results[1].post_id, 1);
        assert!((data.results[1].rank - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_quoted_term_skips_fuzzy() {
        let (_dir, lexicon) = archive(vec![content("color printing"), content("colour printing")]);
        let engine = SearchEngine::new(&lexicon);

        let flags = SearchFlags {
            fuzzy: true,
            ..Default::default()
        };
        let data = engine.search("\"color\"", flags, None);
        assert_eq!(data.matched, vec!["color"]);
        assert_eq!(data.results.len(), 1);
        assert_eq!(data.results[0].post_id, 0);
    }

    #[test]
    fn test_fuzzy_without_distance_files() {
        let (_dir, lexicon) =
            archive_without_distance(vec![content("color printing"), content("colour printing")]);
        assert!(!lexicon.has_distance_data());
        let engine = SearchEngine::new(&lexicon);

        // the flag is silently cleared; only the exact term matches
        let flags = SearchFlags {
            fuzzy: true,
            ..Default::default()
        };
        let data = engine.search("color", flags, None);
        assert_eq!(data.matched, vec!["color"]);
        assert_eq!(data.results.len(), 1);
    }

    #[test]
    fn test_fuzzy_disables_require_all_words() {
        let (_dir, lexicon) = archive(vec![content("color printing"), content("colour printing")]);
        let engine = SearchEngine::new(&lexicon);

        let flags = SearchFlags {
            fuzzy: true,
            require_all_words: true,
            ..Default::default()
        };
        // a conjunction over expanded terms would reject both posts; the
        // fixup drops it, so both still match
        let data = engine.search("color printing", flags, None);
        assert_eq!(data.results.len(), 2);
    }

    #[test]
    fn test_child_count_raises_post_rank() {
        let (_dir, lexicon) = archive(vec![
            content("hello there"),
            Message {
                child_count: 31,
                regions: vec![(HitType::Content, "hello there")],
            },
        ]);
        let engine = SearchEngine::new(&lexicon);

        let data = engine.search("hello", SearchFlags::default(), None);
        assert_eq!(data.results.len(), 2);
        assert_eq!(data.results[0].post_id, 1);
        assert!((data.results[0].rank - 1.0).abs() < 1e-6);
        assert!((data.results[1].rank - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_hits_capped_at_seven() {
        let body = "spam ".repeat(10) + "eggs";
        let (_dir, lexicon) = archive(vec![content(&body)]);
        let engine = SearchEngine::new(&lexicon);

        let data = engine.search("spam eggs", SearchFlags::default(), None);
        assert_eq!(data.results.len(), 1);
        let result = &data.results[0];
        assert_eq!(result.hits.len(), MAX_HITS_PER_RESULT);
        assert_eq!(result.words.len(), MAX_HITS_PER_RESULT);
        // representative hits come out strongest-first
        for pair in result.hits.windows(2) {
            assert!(hit_rank(pair[0]) >= hit_rank(pair[1]));
        }
    }

    #[test]
    fn test_term_lookup_round_trip_after_optimization() {
        // "dexing" and "xing" share storage inside "indexing"
        let (_dir, lexicon) = archive(vec![
            content("indexing dexing xing"),
            content("archive search engine"),
        ]);

        for id in 0..lexicon.num_terms() {
            let meta = lexicon.term_meta(id);
            let term = lexicon.term_str(meta.str_offset);
            assert_eq!(lexicon.term_id(term), Some(id), "{}", term);
        }
    }
}
