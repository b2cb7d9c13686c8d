pub mod analysis;
pub mod build;
pub mod core;
pub mod lexicon;
pub mod mmap;
pub mod parallel;
pub mod query;
pub mod search;
pub mod storage;

/*
┌──────────────────────────────── NEWSDEX ARCHITECTURE ────────────────────────────────┐
│                                                                                      │
│  BUILD (write once)                                                                  │
│    LexiconWriter ── tokenize (analysis::tokenizer) ── accumulate postings            │
│         │                                                                            │
│         ▼  emit lexstr / lexmeta / lexdata / lexhit + manifest                       │
│    optimize_strings ── share term-string suffixes, rewrite offsets                   │
│    sort_postings    ── postings by post id, hit streams by descending rank           │
│    build_hash       ── lexhash / lexhashdata (crc32, 0.75 load factor)               │
│    build_distance   ── lexdist / lexdistmeta (Levenshtein ≤ 2, TaskDispatch pool)    │
│                                                                                      │
│  QUERY (read many)                                                                   │
│    Lexicon ── memory-mapped read surface + shared archive lock                       │
│         │                                                                            │
│    SearchEngine::search(query, flags, filter)                                        │
│         parse ── resolve (TermHash, fuzzy neighbors) ── join postings                │
│         ── rank (hit rank × fuzzy mod ÷ word distance × post rank) ── top-7 hits     │
│                                                                                      │
└──────────────────────────────────────────────────────────────────────────────────────┘
*/

pub use crate::build::build_archive;
pub use crate::build::writer::{LexiconWriter, Message};
pub use crate::core::config::{LexiconConfig, Manifest};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::lexicon::files::Lexicon;
pub use crate::lexicon::hit::HitType;
pub use crate::search::engine::SearchEngine;
pub use crate::search::results::{SearchData, SearchFlags, SearchResult};
pub use crate::storage::layout::ArchiveLayout;
