use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use newsdex::{
    ArchiveLayout, HitType, Lexicon, LexiconConfig, Message, SearchEngine, SearchFlags,
    build_archive,
};

const WORD_POOL: &[&str] = &[
    "linux", "kernel", "emacs", "vim", "usenet", "archive", "thread", "posting", "flame",
    "signature", "newsgroup", "moderator", "crosspost", "killfile", "trolling", "compile",
    "segfault", "patch", "release", "banner", "window", "manager", "driver", "modem",
    "ethernet", "protocol", "header", "quote", "reply", "digest",
];

fn synth_body(rng: &mut StdRng) -> String {
    let len = rng.gen_range(10..60);
    (0..len)
        .map(|_| WORD_POOL[rng.gen_range(0..WORD_POOL.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_corpus(messages: usize) -> (TempDir, Lexicon) {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let bodies: Vec<(u32, String, String)> = (0..messages)
        .map(|_| {
            (
                rng.gen_range(0..32),
                synth_body(&mut rng),
                format!("Re: {}", synth_body(&mut rng)),
            )
        })
        .collect();

    let dir = tempfile::tempdir().unwrap();
    let layout = ArchiveLayout::new(dir.path()).unwrap();
    let msgs: Vec<Message> = bodies
        .iter()
        .map(|(children, body, subject)| Message {
            child_count: *children,
            regions: vec![
                (HitType::Header, subject.as_str()),
                (HitType::Content, body.as_str()),
            ],
        })
        .collect();
    build_archive(&layout, LexiconConfig::default(), &msgs).unwrap();

    let lexicon = Lexicon::open(&layout).unwrap();
    (dir, lexicon)
}

fn search_benchmark(c: &mut Criterion) {
    let (_dir, lexicon) = build_corpus(2000);
    let engine = SearchEngine::new(&lexicon);

    c.bench_function("search single word", |b| {
        b.iter(|| engine.search(black_box("linux"), SearchFlags::default(), None))
    });

    c.bench_function("search two words adjacent", |b| {
        let flags = SearchFlags {
            adjacent_words: true,
            ..Default::default()
        };
        b.iter(|| engine.search(black_box("linux kernel"), flags, None))
    });

    c.bench_function("search fuzzy", |b| {
        let flags = SearchFlags {
            fuzzy: true,
            ..Default::default()
        };
        b.iter(|| engine.search(black_box("kernel banner"), flags, None))
    });

    c.bench_function("search require all words", |b| {
        let flags = SearchFlags {
            require_all_words: true,
            ..Default::default()
        };
        b.iter(|| engine.search(black_box("emacs vim thread"), flags, None))
    });
}

criterion_group!(benches, search_benchmark);
criterion_main!(benches);
