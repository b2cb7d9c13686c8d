use newsdex::{
    ArchiveLayout, HitType, Lexicon, LexiconConfig, Message, SearchEngine, SearchFlags,
    build_archive,
};

fn main() -> newsdex::Result<()> {
    let dir = std::env::temp_dir().join("newsdex-demo");
    let layout = ArchiveLayout::new(&dir)?;

    let messages = vec![
        Message {
            child_count: 12,
            regions: vec![
                (HitType::Header, "Re: Which editor for kernel work?"),
                (HitType::Content, "I switched from emacs to vim last year and never looked back."),
            ],
        },
        Message {
            child_count: 0,
            regions: vec![
                (HitType::Header, "Re: Which editor for kernel work?"),
                (HitType::Quote1, "I switched from emacs to vim last year"),
                (HitType::Content, "Same here, vim all the way."),
                (HitType::Signature, "sent from my vt220"),
            ],
        },
        Message {
            child_count: 3,
            regions: vec![
                (HitType::Header, "emacs lisp question"),
                (HitType::Content, "How do I bind a key to a custom function in emacs?"),
            ],
        },
    ];

    build_archive(&layout, LexiconConfig::default(), &messages)?;

    let lexicon = Lexicon::open(&layout)?;
    let engine = SearchEngine::new(&lexicon);

    let flags = SearchFlags {
        adjacent_words: true,
        fuzzy: true,
        ..Default::default()
    };
    let data = engine.search("emacs vim", flags, None);

    println!("matched terms: {:?}", data.matched);
    for result in &data.results {
        println!(
            "post {:>3}  rank {:.4}  hits {:?}",
            result.post_id, result.rank, result.hits
        );
    }

    Ok(())
}
