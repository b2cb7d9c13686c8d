/// Behavior switches for one search call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchFlags {
    /// Divide each post's rank by the minimum word distance inside it
    pub adjacent_words: bool,
    /// Only report posts matched by every query word
    pub require_all_words: bool,
    /// Expand non-strict terms through the fuzzy neighbor lists
    pub fuzzy: bool,
    /// Honor the `+`/`-` prefixes on query terms
    pub set_logic: bool,
}

/// Hits reported per result are capped at this many
pub const MAX_HITS_PER_RESULT: usize = 7;

/// One matched post: its rank and up to seven representative hits, each
/// paired with the index of the query word that produced it.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub post_id: u32,
    pub rank: f32,
    pub hits: Vec<u8>,
    pub words: Vec<u32>,
}

/// Ranked results plus every literal that matched, fuzzy expansions
/// included, so a caller can highlight the terms actually used.
#[derive(Debug, Clone, Default)]
pub struct SearchData {
    pub results: Vec<SearchResult>,
    pub matched: Vec<String>,
}
