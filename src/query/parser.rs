use crate::search::results::SearchFlags;

/// Per-word modifier flags extracted by the parser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordFlags {
    pub must: bool,
    pub cant: bool,
    pub header: bool,
}

/// One parsed query term; `strict` terms opt out of fuzzy expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub text: String,
    pub flags: WordFlags,
    pub strict: bool,
}

/// Split a query on whitespace and strip the set-logic, header and phrase
/// modifiers from each token. Phrases are not reassembled; a quoted token
/// simply becomes a strict term.
pub fn parse_query(query: &str, flags: SearchFlags) -> Vec<QueryTerm> {
    let mut terms = Vec::new();

    for token in query.split_whitespace() {
        let mut rest = token;
        let mut word_flags = WordFlags::default();
        let mut strict = false;

        if flags.set_logic && rest.len() > 1 {
            if let Some(stripped) = rest.strip_prefix('+') {
                word_flags.must = true;
                strict = true;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix('-') {
                word_flags.cant = true;
                strict = true;
                rest = stripped;
            }
        }
        if rest.len() > 4 {
            if let Some(stripped) = rest.strip_prefix("hdr:") {
                word_flags.header = true;
                rest = stripped;
            }
        }
        if rest.len() > 2 && rest.starts_with('"') && rest.ends_with('"') {
            rest = &rest[1..rest.len() - 1];
            strict = true;
        }

        if !rest.is_empty() {
            terms.push(QueryTerm {
                text: rest.to_string(),
                flags: word_flags,
                strict,
            });
        }
    }

    terms
}
