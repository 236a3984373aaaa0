//! Free-text query parsing and result snippets.
//!
//! User input is never interpreted as a query language. Text is split into
//! the same tokens the indexer produces; every other character is a plain
//! separator, so quotes, colons, wildcards inside words and other punctuation
//! cannot make a search fail.

use regex::Regex;

use crate::error::SearchError;
use crate::{tokenize, DEFAULT_MIN_TOKEN_LEN};

/// The wildcard token requesting every document.
pub const MATCH_ALL: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Every document, unranked
    MatchAll,
    /// OR of distinct lowercase terms, ranked by relevance
    Terms(Vec<String>),
}

/// True for the empty query and the bare wildcard.
pub fn is_match_all(text: &str) -> bool {
    let t = text.trim();
    t.is_empty() || t == MATCH_ALL
}

/// Parse raw user text.
///
/// Returns [`SearchError::QueryParse`] when the text is neither match-all nor
/// contains a single searchable token (e.g. `"?!"`).
pub fn parse_query(text: &str) -> Result<Query, SearchError> {
    if is_match_all(text) {
        return Ok(Query::MatchAll);
    }
    let mut terms: Vec<String> = Vec::new();
    for token in tokenize(text, DEFAULT_MIN_TOKEN_LEN) {
        if !terms.contains(&token) {
            terms.push(token);
        }
    }
    if terms.is_empty() {
        return Err(SearchError::QueryParse { query: text.to_string() });
    }
    Ok(Query::Terms(terms))
}

/// Excerpt of `text` around the first whole-word query match, with the match in `[...]`.
///
/// Whitespace (OCR line breaks) is collapsed. `width` is the number of context
/// characters kept on both sides combined. For match-all, the leading `width`
/// characters are returned. `None` when nothing matches or the text is blank.
pub fn snippet(text: &str, query: &Query, width: usize) -> Option<String> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return None;
    }

    let terms = match query {
        Query::MatchAll => {
            let head: String = flat.chars().take(width).collect();
            let more = head.len() < flat.len();
            return Some(if more { format!("{}…", head) } else { head });
        }
        Query::Terms(terms) => terms,
    };

    let alternation = terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    let re = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).ok()?;
    let m = re.find(&flat)?;

    let half = width / 2;
    let start = if half == 0 {
        m.start()
    } else {
        flat[..m.start()]
            .char_indices()
            .rev()
            .nth(half - 1)
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let end = flat[m.end()..]
        .char_indices()
        .nth(half)
        .map(|(i, _)| m.end() + i)
        .unwrap_or(flat.len());

    Some(format!(
        "{}{}[{}]{}{}",
        if start > 0 { "…" } else { "" },
        &flat[start..m.start()],
        m.as_str(),
        &flat[m.end()..end],
        if end < flat.len() { "…" } else { "" },
    ))
}
