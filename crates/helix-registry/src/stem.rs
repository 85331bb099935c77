//! Suffix-stripping stemmer and Jaccard scoring shared by both registry
//! backends. Grounded on `original_source/builder/wasm_registry.py::_stem`
//! / `_extract_stemmed_keywords` — the container backend's own
//! `search_tool.py` used plain lowercased words with no stemming, but
//! spec.md unifies both backends onto one stemmed matching pipeline, so
//! this module is shared rather than duplicated per backend.

use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "for", "and", "or", "in", "on", "at", "is", "it", "be", "as", "with",
];

const CLASS_KEYWORDS: &[&str] = &["research", "compute", "data", "code", "synthesis", "math", "text"];

/// Longest-match-wins, ordered compound-then-simple suffix table. Never
/// strips below `min_remain` characters. Reproduced exactly from the
/// original so two names that stemmed identically there still do here.
const SUFFIXES: &[(&str, usize)] = &[
    ("ications", 5),
    ("ational", 5),
    ("ations", 5),
    ("ating", 5),
    ("uting", 5),
    ("izing", 5),
    ("ising", 5),
    ("ition", 5),
    ("ation", 5),
    ("ment", 4),
    ("ness", 4),
    ("able", 4),
    ("ible", 4),
    ("ical", 4),
    ("ally", 4),
    ("ting", 4),
    ("ive", 3),
    ("ful", 3),
    ("ous", 3),
    ("ize", 3),
    ("ise", 3),
    ("ate", 3),
    ("ing", 3),
    ("ion", 3),
    ("ed", 2),
    ("er", 2),
    ("ly", 2),
    ("al", 2),
    ("s", 2),
];

/// Strips one suffix (the first matching entry, longest-checked-first in
/// `SUFFIXES`) then, if the word still ends in 'e' and is longer than 4
/// characters, strips that too.
pub fn stem(word: &str) -> String {
    let word = word.to_lowercase();
    let mut stemmed = word.clone();

    for (suffix, min_remain) in SUFFIXES {
        if word.ends_with(suffix) && word.len() - suffix.len() >= *min_remain {
            stemmed = word[..word.len() - suffix.len()].to_string();
            break;
        }
    }

    if stemmed.ends_with('e') && stemmed.len() > 4 {
        stemmed.truncate(stemmed.len() - 1);
    }

    stemmed
}

/// Lower-cases, strips punctuation, drops stop words and tokens of length
/// ≤2, then stems every remaining token.
pub fn stemmed_keywords(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty() && w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .map(|w| stem(&w))
        .collect()
}

/// Jaccard similarity of two already-stemmed keyword sets.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Project-specific prefix every pipeline-built agent is named with
/// (`helix-<class>-<epoch>`); candidates carrying it get a flat bonus
/// since they're a newer generation (spec.md §4.3).
const NAME_PREFIX: &str = "helix-";

/// Base Jaccard score between a query and a candidate's stored task text,
/// plus the class-keyword-match and name-prefix bonuses from spec.md §4.3.
pub fn score_candidate(query: &str, candidate_task: &str, candidate_name: &str) -> f32 {
    let query_keywords = stemmed_keywords(query);
    let candidate_keywords = stemmed_keywords(candidate_task);
    let mut score = jaccard(&query_keywords, &candidate_keywords);

    let query_lower = query.to_lowercase();
    let name_lower = candidate_name.to_lowercase();
    if CLASS_KEYWORDS.iter().any(|kw| query_lower.contains(kw) && name_lower.contains(kw)) {
        score += 0.3;
    }
    if name_lower.starts_with(NAME_PREFIX) {
        score += 0.5;
    }

    score
}
