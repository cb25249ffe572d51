//! Heuristic client-folder matching.
//!
//! Client records come from heterogeneous tables, so the identity fields are
//! looked up through ordered alias tables rather than a fixed schema. The
//! folder scoring is a full scan over the listing, not an index; folder
//! counts per team are small enough that this is fine.

use std::cmp::Reverse;

use serde::Serialize;
use serde_json::{Map, Value};

/// Field aliases for the contracting party's name, in priority order.
pub const NAME_ALIASES: &[&str] = &[
    "nombre_contratante",
    "contratante",
    "asegurado",
    "nombre_completo",
    "nombre",
];

/// Field aliases for the policy number, in priority order.
pub const POLICY_ALIASES: &[&str] = &[
    "numero_poliza",
    "poliza",
    "no_poliza",
    "policy_number",
];

const MIN_WORD_LEN: usize = 3;
const SCORE_EXACT: u32 = 100;
const SCORE_PREFIX: u32 = 50;
const SCORE_SUBSTRING: u32 = 25;

/// First non-empty string value among the aliases.
pub fn first_alias_value<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Candidate search terms for a client record: the full name, its words of
/// three or more characters, and the policy number, deduplicated
/// case-insensitively in that order.
pub fn client_search_terms(record: &Map<String, Value>) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let mut push = |term: &str| {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        if !terms.iter().any(|t| t.eq_ignore_ascii_case(term)) {
            terms.push(term.to_string());
        }
    };

    if let Some(name) = first_alias_value(record, NAME_ALIASES) {
        push(name);
        for word in name.split_whitespace() {
            if word.chars().count() >= MIN_WORD_LEN {
                push(word);
            }
        }
    }
    if let Some(policy) = first_alias_value(record, POLICY_ALIASES) {
        push(policy);
    }
    terms
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScoredFolder {
    pub name: String,
    /// Position in the original folder listing.
    pub index: usize,
    pub score: u32,
}

/// Score folders against search terms. Exact name match (case-insensitive)
/// is worth 100, a prefix match 50, a substring match 25; a folder's score
/// sums over all matching terms. Zero-score folders are dropped and the rest
/// sorted by score descending; the sort is stable, so ties keep their
/// enumeration order.
pub fn score_folders(folder_names: &[String], terms: &[String]) -> Vec<ScoredFolder> {
    let lowered: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    let mut scored: Vec<ScoredFolder> = folder_names
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            let folder = name.to_lowercase();
            let score: u32 = lowered
                .iter()
                .map(|term| {
                    if folder == *term {
                        SCORE_EXACT
                    } else if folder.starts_with(term.as_str()) {
                        SCORE_PREFIX
                    } else if folder.contains(term.as_str()) {
                        SCORE_SUBSTRING
                    } else {
                        0
                    }
                })
                .sum();
            (score > 0).then(|| ScoredFolder {
                name: name.clone(),
                index,
                score,
            })
        })
        .collect();
    scored.sort_by_key(|f| Reverse(f.score));
    scored
}
