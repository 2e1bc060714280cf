//! Weighted full-text relevance for catalog search.
//!
//! Uses the same four weight classes as the `plugins.search` column in
//! PostgreSQL: name (A), tags (B), category (C), and description together
//! with author (D).

use schoolhub_entity::plugin::Plugin;

const NAME_WEIGHT: f64 = 10.0;
const TAG_WEIGHT: f64 = 5.0;
const CATEGORY_WEIGHT: f64 = 3.0;
/// Description and author share the lowest class.
const DETAIL_WEIGHT: f64 = 2.0;

/// Terms shorter than this only match whole words.
const MIN_PREFIX_LEN: usize = 3;

/// Split text into lowercase alphanumeric terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Relevance of `plugin` for the already tokenized query `terms`.
///
/// A whole-word hit scores the field weight, a prefix hit half of it.
/// Zero means no match.
pub fn relevance(plugin: &Plugin, terms: &[String]) -> f64 {
    let name = tokenize(&plugin.name);
    let tags: Vec<String> = plugin.tags.iter().flat_map(|t| tokenize(t)).collect();
    let category = tokenize(&plugin.category);
    let details: Vec<String> = tokenize(&plugin.description)
        .into_iter()
        .chain(tokenize(&plugin.author))
        .collect();

    let fields: [(&[String], f64); 4] = [
        (&name, NAME_WEIGHT),
        (&tags, TAG_WEIGHT),
        (&category, CATEGORY_WEIGHT),
        (&details, DETAIL_WEIGHT),
    ];

    terms
        .iter()
        .map(|term| {
            fields
                .iter()
                .map(|(tokens, weight)| field_score(tokens, term) * weight)
                .sum::<f64>()
        })
        .sum()
}

fn field_score(tokens: &[String], term: &str) -> f64 {
    tokens
        .iter()
        .map(|token| {
            if token == term {
                1.0
            } else if term.len() >= MIN_PREFIX_LEN && token.starts_with(term) {
                0.5
            } else {
                0.0
            }
        })
        .sum()
}
