//! Keyword search scoring.
//!
//! A deliberately simple utility: tokenize the query, expand through a small
//! synonym table, and score weighted field matches (title over category over
//! slug). The ranked list drops zero-score items; ties keep the caller's
//! ordering, so feeding candidates newest-first keeps recency as the
//! tie-break.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[a-z0-9']+").unwrap();
    static ref SYNONYMS: HashMap<&'static str, &'static [&'static str]> = {
        let mut map: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        map.insert("taco", &["taco", "tacos", "mexican"]);
        map.insert("barber", &["barber", "barbershop", "fade", "hair"]);
        map.insert("coffee", &["coffee", "cafe", "espresso"]);
        map.insert("tea", &["tea", "teahouse"]);
        map.insert("juice", &["juice", "smoothie"]);
        map.insert("restaurant", &["restaurant", "food", "dining"]);
        map.insert("news", &["news", "headlines", "stories"]);
        map.insert("event", &["event", "events", "festival"]);
        map
    };
}

fn tokens(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Query terms plus their synonyms. A term anywhere in a synonym group
/// pulls in the whole group, so "tacos" finds "taco" and vice versa.
fn expand_terms(query: &str) -> HashSet<String> {
    let mut expanded = HashSet::new();
    for term in tokens(query) {
        let group = SYNONYMS
            .values()
            .find(|members| members.contains(&term.as_str()));
        match group {
            Some(members) => expanded.extend(members.iter().map(|s| s.to_string())),
            None => {
                expanded.insert(term);
            }
        }
    }
    expanded
}

/// The searchable text of one candidate.
#[derive(Debug, Clone)]
pub struct SearchFields {
    pub title: String,
    pub slug: String,
    pub category: String,
}

fn score(fields: &SearchFields, terms: &HashSet<String>) -> u32 {
    let title = tokens(&fields.title).join(" ");
    let category = tokens(&fields.category).join(" ");
    let slug = tokens(&fields.slug).join(" ");

    let mut total = 0;
    for term in terms {
        if title.contains(term.as_str()) {
            total += 3;
        }
        if category.contains(term.as_str()) {
            total += 2;
        }
        if slug.contains(term.as_str()) {
            total += 1;
        }
    }
    total
}

/// Rank candidates against a free-text query; zero-score items are dropped.
/// An empty query returns nothing.
pub fn rank<T>(query: &str, items: Vec<T>, fields_of: impl Fn(&T) -> SearchFields) -> Vec<T> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let terms = expand_terms(query);

    let mut scored: Vec<(u32, T)> = items
        .into_iter()
        .filter_map(|item| {
            let s = score(&fields_of(&item), &terms);
            (s > 0).then_some((s, item))
        })
        .collect();

    // Stable: equal scores keep the input order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str, slug: &str, category: &str) -> SearchFields {
        SearchFields {
            title: title.to_string(),
            slug: slug.to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let items = vec![doc("Anything", "anything", "News")];
        assert!(rank("  ", items, |f| f.clone()).is_empty());
    }

    #[test]
    fn test_title_outranks_slug() {
        let items = vec![
            doc("Morning roundup", "coffee-shops-guide", "Food"),
            doc("Best coffee in town", "morning-roundup", "Food"),
        ];
        let ranked = rank("coffee", items, |f| f.clone());
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].title, "Best coffee in town");
    }

    #[test]
    fn test_synonyms_expand() {
        let items = vec![doc("New cafe opens on Edgewood", "new-cafe-edgewood", "Food")];
        let ranked = rank("coffee", items, |f| f.clone());
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_zero_score_items_are_dropped() {
        let items = vec![
            doc("Falcons preview", "falcons-preview", "Sports"),
            doc("Taco festival", "taco-festival", "Food"),
        ];
        let ranked = rank("tacos", items, |f| f.clone());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "Taco festival");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let items = vec![
            doc("News briefs: monday", "news-briefs-monday", "News"),
            doc("News briefs: sunday", "news-briefs-sunday", "News"),
        ];
        let ranked = rank("news", items, |f| f.clone());
        assert_eq!(ranked[0].title, "News briefs: monday");
    }
}
