//! Tag normalization, the heuristic tagger, and synonym expansion.

use crate::models::{SynonymGroup, TagSet};

/// Normalize a raw tag: trim, lowercase, underscores to hyphens.
///
/// Idempotent: `normalize_tag(&normalize_tag(t)) == normalize_tag(t)`.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim().to_lowercase().replace('_', "-")
}

/// Normalize every entry, dropping those that are empty afterwards.
pub fn normalize_tags<I, S>(raw: I) -> TagSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|t| normalize_tag(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Split a comma-separated query value (`?tags=a,b`) into normalized tags.
pub fn parse_tag_list(csv: &str) -> TagSet {
    normalize_tags(csv.split(','))
}

/// Deterministic fallback tagger.
///
/// A tag matches when its hyphen-to-space form occurs anywhere in the
/// description, ignoring case. Never fails; an empty vocabulary yields an
/// empty set.
pub fn heuristic_tags(description: &str, vocabulary: &TagSet) -> TagSet {
    let haystack = description.to_lowercase();
    vocabulary
        .iter()
        .filter(|tag| {
            let needle = tag.replace('-', " ").to_lowercase();
            !needle.is_empty() && haystack.contains(&needle)
        })
        .cloned()
        .collect()
}

/// Expand `selected` to include every member of any synonym group that
/// contains one of the selected tags.
pub fn expand_with_synonyms(selected: &TagSet, groups: &[SynonymGroup]) -> TagSet {
    let mut expanded = selected.clone();
    for group in groups {
        if group.tags.iter().any(|t| selected.contains(t)) {
            expanded.extend(group.tags.iter().cloned());
        }
    }
    expanded
}
