//! Input normalisation for posts and tag names

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashSet;
use std::hash::Hash;

const SLUG_ID_LEN: usize = 8;

/// Drop repeated items, keeping the first occurrence
pub fn filter_unique<T>(items: &[T]) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

/// Canonical tag name: dashes become spaces, outer whitespace trimmed
pub fn normalize_tag(name: &str) -> String {
    name.replace('-', " ").trim().to_string()
}

/// Tag list as stored and fanned out: unique, normalised, non-empty.
///
/// Uniqueness is re-checked after normalising so that `react-native` and
/// `react native` collapse into one tag.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let normalized: Vec<String> = filter_unique(tags)
        .iter()
        .map(|tag| normalize_tag(tag))
        .filter(|tag| !tag.is_empty())
        .collect();
    filter_unique(&normalized)
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '.' | ' ' | '-')
        || ('ㄱ'..='힣').contains(&c)
        || ('\u{3000}'..='\u{303f}').contains(&c)
        || ('\u{3040}'..='\u{309f}').contains(&c)
        || ('\u{30a0}'..='\u{30ff}').contains(&c)
        || ('\u{ff00}'..='\u{ff9f}').contains(&c)
        || ('\u{4e00}'..='\u{9faf}').contains(&c)
        || ('\u{3400}'..='\u{4dbf}').contains(&c)
}

/// Make `text` usable as a url slug.
///
/// Keeps latin alphanumerics, Hangul and CJK, turns spaces into dashes and
/// collapses dash runs. Trailing dots are removed.
pub fn escape_for_url(text: &str) -> String {
    let kept: String = text.chars().filter(|c| is_slug_char(*c)).collect();

    let mut slug = String::with_capacity(kept.len());
    for c in kept.trim().chars() {
        let c = if c == ' ' { '-' } else { c };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    slug.trim_end_matches('.').to_string()
}

/// Short random suffix that keeps generated slugs apart
pub fn generate_slug_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
