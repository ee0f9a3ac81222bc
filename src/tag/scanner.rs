//! Recognition of template tag references in native query text.
//!
//! References look like mustache templates: `{{category}}`,
//! `{{snippet: filters}}`, `{{#42-orders}}`. Anything that does not match one
//! of the patterns below is left alone, so `{{&foo!}}` is simply not a tag.

use indexmap::IndexMap;
use regex::{Captures, NoExpand, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Plain variables: letters, digits, underscores and dots.
static VARIABLE_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_\.]+)\s*\}\}").unwrap());

/// Snippet references. The capture keeps the `snippet:` prefix.
static SNIPPET_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(snippet:\s*[^}]+)\s*\}\}").unwrap());

/// Card references. The capture keeps the leading `#`.
static CARD_TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(#([0-9]*)(-[a-z0-9-]*)?)\s*\}\}").unwrap());

/// Extract tag names from query text.
///
/// Variable matches come first, then snippets, then cards; each name is
/// reported once, at its first occurrence.
pub fn recognize_template_tags(query_text: &str) -> Vec<String> {
    let patterns: [&Regex; 3] = [
        &VARIABLE_TAG_PATTERN,
        &SNIPPET_TAG_PATTERN,
        &CARD_TAG_PATTERN,
    ];

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for pattern in patterns {
        for captures in pattern.captures_iter(query_text) {
            if let Some(name) = captures.get(1) {
                if seen.insert(name.as_str()) {
                    names.push(name.as_str().to_string());
                }
            }
        }
    }
    names
}

/// Rewrite every `{{ <tag_name> }}` reference to `replacement`.
///
/// The tag name is matched literally and surrounding whitespace inside the
/// braces is tolerated. `replacement` is inserted verbatim.
pub fn replace_tag_reference(query_text: &str, tag_name: &str, replacement: &str) -> String {
    let pattern = format!(r"\{{\{{\s*{}\s*\}}\}}", regex::escape(tag_name));
    match Regex::new(&pattern) {
        Ok(regex) => regex
            .replace_all(query_text, NoExpand(replacement))
            .into_owned(),
        Err(err) => {
            tracing::warn!(tag = tag_name, error = %err, "could not build tag reference pattern");
            query_text.to_string()
        }
    }
}

/// Rewrite references to several tags at once.
///
/// `replacements` maps a tag name to the text that replaces its `{{...}}`
/// reference. All references are matched against the input text in a single
/// pass, so a replacement is never rewritten again by a later entry.
pub fn replace_tag_references(query_text: &str, replacements: &IndexMap<String, String>) -> String {
    if replacements.is_empty() {
        return query_text.to_string();
    }

    // longest first so a name is never shadowed by one of its prefixes
    let mut names: Vec<&str> = replacements.keys().map(String::as_str).collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    let alternatives: Vec<String> = names.into_iter().map(regex::escape).collect();

    let pattern = format!(r"\{{\{{\s*({})\s*\}}\}}", alternatives.join("|"));
    let regex = match Regex::new(&pattern) {
        Ok(regex) => regex,
        Err(err) => {
            tracing::warn!(error = %err, "could not build tag reference pattern");
            return query_text.to_string();
        }
    };

    regex
        .replace_all(query_text, |captures: &Captures<'_>| {
            let name = captures.get(1).map_or("", |m| m.as_str());
            match replacements.get(name) {
                Some(replacement) => replacement.clone(),
                None => captures[0].to_string(),
            }
        })
        .into_owned()
}
