//! Display-name defaults for template tags.
//!
//! Uses the `inflector` crate for identifier-style names and leaves card and
//! snippet references readable as typed.

use inflector::Inflector;

/// Turns a tag name into a human-readable label.
pub trait Humanize: Send + Sync {
    fn humanize(&self, name: &str) -> String;
}

/// Default humanizer.
///
/// ```ignore
/// assert_eq!(InflectorHumanizer.humanize("category"), "Category");
/// assert_eq!(InflectorHumanizer.humanize("created_at"), "Created at");
/// assert_eq!(InflectorHumanizer.humanize("snippet: filters"), "Snippet: filters");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct InflectorHumanizer;

impl Humanize for InflectorHumanizer {
    fn humanize(&self, name: &str) -> String {
        humanize(name)
    }
}

/// Humanize a tag name.
pub fn humanize(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if is_identifier(trimmed) {
        // dotted names humanize per segment ("order.created_at" -> "Order created at")
        let words: Vec<String> = trimmed
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_sentence_case().to_lowercase())
            .collect();
        return capitalize(&words.join(" "));
    }

    capitalize(trimmed)
}

fn is_identifier(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
