//! Keeping snippet and card references in sync with their sources.
//!
//! Snippet tags are written by name (`{{snippet: filters}}`) but bound by id
//! once the snippet is known. Two passes keep the text and the registry
//! consistent with the snippet directory:
//!
//! - [`backfill_snippet_ids`] binds tags that only know a snippet's name.
//! - [`rewrite_stale_snippet_references`] rewrites references to snippets
//!   that were renamed since the tag was bound.
//!
//! The facade alternates them with rescans until the text is stable; see
//! `NativeQuery::update_snippet_names`.

use indexmap::IndexMap;
use inflector::Inflector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

use crate::tag::{replace_tag_references, CardId, SnippetId, TagKind, TemplateTags};

/// A snippet as listed in the snippet directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: SnippetId,
    pub name: String,
}

impl Snippet {
    pub fn new(id: SnippetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Read-only access to snippet metadata.
pub trait SnippetDirectory {
    fn snippets(&self) -> &[Snippet];

    fn snippet_by_id(&self, id: SnippetId) -> Option<&Snippet> {
        self.snippets().iter().find(|snippet| snippet.id == id)
    }

    fn snippet_by_name(&self, name: &str) -> Option<&Snippet> {
        self.snippets().iter().find(|snippet| snippet.name == name)
    }
}

impl SnippetDirectory for [Snippet] {
    fn snippets(&self) -> &[Snippet] {
        self
    }
}

impl SnippetDirectory for Vec<Snippet> {
    fn snippets(&self) -> &[Snippet] {
        self
    }
}

/// Bind unbound snippet tags to the directory snippet with the same name.
///
/// Tags that already carry a snippet id are left alone. The text is not
/// touched.
pub fn backfill_snippet_ids<D>(tags: &TemplateTags, directory: &D) -> TemplateTags
where
    D: SnippetDirectory + ?Sized,
{
    let mut tags_by_snippet_name: HashMap<&str, Vec<&str>> = HashMap::new();
    for tag in tags {
        if let TagKind::Snippet {
            snippet_name,
            snippet_id: None,
        } = &tag.kind
        {
            tags_by_snippet_name
                .entry(snippet_name.as_str())
                .or_default()
                .push(tag.name.as_str());
        }
    }

    let mut updated = tags.clone();
    if tags_by_snippet_name.is_empty() {
        return updated;
    }

    for snippet in directory.snippets() {
        let Some(tag_names) = tags_by_snippet_name.get(snippet.name.as_str()) else {
            continue;
        };
        for tag_name in tag_names {
            if let Some(TagKind::Snippet { snippet_id, .. }) =
                updated.get_mut(tag_name).map(|tag| &mut tag.kind)
            {
                trace!(tag = *tag_name, snippet = snippet.id, "binding snippet tag");
                *snippet_id = Some(snippet.id);
            }
        }
    }

    updated
}

/// Bound snippet tags whose directory name changed, mapped from tag name to
/// the snippet's current name, in registry order.
pub fn stale_snippet_names<D>(tags: &TemplateTags, directory: &D) -> IndexMap<String, String>
where
    D: SnippetDirectory + ?Sized,
{
    let mut stale = IndexMap::new();
    for tag in tags {
        let TagKind::Snippet {
            snippet_name,
            snippet_id: Some(snippet_id),
        } = &tag.kind
        else {
            continue;
        };
        let Some(snippet) = directory.snippet_by_id(*snippet_id) else {
            continue;
        };
        if snippet.name != *snippet_name {
            stale.insert(tag.name.clone(), snippet.name.clone());
        }
    }
    stale
}

/// Rewrite references to bound snippets whose directory name changed.
///
/// The tag name is the literal token in the text, so that is what gets
/// replaced, with `{{snippet: <current name>}}`. Every reference is rewritten
/// against the input text, so chained renames (`x` to `y` while `y` becomes
/// `z`) and swaps keep each reference bound to its own snippet.
pub fn rewrite_stale_snippet_references<D>(
    query_text: &str,
    tags: &TemplateTags,
    directory: &D,
) -> String
where
    D: SnippetDirectory + ?Sized,
{
    let replacements: IndexMap<String, String> = stale_snippet_names(tags, directory)
        .into_iter()
        .map(|(tag_name, snippet_name)| {
            trace!(tag = %tag_name, to = %snippet_name, "rewriting stale snippet reference");
            (tag_name, snippet_tag(&snippet_name))
        })
        .collect();
    replace_tag_references(query_text, &replacements)
}

/// The tag name of a snippet reference: `snippet: <name>`.
pub fn snippet_tag_name(snippet_name: &str) -> String {
    format!("snippet: {}", snippet_name)
}

/// The reference text for a snippet: `{{snippet: <name>}}`.
pub fn snippet_tag(snippet_name: &str) -> String {
    format!("{{{{{}}}}}", snippet_tag_name(snippet_name))
}

// ============================================================================
// Card references
// ============================================================================

/// A saved question that card tags may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    pub id: CardId,
    pub name: String,
}

impl CardSummary {
    pub fn new(id: CardId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Canonical tag name for this card: `#<id>-<slug>`.
    pub fn tag_name(&self) -> String {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            format!("#{}", self.id)
        } else {
            format!("#{}-{}", self.id, slug)
        }
    }
}

/// Lowercase kebab-case slug restricted to `[a-z0-9-]`.
pub fn slugify(name: &str) -> String {
    let kebab: String = name
        .to_kebab_case()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();

    kebab
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
