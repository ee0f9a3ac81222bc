//! Tag classification by naming convention.
//!
//! - `#42`, `#42-orders` → card reference to question 42
//! - `snippet: filters` → snippet inclusion of "filters"
//! - anything else → generic variable (text until configured otherwise)

use super::{CardId, TagKind};
use regex::Regex;
use std::sync::LazyLock;

/// Matches `#123-foo-bar` and `#123` but not `#123foo`.
static CARD_TAG_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([0-9]*)(-[a-z0-9-]*)?$").unwrap());

const SNIPPET_PREFIX: &str = "snippet:";

/// What a tag name encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Card { card_id: Option<CardId> },
    Snippet { snippet_name: String },
    Variable,
}

impl Classification {
    /// Kind for a brand new tag with this classification.
    pub fn into_kind(self) -> TagKind {
        match self {
            Classification::Card { card_id } => TagKind::Card { card_id },
            Classification::Snippet { snippet_name } => TagKind::snippet(snippet_name),
            Classification::Variable => TagKind::Text,
        }
    }

    /// Kind for an existing tag whose name changed.
    ///
    /// Card and snippet names always win. A snippet keeps its directory id so
    /// that snippet renames stay bound to the same snippet. A generic name
    /// keeps a configured variable kind, but card and snippet fields must not
    /// outlive the name that encoded them.
    pub fn merge_into(self, previous: TagKind) -> TagKind {
        match (self, previous) {
            (Classification::Card { card_id }, _) => TagKind::Card { card_id },
            (Classification::Snippet { snippet_name }, TagKind::Snippet { snippet_id, .. }) => {
                TagKind::Snippet {
                    snippet_name,
                    snippet_id,
                }
            }
            (Classification::Snippet { snippet_name }, _) => TagKind::snippet(snippet_name),
            (Classification::Variable, kind) if kind.is_variable() => kind,
            (Classification::Variable, _) => TagKind::Text,
        }
    }
}

/// Classify a tag name.
pub fn classify(name: &str) -> Classification {
    if is_card_tag_name(name) {
        Classification::Card {
            card_id: card_id_from_tag_name(name),
        }
    } else if is_snippet_tag_name(name) {
        Classification::Snippet {
            snippet_name: snippet_name_from_tag_name(name),
        }
    } else {
        Classification::Variable
    }
}

/// Card tags start with `#`.
///
/// The scanner only ever yields well-formed card names; other `#` names
/// still classify as cards, just without an id.
pub fn is_card_tag_name(name: &str) -> bool {
    name.starts_with('#')
}

/// The question id encoded in a card tag name.
///
/// `None` for malformed names, a missing digit run, zero, or an id that does
/// not fit.
pub fn card_id_from_tag_name(name: &str) -> Option<CardId> {
    let captures = CARD_TAG_NAME_PATTERN.captures(name)?;
    captures
        .get(1)?
        .as_str()
        .parse::<CardId>()
        .ok()
        .filter(|id| *id != 0)
}

pub fn is_snippet_tag_name(name: &str) -> bool {
    name.starts_with(SNIPPET_PREFIX)
}

pub fn snippet_name_from_tag_name(name: &str) -> String {
    name.strip_prefix(SNIPPET_PREFIX)
        .unwrap_or(name)
        .trim()
        .to_string()
}
