//! Template tag data model.
//!
//! A template tag describes one `{{...}}` reference found in native query
//! text. Tags live in a [`TemplateTags`] registry keyed by tag name, whose
//! iteration order is the order parameters are displayed in.
//!
//! The serialized shape matches the persisted query document:
//!
//! ```json
//! {
//!   "id": "6f1c…",
//!   "name": "#42-orders",
//!   "display-name": "#42 orders",
//!   "type": "card",
//!   "card-id": 42
//! }
//! ```

pub mod classify;
pub mod scanner;

pub use classify::{
    card_id_from_tag_name, classify, is_card_tag_name, is_snippet_tag_name,
    snippet_name_from_tag_name, Classification,
};
pub use scanner::{recognize_template_tags, replace_tag_reference, replace_tag_references};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a saved question referenced by a card tag.
pub type CardId = u64;

/// Identifier of a snippet in the snippet directory.
pub type SnippetId = u64;

/// Identifier of a database field.
pub type FieldId = u64;

// ============================================================================
// Identifiers
// ============================================================================

/// Stable identifier of a template tag.
///
/// Assigned once when the tag is created and kept across renames, since
/// parameter values are bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Field references
// ============================================================================

/// An opaque field reference clause stored on dimension tags.
///
/// The clause belongs to the host's query language (e.g. `["field", 12, null]`);
/// this crate only needs to know whether it points at a concrete field id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldReference(serde_json::Value);

impl FieldReference {
    pub fn new(clause: serde_json::Value) -> Self {
        Self(clause)
    }

    /// Reference to a field by numeric id: `["field", id, null]`.
    pub fn field(id: FieldId) -> Self {
        Self(serde_json::json!(["field", id, null]))
    }

    pub fn clause(&self) -> &serde_json::Value {
        &self.0
    }

    /// Whether the clause has the `["field", <ref>, ...]` shape.
    pub fn is_field_reference(&self) -> bool {
        matches!(
            self.0.as_array().and_then(|clause| clause.first()),
            Some(serde_json::Value::String(head)) if head == "field"
        )
    }

    /// The concrete field id, if this is a field reference by id (not by name).
    pub fn field_id(&self) -> Option<FieldId> {
        if !self.is_field_reference() {
            return None;
        }
        self.0.as_array()?.get(1)?.as_u64()
    }
}

// ============================================================================
// Tag kinds
// ============================================================================

/// The kind of a template tag, carrying the kind-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TagKind {
    /// Reference to another saved question (`{{#42-orders}}`).
    Card {
        /// `None` when the name carries no usable id (`{{#}}`, `{{#-foo}}`).
        #[serde(rename = "card-id", default)]
        card_id: Option<CardId>,
    },
    /// Inclusion of a named snippet (`{{snippet: filters}}`).
    Snippet {
        #[serde(rename = "snippet-name", default)]
        snippet_name: String,
        #[serde(rename = "snippet-id", default, skip_serializing_if = "Option::is_none")]
        snippet_id: Option<SnippetId>,
    },
    /// Field filter mapped onto a database field.
    Dimension {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dimension: Option<FieldReference>,
        #[serde(rename = "widget-type", default, skip_serializing_if = "Option::is_none")]
        widget_type: Option<String>,
    },
    #[default]
    Text,
    Number,
    Date,
}

impl TagKind {
    /// Fresh snippet kind with no directory id yet.
    pub fn snippet(snippet_name: impl Into<String>) -> Self {
        TagKind::Snippet {
            snippet_name: snippet_name.into(),
            snippet_id: None,
        }
    }

    /// Wire name of the kind (the `"type"` key).
    pub fn type_name(&self) -> &'static str {
        match self {
            TagKind::Card { .. } => "card",
            TagKind::Snippet { .. } => "snippet",
            TagKind::Dimension { .. } => "dimension",
            TagKind::Text => "text",
            TagKind::Number => "number",
            TagKind::Date => "date",
        }
    }

    /// Bindable variable kinds: dimension, text, number and date.
    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            TagKind::Dimension { .. } | TagKind::Text | TagKind::Number | TagKind::Date
        )
    }
}

// ============================================================================
// Parameter values configuration
// ============================================================================

/// How a parameter widget offers values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValuesQueryType {
    List,
    Search,
    None,
}

/// Where a parameter widget sources its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValuesSourceType {
    Card,
    StaticList,
}

/// Values configuration attached to a tag by the parameter editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterValuesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_query_type: Option<ValuesQueryType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_source_type: Option<ValuesSourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_source_config: Option<serde_json::Value>,
}

// ============================================================================
// Template tag
// ============================================================================

/// A registry entry describing one tag reference in the query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TagId>,

    pub name: String,

    #[serde(rename = "display-name", default)]
    pub display_name: String,

    #[serde(flatten)]
    pub kind: TagKind,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ParameterValuesConfig>,
}

impl TemplateTag {
    /// A generic text tag with no id. Ids are assigned by the reconciler.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            display_name: display_name.into(),
            kind: TagKind::Text,
            required: false,
            default: None,
            config: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<TagId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: TagKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn is_variable(&self) -> bool {
        self.kind.is_variable()
    }

    pub fn card_id(&self) -> Option<CardId> {
        match self.kind {
            TagKind::Card { card_id } => card_id,
            _ => None,
        }
    }

    pub fn snippet_name(&self) -> Option<&str> {
        match &self.kind {
            TagKind::Snippet { snippet_name, .. } => Some(snippet_name),
            _ => None,
        }
    }

    pub fn snippet_id(&self) -> Option<SnippetId> {
        match self.kind {
            TagKind::Snippet { snippet_id, .. } => snippet_id,
            _ => None,
        }
    }

    pub fn dimension(&self) -> Option<&FieldReference> {
        match &self.kind {
            TagKind::Dimension { dimension, .. } => dimension.as_ref(),
            _ => None,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered, name-keyed registry of template tags.
///
/// Iteration order is meaningful: it is the default parameter display order.
/// Equality therefore compares entries in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateTags(IndexMap<String, TemplateTag>);

impl TemplateTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TemplateTag> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TemplateTag> {
        self.0.get_mut(name)
    }

    pub fn get_by_id(&self, id: &TagId) -> Option<&TemplateTag> {
        self.0.values().find(|tag| tag.id.as_ref() == Some(id))
    }

    /// Position of the tag with the given id in display order.
    pub fn index_of_id(&self, id: &TagId) -> Option<usize> {
        self.0.values().position(|tag| tag.id.as_ref() == Some(id))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateTag> {
        self.0.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TemplateTag> {
        self.0.values_mut()
    }

    /// Insert or replace the entry keyed by `tag.name`.
    ///
    /// A replaced entry keeps its position; a new one is appended.
    pub fn insert(&mut self, tag: TemplateTag) -> Option<TemplateTag> {
        self.0.insert(tag.name.clone(), tag)
    }

    /// Remove an entry, keeping the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<TemplateTag> {
        self.0.shift_remove(name)
    }

    /// Replace the entry `old_name` with `tag`, at the same position.
    ///
    /// Falls back to appending when `old_name` is not present.
    pub fn replace(&mut self, old_name: &str, tag: TemplateTag) {
        match self.0.shift_remove_full(old_name) {
            Some((index, _, _)) => {
                // a stale entry under the new name would otherwise shift the slot
                self.0.shift_remove(&tag.name);
                let index = index.min(self.0.len());
                self.0.shift_insert(index, tag.name.clone(), tag);
            }
            None => {
                self.insert(tag);
            }
        }
    }

    /// Move the tag with the given id to `new_index` in display order.
    ///
    /// Returns `false` when no tag has that id. Indices past the end move the
    /// tag to the last position.
    pub fn move_to(&mut self, id: &TagId, new_index: usize) -> bool {
        let Some(old_index) = self.index_of_id(id) else {
            return false;
        };
        let last = self.0.len() - 1;
        self.0.move_index(old_index, new_index.min(last));
        true
    }
}

impl PartialEq for TemplateTags {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().eq(other.0.iter())
    }
}

impl FromIterator<TemplateTag> for TemplateTags {
    fn from_iter<I: IntoIterator<Item = TemplateTag>>(iter: I) -> Self {
        Self(iter.into_iter().map(|tag| (tag.name.clone(), tag)).collect())
    }
}

impl<'a> IntoIterator for &'a TemplateTags {
    type Item = &'a TemplateTag;
    type IntoIter = indexmap::map::Values<'a, String, TemplateTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.values()
    }
}
