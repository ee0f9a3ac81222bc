//! The native query facade.
//!
//! [`NativeQuery`] is an immutable snapshot of a native query document plus
//! the shared [`QueryContext`]. Every edit returns a new snapshot:
//!
//! ```text
//! set_query_text(text)
//!     │
//!     ▼ recognize_template_tags         (tag::scanner)
//!     ▼ Reconciler::reconcile           (reconcile)
//!     ▼ new NativeQuery { text, tags }
//! ```
//!
//! Card renaming ([`NativeQuery::update_card_template_tag_names`]) goes
//! through `set_query_text` one tag at a time, so the rename heuristic keeps
//! tag ids. Snippet synchronization ([`NativeQuery::update_snippet_names`])
//! renames registry entries itself before rescanning.

mod context;
mod document;

pub use context::QueryContext;
pub use document::{NativeBody, NativeDatasetQuery, QueryType};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::metadata::{Database, DatabaseId, NativePermissions};
use crate::snippet::{
    backfill_snippet_ids, rewrite_stale_snippet_references, snippet_tag_name, stale_snippet_names,
    CardSummary, SnippetDirectory,
};
use crate::tag::{
    recognize_template_tags, replace_tag_reference, CardId, FieldId, ParameterValuesConfig,
    TagId, TagKind, TemplateTag, TemplateTags,
};
use crate::validation::{validate_template_tags, ValidationError};

/// Metadata a query depends on beyond its database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DependentMetadataItem {
    Field { id: FieldId },
}

/// Immutable native query snapshot.
#[derive(Debug, Clone)]
pub struct NativeQuery {
    dataset: NativeDatasetQuery,
    context: Arc<QueryContext>,
}

impl PartialEq for NativeQuery {
    fn eq(&self, other: &Self) -> bool {
        self.dataset == other.dataset
    }
}

impl NativeQuery {
    /// A new, empty query.
    pub fn new(context: Arc<QueryContext>) -> Self {
        Self::from_dataset(context, NativeDatasetQuery::default())
    }

    /// Wrap a persisted document. Tags are taken as stored.
    pub fn from_dataset(context: Arc<QueryContext>, dataset: NativeDatasetQuery) -> Self {
        Self { dataset, context }
    }

    pub fn dataset(&self) -> &NativeDatasetQuery {
        &self.dataset
    }

    pub fn into_dataset(self) -> NativeDatasetQuery {
        self.dataset
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    fn with_dataset(&self, dataset: NativeDatasetQuery) -> Self {
        Self {
            dataset,
            context: Arc::clone(&self.context),
        }
    }

    fn with_template_tags(&self, template_tags: TemplateTags) -> Self {
        let mut dataset = self.dataset.clone();
        dataset.native.template_tags = template_tags;
        self.with_dataset(dataset)
    }

    // =========================================================================
    // Database
    // =========================================================================

    pub fn database_id(&self) -> Option<DatabaseId> {
        self.dataset.database
    }

    pub fn database(&self) -> Option<&Database> {
        self.database_id()
            .and_then(|id| self.context.metadata().database(id))
    }

    pub fn engine(&self) -> Option<&str> {
        self.database().map(|db| db.engine.as_str())
    }

    /// A snapshot targeting another database. Returns an equal snapshot when
    /// the database does not change.
    pub fn set_database_id(&self, database_id: DatabaseId) -> Self {
        if self.database_id() == Some(database_id) {
            return self.clone();
        }
        let mut dataset = self.dataset.clone();
        dataset.database = Some(database_id);
        self.with_dataset(dataset)
    }

    pub fn set_database(&self, database: &Database) -> Self {
        self.set_database_id(database.id)
    }

    /// Whether the database can bind template tag parameters. Tags are only
    /// tracked when it can.
    pub fn supports_native_parameters(&self) -> bool {
        let feature = &self.context.settings().parameters.feature;
        self.database().is_some_and(|db| db.has_feature(feature))
    }

    pub fn has_write_permission(&self) -> bool {
        self.database()
            .is_some_and(|db| db.native_permissions == NativePermissions::Write)
    }

    /// True when the database is unknown or the user may not write native
    /// queries against it.
    pub fn read_only(&self) -> bool {
        !self.has_write_permission()
    }

    pub fn is_editable(&self) -> bool {
        !self.read_only()
    }

    // =========================================================================
    // Collection
    // =========================================================================

    /// Whether the engine needs a collection as well as a database.
    pub fn requires_table(&self) -> bool {
        self.engine()
            .is_some_and(|engine| self.context.settings().engines.requires_table(engine))
    }

    pub fn collection(&self) -> Option<&str> {
        self.dataset.native.collection.as_deref()
    }

    pub fn set_collection_name(&self, collection: impl Into<String>) -> Self {
        let mut dataset = self.dataset.clone();
        dataset.native.collection = Some(collection.into());
        self.with_dataset(dataset)
    }

    /// Select the first table as collection when the engine requires one.
    pub fn set_default_collection(&self) -> Self {
        if self.requires_table() {
            if let Some(table) = self.database().and_then(|db| db.tables.first()) {
                return self.set_collection_name(table.name.clone());
            }
        }
        self.clone()
    }

    // =========================================================================
    // Query text
    // =========================================================================

    pub fn query_text(&self) -> &str {
        &self.dataset.native.query
    }

    /// Replace the query text and reconcile the template tags with it.
    pub fn set_query_text(&self, query_text: impl Into<String>) -> Self {
        let query_text = query_text.into();
        let template_tags = self.updated_template_tags(&query_text);

        let mut dataset = self.dataset.clone();
        dataset.native.query = query_text;
        dataset.native.template_tags = template_tags;
        self.with_dataset(dataset)
    }

    /// Number of lines in the query text; zero for empty text.
    pub fn line_count(&self) -> usize {
        let text = self.query_text();
        if text.is_empty() {
            0
        } else {
            text.split('\n').count()
        }
    }

    fn updated_template_tags(&self, query_text: &str) -> TemplateTags {
        if query_text.is_empty() || !self.supports_native_parameters() {
            return TemplateTags::new();
        }

        let names = recognize_template_tags(query_text);
        self.context
            .reconciler()
            .reconcile(self.template_tags_map(), &names)
    }

    // =========================================================================
    // Template tags
    // =========================================================================

    pub fn template_tags_map(&self) -> &TemplateTags {
        &self.dataset.native.template_tags
    }

    pub fn template_tags(&self) -> Vec<&TemplateTag> {
        self.template_tags_map().iter().collect()
    }

    pub fn template_tags_where<P>(&self, predicate: P) -> Vec<&TemplateTag>
    where
        P: Fn(&TemplateTag) -> bool,
    {
        self.template_tags_map()
            .iter()
            .filter(|tag| predicate(*tag))
            .collect()
    }

    pub fn template_tag_by_id(&self, id: &TagId) -> Option<&TemplateTag> {
        self.template_tags_map().get_by_id(id)
    }

    /// Dimension, text, number and date tags.
    pub fn variable_template_tags(&self) -> Vec<&TemplateTag> {
        self.template_tags_where(TemplateTag::is_variable)
    }

    pub fn has_variable_template_tags(&self) -> bool {
        self.template_tags_map().iter().any(TemplateTag::is_variable)
    }

    pub fn dimension_template_tags(&self) -> Vec<&TemplateTag> {
        self.template_tags_where(|tag| matches!(tag.kind, TagKind::Dimension { .. }))
    }

    pub fn has_snippets(&self) -> bool {
        self.template_tags_map()
            .iter()
            .any(|tag| matches!(tag.kind, TagKind::Snippet { .. }))
    }

    /// Ids of the questions referenced through card tags.
    pub fn referenced_question_ids(&self) -> Vec<CardId> {
        self.template_tags_map()
            .iter()
            .filter_map(TemplateTag::card_id)
            .collect()
    }

    /// Fields that dimension tags are mapped to.
    pub fn dependent_metadata(&self) -> Vec<DependentMetadataItem> {
        self.template_tags_map()
            .iter()
            .filter_map(|tag| tag.dimension()?.field_id())
            .map(|id| DependentMetadataItem::Field { id })
            .collect()
    }

    /// Insert or replace one tag without rescanning the text.
    pub fn set_template_tag(&self, name: &str, tag: TemplateTag) -> Self {
        let mut template_tags = self.template_tags_map().clone();
        if tag.name == name {
            template_tags.insert(tag);
        } else {
            template_tags.replace(name, tag);
        }
        self.with_template_tags(template_tags)
    }

    /// Attach a parameter values configuration to `tag`.
    pub fn set_template_tag_config(&self, tag: &TemplateTag, config: ParameterValuesConfig) -> Self {
        let mut updated = tag.clone();
        updated.config = Some(config);
        self.set_template_tag(&tag.name, updated)
    }

    /// Move the tag with `id` to `new_index` in parameter order.
    ///
    /// Unknown ids leave the query unchanged; indices past the end move the
    /// tag last.
    pub fn set_parameter_index(&self, id: &TagId, new_index: usize) -> Self {
        let mut template_tags = self.template_tags_map().clone();
        if !template_tags.move_to(id, new_index) {
            debug!(tag = %id, "no template tag with this id to reorder");
            return self.clone();
        }
        self.with_template_tags(template_tags)
    }

    // =========================================================================
    // Snippets and cards
    // =========================================================================

    /// Bind snippet tags known only by name to their directory ids.
    pub fn update_snippets_with_ids<D>(&self, snippets: &D) -> Self
    where
        D: SnippetDirectory + ?Sized,
    {
        let has_unbound = self
            .template_tags_map()
            .iter()
            .any(|tag| matches!(tag.kind, TagKind::Snippet { snippet_id: None, .. }));
        if !has_unbound {
            return self.clone();
        }
        self.with_template_tags(backfill_snippet_ids(self.template_tags_map(), snippets))
    }

    /// Follow snippet renames in the directory.
    ///
    /// Rewrites stale references, rescans and binds new snippet tags until
    /// the text stops changing, for at most `snippets.max_sync_passes`
    /// passes.
    ///
    /// Each pass renames every stale tag at once, in the text and in the
    /// registry, so the rescan sees no add/remove pair to guess a rename
    /// from and every tag stays bound to its own snippet.
    pub fn update_snippet_names<D>(&self, snippets: &D) -> Self
    where
        D: SnippetDirectory + ?Sized,
    {
        let max_passes = self.context.settings().snippets.max_sync_passes.max(1);
        let mut query = self.clone();

        for pass in 1..=max_passes {
            let rewritten = rewrite_stale_snippet_references(
                query.query_text(),
                query.template_tags_map(),
                snippets,
            );
            if rewritten == query.query_text() {
                return query;
            }
            debug!(pass, "snippet references rewritten");
            query = query
                .rename_stale_snippet_tags(snippets)
                .set_query_text(rewritten)
                .update_snippets_with_ids(snippets);
        }

        warn!(
            max_passes,
            "snippet references still changing after the maximum number of passes"
        );
        query
    }

    fn rename_stale_snippet_tags<D>(&self, snippets: &D) -> Self
    where
        D: SnippetDirectory + ?Sized,
    {
        let stale = stale_snippet_names(self.template_tags_map(), snippets);
        let reconciler = self.context.reconciler();

        let mut template_tags = TemplateTags::new();
        for tag in self.template_tags_map() {
            let tag = match stale.get(&tag.name) {
                Some(snippet_name) => reconciler.rename_tag(tag, &snippet_tag_name(snippet_name)),
                None => tag.clone(),
            };
            // two references collapsing onto one name keep the first entry
            if !template_tags.contains(&tag.name) {
                template_tags.insert(tag);
            }
        }
        self.with_template_tags(template_tags)
    }

    /// Rename card tags to the canonical `#<id>-<slug>` of their card.
    ///
    /// Tags are rewritten one at a time so each edit is a single rename and
    /// keeps the tag's id.
    pub fn update_card_template_tag_names(&self, cards: &[CardSummary]) -> Self {
        let cards_by_id: HashMap<CardId, &CardSummary> =
            cards.iter().map(|card| (card.id, card)).collect();

        let renames: Vec<(String, String)> = self
            .template_tags_map()
            .iter()
            .filter_map(|tag| {
                let card = cards_by_id.get(&tag.card_id()?)?;
                Some((tag.name.clone(), card.tag_name()))
            })
            .filter(|(old_name, new_name)| old_name != new_name)
            .collect();

        renames
            .into_iter()
            .fold(self.clone(), |query, (old_name, new_name)| {
                query.replace_tag_name(&old_name, &new_name)
            })
    }

    fn replace_tag_name(&self, old_name: &str, new_name: &str) -> Self {
        let text = replace_tag_reference(self.query_text(), old_name, &format!("{{{{{}}}}}", new_name));
        self.set_query_text(text)
    }

    // =========================================================================
    // Runnability
    // =========================================================================

    /// Errors for every tag that the validator rejects.
    pub fn validate_template_tags(&self) -> Vec<ValidationError> {
        validate_template_tags(self.template_tags_map(), self.context.validator())
    }

    fn all_template_tags_are_valid(&self) -> bool {
        self.validate_template_tags().is_empty()
    }

    /// A database is chosen, plus a collection when the engine needs one.
    pub fn has_data(&self) -> bool {
        self.database_id().is_some() && (!self.requires_table() || self.collection().is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.database_id().is_none() || self.query_text().is_empty()
    }

    pub fn can_run(&self) -> bool {
        self.has_data() && !self.query_text().is_empty() && self.all_template_tags_are_valid()
    }
}
