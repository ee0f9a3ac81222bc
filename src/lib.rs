//! # Native Query
//!
//! Template-tag tracking for native (free-text) database queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Query text                           │
//! │      select * from t where id = {{id}} {{#12-foo}}       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [tag::scanner]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Tag names (ordered)                     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [tag::classify + reconcile]
//! ┌─────────────────────────────────────────────────────────┐
//! │           TemplateTags registry (ordered, ids)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query]
//! ┌─────────────────────────────────────────────────────────┐
//! │        NativeQuery snapshot (+ snippet / card sync)      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All operations are pure: edits return new snapshots.

pub mod config;
pub mod error;
pub mod humanize;
pub mod id;
pub mod metadata;
pub mod query;
pub mod reconcile;
pub mod snippet;
pub mod tag;
pub mod validation;

pub use error::{Error, Result};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::humanize::{Humanize, InflectorHumanizer};
    pub use crate::id::{IdGenerator, SequentialIds, UuidGenerator};
    pub use crate::metadata::{
        Database, DatabaseId, Metadata, MetadataProvider, NativePermissions,
        NATIVE_PARAMETERS_FEATURE,
    };
    pub use crate::query::{DependentMetadataItem, NativeDatasetQuery, NativeQuery, QueryContext};
    pub use crate::reconcile::Reconciler;
    pub use crate::snippet::{CardSummary, Snippet, SnippetDirectory};
    pub use crate::tag::{
        classify, recognize_template_tags, CardId, Classification, FieldReference, SnippetId,
        TagId, TagKind, TemplateTag, TemplateTags,
    };
    pub use crate::validation::{DefaultTagValidator, TagValidator, ValidationError};
}

pub use query::{NativeDatasetQuery, NativeQuery, QueryContext};
pub use tag::{TagId, TagKind, TemplateTag, TemplateTags};
