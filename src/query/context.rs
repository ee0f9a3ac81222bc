//! Collaborators shared by every snapshot of a query.

use std::fmt;
use std::sync::Arc;

use crate::config::Settings;
use crate::humanize::{Humanize, InflectorHumanizer};
use crate::id::{IdGenerator, UuidGenerator};
use crate::metadata::{Metadata, MetadataProvider};
use crate::reconcile::Reconciler;
use crate::validation::{DefaultTagValidator, TagValidator};

/// Services a [`NativeQuery`](super::NativeQuery) consults.
///
/// Snapshots share one context through an `Arc`; nothing in it is mutated
/// after construction.
///
/// ```ignore
/// let context = QueryContext::new(metadata)
///     .with_ids(SequentialIds::new("tag"))
///     .with_settings(settings);
/// ```
pub struct QueryContext {
    metadata: Arc<dyn MetadataProvider>,
    ids: Arc<dyn IdGenerator>,
    humanizer: Arc<dyn Humanize>,
    validator: Arc<dyn TagValidator>,
    settings: Settings,
}

impl QueryContext {
    pub fn new(metadata: impl MetadataProvider + 'static) -> Self {
        Self {
            metadata: Arc::new(metadata),
            ids: Arc::new(UuidGenerator),
            humanizer: Arc::new(InflectorHumanizer),
            validator: Arc::new(DefaultTagValidator),
            settings: Settings::default(),
        }
    }

    pub fn with_ids(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn with_humanizer(mut self, humanizer: impl Humanize + 'static) -> Self {
        self.humanizer = Arc::new(humanizer);
        self
    }

    pub fn with_validator(mut self, validator: impl TagValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn metadata(&self) -> &dyn MetadataProvider {
        self.metadata.as_ref()
    }

    pub fn humanizer(&self) -> &dyn Humanize {
        self.humanizer.as_ref()
    }

    pub fn validator(&self) -> &dyn TagValidator {
        self.validator.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(self.ids.as_ref(), self.humanizer.as_ref())
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new(Metadata::default())
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
