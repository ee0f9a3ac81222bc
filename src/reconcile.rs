//! Incremental reconciliation of the template tag registry.
//!
//! Every text edit produces a fresh set of recognised tag names. The
//! reconciler merges that set into the previous registry:
//!
//! ```text
//!   previous registry ──┐
//!                       ├─► added / removed ─► rename? ─► ids ─► next registry
//!   scanned names ──────┘
//! ```
//!
//! When exactly one name disappeared and exactly one appeared, the edit is
//! treated as a rename of that tag, which keeps its id and any customised
//! display name or type. This is a heuristic: deleting one reference and
//! adding an unrelated one in the same edit is indistinguishable from a
//! rename and is handled as one.

use crate::humanize::Humanize;
use crate::id::IdGenerator;
use crate::tag::{classify, TemplateTag, TemplateTags};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Merges scanned tag names into a registry.
pub struct Reconciler<'a> {
    ids: &'a dyn IdGenerator,
    humanizer: &'a dyn Humanize,
}

impl<'a> Reconciler<'a> {
    pub fn new(ids: &'a dyn IdGenerator, humanizer: &'a dyn Humanize) -> Self {
        Self { ids, humanizer }
    }

    /// Compute the registry for the given scanned names.
    ///
    /// Surviving and renamed entries keep their position; new entries are
    /// appended in scan order. Every returned tag has an id.
    pub fn reconcile(&self, previous: &TemplateTags, scanned: &[String]) -> TemplateTags {
        if scanned.is_empty() && previous.is_empty() {
            return TemplateTags::new();
        }

        let scanned_names: HashSet<&str> = scanned.iter().map(String::as_str).collect();
        let mut added: Vec<&str> = Vec::new();
        for name in scanned {
            if !previous.contains(name) && !added.contains(&name.as_str()) {
                added.push(name);
            }
        }
        let removed: Vec<&str> = previous
            .names()
            .filter(|name| !scanned_names.contains(name))
            .collect();

        let mut tags = previous.clone();

        match (removed.as_slice(), added.as_slice()) {
            ([old_name], [new_name]) => {
                debug!(from = *old_name, to = *new_name, "renaming template tag");
                if let Some(existing) = previous.get(old_name) {
                    let renamed = self.rename_tag(existing, new_name);
                    tags.replace(old_name, renamed);
                }
            }
            _ => {
                for name in &removed {
                    trace!(tag = *name, "removing template tag");
                    tags.remove(name);
                }
                for name in &added {
                    trace!(tag = *name, "adding template tag");
                    tags.insert(self.create_tag(name));
                }
                if !removed.is_empty() || !added.is_empty() {
                    debug!(
                        added = added.len(),
                        removed = removed.len(),
                        "reconciled template tags"
                    );
                }
            }
        }

        for tag in tags.iter_mut() {
            if tag.id.is_none() {
                tag.id = Some(self.ids.generate());
            }
        }

        tags
    }

    /// A new tag for `name`, classified from the name. The id is left unset.
    pub fn create_tag(&self, name: &str) -> TemplateTag {
        TemplateTag::new(name, self.humanizer.humanize(name)).with_kind(classify(name).into_kind())
    }

    /// Copy of `tag` under `new_name`.
    ///
    /// A display name that still matches the humanized old name follows the
    /// rename; a customised one is kept.
    pub fn rename_tag(&self, tag: &TemplateTag, new_name: &str) -> TemplateTag {
        let mut renamed = tag.clone();
        if renamed.display_name == self.humanizer.humanize(&tag.name) {
            renamed.display_name = self.humanizer.humanize(new_name);
        }
        renamed.name = new_name.to_string();
        renamed.kind = classify(new_name).merge_into(renamed.kind);
        renamed
    }
}

/// Reconcile with explicit collaborators.
pub fn reconcile(
    previous: &TemplateTags,
    scanned: &[String],
    ids: &dyn IdGenerator,
    humanizer: &dyn Humanize,
) -> TemplateTags {
    Reconciler::new(ids, humanizer).reconcile(previous, scanned)
}
