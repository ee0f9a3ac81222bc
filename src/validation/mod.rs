//! Validation of template tags.
//!
//! Validation never fails a query edit. Problems are reported as values so
//! the host can show them next to the parameter widgets and decide whether
//! the query can run.

use crate::tag::{TagKind, TemplateTag, TemplateTags};

/// A problem with a template tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The tag has no display name for its widget.
    #[error("Missing widget label: {0}")]
    MissingWidgetLabel(String),

    /// A field filter tag that is not mapped to a field yet.
    #[error("The variable \"{0}\" needs to be mapped to a field.")]
    MissingFieldMapping(String),

    /// A card reference without a usable question id.
    #[error("Invalid question reference: {0}")]
    InvalidCardReference(String),

    /// Any other malformed tag.
    #[error("Invalid template tag: {0}")]
    InvalidTemplateTag(String),
}

/// Per-tag validation rules.
pub trait TagValidator: Send + Sync {
    fn validate_tag(&self, tag: &TemplateTag) -> Option<ValidationError>;
}

/// Built-in rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTagValidator;

impl TagValidator for DefaultTagValidator {
    fn validate_tag(&self, tag: &TemplateTag) -> Option<ValidationError> {
        if tag.display_name.trim().is_empty() {
            return Some(ValidationError::MissingWidgetLabel(tag.name.clone()));
        }

        match &tag.kind {
            TagKind::Dimension { dimension, .. } => match dimension {
                None => Some(ValidationError::MissingFieldMapping(tag.name.clone())),
                Some(reference) if !reference.is_field_reference() => {
                    Some(ValidationError::InvalidTemplateTag(tag.name.clone()))
                }
                Some(_) => None,
            },
            TagKind::Card { card_id: None } => {
                Some(ValidationError::InvalidCardReference(tag.name.clone()))
            }
            TagKind::Snippet { snippet_name, .. } if snippet_name.is_empty() => {
                Some(ValidationError::InvalidTemplateTag(tag.name.clone()))
            }
            _ => None,
        }
    }
}

/// Validate every tag in display order.
pub fn validate_template_tags(
    tags: &TemplateTags,
    validator: &dyn TagValidator,
) -> Vec<ValidationError> {
    tags.iter()
        .filter_map(|tag| validator.validate_tag(tag))
        .collect()
}
