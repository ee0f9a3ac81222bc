//! Tag id generation.

use crate::tag::TagId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of collision-free tag ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> TagId;
}

/// Random v4 UUIDs. Used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> TagId {
        TagId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Deterministic ids: `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new("tag")
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> TagId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        TagId::new(format!("{}-{}", self.prefix, n))
    }
}
