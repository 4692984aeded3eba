//! Identity generation for executions and metric revisions

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fresh opaque identity tokens
pub trait IdentityGenerator {
    fn fresh_id(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdentityGenerator for UuidGenerator {
    fn fresh_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix-N` tokens, counting from 1
#[derive(Debug)]
pub struct SequenceIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequenceIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), next: AtomicU64::new(1) }
    }
}

impl Default for SequenceIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdentityGenerator for SequenceIdGenerator {
    fn fresh_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}
