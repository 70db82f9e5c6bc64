//! Identifier minting for step outputs.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::ImageId;

/// Mints session-unique image identifiers.
///
/// Identifiers are `img-<session>-<counter>`: a random per-generator token
/// plus a monotonic counter, so two generators in one process do not
/// collide either.
#[derive(Debug)]
pub struct IdGenerator {
    session: u32,
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            session: rand::random(),
            counter: AtomicU64::new(0),
        }
    }

    /// Next fresh identifier. Never returns the root identifier.
    pub fn next_id(&self) -> ImageId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        ImageId::new(format!("img-{:08x}-{}", self.session, n))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
