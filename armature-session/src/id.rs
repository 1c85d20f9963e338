//! Session identifier generation.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Source of fresh session identifiers.
///
/// Identifiers are opaque and never derived from session content.
pub trait IdGenerator: Send + Sync {
    /// Produce a new identifier.
    fn generate(&self) -> String;
}

/// Random ASCII alphanumeric identifiers of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct AlphanumericIdGenerator {
    length: usize,
}

impl AlphanumericIdGenerator {
    /// Default identifier length.
    pub const DEFAULT_LENGTH: usize = 24;

    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for AlphanumericIdGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LENGTH)
    }
}

impl IdGenerator for AlphanumericIdGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
