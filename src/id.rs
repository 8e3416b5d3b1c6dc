//! Record identifier generation

use uuid::Uuid;

/// Source of globally unique record ids
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh id
    fn generate(&self) -> String;
}

/// Random (v4) UUID ids
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Generate an id with the default generator
pub fn new_id() -> String {
    UuidGenerator.generate()
}
