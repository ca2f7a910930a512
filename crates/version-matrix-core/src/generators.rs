// crates/version-matrix-core/src/generators.rs
// ============================================================================
// Module: Field Generators
// Description: Named value generators used by test data templates.
// Purpose: Produce collision-free field values for repeated test runs.
// Dependencies: rand, serde_json
// ============================================================================

//! ## Overview
//! Generators fill template fields with fresh values on every build. Values
//! are unique within a process (shared counter) and across processes (random
//! per-process nonce) but are not reproducible; tests must not assert on exact
//! generated values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rand::Rng;
use serde_json::Value;
use version_matrix_config::FieldName;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Built-in monotonically increasing integer generator.
pub const SEQUENCE: &str = "sequence";
/// Built-in unique email address generator.
pub const UNIQUE_EMAIL: &str = "unique_email";
/// Built-in unique display name generator.
pub const UNIQUE_NAME: &str = "unique_name";
/// Built-in 32-character hex token generator.
pub const RANDOM_TOKEN: &str = "random_token";

/// Process-wide counter shared by every counter-backed generator.
static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Produces a value for a template field.
pub trait FieldGenerator: Send + Sync {
    /// Generates a fresh value for `field`.
    fn generate(&self, field: &FieldName) -> Value;
}

impl<F> FieldGenerator for F
where
    F: Fn(&FieldName) -> Value + Send + Sync,
{
    fn generate(&self, field: &FieldName) -> Value {
        self(field)
    }
}

// ============================================================================
// SECTION: Built-In Generators
// ============================================================================

/// Returns the next process-wide sequence number.
fn next_sequence() -> u64 {
    NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// Returns the random nonce chosen once per process.
fn process_nonce() -> &'static str {
    static NONCE: OnceLock<String> = OnceLock::new();
    NONCE.get_or_init(|| format!("{:08x}", rand::thread_rng().r#gen::<u32>()))
}

/// Monotonically increasing integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceGenerator;

impl FieldGenerator for SequenceGenerator {
    fn generate(&self, _field: &FieldName) -> Value {
        Value::from(next_sequence())
    }
}

/// Email addresses of the form `user-{n}-{nonce}@example.test`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueEmailGenerator;

impl FieldGenerator for UniqueEmailGenerator {
    fn generate(&self, _field: &FieldName) -> Value {
        Value::String(format!("user-{}-{}@example.test", next_sequence(), process_nonce()))
    }
}

/// Names of the form `name-{n}-{nonce}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueNameGenerator;

impl FieldGenerator for UniqueNameGenerator {
    fn generate(&self, _field: &FieldName) -> Value {
        Value::String(format!("name-{}-{}", next_sequence(), process_nonce()))
    }
}

/// Random 128-bit tokens rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl FieldGenerator for RandomTokenGenerator {
    fn generate(&self, _field: &FieldName) -> Value {
        Value::String(format!("{:032x}", rand::thread_rng().r#gen::<u128>()))
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Named generator registry.
#[derive(Clone)]
pub struct GeneratorRegistry {
    /// Generators by name.
    generators: BTreeMap<String, Arc<dyn FieldGenerator>>,
}

impl GeneratorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            generators: BTreeMap::new(),
        }
    }

    /// Creates a registry holding the built-in generators.
    #[must_use]
    pub fn builtin() -> Self {
        Self::empty()
            .with(SEQUENCE, SequenceGenerator)
            .with(UNIQUE_EMAIL, UniqueEmailGenerator)
            .with(UNIQUE_NAME, UniqueNameGenerator)
            .with(RANDOM_TOKEN, RandomTokenGenerator)
    }

    /// Registers `generator` under `name`, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, generator: impl FieldGenerator + 'static) -> Self {
        self.generators.insert(name.into(), Arc::new(generator));
        self
    }

    /// Returns the generator registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn FieldGenerator> {
        self.generators.get(name).map(AsRef::as_ref)
    }

    /// Returns true when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Returns registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
